use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

/// Delivery backend for outbound notifications. The default transport only
/// logs; an SMTP transport can be dropped in behind the same trait.
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()>;
}

pub struct LogTransport;

#[async_trait]
impl NotificationTransport for LogTransport {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> anyhow::Result<()> {
        info!(recipient, subject, body, "notification dispatched");
        Ok(())
    }
}

/// Fire-and-forget notifier. Delivery is decoupled from business logic, so
/// failures are logged and swallowed, never surfaced to the operation that
/// triggered them.
#[derive(Clone)]
pub struct NotificationService {
    transport: Arc<dyn NotificationTransport>,
    enabled: bool,
}

impl NotificationService {
    pub fn new(transport: Arc<dyn NotificationTransport>, enabled: bool) -> Self {
        Self { transport, enabled }
    }

    pub async fn notify(&self, recipient: &str, subject: &str, body: &str) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.transport.send(recipient, subject, body).await {
            error!(recipient, subject, error = %e, "notification delivery failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FailingTransport(AtomicUsize);

    #[async_trait]
    impl NotificationTransport for FailingTransport {
        async fn send(&self, _: &str, _: &str, _: &str) -> anyhow::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            anyhow::bail!("smtp down")
        }
    }

    #[tokio::test]
    async fn delivery_failures_are_swallowed() {
        let transport = Arc::new(FailingTransport(AtomicUsize::new(0)));
        let service = NotificationService::new(transport.clone(), true);
        service.notify("ops@example.org", "subject", "body").await;
        assert_eq!(transport.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_notifier_skips_transport() {
        let transport = Arc::new(FailingTransport(AtomicUsize::new(0)));
        let service = NotificationService::new(transport.clone(), false);
        service.notify("ops@example.org", "subject", "body").await;
        assert_eq!(transport.0.load(Ordering::SeqCst), 0);
    }
}
