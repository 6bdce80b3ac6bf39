use std::sync::Arc;

use anyhow::Context;
use axum::{routing::get, Router};
use tokio::sync::mpsc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use pharmstock_api::config::{init_tracing, load_config};
use pharmstock_api::db::{establish_connection, run_migrations};
use pharmstock_api::events::{process_events, EventSender};
use pharmstock_api::handlers::api_router;
use pharmstock_api::notifications::{LogTransport, NotificationService};
use pharmstock_api::services::requirements::policy_from_name;
use pharmstock_api::services::AppServices;
use pharmstock_api::tasks::expiry_alerts;
use pharmstock_api::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    init_tracing(&config.log_level, config.log_json);
    info!(policy = %config.approval_policy, "starting pharmstock-api");

    let db = Arc::new(
        establish_connection(&config)
            .await
            .context("failed to connect to database")?,
    );
    if config.auto_migrate {
        run_migrations(&db).await.context("migrations failed")?;
    }

    let notifier = NotificationService::new(Arc::new(LogTransport), config.notifications_enabled);
    let (tx, rx) = mpsc::channel(config.event_channel_capacity);
    let event_sender = EventSender::new(tx);
    tokio::spawn(process_events(rx, notifier.clone()));

    if config.expiry_alerts_enabled {
        tokio::spawn(expiry_alerts::run(
            db.clone(),
            notifier,
            config.expiry_scan_interval_hours,
        ));
    }

    let policy = policy_from_name(&config.approval_policy)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let services = AppServices::new(db.clone(), event_sender.clone(), policy);
    let config = Arc::new(config);
    let state = AppState {
        db,
        config: config.clone(),
        event_sender,
        services,
    };

    let cors = match config.cors_allowed_origin.as_deref() {
        Some(origin) => CorsLayer::new().allow_origin(
            origin
                .parse::<axum::http::HeaderValue>()
                .context("invalid CORS origin")?,
        ),
        None => CorsLayer::permissive(),
    };

    let app = Router::new()
        .route("/", get(|| async { "pharmstock-api" }))
        .nest("/api/v1", api_router())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };
    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
