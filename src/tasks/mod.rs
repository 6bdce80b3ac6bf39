pub mod expiry_alerts;
