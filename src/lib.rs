//! Notification core for a sales CRM.
//!
//! The crate covers the one subsystem of the product with real design
//! pressure: per-user notification records and preferences, a single-upstream
//! real-time dispatcher fanning insert events out to in-process consumers,
//! quiet-hours evaluation, and the ephemeral toast lifecycle. Presentation
//! layers (bell dropdown, notification center) consume these pieces; session
//! management and the rest of the CRM live elsewhere behind the
//! [`services::AuthProvider`] seam.
//!
//! ```no_run
//! use std::sync::Arc;
//! use crm_notifications::{config::Config, db, services::*};
//!
//! # async fn wire() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let pool = db::connect(&config.database).await?;
//! let hub = Arc::new(EventHub::new(config.realtime.channel_capacity));
//! let auth = Arc::new(SessionAuth::signed_in("user-1"));
//!
//! let notifications = NotificationService::new(pool, hub.clone(), auth.clone());
//! let dispatcher = RealtimeDispatcher::new(hub, auth);
//! let _guard = dispatcher.subscribe(|n| println!("{}", n.title)).await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod db;
pub mod error;
pub mod services;

pub use config::Config;
pub use db::models::{
    CreateNotification, Frequency, Notification, NotificationFilter, NotificationPreferences,
    NotificationType, Priority, QuietHours, UpdateNotificationPreferences,
};
pub use error::{AppError, AppResult};

/// Install the default tracing subscriber for hosts that have not set one up.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "crm_notifications=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
