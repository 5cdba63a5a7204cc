use std::env;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub realtime: RealtimeConfig,
    pub toast: ToastConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RealtimeConfig {
    /// Buffer size of each per-listener insert-event channel. When a consumer
    /// falls this far behind, newer events for it are dropped with a warning.
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToastConfig {
    /// How long a toast stays visible before auto-closing (milliseconds).
    pub dismiss_after_ms: u64,
    /// Grace period between closing and removal, covering the exit animation.
    pub exit_grace_ms: u64,
    /// How many toasts are rendered at once; the rest wait in the backing list.
    pub max_visible: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "sqlite://data/notifications.db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .unwrap_or(5),
            },
            realtime: RealtimeConfig {
                channel_capacity: env::var("REALTIME_CHANNEL_CAPACITY")
                    .unwrap_or_else(|_| "64".to_string())
                    .parse()
                    .unwrap_or(64),
            },
            toast: ToastConfig {
                dismiss_after_ms: env::var("TOAST_DISMISS_AFTER_MS")
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .unwrap_or(5000),
                exit_grace_ms: env::var("TOAST_EXIT_GRACE_MS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .unwrap_or(300),
                max_visible: env::var("TOAST_MAX_VISIBLE")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .unwrap_or(3),
            },
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: DatabaseConfig {
                url: "sqlite://data/notifications.db".to_string(),
                max_connections: 5,
            },
            realtime: RealtimeConfig {
                channel_capacity: 64,
            },
            toast: ToastConfig {
                dismiss_after_ms: 5000,
                exit_grace_ms: 300,
                max_visible: 3,
            },
        }
    }
}
