///! Logging configuration
///!
///! Console logging on stderr with an optional JSON file layer, so workflow
///! runs driven from cron leave a machine-readable trail

use anyhow::Result;
use std::io;
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub struct LoggingConfig {
    pub level: String,
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file_path: None,
        }
    }
}

impl LoggingConfig {
    /// Initialize logging; the returned guard must stay alive for the file
    /// layer to flush
    pub fn init(&self) -> Result<Option<WorkerGuard>> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.level));

        let console_layer = fmt::layer()
            .with_target(false)
            .with_level(true)
            .with_ansi(true)
            .with_writer(io::stderr);

        if let Some(ref path) = self.file_path {
            let file_appender = rolling::daily(path, "phoenix.log");
            let (writer, guard) = non_blocking(file_appender);

            let file_layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .json()
                .with_writer(writer);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .with(file_layer)
                .init();

            tracing::info!("Logging initialized - level: {}", self.level);
            Ok(Some(guard))
        } else {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(console_layer)
                .init();

            tracing::info!("Logging initialized - level: {}", self.level);
            Ok(None)
        }
    }

    /// Initialize with environment variables
    pub fn init_from_env() -> Result<Option<WorkerGuard>> {
        let level = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
        let file_path = std::env::var("PHOENIX_LOG_PATH").ok();

        Self { level, file_path }.init()
    }
}
