use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;

/// Initializes the logging system with both console and file output.
///
/// `RUST_LOG` wins over the configured level. The returned guard flushes the
/// file writer when dropped, so keep it alive for the life of the process.
pub fn init_logging(config: &Config) -> WorkerGuard {
    let _ = fs::create_dir_all(&config.log_dir);

    // Daily rotated JSON file
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "recipe-web.log");
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(file_appender);
    let file_layer = fmt::layer().json().with_writer(non_blocking_writer);

    let console_layer = fmt::layer().with_writer(std::io::stdout);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.log_level;
        EnvFilter::new(format!(
            "recipe_web={level},recipe_core={level},tower_http={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(console_layer)
        .init();

    guard
}
