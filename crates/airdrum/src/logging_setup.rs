use airdrum_core::logging::LogConfig;
use anyhow::{Context, Result};
use std::fs::File;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer,
};

/// Keeps the file writer thread alive; drop it last
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Install the global subscriber. Returns a guard when logging to a file.
pub fn init(config: &LogConfig) -> Result<Option<LogGuard>> {
    config
        .ensure_log_directory()
        .context("Failed to create log directory")?;

    match config.cleanup_old_logs() {
        Ok(0) => {}
        Ok(n) => eprintln!("Removed {} old log file(s)", n),
        Err(e) => eprintln!("Warning: Failed to cleanup old log files: {}", e),
    }

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::builder()
        .with_default_directive(config.parse_level().into())
        .from_env_lossy();

    // Hit lines go to stderr so stdout stays free for the JSON summary
    let console_layer = config.console_output.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(filter.clone())
    });

    let mut guard = None;
    let file_layer = if config.file_output {
        let log_path = config.current_log_path();
        let file = File::create(&log_path)
            .with_context(|| format!("Failed to create log file: {:?}", log_path))?;
        let (writer, worker_guard) = tracing_appender::non_blocking(file);
        guard = Some(LogGuard {
            _guard: worker_guard,
        });
        eprintln!("Logging to file: {:?}", log_path);

        Some(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::debug!("Logging initialized at level: {}", config.level);
    Ok(guard)
}
