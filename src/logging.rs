use anyhow::{anyhow, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::ResolverConfig;

/// Installs the global subscriber: stderr always, plus a daily rolling file
/// under `log_dir` when one is configured. Keep the returned guard alive for
/// as long as file output is wanted.
pub fn init_tracing(config: &ResolverConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let stderr = fmt::layer().with_target(true).with_writer(std::io::stderr);

    match config.log_dir.as_deref() {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "kresource.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(fmt::layer().with_ansi(false).with_writer(writer))
                .try_init()
                .map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .try_init()
                .map_err(|e| anyhow!("Failed to install tracing subscriber: {e}"))?;
            Ok(None)
        }
    }
}
