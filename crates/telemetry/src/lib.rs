//! Logging bootstrap: env-filtered `tracing` output, pretty or JSON, with an
//! optional plain-text file sink.

use anyhow::Context;
use bookshelf_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry,
};

const LOG_FILE_NAME: &str = "main.log";

/// Keeps the file writer flushing; hold it for the life of the process.
pub struct TelemetryGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Filter from `RUST_LOG`, falling back to the configured level.
fn build_env_filter(settings: &TelemetrySettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level))
}

/// Install the global subscriber.
///
/// Fails if a subscriber is already installed or the log directory cannot
/// be created.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<TelemetryGuard> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    layers.push(match settings.log_format {
        LogFormat::Json => fmt::layer().json().boxed(),
        LogFormat::Pretty => fmt::layer().boxed(),
    });

    let file_guard = match &settings.log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory '{dir}'"))?;
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            layers.push(fmt::layer().with_writer(writer).with_ansi(false).boxed());
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(build_env_filter(settings))
        .try_init()
        .context("failed to install tracing subscriber")?;

    tracing::debug!(
        format = ?settings.log_format,
        log_dir = ?settings.log_dir,
        "telemetry initialized"
    );

    Ok(TelemetryGuard {
        _file_guard: file_guard,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn configured_level_is_used_without_rust_log() {
        let settings = TelemetrySettings {
            log_level: "warn".to_string(),
            ..TelemetrySettings::default()
        };
        if std::env::var("RUST_LOG").is_err() {
            let filter = build_env_filter(&settings);
            assert_eq!(filter.max_level_hint(), Some(LevelFilter::WARN));
        }
    }
}
