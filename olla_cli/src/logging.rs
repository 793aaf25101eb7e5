//! Tracing subscriber setup.
//!
//! Console output goes to stderr (pretty or JSON lines) so stdout stays free
//! for command summaries. An optional JSON file layer follows `[logging]`.

use std::path::Path;

use eyre::{Result, WrapErr};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::cli::{Cli, FILE_GUARD};

/// Install the global subscriber. `RUST_LOG` wins over `--log-level`, which
/// wins over `logging.level`.
pub fn init(cli: &Cli, logging: Option<&olla_config::Logging>) -> Result<()> {
    let level = cli
        .log_level
        .clone()
        .or_else(|| logging.and_then(|l| l.level.clone()))
        .unwrap_or_else(|| "info".to_string());
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(&level)
            .wrap_err_with(|| format!("invalid log level {level:?}"))?,
    };

    let json_console = cli.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_console = (!cli.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    let file_layer = match logging.and_then(|l| l.file.as_deref().map(|f| (f, l))) {
        Some((file, l)) => {
            let appender = rolling_appender(Path::new(file), l.rotation.as_deref())?;
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_console)
        .with(text_console)
        .with(file_layer)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}

fn rolling_appender(
    path: &Path,
    rotation: Option<&str>,
) -> Result<tracing_appender::rolling::RollingFileAppender> {
    let dir = path
        .parent()
        .filter(|d| !d.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let name = path
        .file_name()
        .ok_or_else(|| eyre::eyre!("logging.file has no file name: {}", path.display()))?;
    Ok(match rotation.unwrap_or("never") {
        "daily" => tracing_appender::rolling::daily(dir, name),
        "hourly" => tracing_appender::rolling::hourly(dir, name),
        _ => tracing_appender::rolling::never(dir, name),
    })
}
