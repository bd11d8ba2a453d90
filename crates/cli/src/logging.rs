use anyhow::{anyhow, Result};
use preview_config::LogConfig;
use std::io::IsTerminal;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Log files larger than this are started afresh.
const MAX_LOG_FILE_SIZE: u64 = 8 * 1024 * 1024;

fn env_filter(log_config: &LogConfig) -> EnvFilter {
    let max_level = log_config
        .max_level
        .parse()
        .unwrap_or(tracing::Level::DEBUG);

    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(max_level).into())
        .parse_lossy(&log_config.log_target)
}

/// Install the global subscriber.
///
/// With a log file, everything up to the configured level goes there and the
/// returned guard must be held until exit. Otherwise warnings go to stderr,
/// `RUST_LOG` permitting.
pub fn init(log_file: Option<PathBuf>, log_config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let maybe_log = log_file.or_else(|| log_config.log_file.as_ref().map(PathBuf::from));

    let Some(log_path) = maybe_log else {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(LevelFilter::WARN.to_string()));
        let subscriber = tracing_subscriber::FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(std::io::stderr().is_terminal())
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
        return Ok(None);
    };

    if let Ok(metadata) = std::fs::metadata(&log_path) {
        if log_path.is_file() && metadata.len() > MAX_LOG_FILE_SIZE {
            std::fs::remove_file(&log_path)?;
        }
    }

    let file_name = log_path
        .file_name()
        .ok_or_else(|| anyhow!("no file name in {log_path:?}"))?;

    let directory = log_path
        .parent()
        .ok_or_else(|| anyhow!("{log_path:?} has no parent"))?;

    let file_appender = tracing_appender::rolling::never(directory, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(env_filter(log_config))
        .with_line_number(true)
        .with_writer(non_blocking)
        .with_ansi(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(Some(guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_filter_level() {
        let filter = env_filter(&LogConfig {
            max_level: "info".to_string(),
            ..Default::default()
        });
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_invalid_level_falls_back_to_debug() {
        let filter = env_filter(&LogConfig {
            max_level: "loud".to_string(),
            ..Default::default()
        });
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_log_target_raises_level() {
        let filter = env_filter(&LogConfig {
            max_level: "info".to_string(),
            log_target: "markdown_preview_core=trace".to_string(),
            ..Default::default()
        });
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::TRACE));
    }
}
