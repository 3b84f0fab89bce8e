//! tracing setup for the terminal.

use std::fs::{self, OpenOptions};
use std::sync::Arc;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Filter for a configured level or directive string such as `debug` or
/// `filer_terminal=trace`. Anything unparsable falls back to `info`.
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// Logs go to stderr, and additionally to `config.file` when one is set.
/// `RUST_LOG`, when set, replaces the configured level.
pub fn init(config: &LoggingConfig) -> std::io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| level_filter(&config.level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true);

    let file_layer = match &config.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(Arc::new(file))
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

#[cfg(test)]
mod tests {
    use tracing::level_filters::LevelFilter;

    use super::*;

    #[test]
    fn configured_level_sets_the_ceiling() {
        assert_eq!(level_filter("debug").max_level_hint(), Some(LevelFilter::DEBUG));
        assert_eq!(level_filter("warn").max_level_hint(), Some(LevelFilter::WARN));
    }

    #[test]
    fn unparsable_level_falls_back_to_info() {
        assert_eq!(
            level_filter("filer_terminal=loud").max_level_hint(),
            Some(LevelFilter::INFO)
        );
    }
}
