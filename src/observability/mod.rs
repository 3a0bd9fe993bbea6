//! # Observability
//!
//! Structured logging through `tracing`. Events go to stderr so command
//! output on stdout stays machine readable.
//!
//! `RUST_LOG`, when set, overrides the configured level.

use std::str::FromStr;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::error::{DataError, DataResult};

/// Noisy dependency targets and the level they are capped at
const QUIET_TARGETS: &[(&str, &str)] = &[("hyper", "warn"), ("hyper_util", "warn"), ("reqwest", "warn")];

/// Output format for log events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// `timestamp LEVEL target: message fields`
    #[default]
    Compact,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(LogFormat::Compact),
            "json" | "jsonl" => Ok(LogFormat::Json),
            other => Err(DataError::Config(format!("unknown log format '{}'", other))),
        }
    }
}

fn build_env_filter(level: &str) -> DataResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut directives = vec![level.to_string()];
    directives.extend(
        QUIET_TARGETS
            .iter()
            .map(|(target, lvl)| format!("{}={}", target, lvl)),
    );

    EnvFilter::try_new(directives.join(","))
        .map_err(|e| DataError::Config(format!("invalid log level '{}': {}", level, e)))
}

/// Install the global subscriber.
///
/// Calling it again after a subscriber is installed is a no-op.
pub fn init_logging(level: &str, format: LogFormat) -> DataResult<()> {
    let filter = build_env_filter(level)?;

    let layer = match format {
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .with_target(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_current_span(false)
            .with_writer(std::io::stderr)
            .boxed(),
    };

    // Already initialized is fine (tests, embedding apps)
    let _ = tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parse() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!(matches!("xml".parse::<LogFormat>(), Err(DataError::Config(_))));
    }

    #[test]
    fn test_init_twice_is_ok() {
        init_logging("debug", LogFormat::Compact).unwrap();
        init_logging("info", LogFormat::Json).unwrap();
    }
}
