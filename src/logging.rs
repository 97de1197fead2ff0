//! Unified logging for pipeline diagnostics.
//!
//! Provides compact timestamped logging with per-module level configuration.
//! Supports `RUST_LOG` environment variable for runtime overrides.
//!
//! # Configuration
//!
//! ```toml
//! [logging]
//! default = "warn"  # quiet by default
//!
//! [logging.modules]
//! pipeline = "debug"  # per-clause retrieval and verdicts
//! rules = "info"      # cache reuse and rebuilds
//! ```
//!
//! # Environment Variable
//!
//! `RUST_LOG` takes precedence over config:
//! ```bash
//! RUST_LOG=debug clausewise check mou.txt
//! RUST_LOG=pipeline=debug,retry=warn clausewise check mou.txt
//! ```
//!
//! Log targets are short module names (`pipeline`, `extract`, `validate`,
//! `rules`, `search`, `llm`, `semantic`, `retry`, `ingest`, `report`, `cli`).

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Compact time format: HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Filter directive string for a logging config.
///
/// `info` raises the default level to at least `info` (the `--info` flag).
pub fn filter_directives(config: &LoggingConfig, info: bool) -> String {
    let default = if info && matches!(config.default.as_str(), "error" | "warn") {
        "info"
    } else {
        config.default.as_str()
    };

    let mut modules: Vec<_> = config.modules.iter().collect();
    modules.sort();

    let mut filter_str = default.to_string();
    for (module, level) in modules {
        filter_str.push_str(&format!(",{module}={level}"));
    }
    filter_str
}

/// Initialize logging with configuration.
///
/// Only the first call takes effect. Output goes to stderr so JSON reports
/// on stdout stay machine-readable. `RUST_LOG` takes precedence over config.
pub fn init_with_config(config: &LoggingConfig, info: bool) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(filter_directives(config, info))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

/// Initialize logging with default configuration (`warn`).
pub fn init() {
    init_with_config(&LoggingConfig::default(), false);
}

/// Log an event under a module target.
///
/// # Examples
/// ```ignore
/// log_event!("rules", "cache rebuilt", "{} rules", count);
/// log_event!("pipeline", "started");
/// ```
#[macro_export]
macro_rules! log_event {
    ($target:literal, $event:expr) => {
        tracing::info!(target: $target, "{}", $event)
    };
    ($target:literal, $event:expr, $($arg:tt)*) => {
        tracing::info!(target: $target, "{}: {}", $event, format!($($arg)*))
    };
}

/// Debug-level counterpart of [`log_event!`].
///
/// # Examples
/// ```ignore
/// debug_event!("pipeline", "retrieved", "{} rules for {}", n, clause);
/// ```
#[macro_export]
macro_rules! debug_event {
    ($target:literal, $event:expr) => {
        tracing::debug!(target: $target, "{}", $event)
    };
    ($target:literal, $event:expr, $($arg:tt)*) => {
        tracing::debug!(target: $target, "{}: {}", $event, format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_filter_directives() {
        let config = LoggingConfig {
            default: "warn".to_string(),
            modules: HashMap::from([
                ("rules".to_string(), "info".to_string()),
                ("pipeline".to_string(), "debug".to_string()),
            ]),
        };

        assert_eq!(
            filter_directives(&config, false),
            "warn,pipeline=debug,rules=info"
        );
        assert!(filter_directives(&config, true).starts_with("info,"));
    }

    #[test]
    fn test_info_flag_never_lowers_verbosity() {
        let config = LoggingConfig {
            default: "trace".to_string(),
            modules: HashMap::new(),
        };
        assert_eq!(filter_directives(&config, true), "trace");
    }
}
