//! Subscriber setup for binaries and tests that embed tspack.
//!
//! Only available with the `logging` feature. Libraries should leave
//! subscriber installation to the application; tspack itself only emits
//! `tracing` events.
//!
//! Levels apply to the tspack crates only, so a `debug` build log is not
//! drowned out by dependencies. `RUST_LOG` still wins when set.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Variable read by [`init_logging_from_env`], holding a [`LogLevel`] name.
pub const LOG_ENV: &str = "TSPACK_LOG";

const CRATES: [&str; 3] = ["tspack_graph", "tspack_gen", "tspack_bundler"];

static INIT: Once = Once::new();

/// How much of the build tspack reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Silent,
    Error,
    /// Errors and recovered problems (skipped minification, lost maps)
    Warn,
    /// Build start and summary (default)
    #[default]
    Info,
    /// Per-stage progress: module loads, graph changes, emitted sizes
    Debug,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Silent => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }

    /// Filter directives scoping this level to the tspack crates.
    pub fn directives(&self) -> String {
        CRATES
            .iter()
            .map(|krate| format!("{krate}={}", self.as_str()))
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "silent" | "off" => Ok(LogLevel::Silent),
            "error" => Ok(LogLevel::Error),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            other => Err(format!("Invalid log level: {}", other)),
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Install a compact stderr subscriber at `level`.
///
/// `RUST_LOG`, when set and valid, replaces the level. Only the first call
/// in a process installs anything.
///
/// # Example
///
/// ```rust,no_run
/// use tspack_bundler::logging::{init_logging, LogLevel};
///
/// init_logging(LogLevel::Debug);
/// ```
pub fn init_logging(level: LogLevel) {
    install(|| EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_for(level)));
}

/// Like [`init_logging`], with the level read from `TSPACK_LOG`.
///
/// An unset or unparsable `TSPACK_LOG` means [`LogLevel::Info`].
pub fn init_logging_from_env() {
    let level = std::env::var(LOG_ENV)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or_default();
    init_logging(level);
}

fn filter_for(level: LogLevel) -> EnvFilter {
    EnvFilter::builder().parse_lossy(level.directives())
}

fn install(filter: impl FnOnce() -> EnvFilter) {
    INIT.call_once(|| {
        tracing_subscriber::registry()
            .with(filter())
            .with(fmt::layer().compact().with_target(false).without_time())
            .init();
    });
}
