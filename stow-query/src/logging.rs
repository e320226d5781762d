//! Logging setup for Stow.
//!
//! Every crate in the workspace logs through `tracing`. Nothing is printed
//! unless the application installs a subscriber, either its own or the one
//! [`init`] builds from the environment (requires the `tracing-subscriber`
//! feature).
//!
//! # Environment Variables
//!
//! - `STOW_DEBUG=true|1|yes` - Enable debug logging
//! - `STOW_LOG_LEVEL=trace|debug|info|warn|error` - Set a specific level
//! - `STOW_LOG_FORMAT=json|pretty|compact` - Output format (default: json)
//!
//! ```rust,no_run
//! use stow_query::logging;
//!
//! // Call once at startup
//! logging::init();
//! ```
//!
//! # What gets logged
//!
//! | Level | Events |
//! |-------|--------|
//! | `debug` | resolved loading plans (with `debug.log_plans`), unit-of-work commit/rollback |
//! | `debug` | queries executed by the memory context (only with `STOW_DEBUG`) |
//! | `trace` | flush scope enter/exit, include-chain resolution, context calls |
//! | `warn` | a failed discard after a failed unit of work |

use std::env;
use std::fmt;
use std::sync::Once;

static INIT: Once = Once::new();

const DEBUG_VAR: &str = "STOW_DEBUG";
const LEVEL_VAR: &str = "STOW_LOG_LEVEL";
const FORMAT_VAR: &str = "STOW_LOG_FORMAT";

/// Subscriber output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per event.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
    /// Single-line human-readable output.
    Compact,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "pretty" => Self::Pretty,
            "compact" => Self::Compact,
            _ => Self::Json,
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Pretty => write!(f, "pretty"),
            Self::Compact => write!(f, "compact"),
        }
    }
}

/// Check if debug logging is enabled via `STOW_DEBUG`.
#[inline]
pub fn is_debug_enabled() -> bool {
    env::var(DEBUG_VAR).map(|v| is_truthy(&v)).unwrap_or(false)
}

/// The configured log level.
///
/// `STOW_LOG_LEVEL` wins when it names a valid level. Otherwise the level is
/// "debug" with `STOW_DEBUG` set and "warn" without.
pub fn get_log_level() -> &'static str {
    select_level(env::var(LEVEL_VAR).ok().as_deref(), is_debug_enabled())
}

/// The configured output format.
pub fn get_log_format() -> LogFormat {
    env::var(FORMAT_VAR)
        .map(|f| LogFormat::parse(&f))
        .unwrap_or_default()
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

fn select_level(requested: Option<&str>, debug: bool) -> &'static str {
    let fallback = if debug { "debug" } else { "warn" };
    match requested.map(str::to_lowercase).as_deref() {
        Some("trace") => "trace",
        Some("debug") => "debug",
        Some("info") => "info",
        Some("warn") => "warn",
        Some("error") => "error",
        _ => fallback,
    }
}

/// Directive string covering every workspace crate at one level.
pub fn filter_directive(level: &str) -> String {
    ["stow", "stow_query", "stow_memory"]
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the Stow logging system.
///
/// Subsequent calls are no-ops, as is a call when neither `STOW_DEBUG` nor
/// `STOW_LOG_LEVEL` is set.
pub fn init() {
    INIT.call_once(|| {
        if !is_debug_enabled() && env::var(LEVEL_VAR).is_err() {
            return;
        }

        #[cfg(feature = "tracing-subscriber")]
        {
            use tracing_subscriber::{EnvFilter, fmt::layer, prelude::*};

            let level = get_log_level();
            let format = get_log_format();
            let filter =
                EnvFilter::try_new(filter_directive(level)).unwrap_or_else(|_| EnvFilter::new("warn"));

            // try_init: the host may already have a global subscriber
            let installed = match format {
                LogFormat::Json => tracing_subscriber::registry()
                    .with(filter)
                    .with(layer().json())
                    .try_init(),
                LogFormat::Compact => tracing_subscriber::registry()
                    .with(filter)
                    .with(layer().compact())
                    .try_init(),
                LogFormat::Pretty => tracing_subscriber::registry()
                    .with(filter)
                    .with(layer().pretty())
                    .try_init(),
            };

            if installed.is_ok() {
                tracing::info!(level, format = %format, "Stow logging initialized");
            }
        }
    });
}

/// Initialize logging at a specific level.
///
/// # Safety
///
/// This function modifies environment variables, which is unsafe in
/// multi-threaded programs. Call this early in your program before
/// spawning threads.
pub fn init_with_level(level: &str) {
    // SAFETY: documented as startup-only, before other threads exist.
    unsafe {
        env::set_var(LEVEL_VAR, level);
    }
    init();
}

/// Debug logging only when `STOW_DEBUG` is enabled at runtime.
#[macro_export]
macro_rules! stow_debug {
    ($($arg:tt)*) => {
        if $crate::logging::is_debug_enabled() {
            tracing::debug!($($arg)*);
        }
    };
}
