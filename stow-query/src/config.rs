//! Configuration file parsing for `stow.toml`.
//!
//! ```rust
//! use stow_query::RepositoryConfig;
//!
//! let config = RepositoryConfig::from_str(r#"
//!     [unit_of_work]
//!     auto_flush = false
//!
//!     [query]
//!     tracking = "tracking"
//! "#).unwrap();
//!
//! assert!(!config.unit_of_work.auto_flush);
//! assert!(config.query.tracking.is_tracking());
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use regex_lite::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::query::Tracking;

/// Main configuration structure for `stow.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Write and flush behaviour.
    #[serde(default)]
    pub unit_of_work: UnitOfWorkConfig,

    /// Read behaviour.
    #[serde(default)]
    pub query: QueryConfig,

    /// Debug/logging settings.
    #[serde(default)]
    pub debug: DebugConfig,

    /// Environment-specific overrides.
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentOverride>,
}

impl RepositoryConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> QueryResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            QueryError::configuration(format!("cannot read {}", path.display())).with_source(e)
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// `${VAR}` and `${VAR:-default}` references are expanded first.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> QueryResult<Self> {
        let expanded = expand_env_vars(content);

        toml::from_str(&expanded).map_err(|e| QueryError::configuration(e.message().to_string()).with_source(e))
    }

    /// Apply environment-specific overrides.
    pub fn with_environment(mut self, env: &str) -> Self {
        if let Some(overrides) = self.environments.remove(env) {
            if let Some(uow) = overrides.unit_of_work {
                if let Some(auto_flush) = uow.auto_flush {
                    self.unit_of_work.auto_flush = auto_flush;
                }
                if let Some(discard) = uow.discard_on_failure {
                    self.unit_of_work.discard_on_failure = discard;
                }
            }
            if let Some(query) = overrides.query {
                if let Some(tracking) = query.tracking {
                    self.query.tracking = tracking;
                }
            }
            if let Some(debug) = overrides.debug {
                if let Some(log_plans) = debug.log_plans {
                    self.debug.log_plans = log_plans;
                }
            }
        }
        self
    }
}

/// Write and flush configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UnitOfWorkConfig {
    /// Flush after every write made outside a unit of work.
    #[serde(default = "default_true")]
    pub auto_flush: bool,

    /// Drop staged writes when the outermost unit of work fails.
    #[serde(default = "default_true")]
    pub discard_on_failure: bool,
}

impl Default for UnitOfWorkConfig {
    fn default() -> Self {
        Self {
            auto_flush: true,
            discard_on_failure: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Read configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueryConfig {
    /// Tracking mode used when a read does not ask for one.
    #[serde(default)]
    pub tracking: Tracking,
}

/// Debug/logging configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugConfig {
    /// Log every resolved loading plan at debug level.
    #[serde(default)]
    pub log_plans: bool,
}

/// Environment-specific configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentOverride {
    /// Unit-of-work overrides.
    pub unit_of_work: Option<UnitOfWorkOverride>,

    /// Query overrides.
    pub query: Option<QueryOverride>,

    /// Debug overrides.
    pub debug: Option<DebugOverride>,
}

/// Unit-of-work configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct UnitOfWorkOverride {
    /// Override auto_flush.
    pub auto_flush: Option<bool>,

    /// Override discard_on_failure.
    pub discard_on_failure: Option<bool>,
}

/// Query configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueryOverride {
    /// Override tracking.
    pub tracking: Option<Tracking>,
}

/// Debug configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugOverride {
    /// Override log_plans.
    pub log_plans: Option<bool>,
}

static ENV_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("env reference pattern is valid")
});

/// Expand `${VAR}` and `${VAR:-default}` using the process environment.
fn expand_env_vars(content: &str) -> String {
    expand_with(content, |name| std::env::var(name).ok())
}

// Unset variables without a default are left as written.
fn expand_with(content: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    ENV_REF
        .replace_all(content, |caps: &Captures<'_>| {
            let name = &caps[1];
            match (lookup(name), caps.get(2)) {
                (Some(value), _) => value,
                (None, Some(default)) => default.as_str().to_string(),
                (None, None) => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RepositoryConfig::default();
        assert!(config.unit_of_work.auto_flush);
        assert!(config.unit_of_work.discard_on_failure);
        assert_eq!(config.query.tracking, Tracking::NoTracking);
        assert!(!config.debug.log_plans);
    }

    #[test]
    fn test_parse_empty_config() {
        let config = RepositoryConfig::from_str("").unwrap();
        assert!(config.unit_of_work.auto_flush);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = RepositoryConfig::from_str("[unit_of_work]\nautoflush = true\n").unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::InvalidConfiguration);
    }

    #[test]
    fn test_environment_override() {
        let toml = r#"
            [unit_of_work]
            auto_flush = true

            [environments.test.unit_of_work]
            auto_flush = false

            [environments.test.debug]
            log_plans = true
        "#;

        let config = RepositoryConfig::from_str(toml).unwrap().with_environment("test");
        assert!(!config.unit_of_work.auto_flush);
        assert!(config.debug.log_plans);
        assert!(config.environments.is_empty());
    }

    #[test]
    fn test_unknown_environment_is_noop() {
        let config = RepositoryConfig::default().with_environment("staging");
        assert!(config.unit_of_work.auto_flush);
    }

    #[test]
    fn test_expand_with_defaults() {
        let lookup = |name: &str| (name == "SET").then(|| "yes".to_string());

        assert_eq!(expand_with("a = \"${SET}\"", lookup), "a = \"yes\"");
        assert_eq!(expand_with("a = \"${UNSET:-no}\"", lookup), "a = \"no\"");
        assert_eq!(expand_with("a = \"${UNSET}\"", lookup), "a = \"${UNSET}\"");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[query]\ntracking = \"tracking\"").unwrap();

        let config = RepositoryConfig::from_file(file.path()).unwrap();
        assert!(config.query.tracking.is_tracking());
    }

    #[test]
    fn test_missing_file() {
        let err = RepositoryConfig::from_file("/nonexistent/stow.toml").unwrap_err();
        assert_eq!(err.code, crate::ErrorCode::InvalidConfiguration);
        assert!(std::error::Error::source(&err).is_some());
    }
}
