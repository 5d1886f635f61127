//! Harness configuration.
//!
//! Configuration is loaded from environment variables. Every variable is
//! optional; the defaults target the production environment.

use crate::environment::Environment;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Environment variable selecting the environment under test.
pub const TEST_ENV_VAR: &str = "TEST_ENV";

/// Default apex domain of the website.
pub const DEFAULT_BASE_DOMAIN: &str = "jarombek.com";

/// Default AWS CLI executable.
pub const DEFAULT_AWS_CLI_PATH: &str = "aws";

/// Default timeout for a single provider query in seconds.
pub const DEFAULT_QUERY_TIMEOUT_SECONDS: u64 = 30;

/// Upper bound for the provider query timeout in seconds.
pub const MAX_QUERY_TIMEOUT_SECONDS: u64 = 300;

/// Default timeout for an HTTPS reachability probe in seconds.
pub const DEFAULT_PROBE_TIMEOUT_SECONDS: u64 = 10;

/// Upper bound for the probe timeout in seconds.
pub const MAX_PROBE_TIMEOUT_SECONDS: u64 = 120;

/// How the final report is written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    /// One line per assertion followed by the summary line.
    #[default]
    Text,
    /// The full report as a JSON document.
    Json,
}

/// Harness configuration.
#[derive(Clone)]
pub struct HarnessConfig {
    /// Environment under test. Absent `TEST_ENV` means [`Environment::Prod`].
    pub environment: Environment,

    /// Apex domain the website and its assets live under.
    pub base_domain: String,

    /// Path of the AWS CLI executable used by the live adapters.
    pub aws_cli_path: String,

    /// Transport timeout for one provider query.
    pub query_timeout: Duration,

    /// Transport timeout for one HTTPS probe.
    pub probe_timeout: Duration,

    /// Report output format.
    pub report_format: ReportFormat,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,
}

impl fmt::Debug for HarnessConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HarnessConfig")
            .field("environment", &self.environment)
            .field("base_domain", &self.base_domain)
            .field("aws_cli_path", &self.aws_cli_path)
            .field("query_timeout_seconds", &self.query_timeout.as_secs())
            .field("probe_timeout_seconds", &self.probe_timeout.as_secs())
            .field("report_format", &self.report_format)
            .field("json_logs", &self.json_logs)
            .finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid environment: {0}")]
    InvalidEnvironment(String),

    #[error("Invalid timeout configuration: {0}")]
    InvalidTimeout(String),

    #[error("Invalid report format: {0}")]
    InvalidReportFormat(String),

    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            base_domain: DEFAULT_BASE_DOMAIN.to_string(),
            aws_cli_path: DEFAULT_AWS_CLI_PATH.to_string(),
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECONDS),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECONDS),
            report_format: ReportFormat::default(),
            json_logs: false,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let environment = match vars.get(TEST_ENV_VAR) {
            Some(value) => Environment::parse(value)?,
            None => Environment::default(),
        };

        let base_domain = match vars.get("BASE_DOMAIN") {
            Some(value) => {
                let trimmed = value.trim().trim_end_matches('.');
                if trimmed.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        name: "BASE_DOMAIN".to_string(),
                        message: "must not be empty".to_string(),
                    });
                }
                trimmed.to_ascii_lowercase()
            }
            None => DEFAULT_BASE_DOMAIN.to_string(),
        };

        let aws_cli_path = vars
            .get("AWS_CLI_PATH")
            .cloned()
            .unwrap_or_else(|| DEFAULT_AWS_CLI_PATH.to_string());

        let query_timeout = parse_timeout(
            vars,
            "QUERY_TIMEOUT_SECONDS",
            DEFAULT_QUERY_TIMEOUT_SECONDS,
            MAX_QUERY_TIMEOUT_SECONDS,
        )?;

        let probe_timeout = parse_timeout(
            vars,
            "PROBE_TIMEOUT_SECONDS",
            DEFAULT_PROBE_TIMEOUT_SECONDS,
            MAX_PROBE_TIMEOUT_SECONDS,
        )?;

        let report_format = match vars.get("REPORT_FORMAT").map(|v| v.trim().to_ascii_lowercase()) {
            None => ReportFormat::Text,
            Some(value) if value == "text" => ReportFormat::Text,
            Some(value) if value == "json" => ReportFormat::Json,
            Some(value) => {
                return Err(ConfigError::InvalidReportFormat(format!(
                    "REPORT_FORMAT must be 'text' or 'json', got '{}'",
                    value
                )))
            }
        };

        let json_logs = match vars.get("LOG_JSON").map(|v| v.trim().to_ascii_lowercase()) {
            None => false,
            Some(value) => value.parse::<bool>().map_err(|_| ConfigError::InvalidValue {
                name: "LOG_JSON".to_string(),
                message: format!("must be 'true' or 'false', got '{}'", value),
            })?,
        };

        Ok(HarnessConfig {
            environment,
            base_domain,
            aws_cli_path,
            query_timeout,
            probe_timeout,
            report_format,
            json_logs,
        })
    }
}

/// Parse a timeout in whole seconds, bounded to `1..=max`.
fn parse_timeout(
    vars: &HashMap<String, String>,
    name: &str,
    default: u64,
    max: u64,
) -> Result<Duration, ConfigError> {
    let Some(value_str) = vars.get(name) else {
        return Ok(Duration::from_secs(default));
    };

    let value: u64 = value_str.trim().parse().map_err(|e| {
        ConfigError::InvalidTimeout(format!(
            "{} must be a valid positive integer, got '{}': {}",
            name, value_str, e
        ))
    })?;

    if value == 0 {
        return Err(ConfigError::InvalidTimeout(format!(
            "{} must be greater than 0",
            name
        )));
    }

    if value > max {
        return Err(ConfigError::InvalidTimeout(format!(
            "{} must not exceed {} seconds, got {}",
            name, max, value
        )));
    }

    Ok(Duration::from_secs(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vars_defaults_to_prod() {
        let config = HarnessConfig::from_vars(&HashMap::new()).expect("Config should load");

        assert_eq!(config.environment, Environment::Prod);
        assert_eq!(config.base_domain, "jarombek.com");
        assert_eq!(config.aws_cli_path, "aws");
        assert_eq!(config.query_timeout, Duration::from_secs(30));
        assert_eq!(config.probe_timeout, Duration::from_secs(10));
        assert_eq!(config.report_format, ReportFormat::Text);
        assert!(!config.json_logs);
    }

    #[test]
    fn test_from_vars_custom_values() {
        let vars = HashMap::from([
            ("TEST_ENV".to_string(), "dev".to_string()),
            ("BASE_DOMAIN".to_string(), "Example.org.".to_string()),
            ("AWS_CLI_PATH".to_string(), "/usr/local/bin/aws".to_string()),
            ("QUERY_TIMEOUT_SECONDS".to_string(), "45".to_string()),
            ("PROBE_TIMEOUT_SECONDS".to_string(), "5".to_string()),
            ("REPORT_FORMAT".to_string(), "JSON".to_string()),
            ("LOG_JSON".to_string(), "true".to_string()),
        ]);

        let config = HarnessConfig::from_vars(&vars).expect("Config should load");

        assert_eq!(config.environment, Environment::Dev);
        assert_eq!(config.base_domain, "example.org");
        assert_eq!(config.aws_cli_path, "/usr/local/bin/aws");
        assert_eq!(config.query_timeout, Duration::from_secs(45));
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.report_format, ReportFormat::Json);
        assert!(config.json_logs);
    }

    #[test]
    fn test_unknown_environment_rejected() {
        let vars = HashMap::from([("TEST_ENV".to_string(), "staging".to_string())]);

        let result = HarnessConfig::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidEnvironment(msg)) if msg.contains("staging"))
        );
    }

    #[test]
    fn test_query_timeout_rejects_zero() {
        let vars = HashMap::from([("QUERY_TIMEOUT_SECONDS".to_string(), "0".to_string())]);

        let result = HarnessConfig::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidTimeout(msg)) if msg.contains("greater than 0"))
        );
    }

    #[test]
    fn test_query_timeout_rejects_too_large() {
        let vars = HashMap::from([("QUERY_TIMEOUT_SECONDS".to_string(), "301".to_string())]);

        let result = HarnessConfig::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidTimeout(msg)) if msg.contains("must not exceed 300"))
        );
    }

    #[test]
    fn test_probe_timeout_rejects_non_numeric() {
        let vars = HashMap::from([("PROBE_TIMEOUT_SECONDS".to_string(), "ten".to_string())]);

        let result = HarnessConfig::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidTimeout(msg)) if msg.contains("valid positive integer"))
        );
    }

    #[test]
    fn test_report_format_rejects_unknown() {
        let vars = HashMap::from([("REPORT_FORMAT".to_string(), "junit".to_string())]);

        let result = HarnessConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidReportFormat(_))));
    }

    #[test]
    fn test_empty_base_domain_rejected() {
        let vars = HashMap::from([("BASE_DOMAIN".to_string(), " . ".to_string())]);

        let result = HarnessConfig::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidValue { name, .. }) if name == "BASE_DOMAIN")
        );
    }

    #[test]
    fn test_log_json_rejects_garbage() {
        let vars = HashMap::from([("LOG_JSON".to_string(), "yes".to_string())]);

        let result = HarnessConfig::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidValue { name, .. }) if name == "LOG_JSON"));
    }

    #[test]
    fn test_debug_output_lists_fields() {
        let debug = format!("{:?}", HarnessConfig::default());
        assert!(debug.contains("query_timeout_seconds: 30"));
        assert!(debug.contains("Prod"));
    }
}
