//! One harness run from configuration to exit status.
//!
//! The binary passes the environment-derived configuration, the live provider
//! constructor and stdout; tests pass mock providers and a buffer.

use crate::adapters::Providers;
use crate::catalog::Catalog;
use crate::config::{ConfigError, HarnessConfig, ReportFormat};
use crate::engine::AssertionEngine;
use crate::{environment, report};
use common::QueryError;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every assertion passed.
    Passed,
    /// At least one assertion failed.
    Failed,
    /// Configuration, catalog or provider setup failed before any query.
    Fatal,
}

impl RunStatus {
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            RunStatus::Passed => 0,
            RunStatus::Failed => 1,
            RunStatus::Fatal => 2,
        }
    }
}

impl From<RunStatus> for ExitCode {
    fn from(status: RunStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// Run the standard catalog and write the report to `out`.
///
/// Only a failed write to `out` is an error; every other problem maps to a
/// [`RunStatus`].
pub async fn run<W: Write>(
    config: Result<HarnessConfig, ConfigError>,
    connect: impl FnOnce(&HarnessConfig) -> Result<Providers, QueryError>,
    out: &mut W,
) -> anyhow::Result<RunStatus> {
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!(target: "infra_tests", "Failed to load configuration: {}", e);
            return Ok(RunStatus::Fatal);
        }
    };
    info!(target: "infra_tests", config = ?config, "Configuration loaded");

    let catalog = match Catalog::standard() {
        Ok(catalog) => catalog,
        Err(e) => {
            error!(target: "infra_tests", "Invalid scenario catalog: {}", e);
            return Ok(RunStatus::Fatal);
        }
    };

    let providers = match connect(&config) {
        Ok(providers) => providers,
        Err(e) => {
            error!(target: "infra_tests", "Failed to initialize providers: {}", e);
            return Ok(RunStatus::Fatal);
        }
    };

    let context = Arc::new(environment::resolve(&config));
    let engine = AssertionEngine::new(providers, context.clone());

    let outcomes = engine.run(&catalog).await;
    let summary = report::aggregate(&outcomes);

    let rendered = match config.report_format {
        ReportFormat::Text => report::render_text(&outcomes, &summary),
        ReportFormat::Json => report::render_json(context.name.as_str(), &outcomes, &summary)?,
    };
    out.write_all(rendered.as_bytes())?;
    out.flush()?;

    info!(
        target: "infra_tests",
        environment = %context.name,
        total = summary.total,
        passed = summary.passed,
        failed = summary.failed,
        "Run complete"
    );

    if summary.all_passed() {
        Ok(RunStatus::Passed)
    } else {
        Ok(RunStatus::Failed)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockInfrastructure;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<HarnessConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        HarnessConfig::from_vars(&vars)
    }

    /// `(passed, total)` from the final report line.
    fn tally(text: &str) -> (usize, usize) {
        let last = text.lines().last().unwrap();
        let (passed, total) = last.strip_suffix(" passed").unwrap().split_once('/').unwrap();
        (passed.parse().unwrap(), total.parse().unwrap())
    }

    fn healthy(config: &HarnessConfig) -> Result<Providers, QueryError> {
        let context = environment::resolve(config);
        Ok(Providers::from_mock(Arc::new(MockInfrastructure::healthy(
            &context,
        ))))
    }

    #[tokio::test]
    async fn test_healthy_run_passes() {
        let mut out = Vec::new();
        let status = run(config(&[("TEST_ENV", "dev")]), healthy, &mut out)
            .await
            .unwrap();

        assert_eq!(status, RunStatus::Passed);
        assert_eq!(status.code(), 0);
        let text = String::from_utf8(out).unwrap();
        let (passed, total) = tally(&text);
        assert_eq!(passed, total);
        assert!(total > 0);
    }

    #[tokio::test]
    async fn test_failed_assertion_exits_one() {
        let mut out = Vec::new();
        let status = run(
            config(&[]),
            |config| {
                let context = environment::resolve(config);
                let mock = MockInfrastructure::healthy(&context)
                    .with_site_status("https://asset.jarombek.com", 503);
                Ok(Providers::from_mock(Arc::new(mock)))
            },
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(status, RunStatus::Failed);
        assert_eq!(status.code(), 1);
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("FAIL https.asset_site_reachable"));
        let (passed, total) = tally(&text);
        assert_eq!(passed + 1, total);
    }

    #[tokio::test]
    async fn test_invalid_config_is_fatal_before_any_query() {
        let mut out = Vec::new();
        let mut connected = false;
        let status = run(
            config(&[("TEST_ENV", "qa")]),
            |config| {
                connected = true;
                healthy(config)
            },
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(status, RunStatus::Fatal);
        assert_eq!(status.code(), 2);
        assert!(!connected);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_provider_setup_failure_is_fatal() {
        let mut out = Vec::new();
        let status = run(
            config(&[]),
            |_| Err(QueryError::Transport("no TLS backend".to_string())),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(status, RunStatus::Fatal);
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_json_report_format() {
        let mut out = Vec::new();
        let status = run(config(&[("REPORT_FORMAT", "json")]), healthy, &mut out)
            .await
            .unwrap();

        assert_eq!(status, RunStatus::Passed);
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            value.get("environment").and_then(|e| e.as_str()),
            Some("prod")
        );
    }
}
