//! Infrastructure assertion harness
//!
//! Runs the standard catalog against the environment selected by `TEST_ENV`
//! and prints one line per assertion plus a summary. Exit status: 0 when
//! every assertion passed, 1 when any failed, 2 on configuration errors.

use infra_tests::adapters::Providers;
use infra_tests::config::HarnessConfig;
use infra_tests::runner;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = HarnessConfig::from_env();
    init_tracing(config.as_ref().is_ok_and(|c| c.json_logs));

    let status = runner::run(config, Providers::live, &mut std::io::stdout()).await?;
    Ok(status.into())
}

/// Logs go to stderr so stdout carries only the report.
fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "infra_tests=info".into());

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}
