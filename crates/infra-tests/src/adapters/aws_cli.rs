//! AWS CLI transport.
//!
//! Every live query runs one `aws` invocation with `--output json` under a
//! timeout. Non-zero exits are classified by the provider error code printed
//! on stderr: "not found" codes become [`QueryError::NotFound`], everything
//! else (credentials, permissions, throttling, network) is
//! [`QueryError::Transport`].

use common::{QueryError, RecordSet, Record};
use regex::Regex;
use serde_json::Value;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::process::Command;

/// Maximum length of provider stderr carried into failure reasons.
const MAX_ERROR_LEN: usize = 256;

/// Provider error codes that mean the requested resource does not exist.
const NOT_FOUND_CODES: &[&str] = &[
    "LoadBalancerNotFound",
    "TargetGroupNotFound",
    "ListenerNotFound",
    "NoSuchBucket",
    "NoSuchPublicAccessBlockConfiguration",
    "NoSuchEntity",
    "NoSuchHostedZone",
    "ClusterNotFoundException",
    "ServiceNotFoundException",
    "ResourceNotFoundException",
    "InvalidGroup.NotFound",
];

/// `An error occurred (NoSuchBucket) when calling the ListObjectsV2 operation`
static ERROR_CODE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"An error occurred \(([A-Za-z0-9.]+)\)").ok());

/// Long-term and session access key ids.
static ACCESS_KEY_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b(?:AKIA|ASIA)[0-9A-Z]{16}\b").ok());

/// Twelve-digit account ids, bare or inside ARNs.
static ACCOUNT_ID_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b\d{12}\b").ok());

/// Sanitize provider stderr before it reaches an outcome.
///
/// Access key ids and account ids are redacted and the text is capped at
/// [`MAX_ERROR_LEN`] characters.
pub fn sanitize_error_output(output: &str) -> String {
    let mut sanitized = output.trim().to_string();
    if let Some(pattern) = ACCESS_KEY_PATTERN.as_ref() {
        sanitized = pattern
            .replace_all(&sanitized, "[ACCESS_KEY_REDACTED]")
            .into_owned();
    }
    if let Some(pattern) = ACCOUNT_ID_PATTERN.as_ref() {
        sanitized = pattern
            .replace_all(&sanitized, "[ACCOUNT_REDACTED]")
            .into_owned();
    }

    if sanitized.chars().count() > MAX_ERROR_LEN {
        let truncated: String = sanitized.chars().take(MAX_ERROR_LEN).collect();
        format!("{}...[truncated]", truncated)
    } else {
        sanitized
    }
}

/// Provider error code in CLI stderr, if any.
pub fn error_code(stderr: &str) -> Option<&str> {
    ERROR_CODE_PATTERN
        .as_ref()?
        .captures(stderr)?
        .get(1)
        .map(|code| code.as_str())
}

/// Map a failed invocation's stderr to a query error.
pub fn classify_failure(stderr: &str) -> QueryError {
    let message = sanitize_error_output(stderr);
    match error_code(stderr) {
        Some(code) if NOT_FOUND_CODES.contains(&code) => QueryError::NotFound(message),
        _ if message.is_empty() => {
            QueryError::Transport("aws exited unsuccessfully without output".to_string())
        }
        _ => QueryError::Transport(message),
    }
}

/// Read-only access to the `aws` executable.
#[derive(Debug, Clone)]
pub struct AwsCli {
    program: String,
    timeout: Duration,
}

impl AwsCli {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Run one CLI command and parse its JSON output.
    ///
    /// An empty stdout on success parses as `null`.
    pub async fn run(&self, args: &[&str]) -> Result<Value, QueryError> {
        let operation = args.iter().take(2).copied().collect::<Vec<_>>().join(" ");

        tracing::debug!(
            target: "infra_tests.adapters.aws_cli",
            operation = %operation,
            "Running AWS CLI query"
        );

        let mut command = Command::new(&self.program);
        command
            .args(args)
            .args(["--output", "json"])
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                return Err(QueryError::Transport(format!(
                    "failed to run '{}': {}",
                    self.program, e
                )))
            }
            Err(_) => {
                tracing::warn!(
                    target: "infra_tests.adapters.aws_cli",
                    operation = %operation,
                    timeout_seconds = self.timeout.as_secs(),
                    "AWS CLI query timed out"
                );
                return Err(QueryError::Transport(format!(
                    "aws {} timed out after {}s",
                    operation,
                    self.timeout.as_secs()
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let error = classify_failure(&stderr);
            tracing::warn!(
                target: "infra_tests.adapters.aws_cli",
                operation = %operation,
                status = ?output.status.code(),
                error_kind = error.kind(),
                "AWS CLI query failed"
            );
            return Err(error);
        }

        if output.stdout.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            QueryError::Transport(format!("aws {} returned invalid JSON: {}", operation, e))
        })
    }
}

/// Records under `key` of a CLI response. A missing key is an empty set.
pub fn records_at(response: &Value, key: &str) -> Result<RecordSet, QueryError> {
    Record::set_from_value(response.get(key).cloned().unwrap_or(Value::Null))
}
