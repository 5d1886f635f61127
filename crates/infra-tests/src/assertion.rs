//! Comparators and assertion outcomes.
//!
//! Comparisons never raise: every check produces a [`Comparison`] with a
//! boolean verdict, so one mismatch cannot stop the remaining checks of a
//! scenario from running.

use crate::environment::Template;
use crate::field_path::{FieldPath, Resolved};
use crate::scenario::Lookup;
use common::QueryError;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

/// Rendering used for missing fields in reports.
pub const ABSENT: &str = "<absent>";

/// Where the expected value of a comparison comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum ExpectedValue {
    /// A fixed value, compared with its JSON type.
    Literal(Value),
    /// A string rendered from the environment context.
    Template(Template),
    /// A value read from another query's selected record.
    Lookup(Box<Lookup>),
}

impl fmt::Display for ExpectedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpectedValue::Literal(value) => write!(f, "{}", value),
            ExpectedValue::Template(template) => write!(f, "\"{}\"", template),
            ExpectedValue::Lookup(lookup) => write!(f, "{}", lookup),
        }
    }
}

/// The comparator applied to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Expectation {
    /// Exact typed equality.
    Equals(ExpectedValue),
    /// The field must not be present on an existing parent. Used where the
    /// provider omits a field to mean "all", such as security group rules
    /// covering every port.
    Absent,
    /// The field is a sequence of exactly this many elements.
    Length(usize),
    /// The field is a sequence of at least this many elements.
    MinLength(usize),
    /// The field is a sequence containing the value.
    Contains(ExpectedValue),
}

/// One field comparison of a scenario.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCheck {
    pub field: FieldPath,
    pub expectation: Expectation,
}

/// An [`Expectation`] whose expected value has been resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedExpectation {
    Equals(Value),
    Absent,
    Length(usize),
    MinLength(usize),
    Contains(Value),
}

/// Why an assertion failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// Expected and actual values differ.
    Mismatch,
    /// A required record or field does not exist.
    NotFound(String),
    /// The provider could not be reached.
    Transport(String),
    /// A selection matched more than one candidate.
    Configuration(String),
}

impl From<&QueryError> for FailureReason {
    fn from(err: &QueryError) -> Self {
        match err {
            QueryError::NotFound(message) => FailureReason::NotFound(message.clone()),
            QueryError::Transport(message) => FailureReason::Transport(message.clone()),
            QueryError::Ambiguous { .. } => FailureReason::Configuration(err.to_string()),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Mismatch => f.write_str("value mismatch"),
            FailureReason::NotFound(message) => write!(f, "not found: {}", message),
            FailureReason::Transport(message) => write!(f, "transport error: {}", message),
            FailureReason::Configuration(message) => {
                write!(f, "configuration error: {}", message)
            }
        }
    }
}

/// Verdict of one comparator against one actual value.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub passed: bool,
    pub actual: String,
    pub failure: Option<FailureReason>,
}

impl ResolvedExpectation {
    /// Human-readable expected value for reports.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            ResolvedExpectation::Equals(value) => value.to_string(),
            ResolvedExpectation::Absent => ABSENT.to_string(),
            ResolvedExpectation::Length(count) => format!("length {}", count),
            ResolvedExpectation::MinLength(count) => format!("length >= {}", count),
            ResolvedExpectation::Contains(value) => format!("contains {}", value),
        }
    }

    /// Apply the comparator to the resolved actual value.
    #[must_use]
    pub fn check(&self, actual: &Resolved) -> Comparison {
        let value = match actual {
            Resolved::Ambiguous { segment, count } => {
                let detail = format!("{} matched {} elements", segment, count);
                return Comparison {
                    passed: false,
                    actual: format!("<{}>", detail),
                    failure: Some(FailureReason::Configuration(detail)),
                };
            }
            Resolved::NoSubject { segment } => {
                return Comparison {
                    passed: false,
                    actual: ABSENT.to_string(),
                    failure: Some(FailureReason::NotFound(format!(
                        "{} matched nothing",
                        segment
                    ))),
                };
            }
            Resolved::Missing => None,
            Resolved::Present(value) => Some(value),
        };

        let passed = match (self, value) {
            (ResolvedExpectation::Absent, None | Some(Value::Null)) => true,
            (ResolvedExpectation::Absent, Some(_)) => false,
            (_, None) => false,
            (ResolvedExpectation::Equals(expected), Some(actual)) => actual == expected,
            (ResolvedExpectation::Length(count), Some(actual)) => {
                actual.as_array().is_some_and(|items| items.len() == *count)
            }
            (ResolvedExpectation::MinLength(count), Some(actual)) => {
                actual.as_array().is_some_and(|items| items.len() >= *count)
            }
            (ResolvedExpectation::Contains(expected), Some(actual)) => actual
                .as_array()
                .is_some_and(|items| items.contains(expected)),
        };

        let rendered = match (self, value) {
            (_, None) => ABSENT.to_string(),
            (
                ResolvedExpectation::Length(_) | ResolvedExpectation::MinLength(_),
                Some(Value::Array(items)),
            ) => format!("length {}", items.len()),
            (_, Some(actual)) => actual.to_string(),
        };

        Comparison {
            passed,
            actual: rendered,
            failure: if passed {
                None
            } else {
                Some(FailureReason::Mismatch)
            },
        }
    }
}

/// Result of one assertion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssertionOutcome {
    pub scenario: String,
    pub field: String,
    pub expected: String,
    pub actual: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureReason>,
}

impl AssertionOutcome {
    /// Outcome of a completed comparison.
    #[must_use]
    pub fn compared(
        scenario: &str,
        field: impl Into<String>,
        expected: impl Into<String>,
        comparison: Comparison,
    ) -> Self {
        Self {
            scenario: scenario.to_string(),
            field: field.into(),
            expected: expected.into(),
            actual: comparison.actual,
            passed: comparison.passed,
            failure: comparison.failure,
        }
    }

    /// Failed outcome for a check that could not be evaluated.
    #[must_use]
    pub fn failed(
        scenario: &str,
        field: impl Into<String>,
        expected: impl Into<String>,
        reason: FailureReason,
    ) -> Self {
        let actual = match &reason {
            FailureReason::NotFound(_) => ABSENT.to_string(),
            FailureReason::Transport(_) => "<query failed>".to_string(),
            FailureReason::Configuration(_) => "<ambiguous>".to_string(),
            FailureReason::Mismatch => "<mismatch>".to_string(),
        };
        Self {
            scenario: scenario.to_string(),
            field: field.into(),
            expected: expected.into(),
            actual,
            passed: false,
            failure: Some(reason),
        }
    }
}

impl fmt::Display for AssertionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed {
            write!(f, "PASS {} :: {} == {}", self.scenario, self.field, self.expected)
        } else {
            write!(
                f,
                "FAIL {} :: {} expected {}, got {}",
                self.scenario, self.field, self.expected, self.actual
            )?;
            match &self.failure {
                Some(FailureReason::Mismatch) | None => Ok(()),
                Some(reason) => write!(f, " ({})", reason),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::field_path::FieldPath;
    use serde_json::json;

    fn resolve(path: &str, value: &Value) -> Resolved {
        FieldPath::parse(path).unwrap().resolve(value)
    }

    #[test]
    fn test_equals_is_typed() {
        let target_group = json!({"Port": 8080, "HealthCheckPort": "8080"});

        let port = ResolvedExpectation::Equals(json!(8080));
        assert!(port.check(&resolve("Port", &target_group)).passed);
        assert!(!port.check(&resolve("HealthCheckPort", &target_group)).passed);

        let health_port = ResolvedExpectation::Equals(json!("8080"));
        let comparison = health_port.check(&resolve("HealthCheckPort", &target_group));
        assert!(comparison.passed);
        assert_eq!(comparison.actual, "\"8080\"");
        assert_eq!(comparison.failure, None);
    }

    #[test]
    fn test_equals_missing_field_fails() {
        let comparison =
            ResolvedExpectation::Equals(json!("active")).check(&resolve("State.Code", &json!({})));
        assert!(!comparison.passed);
        assert_eq!(comparison.actual, ABSENT);
        assert_eq!(comparison.failure, Some(FailureReason::Mismatch));
    }

    #[test]
    fn test_absent_passes_when_from_port_missing() {
        let rule = json!({"IpProtocol": "-1", "IpRanges": [{"CidrIp": "0.0.0.0/0"}]});
        let comparison = ResolvedExpectation::Absent.check(&resolve("FromPort", &rule));
        assert!(comparison.passed);
        assert_eq!(comparison.actual, ABSENT);
    }

    #[test]
    fn test_absent_fails_when_from_port_present() {
        let rule = json!({"IpProtocol": "tcp", "FromPort": 80});
        let comparison = ResolvedExpectation::Absent.check(&resolve("FromPort", &rule));
        assert!(!comparison.passed);
        assert_eq!(comparison.actual, "80");

        // Zero is a value, not an absence
        let rule = json!({"IpProtocol": "-1", "FromPort": 0});
        assert!(!ResolvedExpectation::Absent.check(&resolve("FromPort", &rule)).passed);
    }

    #[test]
    fn test_absent_fails_when_rule_itself_missing() {
        let group = json!({"IpPermissionsEgress": []});
        let comparison = ResolvedExpectation::Absent
            .check(&resolve("IpPermissionsEgress[IpProtocol=-1].FromPort", &group));
        assert!(!comparison.passed);
        assert_eq!(comparison.actual, ABSENT);
        assert!(matches!(
            comparison.failure,
            Some(FailureReason::NotFound(msg)) if msg.contains("[IpProtocol=-1]")
        ));
    }

    #[test]
    fn test_length_and_min_length() {
        let task = json!({"containers": [{"name": "a"}, {"name": "b"}]});

        let comparison = ResolvedExpectation::Length(2).check(&resolve("containers", &task));
        assert!(comparison.passed);
        assert_eq!(comparison.actual, "length 2");

        let comparison = ResolvedExpectation::Length(3).check(&resolve("containers", &task));
        assert!(!comparison.passed);
        assert_eq!(comparison.actual, "length 2");

        assert!(ResolvedExpectation::MinLength(1).check(&resolve("containers", &task)).passed);
        assert!(!ResolvedExpectation::MinLength(1).check(&resolve("Contents", &task)).passed);
        assert!(!ResolvedExpectation::Length(1).check(&resolve("containers[0].name", &task)).passed);
    }

    #[test]
    fn test_contains() {
        let certs = json!([{"CertificateArn": "arn:a"}, {"CertificateArn": "arn:b"}]);
        let projected = resolve("[*].CertificateArn", &certs);

        assert!(ResolvedExpectation::Contains(json!("arn:b")).check(&projected).passed);
        assert!(!ResolvedExpectation::Contains(json!("arn:c")).check(&projected).passed);
    }

    #[test]
    fn test_ambiguous_is_configuration_failure() {
        let task = json!({"containers": [{"name": "a"}, {"name": "a"}]});
        let comparison =
            ResolvedExpectation::Equals(json!("RUNNING")).check(&resolve("containers[name=a].lastStatus", &task));
        assert!(!comparison.passed);
        assert!(matches!(comparison.failure, Some(FailureReason::Configuration(_))));
    }

    #[test]
    fn test_describe() {
        assert_eq!(ResolvedExpectation::Equals(json!("A")).describe(), "\"A\"");
        assert_eq!(ResolvedExpectation::Equals(json!(443)).describe(), "443");
        assert_eq!(ResolvedExpectation::Absent.describe(), ABSENT);
        assert_eq!(ResolvedExpectation::Length(2).describe(), "length 2");
        assert_eq!(ResolvedExpectation::MinLength(1).describe(), "length >= 1");
    }

    #[test]
    fn test_failure_reason_from_query_error() {
        let reason = FailureReason::from(&QueryError::NotFound("zone".to_string()));
        assert_eq!(reason, FailureReason::NotFound("zone".to_string()));

        let reason = FailureReason::from(&QueryError::Ambiguous {
            what: "listener".to_string(),
            count: 2,
        });
        assert!(matches!(reason, FailureReason::Configuration(msg) if msg.contains("matched 2")));
    }

    #[test]
    fn test_outcome_display() {
        let passed = AssertionOutcome::compared(
            "dns.website_a_record",
            "Type",
            "\"A\"",
            ResolvedExpectation::Equals(json!("A")).check(&Resolved::Present(json!("A"))),
        );
        assert_eq!(passed.to_string(), "PASS dns.website_a_record :: Type == \"A\"");

        let failed = AssertionOutcome::failed(
            "elb.http_listener",
            "query",
            "listeners",
            FailureReason::Transport("timed out".to_string()),
        );
        assert_eq!(
            failed.to_string(),
            "FAIL elb.http_listener :: query expected listeners, got <query failed> (transport error: timed out)"
        );
    }

    #[test]
    fn test_outcome_serializes_failure_reason() {
        let failed = AssertionOutcome::failed(
            "ecs.cluster_active",
            "query",
            "cluster",
            FailureReason::NotFound("cluster jarombek-com-dev-ecs-cluster".to_string()),
        );
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(
            json.get("failure").and_then(|f| f.get("kind")),
            Some(&json!("not_found"))
        );
        assert_eq!(json.get("passed"), Some(&json!(false)));

        let passed = AssertionOutcome::compared(
            "ecs.cluster_active",
            "status",
            "\"ACTIVE\"",
            ResolvedExpectation::Equals(json!("ACTIVE")).check(&Resolved::Present(json!("ACTIVE"))),
        );
        let json = serde_json::to_value(&passed).unwrap();
        assert!(json.get("failure").is_none());
    }
}
