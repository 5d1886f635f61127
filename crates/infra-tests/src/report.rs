//! Report aggregation and rendering.

use crate::assertion::{AssertionOutcome, FailureReason};
use serde::Serialize;
use std::fmt::Write as _;

/// One failed assertion in the summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureDetail {
    pub scenario: String,
    pub field: String,
    pub expected: String,
    pub actual: String,
    pub reason: FailureReason,
}

/// Per-scenario counts, in catalog order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioTally {
    pub name: String,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub failures: Vec<FailureDetail>,
    pub scenarios: Vec<ScenarioTally>,
}

impl Summary {
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    #[must_use]
    pub fn scenario(&self, name: &str) -> Option<&ScenarioTally> {
        self.scenarios.iter().find(|tally| tally.name == name)
    }
}

/// Fold outcomes into a summary. Pure; order of failures follows the outcomes.
#[must_use]
pub fn aggregate(outcomes: &[AssertionOutcome]) -> Summary {
    let mut summary = Summary {
        total: outcomes.len(),
        passed: 0,
        failed: 0,
        failures: Vec::new(),
        scenarios: Vec::new(),
    };

    for outcome in outcomes {
        let index = match summary
            .scenarios
            .iter()
            .position(|tally| tally.name == outcome.scenario)
        {
            Some(index) => index,
            None => {
                summary.scenarios.push(ScenarioTally {
                    name: outcome.scenario.clone(),
                    passed: 0,
                    failed: 0,
                });
                summary.scenarios.len() - 1
            }
        };
        let Some(tally) = summary.scenarios.get_mut(index) else {
            continue;
        };

        if outcome.passed {
            summary.passed += 1;
            tally.passed += 1;
        } else {
            summary.failed += 1;
            tally.failed += 1;
            summary.failures.push(FailureDetail {
                scenario: outcome.scenario.clone(),
                field: outcome.field.clone(),
                expected: outcome.expected.clone(),
                actual: outcome.actual.clone(),
                reason: outcome.failure.clone().unwrap_or(FailureReason::Mismatch),
            });
        }
    }

    summary
}

/// One line per outcome followed by `<passed>/<total> passed`.
#[must_use]
pub fn render_text(outcomes: &[AssertionOutcome], summary: &Summary) -> String {
    let mut text = String::new();
    for outcome in outcomes {
        let _ = writeln!(text, "{}", outcome);
    }
    let _ = writeln!(text, "{}/{} passed", summary.passed, summary.total);
    text
}

#[derive(Serialize)]
struct JsonReport<'a> {
    environment: &'a str,
    outcomes: &'a [AssertionOutcome],
    summary: &'a Summary,
}

pub fn render_json(
    environment: &str,
    outcomes: &[AssertionOutcome],
    summary: &Summary,
) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&JsonReport {
        environment,
        outcomes,
        summary,
    })
}
