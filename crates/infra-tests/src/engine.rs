//! The assertion engine.
//!
//! For each scenario the engine runs the query, applies the record-count gate
//! and the selection rule, then evaluates every field check against the
//! selected subject. Query failures become failed outcomes; nothing a
//! provider returns can abort the run.

use crate::adapters::{certificates, containers, dns, load_balancing, Providers};
use crate::assertion::{
    AssertionOutcome, ExpectedValue, Expectation, FailureReason, ResolvedExpectation, ABSENT,
};
use crate::catalog::Catalog;
use crate::environment::EnvironmentContext;
use crate::field_path::Resolved;
use crate::scenario::{Lookup, Query, Scenario};
use common::{QueryError, Record, RecordSet};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Field label of the record-count gate outcome.
pub const RECORD_COUNT_FIELD: &str = "(record count)";

/// Field label of outcomes for scenarios whose query or selection failed.
pub const QUERY_FIELD: &str = "(query)";

/// Query results of one scenario evaluation, keyed by rendered query.
#[derive(Debug, Default)]
struct QueryMemo {
    results: HashMap<String, Result<RecordSet, QueryError>>,
}

pub struct AssertionEngine {
    providers: Providers,
    context: Arc<EnvironmentContext>,
}

impl AssertionEngine {
    #[must_use]
    pub fn new(providers: Providers, context: Arc<EnvironmentContext>) -> Self {
        Self { providers, context }
    }

    #[must_use]
    pub fn context(&self) -> &EnvironmentContext {
        &self.context
    }

    /// Evaluate every scenario of the catalog in order.
    pub async fn run(&self, catalog: &Catalog) -> Vec<AssertionOutcome> {
        tracing::info!(
            target: "infra_tests.engine",
            environment = %self.context.name,
            scenarios = catalog.len(),
            "Starting assertion run"
        );

        let mut outcomes = Vec::new();
        for scenario in catalog.scenarios() {
            outcomes.extend(self.evaluate(scenario).await);
        }
        outcomes
    }

    /// Evaluate one scenario. Always returns at least one outcome.
    pub async fn evaluate(&self, scenario: &Scenario) -> Vec<AssertionOutcome> {
        let mut memo = QueryMemo::default();
        let outcomes = self.evaluate_with(scenario, &mut memo).await;

        let failed = outcomes.iter().filter(|o| !o.passed).count();
        if failed == 0 {
            tracing::info!(
                target: "infra_tests.engine",
                scenario = %scenario.name,
                assertions = outcomes.len(),
                "Scenario passed"
            );
        } else {
            tracing::warn!(
                target: "infra_tests.engine",
                scenario = %scenario.name,
                assertions = outcomes.len(),
                failed,
                "Scenario failed"
            );
        }

        outcomes
    }

    async fn evaluate_with(
        &self,
        scenario: &Scenario,
        memo: &mut QueryMemo,
    ) -> Vec<AssertionOutcome> {
        let query = scenario.query.describe(&self.context);

        let records = match self.fetch(&scenario.query, memo).await {
            Ok(records) => records,
            Err(e) => return vec![query_failure(scenario, &query, &e)],
        };

        let required = scenario.selection.requires_record()
            || scenario.expected_count.is_some_and(|count| count > 0);
        if records.is_empty() && required {
            let e = QueryError::NotFound(format!("{} returned no records", query));
            return vec![query_failure(scenario, &query, &e)];
        }

        let mut outcomes = Vec::new();

        if let Some(expected) = scenario.expected_count {
            let gate = ResolvedExpectation::Length(expected);
            let actual = Resolved::Present(Value::Array(
                records.iter().cloned().map(Record::into_value).collect(),
            ));
            let comparison = gate.check(&actual);
            let passed = comparison.passed;
            outcomes.push(AssertionOutcome::compared(
                &scenario.name,
                RECORD_COUNT_FIELD,
                gate.describe(),
                comparison,
            ));
            if !passed {
                return outcomes;
            }
        }

        let subject = match scenario.selection.apply(&records, &self.context) {
            Ok(subject) => subject,
            Err(e) => {
                outcomes.push(query_failure(scenario, &query, &e));
                return outcomes;
            }
        };

        for check in &scenario.checks {
            let field = check.field.to_string();
            let expected = match self.resolve_expectation(&check.expectation, memo).await {
                Ok(expected) => expected,
                Err(e) => {
                    outcomes.push(AssertionOutcome::failed(
                        &scenario.name,
                        field,
                        describe_unresolved(&check.expectation),
                        FailureReason::from(&e),
                    ));
                    continue;
                }
            };

            let actual = check.field.resolve(&subject);
            outcomes.push(AssertionOutcome::compared(
                &scenario.name,
                field,
                expected.describe(),
                expected.check(&actual),
            ));
        }

        outcomes
    }

    async fn resolve_expectation(
        &self,
        expectation: &Expectation,
        memo: &mut QueryMemo,
    ) -> Result<ResolvedExpectation, QueryError> {
        Ok(match expectation {
            Expectation::Equals(value) => {
                ResolvedExpectation::Equals(self.resolve_value(value, memo).await?)
            }
            Expectation::Contains(value) => {
                ResolvedExpectation::Contains(self.resolve_value(value, memo).await?)
            }
            Expectation::Absent => ResolvedExpectation::Absent,
            Expectation::Length(count) => ResolvedExpectation::Length(*count),
            Expectation::MinLength(count) => ResolvedExpectation::MinLength(*count),
        })
    }

    async fn resolve_value(
        &self,
        value: &ExpectedValue,
        memo: &mut QueryMemo,
    ) -> Result<Value, QueryError> {
        match value {
            ExpectedValue::Literal(literal) => Ok(literal.clone()),
            ExpectedValue::Template(template) => Ok(Value::String(template.render(&self.context))),
            ExpectedValue::Lookup(lookup) => self.resolve_lookup(lookup, memo).await,
        }
    }

    async fn resolve_lookup(
        &self,
        lookup: &Lookup,
        memo: &mut QueryMemo,
    ) -> Result<Value, QueryError> {
        let records = self.fetch(&lookup.query, memo).await?;
        let subject = lookup.selection.apply(&records, &self.context)?;
        match lookup.field.resolve(&subject) {
            Resolved::Present(value) => Ok(value),
            Resolved::Missing | Resolved::NoSubject { .. } => Err(QueryError::NotFound(format!(
                "{} is missing",
                lookup
            ))),
            Resolved::Ambiguous { segment, count } => Err(QueryError::Ambiguous {
                what: segment,
                count,
            }),
        }
    }

    /// Run a query once per scenario evaluation.
    async fn fetch(&self, query: &Query, memo: &mut QueryMemo) -> Result<RecordSet, QueryError> {
        let key = query.describe(&self.context);
        if let Some(cached) = memo.results.get(&key) {
            return cached.clone();
        }

        tracing::debug!(target: "infra_tests.engine", query = %key, "Executing query");
        let result = self.execute(query).await;
        if let Err(e) = &result {
            tracing::debug!(
                target: "infra_tests.engine",
                query = %key,
                error_kind = e.kind(),
                error = %e,
                "Query failed"
            );
        }

        memo.results.insert(key, result.clone());
        result
    }

    async fn execute(&self, query: &Query) -> Result<RecordSet, QueryError> {
        let ctx = self.context.as_ref();
        let p = &self.providers;

        match query {
            Query::HostedZone { name } => dns::find_zone(p.dns.as_ref(), &name.render(ctx))
                .await
                .map(|zone| vec![zone]),
            Query::DnsRecord {
                zone,
                name,
                record_type,
            } => dns::find_record(
                p.dns.as_ref(),
                &zone.render(ctx),
                &name.render(ctx),
                record_type,
            )
            .await
            .map(|record| vec![record]),
            Query::IssuedCertificates => {
                certificates::list_issued_certificates(p.certificates.as_ref()).await
            }
            Query::LoadBalancer { name } => {
                p.load_balancing
                    .describe_load_balancers(&name.render(ctx))
                    .await
            }
            Query::Listeners { load_balancer } => {
                load_balancing::list_listeners(p.load_balancing.as_ref(), &load_balancer.render(ctx))
                    .await
            }
            Query::ListenerCertificates { load_balancer } => {
                load_balancing::list_listener_certificates(
                    p.load_balancing.as_ref(),
                    &load_balancer.render(ctx),
                )
                .await
            }
            Query::TargetGroup { name } => {
                load_balancing::get_target_group(p.load_balancing.as_ref(), &name.render(ctx))
                    .await
                    .map(|target_group| vec![target_group])
            }
            Query::SecurityGroups { name_tag } => {
                p.security_groups
                    .list_security_groups(&name_tag.render(ctx))
                    .await
            }
            Query::Cluster { name } => containers::get_cluster(p.containers.as_ref(), &name.render(ctx))
                .await
                .map(|cluster| vec![cluster]),
            Query::Tasks { cluster, family } => {
                containers::list_tasks(
                    p.containers.as_ref(),
                    &cluster.render(ctx),
                    &family.render(ctx),
                )
                .await
            }
            Query::Services { cluster, names } => {
                let names: Vec<String> = names.iter().map(|name| name.render(ctx)).collect();
                containers::list_services(p.containers.as_ref(), &cluster.render(ctx), &names)
                    .await
            }
            Query::Bucket { name } => p
                .object_storage
                .list_objects(&name.render(ctx))
                .await
                .map(|listing| vec![listing]),
            Query::Reachability { url } => p
                .reachability
                .probe(&url.render(ctx))
                .await
                .map(|response| vec![response]),
            Query::PublicAccessBlock { bucket } => p
                .object_storage
                .get_public_access_block(&bucket.render(ctx))
                .await
                .map(|block| vec![block]),
            Query::Role { name } => p.iam.get_role(&name.render(ctx)).await.map(|role| vec![role]),
            Query::AttachedRolePolicies { role } => {
                p.iam.list_attached_role_policies(&role.render(ctx)).await
            }
        }
    }
}

/// The single failed outcome of a scenario whose query or selection failed.
fn query_failure(scenario: &Scenario, query: &str, error: &QueryError) -> AssertionOutcome {
    AssertionOutcome::failed(
        &scenario.name,
        QUERY_FIELD,
        query,
        FailureReason::from(error),
    )
}

fn describe_unresolved(expectation: &Expectation) -> String {
    match expectation {
        Expectation::Equals(value) => value.to_string(),
        Expectation::Contains(value) => format!("contains {}", value),
        Expectation::Absent => ABSENT.to_string(),
        Expectation::Length(count) => format!("length {}", count),
        Expectation::MinLength(count) => format!("length >= {}", count),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockInfrastructure;
    use crate::environment::Environment;
    use serde_json::json;

    fn engine(mock: MockInfrastructure, environment: Environment) -> (AssertionEngine, Arc<MockInfrastructure>) {
        let mock = Arc::new(mock);
        let context = Arc::new(EnvironmentContext::for_environment(environment, "jarombek.com"));
        (
            AssertionEngine::new(Providers::from_mock(mock.clone()), context),
            mock,
        )
    }

    fn prod_context() -> EnvironmentContext {
        EnvironmentContext::for_environment(Environment::Prod, "jarombek.com")
    }

    #[tokio::test]
    async fn test_lookups_share_one_query_per_scenario() {
        let (engine, mock) = engine(MockInfrastructure::healthy(&prod_context()), Environment::Prod);
        let catalog = Catalog::standard().unwrap();
        let scenario = catalog.get("elb.https_listener_certificates").unwrap();

        let outcomes = engine.evaluate(scenario).await;
        assert!(outcomes.iter().all(|o| o.passed), "{:?}", outcomes);

        // describe_load_balancers, describe_listeners, describe_listener_certificates,
        // then one certificate listing for both lookups
        assert_eq!(mock.call_count(), 4);

        engine.evaluate(scenario).await;
        assert_eq!(mock.call_count(), 8);
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_only_that_check() {
        let mock = MockInfrastructure::healthy(&prod_context()).with_target_groups(vec![]);
        let (engine, _) = engine(mock, Environment::Prod);
        let catalog = Catalog::standard().unwrap();

        let outcomes = engine
            .evaluate(catalog.get("elb.https_listener").unwrap())
            .await;
        let failed: Vec<&AssertionOutcome> = outcomes.iter().filter(|o| !o.passed).collect();

        assert_eq!(failed.len(), 1);
        assert!(failed
            .iter()
            .all(|o| o.field == "DefaultActions[0].TargetGroupArn"
                && matches!(o.failure, Some(FailureReason::NotFound(_)))));
        assert!(outcomes.len() > 1);
    }

    #[tokio::test]
    async fn test_ambiguous_selection_is_configuration_failure() {
        let mock = MockInfrastructure::healthy(&prod_context()).with_certificates(vec![
            json!({"DomainName": "jarombek.com", "CertificateArn": "arn:cert/1", "Status": "ISSUED"}),
            json!({"DomainName": "jarombek.com", "CertificateArn": "arn:cert/2", "Status": "ISSUED"}),
        ]);
        let (engine, _) = engine(mock, Environment::Prod);
        let catalog = Catalog::standard().unwrap();

        let outcomes = engine
            .evaluate(catalog.get("acm.primary_certificate_issued").unwrap())
            .await;
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes
            .iter()
            .all(|o| matches!(o.failure, Some(FailureReason::Configuration(_)))));
    }
}
