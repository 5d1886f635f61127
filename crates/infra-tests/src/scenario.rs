//! Scenario definitions.
//!
//! A [`Scenario`] binds one [`Query`] to a [`Selection`] rule and a list of
//! [`FieldCheck`]s. Scenarios are plain data: building one performs no I/O and
//! every template and field path is validated up front, so a malformed
//! scenario aborts the run before any provider is queried.

use crate::assertion::{ExpectedValue, Expectation, FieldCheck};
use crate::environment::{EnvironmentContext, Template, TemplateError};
use crate::field_path::{matches_all, FieldPath, FieldPathError};
use common::{QueryError, Record};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Errors constructing a scenario or catalog. Always fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Scenario '{scenario}': {source}")]
    InvalidTemplate {
        scenario: String,
        #[source]
        source: TemplateError,
    },

    #[error("Scenario '{scenario}': {source}")]
    InvalidFieldPath {
        scenario: String,
        #[source]
        source: FieldPathError,
    },

    #[error("Invalid template: {0}")]
    Template(#[from] TemplateError),

    #[error("Invalid field path: {0}")]
    FieldPath(#[from] FieldPathError),

    #[error("Duplicate scenario name: {0}")]
    DuplicateScenario(String),

    #[error("Scenario '{0}' has no checks")]
    EmptyScenario(String),
}

/// Which resources a scenario reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    HostedZone { name: Template },
    DnsRecord {
        zone: Template,
        name: Template,
        record_type: String,
    },
    IssuedCertificates,
    LoadBalancer { name: Template },
    Listeners { load_balancer: Template },
    ListenerCertificates { load_balancer: Template },
    TargetGroup { name: Template },
    SecurityGroups { name_tag: Template },
    Cluster { name: Template },
    Tasks { cluster: Template, family: Template },
    Services {
        cluster: Template,
        names: Vec<Template>,
    },
    Bucket { name: Template },
    PublicAccessBlock { bucket: Template },
    Reachability { url: Template },
    Role { name: Template },
    AttachedRolePolicies { role: Template },
}

impl Query {
    pub fn hosted_zone(name: &str) -> Result<Self, TemplateError> {
        Ok(Query::HostedZone {
            name: Template::parse(name)?,
        })
    }

    pub fn dns_record(zone: &str, name: &str, record_type: &str) -> Result<Self, TemplateError> {
        Ok(Query::DnsRecord {
            zone: Template::parse(zone)?,
            name: Template::parse(name)?,
            record_type: record_type.to_string(),
        })
    }

    pub fn load_balancer(name: &str) -> Result<Self, TemplateError> {
        Ok(Query::LoadBalancer {
            name: Template::parse(name)?,
        })
    }

    pub fn listeners(load_balancer: &str) -> Result<Self, TemplateError> {
        Ok(Query::Listeners {
            load_balancer: Template::parse(load_balancer)?,
        })
    }

    pub fn listener_certificates(load_balancer: &str) -> Result<Self, TemplateError> {
        Ok(Query::ListenerCertificates {
            load_balancer: Template::parse(load_balancer)?,
        })
    }

    pub fn target_group(name: &str) -> Result<Self, TemplateError> {
        Ok(Query::TargetGroup {
            name: Template::parse(name)?,
        })
    }

    pub fn security_groups(name_tag: &str) -> Result<Self, TemplateError> {
        Ok(Query::SecurityGroups {
            name_tag: Template::parse(name_tag)?,
        })
    }

    pub fn cluster(name: &str) -> Result<Self, TemplateError> {
        Ok(Query::Cluster {
            name: Template::parse(name)?,
        })
    }

    pub fn tasks(cluster: &str, family: &str) -> Result<Self, TemplateError> {
        Ok(Query::Tasks {
            cluster: Template::parse(cluster)?,
            family: Template::parse(family)?,
        })
    }

    pub fn services(cluster: &str, names: &[&str]) -> Result<Self, TemplateError> {
        Ok(Query::Services {
            cluster: Template::parse(cluster)?,
            names: names
                .iter()
                .map(|name| Template::parse(name))
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn bucket(name: &str) -> Result<Self, TemplateError> {
        Ok(Query::Bucket {
            name: Template::parse(name)?,
        })
    }

    pub fn public_access_block(bucket: &str) -> Result<Self, TemplateError> {
        Ok(Query::PublicAccessBlock {
            bucket: Template::parse(bucket)?,
        })
    }

    pub fn reachability(url: &str) -> Result<Self, TemplateError> {
        Ok(Query::Reachability {
            url: Template::parse(url)?,
        })
    }

    pub fn role(name: &str) -> Result<Self, TemplateError> {
        Ok(Query::Role {
            name: Template::parse(name)?,
        })
    }

    pub fn attached_role_policies(role: &str) -> Result<Self, TemplateError> {
        Ok(Query::AttachedRolePolicies {
            role: Template::parse(role)?,
        })
    }

    /// Rendered description; also the memo key of the query within a scenario.
    #[must_use]
    pub fn describe(&self, context: &EnvironmentContext) -> String {
        match self {
            Query::HostedZone { name } => format!("hosted zone {}", name.render(context)),
            Query::DnsRecord {
                zone,
                name,
                record_type,
            } => format!(
                "{} record {} in zone {}",
                record_type,
                name.render(context),
                zone.render(context)
            ),
            Query::IssuedCertificates => "issued certificates".to_string(),
            Query::LoadBalancer { name } => format!("load balancer {}", name.render(context)),
            Query::Listeners { load_balancer } => {
                format!("listeners of {}", load_balancer.render(context))
            }
            Query::ListenerCertificates { load_balancer } => format!(
                "HTTPS listener certificates of {}",
                load_balancer.render(context)
            ),
            Query::TargetGroup { name } => format!("target group {}", name.render(context)),
            Query::SecurityGroups { name_tag } => {
                format!("security groups tagged {}", name_tag.render(context))
            }
            Query::Cluster { name } => format!("cluster {}", name.render(context)),
            Query::Tasks { cluster, family } => format!(
                "running {} tasks in {}",
                family.render(context),
                cluster.render(context)
            ),
            Query::Services { cluster, names } => {
                let names: Vec<String> = names.iter().map(|n| n.render(context)).collect();
                format!(
                    "services {} in {}",
                    names.join(","),
                    cluster.render(context)
                )
            }
            Query::Bucket { name } => format!("bucket {}", name.render(context)),
            Query::PublicAccessBlock { bucket } => {
                format!("public access block of {}", bucket.render(context))
            }
            Query::Reachability { url } => format!("GET {}", url.render(context)),
            Query::Role { name } => format!("role {}", name.render(context)),
            Query::AttachedRolePolicies { role } => {
                format!("policies attached to {}", role.render(context))
            }
        }
    }
}

/// How the record under test is picked from a query's records.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selection {
    /// The query must return exactly one record.
    Only,
    /// The unique record whose fields render to every template.
    Where(Vec<(String, Template)>),
    /// Every record, as a sequence.
    All,
}

impl Selection {
    /// Apply the rule. The result is the subject field paths resolve against.
    pub fn apply(&self, records: &[Record], context: &EnvironmentContext) -> Result<Value, QueryError> {
        match self {
            Selection::Only => match records {
                [] => Err(QueryError::NotFound("no records returned".to_string())),
                [only] => Ok(only.clone().into_value()),
                many => Err(QueryError::Ambiguous {
                    what: "single-record query".to_string(),
                    count: many.len(),
                }),
            },
            Selection::Where(predicates) => {
                let rendered: Vec<(String, String)> = predicates
                    .iter()
                    .map(|(field, template)| (field.clone(), template.render(context)))
                    .collect();
                let mut matches = records.iter().filter(|record| {
                    let value = Value::Object(record.fields().clone());
                    matches_all(&value, &rendered)
                });
                let what = describe_predicates(&rendered);
                match (matches.next(), matches.next()) {
                    (None, _) => Err(QueryError::NotFound(format!("no record with {}", what))),
                    (Some(record), None) => Ok(record.clone().into_value()),
                    (Some(_), Some(_)) => Err(QueryError::Ambiguous {
                        count: 2 + matches.count(),
                        what: format!("record with {}", what),
                    }),
                }
            }
            Selection::All => Ok(Value::Array(
                records.iter().cloned().map(Record::into_value).collect(),
            )),
        }
    }

    /// Whether an empty result can still satisfy the rule.
    #[must_use]
    pub fn requires_record(&self) -> bool {
        !matches!(self, Selection::All)
    }
}

fn describe_predicates(predicates: &[(String, String)]) -> String {
    predicates
        .iter()
        .map(|(field, value)| format!("{}={}", field, value))
        .collect::<Vec<_>>()
        .join(",")
}

/// An expected value read from another query.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub query: Query,
    pub selection: Selection,
    pub field: FieldPath,
}

impl Lookup {
    pub fn new(query: Query, selection: Selection, field: &str) -> Result<Self, CatalogError> {
        Ok(Self {
            query,
            selection,
            field: FieldPath::parse(field)?,
        })
    }

    /// Lookup of a field on the unique record matching `field_name = template`.
    pub fn where_field(
        query: Query,
        field_name: &str,
        template: &str,
        field: &str,
    ) -> Result<Self, CatalogError> {
        let selection = Selection::Where(vec![(field_name.to_string(), Template::parse(template)?)]);
        Self::new(query, selection, field)
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let selection = match &self.selection {
            Selection::Only => String::new(),
            Selection::Where(predicates) => {
                let pairs: Vec<String> = predicates
                    .iter()
                    .map(|(field, template)| format!("{}={}", field, template))
                    .collect();
                format!("[{}]", pairs.join(","))
            }
            Selection::All => "[*]".to_string(),
        };
        write!(f, "{}{}.{}", QueryLabel(&self.query), selection, self.field)
    }
}

/// Short label of a query kind for lookup descriptions.
struct QueryLabel<'a>(&'a Query);

impl fmt::Display for QueryLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.0 {
            Query::HostedZone { name } => format!("zone({})", name),
            Query::DnsRecord { name, record_type, .. } => format!("{}({})", record_type, name),
            Query::IssuedCertificates => "issued_certificates".to_string(),
            Query::LoadBalancer { name } => format!("load_balancer({})", name),
            Query::Listeners { load_balancer } => format!("listeners({})", load_balancer),
            Query::ListenerCertificates { load_balancer } => {
                format!("listener_certificates({})", load_balancer)
            }
            Query::TargetGroup { name } => format!("target_group({})", name),
            Query::SecurityGroups { name_tag } => format!("security_groups({})", name_tag),
            Query::Cluster { name } => format!("cluster({})", name),
            Query::Tasks { family, .. } => format!("tasks({})", family),
            Query::Services { cluster, .. } => format!("services({})", cluster),
            Query::Bucket { name } => format!("bucket({})", name),
            Query::PublicAccessBlock { bucket } => format!("public_access_block({})", bucket),
            Query::Reachability { url } => format!("probe({})", url),
            Query::Role { name } => format!("role({})", name),
            Query::AttachedRolePolicies { role } => format!("attached_policies({})", role),
        };
        f.write_str(&label)
    }
}

/// One bound check of the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub name: String,
    pub description: String,
    pub query: Query,
    /// Record-count gate applied before selection.
    pub expected_count: Option<usize>,
    pub selection: Selection,
    pub checks: Vec<FieldCheck>,
}

impl Scenario {
    #[must_use]
    pub fn builder(name: &str, query: Query) -> ScenarioBuilder {
        ScenarioBuilder {
            scenario: Scenario {
                name: name.to_string(),
                description: String::new(),
                query,
                expected_count: None,
                selection: Selection::Only,
                checks: Vec::new(),
            },
            error: None,
        }
    }
}

/// Builds a [`Scenario`], keeping the first construction error for [`ScenarioBuilder::build`].
#[derive(Debug)]
pub struct ScenarioBuilder {
    scenario: Scenario,
    error: Option<CatalogError>,
}

impl ScenarioBuilder {
    #[must_use]
    pub fn describe(mut self, description: &str) -> Self {
        self.scenario.description = description.to_string();
        self
    }

    /// Gate: the query must return exactly `count` records.
    #[must_use]
    pub fn expect_count(mut self, count: usize) -> Self {
        self.scenario.expected_count = Some(count);
        self
    }

    /// Select the unique record matching every `field = template` pair.
    #[must_use]
    pub fn select_where(mut self, predicates: &[(&str, &str)]) -> Self {
        let mut parsed = Vec::with_capacity(predicates.len());
        for (field, template) in predicates {
            match self.template(template) {
                Some(template) => parsed.push(((*field).to_string(), template)),
                None => return self,
            }
        }
        self.scenario.selection = Selection::Where(parsed);
        self
    }

    /// Check the whole record set as a sequence.
    #[must_use]
    pub fn select_all(mut self) -> Self {
        self.scenario.selection = Selection::All;
        self
    }

    /// Field equals a literal JSON value.
    #[must_use]
    pub fn equals(self, field: &str, value: impl Into<Value>) -> Self {
        self.check(
            field,
            Expectation::Equals(ExpectedValue::Literal(value.into())),
        )
    }

    /// Field equals a string rendered from the environment.
    #[must_use]
    pub fn equals_template(mut self, field: &str, template: &str) -> Self {
        match self.template(template) {
            Some(template) => self.check(field, Expectation::Equals(ExpectedValue::Template(template))),
            None => self,
        }
    }

    /// Field equals a value read from another query.
    #[must_use]
    pub fn equals_lookup(self, field: &str, lookup: Lookup) -> Self {
        self.check(
            field,
            Expectation::Equals(ExpectedValue::Lookup(Box::new(lookup))),
        )
    }

    /// Sequence field contains a value read from another query.
    #[must_use]
    pub fn contains_lookup(self, field: &str, lookup: Lookup) -> Self {
        self.check(
            field,
            Expectation::Contains(ExpectedValue::Lookup(Box::new(lookup))),
        )
    }

    /// Sequence field contains a literal value.
    #[must_use]
    pub fn contains(self, field: &str, value: impl Into<Value>) -> Self {
        self.check(
            field,
            Expectation::Contains(ExpectedValue::Literal(value.into())),
        )
    }

    /// Field must be missing.
    #[must_use]
    pub fn absent(self, field: &str) -> Self {
        self.check(field, Expectation::Absent)
    }

    /// Sequence field has exactly `count` elements.
    #[must_use]
    pub fn length(self, field: &str, count: usize) -> Self {
        self.check(field, Expectation::Length(count))
    }

    /// Sequence field has at least `count` elements.
    #[must_use]
    pub fn min_length(self, field: &str, count: usize) -> Self {
        self.check(field, Expectation::MinLength(count))
    }

    /// Checks for one security group rule.
    ///
    /// A port of `0` means the rule covers every port, which the provider
    /// expresses by omitting the port field. The rule is selected by protocol
    /// and, when given, by its lower port.
    #[must_use]
    pub fn security_group_rule(
        self,
        direction: &str,
        protocol: &str,
        from_port: u16,
        to_port: u16,
        cidr: &str,
    ) -> Self {
        let rule = if from_port == 0 {
            format!("{}[IpProtocol={}]", direction, protocol)
        } else {
            format!("{}[IpProtocol={},FromPort={}]", direction, protocol, from_port)
        };

        let builder = self.equals(&format!("{}.IpProtocol", rule), protocol);
        let builder = if from_port == 0 {
            builder.absent(&format!("{}.FromPort", rule))
        } else {
            builder.equals(&format!("{}.FromPort", rule), from_port)
        };
        let builder = if to_port == 0 {
            builder.absent(&format!("{}.ToPort", rule))
        } else {
            builder.equals(&format!("{}.ToPort", rule), to_port)
        };
        builder.contains(&format!("{}.IpRanges[*].CidrIp", rule), cidr)
    }

    #[must_use]
    pub fn check(mut self, field: &str, expectation: Expectation) -> Self {
        match FieldPath::parse(field) {
            Ok(field) => self.scenario.checks.push(FieldCheck { field, expectation }),
            Err(source) => self.fail(CatalogError::InvalidFieldPath {
                scenario: self.scenario.name.clone(),
                source,
            }),
        }
        self
    }

    pub fn build(self) -> Result<Scenario, CatalogError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        if self.scenario.checks.is_empty() && self.scenario.expected_count.is_none() {
            return Err(CatalogError::EmptyScenario(self.scenario.name));
        }
        Ok(self.scenario)
    }

    fn template(&mut self, source: &str) -> Option<Template> {
        match Template::parse(source) {
            Ok(template) => Some(template),
            Err(source) => {
                let error = CatalogError::InvalidTemplate {
                    scenario: self.scenario.name.clone(),
                    source,
                };
                self.fail(error);
                None
            }
        }
    }

    fn fail(&mut self, error: CatalogError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use serde_json::json;

    fn prod() -> EnvironmentContext {
        EnvironmentContext::for_environment(Environment::Prod, "jarombek.com")
    }

    fn listener(protocol: &str, port: u16) -> Record {
        Record::new().with("Protocol", protocol).with("Port", port)
    }

    #[test]
    fn test_where_selects_https_listener_in_either_order() {
        let selection = Selection::Where(vec![(
            "Protocol".to_string(),
            Template::parse("HTTPS").unwrap(),
        )]);

        let forward = [listener("HTTP", 80), listener("HTTPS", 443)];
        let reverse = [listener("HTTPS", 443), listener("HTTP", 80)];

        for records in [&forward[..], &reverse[..]] {
            let selected = selection.apply(records, &prod()).unwrap();
            assert_eq!(selected.get("Protocol"), Some(&json!("HTTPS")));
            assert_eq!(selected.get("Port"), Some(&json!(443)));
        }
    }

    #[test]
    fn test_where_no_match_is_not_found() {
        let selection = Selection::Where(vec![(
            "Protocol".to_string(),
            Template::parse("HTTPS").unwrap(),
        )]);
        let err = selection
            .apply(&[listener("HTTP", 80)], &prod())
            .unwrap_err();
        assert!(matches!(err, QueryError::NotFound(msg) if msg.contains("Protocol=HTTPS")));
    }

    #[test]
    fn test_where_multiple_matches_is_ambiguous() {
        let selection = Selection::Where(vec![(
            "DomainName".to_string(),
            Template::parse("{cert_primary}").unwrap(),
        )]);
        let records = [
            Record::new().with("DomainName", "jarombek.com"),
            Record::new().with("DomainName", "*.jarombek.com"),
            Record::new().with("DomainName", "jarombek.com"),
        ];
        let err = selection.apply(&records, &prod()).unwrap_err();
        assert_eq!(
            err,
            QueryError::Ambiguous {
                what: "record with DomainName=jarombek.com".to_string(),
                count: 2
            }
        );
    }

    #[test]
    fn test_only_requires_exactly_one() {
        assert!(matches!(
            Selection::Only.apply(&[], &prod()),
            Err(QueryError::NotFound(_))
        ));
        assert!(matches!(
            Selection::Only.apply(&[listener("HTTP", 80), listener("HTTPS", 443)], &prod()),
            Err(QueryError::Ambiguous { count: 2, .. })
        ));
        assert!(Selection::Only.apply(&[listener("HTTP", 80)], &prod()).is_ok());
    }

    #[test]
    fn test_all_returns_sequence() {
        let selected = Selection::All
            .apply(&[listener("HTTP", 80), listener("HTTPS", 443)], &prod())
            .unwrap();
        assert_eq!(selected.as_array().map(Vec::len), Some(2));
        assert!(!Selection::All.requires_record());
        assert!(Selection::Only.requires_record());
    }

    #[test]
    fn test_query_describe_renders_templates() {
        let query = Query::listeners("jarombek-com-{env}-alb").unwrap();
        assert_eq!(query.describe(&prod()), "listeners of jarombek-com-prod-alb");

        let query = Query::dns_record("{base_domain}.", "www.{website_host}", "CNAME").unwrap();
        assert_eq!(
            query.describe(&prod()),
            "CNAME record www.jarombek.com in zone jarombek.com."
        );

        let query = Query::public_access_block("asset.{base_domain}").unwrap();
        assert_eq!(
            query.describe(&prod()),
            "public access block of asset.jarombek.com"
        );

        let query = Query::attached_role_policies("ecs-task-role").unwrap();
        assert_eq!(query.describe(&prod()), "policies attached to ecs-task-role");
    }

    #[test]
    fn test_builder_collects_checks() {
        let scenario = Scenario::builder(
            "elb.load_balancer_active",
            Query::load_balancer("jarombek-com-{env}-alb").unwrap(),
        )
        .expect_count(1)
        .equals("Scheme", "internet-facing")
        .equals("State.Code", "active")
        .build()
        .unwrap();

        assert_eq!(scenario.expected_count, Some(1));
        assert_eq!(scenario.selection, Selection::Only);
        assert_eq!(scenario.checks.len(), 2);
    }

    #[test]
    fn test_builder_security_group_rule_all_ports_uses_absent() {
        let scenario = Scenario::builder(
            "ec2.rules",
            Query::security_groups("sg").unwrap(),
        )
        .security_group_rule("IpPermissionsEgress", "-1", 0, 0, "0.0.0.0/0")
        .build()
        .unwrap();

        let expectations: Vec<(String, &Expectation)> = scenario
            .checks
            .iter()
            .map(|check| (check.field.to_string(), &check.expectation))
            .collect();

        assert_eq!(expectations.len(), 4);
        assert!(expectations.contains(&(
            "IpPermissionsEgress[IpProtocol=-1].FromPort".to_string(),
            &Expectation::Absent
        )));
        assert!(expectations.contains(&(
            "IpPermissionsEgress[IpProtocol=-1].ToPort".to_string(),
            &Expectation::Absent
        )));
    }

    #[test]
    fn test_builder_reports_invalid_path() {
        let err = Scenario::builder("broken", Query::IssuedCertificates)
            .equals("DomainName..x", "a")
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidFieldPath { scenario, .. } if scenario == "broken"));
    }

    #[test]
    fn test_builder_reports_invalid_template() {
        let err = Scenario::builder("broken", Query::IssuedCertificates)
            .select_where(&[("DomainName", "{nope}")])
            .equals("DomainName", "a")
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidTemplate { .. }));
    }

    #[test]
    fn test_builder_rejects_empty_scenario() {
        let err = Scenario::builder("empty", Query::IssuedCertificates)
            .build()
            .unwrap_err();
        assert_eq!(err, CatalogError::EmptyScenario("empty".to_string()));
    }

    #[test]
    fn test_lookup_display() {
        let lookup = Lookup::where_field(
            Query::IssuedCertificates,
            "DomainName",
            "{cert_primary}",
            "CertificateArn",
        )
        .unwrap();
        assert_eq!(
            lookup.to_string(),
            "issued_certificates[DomainName={cert_primary}].CertificateArn"
        );
    }
}
