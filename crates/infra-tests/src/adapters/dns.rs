//! DNS zones and record sets.

use super::aws_cli::{records_at, AwsCli};
use super::get_one;
use async_trait::async_trait;
use common::{QueryError, Record, RecordSet};

#[async_trait]
pub trait DnsQueries: Send + Sync {
    /// Hosted zones listed from `dns_name` onwards in name order.
    async fn list_hosted_zones(&self, dns_name: &str) -> Result<RecordSet, QueryError>;

    /// Record sets of a zone listed from `name`/`record_type` onwards.
    async fn list_record_sets(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
    ) -> Result<RecordSet, QueryError>;
}

/// Fully qualify a DNS name with a trailing dot.
#[must_use]
pub fn normalize_name(name: &str) -> String {
    let name = name.trim().to_ascii_lowercase();
    if name.ends_with('.') {
        name
    } else {
        format!("{}.", name)
    }
}

/// The hosted zone named exactly `name`.
pub async fn find_zone(dns: &dyn DnsQueries, name: &str) -> Result<Record, QueryError> {
    let name = normalize_name(name);
    let zones = dns.list_hosted_zones(&name).await?;
    let exact = zones
        .into_iter()
        .filter(|zone| zone.get_str("Name").map(normalize_name).as_deref() == Some(name.as_str()))
        .collect();
    get_one(exact, &format!("hosted zone {}", name))
}

/// The record of `record_type` named exactly `name` in the zone `zone`.
pub async fn find_record(
    dns: &dyn DnsQueries,
    zone: &str,
    name: &str,
    record_type: &str,
) -> Result<Record, QueryError> {
    let zone = find_zone(dns, zone).await?;
    let zone_id = zone
        .get_str("Id")
        .ok_or_else(|| QueryError::Transport("hosted zone without an Id".to_string()))?;

    let name = normalize_name(name);
    let records = dns.list_record_sets(zone_id, &name, record_type).await?;

    tracing::debug!(
        target: "infra_tests.adapters.dns",
        zone_id = %zone_id,
        name = %name,
        record_type = %record_type,
        candidates = records.len(),
        "Listed record sets"
    );

    let exact = records
        .into_iter()
        .filter(|record| {
            record.get_str("Name").map(normalize_name).as_deref() == Some(name.as_str())
                && record.get_str("Type") == Some(record_type)
        })
        .collect();
    get_one(exact, &format!("{} record {}", record_type, name))
}

#[async_trait]
impl DnsQueries for AwsCli {
    async fn list_hosted_zones(&self, dns_name: &str) -> Result<RecordSet, QueryError> {
        let response = self
            .run(&["route53", "list-hosted-zones-by-name", "--dns-name", dns_name])
            .await?;
        records_at(&response, "HostedZones")
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        name: &str,
        record_type: &str,
    ) -> Result<RecordSet, QueryError> {
        let response = self
            .run(&[
                "route53",
                "list-resource-record-sets",
                "--hosted-zone-id",
                zone_id,
                "--start-record-name",
                name,
                "--start-record-type",
                record_type,
            ])
            .await?;
        records_at(&response, "ResourceRecordSets")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockInfrastructure;
    use crate::environment::{Environment, EnvironmentContext};
    use serde_json::json;

    fn mock() -> MockInfrastructure {
        MockInfrastructure::healthy(&EnvironmentContext::for_environment(
            Environment::Prod,
            "jarombek.com",
        ))
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("jarombek.com"), "jarombek.com.");
        assert_eq!(normalize_name("Jarombek.com."), "jarombek.com.");
    }

    #[tokio::test]
    async fn test_find_zone_requires_exact_name() {
        let dns = mock();
        let zone = find_zone(&dns, "jarombek.com").await.unwrap();
        assert_eq!(zone.get_str("Name"), Some("jarombek.com."));

        let err = find_zone(&dns, "jarombek.io").await.unwrap_err();
        assert!(matches!(err, QueryError::NotFound(msg) if msg.contains("jarombek.io.")));
    }

    #[tokio::test]
    async fn test_find_record_matches_name_and_type() {
        let dns = mock().with_record_sets(
            "jarombek.com.",
            vec![
                json!({"Name": "jarombek.com.", "Type": "MX"}),
                json!({"Name": "jarombek.com.", "Type": "A"}),
                json!({"Name": "www.jarombek.com.", "Type": "A"}),
            ],
        );

        let record = find_record(&dns, "jarombek.com.", "jarombek.com", "A")
            .await
            .unwrap();
        assert_eq!(record.get_str("Name"), Some("jarombek.com."));
        assert_eq!(record.get_str("Type"), Some("A"));

        let err = find_record(&dns, "jarombek.com.", "www.jarombek.com", "CNAME")
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::NotFound(_)));
    }
}
