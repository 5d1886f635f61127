//! TLS certificate inventory.

use super::aws_cli::{records_at, AwsCli};
use async_trait::async_trait;
use common::{QueryError, RecordSet};

pub const ISSUED: &str = "ISSUED";

#[async_trait]
pub trait CertificateQueries: Send + Sync {
    /// Certificate summaries (`DomainName`, `CertificateArn`, `Status`) in any of `statuses`.
    async fn list_certificates(&self, statuses: &[&str]) -> Result<RecordSet, QueryError>;
}

/// Every issued certificate.
///
/// Summaries without a `Status` field come from a status-filtered listing
/// and are kept.
pub async fn list_issued_certificates(
    certificates: &dyn CertificateQueries,
) -> Result<RecordSet, QueryError> {
    let mut issued = certificates.list_certificates(&[ISSUED]).await?;
    issued.retain(|cert| cert.get_str("Status").is_none_or(|status| status == ISSUED));

    tracing::debug!(
        target: "infra_tests.adapters.certificates",
        count = issued.len(),
        "Listed issued certificates"
    );

    Ok(issued)
}

#[async_trait]
impl CertificateQueries for AwsCli {
    async fn list_certificates(&self, statuses: &[&str]) -> Result<RecordSet, QueryError> {
        let mut args = vec!["acm", "list-certificates", "--certificate-statuses"];
        args.extend_from_slice(statuses);
        let response = self.run(&args).await?;
        records_at(&response, "CertificateSummaryList")
    }
}
