//! Security groups.

use super::aws_cli::{records_at, AwsCli};
use async_trait::async_trait;
use common::{QueryError, RecordSet};

#[async_trait]
pub trait SecurityGroupQueries: Send + Sync {
    /// Security groups tagged `Name = name_tag`, with their ingress
    /// (`IpPermissions`) and egress (`IpPermissionsEgress`) rules.
    async fn list_security_groups(&self, name_tag: &str) -> Result<RecordSet, QueryError>;
}

#[async_trait]
impl SecurityGroupQueries for AwsCli {
    async fn list_security_groups(&self, name_tag: &str) -> Result<RecordSet, QueryError> {
        let filter = format!("Name=tag:Name,Values={}", name_tag);
        let response = self
            .run(&["ec2", "describe-security-groups", "--filters", &filter])
            .await?;
        records_at(&response, "SecurityGroups")
    }
}
