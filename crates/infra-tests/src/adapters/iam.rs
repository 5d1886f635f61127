//! IAM roles and their attached policies.

use super::aws_cli::{records_at, AwsCli};
use async_trait::async_trait;
use common::{QueryError, Record, RecordSet};
use serde_json::Value;

#[async_trait]
pub trait IamQueries: Send + Sync {
    /// The role named `name` (`RoleName`, `Path`, `Arn`). An unknown role is
    /// `NotFound`.
    async fn get_role(&self, name: &str) -> Result<Record, QueryError>;

    /// Managed policies attached to a role (`PolicyName`, `PolicyArn`).
    async fn list_attached_role_policies(&self, role: &str) -> Result<RecordSet, QueryError>;
}

#[async_trait]
impl IamQueries for AwsCli {
    async fn get_role(&self, name: &str) -> Result<Record, QueryError> {
        let response = self.run(&["iam", "get-role", "--role-name", name]).await?;
        Record::from_value(response.get("Role").cloned().unwrap_or(Value::Null))
    }

    async fn list_attached_role_policies(&self, role: &str) -> Result<RecordSet, QueryError> {
        let response = self
            .run(&["iam", "list-attached-role-policies", "--role-name", role])
            .await?;
        records_at(&response, "AttachedPolicies")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockInfrastructure;
    use crate::environment::{Environment, EnvironmentContext};

    fn mock() -> MockInfrastructure {
        MockInfrastructure::healthy(&EnvironmentContext::for_environment(
            Environment::Dev,
            "jarombek.com",
        ))
    }

    #[tokio::test]
    async fn test_role_and_attached_policies() {
        let mock = mock();

        let role = mock.get_role("ecs-task-role").await.unwrap();
        assert_eq!(role.get_str("Path"), Some("/admin/"));

        let policies = mock.list_attached_role_policies("ecs-task-role").await.unwrap();
        let names: Vec<&str> = policies.iter().filter_map(|p| p.get_str("PolicyName")).collect();
        assert_eq!(names, vec!["ecs-task-policy"]);
    }

    #[tokio::test]
    async fn test_unknown_role_is_not_found() {
        let err = mock().get_role("lambda-role").await.unwrap_err();
        assert!(matches!(err, QueryError::NotFound(msg) if msg.contains("lambda-role")));

        let err = mock()
            .list_attached_role_policies("lambda-role")
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::NotFound(_)));
    }
}
