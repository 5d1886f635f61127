//! Container orchestration: clusters, tasks and services.

use super::aws_cli::{records_at, AwsCli};
use super::get_one;
use async_trait::async_trait;
use common::{QueryError, Record, RecordSet};

pub const RUNNING: &str = "RUNNING";

#[async_trait]
pub trait ContainerQueries: Send + Sync {
    async fn describe_clusters(&self, names: &[String]) -> Result<RecordSet, QueryError>;

    /// ARNs of tasks of `family` whose desired status is `RUNNING`.
    async fn list_running_task_arns(
        &self,
        cluster: &str,
        family: &str,
    ) -> Result<Vec<String>, QueryError>;

    async fn describe_tasks(&self, cluster: &str, arns: &[String])
        -> Result<RecordSet, QueryError>;

    async fn describe_services(
        &self,
        cluster: &str,
        names: &[String],
    ) -> Result<RecordSet, QueryError>;
}

pub async fn get_cluster(
    containers: &dyn ContainerQueries,
    name: &str,
) -> Result<Record, QueryError> {
    let clusters = containers.describe_clusters(&[name.to_string()]).await?;
    get_one(clusters, &format!("cluster {}", name))
}

/// Running tasks of `family` in `cluster`.
pub async fn list_tasks(
    containers: &dyn ContainerQueries,
    cluster: &str,
    family: &str,
) -> Result<RecordSet, QueryError> {
    let arns = containers.list_running_task_arns(cluster, family).await?;
    if arns.is_empty() {
        tracing::debug!(
            target: "infra_tests.adapters.containers",
            cluster = %cluster,
            family = %family,
            "No running tasks"
        );
        return Ok(Vec::new());
    }
    containers.describe_tasks(cluster, &arns).await
}

pub async fn list_services(
    containers: &dyn ContainerQueries,
    cluster: &str,
    names: &[String],
) -> Result<RecordSet, QueryError> {
    containers.describe_services(cluster, names).await
}

#[async_trait]
impl ContainerQueries for AwsCli {
    async fn describe_clusters(&self, names: &[String]) -> Result<RecordSet, QueryError> {
        let mut args = vec!["ecs", "describe-clusters", "--clusters"];
        args.extend(names.iter().map(String::as_str));
        let response = self.run(&args).await?;
        records_at(&response, "clusters")
    }

    async fn list_running_task_arns(
        &self,
        cluster: &str,
        family: &str,
    ) -> Result<Vec<String>, QueryError> {
        let response = self
            .run(&[
                "ecs",
                "list-tasks",
                "--cluster",
                cluster,
                "--family",
                family,
                "--desired-status",
                RUNNING,
            ])
            .await?;

        let arns = response
            .get("taskArns")
            .and_then(|arns| arns.as_array())
            .map(|arns| {
                arns.iter()
                    .filter_map(|arn| arn.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default();
        Ok(arns)
    }

    async fn describe_tasks(
        &self,
        cluster: &str,
        arns: &[String],
    ) -> Result<RecordSet, QueryError> {
        let mut args = vec!["ecs", "describe-tasks", "--cluster", cluster, "--tasks"];
        args.extend(arns.iter().map(String::as_str));
        let response = self.run(&args).await?;
        records_at(&response, "tasks")
    }

    async fn describe_services(
        &self,
        cluster: &str,
        names: &[String],
    ) -> Result<RecordSet, QueryError> {
        let mut args = vec!["ecs", "describe-services", "--cluster", cluster, "--services"];
        args.extend(names.iter().map(String::as_str));
        let response = self.run(&args).await?;
        records_at(&response, "services")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::adapters::mock::MockInfrastructure;
    use crate::environment::{Environment, EnvironmentContext};

    const CLUSTER: &str = "jarombek-com-dev-ecs-cluster";

    fn mock() -> MockInfrastructure {
        MockInfrastructure::healthy(&EnvironmentContext::for_environment(
            Environment::Dev,
            "jarombek.com",
        ))
    }

    #[tokio::test]
    async fn test_get_cluster() {
        let cluster = get_cluster(&mock(), CLUSTER).await.unwrap();
        assert_eq!(cluster.get_str("status"), Some("ACTIVE"));

        let err = get_cluster(&mock(), "missing-cluster").await.unwrap_err();
        assert!(matches!(err, QueryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_tasks_filters_by_family() {
        let mock = mock();
        let tasks = list_tasks(&mock, CLUSTER, "jarombek-com").await.unwrap();
        assert_eq!(tasks.len(), 1);

        let calls = mock.call_count();
        let tasks = list_tasks(&mock, CLUSTER, "saints-xctf").await.unwrap();
        assert!(tasks.is_empty());
        // no describe call when nothing is running
        assert_eq!(mock.call_count(), calls + 1);
    }
}
