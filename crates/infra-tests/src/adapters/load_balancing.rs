//! Application load balancers, listeners and target groups.

use super::aws_cli::{records_at, AwsCli};
use super::{get_one, single};
use async_trait::async_trait;
use common::{QueryError, Record, RecordSet};

#[async_trait]
pub trait LoadBalancingQueries: Send + Sync {
    /// Load balancers named `name`. An unknown name is `NotFound`.
    async fn describe_load_balancers(&self, name: &str) -> Result<RecordSet, QueryError>;

    /// Listeners attached to a load balancer.
    async fn describe_listeners(&self, load_balancer_arn: &str) -> Result<RecordSet, QueryError>;

    /// Target groups named `name`. An unknown name is `NotFound`.
    async fn describe_target_groups(&self, name: &str) -> Result<RecordSet, QueryError>;

    /// Certificates bound to a listener.
    async fn describe_listener_certificates(
        &self,
        listener_arn: &str,
    ) -> Result<RecordSet, QueryError>;
}

fn arn_of<'a>(record: &'a Record, field: &str) -> Result<&'a str, QueryError> {
    record
        .get_str(field)
        .ok_or_else(|| QueryError::Transport(format!("response record without {}", field)))
}

pub async fn get_load_balancer(
    load_balancing: &dyn LoadBalancingQueries,
    name: &str,
) -> Result<Record, QueryError> {
    let load_balancers = load_balancing.describe_load_balancers(name).await?;
    get_one(load_balancers, &format!("load balancer {}", name))
}

/// The target group named `name`. Names are unique per account, so more
/// than one match is `Ambiguous`.
pub async fn get_target_group(
    load_balancing: &dyn LoadBalancingQueries,
    name: &str,
) -> Result<Record, QueryError> {
    let target_groups = load_balancing.describe_target_groups(name).await?;
    single(target_groups, &format!("target group {}", name))
}

/// Listeners of the load balancer named `load_balancer`.
pub async fn list_listeners(
    load_balancing: &dyn LoadBalancingQueries,
    load_balancer: &str,
) -> Result<RecordSet, QueryError> {
    let load_balancer = get_load_balancer(load_balancing, load_balancer).await?;
    let arn = arn_of(&load_balancer, "LoadBalancerArn")?;
    load_balancing.describe_listeners(arn).await
}

/// Certificates of the HTTPS listener of `load_balancer`.
///
/// The listener is picked by `Protocol == "HTTPS"`: none is `NotFound`, more
/// than one is `Ambiguous`.
pub async fn list_listener_certificates(
    load_balancing: &dyn LoadBalancingQueries,
    load_balancer: &str,
) -> Result<RecordSet, QueryError> {
    let listeners = list_listeners(load_balancing, load_balancer).await?;
    let https: RecordSet = listeners
        .into_iter()
        .filter(|listener| listener.get_str("Protocol") == Some("HTTPS"))
        .collect();
    let listener = single(https, &format!("HTTPS listener of {}", load_balancer))?;
    let arn = arn_of(&listener, "ListenerArn")?;

    tracing::debug!(
        target: "infra_tests.adapters.load_balancing",
        load_balancer = %load_balancer,
        listener_arn = %arn,
        "Selected HTTPS listener"
    );

    load_balancing.describe_listener_certificates(arn).await
}

#[async_trait]
impl LoadBalancingQueries for AwsCli {
    async fn describe_load_balancers(&self, name: &str) -> Result<RecordSet, QueryError> {
        let response = self
            .run(&["elbv2", "describe-load-balancers", "--names", name])
            .await?;
        records_at(&response, "LoadBalancers")
    }

    async fn describe_listeners(&self, load_balancer_arn: &str) -> Result<RecordSet, QueryError> {
        let response = self
            .run(&[
                "elbv2",
                "describe-listeners",
                "--load-balancer-arn",
                load_balancer_arn,
            ])
            .await?;
        records_at(&response, "Listeners")
    }

    async fn describe_target_groups(&self, name: &str) -> Result<RecordSet, QueryError> {
        let response = self
            .run(&["elbv2", "describe-target-groups", "--names", name])
            .await?;
        records_at(&response, "TargetGroups")
    }

    async fn describe_listener_certificates(
        &self,
        listener_arn: &str,
    ) -> Result<RecordSet, QueryError> {
        let response = self
            .run(&[
                "elbv2",
                "describe-listener-certificates",
                "--listener-arn",
                listener_arn,
            ])
            .await?;
        records_at(&response, "Certificates")
    }
}
