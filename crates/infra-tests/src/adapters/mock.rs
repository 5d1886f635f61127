//! In-memory infrastructure implementing every adapter trait.
//!
//! [`MockInfrastructure::healthy`] seeds resources that satisfy the standard
//! catalog for the given environment. The `with_*` methods replace parts of
//! it to stage failures.

use super::certificates::CertificateQueries;
use super::containers::{ContainerQueries, RUNNING};
use super::dns::{normalize_name, DnsQueries};
use super::iam::IamQueries;
use super::load_balancing::LoadBalancingQueries;
use super::object_storage::ObjectStorageQueries;
use super::reachability::ReachabilityProbe;
use super::security_groups::SecurityGroupQueries;
use crate::environment::EnvironmentContext;
use async_trait::async_trait;
use common::{QueryError, Record, RecordSet};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

const ACCOUNT: &str = "123456789012";
const REGION: &str = "us-east-1";

/// Hosted zone id the mock assigns to a zone name.
#[must_use]
pub fn zone_id(zone_name: &str) -> String {
    let name = normalize_name(zone_name);
    format!(
        "/hostedzone/Z{}",
        name.trim_end_matches('.').replace('.', "").to_ascii_uppercase()
    )
}

/// Load balancer ARN the mock assigns to a load balancer name.
#[must_use]
pub fn load_balancer_arn(name: &str) -> String {
    format!(
        "arn:aws:elasticloadbalancing:{}:{}:loadbalancer/app/{}/50dc6c495c0c9188",
        REGION, ACCOUNT, name
    )
}

fn listener_arn(load_balancer: &str, protocol: &str) -> String {
    format!(
        "arn:aws:elasticloadbalancing:{}:{}:listener/app/{}/50dc6c495c0c9188/{}",
        REGION,
        ACCOUNT,
        load_balancer,
        protocol.to_ascii_lowercase()
    )
}

fn target_group_arn(name: &str) -> String {
    format!(
        "arn:aws:elasticloadbalancing:{}:{}:targetgroup/{}/73e2d6bc24d8a067",
        REGION, ACCOUNT, name
    )
}

fn certificate_arn(id: &str) -> String {
    format!("arn:aws:acm:{}:{}:certificate/{}", REGION, ACCOUNT, id)
}

fn records(values: &[Value]) -> Result<RecordSet, QueryError> {
    Record::set_from_value(Value::Array(values.to_vec()))
}

fn str_field<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value.get(field).and_then(Value::as_str)
}

/// In-memory cloud account.
#[derive(Debug, Default)]
pub struct MockInfrastructure {
    zones: Vec<Value>,
    /// Keyed by hosted zone id.
    record_sets: HashMap<String, Vec<Value>>,
    certificates: Vec<Value>,
    load_balancers: Vec<Value>,
    /// Keyed by load balancer ARN.
    listeners: HashMap<String, Vec<Value>>,
    /// Keyed by listener ARN.
    listener_certificates: HashMap<String, Vec<Value>>,
    target_groups: Vec<Value>,
    security_groups: Vec<Value>,
    clusters: Vec<Value>,
    /// Keyed by cluster name.
    tasks: HashMap<String, Vec<Value>>,
    /// Keyed by cluster name.
    services: HashMap<String, Vec<Value>>,
    buckets: HashMap<String, Value>,
    /// Keyed by bucket name.
    public_access_blocks: HashMap<String, Value>,
    sites: HashMap<String, u16>,
    roles: Vec<Value>,
    /// Keyed by role name.
    attached_policies: HashMap<String, Vec<Value>>,
    call_count: AtomicUsize,
    failure: Option<String>,
}

impl MockInfrastructure {
    /// An account with no resources.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// An account whose resources pass every standard scenario for `context`.
    #[must_use]
    pub fn healthy(context: &EnvironmentContext) -> Self {
        let env = context.name.as_str();
        let base = context.base_domain.as_str();
        let host = context.website_host.as_str();

        let alb = format!("jarombek-com-{}-alb", env);
        let target_group = format!("jarombek-com-{}-lb-target", env);
        let security_group = format!("jarombek-com-{}-lb-security-group", env);
        let cluster = format!("jarombek-com-{}-ecs-cluster", env);
        let service = format!("jarombek-com-ecs-{}-service", env);
        let primary_cert = certificate_arn(&format!("{}-primary", env));
        let secondary_cert = certificate_arn(&format!("{}-secondary", env));
        let asset_bucket = format!("asset.{}", base);
        let www_asset_bucket = format!("www.asset.{}", base);

        let zone_name = normalize_name(base);
        let mut record_sets = vec![
            json!({
                "Name": zone_name,
                "Type": "NS",
                "TTL": 172_800,
                "ResourceRecords": [
                    {"Value": "ns-1536.awsdns-00.co.uk."},
                    {"Value": "ns-0.awsdns-00.com."}
                ]
            }),
            json!({
                "Name": zone_name,
                "Type": "MX",
                "TTL": 300,
                "ResourceRecords": [{"Value": format!("10 mail.{}", base)}]
            }),
            json!({
                "Name": normalize_name(host),
                "Type": "A",
                "AliasTarget": {
                    "DNSName": format!("{}-1234567890.{}.elb.amazonaws.com.", alb, REGION),
                    "EvaluateTargetHealth": true
                }
            }),
            json!({
                "Name": normalize_name(&format!("www.{}", host)),
                "Type": "CNAME",
                "TTL": 300,
                "ResourceRecords": [{"Value": host}]
            }),
        ];
        if host != base {
            record_sets.push(json!({"Name": zone_name, "Type": "A"}));
        }
        for asset_host in [&asset_bucket, &www_asset_bucket] {
            record_sets.push(json!({
                "Name": normalize_name(asset_host),
                "Type": "A",
                "AliasTarget": {
                    "DNSName": "d1k2l3m4n5o6p7.cloudfront.net.",
                    "EvaluateTargetHealth": false
                }
            }));
        }

        let mut mock = Self {
            zones: vec![json!({
                "Id": zone_id(base),
                "Name": zone_name,
                "Config": {"PrivateZone": false},
                "ResourceRecordSetCount": record_sets.len()
            })],
            certificates: vec![
                json!({
                    "CertificateArn": primary_cert,
                    "DomainName": context.cert_primary(),
                    "Status": "ISSUED"
                }),
                json!({
                    "CertificateArn": secondary_cert,
                    "DomainName": context.cert_secondary(),
                    "Status": "ISSUED"
                }),
                json!({
                    "CertificateArn": certificate_arn("expired"),
                    "DomainName": context.cert_primary(),
                    "Status": "EXPIRED"
                }),
            ],
            load_balancers: vec![json!({
                "LoadBalancerName": alb,
                "LoadBalancerArn": load_balancer_arn(&alb),
                "Scheme": "internet-facing",
                "State": {"Code": "active"},
                "Type": "application",
                "IpAddressType": "ipv4"
            })],
            target_groups: vec![json!({
                "TargetGroupName": target_group,
                "TargetGroupArn": target_group_arn(&target_group),
                "Protocol": "HTTP",
                "Port": 8080,
                "TargetType": "ip",
                "HealthCheckProtocol": "HTTP",
                "HealthCheckPort": "8080",
                "HealthCheckEnabled": true,
                "HealthCheckIntervalSeconds": 10,
                "HealthCheckTimeoutSeconds": 5,
                "HealthyThresholdCount": 3,
                "UnhealthyThresholdCount": 2,
                "HealthCheckPath": "/",
                "Matcher": {"HttpCode": "200-299"}
            })],
            security_groups: vec![json!({
                "GroupName": security_group,
                "GroupId": "sg-0a1b2c3d4e5f60718",
                "Tags": [{"Key": "Name", "Value": security_group}],
                "IpPermissions": [
                    {
                        "IpProtocol": "tcp",
                        "FromPort": 443,
                        "ToPort": 443,
                        "IpRanges": [{"CidrIp": "0.0.0.0/0"}]
                    },
                    {
                        "IpProtocol": "tcp",
                        "FromPort": 80,
                        "ToPort": 80,
                        "IpRanges": [{"CidrIp": "0.0.0.0/0"}]
                    }
                ],
                "IpPermissionsEgress": [
                    {"IpProtocol": "-1", "IpRanges": [{"CidrIp": "0.0.0.0/0"}]}
                ]
            })],
            clusters: vec![json!({
                "clusterName": cluster,
                "clusterArn": format!("arn:aws:ecs:{}:{}:cluster/{}", REGION, ACCOUNT, cluster),
                "status": "ACTIVE",
                "runningTasksCount": 1
            })],
            roles: vec![json!({
                "RoleName": "ecs-task-role",
                "Path": "/admin/",
                "Arn": format!("arn:aws:iam::{}:role/admin/ecs-task-role", ACCOUNT)
            })],
            ..Self::default()
        };

        mock.record_sets.insert(zone_id(base), record_sets);
        mock.listeners.insert(
            load_balancer_arn(&alb),
            vec![
                json!({
                    "ListenerArn": listener_arn(&alb, "HTTP"),
                    "Protocol": "HTTP",
                    "Port": 80,
                    "DefaultActions": [{
                        "Type": "redirect",
                        "RedirectConfig": {
                            "Protocol": "HTTPS",
                            "Port": "443",
                            "Host": "#{host}",
                            "StatusCode": "HTTP_301"
                        }
                    }]
                }),
                json!({
                    "ListenerArn": listener_arn(&alb, "HTTPS"),
                    "Protocol": "HTTPS",
                    "Port": 443,
                    "Certificates": [{"CertificateArn": primary_cert}],
                    "DefaultActions": [{
                        "Type": "forward",
                        "TargetGroupArn": target_group_arn(&target_group)
                    }]
                }),
            ],
        );
        mock.listener_certificates.insert(
            listener_arn(&alb, "HTTPS"),
            vec![
                json!({"CertificateArn": secondary_cert, "IsDefault": false}),
                json!({"CertificateArn": primary_cert, "IsDefault": true}),
            ],
        );
        mock.tasks.insert(
            cluster.clone(),
            vec![json!({
                "taskArn": format!("arn:aws:ecs:{}:{}:task/{}/0f1e2d3c", REGION, ACCOUNT, cluster),
                "taskDefinitionArn": format!(
                    "arn:aws:ecs:{}:{}:task-definition/jarombek-com:42",
                    REGION, ACCOUNT
                ),
                "lastStatus": RUNNING,
                "desiredStatus": RUNNING,
                "launchType": "FARGATE",
                "containers": [
                    {"name": "jarombek-com-database", "lastStatus": RUNNING},
                    {"name": "jarombek-com", "lastStatus": RUNNING}
                ]
            })],
        );
        mock.services.insert(
            cluster,
            vec![json!({
                "serviceName": service,
                "launchType": "FARGATE",
                "status": "ACTIVE",
                "desiredCount": 1,
                "runningCount": 1,
                "pendingCount": 0
            })],
        );
        mock.buckets.insert(
            asset_bucket.clone(),
            json!({
                "Name": asset_bucket,
                "Contents": [
                    {"Key": "jarombek.png", "Size": 24_032},
                    {"Key": "fonts/FantasqueSansMono-Regular.ttf", "Size": 114_820}
                ]
            }),
        );
        mock.buckets
            .insert(www_asset_bucket.clone(), json!({"Name": www_asset_bucket}));
        mock.public_access_blocks.insert(
            asset_bucket,
            json!({
                "BlockPublicAcls": true,
                "IgnorePublicAcls": true,
                "BlockPublicPolicy": true,
                "RestrictPublicBuckets": true
            }),
        );
        mock.attached_policies.insert(
            "ecs-task-role".to_string(),
            vec![json!({
                "PolicyName": "ecs-task-policy",
                "PolicyArn": format!("arn:aws:iam::{}:policy/ecs-task-policy", ACCOUNT)
            })],
        );
        let react_demo = format!("react16-3.demo.{}", base);
        mock.buckets.insert(
            react_demo.clone(),
            json!({
                "Name": react_demo,
                "Contents": [
                    {"Key": "index.html", "Size": 1_571},
                    {"Key": "bundle.js", "Size": 131_072}
                ]
            }),
        );
        mock.sites.insert(format!("https://{}", react_demo), 200);
        mock.sites.insert(format!("https://www.{}", react_demo), 200);
        mock.sites.insert(format!("https://asset.{}", base), 200);
        mock.sites.insert(format!("https://www.asset.{}", base), 200);

        mock
    }

    /// Replace the record sets of the zone named `zone_name`.
    #[must_use]
    pub fn with_record_sets(mut self, zone_name: &str, record_sets: Vec<Value>) -> Self {
        self.record_sets.insert(zone_id(zone_name), record_sets);
        self
    }

    #[must_use]
    pub fn with_certificates(mut self, certificates: Vec<Value>) -> Self {
        self.certificates = certificates;
        self
    }

    /// Replace the listeners of the load balancer named `load_balancer`.
    #[must_use]
    pub fn with_listeners(mut self, load_balancer: &str, listeners: Vec<Value>) -> Self {
        self.listeners
            .insert(load_balancer_arn(load_balancer), listeners);
        self
    }

    #[must_use]
    pub fn with_listener_certificates(mut self, listener_arn: &str, certificates: Vec<Value>) -> Self {
        self.listener_certificates
            .insert(listener_arn.to_string(), certificates);
        self
    }

    #[must_use]
    pub fn with_target_groups(mut self, target_groups: Vec<Value>) -> Self {
        self.target_groups = target_groups;
        self
    }

    #[must_use]
    pub fn with_security_groups(mut self, security_groups: Vec<Value>) -> Self {
        self.security_groups = security_groups;
        self
    }

    /// Replace the tasks of the cluster named `cluster`.
    #[must_use]
    pub fn with_tasks(mut self, cluster: &str, tasks: Vec<Value>) -> Self {
        self.tasks.insert(cluster.to_string(), tasks);
        self
    }

    #[must_use]
    pub fn without_bucket(mut self, bucket: &str) -> Self {
        self.buckets.remove(bucket);
        self
    }

    /// Replace the `PublicAccessBlockConfiguration` of `bucket`.
    #[must_use]
    pub fn with_public_access_block(mut self, bucket: &str, configuration: Value) -> Self {
        self.public_access_blocks
            .insert(bucket.to_string(), configuration);
        self
    }

    /// Replace the managed policies attached to `role`.
    #[must_use]
    pub fn with_attached_policies(mut self, role: &str, policies: Vec<Value>) -> Self {
        self.attached_policies.insert(role.to_string(), policies);
        self
    }

    #[must_use]
    pub fn with_site_status(mut self, url: &str, status: u16) -> Self {
        self.sites.insert(url.to_string(), status);
        self
    }

    /// Fail every query with a transport error.
    #[must_use]
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Number of provider calls made so far.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn begin_call(&self) -> Result<(), QueryError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(message) => Err(QueryError::Transport(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DnsQueries for MockInfrastructure {
    async fn list_hosted_zones(&self, _dns_name: &str) -> Result<RecordSet, QueryError> {
        self.begin_call()?;
        records(&self.zones)
    }

    async fn list_record_sets(
        &self,
        zone_id: &str,
        _name: &str,
        _record_type: &str,
    ) -> Result<RecordSet, QueryError> {
        self.begin_call()?;
        match self.record_sets.get(zone_id) {
            Some(record_sets) => records(record_sets),
            None => Err(QueryError::NotFound(format!(
                "NoSuchHostedZone: No hosted zone found with ID: {}",
                zone_id
            ))),
        }
    }
}

#[async_trait]
impl CertificateQueries for MockInfrastructure {
    async fn list_certificates(&self, statuses: &[&str]) -> Result<RecordSet, QueryError> {
        self.begin_call()?;
        let listed: Vec<Value> = self
            .certificates
            .iter()
            .filter(|cert| str_field(cert, "Status").is_none_or(|status| statuses.contains(&status)))
            .cloned()
            .collect();
        records(&listed)
    }
}

#[async_trait]
impl LoadBalancingQueries for MockInfrastructure {
    async fn describe_load_balancers(&self, name: &str) -> Result<RecordSet, QueryError> {
        self.begin_call()?;
        let matching: Vec<Value> = self
            .load_balancers
            .iter()
            .filter(|lb| str_field(lb, "LoadBalancerName") == Some(name))
            .cloned()
            .collect();
        if matching.is_empty() {
            return Err(QueryError::NotFound(format!(
                "LoadBalancerNotFound: Load balancers '[{}]' not found",
                name
            )));
        }
        records(&matching)
    }

    async fn describe_listeners(&self, load_balancer_arn: &str) -> Result<RecordSet, QueryError> {
        self.begin_call()?;
        records(
            self.listeners
                .get(load_balancer_arn)
                .map_or(&[][..], Vec::as_slice),
        )
    }

    async fn describe_target_groups(&self, name: &str) -> Result<RecordSet, QueryError> {
        self.begin_call()?;
        let matching: Vec<Value> = self
            .target_groups
            .iter()
            .filter(|tg| str_field(tg, "TargetGroupName") == Some(name))
            .cloned()
            .collect();
        if matching.is_empty() {
            return Err(QueryError::NotFound(format!(
                "TargetGroupNotFound: Target groups '[{}]' not found",
                name
            )));
        }
        records(&matching)
    }

    async fn describe_listener_certificates(
        &self,
        listener_arn: &str,
    ) -> Result<RecordSet, QueryError> {
        self.begin_call()?;
        match self.listener_certificates.get(listener_arn) {
            Some(certificates) => records(certificates),
            None => Err(QueryError::NotFound(format!(
                "ListenerNotFound: One or more listeners not found: {}",
                listener_arn
            ))),
        }
    }
}

#[async_trait]
impl SecurityGroupQueries for MockInfrastructure {
    async fn list_security_groups(&self, name_tag: &str) -> Result<RecordSet, QueryError> {
        self.begin_call()?;
        let matching: Vec<Value> = self
            .security_groups
            .iter()
            .filter(|group| {
                group
                    .get("Tags")
                    .and_then(Value::as_array)
                    .is_some_and(|tags| {
                        tags.iter().any(|tag| {
                            str_field(tag, "Key") == Some("Name")
                                && str_field(tag, "Value") == Some(name_tag)
                        })
                    })
            })
            .cloned()
            .collect();
        records(&matching)
    }
}

#[async_trait]
impl ContainerQueries for MockInfrastructure {
    async fn describe_clusters(&self, names: &[String]) -> Result<RecordSet, QueryError> {
        self.begin_call()?;
        let matching: Vec<Value> = self
            .clusters
            .iter()
            .filter(|cluster| {
                str_field(cluster, "clusterName").is_some_and(|name| names.iter().any(|n| n == name))
            })
            .cloned()
            .collect();
        records(&matching)
    }

    async fn list_running_task_arns(
        &self,
        cluster: &str,
        family: &str,
    ) -> Result<Vec<String>, QueryError> {
        self.begin_call()?;
        let family_marker = format!("task-definition/{}:", family);
        let arns = self
            .tasks
            .get(cluster)
            .map(|tasks| {
                tasks
                    .iter()
                    .filter(|task| {
                        str_field(task, "desiredStatus") == Some(RUNNING)
                            && str_field(task, "taskDefinitionArn")
                                .is_some_and(|arn| arn.contains(&family_marker))
                    })
                    .filter_map(|task| str_field(task, "taskArn").map(str::to_string))
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
        self.begin_call()?;
        let matching: Vec<Value> = self
            .tasks
            .get(cluster)
            .map(|tasks| {
                tasks
                    .iter()
                    .filter(|task| {
                        str_field(task, "taskArn").is_some_and(|arn| arns.iter().any(|a| a == arn))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        records(&matching)
    }

    async fn describe_services(
        &self,
        cluster: &str,
        names: &[String],
    ) -> Result<RecordSet, QueryError> {
        self.begin_call()?;
        if !self.clusters.iter().any(|c| str_field(c, "clusterName") == Some(cluster)) {
            return Err(QueryError::NotFound(format!(
                "ClusterNotFoundException: Cluster not found: {}",
                cluster
            )));
        }
        let matching: Vec<Value> = self
            .services
            .get(cluster)
            .map(|services| {
                services
                    .iter()
                    .filter(|service| {
                        str_field(service, "serviceName")
                            .is_some_and(|name| names.iter().any(|n| n == name))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        records(&matching)
    }
}

#[async_trait]
impl ObjectStorageQueries for MockInfrastructure {
    async fn list_objects(&self, bucket: &str) -> Result<Record, QueryError> {
        self.begin_call()?;
        match self.buckets.get(bucket) {
            Some(listing) => Record::from_value(listing.clone()),
            None => Err(QueryError::NotFound(format!(
                "NoSuchBucket: The specified bucket does not exist: {}",
                bucket
            ))),
        }
    }

    async fn get_public_access_block(&self, bucket: &str) -> Result<Record, QueryError> {
        self.begin_call()?;
        match self.public_access_blocks.get(bucket) {
            Some(configuration) => Ok(Record::new()
                .with("Bucket", bucket)
                .with("PublicAccessBlockConfiguration", configuration.clone())),
            None => Err(QueryError::NotFound(format!(
                "NoSuchPublicAccessBlockConfiguration: The public access block configuration was not found: {}",
                bucket
            ))),
        }
    }
}

#[async_trait]
impl IamQueries for MockInfrastructure {
    async fn get_role(&self, name: &str) -> Result<Record, QueryError> {
        self.begin_call()?;
        match self
            .roles
            .iter()
            .find(|role| str_field(role, "RoleName") == Some(name))
        {
            Some(role) => Record::from_value(role.clone()),
            None => Err(QueryError::NotFound(format!(
                "NoSuchEntity: The role with name {} cannot be found.",
                name
            ))),
        }
    }

    async fn list_attached_role_policies(&self, role: &str) -> Result<RecordSet, QueryError> {
        self.begin_call()?;
        if !self.roles.iter().any(|r| str_field(r, "RoleName") == Some(role)) {
            return Err(QueryError::NotFound(format!(
                "NoSuchEntity: The role with name {} cannot be found.",
                role
            )));
        }
        records(
            self.attached_policies
                .get(role)
                .map_or(&[][..], Vec::as_slice),
        )
    }
}

#[async_trait]
impl ReachabilityProbe for MockInfrastructure {
    async fn probe(&self, url: &str) -> Result<Record, QueryError> {
        self.begin_call()?;
        match self.sites.get(url) {
            Some(status) => Ok(Record::new().with("Url", url).with("Status", *status)),
            None => Err(QueryError::Transport(format!("GET {} connection failed", url))),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::environment::Environment;

    fn prod() -> EnvironmentContext {
        EnvironmentContext::for_environment(Environment::Prod, "jarombek.com")
    }

    #[tokio::test]
    async fn test_call_count() {
        let mock = MockInfrastructure::healthy(&prod());
        assert_eq!(mock.call_count(), 0);

        mock.list_hosted_zones("jarombek.com.").await.unwrap();
        mock.list_certificates(&["ISSUED"]).await.unwrap();
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let mock = MockInfrastructure::healthy(&prod()).failing("Unable to locate credentials");

        let err = mock.list_objects("asset.jarombek.com").await.unwrap_err();
        assert_eq!(
            err,
            QueryError::Transport("Unable to locate credentials".to_string())
        );
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_bucket_is_not_found() {
        let mock = MockInfrastructure::healthy(&prod()).without_bucket("asset.jarombek.com");
        let err = mock.list_objects("asset.jarombek.com").await.unwrap_err();
        assert!(matches!(err, QueryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_public_access_block_only_on_asset_bucket() {
        let mock = MockInfrastructure::healthy(&prod());

        let block = mock.get_public_access_block("asset.jarombek.com").await.unwrap();
        assert_eq!(block.get_str("Bucket"), Some("asset.jarombek.com"));
        assert_eq!(
            block
                .get("PublicAccessBlockConfiguration")
                .and_then(|c| c.get("RestrictPublicBuckets")),
            Some(&json!(true))
        );

        let err = mock
            .get_public_access_block("www.asset.jarombek.com")
            .await
            .unwrap_err();
        assert!(matches!(err, QueryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_account() {
        let mock = MockInfrastructure::empty();
        assert!(mock.list_hosted_zones("jarombek.com.").await.unwrap().is_empty());
        assert!(mock
            .list_security_groups("jarombek-com-prod-lb-security-group")
            .await
            .unwrap()
            .is_empty());
    }
}
