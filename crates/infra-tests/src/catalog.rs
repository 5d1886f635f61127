//! The scenario catalog.
//!
//! Scenarios are written once with environment templates; the engine renders
//! them against the resolved context. Construction validates every template
//! and field path and rejects duplicate names, so a broken catalog fails
//! before the first provider query.

use crate::scenario::{CatalogError, Lookup, Query, Scenario, Selection};
use std::collections::HashSet;

const LOAD_BALANCER: &str = "jarombek-com-{env}-alb";
const TARGET_GROUP: &str = "jarombek-com-{env}-lb-target";
const SECURITY_GROUP: &str = "jarombek-com-{env}-lb-security-group";
const CLUSTER: &str = "jarombek-com-{env}-ecs-cluster";
const SERVICE: &str = "jarombek-com-ecs-{env}-service";
const TASK_FAMILY: &str = "jarombek-com";
const TASK_ROLE: &str = "ecs-task-role";
const REACT_DEMO: &str = "react16-3.demo.{base_domain}";
const ANYWHERE: &str = "0.0.0.0/0";

/// An ordered, validated set of scenarios.
#[derive(Debug, Clone)]
pub struct Catalog {
    scenarios: Vec<Scenario>,
}

impl Catalog {
    pub fn new(scenarios: Vec<Scenario>) -> Result<Self, CatalogError> {
        let mut names = HashSet::new();
        for scenario in &scenarios {
            if !names.insert(scenario.name.as_str()) {
                return Err(CatalogError::DuplicateScenario(scenario.name.clone()));
            }
            if scenario.checks.is_empty() && scenario.expected_count.is_none() {
                return Err(CatalogError::EmptyScenario(scenario.name.clone()));
            }
        }
        Ok(Self { scenarios })
    }

    /// The standard catalog for the website's infrastructure.
    pub fn standard() -> Result<Self, CatalogError> {
        let mut scenarios = dns_scenarios()?;
        scenarios.extend(certificate_scenarios()?);
        scenarios.extend(load_balancer_scenarios()?);
        scenarios.extend(security_group_scenarios()?);
        scenarios.extend(container_scenarios()?);
        scenarios.extend(iam_scenarios()?);
        scenarios.extend(asset_scenarios()?);
        Self::new(scenarios)
    }

    #[must_use]
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|scenario| scenario.name == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}

fn dns_scenarios() -> Result<Vec<Scenario>, CatalogError> {
    Ok(vec![
        Scenario::builder("dns.zone", Query::hosted_zone("{base_domain}.")?)
            .describe("The website's hosted zone exists and is public")
            .equals_template("Name", "{base_domain}.")
            .equals("Config.PrivateZone", false)
            .build()?,
        Scenario::builder(
            "dns.ns_record",
            Query::dns_record("{base_domain}.", "{base_domain}.", "NS")?,
        )
        .describe("The apex NS record exists")
        .equals_template("Name", "{base_domain}.")
        .equals("Type", "NS")
        .build()?,
        Scenario::builder(
            "dns.mx_record",
            Query::dns_record("{base_domain}.", "{base_domain}.", "MX")?,
        )
        .describe("The apex MX record exists")
        .equals_template("Name", "{base_domain}.")
        .equals("Type", "MX")
        .build()?,
        Scenario::builder(
            "dns.website_a_record",
            Query::dns_record("{base_domain}.", "{website_host}", "A")?,
        )
        .describe("The website's A record exists")
        .equals_template("Name", "{website_host}.")
        .equals("Type", "A")
        .build()?,
        Scenario::builder(
            "dns.website_www_cname_record",
            Query::dns_record("{base_domain}.", "www.{website_host}", "CNAME")?,
        )
        .describe("The www-prefixed website has a CNAME record")
        .equals_template("Name", "www.{website_host}.")
        .equals("Type", "CNAME")
        .build()?,
        Scenario::builder(
            "dns.asset_a_record",
            Query::dns_record("{base_domain}.", "asset.{base_domain}", "A")?,
        )
        .describe("The asset site has an A record")
        .equals_template("Name", "asset.{base_domain}.")
        .equals("Type", "A")
        .build()?,
        Scenario::builder(
            "dns.www_asset_a_record",
            Query::dns_record("{base_domain}.", "www.asset.{base_domain}", "A")?,
        )
        .describe("The www asset site has an A record")
        .equals_template("Name", "www.asset.{base_domain}.")
        .equals("Type", "A")
        .build()?,
    ])
}

fn certificate_scenarios() -> Result<Vec<Scenario>, CatalogError> {
    Ok(vec![
        Scenario::builder("acm.primary_certificate_issued", Query::IssuedCertificates)
            .describe("The primary certificate is issued")
            .select_where(&[("DomainName", "{cert_primary}")])
            .equals_template("DomainName", "{cert_primary}")
            .build()?,
        Scenario::builder("acm.secondary_certificate_issued", Query::IssuedCertificates)
            .describe("The secondary wildcard certificate is issued")
            .select_where(&[("DomainName", "{cert_secondary}")])
            .equals_template("DomainName", "{cert_secondary}")
            .build()?,
    ])
}

fn issued_certificate_arn(domain: &str) -> Result<Lookup, CatalogError> {
    Lookup::where_field(Query::IssuedCertificates, "DomainName", domain, "CertificateArn")
}

fn load_balancer_scenarios() -> Result<Vec<Scenario>, CatalogError> {
    let target_group_arn = Lookup::new(
        Query::target_group(TARGET_GROUP)?,
        Selection::Only,
        "TargetGroupArn",
    )?;

    Ok(vec![
        Scenario::builder("elb.load_balancer_active", Query::load_balancer(LOAD_BALANCER)?)
            .describe("The application load balancer is active and internet facing")
            .expect_count(1)
            .equals("Scheme", "internet-facing")
            .equals("State.Code", "active")
            .equals("Type", "application")
            .build()?,
        Scenario::builder("elb.http_listener", Query::listeners(LOAD_BALANCER)?)
            .describe("The HTTP listener redirects to HTTPS")
            .expect_count(2)
            .select_where(&[("Protocol", "HTTP")])
            .equals("Protocol", "HTTP")
            .equals("Port", 80)
            .length("DefaultActions", 1)
            .equals("DefaultActions[0].Type", "redirect")
            .equals("DefaultActions[0].RedirectConfig.Protocol", "HTTPS")
            .equals("DefaultActions[0].RedirectConfig.Port", "443")
            .equals("DefaultActions[0].RedirectConfig.StatusCode", "HTTP_301")
            .build()?,
        Scenario::builder("elb.https_listener", Query::listeners(LOAD_BALANCER)?)
            .describe("The HTTPS listener forwards to the website's target group")
            .expect_count(2)
            .select_where(&[("Protocol", "HTTPS")])
            .equals("Protocol", "HTTPS")
            .equals("Port", 443)
            .length("DefaultActions", 1)
            .equals("DefaultActions[0].Type", "forward")
            .equals_lookup("DefaultActions[0].TargetGroupArn", target_group_arn)
            .build()?,
        Scenario::builder("elb.target_group", Query::target_group(TARGET_GROUP)?)
            .describe("The target group routes HTTP to the containers with health checks")
            .equals_template("TargetGroupName", TARGET_GROUP)
            .equals("Protocol", "HTTP")
            .equals("Port", 8080)
            .equals("TargetType", "ip")
            .equals("HealthCheckProtocol", "HTTP")
            .equals("HealthCheckPort", "8080")
            .equals("HealthCheckEnabled", true)
            .equals("HealthCheckIntervalSeconds", 10)
            .equals("HealthCheckTimeoutSeconds", 5)
            .equals("HealthyThresholdCount", 3)
            .equals("UnhealthyThresholdCount", 2)
            .equals("HealthCheckPath", "/")
            .equals("Matcher.HttpCode", "200-299")
            .build()?,
        Scenario::builder(
            "elb.https_listener_certificates",
            Query::listener_certificates(LOAD_BALANCER)?,
        )
        .describe("The HTTPS listener serves both issued certificates")
        .expect_count(2)
        .select_all()
        .contains_lookup("[*].CertificateArn", issued_certificate_arn("{cert_primary}")?)
        .contains_lookup("[*].CertificateArn", issued_certificate_arn("{cert_secondary}")?)
        .build()?,
    ])
}

fn security_group_scenarios() -> Result<Vec<Scenario>, CatalogError> {
    Ok(vec![
        Scenario::builder("ec2.lb_security_group", Query::security_groups(SECURITY_GROUP)?)
            .describe("The load balancer's security group exists")
            .expect_count(1)
            .equals_template("GroupName", SECURITY_GROUP)
            .build()?,
        Scenario::builder(
            "ec2.lb_security_group_rules",
            Query::security_groups(SECURITY_GROUP)?,
        )
        .describe("The load balancer accepts HTTP and HTTPS and may reach anywhere")
        .security_group_rule("IpPermissions", "tcp", 80, 80, ANYWHERE)
        .security_group_rule("IpPermissions", "tcp", 443, 443, ANYWHERE)
        .security_group_rule("IpPermissionsEgress", "-1", 0, 0, ANYWHERE)
        .build()?,
    ])
}

fn container_scenarios() -> Result<Vec<Scenario>, CatalogError> {
    Ok(vec![
        Scenario::builder("ecs.cluster_active", Query::cluster(CLUSTER)?)
            .describe("The ECS cluster is active")
            .equals_template("clusterName", CLUSTER)
            .equals("status", "ACTIVE")
            .build()?,
        Scenario::builder("ecs.task_running", Query::tasks(CLUSTER, TASK_FAMILY)?)
            .describe("One website task runs with both of its containers")
            .expect_count(1)
            .equals("lastStatus", "RUNNING")
            .equals("desiredStatus", "RUNNING")
            .length("containers", 2)
            .equals("containers[name=jarombek-com-database].lastStatus", "RUNNING")
            .equals("containers[name=jarombek-com].lastStatus", "RUNNING")
            .build()?,
        Scenario::builder("ecs.service_running", Query::services(CLUSTER, &[SERVICE])?)
            .describe("The website service runs one Fargate task")
            .expect_count(1)
            .equals_template("serviceName", SERVICE)
            .equals("launchType", "FARGATE")
            .equals("status", "ACTIVE")
            .equals("desiredCount", 1)
            .equals("runningCount", 1)
            .equals("pendingCount", 0)
            .build()?,
    ])
}

fn iam_scenarios() -> Result<Vec<Scenario>, CatalogError> {
    Ok(vec![
        Scenario::builder("iam.ecs_task_role", Query::role(TASK_ROLE)?)
            .describe("The ECS task role exists under the admin path")
            .equals("RoleName", TASK_ROLE)
            .equals("Path", "/admin/")
            .build()?,
        Scenario::builder(
            "iam.ecs_task_policy_attached",
            Query::attached_role_policies(TASK_ROLE)?,
        )
        .describe("Only the ECS task policy is attached to the task role")
        .expect_count(1)
        .equals("PolicyName", "ecs-task-policy")
        .build()?,
    ])
}

fn asset_scenarios() -> Result<Vec<Scenario>, CatalogError> {
    Ok(vec![
        Scenario::builder("s3.asset_bucket", Query::bucket("asset.{base_domain}")?)
            .describe("The asset bucket exists and holds objects")
            .equals_template("Name", "asset.{base_domain}")
            .min_length("Contents", 1)
            .build()?,
        Scenario::builder(
            "s3.asset_bucket_public_access",
            Query::public_access_block("asset.{base_domain}")?,
        )
        .describe("The asset bucket blocks public ACLs and policies")
        .equals("PublicAccessBlockConfiguration.BlockPublicAcls", true)
        .equals("PublicAccessBlockConfiguration.IgnorePublicAcls", true)
        .equals("PublicAccessBlockConfiguration.BlockPublicPolicy", true)
        .equals("PublicAccessBlockConfiguration.RestrictPublicBuckets", true)
        .build()?,
        Scenario::builder("s3.www_asset_bucket", Query::bucket("www.asset.{base_domain}")?)
            .describe("The www asset bucket exists and is empty")
            .equals_template("Name", "www.asset.{base_domain}")
            .absent("Contents")
            .build()?,
        Scenario::builder(
            "https.asset_site_reachable",
            Query::reachability("https://asset.{base_domain}")?,
        )
        .describe("The asset site answers over HTTPS")
        .equals("Status", 200)
        .build()?,
        Scenario::builder(
            "https.www_asset_site_reachable",
            Query::reachability("https://www.asset.{base_domain}")?,
        )
        .describe("The www asset site answers over HTTPS")
        .equals("Status", 200)
        .build()?,
        Scenario::builder("s3.react_demo_bucket", Query::bucket(REACT_DEMO)?)
            .describe("The React 16.3 demo bucket exists and holds objects")
            .equals_template("Name", REACT_DEMO)
            .min_length("Contents", 1)
            .build()?,
        Scenario::builder(
            "https.react_demo_site_reachable",
            Query::reachability("https://react16-3.demo.{base_domain}")?,
        )
        .describe("The React 16.3 demo answers over HTTPS")
        .equals("Status", 200)
        .build()?,
        Scenario::builder(
            "https.www_react_demo_site_reachable",
            Query::reachability("https://www.react16-3.demo.{base_domain}")?,
        )
        .describe("The www React 16.3 demo answers over HTTPS")
        .equals("Status", 200)
        .build()?,
    ])
}
