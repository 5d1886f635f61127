//! Read-only resource query adapters.
//!
//! Each provider domain is its own async trait. The live implementations shell
//! out to the AWS CLI ([`aws_cli::AwsCli`]) or issue HTTPS requests
//! ([`reachability::HttpProber`]); [`mock::MockInfrastructure`] implements
//! every trait in memory for tests. Selection logic that spans several calls
//! lives in free functions next to each trait.
//!
//! Adapters never retry and never cache.

pub mod aws_cli;
pub mod certificates;
pub mod containers;
pub mod dns;
pub mod iam;
pub mod load_balancing;
pub mod mock;
pub mod object_storage;
pub mod reachability;
pub mod security_groups;

use crate::config::HarnessConfig;
use aws_cli::AwsCli;
use certificates::CertificateQueries;
use common::{QueryError, Record, RecordSet};
use containers::ContainerQueries;
use dns::DnsQueries;
use iam::IamQueries;
use load_balancing::LoadBalancingQueries;
use mock::MockInfrastructure;
use object_storage::ObjectStorageQueries;
use reachability::{HttpProber, ReachabilityProbe};
use security_groups::SecurityGroupQueries;
use std::sync::Arc;

/// The set of adapters the engine queries through.
#[derive(Clone)]
pub struct Providers {
    pub dns: Arc<dyn DnsQueries>,
    pub certificates: Arc<dyn CertificateQueries>,
    pub load_balancing: Arc<dyn LoadBalancingQueries>,
    pub security_groups: Arc<dyn SecurityGroupQueries>,
    pub containers: Arc<dyn ContainerQueries>,
    pub object_storage: Arc<dyn ObjectStorageQueries>,
    pub reachability: Arc<dyn ReachabilityProbe>,
    pub iam: Arc<dyn IamQueries>,
}

impl Providers {
    /// Live adapters: the AWS CLI for provider APIs and reqwest for probes.
    pub fn live(config: &HarnessConfig) -> Result<Self, QueryError> {
        let cli = Arc::new(AwsCli::new(config.aws_cli_path.clone(), config.query_timeout));
        let prober = Arc::new(HttpProber::new(config.probe_timeout)?);

        Ok(Self {
            dns: cli.clone(),
            certificates: cli.clone(),
            load_balancing: cli.clone(),
            security_groups: cli.clone(),
            containers: cli.clone(),
            object_storage: cli.clone(),
            reachability: prober,
            iam: cli,
        })
    }

    /// Every adapter backed by the same in-memory infrastructure.
    pub fn from_mock(mock: Arc<MockInfrastructure>) -> Self {
        Self {
            dns: mock.clone(),
            certificates: mock.clone(),
            load_balancing: mock.clone(),
            security_groups: mock.clone(),
            containers: mock.clone(),
            object_storage: mock.clone(),
            reachability: mock.clone(),
            iam: mock,
        }
    }
}

/// First record of a set; `NotFound` if the set is empty.
pub fn get_one(records: RecordSet, what: &str) -> Result<Record, QueryError> {
    records
        .into_iter()
        .next()
        .ok_or_else(|| QueryError::NotFound(what.to_string()))
}

/// The only record of a set; `NotFound` if empty, `Ambiguous` if several.
pub fn single(records: RecordSet, what: &str) -> Result<Record, QueryError> {
    let count = records.len();
    let mut records = records.into_iter();
    match (records.next(), count) {
        (Some(record), 1) => Ok(record),
        (None, _) => Err(QueryError::NotFound(what.to_string())),
        (Some(_), count) => Err(QueryError::Ambiguous {
            what: what.to_string(),
            count,
        }),
    }
}
