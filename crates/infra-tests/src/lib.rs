//! Infrastructure Assertion Harness
//!
//! Validates the live cloud configuration behind jarombek.com (DNS, TLS
//! certificates, the application load balancer, security groups, the ECS
//! cluster, IAM roles and the asset buckets) against a declarative baseline for the
//! `prod` or `dev` environment. Nothing is ever mutated.
//!
//! A run resolves the [`environment::EnvironmentContext`] once, evaluates
//! every [`scenario::Scenario`] of the [`catalog::Catalog`] through the
//! [`engine::AssertionEngine`], and folds the outcomes into a
//! [`report::Summary`].
//!
//! # Features
//!
//! - `live`: Integration tests that query the real AWS account (requires
//!   credentials and the `aws` CLI in PATH)
//!
//! # Usage
//!
//! ```bash
//! # Unit and mock-backed integration tests
//! cargo test -p infra-tests
//!
//! # Run the harness against dev
//! TEST_ENV=dev cargo run -p infra-tests
//!
//! # Live integration tests
//! cargo test -p infra-tests --features live
//! ```

pub mod adapters;
pub mod assertion;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod environment;
pub mod field_path;
pub mod report;
pub mod runner;
pub mod scenario;
