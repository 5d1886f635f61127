//! Object storage buckets.

use super::aws_cli::AwsCli;
use async_trait::async_trait;
use common::{QueryError, Record};

#[async_trait]
pub trait ObjectStorageQueries: Send + Sync {
    /// Listing of a bucket: `Name` plus `Contents` when the bucket holds
    /// objects. A missing bucket is `NotFound`.
    async fn list_objects(&self, bucket: &str) -> Result<Record, QueryError>;

    /// `{Bucket, PublicAccessBlockConfiguration}` of a bucket. A bucket
    /// without a block configuration is `NotFound`.
    async fn get_public_access_block(&self, bucket: &str) -> Result<Record, QueryError>;
}

#[async_trait]
impl ObjectStorageQueries for AwsCli {
    async fn list_objects(&self, bucket: &str) -> Result<Record, QueryError> {
        let response = self
            .run(&[
                "s3api",
                "list-objects-v2",
                "--bucket",
                bucket,
                "--max-items",
                "100",
            ])
            .await?;

        let record = Record::from_value(response)?;
        if record.contains("Name") {
            Ok(record)
        } else {
            Ok(record.with("Name", bucket))
        }
    }

    async fn get_public_access_block(&self, bucket: &str) -> Result<Record, QueryError> {
        let response = self
            .run(&["s3api", "get-public-access-block", "--bucket", bucket])
            .await?;
        Ok(Record::from_value(response)?.with("Bucket", bucket))
    }
}
