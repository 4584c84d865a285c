use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_s3::{
    config::Builder as S3ConfigBuilder, presigning::PresigningConfig, Client,
};

/// Object-store gateway. Uploads never pass through this service: callers
/// receive a presigned URL and PUT the bytes to the bucket themselves.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Presigned PUT for one key, valid for `expires_secs`. The key is not
    /// reserved and may already exist.
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        expires_secs: u64,
    ) -> anyhow::Result<String>;

    /// Deleting an absent key succeeds (S3 delete semantics).
    async fn delete_object(&self, key: &str) -> anyhow::Result<()>;

    /// Public URL a stored record points at for `key`.
    fn object_url(&self, key: &str) -> String;
}

pub struct S3Storage {
    client: Client,
    bucket: String,
}

impl S3Storage {
    pub fn new(shared: &SdkConfig, bucket: &str, endpoint: Option<&str>) -> Self {
        let client = match endpoint {
            Some(url) => {
                let conf = S3ConfigBuilder::from(shared)
                    .endpoint_url(url)
                    .force_path_style(true)
                    .build();
                Client::from_conf(conf)
            }
            None => Client::new(shared),
        };
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    async fn presign_upload(
        &self,
        key: &str,
        content_type: &str,
        expires_secs: u64,
    ) -> anyhow::Result<String> {
        let req = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type);
        let presigned = req
            .presigned(PresigningConfig::expires_in(Duration::from_secs(
                expires_secs,
            ))?)
            .await
            .context("s3 presign put_object")?;
        Ok(presigned.uri().to_string())
    }

    async fn delete_object(&self, key: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }

    fn object_url(&self, key: &str) -> String {
        format!("https://{}.s3.amazonaws.com/{}", self.bucket, key)
    }
}
