use std::sync::Arc;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::Region;

use crate::config::AppConfig;
use crate::storage::{ObjectStore, S3Storage};
use crate::users::{DynamoUserStore, MemoryUserStore, UserStore};

/// Shared per-process dependencies, built once in `main` and cloned into
/// every handler. The gateways sit behind traits so tests can swap in
/// in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub users: Arc<dyn UserStore>,
    pub objects: Arc<dyn ObjectStore>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = config.aws_region.clone() {
            loader = loader.region(Region::new(region));
        }
        if let (Some(endpoint), Some(access_key), Some(secret_key)) = (
            &config.aws_endpoint,
            &config.aws_access_key,
            &config.aws_secret_key,
        ) {
            loader = loader
                .endpoint_url(endpoint)
                .credentials_provider(Credentials::new(
                    access_key.as_str(),
                    secret_key.as_str(),
                    None,
                    None,
                    "static",
                ));
        }
        let shared = loader.load().await;

        let users = Arc::new(DynamoUserStore::new(
            aws_sdk_dynamodb::Client::new(&shared),
            &config.users_table,
        )) as Arc<dyn UserStore>;

        let objects = Arc::new(S3Storage::new(
            &shared,
            &config.bucket,
            config.aws_endpoint.as_deref(),
        )) as Arc<dyn ObjectStore>;

        Ok(Self {
            config,
            users,
            objects,
        })
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        users: Arc<dyn UserStore>,
        objects: Arc<dyn ObjectStore>,
    ) -> Self {
        Self {
            config,
            users,
            objects,
        }
    }

    pub fn fake() -> Self {
        use async_trait::async_trait;

        struct FakeObjects;
        #[async_trait]
        impl ObjectStore for FakeObjects {
            async fn presign_upload(
                &self,
                key: &str,
                _content_type: &str,
                expires_secs: u64,
            ) -> anyhow::Result<String> {
                Ok(format!(
                    "https://fake.local/{}?X-Amz-Expires={}",
                    key, expires_secs
                ))
            }
            async fn delete_object(&self, _key: &str) -> anyhow::Result<()> {
                Ok(())
            }
            fn object_url(&self, key: &str) -> String {
                format!("https://fake.local/{}", key)
            }
        }

        let config = Arc::new(AppConfig {
            users_table: "Users".into(),
            bucket: "fake".into(),
            upload_ttl_secs: 3600,
            aws_region: None,
            aws_endpoint: None,
            aws_access_key: None,
            aws_secret_key: None,
        });

        Self::from_parts(
            config,
            Arc::new(MemoryUserStore::default()),
            Arc::new(FakeObjects),
        )
    }
}
