use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub users_table: String,
    pub bucket: String,
    pub upload_ttl_secs: u64,
    pub aws_region: Option<String>,
    pub aws_endpoint: Option<String>,
    pub aws_access_key: Option<String>,
    pub aws_secret_key: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let upload_ttl_secs = match std::env::var("UPLOAD_TTL_SECS") {
            Ok(v) => v
                .parse::<u64>()
                .context("UPLOAD_TTL_SECS must be a number of seconds")?,
            Err(_) => 3600,
        };

        Ok(Self {
            users_table: std::env::var("USERS_TABLE").unwrap_or_else(|_| "Users".into()),
            bucket: std::env::var("PROFILE_BUCKET")
                .unwrap_or_else(|_| "profile-images-auth-app".into()),
            upload_ttl_secs,
            aws_region: std::env::var("AWS_REGION").ok(),
            // Endpoint override plus static credentials for LocalStack/MinIO
            // deployments; absent in real AWS, where the default chain applies.
            aws_endpoint: std::env::var("AWS_ENDPOINT_URL").ok(),
            aws_access_key: std::env::var("AWS_ACCESS_KEY_ID").ok(),
            aws_secret_key: std::env::var("AWS_SECRET_ACCESS_KEY").ok(),
        })
    }
}
