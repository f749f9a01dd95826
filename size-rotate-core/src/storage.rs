//! S3 implementation of [`ObjectStore`].

use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;

use crate::config::RotateConfig;
use crate::contract::ObjectStore;
use crate::error::BoxError;

pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a client from the ambient AWS environment, honouring the
    /// configured region, endpoint and addressing style.
    pub async fn from_config(config: &RotateConfig) -> Self {
        let region_provider = match &config.region {
            Some(region) => RegionProviderChain::first_try(Region::new(region.clone())),
            None => RegionProviderChain::default_provider().or_else("us-east-1"),
        };
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }
        if config.force_path_style {
            builder = builder.force_path_style(true);
        }
        tracing::info!(
            region = ?shared.region(),
            endpoint = config.endpoint.as_deref().unwrap_or("<aws>"),
            "Initialized S3 client"
        );
        Self::new(Client::from_conf(builder.build()))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_file(&self, bucket: &str, key: &str, local_path: &Path) -> Result<u64, BoxError> {
        let size = tokio::fs::metadata(local_path).await?.len();
        let body = ByteStream::from_path(local_path).await?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await?;
        tracing::debug!(bucket, key, size, "put_object completed");
        Ok(size)
    }

    async fn head_object(&self, bucket: &str, key: &str) -> Result<bool, BoxError> {
        let res = self.client.head_object().bucket(bucket).key(key).send().await;
        match res {
            Ok(_) => Ok(true),
            Err(e) => {
                let service_error = e.into_service_error();
                if service_error.is_not_found() {
                    Ok(false)
                } else {
                    Err(Box::new(service_error))
                }
            }
        }
    }
}
