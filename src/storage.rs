use anyhow::Context;
use aws_config::{defaults, BehaviorVersion};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    config::{Builder as S3ConfigBuilder, Region},
    Client,
};
use aws_smithy_types::byte_stream::ByteStream;
use axum::async_trait;
use bytes::Bytes;

use crate::config::MediaConfig;

/// Handle to an uploaded media object: the serving URL plus the key needed
/// to delete the asset later.
#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub url: String,
    pub public_id: String,
}

/// Two-call contract with the media provider: upload and delete.
#[async_trait]
pub trait MediaStore: Send + Sync {
    async fn upload(&self, key: &str, body: Bytes, content_type: &str)
        -> anyhow::Result<MediaAsset>;
    async fn delete(&self, public_id: &str) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct S3MediaStore {
    client: Client,
    bucket: String,
    endpoint: String,
}

impl S3MediaStore {
    pub async fn new(cfg: &MediaConfig) -> anyhow::Result<Self> {
        let shared = defaults(BehaviorVersion::latest())
            .region(Region::new(cfg.region.clone()))
            .credentials_provider(Credentials::new(
                cfg.access_key.clone(),
                cfg.secret_key.clone(),
                None,
                None,
                "static",
            ))
            .endpoint_url(&cfg.endpoint)
            .load()
            .await;

        let conf = S3ConfigBuilder::from(&shared)
            .endpoint_url(&cfg.endpoint)
            .force_path_style(true)
            .build();

        Ok(Self {
            client: Client::from_conf(conf),
            bucket: cfg.bucket.clone(),
            endpoint: cfg.endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn object_url(&self, key: &str) -> String {
        // Path-style addressing, matching force_path_style above.
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}

#[async_trait]
impl MediaStore for S3MediaStore {
    async fn upload(
        &self,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> anyhow::Result<MediaAsset> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .context("s3 put_object")?;
        Ok(MediaAsset {
            url: self.object_url(key),
            public_id: key.to_string(),
        })
    }

    async fn delete(&self, public_id: &str) -> anyhow::Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(public_id)
            .send()
            .await
            .context("s3 delete_object")?;
        Ok(())
    }
}
