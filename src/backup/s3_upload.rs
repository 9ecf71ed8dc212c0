// logsink/src/backup/s3_upload.rs
use anyhow::{Context, Result};
use aws_sdk_s3 as s3;
use s3::config::Region;
use s3::primitives::ByteStream;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::artifact::{matches_artifact_name, select_expired, BackupArtifact};
use crate::config::S3Config;

/// Uploads finished artifacts to S3-compatible object storage and keeps the
/// remote artifact set within the retention window. When no S3 configuration
/// is present every call is a no-op.
pub struct RemoteArchiver {
    client: Option<ArchiveClient>,
}

struct ArchiveClient {
    s3: s3::Client,
    bucket: String,
    prefix: String,
    retention: usize,
    upload_timeout: Duration,
}

impl RemoteArchiver {
    pub async fn new(config: Option<&S3Config>, retention: usize, upload_timeout: Duration) -> Self {
        let client = match config {
            Some(cfg) => {
                let sdk_config = aws_config::defaults(s3::config::BehaviorVersion::latest())
                    .endpoint_url(&cfg.endpoint_url)
                    .region(Region::new(cfg.region.clone()))
                    .credentials_provider(s3::config::Credentials::new(
                        &cfg.access_key_id,
                        &cfg.secret_access_key,
                        None,
                        None,
                        "Static",
                    ))
                    .load()
                    .await;
                Some(ArchiveClient {
                    s3: s3::Client::new(&sdk_config),
                    bucket: cfg.bucket.clone(),
                    prefix: cfg.prefix.trim_matches('/').to_string(),
                    retention,
                    upload_timeout,
                })
            }
            None => None,
        };
        RemoteArchiver { client }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    /// Uploads the artifact and then enforces remote retention. An upload
    /// failure is returned to the caller (who treats the run as local-only);
    /// retention failures are only logged since the upload itself succeeded.
    pub async fn archive(&self, artifact: &BackupArtifact) -> Result<Option<String>> {
        let Some(client) = &self.client else {
            debug!("remote storage not configured; keeping artifact local only");
            return Ok(None);
        };

        let key = client.key_for(&artifact.file_name);
        client.upload(artifact, &key).await?;

        if let Err(e) = client.enforce_retention().await {
            warn!("remote retention enforcement failed, continuing: {e:#}");
        }

        Ok(Some(key))
    }
}

impl ArchiveClient {
    fn key_for(&self, file_name: &str) -> String {
        if self.prefix.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", self.prefix, file_name)
        }
    }

    async fn upload(&self, artifact: &BackupArtifact, key: &str) -> Result<()> {
        let body = ByteStream::from_path(&artifact.local_path).await.with_context(|| {
            format!(
                "failed to read artifact for upload: {}",
                artifact.local_path.display()
            )
        })?;

        let put = self
            .s3
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .send();

        let outcome = tokio::time::timeout(self.upload_timeout, put).await;
        match outcome {
            Ok(result) => {
                result.with_context(|| {
                    format!(
                        "failed to upload {} to S3 bucket {} with key {}",
                        artifact.file_name, self.bucket, key
                    )
                })?;
            }
            Err(_) => anyhow::bail!(
                "upload of {} timed out after {}s",
                artifact.file_name,
                self.upload_timeout.as_secs()
            ),
        }

        info!(
            bucket = %self.bucket,
            key,
            "✅ artifact uploaded to remote storage"
        );
        Ok(())
    }

    /// Lists the artifact objects under the configured prefix and deletes the
    /// oldest ones beyond the retention count. Objects whose basename does
    /// not look like one of our artifacts are left alone.
    async fn enforce_retention(&self) -> Result<()> {
        let list_prefix = if self.prefix.is_empty() {
            String::new()
        } else {
            format!("{}/", self.prefix)
        };

        let mut entries: Vec<(i64, String)> = Vec::new();
        let mut pages = self
            .s3
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(&list_prefix)
            .into_paginator()
            .send();

        while let Some(page) = pages.next().await {
            let page = page.context("failed to list remote artifacts")?;
            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                let basename = key.rsplit('/').next().unwrap_or(key);
                if !matches_artifact_name(basename) {
                    continue;
                }
                let modified = object
                    .last_modified()
                    .and_then(|t| t.to_millis().ok())
                    .unwrap_or(0);
                entries.push((modified, key.to_string()));
            }
        }

        let expired = select_expired(entries, self.retention);
        if expired.is_empty() {
            debug!("remote artifact set is within the retention window");
            return Ok(());
        }

        for key in expired {
            match self
                .s3
                .delete_object()
                .bucket(&self.bucket)
                .key(&key)
                .send()
                .await
            {
                Ok(_) => info!(%key, "✓ deleted expired remote artifact"),
                Err(e) => warn!(%key, "failed to delete expired remote artifact, skipping: {e}"),
            }
        }
        Ok(())
    }
}
