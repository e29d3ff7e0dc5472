//! S3-compatible object storage for evidence files and proof packs

use anyhow::{anyhow, Context, Result};
use aws_sdk_s3::{
    config::{Credentials, Region},
    presigning::PresigningConfig,
    primitives::ByteStream,
    Client,
};
use riskmate_common::checksum::sha256_hex;
use std::time::Duration;
use tracing::{debug, info, instrument};
use uuid::Uuid;

pub mod config;

pub use config::StorageConfig;

/// Lifetime of evidence download links
pub const PRESIGNED_URL_TTL: Duration = Duration::from_secs(60 * 60);

/// Longest file name kept in an object key
const MAX_KEY_FILE_NAME_LEN: usize = 120;

#[derive(Clone)]
pub struct Storage {
    client: Client,
    bucket: String,
}

impl Storage {
    pub async fn new(config: StorageConfig) -> Result<Self> {
        debug!(config = ?config, "Initializing storage");

        let credentials = Credentials::new(
            &config.access_key,
            &config.secret_key,
            None,
            None,
            "riskmate-storage",
        );

        let mut s3_config_builder = aws_sdk_s3::Config::builder()
            .credentials_provider(credentials)
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(s3_config_builder.build());

        info!(bucket = %config.bucket, "Storage client initialized");

        Ok(Self {
            client,
            bucket: config.bucket,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    #[instrument(skip(self, data), fields(bucket = %self.bucket, size = data.len()))]
    pub async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: Option<String>,
    ) -> Result<UploadResult> {
        let checksum = sha256_hex(&data);
        let size = data.len() as i64;

        let mut request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(data));

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        request.send().await.context("Failed to upload to S3")?;

        info!(key = %key, size, "Uploaded object");

        Ok(UploadResult {
            key: key.to_string(),
            checksum,
            size,
        })
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn download(&self, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to download from S3: {key}"))?;

        let data = response
            .body
            .collect()
            .await
            .context("Failed to read S3 response body")?
            .into_bytes()
            .to_vec();

        debug!(key = %key, size = data.len(), "Downloaded object");

        Ok(data)
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn delete(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .with_context(|| format!("Failed to delete from S3: {key}"))?;

        info!(key = %key, "Deleted object");

        Ok(())
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn exists(&self, key: &str) -> Result<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let message = e.to_string();
                if message.contains("NotFound") || message.contains("404") {
                    Ok(false)
                } else {
                    Err(anyhow!("Failed to check S3 object existence: {message}"))
                }
            },
        }
    }

    #[instrument(skip(self), fields(bucket = %self.bucket))]
    pub async fn generate_presigned_url(&self, key: &str, expires_in: Duration) -> Result<String> {
        let presigning_config = PresigningConfig::expires_in(expires_in)
            .context("Failed to create presigning config")?;

        let presigned_request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning_config)
            .await
            .context("Failed to generate presigned URL")?;

        Ok(presigned_request.uri().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct UploadResult {
    pub key: String,
    pub checksum: String,
    pub size: i64,
}

/// Reduce a client-supplied file name to a safe key segment
///
/// Path components are dropped and anything outside `[A-Za-z0-9._-]`
/// becomes `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');

    if cleaned.is_empty() {
        return "file".to_string();
    }

    // keep the extension when truncating
    if cleaned.len() > MAX_KEY_FILE_NAME_LEN {
        let tail_start = cleaned.len() - MAX_KEY_FILE_NAME_LEN;
        return cleaned[tail_start..].to_string();
    }

    cleaned.to_string()
}

/// `organizations/{org}/jobs/{job}/evidence/{id}-{name}`
pub fn evidence_key(
    organization_id: Uuid,
    job_id: Uuid,
    evidence_id: Uuid,
    file_name: &str,
) -> String {
    format!(
        "organizations/{}/jobs/{}/evidence/{}-{}",
        organization_id,
        job_id,
        evidence_id,
        sanitize_file_name(file_name)
    )
}

/// `organizations/{org}/proof-packs/{pack}.zip`
pub fn proof_pack_key(organization_id: Uuid, pack_id: Uuid) -> String {
    format!("organizations/{organization_id}/proof-packs/{pack_id}.zip")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evidence_key_layout() {
        let org = Uuid::new_v4();
        let job = Uuid::new_v4();
        let id = Uuid::new_v4();

        let key = evidence_key(org, job, id, "site photo (1).jpg");
        assert_eq!(
            key,
            format!("organizations/{org}/jobs/{job}/evidence/{id}-site_photo__1_.jpg")
        );
    }

    #[test]
    fn test_proof_pack_key_layout() {
        let org = Uuid::new_v4();
        let pack = Uuid::new_v4();
        assert_eq!(
            proof_pack_key(org, pack),
            format!("organizations/{org}/proof-packs/{pack}.zip")
        );
    }

    #[test]
    fn test_sanitize_strips_paths() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\scan.pdf"), "scan.pdf");
        assert_eq!(sanitize_file_name(".."), "file");
        assert_eq!(sanitize_file_name(""), "file");
    }

    #[test]
    fn test_sanitize_truncates_from_the_front() {
        let long = format!("{}.pdf", "a".repeat(300));
        let cleaned = sanitize_file_name(&long);
        assert_eq!(cleaned.len(), MAX_KEY_FILE_NAME_LEN);
        assert!(cleaned.ends_with(".pdf"));
    }

    #[tokio::test]
    async fn test_storage_builds_without_network() {
        let storage = Storage::new(StorageConfig::for_minio("http://localhost:9000", "riskmate"))
            .await
            .unwrap();
        assert_eq!(storage.bucket(), "riskmate");
    }
}
