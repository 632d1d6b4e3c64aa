//! Blob publication of generated proposals.
//!
//! Publishing is best-effort: the pipeline reports a [`PublishStatus`] and
//! keeps the local artifact whatever happens here.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};
use url::Url;

use proposalgen_shared::{AppConfig, ProposalError, Result};

/// Content type of a `.docx` file.
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Uploads a local artifact and returns where it can be downloaded.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, path: &Path, name: &str) -> Result<Url>;
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Outcome of the publish step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishStatus {
    Published(Url),
    /// No publisher configured, or publishing was turned off.
    Skipped,
    Failed(String),
}

impl fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Published(url) => {
                write!(f, "Proposal generated successfully! Download here: {url}")
            }
            Self::Skipped => write!(f, "Proposal generated locally; publishing skipped."),
            Self::Failed(_) => write!(f, "Proposal created but Azure upload failed."),
        }
    }
}

// ---------------------------------------------------------------------------
// Azure Blob
// ---------------------------------------------------------------------------

/// `PUT`s block blobs into an Azure Storage container using a SAS token.
pub struct AzureBlobPublisher {
    http: reqwest::Client,
    container_url: Url,
    sas_token: String,
}

impl AzureBlobPublisher {
    pub fn new(container_url: Url, sas_token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| ProposalError::Network(e.to_string()))?;
        let sas_token = sas_token.into();
        Ok(Self {
            http,
            container_url,
            sas_token: sas_token.trim_start_matches('?').to_string(),
        })
    }

    /// Build a publisher from `[publish]`. `Ok(None)` when no container is configured.
    pub fn from_config(config: &AppConfig) -> Result<Option<Self>> {
        let Some(raw) = config.publish.container_url.as_deref() else {
            return Ok(None);
        };
        let container_url = Url::parse(raw)
            .map_err(|e| ProposalError::config(format!("invalid publish.container_url: {e}")))?;
        let var = &config.publish.sas_token_env;
        let sas_token = std::env::var(var).map_err(|_| {
            ProposalError::config(format!("SAS token not found. Set the {var} environment variable."))
        })?;
        Self::new(container_url, sas_token).map(Some)
    }

    /// Public URL of a blob (no SAS query).
    pub fn blob_url(&self, name: &str) -> Result<Url> {
        let base = self.container_url.as_str().trim_end_matches('/');
        Url::parse(&format!("{base}/{name}"))
            .map_err(|e| ProposalError::Publish(format!("invalid blob name {name:?}: {e}")))
    }
}

#[async_trait]
impl Publisher for AzureBlobPublisher {
    async fn publish(&self, path: &Path, name: &str) -> Result<Url> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| ProposalError::io(path, e))?;
        let blob_url = self.blob_url(name)?;
        let mut upload_url = blob_url.clone();
        upload_url.set_query(Some(&self.sas_token));

        debug!(url = %blob_url, bytes = bytes.len(), "uploading blob");
        let response = self
            .http
            .put(upload_url)
            .header("x-ms-blob-type", "BlockBlob")
            .header(reqwest::header::CONTENT_TYPE, DOCX_CONTENT_TYPE)
            .body(bytes)
            .send()
            .await
            .map_err(|e| ProposalError::Publish(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProposalError::Publish(format!(
                "upload returned {}: {}",
                status.as_u16(),
                body.trim()
            )));
        }

        info!(url = %blob_url, "proposal published");
        Ok(blob_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn temp_file() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("pg-publish-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("proposal.docx");
        std::fs::write(&file, b"docx bytes").unwrap();
        file
    }

    fn publisher(server: &MockServer) -> AzureBlobPublisher {
        let container = Url::parse(&format!("{}/proposals", server.uri())).unwrap();
        AzureBlobPublisher::new(container, "?sv=2024&sig=abc").unwrap()
    }

    #[tokio::test]
    async fn uploads_block_blob_and_returns_url_without_sas() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/proposals/proposal_20260309_101500.docx"))
            .and(query_param("sig", "abc"))
            .and(header("x-ms-blob-type", "BlockBlob"))
            .and(header("content-type", DOCX_CONTENT_TYPE))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let file = temp_file();
        let url = publisher(&server)
            .publish(&file, "proposal_20260309_101500.docx")
            .await
            .unwrap();

        assert_eq!(
            url.as_str(),
            format!("{}/proposals/proposal_20260309_101500.docx", server.uri())
        );
        assert!(url.query().is_none());
        let _ = std::fs::remove_dir_all(file.parent().unwrap());
    }

    #[tokio::test]
    async fn non_success_status_is_a_publish_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403).set_body_string("AuthenticationFailed"))
            .mount(&server)
            .await;

        let file = temp_file();
        let err = publisher(&server)
            .publish(&file, "proposal.docx")
            .await
            .unwrap_err();

        match err {
            ProposalError::Publish(message) => assert!(message.contains("403")),
            other => panic!("unexpected error: {other}"),
        }
        let _ = std::fs::remove_dir_all(file.parent().unwrap());
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let server = MockServer::start().await;
        let missing = std::env::temp_dir().join(format!("pg-missing-{}.docx", uuid::Uuid::now_v7()));
        let err = publisher(&server)
            .publish(&missing, "proposal.docx")
            .await
            .unwrap_err();
        assert!(matches!(err, ProposalError::Io { .. }));
    }

    #[test]
    fn unconfigured_container_skips_publishing() {
        let config = AppConfig::default();
        assert!(AzureBlobPublisher::from_config(&config).unwrap().is_none());
    }

    #[test]
    fn status_messages() {
        let url = Url::parse("https://example.blob.core.windows.net/c/p.docx").unwrap();
        assert_eq!(
            PublishStatus::Published(url).to_string(),
            "Proposal generated successfully! Download here: https://example.blob.core.windows.net/c/p.docx"
        );
        assert_eq!(
            PublishStatus::Failed("timeout".into()).to_string(),
            "Proposal created but Azure upload failed."
        );
    }
}
