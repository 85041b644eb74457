//! HTTP client for the image classification service

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use super::{AiRequest, AiVerdictProvider, ProviderError};
use crate::verdict::AiVerdict;

/// Posts the evidence image to `{base_url}/verify` as multipart form data
pub struct HttpVerdictProvider {
    client: reqwest::Client,
    base_url: String,
    upload_root: PathBuf,
}

impl HttpVerdictProvider {
    pub fn new(
        base_url: impl Into<String>,
        upload_root: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unreachable(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            upload_root: upload_root.into(),
        })
    }

    fn evidence_path(&self, relative: &str) -> Result<PathBuf, ProviderError> {
        let relative = Path::new(relative);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(ProviderError::MissingEvidence(format!(
                "evidence path escapes upload root: {}",
                relative.display()
            )));
        }
        Ok(self.upload_root.join(relative))
    }
}

/// Wire format of the classifier's answer
#[derive(Deserialize)]
struct VerifyResponse {
    ai_verified: bool,
    confidence: f64,
    prediction: String,
}

#[async_trait]
impl AiVerdictProvider for HttpVerdictProvider {
    async fn verify(&self, request: &AiRequest) -> Result<AiVerdict, ProviderError> {
        let path = self.evidence_path(&request.image_path)?;
        let bytes = tokio::fs::read(&path).await.map_err(|e| {
            ProviderError::MissingEvidence(format!("{}: {}", path.display(), e))
        })?;

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "evidence".to_string());
        let form = Form::new()
            .part("image_file", Part::bytes(bytes).file_name(file_name))
            .text("category", request.category.as_str().to_uppercase());

        let url = format!("{}/verify", self.base_url);
        debug!(report_id = %request.report_id, url = %url, "sending evidence to classifier");

        let response = self.client.post(&url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        Ok(AiVerdict::new(body.ai_verified, body.confidence, body.prediction))
    }

    async fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}
