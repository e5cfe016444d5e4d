use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::core::config::Settings;
use crate::schemas::definition::SectionDefinition;
use crate::session::payload::SubmissionPayload;

const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

#[derive(Debug, Error)]
pub(crate) enum BackendError {
    #[error("exam backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("exam backend responded with {status}: {body}")]
    Status { status: u16, body: String },
}

impl BackendError {
    pub(crate) fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(err) => err.status().map(|status| status.as_u16()),
        }
    }
}

/// Narrow contract with the exam definition and grading service.
#[async_trait]
pub(crate) trait ExamBackend: Send + Sync {
    async fn fetch_sections(&self, contest_id: &str) -> Result<Vec<SectionDefinition>, BackendError>;

    async fn submit(&self, payload: &SubmissionPayload) -> Result<(), BackendError>;
}

#[derive(Debug, Clone)]
pub(crate) struct HttpExamBackend {
    client: Client,
    base_url: String,
}

impl HttpExamBackend {
    pub(crate) fn from_settings(settings: &Settings) -> Result<Self> {
        let timeout = Duration::from_secs(settings.exam_api().request_timeout_seconds);
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: settings.exam_api().base_url.trim_end_matches('/').to_string(),
        })
    }

    fn sections_url(&self, contest_id: &str) -> String {
        format!("{}/api/mcq/sections/{contest_id}/", self.base_url)
    }

    fn submit_url(&self) -> String {
        format!("{}/api/mcq/submit_assessment/", self.base_url)
    }
}

#[async_trait]
impl ExamBackend for HttpExamBackend {
    async fn fetch_sections(&self, contest_id: &str) -> Result<Vec<SectionDefinition>, BackendError> {
        let timer = Instant::now();
        let response = self.client.get(self.sections_url(contest_id)).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), body });
        }

        let sections: Vec<SectionDefinition> = response.json().await?;
        tracing::info!(
            contest_id = %contest_id,
            sections = sections.len(),
            duration_ms = timer.elapsed().as_millis() as u64,
            "Fetched exam definition"
        );
        Ok(sections)
    }

    async fn submit(&self, payload: &SubmissionPayload) -> Result<(), BackendError> {
        let timer = Instant::now();
        let response = self
            .client
            .post(self.submit_url())
            .header(IDEMPOTENCY_HEADER, payload.submission_id.to_string())
            .json(payload)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), body });
        }

        tracing::info!(
            session_id = %payload.session_id,
            submission_id = %payload.submission_id,
            status = status.as_u16(),
            duration_ms = timer.elapsed().as_millis() as u64,
            "Submission accepted by exam backend"
        );
        Ok(())
    }
}
