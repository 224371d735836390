use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, Url};
use tracing::debug;

use super::error::ClientError;
use super::types::{CreateJobRequest, CreateJobResponse, ErrorBody, JobSnapshot};
use crate::tracking::{CandidateId, Category, JobId};

/// Transport contract with the remote tracking provider. No business logic.
#[async_trait]
pub trait TrackingClient: Send + Sync {
    /// Ask the provider to start tracking `reference` with the given carrier.
    async fn create(
        &self,
        reference: &str,
        category: Category,
        provider: &CandidateId,
    ) -> Result<JobId, ClientError>;

    /// Current snapshot of a remote job.
    async fn fetch(&self, job_id: &JobId) -> Result<JobSnapshot, ClientError>;

    /// Ask the provider to re-query the carrier for a job.
    async fn request_refresh(&self, job_id: &JobId) -> Result<(), ClientError>;
}

pub struct HttpTrackingClient {
    api_key: String,
    client: Client,
    base_url: Url,
}

impl HttpTrackingClient {
    pub fn new(api_key: String, base_url: String, timeout: Duration) -> Result<Self, ClientError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        let base_url = Url::parse(&base_url)
            .map_err(|err| ClientError::InvalidUrl(format!("{base_url}: {err}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            api_key,
            client,
            base_url,
        })
    }

    /// `base_url` followed by `segments`, each percent-encoded as one path segment.
    fn url(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn error_message(response: Response) -> String {
        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "unknown error".to_string());
        serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message)
            .unwrap_or(text)
    }
}

/// Statuses with which the provider declines to create a job.
fn is_rejection_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_REQUEST
            | StatusCode::NOT_FOUND
            | StatusCode::CONFLICT
            | StatusCode::UNPROCESSABLE_ENTITY
    )
}

#[async_trait]
impl TrackingClient for HttpTrackingClient {
    async fn create(
        &self,
        reference: &str,
        category: Category,
        provider: &CandidateId,
    ) -> Result<JobId, ClientError> {
        let req = CreateJobRequest {
            reference: reference.to_string(),
            category,
            provider: provider.as_str().to_string(),
        };
        let response = self
            .client
            .post(self.url(&["trackings"])?)
            .header("x-api-key", &self.api_key)
            .json(&req)
            .send()
            .await?;

        let status = response.status();
        if is_rejection_status(status) {
            return Err(ClientError::CreateRejected {
                status: status.as_u16(),
                reason: Self::error_message(response).await,
            });
        }
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: Self::error_message(response).await,
            });
        }

        let body = response.json::<CreateJobResponse>().await?;
        debug!(job_id = %body.id, %provider, "tracking job created");
        Ok(JobId::new(body.id))
    }

    async fn fetch(&self, job_id: &JobId) -> Result<JobSnapshot, ClientError> {
        let response = self
            .client
            .get(self.url(&["trackings", job_id.as_str()])?)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: Self::error_message(response).await,
            });
        }

        Ok(response.json::<JobSnapshot>().await?)
    }

    async fn request_refresh(&self, job_id: &JobId) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.url(&["trackings", job_id.as_str(), "refresh"])?)
            .header("x-api-key", &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: Self::error_message(response).await,
            });
        }
        Ok(())
    }
}
