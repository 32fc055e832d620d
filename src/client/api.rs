use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use thiserror::Error;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::ErrorResponse;
use crate::models::{CreateGroupRequest, Group, JoinRequest, Point};

#[derive(Debug, Error)]
pub enum GroupApiError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("duplicate point: {0}")]
    DuplicatePoint(String),

    #[error("group api error {status}: {message}")]
    Status { status: u16, message: String },

    #[error("group api timed out after {0:?}")]
    Timeout(Duration),

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("invalid group api url: {0}")]
    InvalidUrl(String),
}

/// 群组后端的 HTTP 客户端
pub struct GroupApiClient {
    base_url: Url,
    http: Client,
    timeout: Duration,
}

impl GroupApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GroupApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(GroupApiError::Network)?;
        let base_url = base_url.into();
        let base_url =
            Url::parse(&base_url).map_err(|e| GroupApiError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(GroupApiError::InvalidUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url,
            http,
            timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, GroupApiError> {
        Self::new(config.group_api_url.clone(), config.request_timeout())
    }

    pub async fn create_group(&self, points: &[Point]) -> Result<Group, GroupApiError> {
        debug!(count = points.len(), "create_group: submitting");
        let body = CreateGroupRequest {
            points: points.to_vec(),
        };
        let response = self
            .http
            .post(self.url(&["groups"])?)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.read_group(response).await
    }

    pub async fn join_group(&self, join_code: &str, point: &Point) -> Result<Group, GroupApiError> {
        debug!(%join_code, "join_group: submitting");
        let body = JoinRequest {
            join_code: join_code.to_string(),
            point: point.clone(),
        };
        let response = self
            .http
            .post(self.url(&["join"])?)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.read_group(response).await
    }

    pub async fn find_group(&self, join_code: &str) -> Result<Group, GroupApiError> {
        let response = self
            .http
            .get(self.url(&["groups", join_code])?)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        self.read_group(response).await
    }

    async fn read_group(&self, response: reqwest::Response) -> Result<Group, GroupApiError> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<Group>()
                .await
                .map_err(|e| self.transport_error(e));
        }

        let text = response
            .text()
            .await
            .map_err(|e| self.transport_error(e))?;
        let message = serde_json::from_str::<ErrorResponse>(&text)
            .map(|e| e.error_message)
            .unwrap_or(text);

        Err(match status {
            StatusCode::BAD_REQUEST => GroupApiError::BadRequest(message),
            StatusCode::NOT_FOUND => GroupApiError::NotFound(message),
            StatusCode::CONFLICT => GroupApiError::DuplicatePoint(message),
            StatusCode::GATEWAY_TIMEOUT => GroupApiError::Timeout(self.timeout),
            _ => GroupApiError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }

    /// 在基础地址后追加路径段，每段都会做百分号编码
    fn url(&self, segments: &[&str]) -> Result<Url, GroupApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GroupApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn transport_error(&self, e: reqwest::Error) -> GroupApiError {
        if e.is_timeout() {
            GroupApiError::Timeout(self.timeout)
        } else {
            GroupApiError::Network(e)
        }
    }
}
