use api_types::{expense::ExpenseRecord, group::GroupRecord};
use reqwest::Url;
use serde::{Deserialize, de::DeserializeOwned};
use thiserror::Error;

use crate::error::{AppError, Result};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("not found")]
    NotFound,
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("server error: {0}")]
    Server(String),
    #[error(transparent)]
    Transport(reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(alias = "error")]
    message: String,
}

/// Read-only client for the expenses API.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: &str) -> Result<Self> {
        // `join` drops the last path segment unless the base ends with '/'.
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .map_err(|err| AppError::Input(format!("invalid base_url: {err}")))?;
        Ok(Self {
            base_url,
            http: reqwest::Client::new(),
        })
    }

    pub async fn group(&self, group_id: &str) -> std::result::Result<GroupRecord, ClientError> {
        self.get_json(&format!("groups/{group_id}")).await
    }

    pub async fn expenses(
        &self,
        group_id: &str,
    ) -> std::result::Result<Vec<ExpenseRecord>, ClientError> {
        self.get_json(&format!("expenses/{group_id}")).await
    }

    /// Marks every expense of the group as settled.
    pub async fn settle_group(&self, group_id: &str) -> std::result::Result<(), ClientError> {
        let endpoint = self.endpoint(&format!("expenses/{group_id}/settle"))?;
        tracing::debug!(%endpoint, "settling group");
        let res = self
            .http
            .post(endpoint)
            .json(&serde_json::json!({}))
            .send()
            .await
            .map_err(ClientError::Transport)?;
        Self::check(res).await.map(|_| ())
    }

    fn endpoint(&self, path: &str) -> std::result::Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|err| ClientError::Server(format!("invalid base_url: {err}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> std::result::Result<T, ClientError> {
        let endpoint = self.endpoint(path)?;
        tracing::debug!(%endpoint, "fetching");

        let res = self
            .http
            .get(endpoint)
            .send()
            .await
            .map_err(ClientError::Transport)?;
        Self::check(res)
            .await?
            .json::<T>()
            .await
            .map_err(ClientError::Transport)
    }

    async fn check(res: reqwest::Response) -> std::result::Result<reqwest::Response, ClientError> {
        if res.status().is_success() {
            return Ok(res);
        }

        let status = res.status();
        let body = res
            .json::<ErrorResponse>()
            .await
            .map(|err| err.message)
            .unwrap_or_else(|_| "unknown error".to_string());

        let err = match status.as_u16() {
            401 => ClientError::Unauthorized,
            403 => ClientError::Forbidden,
            404 => ClientError::NotFound,
            409 => ClientError::Conflict(body),
            422 => ClientError::Validation(body),
            _ => ClientError::Server(body),
        };
        Err(err)
    }
}
