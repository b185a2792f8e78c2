use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::domain::models::{UserCreate, UserSearchRequest, UserUpdate};

pub type UserRecord = Map<String, Value>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("user service request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("user service returned an unexpected payload: {0}")]
    Decode(String),
}

#[async_trait]
pub trait UserService: Send + Sync {
    async fn get_user(&self, id: i64) -> Result<UserRecord, BackendError>;
    async fn search_users(&self, request: &UserSearchRequest)
        -> Result<Vec<UserRecord>, BackendError>;
    /// Returns the raw response body of the created user.
    async fn add_user(&self, user: &UserCreate) -> Result<String, BackendError>;
    async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<String, BackendError>;
    async fn delete_user(&self, id: i64) -> Result<(), BackendError>;
}

#[derive(Debug, Clone)]
pub struct HttpUserClient {
    client: Client,
    base_url: String,
}

impl HttpUserClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl UserService for HttpUserClient {
    async fn get_user(&self, id: i64) -> Result<UserRecord, BackendError> {
        let response = self
            .client
            .get(self.url(&format!("/v1/users/{id}")))
            .send()
            .await?;
        let response = expect_status(response, |status| status == StatusCode::OK).await?;

        match response.json::<Value>().await? {
            Value::Object(user) => Ok(user),
            other => Err(BackendError::Decode(format!("expected a user object, got {other}"))),
        }
    }

    async fn search_users(
        &self,
        request: &UserSearchRequest,
    ) -> Result<Vec<UserRecord>, BackendError> {
        let response = self
            .client
            .get(self.url("/v1/users/search"))
            .query(&request.query_pairs())
            .send()
            .await?;
        let response = expect_status(response, |status| status == StatusCode::OK).await?;

        let users = match response.json::<Value>().await? {
            Value::Array(items) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(user) => Ok(user),
                    other => Err(BackendError::Decode(format!(
                        "expected a user object, got {other}"
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            other => {
                return Err(BackendError::Decode(format!(
                    "expected a list of users, got {other}"
                )))
            }
        };

        debug!(count = users.len(), "user search completed");
        Ok(users)
    }

    async fn add_user(&self, user: &UserCreate) -> Result<String, BackendError> {
        let response = self
            .client
            .post(self.url("/v1/users"))
            .json(user)
            .send()
            .await?;
        let response = expect_status(response, |status| status == StatusCode::CREATED).await?;
        Ok(response.text().await?)
    }

    async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<String, BackendError> {
        let response = self
            .client
            .put(self.url(&format!("/v1/users/{id}")))
            .json(update)
            .send()
            .await?;
        let response = expect_status(response, |status| status.is_success()).await?;
        Ok(response.text().await?)
    }

    async fn delete_user(&self, id: i64) -> Result<(), BackendError> {
        let response = self
            .client
            .delete(self.url(&format!("/v1/users/{id}")))
            .send()
            .await?;
        expect_status(response, |status| status.is_success()).await?;
        Ok(())
    }
}

async fn expect_status(
    response: Response,
    accepted: impl Fn(StatusCode) -> bool,
) -> Result<Response, BackendError> {
    let status = response.status();
    if accepted(status) {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(BackendError::Http {
        status: status.as_u16(),
        body,
    })
}
