// src/copilot.rs

//! Client for the container update assistant.
//!
//! Authentication trades the configured secret key for a JWT which is then
//! sent verbatim in the `Authorization` header.

use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::config::CopilotConfig;
use crate::error::{ConfigError, RefreshError, RemoteApiError};

const CODE_AUTHORIZED: i64 = 201;
const CODE_OK: i64 = 0;

#[derive(Debug, Deserialize)]
struct CopilotEnvelope {
    code: i64,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<Value>,
}

impl CopilotEnvelope {
    fn status_error(&self) -> RemoteApiError {
        RemoteApiError::Status {
            code: self.code.to_string(),
            message: self.msg.clone().unwrap_or_default(),
        }
    }
}

/// A managed container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Container {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CopilotClient {
    client: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl CopilotClient {
    pub fn new(host: &str, secret_key: &str, timeout: Duration) -> Result<Self, RemoteApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteApiError::Client)?;
        Ok(Self {
            client,
            base_url: host.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    pub fn from_config(config: &CopilotConfig, timeout: Duration) -> Result<Self, RefreshError> {
        match (config.host.as_deref(), config.secret_key.as_deref()) {
            (Some(host), Some(key)) if !host.is_empty() && !key.is_empty() => {
                Ok(Self::new(host, key, timeout)?)
            }
            _ => Err(ConfigError::MissingCopilot.into()),
        }
    }

    async fn decode(
        url: &str,
        request: reqwest::RequestBuilder,
    ) -> Result<CopilotEnvelope, RemoteApiError> {
        let response = request
            .send()
            .await
            .map_err(|source| RemoteApiError::Transport {
                url: url.to_string(),
                source,
            })?;
        response
            .json()
            .await
            .map_err(|source| RemoteApiError::Decode {
                url: url.to_string(),
                source,
            })
    }

    /// Exchange the secret key for a JWT.
    pub async fn authenticate(&self) -> Result<String, RemoteApiError> {
        let url = format!("{}/api/auth", self.base_url);
        let request = self
            .client
            .post(&url)
            .form(&[("secretKey", self.secret_key.as_str())]);
        let envelope = Self::decode(&url, request).await?;
        if envelope.code != CODE_AUTHORIZED {
            log::error!(
                "Copilot: authentication failed, code {}: {}",
                envelope.code,
                envelope.msg.as_deref().unwrap_or_default()
            );
            return Err(envelope.status_error());
        }
        envelope
            .data
            .as_ref()
            .and_then(|d| d.get("jwt"))
            .and_then(Value::as_str)
            .filter(|jwt| !jwt.is_empty())
            .map(str::to_string)
            .ok_or(RemoteApiError::MissingData("jwt"))
    }

    pub async fn list_containers(&self, jwt: &str) -> Result<Vec<Container>, RemoteApiError> {
        let url = format!("{}/api/containers", self.base_url);
        let request = self
            .client
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, jwt);
        let envelope = Self::decode(&url, request).await?;
        if envelope.code != CODE_OK {
            log::error!(
                "Copilot: listing containers failed, code {}: {}",
                envelope.code,
                envelope.msg.as_deref().unwrap_or_default()
            );
            return Err(envelope.status_error());
        }
        match envelope.data {
            Some(data @ Value::Array(_)) => serde_json::from_value(data)
                .map_err(|_| RemoteApiError::MissingData("container entries")),
            _ => Err(RemoteApiError::MissingData("container list")),
        }
    }
}
