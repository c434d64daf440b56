// src/zspace/client.rs

//! HTTP client for the NAS media index classification endpoints.

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::COOKIE;
use std::time::Duration;
use url::Url;

use crate::error::RemoteApiError;

use super::session::Session;
use super::types::{Classification, Envelope, RescanData, TaskStatusReply};

const LIST_PATH: &str = "/zvideo/classification/list";
const RESCAN_PATH: &str = "/zvideo/classification/rescan";
const RESULT_PATH: &str = "/zvideo/classification/rescan/result";

/// Operations of the media index the refresh workflow relies on.
#[async_trait]
pub trait MediaIndexApi: Send + Sync {
    /// All classifications known to the server.
    async fn list_classifications(
        &self,
        session: &Session,
    ) -> Result<Vec<Classification>, RemoteApiError>;

    /// Start a rescan of one classification and return its task id.
    async fn submit_rescan(
        &self,
        session: &Session,
        classification_id: &str,
    ) -> Result<String, RemoteApiError>;

    /// Current state of a rescan task.
    async fn rescan_status(
        &self,
        session: &Session,
        classification_id: &str,
        task_id: &str,
    ) -> Result<TaskStatusReply, RemoteApiError>;
}

/// Cache-busting nonce: unix time with fraction, `_`, four random digits.
pub fn generate_nonce() -> String {
    let now = chrono::Utc::now();
    let suffix: u16 = rand::thread_rng().gen_range(1000..=9999);
    format!(
        "{}.{:06}_{}",
        now.timestamp(),
        now.timestamp_subsec_micros(),
        suffix
    )
}

/// reqwest-backed [`MediaIndexApi`].
#[derive(Debug, Clone)]
pub struct ZspaceClient {
    client: reqwest::Client,
    base_url: String,
}

impl ZspaceClient {
    /// `host` is expected to be normalized already (scheme, no trailing slash).
    pub fn new(host: &str, timeout: Duration) -> Result<Self, RemoteApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteApiError::Client)?;
        Ok(Self {
            client,
            base_url: host.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint URL with a fresh nonce on every call.
    fn endpoint(&self, path: &str) -> Result<Url, RemoteApiError> {
        let raw = format!("{}{}", self.base_url, path);
        let mut url = Url::parse(&raw).map_err(|source| RemoteApiError::InvalidUrl {
            url: raw.clone(),
            source,
        })?;
        url.query_pairs_mut()
            .append_pair("rnd", &generate_nonce())
            .append_pair("webagent", "v2");
        Ok(url)
    }

    async fn post(
        &self,
        path: &str,
        session: &Session,
        form: Option<&[(&'static str, String)]>,
    ) -> Result<Envelope, RemoteApiError> {
        let url = self.endpoint(path)?;
        log::debug!("Zspace: POST {}", url);

        let mut request = self
            .client
            .post(url.clone())
            .header(COOKIE, session.cookie.as_str());
        if let Some(form) = form {
            request = request.form(form);
        }

        let response = request
            .send()
            .await
            .map_err(|source| RemoteApiError::Transport {
                url: url.to_string(),
                source,
            })?;
        let envelope: Envelope = response
            .json()
            .await
            .map_err(|source| RemoteApiError::Decode {
                url: url.to_string(),
                source,
            })?;
        log::debug!("Zspace: {} answered code {}", path, envelope.code);
        Ok(envelope)
    }
}

#[async_trait]
impl MediaIndexApi for ZspaceClient {
    async fn list_classifications(
        &self,
        session: &Session,
    ) -> Result<Vec<Classification>, RemoteApiError> {
        let envelope = self.post(LIST_PATH, session, None).await?;
        if !envelope.is_ok() {
            return Err(RemoteApiError::Status {
                code: envelope.code.clone(),
                message: envelope.message(),
            });
        }
        match envelope.data {
            Some(data) if data.is_array() => serde_json::from_value(data)
                .map_err(|_| RemoteApiError::MissingData("classification list entries")),
            _ => Err(RemoteApiError::MissingData("classification list")),
        }
    }

    async fn submit_rescan(
        &self,
        session: &Session,
        classification_id: &str,
    ) -> Result<String, RemoteApiError> {
        let form = session.rescan_form(classification_id);
        let envelope = self.post(RESCAN_PATH, session, Some(&form)).await?;
        if !envelope.is_ok() {
            return Err(RemoteApiError::Status {
                code: envelope.code.clone(),
                message: envelope.message(),
            });
        }
        envelope
            .data
            .and_then(|d| serde_json::from_value::<RescanData>(d).ok())
            .and_then(|d| d.task_id)
            .filter(|id| !id.is_empty())
            .ok_or(RemoteApiError::MissingData("task_id"))
    }

    async fn rescan_status(
        &self,
        session: &Session,
        classification_id: &str,
        task_id: &str,
    ) -> Result<TaskStatusReply, RemoteApiError> {
        let mut form = session.rescan_form(classification_id);
        form.push(("task_id", task_id.to_string()));
        let envelope = self.post(RESULT_PATH, session, Some(&form)).await?;
        Ok(TaskStatusReply::from_envelope(&envelope))
    }
}
