// src/notify.rs

//! Outbound notifications: refresh results and command acknowledgements.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::error::RemoteApiError;

/// Title used for refresh result messages.
pub const REFRESH_TITLE: &str = "[Media refresh]";

/// A message for the operator, optionally addressed to a channel/user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
}

impl Notification {
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            channel: None,
            user: None,
        }
    }

    pub fn to(mut self, channel: Option<String>, user: Option<String>) -> Self {
        self.channel = channel;
        self.user = user;
        self
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<(), RemoteApiError>;
}

/// Writes notifications to the log only.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, notification: Notification) -> Result<(), RemoteApiError> {
        log::info!(
            "Notify: {} {}",
            notification.title,
            notification.text.trim_end().replace('\n', " | ")
        );
        Ok(())
    }
}

/// POSTs each notification as JSON to a webhook.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RemoteApiError::Client)?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: Notification) -> Result<(), RemoteApiError> {
        let transport = |source| RemoteApiError::Transport {
            url: self.url.clone(),
            source,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&notification)
            .send()
            .await
            .map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteApiError::Status {
                code: status.as_u16().to_string(),
                message: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        log::debug!("Notify: delivered \"{}\" to webhook", notification.title);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addressed_notification_serializes_target() {
        let n = Notification::new("t", "body").to(Some("telegram".into()), Some("42".into()));
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["channel"], "telegram");
        assert_eq!(json["user"], "42");

        let plain = serde_json::to_value(Notification::new("t", "body")).unwrap();
        assert!(plain.get("channel").is_none());
    }
}
