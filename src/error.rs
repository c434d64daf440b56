// src/error.rs

//! Error types shared by the refresh workflow.
//!
//! Nothing here is meant to reach the scheduler: the scheduler-facing entry
//! points log these errors and return. They exist so callers and tests can
//! see what happened without reading log output.

use thiserror::Error;

/// Result alias for the refresh workflow.
pub type RefreshResult<T> = Result<T, RefreshError>;

/// Configuration is unusable for the requested operation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("path prefix filter is not set")]
    MissingPathPrefix,
    #[error("unrecognized time window unit `{0}` (expected day, hour or minute)")]
    UnknownUnit(String),
    #[error("time window of {window} {unit}(s) reaches before the earliest representable date")]
    WindowOutOfRange { window: u32, unit: String },
    #[error("remote host or credential blob is not configured")]
    MissingRemote,
    #[error("container assistant host or secret key is not configured")]
    MissingCopilot,
}

/// The credential blob could not be turned into a session.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("credential blob is empty")]
    Empty,
    #[error("malformed credential segment `{0}`")]
    Malformed(String),
    #[error("credential blob is missing required fields: {0:?}")]
    MissingFields(Vec<&'static str>),
}

/// The remote service could not be reached or answered unexpectedly.
#[derive(Debug, Error)]
pub enum RemoteApiError {
    #[error("invalid endpoint url {url}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("failed to build http client")]
    Client(#[source] reqwest::Error),
    #[error("request to {url} failed")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("could not decode response from {url}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("remote returned code {code}: {message}")]
    Status { code: String, message: String },
    #[error("remote response is missing {0}")]
    MissingData(&'static str),
}

/// Transfer history could not be read.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read history file {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse history file {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Top-level error of a refresh run.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Remote(#[from] RemoteApiError),
    #[error(transparent)]
    History(#[from] HistoryError),
}
