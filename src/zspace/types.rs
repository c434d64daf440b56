// src/zspace/types.rs

//! Wire types of the NAS media index API.
//!
//! The service is loose about JSON types: codes and ids show up both as
//! strings and as numbers, so those fields are read leniently into strings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Code the service uses for a successful call.
pub const CODE_OK: &str = "200";
/// Second code under which an in-progress rescan may be reported.
pub const CODE_TASK_PENDING: &str = "N120024";
/// `task_status` of a rescan that is still running.
pub const TASK_STATUS_RUNNING: i64 = 4;

/// Common `{code, msg, data}` response wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    #[serde(deserialize_with = "lenient_string")]
    pub code: String,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn is_ok(&self) -> bool {
        self.code == CODE_OK
    }

    pub fn message(&self) -> String {
        self.msg.clone().unwrap_or_default()
    }
}

/// A classification (category) on the media index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Classification {
    pub name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RescanData {
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub task_id: Option<String>,
}

/// One reply of the rescan result endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskStatusReply {
    pub code: String,
    pub task_status: Option<i64>,
}

impl TaskStatusReply {
    /// Only `task_status == 4` under one of the two known codes counts as running.
    /// Everything else ends polling, whether or not it means success.
    pub fn is_in_progress(&self) -> bool {
        (self.code == CODE_OK || self.code == CODE_TASK_PENDING)
            && self.task_status == Some(TASK_STATUS_RUNNING)
    }

    pub(crate) fn from_envelope(envelope: &Envelope) -> Self {
        let task_status = envelope
            .data
            .as_ref()
            .and_then(|d| d.get("task_status"))
            .and_then(|v| match v {
                Value::String(s) => s.trim().parse().ok(),
                other => other.as_i64(),
            });
        Self {
            code: envelope.code.clone(),
            task_status,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

impl From<StringOrNumber> for String {
    fn from(v: StringOrNumber) -> Self {
        match v {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(Option::<StringOrNumber>::deserialize(deserializer)?.map(String::from))
}
