// src/zspace/session.rs

//! Session credentials taken from a browser cookie blob.

use std::collections::HashMap;
use std::fmt;

use crate::error::AuthError;

/// Cookie keys every request needs.
pub const REQUIRED_FIELDS: [&str; 6] = ["token", "device_id", "device", "version", "_l", "nas_id"];

/// Split a `k=v; k2=v2` blob into a map. Later keys win.
pub fn parse_cookie(raw: &str) -> Result<HashMap<String, String>, AuthError> {
    if raw.trim().is_empty() {
        return Err(AuthError::Empty);
    }
    let mut map = HashMap::new();
    for segment in raw.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let (key, value) = segment
            .split_once('=')
            .ok_or_else(|| AuthError::Malformed(segment.to_string()))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(AuthError::Malformed(segment.to_string()));
        }
        map.insert(key.to_string(), value.trim().to_string());
    }
    Ok(map)
}

/// Identifiers the NAS expects on every classification call.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub device_id: String,
    pub device: String,
    pub version: String,
    pub locale: String,
    pub nas_id: String,
    /// The original blob, replayed as the `Cookie` header.
    pub cookie: String,
}

impl Session {
    pub fn from_cookie(raw: &str) -> Result<Self, AuthError> {
        let mut map = parse_cookie(raw)?;
        let missing: Vec<&'static str> = REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|f| !map.contains_key(*f))
            .collect();
        if !missing.is_empty() {
            return Err(AuthError::MissingFields(missing));
        }
        let mut take = |key: &str| map.remove(key).unwrap_or_default();
        Ok(Self {
            token: take("token"),
            device_id: take("device_id"),
            device: take("device"),
            version: take("version"),
            locale: take("_l"),
            nas_id: take("nas_id"),
            cookie: raw.trim().to_string(),
        })
    }

    /// Form body of a rescan request for one classification.
    pub fn rescan_form(&self, classification_id: &str) -> Vec<(&'static str, String)> {
        vec![
            ("classification_id", classification_id.to_string()),
            ("device_id", self.device_id.clone()),
            ("token", self.token.clone()),
            ("device", self.device.clone()),
            ("plat", "web".to_string()),
            ("_l", self.locale.clone()),
            ("version", self.version.clone()),
            ("nasid", self.nas_id.clone()),
        ]
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("device_id", &self.device_id)
            .field("device", &self.device)
            .field("version", &self.version)
            .field("locale", &self.locale)
            .field("nas_id", &self.nas_id)
            .finish_non_exhaustive()
    }
}
