use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One transcript entry. Field names match the archive file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    /// Capture time in fractional seconds since the Unix epoch.
    pub ts: f64,
    pub privacy: bool,
}

impl Message {
    pub fn user(text: impl Into<String>, privacy: bool) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            ts: now_ts(),
            privacy,
        }
    }

    pub fn assistant(text: impl Into<String>, privacy: bool) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            ts: now_ts(),
            privacy,
        }
    }
}

fn now_ts() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
