use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of the host's notification permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    #[default]
    Default,
}

impl std::fmt::Display for PermissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionState::Granted => write!(f, "granted"),
            PermissionState::Denied => write!(f, "denied"),
            PermissionState::Default => write!(f, "default"),
        }
    }
}

/// A "new tokens launched" notification handed to a sink.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchNotice {
    pub count: usize,
    pub message: String,
    pub emitted_at: DateTime<Utc>,
}

impl LaunchNotice {
    pub fn new(count: usize) -> Self {
        Self {
            count,
            message: format!("{} more tokens launched", count),
            emitted_at: Utc::now(),
        }
    }
}
