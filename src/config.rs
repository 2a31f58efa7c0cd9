use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.ananthaadirayaramath.org";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Effective settings for one invocation, assembled from CLI flags and env.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub base_url: String,
    pub session_file: PathBuf,
    pub output_dir: PathBuf,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub user_agent: String,
}

impl AppConfig {
    /// Defaults pointing at `base_url`; used by tests and embedders.
    pub fn for_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            session_file: PathBuf::from("session.json"),
            output_dir: PathBuf::from("."),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            user_agent: default_user_agent(),
        }
    }
}

pub fn default_user_agent() -> String {
    format!("temple-admin/{}", env!("CARGO_PKG_VERSION"))
}
