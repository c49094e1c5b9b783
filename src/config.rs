//! Client and cache configuration.
//!
//! [`ClientConfig`] describes how to reach the API; [`QueryConfig`] holds the
//! cache defaults every query inherits unless its `QueryOptions` override them.

use crate::error::{Error, Result};
use crate::observability::StalePolicy;
use std::time::Duration;
use url::Url;

/// Environment variable overriding the API base URL.
pub const API_URL_ENV: &str = "BARCODE_API_URL";

/// Environment variable overriding the uploads prefix.
pub const UPLOADS_URL_ENV: &str = "BARCODE_UPLOADS_URL";

pub const DEFAULT_API_URL: &str = "http://localhost:3003/api";
pub const DEFAULT_UPLOADS_URL: &str = "http://localhost:8080/bc/uploads/";
pub const DEFAULT_LOGIN_URL: &str = "https://bareefers.org/forum/login/";
pub const DEFAULT_UPGRADE_URL: &str =
    "https://www.bareefers.org/forum/threads/how-do-i-become-a-supporting-member.14130/";

/// Connection settings for the remote API.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub base_url: Url,
    pub uploads_url: Url,
    /// Where 401 responses send the user.
    pub login_url: String,
    /// Where 403 responses send the user.
    pub upgrade_url: String,
    pub request_timeout: Duration,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            base_url: default_dir_url(DEFAULT_API_URL),
            uploads_url: default_dir_url(DEFAULT_UPLOADS_URL),
            login_url: DEFAULT_LOGIN_URL.to_string(),
            upgrade_url: DEFAULT_UPGRADE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            user_agent: concat!("barcode-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    /// Defaults, with `BARCODE_API_URL` / `BARCODE_UPLOADS_URL` applied when set.
    ///
    /// # Errors
    /// Returns `Error::Config` if either variable holds an invalid URL.
    pub fn from_env() -> Result<Self> {
        let mut config = ClientConfig::default();
        if let Ok(url) = std::env::var(API_URL_ENV) {
            config = config.with_base_url(&url)?;
        }
        if let Ok(url) = std::env::var(UPLOADS_URL_ENV) {
            config = config.with_uploads_url(&url)?;
        }
        Ok(config)
    }

    /// Set the API base URL. Relative request paths are appended to it.
    ///
    /// # Errors
    /// Returns `Error::Config` for an unparsable or non-hierarchical URL.
    pub fn with_base_url(mut self, url: &str) -> Result<Self> {
        self.base_url = parse_dir_url(url)?;
        Ok(self)
    }

    /// Set the prefix that stored picture paths are resolved against.
    ///
    /// # Errors
    /// Returns `Error::Config` for an unparsable or non-hierarchical URL.
    pub fn with_uploads_url(mut self, url: &str) -> Result<Self> {
        self.uploads_url = parse_dir_url(url)?;
        Ok(self)
    }

    pub fn with_login_url(mut self, url: impl Into<String>) -> Self {
        self.login_url = url.into();
        self
    }

    pub fn with_upgrade_url(mut self, url: impl Into<String>) -> Self {
        self.upgrade_url = url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Resolve a stored picture path (e.g. `"frags/42.jpg"`) under the uploads prefix.
    ///
    /// Returns `None` for an empty path or one that cannot be joined.
    pub fn upload_url(&self, picture: &str) -> Option<Url> {
        let relative = picture.trim().trim_start_matches('/');
        if relative.is_empty() {
            return None;
        }
        self.uploads_url.join(relative).ok()
    }
}

/// Parse a URL and make sure its path ends with `/` so joins append.
fn default_dir_url(raw: &'static str) -> Url {
    parse_dir_url(raw).expect("built-in default URL is valid")
}

fn parse_dir_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if url.cannot_be_a_base() {
        return Err(Error::Config(format!("URL cannot be used as a base: {}", raw)));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Cache-layer defaults.
#[derive(Clone, Debug)]
pub struct QueryConfig {
    /// Freshness window after a successful fetch.
    pub stale_time: Duration,
    /// How long an entry with no subscribers is retained.
    pub gc_time: Duration,
    /// Retries after the first failed attempt (retryable errors only).
    pub retry: u32,
    /// Base delay of the exponential backoff.
    pub retry_delay: Duration,
    /// Upper bound for a single backoff delay.
    pub max_retry_delay: Duration,
    pub stale_policy: StalePolicy,
}

impl Default for QueryConfig {
    fn default() -> Self {
        QueryConfig {
            stale_time: Duration::from_secs(60),
            gc_time: Duration::from_secs(300),
            retry: 3,
            retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(30),
            stale_policy: StalePolicy::Default,
        }
    }
}

impl QueryConfig {
    pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = stale_time;
        self
    }

    pub fn with_gc_time(mut self, gc_time: Duration) -> Self {
        self.gc_time = gc_time;
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_stale_policy(mut self, policy: StalePolicy) -> Self {
        self.stale_policy = policy;
        self
    }

    /// Delay before retry number `attempt` (1-based): `retry_delay * 2^(attempt-1)`, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        self.retry_delay
            .saturating_mul(factor)
            .min(self.max_retry_delay)
    }
}
