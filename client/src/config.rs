//! Configuration for the sync client.

use std::env;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Default number of log entries fetched per page while scanning.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Client configuration, passed explicitly to every client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root, without trailing slash
    pub base_url: String,
    /// OAuth token; read-only access when absent
    pub token: Option<String>,
    /// Entries per page when scanning the change log
    pub page_size: u32,
    /// User-Agent sent with every request
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            page_size: DEFAULT_PAGE_SIZE,
            user_agent: concat!("streaks-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the OAuth token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Set the API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the scan page size. Zero is rejected.
    pub fn with_page_size(mut self, page_size: u32) -> Result<Self, ConfigError> {
        if page_size == 0 {
            return Err(ConfigError::InvalidPageSize(page_size.to_string()));
        }
        self.page_size = page_size;
        Ok(self)
    }

    /// Whether mutating operations are possible.
    pub fn has_credential(&self) -> bool {
        self.token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Load a `.env` file if present, then read the environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Load configuration from environment variables.
    ///
    /// `STREAKS_API_URL`, `STREAKS_TOKEN` (falling back to `GITHUB_TOKEN`)
    /// and `STREAKS_PAGE_SIZE` are all optional.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(base_url) = env::var("STREAKS_API_URL") {
            if base_url.is_empty() {
                return Err(ConfigError::InvalidBaseUrl);
            }
            config = config.with_base_url(base_url);
        }

        config.token = env::var("STREAKS_TOKEN")
            .or_else(|_| env::var("GITHUB_TOKEN"))
            .ok()
            .filter(|t| !t.is_empty());

        if let Ok(page_size) = env::var("STREAKS_PAGE_SIZE") {
            config.page_size = parse_page_size(&page_size)?;
        }

        Ok(config)
    }
}

fn parse_page_size(value: &str) -> Result<u32, ConfigError> {
    match value.trim().parse::<u32>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidPageSize(value.to_string())),
        Ok(n) => Ok(n),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("STREAKS_API_URL must not be empty")]
    InvalidBaseUrl,

    #[error("invalid STREAKS_PAGE_SIZE value {0:?}")]
    InvalidPageSize(String),
}
