//! Console configuration
//!
//! Configuration is read from a TOML file and then overridden from the
//! environment:
//!
//! ```toml
//! [api]
//! base_url = "https://school.example.com/api"
//! timeout_secs = 30
//! company_id = "42"
//!
//! [cache]
//! stale_after_secs = 300
//! search_debounce_ms = 300
//! max_entries = 256
//!
//! [pagination]
//! default_limit = 10
//! options_limit = 100
//! ```
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `CAMPUS_API_URL` | `api.base_url` |
//! | `CAMPUS_COMPANY_ID` | `api.company_id` |
//! | `CAMPUS_API_TOKEN` | `api.token` |

use crate::error::{ConsoleError, ConsoleResult};
use crate::traits::Validatable;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const ENV_API_URL: &str = "CAMPUS_API_URL";
pub const ENV_COMPANY_ID: &str = "CAMPUS_COMPANY_ID";
pub const ENV_API_TOKEN: &str = "CAMPUS_API_TOKEN";

// ============================================================================
// Sections
// ============================================================================

/// Connection settings for the school-management API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Tenant id, sent opaquely with every request
    pub company_id: Option<String>,
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            timeout_secs: 30,
            company_id: None,
            token: None,
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// List cache behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Age after which a cached page counts as stale; `None` keeps pages
    /// fresh until invalidated
    pub stale_after_secs: Option<u64>,

    /// Trailing-edge debounce window for search input
    pub search_debounce_ms: u64,

    /// Cached keys kept before the oldest are evicted
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_after_secs: None,
            search_debounce_ms: 300,
            max_entries: 256,
        }
    }
}

impl CacheConfig {
    pub fn stale_after(&self) -> Option<Duration> {
        self.stale_after_secs.map(Duration::from_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }
}

/// Page sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    /// Rows per page in list views
    pub default_limit: u32,
    /// Rows fetched for a dependent dropdown
    pub options_limit: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_limit: crate::query::DEFAULT_LIMIT,
            options_limit: 100,
        }
    }
}

// ============================================================================
// ConsoleConfig
// ============================================================================

/// Complete console configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub api: ApiConfig,
    pub cache: CacheConfig,
    pub pagination: PaginationConfig,
}

impl ConsoleConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> ConsoleResult<Self> {
        let config: ConsoleConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> ConsoleResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConsoleError::FileRead {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content)
    }

    /// Load from an optional file, apply environment overrides, validate
    pub fn resolve(path: Option<&Path>) -> ConsoleResult<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production)
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL) {
            tracing::debug!(%url, "API base URL overridden from environment");
            self.api.base_url = url;
        }
        if let Some(company) = lookup(ENV_COMPANY_ID) {
            self.api.company_id = Some(company);
        }
        if let Some(token) = lookup(ENV_API_TOKEN) {
            self.api.token = Some(token);
        }
    }
}

impl Validatable for ConsoleConfig {
    fn validate(&self) -> ConsoleResult<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(ConsoleError::config("api.base_url must not be empty"));
        }
        if self.api.timeout_secs == 0 {
            return Err(ConsoleError::config("api.timeout_secs must be at least 1"));
        }
        if self.cache.max_entries == 0 {
            return Err(ConsoleError::config("cache.max_entries must be at least 1"));
        }
        if self.pagination.default_limit == 0 {
            return Err(ConsoleError::config("pagination.default_limit must be at least 1"));
        }
        if self.pagination.options_limit == 0 {
            return Err(ConsoleError::config("pagination.options_limit must be at least 1"));
        }
        Ok(())
    }
}
