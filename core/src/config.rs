//! Connection settings for a TestRail instance.

use std::fmt;

use serde::Deserialize;

use crate::error::{ApiError, Result};

pub const ENV_URL: &str = "TESTRAIL_URL";
pub const ENV_USERNAME: &str = "TESTRAIL_USERNAME";
pub const ENV_API_KEY: &str = "TESTRAIL_API_KEY";

/// Base URL and credentials supplied by the embedding application.
#[derive(Clone, Deserialize)]
pub struct TestRailConfig {
    pub base_url: String,
    pub username: String,
    pub api_key: String,
}

impl TestRailConfig {
    pub fn new(
        base_url: impl Into<String>,
        username: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            username: username.into(),
            api_key: api_key.into(),
        }
    }

    /// Read `TESTRAIL_URL`, `TESTRAIL_USERNAME` and `TESTRAIL_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; empty values count as missing.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let require = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or_else(|| ApiError::Config(format!("{key} is not set")))
        };
        Ok(Self {
            base_url: require(ENV_URL)?,
            username: require(ENV_USERNAME)?,
            api_key: require(ENV_API_KEY)?,
        })
    }
}

impl fmt::Debug for TestRailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestRailConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .finish()
    }
}
