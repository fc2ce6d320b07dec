//! Client configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const API_URL_ENV: &str = "HUMANMATCH_API_URL";
pub const TOKEN_FILE_ENV: &str = "HUMANMATCH_TOKEN_FILE";

const APP_DIR: &str = "humanmatch";
const SESSION_FILE: &str = "session.json";
const FALLBACK_SESSION_FILE: &str = ".humanmatch-session.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid API URL '{0}' (expected http:// or https://)")]
    InvalidApiUrl(String),
    #[error("{var} is set but empty")]
    Empty { var: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend base URL without a trailing slash.
    pub api_url: String,
    /// File holding the persisted session token.
    pub token_file: PathBuf,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `HUMANMATCH_API_URL`: default `http://localhost:8000`
    /// - `HUMANMATCH_TOKEN_FILE`: default `<config dir>/humanmatch/session.json`
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an empty or malformed value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClientConfig::from_env`] with an injectable variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an empty or malformed value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = match lookup(API_URL_ENV) {
            Some(raw) if raw.trim().is_empty() => return Err(ConfigError::Empty { var: API_URL_ENV }),
            Some(raw) => normalize_api_url(&raw)?,
            None => DEFAULT_API_URL.to_owned(),
        };
        let token_file = match lookup(TOKEN_FILE_ENV) {
            Some(raw) if raw.trim().is_empty() => return Err(ConfigError::Empty { var: TOKEN_FILE_ENV }),
            Some(raw) => PathBuf::from(raw.trim()),
            None => default_token_file(),
        };
        Ok(Self { api_url, token_file })
    }

    /// Replace the API URL, applying the same validation as the environment path.
    ///
    /// # Errors
    ///
    /// Returns an error if `raw` is not an http(s) URL.
    pub fn with_api_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.api_url = normalize_api_url(raw)?;
        Ok(self)
    }

    #[must_use]
    pub fn with_token_file(mut self, path: PathBuf) -> Self {
        self.token_file = path;
        self
    }
}

pub(crate) fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let has_host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"))
        .is_some_and(|rest| !rest.is_empty());
    if !has_host {
        return Err(ConfigError::InvalidApiUrl(raw.to_owned()));
    }
    Ok(trimmed.to_owned())
}

fn default_token_file() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join(APP_DIR).join(SESSION_FILE),
        None => PathBuf::from(FALLBACK_SESSION_FILE),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
