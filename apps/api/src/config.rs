use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub google_api_key: String,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub llm_temperature: f32,
    pub llm_max_output_tokens: u32,
    pub llm_timeout: Duration,
    pub github_token: Option<String>,
    pub github_api_base: String,
    pub github_timeout: Duration,
    pub github_max_repo_pages: u32,
    pub github_language_repos: usize,
    pub outbound_max_attempts: u32,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    pub max_upload_bytes: usize,
    pub upload_dir: PathBuf,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let debug = parse_bool(get("DEBUG"), "DEBUG")?;
        let default_log = if debug { "debug" } else { "info" };

        Ok(Config {
            google_api_key: get("GOOGLE_API_KEY").with_context(|| {
                "Required environment variable 'GOOGLE_API_KEY' is not set".to_string()
            })?,
            gemini_model: get("GEMINI_MODEL").unwrap_or_else(|| "gemini-2.0-flash".to_string()),
            gemini_api_base: get("GEMINI_API_BASE")
                .unwrap_or_else(|| "https://generativelanguage.googleapis.com".to_string()),
            llm_temperature: parse_or(get("LLM_TEMPERATURE"), "LLM_TEMPERATURE", 0.7)?,
            llm_max_output_tokens: parse_or(
                get("LLM_MAX_OUTPUT_TOKENS"),
                "LLM_MAX_OUTPUT_TOKENS",
                2048,
            )?,
            llm_timeout: Duration::from_secs(parse_or(
                get("LLM_TIMEOUT_SECS"),
                "LLM_TIMEOUT_SECS",
                60,
            )?),
            github_token: get("GITHUB_TOKEN"),
            github_api_base: get("GITHUB_API_BASE")
                .unwrap_or_else(|| "https://api.github.com".to_string()),
            github_timeout: Duration::from_secs(parse_or(
                get("GITHUB_TIMEOUT_SECS"),
                "GITHUB_TIMEOUT_SECS",
                15,
            )?),
            github_max_repo_pages: parse_or(
                get("GITHUB_MAX_REPO_PAGES"),
                "GITHUB_MAX_REPO_PAGES",
                3,
            )?
            .max(1),
            github_language_repos: parse_or(
                get("GITHUB_LANGUAGE_REPOS"),
                "GITHUB_LANGUAGE_REPOS",
                10,
            )?,
            outbound_max_attempts: parse_or(
                get("OUTBOUND_MAX_ATTEMPTS"),
                "OUTBOUND_MAX_ATTEMPTS",
                1,
            )?
            .max(1),
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(get("PORT"), "PORT", 8000)?,
            debug,
            max_upload_bytes: parse_or(
                get("MAX_UPLOAD_BYTES"),
                "MAX_UPLOAD_BYTES",
                DEFAULT_MAX_UPLOAD_BYTES,
            )?,
            upload_dir: get("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(std::env::temp_dir),
            rust_log: get("RUST_LOG").unwrap_or_else(|| default_log.to_string()),
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{value}'")),
        None => Ok(default),
    }
}

fn parse_bool(raw: Option<String>, key: &str) -> Result<bool> {
    match raw.as_deref().map(|v| v.trim().to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => anyhow::bail!("{key} must be a boolean, got '{v}'"),
    }
}

#[cfg(test)]
pub(crate) fn test_config(upload_dir: PathBuf) -> Config {
    Config {
        google_api_key: "test-key".to_string(),
        gemini_model: "gemini-test".to_string(),
        gemini_api_base: "http://127.0.0.1:9".to_string(),
        llm_temperature: 0.7,
        llm_max_output_tokens: 2048,
        llm_timeout: Duration::from_secs(5),
        github_token: None,
        github_api_base: "http://127.0.0.1:9".to_string(),
        github_timeout: Duration::from_secs(5),
        github_max_repo_pages: 1,
        github_language_repos: 0,
        outbound_max_attempts: 1,
        host: "127.0.0.1".to_string(),
        port: 0,
        debug: false,
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        upload_dir,
        rust_log: "info".to_string(),
    }
}
