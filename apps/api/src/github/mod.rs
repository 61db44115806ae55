//! GitHub fetcher: retrieves a user's public profile and repositories from
//! the REST API and aggregates them into a `GitHubSnapshot`.
//!
//! Snapshots are built fresh for every request and never cached. Outbound
//! calls go through the shared `RetryPolicy`; with the default policy a rate
//! limit is surfaced on the first response.

pub mod snapshot;

use std::collections::HashMap;

use anyhow::Context;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::outbound::{RetryPolicy, Transient};
use snapshot::{counted_repos, summarize, ApiRepo, ApiUser, GitHubSnapshot};

const REPOS_PER_PAGE: usize = 100;
const MAX_USERNAME_LEN: usize = 39;

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("Invalid GitHub username '{0}': use 1-39 letters, digits, or single hyphens")]
    InvalidUsername(String),

    #[error("GitHub user '{0}' not found")]
    UserNotFound(String),

    #[error("GitHub API rate limit exceeded. Please try again later or configure an access token")]
    RateLimited {
        reset_at: Option<DateTime<Utc>>,
        retry_after_secs: Option<u64>,
    },

    #[error("Failed to connect to GitHub API: {0}")]
    Network(#[source] reqwest::Error),

    #[error("GitHub API request timed out")]
    Timeout,

    #[error("GitHub API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected GitHub API payload: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for GitHubError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            GitHubError::Timeout
        } else {
            GitHubError::Network(e)
        }
    }
}

impl Transient for GitHubError {
    fn is_transient(&self) -> bool {
        match self {
            GitHubError::Network(_) => true,
            GitHubError::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Checks GitHub's username rules before any call is made.
pub fn validate_username(username: &str) -> Result<(), GitHubError> {
    let valid = !username.is_empty()
        && username.len() <= MAX_USERNAME_LEN
        && username.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !username.starts_with('-')
        && !username.ends_with('-')
        && !username.contains("--");

    if valid {
        Ok(())
    } else {
        Err(GitHubError::InvalidUsername(username.to_string()))
    }
}

#[derive(Clone)]
pub struct GitHubClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    max_repo_pages: u32,
    language_repos: usize,
    policy: RetryPolicy,
}

impl GitHubClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            )),
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static("2022-11-28"),
        );

        let client = Client::builder()
            .timeout(config.github_timeout)
            .default_headers(headers)
            .build()
            .context("Failed to build GitHub HTTP client")?;

        Ok(Self {
            client,
            base_url: config.github_api_base.trim_end_matches('/').to_string(),
            token: config.github_token.clone(),
            max_repo_pages: config.github_max_repo_pages,
            language_repos: config.github_language_repos,
            policy: RetryPolicy::with_attempts(config.outbound_max_attempts),
        })
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Fetches the profile, repository listings and language breakdowns for
    /// `username` and aggregates them.
    pub async fn fetch_snapshot(&self, username: &str) -> Result<GitHubSnapshot, GitHubError> {
        validate_username(username)?;

        info!("Fetching GitHub profile for user: {username}");
        let user: ApiUser = self
            .get_json(&format!("/users/{username}"), &[], username)
            .await?;

        let repos = self.fetch_repos(username).await?;
        info!("Fetched {} repositories for {username}", repos.len());

        let language_bytes = self.fetch_language_bytes(&user.login, &repos).await;

        let snapshot = summarize(&user, &repos, &language_bytes, Utc::now());
        info!(
            "Summary complete: {} repos, {} languages",
            snapshot.stats.total_repositories,
            snapshot.stats.languages_used.len()
        );
        Ok(snapshot)
    }

    async fn fetch_repos(&self, username: &str) -> Result<Vec<ApiRepo>, GitHubError> {
        let mut repos = Vec::new();
        let per_page = REPOS_PER_PAGE.to_string();

        for page in 1..=self.max_repo_pages {
            let page = page.to_string();
            let batch: Vec<ApiRepo> = self
                .get_json(
                    &format!("/users/{username}/repos"),
                    &[
                        ("per_page", per_page.as_str()),
                        ("sort", "updated"),
                        ("page", page.as_str()),
                    ],
                    username,
                )
                .await?;

            let short_page = batch.len() < REPOS_PER_PAGE;
            repos.extend(batch);
            if short_page {
                break;
            }
        }

        Ok(repos)
    }

    /// Language breakdowns for the most-starred repositories, fetched
    /// concurrently. A failed lookup only loses that repository's bytes.
    async fn fetch_language_bytes(
        &self,
        owner: &str,
        repos: &[ApiRepo],
    ) -> HashMap<String, HashMap<String, u64>> {
        let mut candidates: Vec<&ApiRepo> = counted_repos(repos).collect();
        candidates.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));
        candidates.truncate(self.language_repos);

        let lookups = candidates.into_iter().map(move |repo| async move {
            let result: Result<HashMap<String, u64>, GitHubError> = self
                .get_json(&format!("/repos/{owner}/{}/languages", repo.name), &[], owner)
                .await;
            (repo.name.clone(), result)
        });

        join_all(lookups)
            .await
            .into_iter()
            .filter_map(|(name, result)| match result {
                Ok(breakdown) => Some((name, breakdown)),
                Err(e) => {
                    warn!("Could not fetch languages for {name}: {e}");
                    None
                }
            })
            .collect()
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        username: &str,
    ) -> Result<T, GitHubError> {
        let url = format!("{}{}", self.base_url, path);
        let url = url.as_str();
        self.policy
            .execute("GitHub call", move || async move {
                debug!("GET {url}");
                let mut request = self.client.get(url).query(query);
                if let Some(token) = &self.token {
                    request = request.bearer_auth(token);
                }
                let response = check_status(request.send().await?, username).await?;
                let body = response.text().await?;
                serde_json::from_str::<T>(&body).map_err(|e| GitHubError::Decode(e.to_string()))
            })
            .await
    }
}

/// Maps non-success responses to typed errors.
async fn check_status(response: Response, username: &str) -> Result<Response, GitHubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    debug!("GitHub API returned {status} for {}", response.url());

    match status {
        StatusCode::NOT_FOUND => Err(GitHubError::UserNotFound(username.to_string())),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::FORBIDDEN => {
            let headers = response.headers();
            let reset_at = headers
                .get("x-ratelimit-reset")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<i64>().ok())
                .and_then(|secs| DateTime::from_timestamp(secs, 0));
            let retry_after_secs = headers
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            warn!("GitHub API rate limit hit (reset at {reset_at:?})");
            Err(GitHubError::RateLimited {
                reset_at,
                retry_after_secs,
            })
        }
        _ => {
            let message = response.text().await.unwrap_or_default();
            Err(GitHubError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}
