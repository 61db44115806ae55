use crate::config::Config;
use crate::github::GitHubClient;
use crate::llm_client::LlmClient;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub llm: LlmClient,
    pub github: GitHubClient,
}

impl AppState {
    /// Builds both outbound clients from one configuration value.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        Ok(Self {
            llm: LlmClient::new(&config)?,
            github: GitHubClient::new(&config)?,
            config,
        })
    }
}
