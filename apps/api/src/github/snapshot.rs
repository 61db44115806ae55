//! GitHub snapshot: the aggregated, point-in-time view of a user's public
//! profile and repositories that is handed to the LLM.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of repositories kept in the snapshot, by stars.
pub const SNAPSHOT_REPO_LIMIT: usize = 20;

// ────────────────────────────────────────────────────────────────────────────
// Upstream payloads (subset of the REST API fields we use)
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ApiUser {
    pub login: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub blog: Option<String>,
    pub twitter_username: Option<String>,
    #[serde(default)]
    pub followers: u64,
    #[serde(default)]
    pub following: u64,
    #[serde(default)]
    pub public_repos: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub html_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRepo {
    pub name: String,
    pub description: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
    #[serde(default)]
    pub topics: Vec<String>,
    pub html_url: String,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub fork: bool,
}

// ────────────────────────────────────────────────────────────────────────────
// Snapshot
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct GitHubUser {
    pub username: String,
    pub name: String,
    pub bio: String,
    pub location: Option<String>,
    pub company: Option<String>,
    pub email: Option<String>,
    pub blog: Option<String>,
    pub twitter: Option<String>,
    pub followers: u64,
    pub following: u64,
    pub public_repos: u64,
    pub created_at: Option<DateTime<Utc>>,
    pub profile_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RepositorySummary {
    pub name: String,
    pub description: String,
    pub language: String,
    pub stars: u64,
    pub forks: u64,
    pub topics: Vec<String>,
    pub url: String,
    pub updated_at: Option<DateTime<Utc>>,
    pub size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityMetrics {
    pub repos_per_year: f64,
    pub avg_stars_per_repo: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct GitHubStats {
    pub total_repositories: usize,
    /// Primary language → number of repositories.
    pub languages_used: BTreeMap<String, u64>,
    /// Language → bytes of code, from the per-repository breakdowns fetched.
    pub language_bytes: BTreeMap<String, u64>,
    pub total_stars_earned: u64,
    pub total_forks: u64,
    pub topics_explored: Vec<String>,
    pub activity_metrics: ActivityMetrics,
}

#[derive(Debug, Clone, Serialize)]
pub struct GitHubSnapshot {
    pub user: GitHubUser,
    pub stats: GitHubStats,
    pub repositories: Vec<RepositorySummary>,
}

/// Repositories that count toward the snapshot: forks only when starred.
pub fn counted_repos(repos: &[ApiRepo]) -> impl Iterator<Item = &ApiRepo> {
    repos
        .iter()
        .filter(|repo| !(repo.fork && repo.stargazers_count == 0))
}

/// Aggregates profile metadata and repository listings into a snapshot.
///
/// `language_bytes` maps repository name → that repository's language
/// breakdown; repositories without an entry contribute no bytes.
pub fn summarize(
    user: &ApiUser,
    repos: &[ApiRepo],
    language_bytes: &HashMap<String, HashMap<String, u64>>,
    now: DateTime<Utc>,
) -> GitHubSnapshot {
    let mut languages_used: BTreeMap<String, u64> = BTreeMap::new();
    let mut bytes_by_language: BTreeMap<String, u64> = BTreeMap::new();
    let mut topics: BTreeSet<String> = BTreeSet::new();
    let mut total_stars = 0;
    let mut total_forks = 0;
    let mut summaries = Vec::new();

    for repo in counted_repos(repos) {
        if let Some(language) = &repo.language {
            *languages_used.entry(language.clone()).or_default() += 1;
        }
        if let Some(breakdown) = language_bytes.get(&repo.name) {
            for (language, bytes) in breakdown {
                *bytes_by_language.entry(language.clone()).or_default() += bytes;
            }
        }

        total_stars += repo.stargazers_count;
        total_forks += repo.forks_count;
        topics.extend(repo.topics.iter().cloned());

        summaries.push(RepositorySummary {
            name: repo.name.clone(),
            description: repo
                .description
                .clone()
                .filter(|d| !d.trim().is_empty())
                .unwrap_or_else(|| "No description".to_string()),
            language: repo
                .language
                .clone()
                .unwrap_or_else(|| "Not specified".to_string()),
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            topics: repo.topics.clone(),
            url: repo.html_url.clone(),
            updated_at: repo.updated_at,
            size: repo.size,
        });
    }

    // Stable sort keeps the upstream "recently updated" order among ties.
    summaries.sort_by(|a, b| b.stars.cmp(&a.stars));
    summaries.truncate(SNAPSHOT_REPO_LIMIT);

    let account_years = user
        .created_at
        .map(|created| (now - created).num_days() as f64 / 365.25)
        .unwrap_or(0.0)
        .max(1.0);
    let total_repositories = repos.len();

    GitHubSnapshot {
        user: GitHubUser {
            username: user.login.clone(),
            name: user
                .name
                .clone()
                .filter(|n| !n.trim().is_empty())
                .unwrap_or_else(|| user.login.clone()),
            bio: user
                .bio
                .clone()
                .filter(|b| !b.trim().is_empty())
                .unwrap_or_else(|| "No bio provided".to_string()),
            location: user.location.clone(),
            company: user.company.clone(),
            email: user.email.clone(),
            blog: user.blog.clone().filter(|b| !b.is_empty()),
            twitter: user.twitter_username.clone(),
            followers: user.followers,
            following: user.following,
            public_repos: user.public_repos,
            created_at: user.created_at,
            profile_url: user.html_url.clone(),
        },
        stats: GitHubStats {
            total_repositories,
            languages_used,
            language_bytes: bytes_by_language,
            total_stars_earned: total_stars,
            total_forks,
            topics_explored: topics.into_iter().collect(),
            activity_metrics: ActivityMetrics {
                repos_per_year: round2(total_repositories as f64 / account_years),
                avg_stars_per_repo: if total_repositories == 0 {
                    0.0
                } else {
                    round2(total_stars as f64 / total_repositories as f64)
                },
            },
        },
        repositories: summaries,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::TimeZone;

    use super::*;

    pub(crate) fn api_user(login: &str) -> ApiUser {
        ApiUser {
            login: login.to_string(),
            name: None,
            bio: Some(String::new()),
            location: Some("Berlin".to_string()),
            company: None,
            email: None,
            blog: Some(String::new()),
            twitter_username: None,
            followers: 10,
            following: 2,
            public_repos: 4,
            created_at: Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap()),
            html_url: format!("https://github.com/{login}"),
        }
    }

    pub(crate) fn api_repo(name: &str, language: Option<&str>, stars: u64, fork: bool) -> ApiRepo {
        ApiRepo {
            name: name.to_string(),
            description: None,
            language: language.map(String::from),
            stargazers_count: stars,
            forks_count: stars / 2,
            topics: vec!["cli".to_string()],
            html_url: format!("https://github.com/octo/{name}"),
            updated_at: None,
            size: 100,
            fork,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_summarize_aggregates_languages_stars_and_forks() {
        let repos = vec![
            api_repo("a", Some("Rust"), 10, false),
            api_repo("b", Some("Rust"), 4, false),
            api_repo("c", Some("Python"), 0, false),
            api_repo("d", None, 2, false),
        ];
        let snapshot = summarize(&api_user("octo"), &repos, &HashMap::new(), now());

        assert_eq!(snapshot.stats.total_repositories, 4);
        assert_eq!(snapshot.stats.languages_used.get("Rust"), Some(&2));
        assert_eq!(snapshot.stats.languages_used.get("Python"), Some(&1));
        assert_eq!(snapshot.stats.total_stars_earned, 16);
        assert_eq!(snapshot.stats.total_forks, 5 + 2 + 1);
        assert_eq!(snapshot.stats.topics_explored, vec!["cli".to_string()]);
        assert_eq!(snapshot.stats.activity_metrics.avg_stars_per_repo, 4.0);
    }

    #[test]
    fn test_summarize_skips_unstarred_forks() {
        let repos = vec![
            api_repo("own", Some("Go"), 1, false),
            api_repo("fork-empty", Some("C"), 0, true),
            api_repo("fork-starred", Some("Zig"), 3, true),
        ];
        let snapshot = summarize(&api_user("octo"), &repos, &HashMap::new(), now());
        let names: Vec<_> = snapshot.repositories.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["fork-starred", "own"]);
        assert!(!snapshot.stats.languages_used.contains_key("C"));
    }

    #[test]
    fn test_summarize_sorts_by_stars_and_truncates() {
        let repos: Vec<_> = (0..30)
            .map(|i| api_repo(&format!("r{i}"), Some("Rust"), i, false))
            .collect();
        let snapshot = summarize(&api_user("octo"), &repos, &HashMap::new(), now());
        assert_eq!(snapshot.repositories.len(), SNAPSHOT_REPO_LIMIT);
        assert_eq!(snapshot.repositories[0].stars, 29);
        assert_eq!(snapshot.repositories[19].stars, 10);
    }

    #[test]
    fn test_summarize_sums_language_bytes() {
        let repos = vec![
            api_repo("a", Some("Rust"), 1, false),
            api_repo("b", Some("Rust"), 1, false),
        ];
        let mut bytes = HashMap::new();
        bytes.insert(
            "a".to_string(),
            HashMap::from([("Rust".to_string(), 1000), ("Shell".to_string(), 50)]),
        );
        bytes.insert("b".to_string(), HashMap::from([("Rust".to_string(), 500)]));
        let snapshot = summarize(&api_user("octo"), &repos, &bytes, now());
        assert_eq!(snapshot.stats.language_bytes.get("Rust"), Some(&1500));
        assert_eq!(snapshot.stats.language_bytes.get("Shell"), Some(&50));
    }

    #[test]
    fn test_summarize_fills_profile_fallbacks() {
        let snapshot = summarize(&api_user("octo"), &[], &HashMap::new(), now());
        assert_eq!(snapshot.user.name, "octo");
        assert_eq!(snapshot.user.bio, "No bio provided");
        assert_eq!(snapshot.user.blog, None);
        assert_eq!(snapshot.stats.activity_metrics.avg_stars_per_repo, 0.0);
        assert!(snapshot.repositories.is_empty());
    }

    #[test]
    fn test_repo_fallback_strings() {
        let repos = vec![api_repo("a", None, 1, false)];
        let snapshot = summarize(&api_user("octo"), &repos, &HashMap::new(), now());
        assert_eq!(snapshot.repositories[0].description, "No description");
        assert_eq!(snapshot.repositories[0].language, "Not specified");
    }

    #[test]
    fn test_repos_per_year_uses_account_age() {
        let repos: Vec<_> = (0..8)
            .map(|i| api_repo(&format!("r{i}"), None, 0, false))
            .collect();
        // Four years between 2020-01-01 and 2024-01-01.
        let snapshot = summarize(&api_user("octo"), &repos, &HashMap::new(), now());
        assert!((snapshot.stats.activity_metrics.repos_per_year - 2.0).abs() < 0.01);
    }
}
