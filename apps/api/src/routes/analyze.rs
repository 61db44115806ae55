use axum::{
    extract::{
        multipart::MultipartRejection, rejection::QueryRejection, Multipart, Path, Query, State,
    },
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::analysis::github::{analyze_github_profile, GitHubAnalysis};
use crate::analysis::resume::{analyze_resume, ExperienceInfo, ResumeAnalysis, SkillScore, TechStack};
use crate::errors::AppError;
use crate::github::snapshot::{GitHubSnapshot, GitHubStats, GitHubUser, RepositorySummary};
use crate::preprocess::{detect_sections, preprocess, text_statistics, TextStatistics};
use crate::routes::upload::{extract_upload, receive_upload, UploadedFile};
use crate::state::AppState;

/// Resumes with less extracted text than this are rejected before the LLM call.
pub const MIN_TEXT_CHARS: usize = 50;
const TOP_REPOSITORIES: usize = 5;
const PREVIEW_CHARS: usize = 1000;

#[derive(Serialize)]
pub struct ResumeAnalysisResponse {
    pub status: &'static str,
    pub request_id: Uuid,
    pub filename: String,
    pub skills: Vec<SkillScore>,
    pub experience: Option<ExperienceInfo>,
    pub tech_stack: TechStack,
    pub summary: String,
    pub raw_text_length: usize,
    pub message: String,
}

#[derive(Serialize)]
pub struct GitHubAnalysisResponse {
    pub status: &'static str,
    pub request_id: Uuid,
    pub username: String,
    pub github_url: String,
    pub user_info: GitHubUser,
    pub stats: GitHubStats,
    pub top_repositories: Vec<RepositorySummary>,
    pub analysis: GitHubAnalysis,
    pub message: String,
}

#[derive(Serialize)]
pub struct CombinedAnalysisResponse {
    pub status: &'static str,
    pub request_id: Uuid,
    pub filename: String,
    pub resume_analysis: ResumeAnalysis,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_analysis: Option<GitHubSection>,
}

/// GitHub half of a combined analysis: either the result or the error that
/// prevented it.
#[derive(Serialize)]
#[serde(untagged)]
pub enum GitHubSection {
    Success {
        status: &'static str,
        username: String,
        stats: GitHubStats,
        analysis: GitHubAnalysis,
    },
    Failed(serde_json::Value),
}

#[derive(Serialize)]
pub struct ExtractTextResponse {
    pub status: &'static str,
    pub request_id: Uuid,
    pub filename: String,
    pub raw_text: String,
    pub cleaned_text: String,
    pub statistics: TextStatistics,
    pub sections: Vec<&'static str>,
}

#[derive(Deserialize)]
pub struct CombinedQuery {
    pub github_username: Option<String>,
}

/// POST /analyze
pub async fn handle_analyze_resume(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ResumeAnalysisResponse>, AppError> {
    let request_id = Uuid::new_v4();
    let upload = receive_upload(multipart?, &state.config).await?;
    let filename = upload.filename.clone();
    info!(%request_id, "Analyzing resume {filename} ({} bytes)", upload.size);

    let (analysis, raw_text_length) = run_resume_pipeline(&state, upload).await?;
    info!(%request_id, "Resume analysis complete: {} skills", analysis.skills.len());

    Ok(Json(ResumeAnalysisResponse {
        status: "success",
        request_id,
        filename,
        message: format!(
            "Successfully analyzed resume with {} skills identified",
            analysis.skills.len()
        ),
        skills: analysis.skills,
        experience: analysis.experience,
        tech_stack: analysis.tech_stack,
        summary: analysis.summary,
        raw_text_length,
    }))
}

/// GET /analyze/github/:username
pub async fn handle_analyze_github(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<GitHubAnalysisResponse>, AppError> {
    let request_id = Uuid::new_v4();
    info!(%request_id, "Analyzing GitHub profile {username}");

    let (snapshot, analysis) = run_github_pipeline(&state, &username).await?;
    let GitHubSnapshot {
        user,
        stats,
        mut repositories,
    } = snapshot;
    repositories.truncate(TOP_REPOSITORIES);
    info!(%request_id, "GitHub analysis complete for {}", user.username);

    Ok(Json(GitHubAnalysisResponse {
        status: "success",
        request_id,
        message: format!("Successfully analyzed GitHub profile for {}", user.username),
        username: user.username.clone(),
        github_url: user.profile_url.clone(),
        user_info: user,
        stats,
        top_repositories: repositories,
        analysis,
    }))
}

/// POST /analyze/combined?github_username=
///
/// The resume and GitHub pipelines run concurrently. A resume failure fails
/// the request and cancels the GitHub side; a GitHub failure is embedded and
/// the response is marked `partial_success`.
pub async fn handle_analyze_combined(
    State(state): State<AppState>,
    query: Result<Query<CombinedQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<CombinedAnalysisResponse>, AppError> {
    let request_id = Uuid::new_v4();
    let Query(query) = query?;
    let upload = receive_upload(multipart?, &state.config).await?;
    let filename = upload.filename.clone();
    let username = query
        .github_username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());
    info!(%request_id, "Combined analysis: resume {filename}, GitHub {username:?}");

    let resume = run_resume_pipeline(&state, upload);
    let github = async {
        let Some(username) = username.as_deref() else {
            return Ok::<_, AppError>(None);
        };
        let section = match run_github_pipeline(&state, username).await {
            Ok((snapshot, analysis)) => GitHubSection::Success {
                status: "success",
                username: snapshot.user.username,
                stats: snapshot.stats,
                analysis,
            },
            Err(e) => {
                warn!(%request_id, "GitHub half of combined analysis failed: {e}");
                GitHubSection::Failed(e.to_embedded())
            }
        };
        Ok(Some(section))
    };

    let ((resume_analysis, _), github_analysis) = tokio::try_join!(resume, github)?;

    let status = match github_analysis {
        Some(GitHubSection::Failed(_)) => "partial_success",
        _ => "success",
    };
    info!(%request_id, "Combined analysis finished with status {status}");

    Ok(Json(CombinedAnalysisResponse {
        status,
        request_id,
        filename,
        resume_analysis,
        github_analysis,
    }))
}

/// POST /extract-text
pub async fn handle_extract_text(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractTextResponse>, AppError> {
    let request_id = Uuid::new_v4();
    let upload = receive_upload(multipart?, &state.config).await?;
    info!(%request_id, "Extracting text from {}", upload.filename);

    let raw_text = extract_upload(&upload).await?;
    let UploadedFile { filename, .. } = upload;
    let cleaned_text = preprocess(&raw_text);

    Ok(Json(ExtractTextResponse {
        status: "success",
        request_id,
        filename,
        statistics: text_statistics(&cleaned_text),
        sections: detect_sections(&cleaned_text),
        raw_text: preview(&raw_text),
        cleaned_text: preview(&cleaned_text),
    }))
}

/// Extract, check, preprocess, analyze. The temp file is released as soon as
/// its text has been read. Returns the analysis and the raw text length.
async fn run_resume_pipeline(
    state: &AppState,
    upload: UploadedFile,
) -> Result<(ResumeAnalysis, usize), AppError> {
    let raw_text = extract_upload(&upload).await?;
    drop(upload);

    let length = raw_text.trim().chars().count();
    if length < MIN_TEXT_CHARS {
        return Err(AppError::InsufficientText {
            length,
            minimum: MIN_TEXT_CHARS,
        });
    }

    let cleaned = preprocess(&raw_text);
    let analysis = analyze_resume(&cleaned, &state.llm).await?;
    Ok((analysis, raw_text.chars().count()))
}

/// Fetch, check, analyze.
async fn run_github_pipeline(
    state: &AppState,
    username: &str,
) -> Result<(GitHubSnapshot, GitHubAnalysis), AppError> {
    let snapshot = state.github.fetch_snapshot(username).await?;
    if snapshot.stats.total_repositories == 0 {
        return Err(AppError::UnprocessableEntity(format!(
            "GitHub user '{username}' has no public repositories to analyze"
        )));
    }

    let analysis = analyze_github_profile(&snapshot, &state.llm).await?;
    Ok((snapshot, analysis))
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let head: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
