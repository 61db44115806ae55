//! GitHub profile analyzer: assesses a `GitHubSnapshot` the way a technical
//! recruiter would.

use std::collections::BTreeMap;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use tracing::info;

use super::{decode, null_as_default, required, required_text, score, years, AnalysisError, Validated};
use crate::github::snapshot::GitHubSnapshot;
use crate::llm_client::prompts::system_prompt;
use crate::llm_client::LlmClient;

const GITHUB_PERSONA: &str = "You are an expert Technical Recruiter analyzing a GitHub profile.";

const GITHUB_PROMPT_TEMPLATE: &str = r#"Provide a structured assessment of the GitHub profile below.

GITHUB PROFILE DATA:
{profile_json}

Return a JSON object with this EXACT structure:

{
  "overall_experience_level": "Beginner|Intermediate|Advanced|Expert",
  "experience_years_estimate": 0.0,
  "skills_with_scores": {
    "language_name": 1-10
  },
  "dominant_tech_stack": {
    "languages": ["Python", "JavaScript"],
    "frameworks": ["React", "FastAPI"],
    "tools": ["Docker", "Git"],
    "domains": ["AI/ML", "Web Development"]
  },
  "project_analysis": {
    "total_analyzed": 0,
    "notable_projects": [
      {
        "name": "project_name",
        "description": "brief description",
        "complexity_score": 1-10,
        "impact_score": 1-10,
        "technologies": ["tech1", "tech2"],
        "stars": 0
      }
    ],
    "project_domains": ["AI/ML", "Web Dev", "Data Science"]
  },
  "activity_assessment": {
    "consistency": "Low|Medium|High",
    "community_engagement": "Low|Medium|High",
    "code_quality_indicators": "Stars and forks suggest quality level"
  },
  "strengths": ["strength1", "strength2"],
  "areas_for_growth": ["area1", "area2"],
  "professional_summary": "2-3 sentence summary of technical profile"
}

SCORING GUIDE:
- Skills (1-10): Based on frequency, project complexity, recent activity
- Complexity (1-10): 1=basic, 5=moderate, 10=highly complex
- Impact (1-10): Based on stars, forks, description

Experience Level:
- Beginner: <1 year, basic projects
- Intermediate: 1-3 years, moderate complexity
- Advanced: 3-5 years, complex projects, good engagement
- Expert: 5+ years, highly complex projects, strong community presence"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExperienceLevel {
    Beginner,
    Intermediate,
    Advanced,
    Expert,
}

impl ExperienceLevel {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(ExperienceLevel::Beginner),
            "intermediate" => Some(ExperienceLevel::Intermediate),
            "advanced" => Some(ExperienceLevel::Advanced),
            "expert" => Some(ExperienceLevel::Expert),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DominantTechStack {
    #[serde(default, deserialize_with = "null_as_default")]
    pub languages: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub frameworks: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tools: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub domains: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotableProject {
    pub name: String,
    pub description: String,
    pub complexity_score: u8,
    pub impact_score: u8,
    pub technologies: Vec<String>,
    pub stars: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProjectAnalysis {
    pub total_analyzed: u64,
    pub notable_projects: Vec<NotableProject>,
    pub project_domains: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActivityAssessment {
    #[serde(default, deserialize_with = "null_as_default")]
    pub consistency: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub community_engagement: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub code_quality_indicators: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GitHubAnalysis {
    pub overall_experience_level: ExperienceLevel,
    pub experience_years_estimate: f64,
    pub skills_with_scores: BTreeMap<String, u8>,
    pub dominant_tech_stack: DominantTechStack,
    pub project_analysis: ProjectAnalysis,
    pub activity_assessment: ActivityAssessment,
    pub strengths: Vec<String>,
    pub areas_for_growth: Vec<String>,
    pub professional_summary: String,
}

#[derive(Debug, Deserialize)]
struct RawGitHubAnalysis {
    overall_experience_level: Option<String>,
    experience_years_estimate: Option<Number>,
    skills_with_scores: Option<BTreeMap<String, Number>>,
    dominant_tech_stack: Option<DominantTechStack>,
    project_analysis: Option<RawProjectAnalysis>,
    activity_assessment: Option<ActivityAssessment>,
    #[serde(default, deserialize_with = "null_as_default")]
    strengths: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    areas_for_growth: Vec<String>,
    professional_summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawProjectAnalysis {
    total_analyzed: Option<u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    notable_projects: Vec<RawNotableProject>,
    #[serde(default, deserialize_with = "null_as_default")]
    project_domains: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawNotableProject {
    name: Option<String>,
    description: Option<String>,
    complexity_score: Option<Number>,
    impact_score: Option<Number>,
    #[serde(default, deserialize_with = "null_as_default")]
    technologies: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    stars: u64,
}

/// Validates a raw GitHub profile analysis response.
pub fn parse_github_analysis(raw: &str) -> Validated<GitHubAnalysis> {
    Validated::from_raw(raw, |raw| {
        let parsed: RawGitHubAnalysis = decode(raw)?;

        let level = required(parsed.overall_experience_level, "overall_experience_level")?;
        let overall_experience_level = ExperienceLevel::parse(&level).ok_or_else(|| {
            format!("unknown `overall_experience_level` '{level}'")
        })?;

        let skills_with_scores = required(parsed.skills_with_scores, "skills_with_scores")?
            .into_iter()
            .map(|(skill, value)| {
                let scored = score(Some(&value), &format!("skills_with_scores.{skill}"))?;
                Ok((skill, scored))
            })
            .collect::<Result<BTreeMap<_, _>, String>>()?;

        let experience_years_estimate = match parsed.experience_years_estimate {
            Some(value) => years(Some(&value), "experience_years_estimate")?,
            None => 0.0,
        };

        Ok(GitHubAnalysis {
            overall_experience_level,
            experience_years_estimate,
            skills_with_scores,
            dominant_tech_stack: parsed.dominant_tech_stack.unwrap_or_default(),
            project_analysis: parsed
                .project_analysis
                .map(validate_projects)
                .transpose()?
                .unwrap_or_default(),
            activity_assessment: parsed.activity_assessment.unwrap_or_default(),
            strengths: parsed.strengths,
            areas_for_growth: parsed.areas_for_growth,
            professional_summary: required_text(
                parsed.professional_summary,
                "professional_summary",
            )?,
        })
    })
}

fn validate_projects(projects: RawProjectAnalysis) -> Result<ProjectAnalysis, String> {
    let notable_projects = projects
        .notable_projects
        .into_iter()
        .enumerate()
        .map(|(i, project)| {
            let name = required_text(project.name, &format!("notable_projects[{i}].name"))?;
            Ok(NotableProject {
                description: project.description.unwrap_or_default(),
                complexity_score: score(
                    project.complexity_score.as_ref(),
                    &format!("{name}.complexity_score"),
                )?,
                impact_score: score(
                    project.impact_score.as_ref(),
                    &format!("{name}.impact_score"),
                )?,
                technologies: project.technologies,
                stars: project.stars,
                name,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;

    Ok(ProjectAnalysis {
        total_analyzed: projects
            .total_analyzed
            .unwrap_or(notable_projects.len() as u64),
        notable_projects,
        project_domains: projects.project_domains,
    })
}

/// Sends an aggregated snapshot to the LLM and validates the assessment.
pub async fn analyze_github_profile(
    snapshot: &GitHubSnapshot,
    llm: &LlmClient,
) -> Result<GitHubAnalysis, AnalysisError> {
    let profile_json = serde_json::to_string_pretty(snapshot)
        .context("serializing GitHub snapshot for the analysis prompt")?;
    let prompt = GITHUB_PROMPT_TEMPLATE.replace("{profile_json}", &profile_json);

    info!("Analyzing GitHub profile for {}", snapshot.user.username);
    let raw = llm
        .call_for_json(&prompt, &system_prompt(GITHUB_PERSONA))
        .await?;
    info!("Received GitHub analysis ({} chars)", raw.len());

    parse_github_analysis(&raw).into_result()
}
