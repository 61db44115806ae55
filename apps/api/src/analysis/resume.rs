//! Resume analyzer: skills, experience and tech stack from preprocessed
//! resume text.

use serde::{Deserialize, Serialize};
use serde_json::Number;
use tracing::info;

use super::{
    decode, null_as_default, required, required_text, score, years, AnalysisError, Validated,
};
use crate::llm_client::prompts::system_prompt;
use crate::llm_client::LlmClient;

const RESUME_PERSONA: &str = "You are an expert Resume Intelligence Analyst.";

const RESUME_PROMPT_TEMPLATE: &str = r#"Analyze the resume below and return ONLY a JSON object.

RESUME TEXT:
{resume_text}

Return a JSON object with this EXACT structure:

{
  "skills": [
    {
      "name": "skill name",
      "score": 1-10,
      "category": "Language|Framework|Tool|Library|Database|Cloud Platform",
      "description": "brief usage context"
    }
  ],
  "experience": {
    "total_years": 0.0,
    "confidence": "high|medium|low",
    "source": "how experience was determined"
  },
  "tech_stack": {
    "languages": [],
    "frameworks": [],
    "tools": [],
    "libraries": [],
    "databases": [],
    "cloud_platforms": []
  },
  "summary": "2-3 sentence professional summary"
}

SCORING GUIDE:
- 9-10: Very prominent, core expertise
- 6-8: Moderate frequency, practical experience
- 3-5: Mentioned 1-2 times
- 1-2: Briefly mentioned or inferred"#;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillScore {
    pub name: String,
    pub score: u8,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Some(Confidence::High),
            "medium" => Some(Confidence::Medium),
            "low" => Some(Confidence::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperienceInfo {
    pub total_years: f64,
    pub confidence: Confidence,
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechStack {
    #[serde(default, deserialize_with = "null_as_default")]
    pub languages: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub frameworks: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tools: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub libraries: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub databases: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cloud_platforms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResumeAnalysis {
    pub skills: Vec<SkillScore>,
    pub experience: Option<ExperienceInfo>,
    pub tech_stack: TechStack,
    pub summary: String,
}

#[derive(Debug, Deserialize)]
struct RawResumeAnalysis {
    skills: Option<Vec<RawSkill>>,
    experience: Option<RawExperience>,
    tech_stack: Option<TechStack>,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSkill {
    name: Option<String>,
    score: Option<Number>,
    category: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawExperience {
    total_years: Option<Number>,
    confidence: Option<String>,
    source: Option<String>,
}

/// Validates a raw resume analysis response.
pub fn parse_resume_analysis(raw: &str) -> Validated<ResumeAnalysis> {
    Validated::from_raw(raw, |raw| {
        let parsed: RawResumeAnalysis = decode(raw)?;

        let mut skills = required(parsed.skills, "skills")?
            .into_iter()
            .enumerate()
            .map(|(i, skill)| validate_skill(skill, i))
            .collect::<Result<Vec<_>, _>>()?;
        // Stable sort: ties keep the model's order.
        skills.sort_by(|a, b| b.score.cmp(&a.score));

        let experience = parsed.experience.map(validate_experience).transpose()?;

        Ok(ResumeAnalysis {
            skills,
            experience,
            tech_stack: parsed.tech_stack.unwrap_or_default(),
            summary: required_text(parsed.summary, "summary")?,
        })
    })
}

fn validate_skill(skill: RawSkill, index: usize) -> Result<SkillScore, String> {
    let name = required_text(skill.name, &format!("skills[{index}].name"))?;
    Ok(SkillScore {
        score: score(skill.score.as_ref(), &format!("skills[{index}] ({name})"))?,
        category: required_text(skill.category, &format!("skills[{index}].category"))?,
        description: skill
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        name,
    })
}

fn validate_experience(experience: RawExperience) -> Result<ExperienceInfo, String> {
    let confidence = required(experience.confidence, "experience.confidence")?;
    Ok(ExperienceInfo {
        total_years: years(experience.total_years.as_ref(), "experience.total_years")?,
        confidence: Confidence::parse(&confidence).ok_or_else(|| {
            format!("`experience.confidence` must be high, medium or low, got '{confidence}'")
        })?,
        source: experience.source.unwrap_or_default().trim().to_string(),
    })
}

/// Sends preprocessed resume text to the LLM and validates the result.
pub async fn analyze_resume(
    resume_text: &str,
    llm: &LlmClient,
) -> Result<ResumeAnalysis, AnalysisError> {
    let prompt = RESUME_PROMPT_TEMPLATE.replace("{resume_text}", resume_text);
    let raw = llm
        .call_for_json(&prompt, &system_prompt(RESUME_PERSONA))
        .await?;
    info!("Received resume analysis ({} chars)", raw.len());

    let analysis = parse_resume_analysis(&raw).into_result()?;
    info!("Resume analysis validated: {} skills", analysis.skills.len());
    Ok(analysis)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::test_config;

    pub(crate) const VALID_RESPONSE: &str = r#"{
        "skills": [
            {"name": "Docker", "score": 6, "category": "Tool"},
            {"name": "Rust", "score": 9, "category": "Language", "description": "Core services"},
            {"name": "Python", "score": 6, "category": "Language"}
        ],
        "experience": {"total_years": 5.5, "confidence": "HIGH", "source": "Dates in work history"},
        "tech_stack": {"languages": ["Rust", "Python"], "tools": ["Docker"]},
        "summary": "Backend engineer focused on Rust services."
    }"#;

    /// Wraps model text in a Gemini `generateContent` response envelope.
    pub(crate) fn gemini_body(text: &str) -> String {
        serde_json::json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": text}]},
                "finishReason": "STOP"
            }]
        })
        .to_string()
    }

    #[test]
    fn test_valid_response_is_sorted_and_normalized() {
        let analysis = match parse_resume_analysis(VALID_RESPONSE) {
            Validated::Valid(a) => a,
            other => panic!("expected valid, got {other:?}"),
        };
        let names: Vec<&str> = analysis.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Rust", "Docker", "Python"]);

        let experience = analysis.experience.unwrap();
        assert_eq!(experience.confidence, Confidence::High);
        assert_eq!(experience.total_years, 5.5);
        assert_eq!(analysis.tech_stack.languages, vec!["Rust", "Python"]);
        assert!(analysis.tech_stack.databases.is_empty());
    }

    #[test]
    fn test_fenced_response_parses() {
        let fenced = format!("```json\n{VALID_RESPONSE}\n```");
        assert!(matches!(
            parse_resume_analysis(&fenced),
            Validated::Valid(_)
        ));
    }

    #[test]
    fn test_score_of_eleven_is_malformed() {
        let raw = r#"{"skills":[{"name":"Rust","score":11,"category":"Language"}],"summary":"x"}"#;
        match parse_resume_analysis(raw) {
            Validated::Malformed { raw: kept, reason } => {
                assert_eq!(kept, raw);
                assert!(reason.contains("outside 1-10"), "{reason}");
            }
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_summary_is_malformed() {
        let raw = r#"{"skills":[]}"#;
        match parse_resume_analysis(raw) {
            Validated::Malformed { reason, .. } => assert!(reason.contains("summary")),
            other => panic!("expected malformed, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_skills_is_malformed() {
        assert!(matches!(
            parse_resume_analysis(r#"{"summary":"x"}"#),
            Validated::Malformed { .. }
        ));
    }

    #[test]
    fn test_optional_sections_default() {
        let analysis = match parse_resume_analysis(r#"{"skills":[],"summary":"Junior dev."}"#) {
            Validated::Valid(a) => a,
            other => panic!("expected valid, got {other:?}"),
        };
        assert!(analysis.experience.is_none());
        assert_eq!(analysis.tech_stack, TechStack::default());
    }

    #[test]
    fn test_null_tech_stack_lists_default_to_empty() {
        let raw = r#"{"skills":[],"summary":"x","tech_stack":{"languages":["Rust"],"databases":null}}"#;
        let analysis = match parse_resume_analysis(raw) {
            Validated::Valid(a) => a,
            other => panic!("expected valid, got {other:?}"),
        };
        assert_eq!(analysis.tech_stack.languages, vec!["Rust"]);
        assert!(analysis.tech_stack.databases.is_empty());
    }

    #[test]
    fn test_unknown_confidence_is_malformed() {
        let raw = r#"{"skills":[],"summary":"x","experience":{"total_years":2,"confidence":"certain","source":"s"}}"#;
        assert!(matches!(
            parse_resume_analysis(raw),
            Validated::Malformed { .. }
        ));
    }

    #[test]
    fn test_not_json_is_malformed() {
        assert!(matches!(
            parse_resume_analysis("I cannot analyze this resume."),
            Validated::Malformed { .. }
        ));
    }

    #[test]
    fn test_confidence_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Confidence::Medium).unwrap(),
            "\"medium\""
        );
    }

    #[tokio::test]
    async fn test_analyze_resume_end_to_end() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .match_body(mockito::Matcher::Regex("Backend engineer resume".into()))
            .with_status(200)
            .with_body(gemini_body(VALID_RESPONSE))
            .create_async()
            .await;

        let mut config = test_config(std::env::temp_dir());
        config.gemini_api_base = server.url();
        let llm = LlmClient::new(&config).unwrap();

        let analysis = analyze_resume("Backend engineer resume", &llm).await.unwrap();
        assert_eq!(analysis.skills[0].name, "Rust");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_analyze_resume_rejects_out_of_range_score() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1beta/models/gemini-test:generateContent")
            .with_status(200)
            .with_body(gemini_body(
                r#"{"skills":[{"name":"Go","score":11,"category":"Language"}],"summary":"x"}"#,
            ))
            .create_async()
            .await;

        let mut config = test_config(std::env::temp_dir());
        config.gemini_api_base = server.url();
        let llm = LlmClient::new(&config).unwrap();

        let err = analyze_resume("text", &llm).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Malformed { .. }));
    }
}
