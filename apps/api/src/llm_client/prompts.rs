// Shared prompt fragments.
// Each analyzer defines its own templates alongside it; this file contains
// the cross-cutting pieces.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Scoring scale shared by every 1-10 score the model is asked to produce.
pub const SCORE_RANGE_INSTRUCTION: &str = "\
    Every score MUST be a whole number from 1 to 10 inclusive. \
    Never output 0, negative numbers, decimals, or values above 10.";

/// Builds a system prompt from a persona line plus the shared JSON rules.
pub fn system_prompt(persona: &str) -> String {
    format!("{persona} {JSON_ONLY_SYSTEM} {SCORE_RANGE_INSTRUCTION}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_includes_shared_rules() {
        let prompt = system_prompt("You are a recruiter.");
        assert!(prompt.starts_with("You are a recruiter."));
        assert!(prompt.contains("valid JSON only"));
        assert!(prompt.contains("from 1 to 10"));
    }
}
