//! Text preprocessing: cleans extracted resume text before it is sent to the LLM.
//!
//! `preprocess` is total and idempotent: it never fails, and running it on its
//! own output changes nothing. Line structure (headings, bullets, paragraph
//! breaks) survives; noise characters and redundant whitespace do not.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static BULLET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*[•●▪◦‣∙·*–—][ \t]*").unwrap());
static DISALLOWED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}\s.,;:()\-+#/&@'%|]").unwrap());
static SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());
static BLANK_LINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

static SECTION_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("summary", r"(?im)^\s*(professional\s+)?(summary|profile|objective|about\s+me)\b"),
        ("skills", r"(?im)^\s*(technical\s+)?(skills|core\s+competencies|technologies)\b"),
        ("experience", r"(?im)^\s*(work\s+|professional\s+)?(experience|employment(\s+history)?)\b"),
        ("education", r"(?im)^\s*(education|academic\s+background|qualifications)\b"),
        ("projects", r"(?im)^\s*(personal\s+|selected\s+)?(projects|portfolio)\b"),
        ("certifications", r"(?im)^\s*(certifications?|licenses?)\b"),
    ]
    .into_iter()
    .map(|(name, pattern)| (name, Regex::new(pattern).unwrap()))
    .collect()
});

/// Cleans raw extracted text.
pub fn preprocess(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let text = BULLET_RE.replace_all(&text, "- ");

    // Control characters go; tabs and other horizontal whitespace become spaces.
    let text: String = text
        .chars()
        .filter_map(|c| match c {
            '\n' => Some('\n'),
            c if c.is_whitespace() => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();

    let text = DISALLOWED_RE.replace_all(&text, "");
    let text = SPACES_RE.replace_all(&text, " ");
    let text = text
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n");
    let text = BLANK_LINES_RE.replace_all(&text, "\n\n");

    text.trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextStatistics {
    pub total_characters: usize,
    pub total_words: usize,
    pub total_lines: usize,
    pub avg_word_length: f64,
}

pub fn text_statistics(text: &str) -> TextStatistics {
    let words: Vec<&str> = text.split_whitespace().collect();
    let letters: usize = words.iter().map(|w| w.chars().count()).sum();
    let avg_word_length = if words.is_empty() {
        0.0
    } else {
        (letters as f64 / words.len() as f64 * 100.0).round() / 100.0
    };

    TextStatistics {
        total_characters: text.chars().count(),
        total_words: words.len(),
        total_lines: if text.is_empty() {
            0
        } else {
            text.split('\n').count()
        },
        avg_word_length,
    }
}

/// Returns the canonical names of the resume sections whose headings appear
/// at the start of a line, in a fixed order.
pub fn detect_sections(text: &str) -> Vec<&'static str> {
    SECTION_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(name, _)| *name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSY: &str = "  JANE   DOE \r\n\r\n\r\n\r\nSUMMARY\t\t\n• Built   APIs in Rust ★★★\n● Led a team of 5 — 40% faster\u{0007}\n\n\n\nSkills: C++, C#, Node.js\n  *  Docker / Kubernetes  ";

    #[test]
    fn test_preprocess_cleans_whitespace_and_noise() {
        let cleaned = preprocess(MESSY);
        assert_eq!(
            cleaned,
            "JANE DOE\n\nSUMMARY\n- Built APIs in Rust\n- Led a team of 5 40% faster\n\nSkills: C++, C#, Node.js\n- Docker / Kubernetes"
        );
    }

    #[test]
    fn test_preprocess_is_idempotent() {
        let samples = [
            MESSY,
            "",
            "   ",
            "\n\n\n",
            "a\t\tb\r\rc",
            "– dash bullet\n—em bullet\n·middle dot",
            "José Ñúñez · Zürich\n\n\n\n日本語 résumé",
            "\u{0000}\u{001B}[31mred\u{001B}[0m",
            "- - nested\n* * *",
            "line one \n \n \n line two",
        ];
        for sample in samples {
            let once = preprocess(sample);
            assert_eq!(preprocess(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_preprocess_never_fails_on_empty_input() {
        assert_eq!(preprocess(""), "");
        assert_eq!(preprocess(" \n\t "), "");
    }

    #[test]
    fn test_preprocess_keeps_unicode_letters() {
        assert_eq!(preprocess("José Müller"), "José Müller");
    }

    #[test]
    fn test_preprocess_keeps_single_blank_line_between_paragraphs() {
        assert_eq!(preprocess("a\n\n\n\nb\nc"), "a\n\nb\nc");
    }

    #[test]
    fn test_text_statistics() {
        let stats = text_statistics("Rust Go\nPython");
        assert_eq!(stats.total_characters, 14);
        assert_eq!(stats.total_words, 3);
        assert_eq!(stats.total_lines, 2);
        assert!((stats.avg_word_length - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_text_statistics_empty() {
        let stats = text_statistics("");
        assert_eq!(stats.total_words, 0);
        assert_eq!(stats.total_lines, 0);
        assert_eq!(stats.avg_word_length, 0.0);
    }

    #[test]
    fn test_detect_sections_in_canonical_order() {
        let text = "Jane Doe\nEducation\nBSc\nWork Experience\nAcme\nTechnical Skills\nRust";
        assert_eq!(
            detect_sections(text),
            vec!["skills", "experience", "education"]
        );
    }

    #[test]
    fn test_detect_sections_ignores_mid_line_mentions() {
        assert!(detect_sections("I have experience with skills").is_empty());
    }
}
