//! Question-candidate extraction from raw LLM completions
//!
//! Completions sometimes arrive wrapped in list markers, transition lines,
//! or trailing commentary. This picks the single most question-like sentence
//! out of the text.

use std::sync::LazyLock;

use regex::Regex;

static LIST_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[-*>\d.()]+\s*").expect("valid regex"));

static FEEDBACK_HINT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(good|great|nice|score|feedback|overall|your answer|improve|better|correct)\b")
        .expect("valid regex")
});

static QUESTION_LEAD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(how|what|why|when|where|which|who|can|could|would|will|do|does|did|is|are|should)\b",
    )
    .expect("valid regex")
});

/// Extract the best question candidate from an LLM completion
///
/// Returns `None` when the text contains nothing usable.
#[must_use]
pub fn extract_question_candidate(text: &str) -> Option<String> {
    let raw = text.replace('\r', "\n");
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let stripped_lines: Vec<String> = raw
        .lines()
        .map(|line| LIST_MARKER.replace(line, "").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();
    let compact = collapse_whitespace(&stripped_lines.join(" "));
    if compact.is_empty() {
        return None;
    }

    // Prefer sentences that end in a question mark, scored by how
    // question-like they lead and penalized for feedback-flavored wording.
    let question_parts: Vec<&str> = split_question_sentences(&compact);
    if !question_parts.is_empty() {
        let best = question_parts
            .iter()
            .map(|part| {
                let mut score = 0_i32;
                if QUESTION_LEAD.is_match(part) {
                    score += 2;
                }
                if FEEDBACK_HINT.is_match(part) {
                    score -= 1;
                }
                (score, *part)
            })
            .max_by_key(|(score, _)| *score)
            .map(|(_, part)| part)?;
        return Some(strip_quotes(best));
    }

    let picked = stripped_lines
        .iter()
        .find(|line| QUESTION_LEAD.is_match(line))
        .map_or_else(
            || stripped_lines.last().cloned().unwrap_or_else(|| compact.clone()),
            Clone::clone,
        );
    Some(strip_quotes(&picked))
}

/// Split text into "...?"-terminated chunks
fn split_question_sentences(text: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for (idx, c) in text.char_indices() {
        if c == '?' {
            let part = text[start..=idx].trim();
            if !part.is_empty() {
                parts.push(part);
            }
            start = idx + 1;
        }
    }
    parts
}

fn strip_quotes(text: &str) -> String {
    text.trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim()
        .to_string()
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
