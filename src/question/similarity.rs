//! Near-duplicate detection for generated questions
//!
//! A question is rejected when it is textually too close to any previously
//! asked question: exact normalized match, identical lead phrase, or
//! token-set Jaccard similarity above a threshold.

use std::collections::HashSet;

/// Default Jaccard similarity threshold above which a question is a duplicate
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.58;

/// Stop words excluded from the lead phrase
const LEAD_STOP_WORDS: &[&str] = &[
    "can", "could", "would", "will", "you", "please", "tell", "me", "about", "how", "what", "why",
    "when", "where", "which", "do", "does", "did", "your", "a", "an", "the",
];

/// Stop words excluded from the similarity token set
const TOKEN_STOP_WORDS: &[&str] = &[
    "what", "when", "where", "which", "would", "could", "should", "about", "with", "from", "into",
    "your", "have", "been", "that", "this", "there", "their", "then", "than", "interview",
    "question", "role", "track", "level", "explain", "tell", "describe", "design", "system",
];

/// Lowercase, strip everything but alphanumerics, collapse whitespace
#[must_use]
pub fn normalize_question(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for c in text.to_lowercase().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    out.trim_end().to_string()
}

/// First few meaningful tokens of a question, used to catch repeated openers
#[must_use]
pub fn lead_phrase(text: &str) -> String {
    normalize_question(text)
        .split_whitespace()
        .filter(|token| !LEAD_STOP_WORDS.contains(token))
        .take(4)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Meaningful token set for Jaccard comparison
#[must_use]
pub fn token_set(text: &str) -> HashSet<String> {
    normalize_question(text)
        .split_whitespace()
        .filter(|token| token.len() > 2 && !TOKEN_STOP_WORDS.contains(token))
        .map(ToString::to_string)
        .collect()
}

/// Jaccard similarity of two token sets; empty sets compare as dissimilar
#[must_use]
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    {
        intersection as f64 / union as f64
    }
}

/// Whether `candidate` is too similar to any of `existing`
///
/// An empty candidate always counts as a duplicate so that blank generations
/// are never accepted.
#[must_use]
pub fn is_too_similar<'a, I>(candidate: &str, existing: I, threshold: f64) -> bool
where
    I: IntoIterator<Item = &'a str>,
{
    let normalized = normalize_question(candidate);
    if normalized.is_empty() {
        return true;
    }
    let lead = lead_phrase(candidate);
    let tokens = token_set(candidate);

    for other in existing {
        let other_normalized = normalize_question(other);
        if other_normalized.is_empty() {
            continue;
        }
        if normalized == other_normalized {
            return true;
        }
        if !lead.is_empty() && lead == lead_phrase(other) {
            return true;
        }
        if jaccard(&tokens, &token_set(other)) >= threshold {
            return true;
        }
    }
    false
}
