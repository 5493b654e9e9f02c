//! Bilingual stop/continue intent classification
//!
//! Maps free transcript text to an explicit decision. Polite filler that
//! merely contains a negation ("no worries") is stripped before matching,
//! and a bare "no" is never authoritative on its own. Devanagari tokens are
//! matched alongside their Latin transliterations.

use std::sync::LazyLock;

use regex::Regex;

/// A classified stop/continue intent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Move on to the next question
    Continue,
    /// End the interview
    Stop,
}

/// Policy when a transcript matches both intent families.
///
/// The two observed client variants disagree here, so the policy is explicit
/// rather than hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// Both families matched: treat as consent to continue
    #[default]
    PreferContinue,
    /// Both families matched: treat as a stop request
    PreferStop,
}

static FILLER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(no worries|no problem|not a problem|no issue)\b").expect("valid regex")
});

static CONTINUE_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(yes|yeah|yep|ok|okay|sure|continue|next|proceed|haan|han|ha|haanji|agla|aage|chalo)\b",
    )
    .expect("valid regex")
});

// A bare "no" is deliberately absent: it false-triggers on filler phrases.
static STOP_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(stop|nope|nah|end|quit|exit|ruk|ruko|band|bas|nahi|mat|roko)\b")
        .expect("valid regex")
});

const CONTINUE_DEVANAGARI: &[&str] = &["हाँ", "हां", "आगे", "अगला", "नेक्स्ट", "यस"];
const STOP_DEVANAGARI: &[&str] = &["रुको", "रोक", "बंद", "बस", "नहीं", "स्टॉप"];

static UNKNOWN_EN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(i\s*don'?t\s*know|dont\s*know|do not know|no idea|not sure|not really|no clue)\b")
        .expect("valid regex")
});

static UNKNOWN_HI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(mujhe\s*nahi\s*pata|mujhe\s*pata\s*nahi|pata\s*nahi|nahi\s*pata|maloom\s*nahi|idea\s*nahi)\b")
        .expect("valid regex")
});

/// Lowercase and keep only Latin alphanumerics, Devanagari, and spaces
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = true;
    for c in text.to_lowercase().chars() {
        let keep = c.is_ascii_alphanumeric() || ('\u{0900}'..='\u{097f}').contains(&c);
        if keep {
            out.push(c);
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    out.trim_end().to_string()
}

/// Classify free text into a stop/continue decision
///
/// Returns `None` when no unambiguous signal is present; the caller keeps
/// waiting or falls back to its timeout default.
#[must_use]
pub fn classify_decision(text: &str, tie_break: TieBreak) -> Option<Decision> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return None;
    }

    let cleaned = FILLER.replace_all(&normalized, " ");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return None;
    }

    let wants_continue = CONTINUE_TOKENS.is_match(&cleaned)
        || CONTINUE_DEVANAGARI.iter().any(|t| cleaned.contains(t));
    let wants_stop =
        STOP_TOKENS.is_match(&cleaned) || STOP_DEVANAGARI.iter().any(|t| cleaned.contains(t));

    match (wants_continue, wants_stop) {
        (true, false) => Some(Decision::Continue),
        (false, true) => Some(Decision::Stop),
        (true, true) => Some(match tie_break {
            TieBreak::PreferContinue => Decision::Continue,
            TieBreak::PreferStop => Decision::Stop,
        }),
        (false, false) => None,
    }
}

/// Whether an answer is an "I don't know" rather than an attempt
#[must_use]
pub fn is_unknown_answer(text: &str) -> bool {
    let lowered = text.trim().to_lowercase();
    if lowered.is_empty() {
        return false;
    }
    UNKNOWN_EN.is_match(&lowered) || UNKNOWN_HI.is_match(&lowered)
}
