//! Transcript language detection
//!
//! Used to switch the assistant language mid-session when the candidate asks
//! for it or simply starts speaking Hindi. Explicit requests win; otherwise
//! script and vocabulary hints decide.

use std::sync::LazyLock;

use regex::Regex;

use crate::question::Language;

static REQUEST_HINDI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(mujhse hindi mein baat karo|mujhse hindi me baat karo|hindi me baat karo|hindi mein baat karo|hindi mein samjhao|hindi me samjhao|mujhe hindi mein samjhao|mujhe hindi me samjhao|speak in hindi|talk in hindi|hindi bolo|hindi mein bolo|hindi me bolo)\b",
    )
    .expect("valid regex")
});

static REQUEST_HINGLISH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(hinglish me|hinglish mein|hinglish bolo|talk in hinglish|speak hinglish)\b")
        .expect("valid regex")
});

static REQUEST_ENGLISH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(english me baat karo|english mein baat karo|talk in english|speak english)\b")
        .expect("valid regex")
});

static HINDI_HINTS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(kya|kyu|kyon|kaise|kab|kahan|mujhse|hindi|baat|karo|krdo|tum|aap|mera|meri|hai|hun|nahi|haan|haanji|kyunki|iska|uska|bolo|samjhao|samjha)\b",
    )
    .expect("valid regex")
});

fn has_devanagari(text: &str) -> bool {
    text.chars().any(|c| ('\u{0900}'..='\u{097f}').contains(&c))
}

fn has_latin(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_alphabetic())
}

/// Detect the language of a transcript
///
/// Returns `None` for empty input; explicit language requests take priority
/// over script/vocabulary inference.
#[must_use]
pub fn detect_language(text: &str) -> Option<Language> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    let lowered = trimmed.to_lowercase();

    if REQUEST_HINDI.is_match(&lowered) {
        return Some(Language::Hi);
    }
    if REQUEST_HINGLISH.is_match(&lowered) {
        return Some(Language::Hinglish);
    }
    if REQUEST_ENGLISH.is_match(&lowered) {
        return Some(Language::En);
    }

    let devanagari = has_devanagari(trimmed);
    let latin = has_latin(trimmed);
    let hindi_vocabulary = HINDI_HINTS.is_match(trimmed);

    if devanagari && latin {
        return Some(Language::Hinglish);
    }
    if devanagari {
        return Some(Language::Hi);
    }
    if hindi_vocabulary && latin {
        return Some(Language::Hinglish);
    }
    if hindi_vocabulary {
        return Some(Language::Hi);
    }
    Some(Language::En)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_requests_win() {
        assert_eq!(detect_language("please speak in hindi"), Some(Language::Hi));
        assert_eq!(detect_language("talk in hinglish yaar"), Some(Language::Hinglish));
        assert_eq!(detect_language("talk in english"), Some(Language::En));
    }

    #[test]
    fn devanagari_script_is_hindi() {
        assert_eq!(detect_language("मैं तैयार हूँ"), Some(Language::Hi));
    }

    #[test]
    fn mixed_script_is_hinglish() {
        assert_eq!(detect_language("मैं ready हूँ"), Some(Language::Hinglish));
    }

    #[test]
    fn romanized_hindi_vocabulary_is_hinglish() {
        assert_eq!(detect_language("haan kaise karein ye design"), Some(Language::Hinglish));
    }

    #[test]
    fn plain_english_is_english() {
        assert_eq!(detect_language("I would start with a load balancer"), Some(Language::En));
    }

    #[test]
    fn empty_input_is_none() {
        assert_eq!(detect_language("   "), None);
    }
}
