//! Local fallbacks used when the LLM is unreachable or unconfigured
//!
//! Question generation is LLM-only, but evaluation and sample answers
//! degrade to local heuristics so a session never dead-ends on feedback.

use std::sync::LazyLock;

use regex::Regex;

use super::{Evaluation, Language};

static STRUCTURE_HINT_EN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(first|second|finally|because|impact|result|tradeoff|therefore|approach|step)\b")
        .expect("valid regex")
});

static STRUCTURE_HINT_HI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(pehle|phir|akhir|isliye|impact|result|approach|step)\b")
        .expect("valid regex")
});

/// Heuristic evaluation: rewards length, sentence structure, and the
/// presence of structuring vocabulary. Score clamped to 25..=85.
#[must_use]
pub fn local_evaluation(answer: &str, language: Language) -> Evaluation {
    let text = answer.trim();
    let words = text.split_whitespace().count();
    let sentences = text
        .split(['.', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .count();
    let has_structure = STRUCTURE_HINT_EN.is_match(text) || STRUCTURE_HINT_HI.is_match(text);

    #[allow(clippy::cast_precision_loss)]
    let base = (words as f64 * 1.2).min(60.0)
        + (sentences as f64 * 3.0).min(20.0)
        + if has_structure { 12.0 } else { 0.0 };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let score = base.round().clamp(25.0, 85.0) as u8;

    let feedback = if language == Language::Hi {
        format!(
            "LLM feedback unavailable tha, isliye local evaluation diya gaya. Aapka answer \
             {score}/100 ke aas-paas hai. Agle answer mein concise structure rakhiye: context, \
             actions, impact, aur ek clear tradeoff."
        )
    } else {
        format!(
            "LLM feedback was unavailable, so this is a local evaluation. Your answer is around \
             {score}/100. For the next answer, use a tight structure: context, actions, impact, \
             and one clear tradeoff."
        )
    };

    Evaluation {
        score,
        feedback,
        fallback: true,
    }
}

/// Template sample answer in the session language
#[must_use]
pub fn local_sample_answer(question: &str, language: Language) -> String {
    let q = question.trim();
    let q = if q.is_empty() { "this question" } else { q };
    if language == Language::Hi {
        format!(
            "Is question ka structured answer dene ke liye pehle context clear karein, phir apna \
             approach batayein, phir measurable impact share karein, aur end mein tradeoff mention \
             karein. Agar real example ho to 1 short STAR style example add karein. Question: {q}"
        )
    } else {
        format!(
            "To answer this well, start with context, then explain your approach, then quantify \
             impact, and close with one tradeoff you considered. If possible, include one short \
             STAR-style example. Question: {q}"
        )
    }
}
