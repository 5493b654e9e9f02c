//! Prompt construction for the interviewer LLM

use super::{InterviewSetup, Language, Level, Track};

/// Interviewer system prompt for question generation
#[must_use]
pub fn interviewer_system_prompt(level: Level, language: Language) -> String {
    format!(
        "You are an interviewer in a live interview tailored to the selected role, track, and level. \
         Be natural, professional, and balanced. Keep realism high.\n\
         {}\n\
         Ask only one clear question at a time. Do not include feedback, evaluation, or commentary.\n\
         Avoid repetitive openers and repeated themes. {}",
        level_guidance(level),
        language_guidance(language)
    )
}

/// User prompt asking for one new interview question
#[must_use]
pub fn next_question_prompt(setup: &InterviewSetup, avoid: &[String], nonce: &str) -> String {
    format!(
        "Generate one new interview question.\n\
         Role: {role}\n\
         Track: {track}\n\
         Level: {level}\n\
         Track guidance: {track_hint}\n\
         Level guidance: {level_hint}\n\
         Language rule: {lang_hint}\n\
         Choose the most appropriate category and topic naturally based on this interview context.\n\
         Avoid repeating any of these prior questions:\n{avoid_list}\n\
         Use a different opener style from prior questions. Keep it under 35 words.\n\
         Nonce: {nonce}\n\
         Return one standalone question only. No preface, no transition line, no feedback text.",
        role = setup.role,
        track = setup.track,
        level = setup.level,
        track_hint = track_guidance(setup.track),
        level_hint = level_guidance(setup.level),
        lang_hint = language_guidance(setup.language),
        avoid_list = format_avoid_list(avoid),
    )
}

/// User prompt asking for a follow-up question probing the candidate answer
#[must_use]
pub fn follow_up_prompt(
    setup: &InterviewSetup,
    question: &str,
    answer: &str,
    nonce: &str,
) -> String {
    format!(
        "Generate one natural follow-up interviewer question.\n\
         Role: {role}\n\
         Track: {track}\n\
         Level: {level}\n\
         Track guidance: {track_hint}\n\
         Level guidance: {level_hint}\n\
         Previous question: {question}\n\
         Candidate answer: {answer}\n\
         Ask a precise follow-up that probes depth, tradeoff, or validation based on the candidate answer.\n\
         Do not repeat the previous question. Keep under 30 words.\n\
         Language rule: {lang_hint}\n\
         Nonce: {nonce}\n\
         Return one standalone question only. No preface, no transition line, no feedback text.",
        role = setup.role,
        track = setup.track,
        level = setup.level,
        track_hint = track_guidance(setup.track),
        level_hint = level_guidance(setup.level),
        answer = answer.trim(),
        lang_hint = language_guidance(setup.language),
    )
}

/// System prompt for answer evaluation
#[must_use]
pub const fn evaluator_system_prompt() -> &'static str {
    "You are a friendly interview coach. Keep feedback short, supportive, and natural. \
     Use the requested language."
}

/// User prompt asking for a 0-100 score plus feedback as JSON
#[must_use]
pub fn evaluation_prompt(setup: &InterviewSetup, question: &str, answer: &str) -> String {
    format!(
        "You are an interview evaluator. Score the candidate's answer from 0 to 100 and give \
         concise, conversational feedback in a short, friendly style.\n\
         Role: {role}\n\
         Track: {track}\n\
         Level: {level}\n\
         Question: {question}\n\
         Answer: {answer}\n\n\
         {lang_hint}\n\
         Return JSON with keys: score (number) and feedback (string).",
        role = setup.role,
        track = setup.track,
        level = setup.level,
        lang_hint = feedback_language_hint(setup.language),
    )
}

/// System prompt for sample answers
#[must_use]
pub const fn sample_answer_system_prompt() -> &'static str {
    "You are a friendly interview coach. Give a clear, practical answer in 4 to 6 sentences."
}

/// User prompt asking for a strong sample answer as plain text
#[must_use]
pub fn sample_answer_prompt(setup: &InterviewSetup, question: &str) -> String {
    format!(
        "You are a friendly interview coach. Provide a strong, concise sample answer in a short, \
         conversational tone.\n\
         Role: {role}\n\
         Track: {track}\n\
         Level: {level}\n\
         Question: {question}\n\n\
         {lang_hint}\n\
         Return plain text only.",
        role = setup.role,
        track = setup.track,
        level = setup.level,
        lang_hint = answer_language_hint(setup.language),
    )
}

/// Topic guidance per track
#[must_use]
pub const fn track_guidance(track: Track) -> &'static str {
    match track {
        Track::SystemDesign => {
            "Focus on architecture, scalability, tradeoffs, APIs, and infrastructure."
        }
        Track::MlFundamentals => {
            "Focus on ML concepts, algorithms, evaluation, data, and modeling."
        }
        Track::Behavioral => {
            "Focus on STAR method, leadership, teamwork, and conflict handling."
        }
        Track::ProductSense => {
            "Focus on product thinking, metrics, prioritization, and UX."
        }
    }
}

/// Difficulty guidance per level
#[must_use]
pub const fn level_guidance(level: Level) -> &'static str {
    match level {
        Level::Entry => "Entry only: fundamentals, basic scenarios, and clear definitions.",
        Level::Mid => "Mid only: practical implementation and tradeoffs.",
        Level::Senior => "Senior only: architecture, leadership, and decision-making.",
        Level::Staff => "Staff only: org impact, strategy, and complex systems.",
    }
}

/// Output language rule per assistant language
#[must_use]
pub const fn language_guidance(language: Language) -> &'static str {
    match language {
        Language::En => "Use fully English.",
        Language::Hi => "Use fully Hindi.",
        Language::Hinglish => "Use natural spoken Hinglish (Hindi + English mix).",
    }
}

const fn feedback_language_hint(language: Language) -> &'static str {
    match language {
        Language::En => "Give feedback in natural English.",
        Language::Hi => "Give feedback in natural Hindi in Devanagari script.",
        Language::Hinglish => "Give feedback in casual Hinglish in Roman letters.",
    }
}

const fn answer_language_hint(language: Language) -> &'static str {
    match language {
        Language::En => "Answer in natural English.",
        Language::Hi => "Answer in natural Hindi in Devanagari script.",
        Language::Hinglish => "Answer in casual Hinglish in Roman letters.",
    }
}

fn format_avoid_list(avoid: &[String]) -> String {
    if avoid.is_empty() {
        return "None".to_string();
    }
    avoid
        .iter()
        .enumerate()
        .map(|(idx, q)| format!("{}. {q}", idx + 1))
        .collect::<Vec<_>>()
        .join("\n")
}
