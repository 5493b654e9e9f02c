//! The interview coach: question generation with session memory,
//! near-duplicate rejection, and evaluation with local fallback
//!
//! One `InterviewCoach` serves both the HTTP API handlers and the live voice
//! loop, so the two surfaces share one question memory per session.

use async_trait::async_trait;

use rand::Rng;

use super::client::{CompletionParams, LlmClient, parse_evaluation};
use super::{
    Evaluation, InterviewSetup, extract_question_candidate, local_evaluation, local_sample_answer,
    prompts, similarity,
};
use crate::db::SessionRepo;
use crate::turn::QuestionService;
use crate::{Error, Result};

/// Tuning for question memory and uniqueness
#[derive(Debug, Clone)]
pub struct CoachConfig {
    /// Asked questions remembered per session
    pub question_limit: usize,
    /// Avoid-list size passed to the LLM
    pub avoid_limit: usize,
    /// Jaccard similarity above which a candidate is a duplicate
    pub similarity_threshold: f64,
    /// Generation attempts before giving up on a unique question
    pub generation_attempts: u32,
}

impl Default for CoachConfig {
    fn default() -> Self {
        Self {
            question_limit: 40,
            avoid_limit: 50,
            similarity_threshold: similarity::DEFAULT_SIMILARITY_THRESHOLD,
            generation_attempts: 5,
        }
    }
}

/// Question/evaluation service backed by the LLM and the session store
pub struct InterviewCoach {
    llm: LlmClient,
    sessions: SessionRepo,
    config: CoachConfig,
}

impl InterviewCoach {
    /// Create a new coach
    #[must_use]
    pub const fn new(llm: LlmClient, sessions: SessionRepo, config: CoachConfig) -> Self {
        Self {
            llm,
            sessions,
            config,
        }
    }

    /// Whether the LLM side is usable
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.llm.is_configured()
    }

    /// Generate the next interview question, avoiding repeats
    ///
    /// `recent` is the caller-side list of recently seen questions; it is
    /// merged with the per-session memory before generation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unconfigured`] without an API key, or a retryable
    /// generation error when the LLM fails or produces only duplicates.
    pub async fn next_question(&self, setup: &InterviewSetup, recent: &[String]) -> Result<String> {
        self.sessions.find_or_create(setup)?;
        let avoid = self.avoid_list(setup, recent, None)?;

        let question = self
            .generate_unique(setup, &avoid, |nonce, retry_hint| {
                let mut prompt = prompts::next_question_prompt(setup, &avoid, nonce);
                if let Some(hint) = retry_hint {
                    prompt.push('\n');
                    prompt.push_str(hint);
                }
                prompt
            })
            .await?;

        self.sessions.record_asked(&setup.session_id, &question)?;
        Ok(question)
    }

    /// Generate a follow-up probing the candidate's answer
    ///
    /// # Errors
    ///
    /// Same failure modes as [`Self::next_question`]; additionally requires a
    /// non-empty answer.
    pub async fn follow_up(
        &self,
        setup: &InterviewSetup,
        question: &str,
        answer: &str,
    ) -> Result<String> {
        if answer.trim().is_empty() {
            return Err(Error::Question("answer is required for follow-up".to_string()));
        }
        self.sessions.find_or_create(setup)?;
        let avoid = self.avoid_list(setup, &[], Some(question))?;

        let follow_up = self
            .generate_unique(setup, &avoid, |nonce, retry_hint| {
                let mut prompt = prompts::follow_up_prompt(setup, question, answer, nonce);
                if let Some(hint) = retry_hint {
                    prompt.push('\n');
                    prompt.push_str(hint);
                }
                prompt
            })
            .await?;

        self.sessions.set_last_answer(&setup.session_id, answer)?;
        self.sessions.record_asked(&setup.session_id, &follow_up)?;
        Ok(follow_up)
    }

    /// Score a candidate answer
    ///
    /// Degrades to the local heuristic when the LLM is unconfigured or
    /// unreachable; upstream rejections are propagated.
    ///
    /// # Errors
    ///
    /// Returns error when the LLM rejects the request outright.
    pub async fn evaluate(
        &self,
        setup: &InterviewSetup,
        question: &str,
        answer: &str,
    ) -> Result<Evaluation> {
        if let Err(e) = self.sessions.set_last_answer(&setup.session_id, answer) {
            tracing::warn!(error = %e, "failed to persist candidate answer");
        }

        if !self.llm.is_configured() {
            tracing::info!("LLM unconfigured; using local evaluation");
            return Ok(local_evaluation(answer, setup.language));
        }

        let prompt = prompts::evaluation_prompt(setup, question, answer);
        match self
            .llm
            .complete(
                prompts::evaluator_system_prompt(),
                &prompt,
                CompletionParams {
                    temperature: 0.4,
                    max_tokens: 300,
                },
            )
            .await
        {
            Ok(text) => Ok(parse_evaluation(&text)),
            Err(e) if uses_local_fallback(&e) => {
                tracing::warn!(error = %e, "evaluation unreachable; using local fallback");
                Ok(local_evaluation(answer, setup.language))
            }
            Err(e) => Err(e),
        }
    }

    /// Produce a strong sample answer for the current question
    ///
    /// # Errors
    ///
    /// Returns error when the LLM rejects the request outright.
    pub async fn sample_answer(&self, setup: &InterviewSetup, question: &str) -> Result<String> {
        if !self.llm.is_configured() {
            tracing::info!("LLM unconfigured; using local sample answer");
            return Ok(local_sample_answer(question, setup.language));
        }

        let prompt = prompts::sample_answer_prompt(setup, question);
        match self
            .llm
            .complete(
                prompts::sample_answer_system_prompt(),
                &prompt,
                CompletionParams {
                    temperature: 0.5,
                    max_tokens: 350,
                },
            )
            .await
        {
            Ok(text) if !text.trim().is_empty() => Ok(text.trim().to_string()),
            Ok(_) => Ok(local_sample_answer(question, setup.language)),
            Err(e) if uses_local_fallback(&e) => {
                tracing::warn!(error = %e, "sample answer unreachable; using local fallback");
                Ok(local_sample_answer(question, setup.language))
            }
            Err(e) => Err(e),
        }
    }

    /// Merge session memory with caller-provided recent questions
    fn avoid_list(
        &self,
        setup: &InterviewSetup,
        recent: &[String],
        current_question: Option<&str>,
    ) -> Result<Vec<String>> {
        let memory = self
            .sessions
            .asked_questions(&setup.session_id, self.config.question_limit)?;

        let mut seen = std::collections::HashSet::new();
        let mut avoid = Vec::new();
        for q in memory
            .iter()
            .map(String::as_str)
            .chain(recent.iter().map(String::as_str).rev().take(20).rev())
            .chain(current_question)
        {
            let q = q.trim();
            if q.is_empty() {
                continue;
            }
            if seen.insert(similarity::normalize_question(q)) {
                avoid.push(q.to_string());
            }
        }

        let overflow = avoid.len().saturating_sub(self.config.avoid_limit);
        avoid.drain(..overflow);
        Ok(avoid)
    }

    /// Keep asking until a candidate clears the similarity bar
    async fn generate_unique<F>(
        &self,
        setup: &InterviewSetup,
        avoid: &[String],
        build_prompt: F,
    ) -> Result<String>
    where
        F: Fn(&str, Option<&str>) -> String,
    {
        let system = prompts::interviewer_system_prompt(setup.level, setup.language);
        let mut pool: Vec<String> = Vec::new();
        let mut last_error: Option<Error> = None;

        for attempt in 0..self.config.generation_attempts {
            let retry_hint = (attempt > 0).then(|| {
                format!("Attempt {}: use a different framing and avoid repeated wording.", attempt + 1)
            });
            let prompt = build_prompt(&nonce(), retry_hint.as_deref());

            let text = match self
                .llm
                .complete(
                    &system,
                    &prompt,
                    CompletionParams {
                        temperature: if attempt == 0 { 0.9 } else { 0.92 },
                        max_tokens: 300,
                    },
                )
                .await
            {
                Ok(text) => text,
                Err(e) if e.is_transient() => {
                    tracing::warn!(error = %e, attempt, "question generation attempt failed");
                    last_error = Some(e);
                    continue;
                }
                Err(e) => return Err(e),
            };

            let Some(candidate) = extract_question_candidate(&text) else {
                continue;
            };

            if similarity::is_too_similar(
                &candidate,
                avoid.iter().map(String::as_str),
                self.config.similarity_threshold,
            ) {
                tracing::debug!(candidate = %candidate, "rejected near-duplicate question");
                pool.push(candidate);
                continue;
            }

            return Ok(candidate);
        }

        // Every attempt was a near-duplicate; accept anything from the pool
        // that is at least not an exact repeat.
        let avoid_normalized: std::collections::HashSet<String> = avoid
            .iter()
            .map(|q| similarity::normalize_question(q))
            .collect();
        for candidate in pool {
            let normalized = similarity::normalize_question(&candidate);
            if !normalized.is_empty() && !avoid_normalized.contains(&normalized) {
                return Ok(candidate);
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::Upstream("no unique questions returned from the LLM".to_string())
        }))
    }
}

/// Whether an evaluation-path error should degrade to the local fallback
/// instead of surfacing: transport failures, timeouts, and key problems.
fn uses_local_fallback(error: &Error) -> bool {
    match error {
        Error::Http(_) | Error::Timeout(_) => true,
        Error::Question(detail) => detail.contains("invalid_api_key"),
        _ => false,
    }
}

fn nonce() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    let suffix: u32 = rand::thread_rng().r#gen();
    format!("{millis}-{suffix:08x}")
}

#[async_trait]
impl QuestionService for InterviewCoach {
    async fn next_question(&self, setup: &InterviewSetup, recent: &[String]) -> Result<String> {
        Self::next_question(self, setup, recent).await
    }

    async fn follow_up(
        &self,
        setup: &InterviewSetup,
        question: &str,
        answer: &str,
    ) -> Result<String> {
        Self::follow_up(self, setup, question, answer).await
    }

    async fn evaluate(
        &self,
        setup: &InterviewSetup,
        question: &str,
        answer: &str,
    ) -> Result<Evaluation> {
        Self::evaluate(self, setup, question, answer).await
    }

    async fn sample_answer(&self, setup: &InterviewSetup, question: &str) -> Result<String> {
        Self::sample_answer(self, setup, question).await
    }
}
