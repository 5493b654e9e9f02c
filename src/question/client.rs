//! OpenAI-compatible chat completion client
//!
//! Thin wrapper over the hosted LLM endpoint with typed failure modes and
//! bounded retry. Everything interview-specific lives in [`super::coach`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Evaluation;
use crate::retry::{self, RetryPolicy};
use crate::{Error, Result};

/// A single chat completion request
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub temperature: f64,
    pub max_tokens: u32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completion client for the question/evaluation service
#[derive(Debug, Clone)]
pub struct LlmClient {
    http: reqwest::Client,
    completions_url: String,
    api_key: String,
    model: String,
    retry: RetryPolicy,
}

impl LlmClient {
    /// Create a new client
    ///
    /// `base_url` is the OpenAI-compatible API root, e.g.
    /// `https://api.groq.com/openai/v1`. An empty `api_key` produces a client
    /// that reports itself unconfigured; calls then fail fast.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(
        base_url: &str,
        api_key: String,
        model: String,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            completions_url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key,
            model,
            retry,
        })
    }

    /// Whether an API key is present
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Run one chat completion, retrying recoverable failures per the policy
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unconfigured`] without an API key,
    /// [`Error::RateLimited`] / [`Error::Timeout`] / [`Error::Upstream`] for
    /// upstream failures that survive the retry budget.
    pub async fn complete(
        &self,
        system: &str,
        user: &str,
        params: CompletionParams,
    ) -> Result<String> {
        if !self.is_configured() {
            return Err(Error::Unconfigured(
                "LLM API key is not set; question generation is LLM-only".to_string(),
            ));
        }

        let mut attempt = 0;
        loop {
            match self.complete_once(system, user, params).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.retry.max_retries => {
                    let retry_after = match &e {
                        Error::RateLimited(detail) => parse_embedded_retry_after(detail),
                        _ => None,
                    };
                    let delay = retry::delay_for_attempt(&self.retry, attempt, retry_after);
                    tracing::debug!(
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "retrying LLM request"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn complete_once(
        &self,
        system: &str,
        user: &str,
        params: CompletionParams,
    ) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        let response = self
            .http
            .post(&self.completions_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout("LLM request timed out".to_string())
                } else {
                    Error::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string);
            let body = response.text().await.unwrap_or_default();

            if status.as_u16() == 429 {
                let detail = retry_after.map_or_else(
                    || body.clone(),
                    |ra| format!("retry-after={ra}; {body}"),
                );
                return Err(Error::RateLimited(detail));
            }
            if retry::is_recoverable(status.as_u16()) {
                return Err(Error::Upstream(format!("LLM API error {status}: {body}")));
            }
            return Err(Error::Question(format!("LLM API error {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Upstream(format!("malformed LLM response: {e}")))?;

        let text = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .unwrap_or_default()
            .trim()
            .to_string();
        Ok(text)
    }
}

/// Pull a `retry-after=<value>;` hint back out of a rate-limit detail string
fn parse_embedded_retry_after(detail: &str) -> Option<Duration> {
    let rest = detail.strip_prefix("retry-after=")?;
    let (value, _) = rest.split_once(';')?;
    retry::parse_retry_after(value)
}

/// Parse `{score, feedback}` JSON out of an evaluation completion
///
/// Falls back to extracting the first `{...}` block; when no score can be
/// recovered, the raw text becomes the feedback with a score of zero.
#[must_use]
pub fn parse_evaluation(text: &str) -> Evaluation {
    #[derive(Deserialize)]
    struct RawEvaluation {
        score: f64,
        #[serde(default)]
        feedback: String,
    }

    let parsed: Option<RawEvaluation> = serde_json::from_str(text).ok().or_else(|| {
        let start = text.find('{')?;
        let end = text.rfind('}')?;
        serde_json::from_str(&text[start..=end]).ok()
    });

    parsed.map_or_else(
        || Evaluation {
            score: 0,
            feedback: {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    "No feedback returned.".to_string()
                } else {
                    trimmed.to_string()
                }
            },
            fallback: false,
        },
        |raw| {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let score = raw.score.round().clamp(0.0, 100.0) as u8;
            Evaluation {
                score,
                feedback: raw.feedback.trim().to_string(),
                fallback: false,
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(key: &str) -> LlmClient {
        LlmClient::new(
            "https://example.com/openai/v1/",
            key.to_string(),
            "test-model".to_string(),
            Duration::from_secs(5),
            RetryPolicy::default(),
        )
        .unwrap()
    }

    #[test]
    fn completions_url_built_from_base() {
        let c = client("k");
        assert_eq!(
            c.completions_url,
            "https://example.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn empty_key_is_unconfigured() {
        assert!(!client("  ").is_configured());
        assert!(client("k").is_configured());
    }

    #[tokio::test]
    async fn unconfigured_client_fails_fast() {
        let c = client("");
        let err = c
            .complete(
                "sys",
                "user",
                CompletionParams {
                    temperature: 0.9,
                    max_tokens: 300,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Unconfigured(_)));
    }

    #[test]
    fn evaluation_parses_clean_json() {
        let eval = parse_evaluation(r#"{"score": 82, "feedback": "Solid answer."}"#);
        assert_eq!(eval.score, 82);
        assert_eq!(eval.feedback, "Solid answer.");
    }

    #[test]
    fn evaluation_parses_embedded_json() {
        let eval = parse_evaluation("Here you go:\n{\"score\": 67.4, \"feedback\": \"ok\"}\nBye");
        assert_eq!(eval.score, 67);
    }

    #[test]
    fn evaluation_clamps_out_of_range_scores() {
        assert_eq!(parse_evaluation(r#"{"score": 180, "feedback": ""}"#).score, 100);
        assert_eq!(parse_evaluation(r#"{"score": -4, "feedback": ""}"#).score, 0);
    }

    #[test]
    fn unparseable_text_becomes_feedback() {
        let eval = parse_evaluation("Nice try, keep practicing.");
        assert_eq!(eval.score, 0);
        assert_eq!(eval.feedback, "Nice try, keep practicing.");
    }

    #[test]
    fn embedded_retry_after_round_trips() {
        assert_eq!(
            parse_embedded_retry_after("retry-after=3; {\"err\":1}"),
            Some(Duration::from_secs(3))
        );
        assert_eq!(parse_embedded_retry_after("no hint"), None);
    }
}
