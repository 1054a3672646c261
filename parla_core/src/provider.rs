//! Remote question generation.
//!
//! [`QuestionProvider`] is the seam the session loop refills through;
//! [`GeminiClient`] implements it against the Gemini `generateContent` API.

use crate::config::ProviderConfig;
use crate::{Error, QuestionRecord, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Something that can produce a batch of fresh questions
pub trait QuestionProvider {
    /// Generate up to `count` questions at CEFR `level`.
    ///
    /// A response that cannot be read as a list of questions yields an empty
    /// batch; transport failures and error statuses are returned as `Err`.
    fn generate_batch(&self, count: usize, level: &str) -> Result<Vec<QuestionRecord>>;
}

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(4);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Gemini-backed question generator
pub struct GeminiClient {
    http: Client,
    api_key: String,
    model: String,
    endpoint: String,
    target_language: String,
    learner_language: String,
    max_attempts: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    /// Build a client from an already-validated credential
    pub fn new(api_key: impl Into<String>, config: &ProviderConfig) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::Config("API key not provided".into()));
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key,
            model: config.model.clone(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            target_language: config.target_language.clone(),
            learner_language: config.learner_language.clone(),
            max_attempts: config.max_attempts.max(1),
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    /// POST the prompt, retrying rate limits, server errors and transport
    /// failures with exponential backoff
    fn request(&self, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json",
            },
        };

        let mut delay = INITIAL_RETRY_DELAY;
        let mut attempt = 1;
        loop {
            let result = self
                .http
                .post(self.url())
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send();

            let last_attempt = attempt >= self.max_attempts;
            match result {
                Ok(response) if response.status().is_success() => {
                    return Ok(response.text()?);
                }
                Ok(response) => {
                    let status = response.status();
                    if !is_retryable(status) || last_attempt {
                        return Err(Error::Provider(format!(
                            "{} returned {}",
                            self.model, status
                        )));
                    }
                    tracing::warn!(
                        "Provider returned {} (attempt {}/{}), retrying in {:?}",
                        status,
                        attempt,
                        self.max_attempts,
                        delay
                    );
                }
                Err(e) => {
                    if last_attempt {
                        return Err(e.into());
                    }
                    tracing::warn!(
                        "Provider request failed (attempt {}/{}): {}, retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        e,
                        delay
                    );
                }
            }

            std::thread::sleep(delay);
            delay = (delay * 2).min(MAX_RETRY_DELAY);
            attempt += 1;
        }
    }
}

impl QuestionProvider for GeminiClient {
    fn generate_batch(&self, count: usize, level: &str) -> Result<Vec<QuestionRecord>> {
        let prompt = build_prompt(count, level, &self.target_language, &self.learner_language);
        tracing::info!("Requesting {} questions at level {} from {}", count, level, self.model);

        let body = self.request(&prompt)?;

        let response: GenerateResponse = match serde_json::from_str(&body) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Unreadable provider response: {}", e);
                return Ok(Vec::new());
            }
        };

        let text: String = response
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.text)
            .collect();

        Ok(parse_batch(&text))
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Prompt asking for `count` mixed translation / multiple-choice questions
pub fn build_prompt(count: usize, level: &str, target_language: &str, learner_language: &str) -> String {
    format!(
        "You are a {target} language tutor for a {learner} speaker. \
         Generate {count} distinct quiz questions in {learner} at CEFR level {level}. \
         Mix translation questions and multiple choice questions (A, B, C). \
         Return a JSON LIST of objects. Each object must have this structure:\n\
         {{\n\
         \x20 \"question\": \"The question text (including options if multiple choice)\",\n\
         \x20 \"correct_answers\": [\"list\", \"of\", \"acceptable\", \"answers\", \"or\", \"A\"/\"B\"/\"C\"],\n\
         \x20 \"explanation\": \"Bilingual explanation ({target} + {learner}) shown after a wrong answer\",\n\
         \x20 \"keywords\": [\"key\", \"words\", \"related\", \"to\", \"topic\"]\n\
         }}",
        target = target_language,
        learner = learner_language,
        count = count,
        level = level,
    )
}

/// Read a generated batch, keeping only well-formed questions
pub fn parse_batch(text: &str) -> Vec<QuestionRecord> {
    let text = strip_code_fence(text.trim());

    let entries = match serde_json::from_str::<Vec<serde_json::Value>>(text) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Generated batch is not a JSON list: {}", e);
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<QuestionRecord>(value) {
            Ok(q) if !q.text.trim().is_empty() => Some(q),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Skipping malformed generated question: {}", e);
                None
            }
        })
        .collect()
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
