//! Core domain types for the parla quiz tutor.
//!
//! This module defines the records that flow through a quiz session:
//! - Questions (from the provider, level files, or the review list)
//! - Error records persisted for later review
//! - Per-session statistics appended to the progress history

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Questions
// ============================================================================

/// One quiz item. Immutable once loaded.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct QuestionRecord {
    #[serde(rename = "question")]
    pub text: String,

    #[serde(rename = "correct_answers", default, deserialize_with = "null_as_default")]
    pub accepted_answers: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub explanation: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,
}

impl QuestionRecord {
    pub fn new(text: impl Into<String>, accepted_answers: Vec<String>) -> Self {
        Self {
            text: text.into(),
            accepted_answers,
            explanation: String::new(),
            keywords: Vec::new(),
        }
    }

    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    pub fn kind(&self) -> QuestionKind {
        QuestionKind::classify(&self.text)
    }

    /// First line of the question text, used in summaries
    pub fn headline(&self) -> &str {
        headline(&self.text)
    }
}

/// Shape of a question as far as answer collection and grading care
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum QuestionKind {
    /// Lettered options; `options` holds the accepted lowercase letters
    MultipleChoice { options: Vec<char> },
    FreeText,
}

impl QuestionKind {
    /// Classify a question by its text.
    ///
    /// Questions carry no explicit type tag: anything containing both `A)` and
    /// `B)` is treated as multiple choice, so a free-text question that happens
    /// to contain those substrings is misclassified. Options are `a`-`c`, plus
    /// `d` when `D)` appears.
    pub fn classify(text: &str) -> Self {
        if !(text.contains("A)") && text.contains("B)")) {
            return QuestionKind::FreeText;
        }

        let mut options = vec!['a', 'b', 'c'];
        if text.contains("D)") {
            options.push('d');
        }
        QuestionKind::MultipleChoice { options }
    }

    pub fn is_multiple_choice(&self) -> bool {
        matches!(self, QuestionKind::MultipleChoice { .. })
    }
}

// ============================================================================
// Error records
// ============================================================================

/// A previously missed question. At most one record per question text.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ErrorRecord {
    /// When the answer was missed; hand-edited lists may omit it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<NaiveDateTime>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub question: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub user_answer: String,

    #[serde(rename = "correct_answers", default, deserialize_with = "null_as_default")]
    pub accepted_answers: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub explanation: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords: Vec<String>,
}

impl ErrorRecord {
    /// Build a record for a wrong answer to `question`
    pub fn for_question(
        question: &QuestionRecord,
        user_answer: impl Into<String>,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            timestamp: Some(timestamp),
            question: question.text.clone(),
            user_answer: user_answer.into(),
            accepted_answers: question.accepted_answers.clone(),
            explanation: question.explanation.clone(),
            keywords: question.keywords.clone(),
        }
    }

    /// Turn the record back into a question for review practice
    pub fn to_question(&self) -> QuestionRecord {
        QuestionRecord {
            text: self.question.clone(),
            accepted_answers: self.accepted_answers.clone(),
            explanation: self.explanation.clone(),
            keywords: self.keywords.clone(),
        }
    }

    pub fn headline(&self) -> &str {
        headline(&self.question)
    }
}

// ============================================================================
// Session statistics
// ============================================================================

/// How a session sourced its questions
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    Online,
    Offline,
}

impl std::fmt::Display for SessionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionMode::Online => write!(f, "online"),
            SessionMode::Offline => write!(f, "offline"),
        }
    }
}

/// Summary of one finished session. Append-only history entry.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionStats {
    pub timestamp: NaiveDateTime,
    pub mode: SessionMode,
    pub score: usize,
    pub total: usize,
    pub percentage: f64,
}

impl SessionStats {
    /// Summarize a session; the percentage is rounded to two decimals
    pub fn new(mode: SessionMode, score: usize, total: usize, timestamp: NaiveDateTime) -> Self {
        let percentage = (percentage(score, total) * 100.0).round() / 100.0;
        Self {
            timestamp,
            mode,
            score,
            total,
            percentage,
        }
    }
}

/// Share of correct answers in percent; 0 when nothing was answered
pub fn percentage(score: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    score as f64 / total as f64 * 100.0
}

fn headline(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

/// Treat an explicit JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
