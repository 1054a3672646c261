//! Question source resolution.
//!
//! Offline and review sessions draw one shuffled batch up front. Remote
//! sessions start empty and are refilled by the session loop through a
//! [`crate::QuestionProvider`].

use crate::{ErrorRecord, QuestionRecord, SessionMode};
use rand::seq::SliceRandom;
use rand::Rng;

/// Where a session gets its questions
#[derive(Clone, Debug)]
pub enum QuestionSource {
    /// Generated on demand by the remote provider
    Remote,
    /// A fixed pool (a level file); an empty pool means the local fallback pool
    Offline(Vec<QuestionRecord>),
    /// Previously missed questions, see [`review_pool`]
    Review(Vec<QuestionRecord>),
}

impl QuestionSource {
    /// Mode recorded in the session statistics
    pub fn mode(&self) -> SessionMode {
        match self {
            QuestionSource::Remote => SessionMode::Online,
            QuestionSource::Offline(_) | QuestionSource::Review(_) => SessionMode::Offline,
        }
    }
}

/// Result of drawing an up-front batch from a pool
#[derive(Clone, Debug, PartialEq)]
pub struct OfflineBatch {
    pub questions: Vec<QuestionRecord>,
    /// The pool held fewer questions than the session asked for
    pub short: bool,
}

/// Shuffle the whole pool and keep the first `session_length` questions
pub fn prepare_offline_batch<R: Rng + ?Sized>(
    pool: &[QuestionRecord],
    session_length: usize,
    rng: &mut R,
) -> OfflineBatch {
    let mut questions = pool.to_vec();
    questions.shuffle(rng);

    let short = questions.len() < session_length;
    questions.truncate(session_length);

    OfflineBatch { questions, short }
}

/// Draw `min(count, pool.len())` distinct questions at random
pub fn sample<R: Rng + ?Sized>(
    pool: &[QuestionRecord],
    count: usize,
    rng: &mut R,
) -> Vec<QuestionRecord> {
    prepare_offline_batch(pool, count, rng).questions
}

/// Why review mode cannot start
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReviewUnavailable {
    /// The error list is empty
    NoErrors,
    /// No entry has a usable question text
    NoUsableQuestions,
}

/// Build the review pool from the persisted error list.
///
/// Entries without question text are dropped. Entries without accepted
/// answers are kept; every answer to them grades as incorrect.
pub fn review_pool(errors: &[ErrorRecord]) -> Result<Vec<QuestionRecord>, ReviewUnavailable> {
    if errors.is_empty() {
        return Err(ReviewUnavailable::NoErrors);
    }

    let pool: Vec<QuestionRecord> = errors
        .iter()
        .filter(|e| !e.question.trim().is_empty())
        .map(ErrorRecord::to_question)
        .collect();

    let ungradeable = pool.iter().filter(|q| q.accepted_answers.is_empty()).count();
    if ungradeable > 0 {
        tracing::warn!(
            "{} review entries have no accepted answers and cannot be answered correctly",
            ungradeable
        );
    }

    if pool.is_empty() {
        return Err(ReviewUnavailable::NoUsableQuestions);
    }
    Ok(pool)
}
