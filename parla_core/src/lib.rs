#![forbid(unsafe_code)]

//! Core domain model and quiz logic for the parla language tutor.
//!
//! This crate provides:
//! - Domain types (questions, error records, session statistics)
//! - Answer normalization and grading
//! - Question sourcing (remote provider, level files, review list)
//! - The interactive session loop with retry and offline fallback
//! - JSON persistence and CSV export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod grading;
pub mod store;
pub mod source;
pub mod retry;
pub mod provider;
pub mod console;
pub mod report;
pub mod session;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use grading::{grade, normalize};
pub use store::Store;
pub use source::{review_pool, QuestionSource, ReviewUnavailable};
pub use retry::{RetryPolicy, Sleeper};
pub use provider::{GeminiClient, QuestionProvider};
pub use console::Console;
pub use session::{QuizEngine, SessionEnd, SessionOutcome, SessionPlan};
