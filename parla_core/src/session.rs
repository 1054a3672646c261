//! The quiz session loop.
//!
//! A session cycles through: refill the queue if it is empty, present the next
//! question, collect and screen the answer, grade it, record the outcome. It
//! ends when the configured number of questions has been answered, when an
//! offline queue runs dry, when the learner types an exit keyword, or when the
//! provider keeps failing and there are no local questions to fall back on.

use crate::console::Console;
use crate::grading::{check_input, grade_question, InputCheck};
use crate::provider::QuestionProvider;
use crate::report::{progress_line, write_session_report};
use crate::retry::{FailureAction, FailureKind, RetryPolicy, Sleeper, ThreadSleeper};
use crate::source::{prepare_offline_batch, sample, QuestionSource};
use crate::store::Store;
use crate::{ErrorRecord, QuestionRecord, Result, SessionStats};
use chrono::Local;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::VecDeque;
use std::io::{BufRead, Write};
use uuid::Uuid;

/// What the caller asks a session to do
#[derive(Clone, Debug)]
pub struct SessionPlan {
    pub source: QuestionSource,
    pub session_length: usize,
    /// Skip the welcome and loading notices (review mode)
    pub silent: bool,
    /// CEFR level passed to the provider
    pub level: String,
}

impl SessionPlan {
    pub fn new(source: QuestionSource, session_length: usize) -> Self {
        Self {
            source,
            session_length,
            silent: false,
            level: "A1".into(),
        }
    }

    /// Review sessions run silently over the whole review pool
    pub fn review(pool: Vec<QuestionRecord>) -> Self {
        let session_length = pool.len();
        Self {
            source: QuestionSource::Review(pool),
            session_length,
            silent: true,
            level: "A1".into(),
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }
}

/// Why a session stopped
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// `session_length` questions were answered
    Completed,
    /// The offline queue ran out before `session_length`
    SourceExhausted,
    /// The learner typed an exit keyword (or closed the input)
    UserExit,
    /// Repeated provider failures and no local questions to fall back on
    ProviderGaveUp,
    /// Offline mode found nothing to ask
    NoQuestions,
}

/// Summary handed back to the caller once a session is over
#[derive(Clone, Debug)]
pub struct SessionOutcome {
    pub end: SessionEnd,
    pub questions_answered: usize,
    pub errors: Vec<ErrorRecord>,
    /// The statistics entry appended to the history, if any
    pub stats: Option<SessionStats>,
    /// The session switched to local questions after provider failures
    pub fell_back: bool,
}

impl SessionOutcome {
    pub fn score(&self) -> usize {
        self.questions_answered - self.errors.len()
    }
}

/// Mutable state owned by one run of the loop
#[derive(Default)]
struct SessionState {
    queue: VecDeque<QuestionRecord>,
    questions_answered: usize,
    session_errors: Vec<ErrorRecord>,
    offline: bool,
    fell_back: bool,
}

enum Refill {
    Loaded,
    Retried,
    FellBack,
    GaveUp,
}

/// Runs quiz sessions against one store and provider
pub struct QuizEngine<'a, S: Sleeper = ThreadSleeper> {
    store: &'a Store,
    provider: &'a dyn QuestionProvider,
    local_questions: Vec<QuestionRecord>,
    policy: RetryPolicy,
    sleeper: S,
    rng: StdRng,
}

impl<'a> QuizEngine<'a, ThreadSleeper> {
    /// Engine with real sleeps and the store's local fallback pool
    pub fn new(store: &'a Store, provider: &'a dyn QuestionProvider, policy: RetryPolicy) -> Self {
        Self {
            store,
            provider,
            local_questions: store.load_local_questions(),
            policy,
            sleeper: ThreadSleeper,
            rng: StdRng::from_os_rng(),
        }
    }
}

impl<'a, S: Sleeper> QuizEngine<'a, S> {
    pub fn with_sleeper<T: Sleeper>(self, sleeper: T) -> QuizEngine<'a, T> {
        QuizEngine {
            store: self.store,
            provider: self.provider,
            local_questions: self.local_questions,
            policy: self.policy,
            sleeper,
            rng: self.rng,
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_local_questions(mut self, questions: Vec<QuestionRecord>) -> Self {
        self.local_questions = questions;
        self
    }

    pub fn local_questions(&self) -> &[QuestionRecord] {
        &self.local_questions
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    /// Run one session to completion
    pub fn run<R: BufRead, W: Write>(
        &mut self,
        plan: SessionPlan,
        console: &mut Console<R, W>,
    ) -> Result<SessionOutcome> {
        let session_id = Uuid::new_v4();
        let span = tracing::info_span!("session", %session_id);
        let _guard = span.enter();

        let mode = plan.source.mode();
        let length = plan.session_length;
        let silent = plan.silent;
        tracing::info!("Starting {} session of {} questions", mode, length);

        if !silent {
            console.say(format!(
                "Welcome! Starting a session of {} questions. Type 'exit' to quit.\n",
                length
            ))?;
        }

        self.policy.reset();
        let mut state = SessionState::default();

        let pool = match plan.source {
            QuestionSource::Remote => None,
            QuestionSource::Offline(pool) if pool.is_empty() => Some(self.local_questions.clone()),
            QuestionSource::Offline(pool) | QuestionSource::Review(pool) => Some(pool),
        };

        if let Some(pool) = pool {
            state.offline = true;
            if !silent {
                console.say("🚀 Starting in OFFLINE MODE.")?;
            }
            if pool.is_empty() {
                console.say("❌ Error: No questions available.")?;
                return Ok(SessionOutcome {
                    end: SessionEnd::NoQuestions,
                    questions_answered: 0,
                    errors: Vec::new(),
                    stats: None,
                    fell_back: false,
                });
            }

            let batch = prepare_offline_batch(&pool, length, &mut self.rng);
            if batch.short && !silent {
                console.say(format!(
                    "⚠️  Only {} questions available. Starting the session with those.",
                    batch.questions.len()
                ))?;
            }
            if !silent {
                console.say(format!(
                    "✅ Loaded {} questions for this session.",
                    batch.questions.len()
                ))?;
            }
            state.queue = batch.questions.into();
        }

        let end = loop {
            if state.questions_answered >= length {
                break SessionEnd::Completed;
            }

            if state.queue.is_empty() {
                if state.offline {
                    break SessionEnd::SourceExhausted;
                }
                match self.refill(&mut state, length, &plan.level, console)? {
                    Refill::Loaded | Refill::Retried => continue,
                    Refill::FellBack => {
                        state.offline = true;
                        state.fell_back = true;
                        continue;
                    }
                    Refill::GaveUp => break SessionEnd::ProviderGaveUp,
                }
            }

            let Some(question) = state.queue.pop_front() else {
                continue;
            };

            console.say(progress_line(state.questions_answered + 1, length))?;
            console.say(format!("📝 {}", question.text))?;

            let Some(answer) = collect_answer(&question, console)? else {
                console.say("Goodbye!")?;
                break SessionEnd::UserExit;
            };

            self.record(&question, &answer, &mut state, console)?;
            state.questions_answered += 1;
            console.say("-".repeat(40))?;
        };

        self.finish(end, mode, state, console)
    }

    /// Ask the provider for the rest of the session, applying the retry policy
    fn refill<R: BufRead, W: Write>(
        &mut self,
        state: &mut SessionState,
        length: usize,
        level: &str,
        console: &mut Console<R, W>,
    ) -> Result<Refill> {
        let needed = length - state.questions_answered;
        console.say(format!("Generating questions for level {}...", level))?;

        let failure = match self.provider.generate_batch(needed, level) {
            Ok(batch) if !batch.is_empty() => {
                self.policy.reset();
                console.say(format!("✅ Loaded {} new questions.\n", batch.len()))?;
                state.queue.extend(batch);
                return Ok(Refill::Loaded);
            }
            Ok(_) => {
                tracing::warn!("Provider returned an empty batch");
                FailureKind::EmptyBatch
            }
            Err(e) => {
                tracing::warn!("Question generation failed: {}", e);
                FailureKind::ProviderError
            }
        };

        match self.policy.record_failure(failure) {
            FailureAction::Retry(delay) => {
                console.say(format!(
                    "Failed to generate questions. Waiting {}s before retrying ({}/{})...",
                    delay.as_secs(),
                    self.policy.consecutive_failures(),
                    self.policy.max_failures()
                ))?;
                self.sleeper.sleep(delay);
                Ok(Refill::Retried)
            }
            FailureAction::Escalate => {
                console.say("\n⚠️  Too many failures (rate limit?).")?;
                if self.local_questions.is_empty() {
                    console.say("No local questions found. Please try again in a few minutes.")?;
                    return Ok(Refill::GaveUp);
                }

                console.say(format!(
                    "🔄 Switching to OFFLINE MODE using {} local questions.",
                    self.local_questions.len()
                ))?;
                let batch = sample(&self.local_questions, needed, &mut self.rng);
                self.policy.reset();
                tracing::info!("Fell back to {} local questions", batch.len());
                console.say(format!("✅ Loaded {} offline questions.\n", batch.len()))?;
                state.queue.extend(batch);
                Ok(Refill::FellBack)
            }
        }
    }

    /// Grade one answer and apply its side effects on the error list
    fn record<R: BufRead, W: Write>(
        &mut self,
        question: &QuestionRecord,
        answer: &str,
        state: &mut SessionState,
        console: &mut Console<R, W>,
    ) -> Result<()> {
        if grade_question(answer, question) {
            console.say("\n✅ Corretto! / Richtig!")?;
            if let Err(e) = self.store.remove_error(&question.text) {
                tracing::warn!("Failed to clear review entry: {}", e);
            }
            return Ok(());
        }

        console.say("\n❌ Sbagliato / Falsch")?;
        console.say(format!(
            "   Expected: {}",
            crate::report::accepted_list(&question.accepted_answers)
        ))?;
        if !question.explanation.is_empty() {
            console.say(format!("\n{}\n", question.explanation))?;
        }

        let error = ErrorRecord::for_question(question, answer, Local::now().naive_local());
        if let Err(e) = self.store.upsert_error(&error) {
            tracing::warn!("Failed to save review entry: {}", e);
        }
        state.session_errors.push(error);
        Ok(())
    }

    fn finish<R: BufRead, W: Write>(
        &mut self,
        end: SessionEnd,
        mode: crate::SessionMode,
        state: SessionState,
        console: &mut Console<R, W>,
    ) -> Result<SessionOutcome> {
        let answered = state.questions_answered;
        let score = answered - state.session_errors.len();
        let stats = SessionStats::new(mode, score, answered, Local::now().naive_local());

        write_session_report(console, &stats, &state.session_errors)?;

        // A provider abort before any answer leaves no history entry
        let persist = !(end == SessionEnd::ProviderGaveUp && answered == 0);
        if persist {
            if let Err(e) = self.store.append_progress(&stats) {
                tracing::warn!("Failed to save session progress: {}", e);
            }
        }

        tracing::info!(
            "Session ended ({:?}): {}/{} correct",
            end,
            score,
            answered
        );

        Ok(SessionOutcome {
            end,
            questions_answered: answered,
            errors: state.session_errors,
            stats: persist.then_some(stats),
            fell_back: state.fell_back,
        })
    }
}

/// Read answers until one passes screening. `None` means leave the session.
fn collect_answer<R: BufRead, W: Write>(
    question: &QuestionRecord,
    console: &mut Console<R, W>,
) -> Result<Option<String>> {
    let kind = question.kind();
    loop {
        let Some(line) = console.prompt("\nYour answer: ")? else {
            return Ok(None);
        };

        match check_input(&line, &kind) {
            InputCheck::Exit => return Ok(None),
            InputCheck::Empty => continue,
            InputCheck::InvalidOption { options } => {
                let letters: Vec<String> = options.iter().map(|c| c.to_uppercase().to_string()).collect();
                console.say(format!(
                    "⚠️  Please choose one of the valid options ({}).",
                    letters.join(", ")
                ))?;
            }
            InputCheck::Answer(answer) => return Ok(Some(answer)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RecordingSleeper;
    use crate::{Error, SessionMode};
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::time::Duration;

    /// Provider that replays scripted responses and records requested counts
    #[derive(Default)]
    struct ScriptedProvider {
        responses: RefCell<VecDeque<Result<Vec<QuestionRecord>>>>,
        requests: RefCell<Vec<usize>>,
    }

    impl ScriptedProvider {
        fn new(responses: Vec<Result<Vec<QuestionRecord>>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl QuestionProvider for ScriptedProvider {
        fn generate_batch(&self, count: usize, _level: &str) -> Result<Vec<QuestionRecord>> {
            self.requests.borrow_mut().push(count);
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    fn questions(n: usize, answer: &str) -> Vec<QuestionRecord> {
        (0..n)
            .map(|i| {
                QuestionRecord::new(format!("Domanda {}", i), vec![answer.to_string()])
                    .with_explanation("IT: spiegazione\nDE: Erklärung")
            })
            .collect()
    }

    struct Run {
        outcome: SessionOutcome,
        output: String,
        waits: Vec<Duration>,
    }

    fn run(
        store: &Store,
        provider: &ScriptedProvider,
        local: Vec<QuestionRecord>,
        plan: SessionPlan,
        input: &str,
    ) -> Run {
        let mut engine = QuizEngine::new(store, provider, RetryPolicy::default())
            .with_local_questions(local)
            .with_rng(StdRng::seed_from_u64(42))
            .with_sleeper(RecordingSleeper::default());

        let mut console = Console::new(Cursor::new(input.to_string()), Vec::new());
        let outcome = engine.run(plan, &mut console).unwrap();

        Run {
            outcome,
            output: String::from_utf8(console.into_output()).unwrap(),
            waits: engine.sleeper().waits.clone(),
        }
    }

    fn offline(pool: Vec<QuestionRecord>, length: usize) -> SessionPlan {
        SessionPlan::new(QuestionSource::Offline(pool), length)
    }

    #[test]
    fn test_offline_session_presents_exactly_session_length() {
        crate::logging::init_test();
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::default();

        let result = run(&store, &provider, vec![], offline(questions(10, "si"), 4), "si\n".repeat(10).as_str());

        assert_eq!(result.outcome.end, SessionEnd::Completed);
        assert_eq!(result.outcome.questions_answered, 4);
        assert_eq!(result.output.matches("Domanda [").count(), 4);
        assert!(!result.output.contains("Only"));
        assert!(provider.requests.borrow().is_empty());
    }

    #[test]
    fn test_offline_short_pool_presents_pool_size() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::default();

        let result = run(&store, &provider, vec![], offline(questions(2, "si"), 5), "si\nsi\nsi\n");

        assert_eq!(result.outcome.end, SessionEnd::SourceExhausted);
        assert_eq!(result.outcome.questions_answered, 2);
        assert_eq!(result.output.matches("Domanda [").count(), 2);
        assert_eq!(result.output.matches("Only 2 questions available").count(), 1);
        assert!(result.output.contains("Domanda [1/5]"));
    }

    #[test]
    fn test_correct_answer_removes_stored_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::default();

        let pool = questions(1, "Roma");
        let stale = ErrorRecord::for_question(&pool[0], "Milano", Local::now().naive_local());
        store.upsert_error(&stale).unwrap();
        store
            .upsert_error(&ErrorRecord::for_question(
                &QuestionRecord::new("other", vec!["x".into()]),
                "y",
                Local::now().naive_local(),
            ))
            .unwrap();

        let result = run(&store, &provider, vec![], offline(pool, 1), "roma!\n");

        assert_eq!(result.outcome.score(), 1);
        let remaining = store.load_errors();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].question, "other");
    }

    #[test]
    fn test_wrong_answer_overwrites_stored_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::default();

        let pool = questions(1, "Roma");
        let stale = ErrorRecord::for_question(&pool[0], "Torino", Local::now().naive_local());
        store.upsert_error(&stale).unwrap();

        let result = run(&store, &provider, vec![], offline(pool, 1), "Napoli\n");

        assert_eq!(result.outcome.errors.len(), 1);
        assert!(result.output.contains("Expected: Roma"));
        assert!(result.output.contains("DE: Erklärung"));

        let stored = store.load_errors();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].user_answer, "Napoli");
        assert_eq!(stored[0].accepted_answers, vec!["Roma"]);
    }

    #[test]
    fn test_single_multiple_choice_question_end_to_end() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::default();

        let pool = vec![
            QuestionRecord::new("Come stai? A) bene B) male", vec!["a".into()]).with_explanation("..."),
        ];
        let result = run(&store, &provider, vec![], offline(pool, 1), "a\n");

        assert_eq!(result.outcome.end, SessionEnd::Completed);
        assert!(result.output.contains("Punteggio: 1/1 - 100%"));
        assert!(result.output.contains("Domanda [1/1] [##########]"));

        let stats = result.outcome.stats.unwrap();
        assert_eq!((stats.score, stats.total), (1, 1));
        assert_eq!(stats.percentage, 100.0);
        assert_eq!(stats.mode, SessionMode::Offline);

        assert!(store.load_errors().is_empty());
        assert!(!store.errors_path().exists());
        assert_eq!(store.load_progress().len(), 1);
    }

    #[test]
    fn test_invalid_option_is_reprompted_without_counting() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::default();

        let pool = vec![QuestionRecord::new("Scegli: A) uno B) due C) tre", vec!["B".into()])];
        let result = run(&store, &provider, vec![], offline(pool, 1), "z\n\nd\nb\n");

        assert_eq!(result.outcome.questions_answered, 1);
        assert_eq!(result.outcome.score(), 1);
        assert_eq!(result.output.matches("valid options (A, B, C)").count(), 2);
    }

    #[test]
    fn test_exit_keyword_ends_session_and_records_stats() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::default();

        let result = run(&store, &provider, vec![], offline(questions(5, "si"), 5), "si\nQUIT\n");

        assert_eq!(result.outcome.end, SessionEnd::UserExit);
        assert_eq!(result.outcome.questions_answered, 1);
        assert!(result.output.contains("Goodbye!"));

        let history = store.load_progress();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].total, 1);
        // The abandoned question is neither graded nor stored
        assert!(store.load_errors().is_empty());
    }

    #[test]
    fn test_exit_before_any_answer_scores_zero() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::default();

        let result = run(&store, &provider, vec![], offline(questions(3, "si"), 3), "exit\n");

        assert_eq!(result.outcome.questions_answered, 0);
        let stats = result.outcome.stats.unwrap();
        assert_eq!(stats.percentage, 0.0);
        assert!(result.output.contains("Punteggio: 0/0 - 0%"));
        assert_eq!(store.load_progress().len(), 1);
    }

    #[test]
    fn test_end_of_input_is_treated_as_exit() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::default();

        let result = run(&store, &provider, vec![], offline(questions(3, "si"), 3), "si\n");

        assert_eq!(result.outcome.end, SessionEnd::UserExit);
        assert_eq!(result.outcome.questions_answered, 1);
    }

    #[test]
    fn test_empty_offline_pool_uses_local_questions() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::default();

        let result = run(&store, &provider, questions(3, "si"), offline(vec![], 2), "si\nsi\n");
        assert_eq!(result.outcome.questions_answered, 2);
    }

    #[test]
    fn test_no_questions_anywhere() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::default();

        let result = run(&store, &provider, vec![], offline(vec![], 2), "");

        assert_eq!(result.outcome.end, SessionEnd::NoQuestions);
        assert!(result.outcome.stats.is_none());
        assert!(result.output.contains("No questions available"));
        assert!(store.load_progress().is_empty());
    }

    #[test]
    fn test_review_session_is_silent_and_grades_missing_answers_wrong() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::default();

        let pool = vec![QuestionRecord::new("Senza risposta", vec![])];
        let result = run(&store, &provider, vec![], SessionPlan::review(pool), "qualcosa\n");

        assert_eq!(result.outcome.end, SessionEnd::Completed);
        assert_eq!(result.outcome.errors.len(), 1);
        assert!(result.output.contains("Expected: N/A"));
        assert!(!result.output.contains("Welcome!"));
        assert!(!result.output.contains("OFFLINE MODE"));
    }

    #[test]
    fn test_remote_session_requests_remaining_count() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::new(vec![Ok(questions(2, "si")), Ok(questions(1, "si"))]);

        let plan = SessionPlan::new(QuestionSource::Remote, 3).with_level("A2");
        let result = run(&store, &provider, vec![], plan, "si\nsi\nsi\n");

        assert_eq!(result.outcome.end, SessionEnd::Completed);
        assert_eq!(*provider.requests.borrow(), vec![3, 1]);
        assert!(result.output.contains("Generating questions for level A2"));
        assert!(result.waits.is_empty());
        assert_eq!(result.outcome.stats.unwrap().mode, SessionMode::Online);
    }

    #[test]
    fn test_remote_backoff_then_success() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::new(vec![
            Err(Error::Provider("503".into())),
            Ok(vec![]),
            Ok(questions(1, "si")),
        ]);

        let plan = SessionPlan::new(QuestionSource::Remote, 1);
        let result = run(&store, &provider, vec![], plan, "si\n");

        assert_eq!(result.outcome.end, SessionEnd::Completed);
        assert_eq!(
            result.waits,
            vec![Duration::from_secs(60), Duration::from_secs(30)]
        );
        assert!(!result.outcome.fell_back);
    }

    #[test]
    fn test_three_empty_batches_fall_back_to_local_pool() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::new(vec![Ok(vec![]), Ok(vec![]), Ok(vec![])]);

        let plan = SessionPlan::new(QuestionSource::Remote, 2);
        let result = run(&store, &provider, questions(5, "si"), plan, "si\nsi\n");

        assert!(result.outcome.fell_back);
        assert_eq!(result.outcome.end, SessionEnd::Completed);
        assert_eq!(result.outcome.questions_answered, 2);
        assert_eq!(result.waits.len(), 2);
        assert_eq!(provider.requests.borrow().len(), 3);
        assert!(result.output.contains("Switching to OFFLINE MODE using 5 local questions"));
        // Recorded mode stays the one the session started with
        assert_eq!(result.outcome.stats.unwrap().mode, SessionMode::Online);
    }

    #[test]
    fn test_fallback_pool_smaller_than_needed_exhausts() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::default();

        let plan = SessionPlan::new(QuestionSource::Remote, 4);
        let result = run(&store, &provider, questions(1, "si"), plan, "si\n");

        assert!(result.outcome.fell_back);
        assert_eq!(result.outcome.end, SessionEnd::SourceExhausted);
        assert_eq!(result.outcome.questions_answered, 1);
        // No further provider calls once offline
        assert_eq!(provider.requests.borrow().len(), 3);
    }

    #[test]
    fn test_provider_gives_up_without_local_pool() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::new(vec![
            Err(Error::Provider("429".into())),
            Err(Error::Provider("429".into())),
            Err(Error::Provider("429".into())),
        ]);

        let plan = SessionPlan::new(QuestionSource::Remote, 3);
        let result = run(&store, &provider, vec![], plan, "");

        assert_eq!(result.outcome.end, SessionEnd::ProviderGaveUp);
        assert!(result.outcome.stats.is_none());
        assert!(result.output.contains("No local questions found"));
        assert!(!store.progress_path().exists());
    }

    #[test]
    fn test_provider_gives_up_after_some_answers_records_stats() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = Store::new(temp_dir.path());
        let provider = ScriptedProvider::new(vec![Ok(questions(1, "si"))]);

        let plan = SessionPlan::new(QuestionSource::Remote, 2);
        let result = run(&store, &provider, vec![], plan, "no\n");

        assert_eq!(result.outcome.end, SessionEnd::ProviderGaveUp);
        assert_eq!(result.outcome.questions_answered, 1);
        let history = store.load_progress();
        assert_eq!(history.len(), 1);
        assert_eq!((history[0].score, history[0].total), (0, 1));
    }
}
