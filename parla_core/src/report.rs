//! Text rendering for progress and end-of-session summaries.

use crate::console::Console;
use crate::{ErrorRecord, Result, SessionStats};
use std::io::{BufRead, Write};

const BAR_LENGTH: usize = 10;

/// `#`/`-` bar with `floor(10 * progress / total)` filled cells
pub fn progress_bar(progress: usize, total: usize) -> String {
    let filled = if total == 0 {
        0
    } else {
        (BAR_LENGTH * progress / total).min(BAR_LENGTH)
    };
    format!("{}{}", "#".repeat(filled), "-".repeat(BAR_LENGTH - filled))
}

/// Header shown above each question
pub fn progress_line(progress: usize, total: usize) -> String {
    format!(
        "Domanda [{}/{}] [{}]",
        progress,
        total,
        progress_bar(progress, total)
    )
}

/// Accepted answers for display, `N/A` when there are none
pub fn accepted_list(answers: &[String]) -> String {
    if answers.is_empty() {
        "N/A".into()
    } else {
        answers.join(", ")
    }
}

/// Print one missed question: headline, wrong answer, accepted answers, explanation
pub fn write_error_entry<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    index: usize,
    error: &ErrorRecord,
) -> Result<()> {
    console.say(format!("{}. {}", index, error.headline()))?;
    console.say(format!("   ❌ Your answer: {}", error.user_answer))?;
    console.say(format!(
        "   ✅ Correct: {}",
        accepted_list(&error.accepted_answers)
    ))?;

    if !error.explanation.is_empty() {
        console.say("   📖 Spiegazione / Erklärung:")?;
        for line in error.explanation.lines() {
            console.say(format!("      {}", line))?;
        }
    }
    Ok(())
}

/// Final score plus either a perfect-score banner or the missed questions
pub fn write_session_report<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    stats: &SessionStats,
    errors: &[ErrorRecord],
) -> Result<()> {
    console.say(format!("\n{}", "=".repeat(40)))?;
    console.say(format!(
        "Punteggio: {}/{} - {:.0}%",
        stats.score,
        stats.total,
        crate::types::percentage(stats.score, stats.total)
    ))?;

    if errors.is_empty() {
        console.say("\n   *  *  *   PERFETTO!   *  *  *\n")?;
        console.say("🏆 Every answer was right. / Alles richtig!")?;
    } else {
        console.say("Bravo! La pratica rende perfetti. 🍕")?;
        console.say(format!("You made {} mistakes.", errors.len()))?;
        console.say(format!("\n{} FOCUS ON WRONG ANSWERS {}\n", "=".repeat(15), "=".repeat(15)))?;

        for (idx, error) in errors.iter().enumerate() {
            write_error_entry(console, idx + 1, error)?;
            console.say("")?;
        }

        console.say(format!("{}\n", "-".repeat(40)))?;
        console.say("These questions were saved to your personal review list.")?;
        console.say("Choose mode 3 to practice them again!")?;
    }

    console.say(format!("{}\n", "=".repeat(40)))?;
    Ok(())
}
