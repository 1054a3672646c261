//! Line-oriented terminal I/O.
//!
//! Wrapping the reader and writer lets the session loop run against stdin
//! and stdout in the binary and against in-memory buffers in tests.

use crate::Result;
use std::fmt::Display;
use std::io::{self, BufRead, Write};

pub struct Console<R, W> {
    input: R,
    output: W,
}

/// Console bound to the process stdin/stdout
pub type StdConsole = Console<io::StdinLock<'static>, io::Stdout>;

impl StdConsole {
    pub fn stdio() -> Self {
        Console::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Print `message` without a newline and read one line.
    ///
    /// Returns `None` once the input is exhausted.
    pub fn prompt(&mut self, message: &str) -> Result<Option<String>> {
        write!(self.output, "{}", message)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()))
    }

    /// Prompt and return the trimmed, lower-cased answer
    pub fn choice(&mut self, message: &str) -> Result<Option<String>> {
        Ok(self
            .prompt(message)?
            .map(|answer| answer.trim().to_lowercase()))
    }

    pub fn say(&mut self, text: impl Display) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    pub fn into_output(self) -> W {
        self.output
    }
}
