//! Operator confirmation before a deletion.
//!
//! The engine asks a [`Confirmation`] for every deletable candidate. Only
//! the interactive variant blocks on input; tests plug in a scripted
//! [`Prompter`] instead of a terminal.

use std::io::{self, BufRead, Write};

use crate::config::DryRunStrategy;

use super::{PruneError, Target};

/// Asks a yes/no question and blocks until it is answered.
pub trait Prompter {
    /// Ask `question`; `Ok(true)` means yes.
    ///
    /// # Errors
    ///
    /// Returns an I/O error when input cannot be read or is closed.
    fn ask(&mut self, question: &str) -> io::Result<bool>;
}

/// Line-based prompter over any reader and writer.
///
/// Accepts `y`/`yes` and `n`/`no` in any case; an empty line means no.
/// Anything else repeats the question.
pub struct TerminalPrompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> TerminalPrompter<R, W> {
    /// Create a prompter reading answers from `input` and writing questions to `output`.
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl TerminalPrompter<io::StdinLock<'static>, io::Stderr> {
    /// Prompter on the process's stdin and stderr.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Prompter for TerminalPrompter<R, W> {
    fn ask(&mut self, question: &str) -> io::Result<bool> {
        let mut line = String::new();
        loop {
            write!(self.output, "{question} (y/N) ")?;
            self.output.flush()?;

            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "input closed before an answer was given",
                ));
            }
            match parse_answer(&line) {
                Some(answer) => return Ok(answer),
                None => writeln!(
                    self.output,
                    "Sorry, your reply was invalid: {:?} is not a valid answer, please try again.",
                    line.trim()
                )?,
            }
        }
    }
}

/// Interpret a yes/no answer; `None` when it is neither.
pub fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "" | "n" | "no" => Some(false),
        _ => None,
    }
}

/// How deletions get confirmed during a run.
pub enum Confirmation {
    /// `--yes`: every deletion is confirmed.
    AlwaysYes,
    /// Dry-run mode: nothing is deleted for real, so nothing is asked.
    NeverPrompt,
    /// Ask the operator for each candidate.
    Interactive(Box<dyn Prompter>),
}

impl Confirmation {
    /// Pick the confirmation mode for a run.
    ///
    /// `prompter` is only called when the run is interactive.
    pub fn for_run(
        yes: bool,
        dry_run: DryRunStrategy,
        prompter: impl FnOnce() -> Box<dyn Prompter>,
    ) -> Self {
        if dry_run.is_dry_run() {
            Self::NeverPrompt
        } else if yes {
            Self::AlwaysYes
        } else {
            Self::Interactive(prompter())
        }
    }

    /// Returns `true` when confirming may block on operator input.
    pub fn is_interactive(&self) -> bool {
        matches!(self, Self::Interactive(_))
    }

    /// Confirm the deletion of `target`.
    ///
    /// # Errors
    ///
    /// Returns [`PruneError::Prompt`] when the prompt cannot be answered.
    pub fn confirm(&mut self, target: &Target) -> Result<bool, PruneError> {
        match self {
            Self::AlwaysYes | Self::NeverPrompt => Ok(true),
            Self::Interactive(prompter) => prompter
                .ask(&format!("Delete {target}?"))
                .map_err(PruneError::Prompt),
        }
    }
}

impl std::fmt::Debug for Confirmation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlwaysYes => f.write_str("AlwaysYes"),
            Self::NeverPrompt => f.write_str("NeverPrompt"),
            Self::Interactive(_) => f.write_str("Interactive"),
        }
    }
}
