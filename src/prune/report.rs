//! Per-object outcome lines, in kubectl's `kind "name" deleted` style.

use std::io::{self, Write};

use crate::config::DryRunStrategy;
use crate::types::Candidate;

/// Writes one line per finished deletion unless quiet.
pub struct OutcomePrinter<W> {
    out: W,
    quiet: bool,
    forced: bool,
    dry_run: DryRunStrategy,
}

impl<W: Write> OutcomePrinter<W> {
    /// Create a printer. `forced` is true when the resolved grace period is 0.
    pub fn new(out: W, quiet: bool, forced: bool, dry_run: DryRunStrategy) -> Self {
        Self {
            out,
            quiet,
            forced,
            dry_run,
        }
    }

    /// Report a deletion that went through, or would have in a dry run.
    ///
    /// # Errors
    ///
    /// Returns the write error, if any.
    pub fn deleted(&mut self, candidate: &Candidate) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(
            self.out,
            "{} \"{}\" {}",
            candidate.resource.qualified_name(),
            candidate.name,
            operation(self.forced, self.dry_run)
        )
    }

    /// Report a failed deletion.
    ///
    /// # Errors
    ///
    /// Returns the write error, if any.
    pub fn failed(&mut self, candidate: &Candidate, error: &str) -> io::Result<()> {
        if self.quiet {
            return Ok(());
        }
        writeln!(
            self.out,
            "{} \"{}\" deletion failed: {error}",
            candidate.resource.qualified_name(),
            candidate.name
        )
    }

    /// Consume the printer and return the writer.
    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Operation label: `deleted` or `force deleted`, tagged with the dry-run mode.
pub fn operation(forced: bool, dry_run: DryRunStrategy) -> String {
    let base = if forced { "force deleted" } else { "deleted" };
    match dry_run {
        DryRunStrategy::None => base.to_owned(),
        DryRunStrategy::Client => format!("{base} (dry run)"),
        DryRunStrategy::Server => format!("{base} (server dry run)"),
    }
}
