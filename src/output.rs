//! Console output: coloured status lines, progress bar and summary tables.

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;

use crate::rename_engine::{BatchReport, BulkRenameReport, EntryOutcome, PlannedMove};

/// Formats everything the CLI prints.
///
/// Status lines go to stdout except errors, which go to stderr. Colours
/// follow `colored`'s terminal detection.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    ///
    /// # Arguments
    ///
    /// * `message` - The message to display
    ///
    /// # Example
    ///
    /// ```no_run
    /// use iconsort::output::OutputFormatter;
    /// OutputFormatter::success("Ledger saved");
    /// ```
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message in red with a cross, on stderr.
    ///
    /// # Arguments
    ///
    /// * `message` - The error to display
    pub fn error(message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Prints a warning in yellow.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    pub fn plain(message: &str) {
        println!("{}", message);
    }

    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    pub fn dry_run_notice(message: &str) {
        println!("{}", format!("[DRY RUN] {}", message).yellow());
    }

    /// Progress bar for a batch of `total` entries.
    ///
    /// # Arguments
    ///
    /// * `total` - Number of entries the bar counts up to
    ///
    /// # Example
    ///
    /// ```no_run
    /// use iconsort::output::OutputFormatter;
    ///
    /// let pb = OutputFormatter::create_progress_bar(3);
    /// for _ in 0..3 {
    ///     pb.inc(1);
    /// }
    /// pb.finish_and_clear();
    /// ```
    pub fn create_progress_bar(total: u64) -> ProgressBar {
        let style = ProgressStyle::default_bar()
            .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░");
        let pb = ProgressBar::new(total);
        pb.set_style(style);
        pb
    }

    /// One line per entry as it completes.
    pub fn entry_line(outcome: &EntryOutcome) -> String {
        match outcome {
            EntryOutcome::Applied(entry) => {
                format!("{} {} → {}", "✓".green(), entry.original_path, entry.new_path)
            }
            EntryOutcome::Skipped { original_path } => {
                format!("{} {} (already processed)", "-".dimmed(), original_path)
            }
            EntryOutcome::Failed {
                original_path,
                error,
            } => format!("{} {}: {}", "✗".red(), original_path, error),
        }
    }

    pub fn planned_moves(moves: &[PlannedMove]) {
        for planned in moves {
            println!(
                " - {}\n   → Would move to {}/{}",
                planned.original_path, planned.category, planned.filename
            );
        }
    }

    /// Totals and failures of an applied batch.
    ///
    /// Prints a category table for applied entries, then the applied,
    /// skipped and failed counts with each failure on its own line. A ledger
    /// save failure is printed last.
    ///
    /// # Arguments
    ///
    /// * `report` - The report returned by `RenameEngine::apply_batch`
    pub fn batch_report(report: &BatchReport) {
        let mut counts = BTreeMap::new();
        for entry in report.applied() {
            *counts.entry(entry.category.clone()).or_insert(0) += 1;
        }
        if !counts.is_empty() {
            Self::summary_table(&counts, report.applied_count());
        }

        Self::header("RESULT");
        println!("  Applied: {}", report.applied_count().to_string().green());
        println!("  Skipped: {}", report.skipped_count());

        let failures: Vec<_> = report.failures().collect();
        if !failures.is_empty() {
            println!("  Failed:  {}", failures.len().to_string().red());
            for (path, error) in failures {
                eprintln!("    - {}: {}", path, error);
            }
        }

        if let Some(e) = &report.ledger_error {
            Self::error(&format!("{e}"));
            Self::warning("Files were moved but the ledger was not updated; they will be picked up again.");
        }
    }

    pub fn bulk_rename_report(report: &BulkRenameReport) {
        Self::success(&format!(
            "Renamed {} file(s), {} already in place",
            report.renamed.len(),
            report.unchanged
        ));

        if report.is_partial() {
            Self::warning("Some files could not be given their new name:");
            for failure in &report.final_failures {
                let state = if failure.restored {
                    "restored to original name".to_string()
                } else {
                    "left at its temporary name, run recover".to_string()
                };
                eprintln!(
                    "    - {} → {}: {} ({})",
                    failure.original, failure.target, failure.error, state
                );
            }
            Self::warning("Earlier renames were kept; check the folder before sorting again.");
        }
    }

    /// Category counts with a total row.
    ///
    /// # Arguments
    ///
    /// * `category_counts` - Icons per category, printed in key order
    /// * `total_files` - Value of the total row
    ///
    /// # Example
    ///
    /// ```no_run
    /// use iconsort::output::OutputFormatter;
    /// use std::collections::BTreeMap;
    ///
    /// let counts = BTreeMap::from([("fire".to_string(), 2), ("ice".to_string(), 1)]);
    /// OutputFormatter::summary_table(&counts, 3);
    /// ```
    pub fn summary_table(category_counts: &BTreeMap<String, usize>, total_files: usize) {
        Self::header("SUMMARY");

        let width = category_counts
            .keys()
            .map(|name| name.len())
            .max()
            .unwrap_or(0)
            .max(8);

        println!("{:<width$} | {}", "Category".bold(), "Icons".bold());
        println!("{}", "-".repeat(width + 10));
        for (category, count) in category_counts {
            println!("{:<width$} | {}", category, count.to_string().green());
        }
        println!("{}", "-".repeat(width + 10));
        println!(
            "{:<width$} | {}",
            "Total".bold(),
            total_files.to_string().green().bold()
        );
    }
}
