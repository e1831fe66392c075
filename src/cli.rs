//! Command-line interface for iconsort.
//!
//! Each subcommand loads the configuration, resolves the library root and
//! hands off to the library:
//! - `apply`: file an externally classified batch
//! - `organize`: classify staged icons by filename keyword and file them
//! - `sort`: number the icons of one folder in sorted order
//! - `recover`: undo temporary names left by an interrupted sort
//! - `status` and `cleanup`: ledger totals and staging folder removal

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::batch::{ClassificationResult, load_batch};
use crate::config::Config;
use crate::domain::Domain;
use crate::mapping_store::MappingStore;
use crate::output::OutputFormatter;
use crate::rename_engine::{BulkRenameError, RenameEngine, StdFileOps, recover_temporaries, two_phase_rename};
use crate::scan::{CleanupOutcome, cleanup_staging, keyword_batch, sort_plan, unprocessed_images};

#[derive(Debug, Parser)]
#[command(name = "iconsort", version)]
#[command(about = "Classify, rename and file game icon images", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to .iconsortrc.toml, then ~/.config/iconsort/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Library root; overrides the configured one
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Icon domain, which selects the ledger file and naming rules
    #[arg(long, short, global = true, value_enum, default_value_t = Domain::Abilities)]
    pub domain: Domain,

    /// Show debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Apply a JSON batch of classified icons
    Apply {
        /// JSON array of {original, name, category, description}
        batch: PathBuf,
        #[arg(long)]
        dry_run: bool,
    },
    /// Classify staged icons by filename keywords and file them
    Organize {
        /// Staging folder below the root
        #[arg(long)]
        staging: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Prefix the icons in a folder with their sorted position
    Sort {
        /// Folder to sort, relative to the root
        dir: PathBuf,
        /// Group by theme before ordering by name
        #[arg(long)]
        by_theme: bool,
        #[arg(long)]
        dry_run: bool,
    },
    /// Restore files left at temporary names by an interrupted sort
    Recover {
        dir: PathBuf,
    },
    /// Show ledger totals and pending icons
    Status {
        #[arg(long)]
        staging: Option<String>,
    },
    /// Remove the staging folder once it is empty
    Cleanup {
        #[arg(long)]
        staging: Option<String>,
    },
}

/// How a command that did not fail outright went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    /// Some entries or renames failed and were reported.
    Partial,
}

impl RunStatus {
    fn from_clean(clean: bool) -> Self {
        if clean { RunStatus::Success } else { RunStatus::Partial }
    }
}

struct Context {
    config: Config,
    root: PathBuf,
    domain: Domain,
}

impl Context {
    fn staging<'a>(&'a self, flag: &'a Option<String>) -> &'a str {
        flag.as_deref().unwrap_or(&self.config.library.staging_dir)
    }

    fn fallback_category(&self) -> &str {
        self.config
            .fallback_category
            .as_deref()
            .unwrap_or(self.domain.fallback_category())
    }

    fn resolve_dir(&self, dir: &Path) -> PathBuf {
        self.root.join(dir)
    }

    /// Opens the ledger; a dry run never creates the file.
    fn open_store(&self, create: bool) -> Result<MappingStore, String> {
        let path = self.root.join(self.domain.ledger_file_name());
        let result = if create {
            MappingStore::load_or_create(&self.root, self.domain)
        } else if path.exists() {
            MappingStore::load(&path, self.domain)
        } else {
            Ok(MappingStore::empty(path, self.domain))
        };
        result.map_err(|e| format!("Error opening ledger: {e}"))
    }
}

/// Runs a parsed command line.
///
/// Returns `Err` only for failures that stop the whole command; per-entry
/// failures are printed and reported as [`RunStatus::Partial`].
pub fn run_cli(cli: Cli) -> Result<RunStatus, String> {
    let config =
        Config::load(cli.config.as_deref()).map_err(|e| format!("Error loading configuration: {e}"))?;
    let root = config.resolve_root(cli.root.as_deref());
    if !root.is_dir() {
        return Err(format!("Library root {} is not a directory", root.display()));
    }

    let ctx = Context {
        config,
        root,
        domain: cli.domain,
    };
    tracing::debug!(root = %ctx.root.display(), domain = %ctx.domain, "starting");

    match &cli.command {
        Command::Apply { batch, dry_run } => apply_command(&ctx, batch, *dry_run),
        Command::Organize { staging, dry_run } => organize_command(&ctx, ctx.staging(staging), *dry_run),
        Command::Sort {
            dir,
            by_theme,
            dry_run,
        } => sort_command(&ctx, dir, *by_theme, *dry_run),
        Command::Recover { dir } => recover_command(&ctx, dir),
        Command::Status { staging } => status_command(&ctx, ctx.staging(staging)),
        Command::Cleanup { staging } => cleanup_command(&ctx, ctx.staging(staging)),
    }
}

fn apply_command(ctx: &Context, batch_path: &Path, dry_run: bool) -> Result<RunStatus, String> {
    let batch = load_batch(batch_path, ctx.fallback_category()).map_err(|e| e.to_string())?;
    OutputFormatter::info(&format!(
        "Applying {} entries from {} to {}",
        batch.entries.len(),
        batch_path.display(),
        ctx.root.display()
    ));

    for rejected in &batch.rejected {
        OutputFormatter::warning(&format!("Entry #{} ignored: {}", rejected.index, rejected.reason));
    }

    let status = run_batch(ctx, &batch.entries, dry_run)?;
    if batch.rejected.is_empty() {
        Ok(status)
    } else {
        Ok(RunStatus::Partial)
    }
}

fn organize_command(ctx: &Context, staging: &str, dry_run: bool) -> Result<RunStatus, String> {
    let filter = ctx
        .config
        .scan_filter()
        .map_err(|e| format!("Error compiling filters: {e}"))?;
    let store = ctx.open_store(false)?;
    let files = unprocessed_images(&ctx.root, staging, &store, &filter).map_err(|e| e.to_string())?;

    if files.is_empty() {
        OutputFormatter::plain("No unprocessed icons found.");
        return Ok(RunStatus::Success);
    }

    OutputFormatter::info(&format!("Organizing {} icon(s) from {}/", files.len(), staging));
    let entries = keyword_batch(&files, &ctx.config.classifier(ctx.domain));
    run_batch(ctx, &entries, dry_run)
}

fn run_batch(ctx: &Context, entries: &[ClassificationResult], dry_run: bool) -> Result<RunStatus, String> {
    let engine = RenameEngine::new(&ctx.root, ctx.domain.filename_generator());

    if dry_run {
        let store = ctx.open_store(false)?;
        let mut planned = Vec::new();
        let mut clean = true;
        for step in engine.plan_batch(&store, entries) {
            match step {
                Ok(planned_move) => planned.push(planned_move),
                Err((path, e)) => {
                    OutputFormatter::error(&format!("{path}: {e}"));
                    clean = false;
                }
            }
        }

        OutputFormatter::dry_run_notice("Icons would be filed as follows:");
        OutputFormatter::planned_moves(&planned);
        let mut counts = BTreeMap::new();
        for planned_move in &planned {
            *counts.entry(planned_move.category.clone()).or_insert(0) += 1;
        }
        OutputFormatter::summary_table(&counts, planned.len());
        OutputFormatter::dry_run_notice("No files were modified.");
        return Ok(RunStatus::from_clean(clean));
    }

    let mut store = ctx.open_store(true)?;
    let pb = OutputFormatter::create_progress_bar(entries.len() as u64);
    let report = engine.apply_batch_with_progress(&mut store, entries, |outcome| {
        pb.println(OutputFormatter::entry_line(outcome));
        pb.inc(1);
    });
    pb.finish_and_clear();

    OutputFormatter::batch_report(&report);
    if report.is_complete_success() {
        OutputFormatter::success(&format!("Ledger saved to {}", store.path().display()));
    } else {
        OutputFormatter::warning("Some icons could not be processed. Please review errors above.");
    }
    Ok(RunStatus::from_clean(report.is_complete_success()))
}

fn sort_command(ctx: &Context, dir: &Path, by_theme: bool, dry_run: bool) -> Result<RunStatus, String> {
    let dir = ctx.resolve_dir(dir);
    let filter = ctx
        .config
        .scan_filter()
        .map_err(|e| format!("Error compiling filters: {e}"))?;
    let steps = sort_plan(&dir, &filter, by_theme).map_err(|e| e.to_string())?;

    if steps.is_empty() {
        OutputFormatter::plain("No icons found to sort.");
        return Ok(RunStatus::Success);
    }

    if dry_run {
        OutputFormatter::dry_run_notice(&format!("Sorting {}:", dir.display()));
        for step in steps.iter().filter(|s| s.from != s.to) {
            OutputFormatter::plain(&format!(" - {} → {}", step.from, step.to));
        }
        OutputFormatter::dry_run_notice("No files were modified.");
        return Ok(RunStatus::Success);
    }

    match two_phase_rename(&dir, &steps, &StdFileOps) {
        Ok(report) => {
            OutputFormatter::bulk_rename_report(&report);
            Ok(RunStatus::from_clean(!report.is_partial()))
        }
        Err(BulkRenameError::TempRenameFailed {
            file,
            source,
            unrestored,
        }) => {
            if !unrestored.is_empty() {
                OutputFormatter::warning("These files could not be restored and need manual attention:");
                for name in &unrestored {
                    OutputFormatter::plain(&format!("    - {name}"));
                }
            }
            Err(format!("Sort aborted, {file} could not be renamed: {source}"))
        }
        Err(e) => Err(e.to_string()),
    }
}

fn recover_command(ctx: &Context, dir: &Path) -> Result<RunStatus, String> {
    let dir = ctx.resolve_dir(dir);
    let report = recover_temporaries(&dir).map_err(|e| format!("Recovery failed in {}: {e}", dir.display()))?;

    if report.restored.is_empty() && report.conflicts.is_empty() {
        OutputFormatter::plain("No temporary files found.");
    }
    for name in &report.restored {
        OutputFormatter::success(&format!("Restored {name}"));
    }
    for name in &report.conflicts {
        OutputFormatter::warning(&format!("{name}: original name is taken, left as is"));
    }
    Ok(RunStatus::from_clean(report.conflicts.is_empty()))
}

fn status_command(ctx: &Context, staging: &str) -> Result<RunStatus, String> {
    let store = ctx.open_store(false)?;
    OutputFormatter::info(&format!("Ledger: {}", store.path().display()));
    OutputFormatter::summary_table(&store.category_counts(), store.len());

    if ctx.root.join(staging).is_dir() {
        let filter = ctx
            .config
            .scan_filter()
            .map_err(|e| format!("Error compiling filters: {e}"))?;
        let pending = unprocessed_images(&ctx.root, staging, &store, &filter).map_err(|e| e.to_string())?;
        OutputFormatter::plain(&format!("\nPending in {}/: {}", staging, pending.len()));
    }
    Ok(RunStatus::Success)
}

fn cleanup_command(ctx: &Context, staging: &str) -> Result<RunStatus, String> {
    let store = ctx.open_store(false)?;
    match cleanup_staging(&ctx.root, staging, &store).map_err(|e| e.to_string())? {
        CleanupOutcome::Removed => OutputFormatter::success(&format!("Removed empty {staging}/")),
        CleanupOutcome::Missing => OutputFormatter::plain(&format!("{staging}/ does not exist.")),
        CleanupOutcome::Kept { unprocessed, stale } => {
            OutputFormatter::warning(&format!(
                "{staging}/ kept: {unprocessed} unprocessed file(s), {stale} already-processed file(s) still present"
            ));
        }
    }
    Ok(RunStatus::Success)
}
