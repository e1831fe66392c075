/// Moving and renaming icon files.
///
/// Two modes live here:
///
/// * **Category moves** ([`RenameEngine::apply_batch`]): each classified file is
///   moved from the staging area to `category/filename`, and recorded in the
///   ledger. Failures are per entry and never stop the batch.
/// * **Two-phase in-place rename** ([`two_phase_rename`]): files inside one
///   directory are first moved to unique `__TEMP_<n>__<original>` names and only
///   then to their targets, so a target that is still held by another file in
///   the plan is never overwritten.
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

use crate::batch::ClassificationResult;
use crate::filename::FilenameGenerator;
use crate::mapping_store::{MappingEntry, MappingStore, StoreError, normalize_key};

/// Filesystem operations used by the engine.
///
/// The default methods call straight into `std::fs`; tests swap in
/// implementations that fail on demand.
pub trait FileOps {
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<u64> {
        fs::copy(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdFileOps;

impl FileOps for StdFileOps {}

/// Why a single batch entry was not applied.
#[derive(Debug, Error)]
pub enum EntryError {
    #[error("Source file not found: {}", .path.display())]
    SourceMissing { path: PathBuf },
    #[error("Source path '{path}' is not inside the library root")]
    InvalidSourcePath { path: String },
    #[error("Invalid category name '{category}'")]
    InvalidCategory { category: String },
    #[error("Failed to create directory {}: {source}", .path.display())]
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    MoveFailed {
        from: PathBuf,
        to: PathBuf,
        source: io::Error,
    },
}

/// A move computed for one entry, before anything touches the disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub original_path: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub filename: String,
    pub category: String,
}

/// What happened to one batch entry.
#[derive(Debug)]
pub enum EntryOutcome {
    Applied(MappingEntry),
    /// Already recorded in the ledger; nothing was touched.
    Skipped { original_path: String },
    Failed {
        original_path: String,
        error: EntryError,
    },
}

/// Per-entry outcomes of a batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<EntryOutcome>,
    /// Set when the moves went through but the ledger could not be written.
    pub ledger_error: Option<StoreError>,
}

impl BatchReport {
    pub fn applied(&self) -> impl Iterator<Item = &MappingEntry> {
        self.outcomes.iter().filter_map(|o| match o {
            EntryOutcome::Applied(entry) => Some(entry),
            _ => None,
        })
    }

    pub fn applied_count(&self) -> usize {
        self.applied().count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, EntryOutcome::Skipped { .. }))
            .count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (&str, &EntryError)> {
        self.outcomes.iter().filter_map(|o| match o {
            EntryOutcome::Failed {
                original_path,
                error,
            } => Some((original_path.as_str(), error)),
            _ => None,
        })
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures().next().is_none() && self.ledger_error.is_none()
    }
}

/// Applies classification batches under a library root.
pub struct RenameEngine<F: FileOps = StdFileOps> {
    root: PathBuf,
    generator: FilenameGenerator,
    ops: F,
}

impl RenameEngine<StdFileOps> {
    pub fn new(root: &Path, generator: FilenameGenerator) -> Self {
        Self::with_ops(root, generator, StdFileOps)
    }
}

impl<F: FileOps> RenameEngine<F> {
    pub fn with_ops(root: &Path, generator: FilenameGenerator, ops: F) -> Self {
        Self {
            root: root.to_path_buf(),
            generator,
            ops,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Computes the moves a batch would perform without touching the disk.
    ///
    /// Entries already in the ledger are left out; entries that cannot be
    /// planned come back as errors in input order.
    pub fn plan_batch(
        &self,
        store: &MappingStore,
        entries: &[ClassificationResult],
    ) -> Vec<Result<PlannedMove, (String, EntryError)>> {
        let mut existing = store.existing_filenames();
        let mut seen = HashSet::new();

        entries
            .iter()
            .filter(|entry| !store.is_processed(&entry.original_path))
            .filter(|entry| seen.insert(normalize_key(&entry.original_path)))
            .map(|entry| {
                self.plan_entry(entry, &mut existing)
                    .map_err(|e| (entry.original_path.clone(), e))
            })
            .collect()
    }

    /// Applies a batch in order and saves the ledger once at the end.
    ///
    /// Each entry is moved from `root/original_path` to
    /// `root/category/filename` and appended to `store`. Entries already in
    /// the ledger are skipped without touching the disk.
    ///
    /// # Arguments
    ///
    /// * `store` - The domain ledger; updated in memory and saved if anything was applied
    /// * `entries` - Classified files, processed in input order
    ///
    /// # Returns
    ///
    /// A [`BatchReport`] with one outcome per entry. Per-entry failures never
    /// stop the batch, and a failed ledger save is reported in
    /// [`BatchReport::ledger_error`] rather than returned.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use iconsort::batch::ClassificationResult;
    /// use iconsort::domain::Domain;
    /// use iconsort::mapping_store::MappingStore;
    /// use iconsort::rename_engine::RenameEngine;
    /// use std::path::Path;
    ///
    /// let root = Path::new("/path/to/icons");
    /// let mut store = MappingStore::load_or_create(root, Domain::Abilities).unwrap();
    /// let engine = RenameEngine::new(root, Domain::Abilities.filename_generator());
    /// let report = engine.apply_batch(
    ///     &mut store,
    ///     &[ClassificationResult::new("unsorted/IMG_01.png", "Fire Bolt", "fire")],
    /// );
    /// println!("applied {}", report.applied_count());
    /// ```
    pub fn apply_batch(&self, store: &mut MappingStore, entries: &[ClassificationResult]) -> BatchReport {
        self.apply_batch_with_progress(store, entries, |_| {})
    }

    /// Like [`RenameEngine::apply_batch`], calling `on_entry` after each entry.
    pub fn apply_batch_with_progress(
        &self,
        store: &mut MappingStore,
        entries: &[ClassificationResult],
        mut on_entry: impl FnMut(&EntryOutcome),
    ) -> BatchReport {
        let mut report = BatchReport::default();
        let mut existing = store.existing_filenames();

        for entry in entries {
            let outcome = self.apply_entry(store, entry, &mut existing);
            on_entry(&outcome);
            report.outcomes.push(outcome);
        }

        if report.applied_count() > 0
            && let Err(e) = store.save()
        {
            tracing::error!(error = %e, "moves applied but ledger was not saved");
            report.ledger_error = Some(e);
        }

        report
    }

    fn apply_entry(
        &self,
        store: &mut MappingStore,
        entry: &ClassificationResult,
        existing: &mut HashSet<String>,
    ) -> EntryOutcome {
        if store.is_processed(&entry.original_path) {
            tracing::debug!(original = %entry.original_path, "already processed, skipping");
            return EntryOutcome::Skipped {
                original_path: entry.original_path.clone(),
            };
        }

        let failed = |error: EntryError| {
            tracing::warn!(original = %entry.original_path, %error, "entry not applied");
            EntryOutcome::Failed {
                original_path: entry.original_path.clone(),
                error,
            }
        };

        let plan = match self.plan_entry(entry, existing) {
            Ok(plan) => plan,
            Err(e) => return failed(e),
        };

        if let Err(e) = self.execute(&plan) {
            existing.remove(&plan.filename);
            return failed(e);
        }

        let record = MappingEntry::new(
            &entry.original_path,
            &plan.filename,
            &plan.category,
            &entry.name,
            entry.description.as_deref(),
        );
        if let Err(e) = store.append(record.clone()) {
            // is_processed was checked above, so this only fires on a bug.
            tracing::error!(error = %e, "ledger rejected a fresh entry");
        }
        tracing::info!(from = %entry.original_path, to = %record.new_path, "moved");
        EntryOutcome::Applied(record)
    }

    fn plan_entry(
        &self,
        entry: &ClassificationResult,
        existing: &mut HashSet<String>,
    ) -> Result<PlannedMove, EntryError> {
        if !is_plain_name(&entry.category) {
            return Err(EntryError::InvalidCategory {
                category: entry.category.clone(),
            });
        }

        let relative = normalize_key(&entry.original_path);
        if !is_relative_inside(&relative) {
            return Err(EntryError::InvalidSourcePath {
                path: entry.original_path.clone(),
            });
        }

        let source = self.root.join(&relative);
        if !source.is_file() {
            return Err(EntryError::SourceMissing { path: source });
        }

        let category_dir = self.root.join(&entry.category);
        loop {
            let filename = self.generator.reserve(&entry.name, &entry.category, existing);
            let destination = category_dir.join(&filename);
            if destination.exists() && destination != source {
                tracing::debug!(%filename, "name already taken on disk");
                continue;
            }
            return Ok(PlannedMove {
                original_path: entry.original_path.clone(),
                source,
                destination,
                filename,
                category: entry.category.clone(),
            });
        }
    }

    fn execute(&self, plan: &PlannedMove) -> Result<(), EntryError> {
        if let Some(category_dir) = plan.destination.parent()
            && !category_dir.exists()
        {
            fs::create_dir_all(category_dir).map_err(|e| EntryError::DirectoryCreationFailed {
                path: category_dir.to_path_buf(),
                source: e,
            })?;
        }

        if plan.source == plan.destination {
            return Ok(());
        }

        move_file(&self.ops, &plan.source, &plan.destination).map_err(|e| EntryError::MoveFailed {
            from: plan.source.clone(),
            to: plan.destination.clone(),
            source: e,
        })
    }
}

/// A single path component: categories are folders directly below the root
/// and bulk renames never leave their directory.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

/// Only plain components, so the path cannot leave the root.
fn is_relative_inside(path: &str) -> bool {
    let path = Path::new(path);
    path.components().next().is_some() && path.components().all(|c| matches!(c, Component::Normal(_)))
}

/// Renames, falling back to copy and delete across filesystems. On failure the
/// source is left as the only copy.
fn move_file(ops: &impl FileOps, from: &Path, to: &Path) -> io::Result<()> {
    match ops.rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            tracing::debug!(from = %from.display(), "rename crosses devices, copying");
            if let Err(copy_err) = ops.copy(from, to) {
                let _ = ops.remove_file(to);
                return Err(copy_err);
            }
            if let Err(remove_err) = ops.remove_file(from) {
                let _ = ops.remove_file(to);
                return Err(remove_err);
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// One `from -> to` rename inside a single directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameStep {
    pub from: String,
    pub to: String,
}

impl RenameStep {
    pub fn new(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
        }
    }
}

/// A second-phase rename that did not reach its target.
#[derive(Debug)]
pub struct FinalRenameFailure {
    pub original: String,
    pub target: String,
    pub error: io::Error,
    /// False when the file is still sitting at its temporary name.
    pub restored: bool,
}

#[derive(Debug, Default)]
pub struct BulkRenameReport {
    /// Steps that reached their target name.
    pub renamed: Vec<RenameStep>,
    /// Steps whose name was already the target.
    pub unchanged: usize,
    /// Second-phase failures. Renames listed in `renamed` are kept regardless.
    pub final_failures: Vec<FinalRenameFailure>,
}

impl BulkRenameReport {
    /// True when some files were renamed and others were not, which needs a
    /// manual look at the directory.
    pub fn is_partial(&self) -> bool {
        !self.final_failures.is_empty()
    }
}

#[derive(Debug, Error)]
pub enum BulkRenameError {
    #[error("Rename plan rejected: {reason}")]
    PlanConflict { reason: String },
    #[error("Failed to move {file} to a temporary name: {source}")]
    TempRenameFailed {
        file: String,
        source: io::Error,
        /// Files that could not be put back under their original name.
        unrestored: Vec<String>,
    },
}

/// Temporary name used during the first phase.
pub fn temp_name(index: usize, original: &str) -> String {
    format!("__TEMP_{index}__{original}")
}

fn temp_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^__TEMP_[0-9]+__(.+)$").expect("temp name regex is valid"))
}

/// Renames files within `dir` in two phases.
///
/// Phase one moves every source to a temporary name. If any of those renames
/// fails, the ones already done are rolled back and the whole plan is
/// abandoned. Phase two moves temporaries to their targets; a failure there
/// puts only that file back under its original name and leaves the renames
/// already completed in place.
///
/// Phase two never renames onto a name that is taken. A file whose target or
/// original name is occupied stays at its temporary name for
/// [`recover_temporaries`].
///
/// # Arguments
///
/// * `dir` - The directory holding every file of the plan
/// * `steps` - Plain file names; steps with `from == to` are counted but not touched
/// * `ops` - Filesystem operations, [`StdFileOps`] outside of tests
///
/// # Errors
///
/// * `BulkRenameError::PlanConflict` - The plan was rejected before any rename
/// * `BulkRenameError::TempRenameFailed` - Phase one failed and was rolled back;
///   `unrestored` lists files the rollback could not put back
///
/// # Examples
///
/// ```no_run
/// use iconsort::rename_engine::{RenameStep, StdFileOps, two_phase_rename};
/// use std::path::Path;
///
/// let steps = vec![RenameStep::new("a.png", "b.png"), RenameStep::new("b.png", "a.png")];
/// let report = two_phase_rename(Path::new("/path/to/icons/fire"), &steps, &StdFileOps).unwrap();
/// assert!(!report.is_partial());
/// ```
pub fn two_phase_rename(
    dir: &Path,
    steps: &[RenameStep],
    ops: &impl FileOps,
) -> Result<BulkRenameReport, BulkRenameError> {
    let mut report = BulkRenameReport::default();
    let active: Vec<&RenameStep> = steps.iter().filter(|s| s.from != s.to).collect();
    report.unchanged = steps.len() - active.len();
    validate_plan(dir, steps, &active)?;

    let mut moved: Vec<(usize, &RenameStep)> = Vec::with_capacity(active.len());
    for (index, step) in active.iter().enumerate() {
        let temp = dir.join(temp_name(index, &step.from));
        if let Err(e) = ops.rename(&dir.join(&step.from), &temp) {
            tracing::error!(file = %step.from, error = %e, "temporary rename failed, rolling back");
            let unrestored = rollback(dir, &moved, ops);
            return Err(BulkRenameError::TempRenameFailed {
                file: step.from.clone(),
                source: e,
                unrestored,
            });
        }
        moved.push((index, step));
    }

    for (index, step) in moved {
        let temp = dir.join(temp_name(index, &step.from));
        let target = dir.join(&step.to);
        let result = if target.exists() {
            Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} is already taken", step.to),
            ))
        } else {
            ops.rename(&temp, &target)
        };

        match result {
            Ok(()) => report.renamed.push(step.clone()),
            Err(error) => {
                let original = dir.join(&step.from);
                let restored = !original.exists() && ops.rename(&temp, &original).is_ok();
                tracing::warn!(file = %step.from, target = %step.to, %error, restored, "final rename failed");
                report.final_failures.push(FinalRenameFailure {
                    original: step.from.clone(),
                    target: step.to.clone(),
                    error,
                    restored,
                });
            }
        }
    }

    Ok(report)
}

fn rollback(dir: &Path, moved: &[(usize, &RenameStep)], ops: &impl FileOps) -> Vec<String> {
    let mut unrestored = Vec::new();
    for (index, step) in moved.iter().rev() {
        let temp = dir.join(temp_name(*index, &step.from));
        if let Err(e) = ops.rename(&temp, &dir.join(&step.from)) {
            tracing::error!(file = %step.from, error = %e, "rollback failed");
            unrestored.push(step.from.clone());
        }
    }
    unrestored
}

fn validate_plan(dir: &Path, steps: &[RenameStep], active: &[&RenameStep]) -> Result<(), BulkRenameError> {
    let conflict = |reason: String| Err(BulkRenameError::PlanConflict { reason });

    let mut sources = HashSet::new();
    let mut targets = HashSet::new();
    for step in steps {
        for name in [&step.from, &step.to] {
            if !is_plain_name(name) {
                return conflict(format!("'{name}' is not a plain file name"));
            }
        }
        if !sources.insert(step.from.as_str()) {
            return conflict(format!("'{}' appears twice as a source", step.from));
        }
        if !targets.insert(step.to.as_str()) {
            return conflict(format!("'{}' is the target of two files", step.to));
        }
        if !dir.join(&step.from).is_file() {
            return conflict(format!("'{}' does not exist", step.from));
        }
    }

    for (index, step) in active.iter().enumerate() {
        if !sources.contains(step.to.as_str()) && dir.join(&step.to).exists() {
            return conflict(format!("'{}' already exists and is not part of the plan", step.to));
        }
        if dir.join(temp_name(index, &step.from)).exists() {
            return conflict(format!(
                "leftover temporary file for '{}'; run recovery first",
                step.from
            ));
        }
    }
    Ok(())
}

/// Result of putting temporary files back under their original names.
#[derive(Debug, Default)]
pub struct RecoveryReport {
    pub restored: Vec<String>,
    /// Temporary files whose original name is taken; left untouched.
    pub conflicts: Vec<String>,
}

/// Renames every `__TEMP_<n>__<original>` file in `dir` back to `<original>`.
pub fn recover_temporaries(dir: &Path) -> io::Result<RecoveryReport> {
    let mut report = RecoveryReport::default();
    let mut names: Vec<String> = fs::read_dir(dir)?
        .flatten()
        .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();

    for name in names {
        let Some(caps) = temp_pattern().captures(&name) else {
            continue;
        };
        let original = caps[1].to_string();
        let target = dir.join(&original);
        if target.exists() {
            report.conflicts.push(name);
            continue;
        }
        fs::rename(dir.join(&name), &target)?;
        tracing::info!(%original, "restored from temporary name");
        report.restored.push(original);
    }
    Ok(report)
}
