//! Directory scans feeding the rename engine.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::batch::ClassificationResult;
use crate::classifier::{KeywordClassifier, Theme};
use crate::config::ScanFilter;
use crate::filename::FileNode;
use crate::mapping_store::{MappingStore, normalize_key};
use crate::rename_engine::RenameStep;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Error reading directory {}: {source}", .path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to remove directory {}: {source}", .path.display())]
    RemoveDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{count} temporary file(s) from an interrupted rename in {}; run recover first", .path.display())]
    PendingRecovery { path: PathBuf, count: usize },
}

/// An image file found in a scanned folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Path relative to the library root, as stored in the ledger.
    pub relative_path: String,
    pub path: PathBuf,
    pub file_name: String,
}

fn read_file_names(dir: &Path) -> Result<Vec<String>, ScanError> {
    let entries = fs::read_dir(dir).map_err(|e| ScanError::ReadDir {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut names: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    Ok(names)
}

/// Images are recognized by content; files `infer` cannot identify fall back
/// to the configured extensions.
fn is_image(path: &Path, filter: &ScanFilter) -> bool {
    match infer::get_from_path(path) {
        Ok(Some(kind)) => kind.matcher_type() == infer::MatcherType::Image,
        _ => filter.has_image_extension(path),
    }
}

fn is_temporary(file_name: &str) -> bool {
    file_name.starts_with("__TEMP_")
}

fn image_names(dir: &Path, filter: &ScanFilter) -> Result<Vec<String>, ScanError> {
    Ok(read_file_names(dir)?
        .into_iter()
        .filter(|name| !is_temporary(name))
        .filter(|name| filter.should_include(Path::new(name)))
        .filter(|name| is_image(&dir.join(name), filter))
        .collect())
}

/// Images in `root/staging_dir` (not recursive) that the ledger has not seen,
/// sorted by name.
pub fn unprocessed_images(
    root: &Path,
    staging_dir: &str,
    store: &MappingStore,
    filter: &ScanFilter,
) -> Result<Vec<StagedFile>, ScanError> {
    let dir = root.join(staging_dir);
    let files = image_names(&dir, filter)?
        .into_iter()
        .map(|file_name| StagedFile {
            relative_path: normalize_key(&format!("{staging_dir}/{file_name}")),
            path: dir.join(&file_name),
            file_name,
        })
        .filter(|file| !store.is_processed(&file.relative_path))
        .collect::<Vec<_>>();

    tracing::debug!(dir = %dir.display(), count = files.len(), "found unprocessed images");
    Ok(files)
}

/// Classifies staged files by filename so they can go through the same
/// rename engine as externally classified batches.
pub fn keyword_batch(files: &[StagedFile], classifier: &KeywordClassifier) -> Vec<ClassificationResult> {
    files
        .iter()
        .map(|file| {
            let stem = Path::new(&file.file_name)
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| file.file_name.clone());
            let category = classifier.classify(&file.file_name);
            ClassificationResult::new(&file.relative_path, &stem, category)
        })
        .collect()
}

/// Removes a leading `NNN_` index written by an earlier sort.
fn strip_sort_index(file_name: &str) -> &str {
    let digits = file_name.bytes().take_while(u8::is_ascii_digit).count();
    if digits >= 3 && file_name.as_bytes().get(digits) == Some(&b'_') && file_name.len() > digits + 1 {
        &file_name[digits + 1..]
    } else {
        file_name
    }
}

/// Builds the in-place sort of `dir`: every image gets an `NNN_` index in
/// (theme, base name, variant number) order.
///
/// Any index from a previous sort is dropped before ordering, so sorting an
/// already sorted folder yields an empty set of effective renames.
pub fn sort_plan(dir: &Path, filter: &ScanFilter, by_theme: bool) -> Result<Vec<RenameStep>, ScanError> {
    let leftovers = read_file_names(dir)?.iter().filter(|n| is_temporary(n)).count();
    if leftovers > 0 {
        return Err(ScanError::PendingRecovery {
            path: dir.to_path_buf(),
            count: leftovers,
        });
    }

    let mut nodes: Vec<(Theme, String, FileNode)> = image_names(dir, filter)?
        .into_iter()
        .map(|name| {
            let node = FileNode::new(strip_sort_index(&name));
            let theme = if by_theme { Theme::of(&node.file_name) } else { Theme::Other };
            (theme, name, node)
        })
        .collect();

    nodes.sort_by(|(theme_a, _, a), (theme_b, _, b)| match theme_a.cmp(theme_b) {
        Ordering::Equal => a.sort_cmp(b),
        other => other,
    });

    let width = nodes.len().to_string().len().max(3);
    Ok(nodes
        .into_iter()
        .enumerate()
        .map(|(index, (_, current, node))| {
            RenameStep::new(&current, &format!("{:0width$}_{}", index + 1, node.file_name))
        })
        .collect())
}

/// What [`cleanup_staging`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupOutcome {
    Removed,
    /// The folder still holds files and was left in place.
    Kept {
        /// Files the ledger does not know about.
        unprocessed: usize,
        /// Files the ledger lists as processed but that are still here.
        stale: usize,
    },
    Missing,
}

/// Removes the staging folder once no file is left in it.
pub fn cleanup_staging(
    root: &Path,
    staging_dir: &str,
    store: &MappingStore,
) -> Result<CleanupOutcome, ScanError> {
    let dir = root.join(staging_dir);
    if !dir.is_dir() {
        return Ok(CleanupOutcome::Missing);
    }

    let names = read_file_names(&dir)?;
    let stale = names
        .iter()
        .filter(|name| store.is_processed(&normalize_key(&format!("{staging_dir}/{name}"))))
        .count();
    let unprocessed = names.len() - stale;

    if !names.is_empty() {
        tracing::info!(dir = %dir.display(), unprocessed, stale, "staging folder kept");
        return Ok(CleanupOutcome::Kept { unprocessed, stale });
    }

    // remove_dir refuses non-empty folders, so nested content is never lost.
    fs::remove_dir(&dir).map_err(|e| ScanError::RemoveDir {
        path: dir.clone(),
        source: e,
    })?;
    tracing::info!(dir = %dir.display(), "staging folder removed");
    Ok(CleanupOutcome::Removed)
}
