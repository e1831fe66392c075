/// Persistent ledger of processed icon files.
///
/// Each domain keeps one JSON document under the library root:
///
/// ```json
/// {
///   "resources": [
///     {
///       "original_path": "unsorted/IMG_0042.png",
///       "filename": "resource-iron-ore.png",
///       "category": "Blacksmithing",
///       "name": "Iron Ore",
///       "description": "A lump of raw iron",
///       "new_path": "Blacksmithing/resource-iron-ore.png",
///       "processed_at": "2026-10-18T09:12:44Z"
///     }
///   ],
///   "metadata": { "created": "...", "last_updated": "...", "total_icons": 1 }
/// }
/// ```
///
/// The ledger is append-only. Any `original_path` it holds counts as handled
/// and is skipped by later runs, whether or not the file is still on disk.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;

use crate::domain::Domain;

/// One processed file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingEntry {
    /// Path relative to the library root at the time of processing.
    pub original_path: String,
    /// Generated filename inside the category folder.
    pub filename: String,
    pub category: String,
    /// Display name the filename was generated from.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `category/filename`.
    pub new_path: String,
    pub processed_at: DateTime<Utc>,
}

impl MappingEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(
        original_path: &str,
        filename: &str,
        category: &str,
        name: &str,
        description: Option<&str>,
    ) -> Self {
        Self {
            original_path: normalize_key(original_path),
            filename: filename.to_string(),
            category: category.to_string(),
            name: name.to_string(),
            description: description.map(str::to_string),
            new_path: format!("{category}/{filename}"),
            processed_at: Utc::now(),
        }
    }
}

/// Ledger bookkeeping stored next to the entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreMetadata {
    pub created: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub total_icons: usize,
}

impl StoreMetadata {
    fn fresh() -> Self {
        let now = Utc::now();
        Self {
            created: now,
            last_updated: now,
            total_icons: 0,
        }
    }
}

/// Errors raised while reading or writing a ledger.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read ledger {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write ledger {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid ledger format in {}: {reason}", .path.display())]
    InvalidFormat { path: PathBuf, reason: String },
    #[error("{original_path} is already recorded in the ledger")]
    DuplicateEntry { original_path: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// In-memory view of one domain's ledger.
#[derive(Debug)]
pub struct MappingStore {
    path: PathBuf,
    domain: Domain,
    entries: Vec<MappingEntry>,
    processed: HashSet<String>,
    metadata: StoreMetadata,
}

impl MappingStore {
    /// Opens the domain's ledger under `root`, writing an empty one first if
    /// none exists.
    pub fn load_or_create(root: &Path, domain: Domain) -> StoreResult<Self> {
        let path = root.join(domain.ledger_file_name());
        if path.exists() {
            return Self::load(&path, domain);
        }

        let mut store = Self::empty(path, domain);
        store.save()?;
        tracing::info!(path = %store.path.display(), "created empty ledger");
        Ok(store)
    }

    /// A ledger that has not been written to disk yet.
    pub fn empty(path: PathBuf, domain: Domain) -> Self {
        Self {
            path,
            domain,
            entries: Vec::new(),
            processed: HashSet::new(),
            metadata: StoreMetadata::fresh(),
        }
    }

    /// Reads an existing ledger file.
    pub fn load(path: &Path, domain: Domain) -> StoreResult<Self> {
        let invalid = |reason: String| StoreError::InvalidFormat {
            path: path.to_path_buf(),
            reason,
        };

        let text = fs::read_to_string(path).map_err(|e| StoreError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        let document: Value =
            serde_json::from_str(&text).map_err(|e| invalid(format!("JSON parse error: {e}")))?;

        let list = document[domain.list_key()]
            .as_array()
            .ok_or_else(|| invalid(format!("Missing or invalid '{}' field", domain.list_key())))?;

        let metadata = match document.get("metadata") {
            Some(value) => serde_json::from_value(value.clone())
                .map_err(|e| invalid(format!("Invalid 'metadata' field: {e}")))?,
            None => {
                tracing::warn!(path = %path.display(), "ledger has no metadata, starting fresh");
                StoreMetadata::fresh()
            }
        };

        let mut store = Self {
            path: path.to_path_buf(),
            domain,
            entries: Vec::with_capacity(list.len()),
            processed: HashSet::with_capacity(list.len()),
            metadata,
        };

        for (index, value) in list.iter().enumerate() {
            let entry: MappingEntry = serde_json::from_value(value.clone())
                .map_err(|e| invalid(format!("Invalid entry at index {index}: {e}")))?;
            if let Err(e) = store.append(entry) {
                tracing::warn!(path = %path.display(), "{e}, keeping the first record");
            }
        }

        tracing::debug!(path = %path.display(), entries = store.len(), "loaded ledger");
        Ok(store)
    }

    /// Writes the ledger through a temporary file in the same directory and
    /// renames it over the target.
    pub fn save(&mut self) -> StoreResult<()> {
        self.metadata.last_updated = Utc::now();
        self.metadata.total_icons = self.entries.len();

        let write_failed = |source: std::io::Error| StoreError::WriteFailed {
            path: self.path.clone(),
            source,
        };

        let document = json!({
            self.domain.list_key(): self.entries,
            "metadata": self.metadata,
        });
        let text = serde_json::to_string_pretty(&document).map_err(|e| {
            write_failed(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {e}"),
            ))
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(write_failed)?;
        tmp.write_all(text.as_bytes()).map_err(write_failed)?;
        tmp.as_file().sync_all().map_err(write_failed)?;
        tmp.persist(&self.path).map_err(|e| write_failed(e.error))?;

        tracing::debug!(path = %self.path.display(), entries = self.entries.len(), "saved ledger");
        Ok(())
    }

    /// Records a processed file. Fails if its original path is already known.
    pub fn append(&mut self, entry: MappingEntry) -> StoreResult<()> {
        let key = normalize_key(&entry.original_path);
        if !self.processed.insert(key.clone()) {
            return Err(StoreError::DuplicateEntry { original_path: key });
        }
        self.entries.push(MappingEntry {
            original_path: key,
            ..entry
        });
        Ok(())
    }

    pub fn is_processed(&self, original_path: &str) -> bool {
        self.processed.contains(&normalize_key(original_path))
    }

    pub fn get(&self, original_path: &str) -> Option<&MappingEntry> {
        let key = normalize_key(original_path);
        self.entries.iter().find(|e| e.original_path == key)
    }

    /// Every filename the ledger has handed out, across all categories.
    pub fn existing_filenames(&self) -> HashSet<String> {
        self.entries.iter().map(|e| e.filename.clone()).collect()
    }

    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entry in &self.entries {
            *counts.entry(entry.category.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn entries(&self) -> &[MappingEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn metadata(&self) -> &StoreMetadata {
        &self.metadata
    }
}

/// Ledger keys use forward slashes and no leading `./`.
pub fn normalize_key(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut key = path.as_str();
    while let Some(rest) = key.strip_prefix("./") {
        key = rest;
    }
    key.to_string()
}
