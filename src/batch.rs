//! Batch input produced by a person or an external classifier.
//!
//! The input is a JSON array. Each object needs `original` or `original_path`;
//! `name` defaults to `"unknown"`, `category` to the domain fallback and
//! `description` is optional. Objects that cannot be used are reported back
//! instead of failing the whole batch.

use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// One classified file to apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    /// Path relative to the library root.
    pub original_path: String,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
}

impl ClassificationResult {
    pub fn new(original_path: &str, name: &str, category: &str) -> Self {
        Self {
            original_path: original_path.to_string(),
            name: name.to_string(),
            category: category.to_string(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(alias = "original")]
    original_path: Option<String>,
    name: Option<String>,
    category: Option<String>,
    description: Option<String>,
}

/// An input object that was left out of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedEntry {
    pub index: usize,
    pub reason: String,
}

/// Usable entries in input order plus the rejected ones.
#[derive(Debug, Default)]
pub struct ParsedBatch {
    pub entries: Vec<ClassificationResult>,
    pub rejected: Vec<RejectedEntry>,
}

#[derive(Debug, Error)]
pub enum BatchInputError {
    #[error("Failed to read batch file {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Batch input is not a JSON array of objects: {reason}")]
    InvalidFormat { reason: String },
}

/// Reads a batch file from disk.
pub fn load_batch(path: &Path, fallback_category: &str) -> Result<ParsedBatch, BatchInputError> {
    let text = fs::read_to_string(path).map_err(|e| BatchInputError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_batch(&text, fallback_category)
}

/// Parses batch JSON text.
pub fn parse_batch(text: &str, fallback_category: &str) -> Result<ParsedBatch, BatchInputError> {
    let document: Value = serde_json::from_str(text).map_err(|e| BatchInputError::InvalidFormat {
        reason: e.to_string(),
    })?;
    let items = document.as_array().ok_or_else(|| BatchInputError::InvalidFormat {
        reason: "top-level value is not an array".to_string(),
    })?;

    let mut batch = ParsedBatch::default();
    for (index, item) in items.iter().enumerate() {
        match to_result(item, fallback_category) {
            Ok(entry) => batch.entries.push(entry),
            Err(reason) => {
                tracing::warn!(index, %reason, "rejected batch entry");
                batch.rejected.push(RejectedEntry { index, reason });
            }
        }
    }
    Ok(batch)
}

fn to_result(item: &Value, fallback_category: &str) -> Result<ClassificationResult, String> {
    let raw: RawEntry = serde_json::from_value(item.clone()).map_err(|e| e.to_string())?;

    let original_path = raw
        .original_path
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or_else(|| "missing 'original' or 'original_path'".to_string())?;

    let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

    Ok(ClassificationResult {
        original_path,
        name: non_blank(raw.name).unwrap_or_else(|| "unknown".to_string()),
        category: non_blank(raw.category).unwrap_or_else(|| fallback_category.to_string()),
        description: non_blank(raw.description),
    })
}
