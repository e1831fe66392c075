//! Filename normalization and variant-number parsing.
//!
//! [`FilenameGenerator`] turns a display name such as `"Healing Light"` into a
//! normalized `healing-light.png`, disambiguating against names already taken.
//! [`FileNode`] splits names such as `"Dark Abyss 2.png"` into a base name and
//! a variant number for ordering.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

const EXTENSION: &str = "png";

/// Builds collision-free `.png` filenames from display names.
#[derive(Debug, Clone, Default)]
pub struct FilenameGenerator {
    prefix: Option<String>,
}

impl FilenameGenerator {
    /// A generator that prepends `prefix` (for example `resource-`) to every
    /// name that does not already start with it.
    pub fn with_prefix(prefix: &str) -> Self {
        Self {
            prefix: Some(prefix.to_string()).filter(|p| !p.is_empty()),
        }
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Returns a filename for `display_name` that is not in `existing`.
    ///
    /// Collisions are resolved with `_1`, `_2`, ... before the extension. The
    /// result is not inserted into `existing`; callers sharing one set across
    /// several names should use [`FilenameGenerator::reserve`].
    ///
    /// ```
    /// use std::collections::HashSet;
    /// use iconsort::filename::FilenameGenerator;
    ///
    /// let existing: HashSet<String> = ["healing-light.png".to_string()].into();
    /// let name = FilenameGenerator::default().generate("Healing Light", "healing", &existing);
    /// assert_eq!(name, "healing-light_1.png");
    /// ```
    pub fn generate(&self, display_name: &str, category: &str, existing: &HashSet<String>) -> String {
        let stem = self.stem(display_name);
        let mut candidate = format!("{stem}.{EXTENSION}");
        let mut counter = 1u32;
        while existing.contains(&candidate) {
            candidate = format!("{stem}_{counter}.{EXTENSION}");
            counter += 1;
        }
        tracing::trace!(display_name, category, filename = %candidate, "generated filename");
        candidate
    }

    /// Generates a filename and inserts it into `existing`.
    pub fn reserve(&self, display_name: &str, category: &str, existing: &mut HashSet<String>) -> String {
        let filename = self.generate(display_name, category, existing);
        existing.insert(filename.clone());
        filename
    }

    fn stem(&self, display_name: &str) -> String {
        let slug = slugify(display_name);
        match &self.prefix {
            Some(prefix) if slug.starts_with(prefix.as_str()) => slug,
            Some(prefix) if slug.is_empty() => prefix.trim_end_matches('-').to_string(),
            Some(prefix) => format!("{prefix}{slug}"),
            None => slug,
        }
    }
}

/// Lower-cases, turns spaces and underscores into hyphens, drops every other
/// non-alphanumeric character and collapses hyphen runs.
pub fn slugify(display_name: &str) -> String {
    let mut slug = String::with_capacity(display_name.len());
    for ch in display_name.to_lowercase().chars() {
        let ch = if ch == ' ' || ch == '_' { '-' } else { ch };
        if !(ch.is_alphanumeric() || ch == '-') {
            continue;
        }
        if ch == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(ch);
    }
    slug.trim_matches('-').to_string()
}

fn variant_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+) ([1-9][0-9]*)$").expect("variant suffix regex is valid"))
}

/// Splits a name into its base and trailing variant number.
///
/// `"Dark Abyss 2"` becomes `("Dark Abyss", 2)`; a name without a trailing
/// space-separated positive integer comes back unchanged with `0`. A number
/// is only recognized when `format!("{base} {n}")` reproduces the input, so
/// zero-padded or zero suffixes are part of the base name.
pub fn extract_base_name_and_number(name: &str) -> (String, u32) {
    if let Some(caps) = variant_suffix().captures(name)
        && let Ok(number) = caps[2].parse::<u32>()
    {
        return (caps[1].to_string(), number);
    }
    (name.to_string(), 0)
}

/// A filename decomposed for in-place sorting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    pub file_name: String,
    pub base_name: String,
    pub variant_number: u32,
}

impl FileNode {
    /// Decomposes a filename; the extension is not part of the base name.
    pub fn new(file_name: &str) -> Self {
        let path = Path::new(file_name);
        let stem = match path.extension() {
            Some(_) => path
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| file_name.to_string()),
            None => file_name.to_string(),
        };
        let (base_name, variant_number) = extract_base_name_and_number(&stem);
        Self {
            file_name: file_name.to_string(),
            base_name,
            variant_number,
        }
    }

    /// Orders by base name (case-insensitive, then exact) and variant number,
    /// with the full filename as a final tie-break.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        self.base_name
            .to_lowercase()
            .cmp(&other.base_name.to_lowercase())
            .then_with(|| self.base_name.cmp(&other.base_name))
            .then_with(|| self.variant_number.cmp(&other.variant_number))
            .then_with(|| self.file_name.cmp(&other.file_name))
    }
}
