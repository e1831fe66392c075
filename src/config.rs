//! Configuration for the icon library.
//!
//! Settings are read from a TOML file and replace hard-coded directory
//! constants: the library root, the staging folder new icons land in, which
//! files a scan should ignore, and the ordered keyword rules.
//!
//! # Configuration File Format
//!
//! ```toml
//! fallback_category = "Misc"
//!
//! [library]
//! root = "public/assets/icons/resources"
//! staging_dir = "unsorted"
//! image_extensions = ["png", "jpg", "jpeg", "webp"]
//!
//! [filters]
//! enable_hidden_files = false
//!
//! [filters.exclude]
//! filenames = ["Thumbs.db"]
//! patterns = ["*_old.png"]
//! regex = ["^placeholder"]
//!
//! [filters.include]
//! patterns = []
//!
//! [[rules]]
//! category = "Blacksmithing"
//! keywords = ["ore", "ingot"]
//!
//! [[rules]]
//! category = "Herbs"
//! keywords = ["herb", "petal"]
//! ```
//!
//! `[[rules]]` is an array, so rule order survives parsing and two rules may
//! share a category.

use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::classifier::{ClassificationRule, KeywordClassifier};
use crate::domain::Domain;

/// Errors that can occur during configuration loading and filter compilation.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("Invalid glob pattern '{0}'")]
    InvalidGlobPattern(String),
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub library: LibrarySettings,
    pub filters: FilterRules,
    /// Overrides the domain's fallback category for configured rules.
    pub fallback_category: Option<String>,
    /// Keyword rules in evaluation order. Empty means the domain's built-in rules.
    pub rules: Vec<ClassificationRule>,
}

/// Where the icon tree lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrarySettings {
    /// Library root. The `--root` flag takes precedence.
    pub root: Option<PathBuf>,
    /// Folder below the root holding icons that still need processing.
    pub staging_dir: String,
    /// Extensions counted as images when content sniffing is inconclusive.
    pub image_extensions: Vec<String>,
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            root: None,
            staging_dir: "unsorted".to_string(),
            image_extensions: ["png", "jpg", "jpeg", "gif", "webp"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterRules {
    /// Whether to include hidden files (starting with "."). Defaults to false.
    #[serde(default)]
    pub enable_hidden_files: bool,
    #[serde(default)]
    pub exclude: ExcludeRules,
    /// Whitelist, checked before any exclusion.
    #[serde(default)]
    pub include: IncludeRules,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExcludeRules {
    #[serde(default)]
    pub filenames: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub regex: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncludeRules {
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Config {
    /// Load configuration from a file, with fallback to defaults.
    ///
    /// Lookup order:
    /// 1. `config_path`, if given
    /// 2. `.iconsortrc.toml` in the current directory
    /// 3. `~/.config/iconsort/config.toml`
    /// 4. built-in defaults
    ///
    /// # Errors
    ///
    /// Returns an error if a file is found (or explicitly given) but cannot be
    /// read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(".iconsortrc.toml");
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("iconsort")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        tracing::debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        tracing::debug!(path = %path.display(), "loading configuration");
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))
    }

    /// The library root: the command-line value, then the configured one,
    /// then the current directory.
    pub fn resolve_root(&self, cli_root: Option<&Path>) -> PathBuf {
        cli_root
            .map(Path::to_path_buf)
            .or_else(|| self.library.root.clone())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Keyword classifier for a domain: configured rules if any, otherwise
    /// the domain's built-in ones.
    pub fn classifier(&self, domain: Domain) -> KeywordClassifier {
        let fallback = self
            .fallback_category
            .as_deref()
            .unwrap_or(domain.fallback_category());

        if self.rules.is_empty() {
            let builtin = domain.default_classifier();
            return KeywordClassifier::new(builtin.rules().to_vec(), fallback);
        }
        KeywordClassifier::new(self.rules.clone(), fallback)
    }

    /// Compile the scan filters.
    ///
    /// # Errors
    ///
    /// Returns an error if any regex or glob pattern is invalid.
    pub fn scan_filter(&self) -> Result<ScanFilter, ConfigError> {
        ScanFilter::new(&self.filters, &self.library.image_extensions)
    }
}

fn compile_globs(patterns: &[String]) -> Result<Vec<Pattern>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| Pattern::new(pattern).map_err(|_| ConfigError::InvalidGlobPattern(pattern.clone())))
        .collect()
}

/// Compiled filter deciding which staged files a scan looks at.
#[derive(Debug, Clone)]
pub struct ScanFilter {
    enable_hidden_files: bool,
    exclude_filenames: HashSet<String>,
    exclude_patterns: Vec<Pattern>,
    exclude_regexes: Vec<Regex>,
    include_patterns: Vec<Pattern>,
    image_extensions: HashSet<String>,
}

impl Default for ScanFilter {
    fn default() -> Self {
        let library = LibrarySettings::default();
        Self {
            enable_hidden_files: false,
            exclude_filenames: HashSet::new(),
            exclude_patterns: Vec::new(),
            exclude_regexes: Vec::new(),
            include_patterns: Vec::new(),
            image_extensions: library.image_extensions.into_iter().collect(),
        }
    }
}

impl ScanFilter {
    fn new(rules: &FilterRules, image_extensions: &[String]) -> Result<Self, ConfigError> {
        let exclude_regexes = rules
            .exclude
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            enable_hidden_files: rules.enable_hidden_files,
            exclude_filenames: rules.exclude.filenames.iter().cloned().collect(),
            exclude_patterns: compile_globs(&rules.exclude.patterns)?,
            exclude_regexes,
            include_patterns: compile_globs(&rules.include.patterns)?,
            image_extensions: image_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
        })
    }

    /// Whether a file should be considered at all. Include patterns win,
    /// then hidden files, exact names, globs and regexes exclude.
    pub fn should_include(&self, file_path: &Path) -> bool {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();

        if self.include_patterns.iter().any(|p| p.matches_path(file_path)) {
            return true;
        }
        if !self.enable_hidden_files && file_name.starts_with('.') {
            return false;
        }
        if self.exclude_filenames.contains(file_name.as_ref()) {
            return false;
        }
        if self.exclude_patterns.iter().any(|p| p.matches_path(file_path)) {
            return false;
        }
        !self.exclude_regexes.iter().any(|r| r.is_match(&file_name))
    }

    /// Whether the extension is one of the configured image extensions.
    pub fn has_image_extension(&self, file_path: &Path) -> bool {
        file_path
            .extension()
            .map(|ext| self.image_extensions.contains(&ext.to_string_lossy().to_lowercase()))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter_from(toml: &str) -> ScanFilter {
        Config::parse(toml)
            .expect("config should parse")
            .scan_filter()
            .expect("filters should compile")
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(!config.filters.enable_hidden_files);
        assert_eq!(config.library.staging_dir, "unsorted");
        assert!(config.rules.is_empty());
        assert_eq!(config.resolve_root(None), PathBuf::from("."));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = Config::parse("").expect("empty config should parse");
        assert_eq!(config.library.staging_dir, "unsorted");
        assert!(config.library.image_extensions.contains(&"png".to_string()));
    }

    #[test]
    fn test_cli_root_overrides_configured_root() {
        let config = Config::parse("[library]\nroot = \"/icons\"").expect("parse failed");
        assert_eq!(config.resolve_root(None), PathBuf::from("/icons"));
        assert_eq!(config.resolve_root(Some(Path::new("/other"))), PathBuf::from("/other"));
    }

    #[test]
    fn test_rules_keep_order_and_duplicates() {
        let config = Config::parse(
            r#"
            fallback_category = "Leftovers"

            [[rules]]
            category = "Herbs"
            keywords = ["leaf"]

            [[rules]]
            category = "Alchemy"
            keywords = ["potion", "leaf"]

            [[rules]]
            category = "Herbs"
            keywords = ["flower"]
            "#,
        )
        .expect("parse failed");

        let classifier = config.classifier(Domain::Resources);
        let categories: Vec<&str> = classifier.rules().iter().map(|r| r.category.as_str()).collect();
        assert_eq!(categories, vec!["Herbs", "Alchemy", "Herbs"]);
        assert_eq!(classifier.classify("leaf-potion.png"), "Herbs");
        assert_eq!(classifier.classify("flower.png"), "Herbs");
        assert_eq!(classifier.classify("stone.png"), "Leftovers");
    }

    #[test]
    fn test_no_rules_uses_domain_defaults() {
        let classifier = Config::default().classifier(Domain::Abilities);
        assert_eq!(classifier.classify("flaming-sword.png"), "fire");
        assert_eq!(classifier.fallback(), "other");
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let result = Config::parse("[[rules]]\ncategory = 3");
        assert!(matches!(result, Err(ConfigError::ConfigInvalid(_))));
    }

    #[test]
    fn test_missing_explicit_file() {
        let result = Config::load(Some(Path::new("/non/existent/iconsort.toml")));
        assert!(matches!(result, Err(ConfigError::ConfigNotFound(_))));
    }

    #[test]
    fn test_hidden_files_excluded_by_default() {
        let filter = ScanFilter::default();
        assert!(!filter.should_include(Path::new(".DS_Store")));
        assert!(filter.should_include(Path::new("fire.png")));
    }

    #[test]
    fn test_exclusions() {
        let filter = filter_from(
            r#"
            [filters.exclude]
            filenames = ["Thumbs.db"]
            patterns = ["*_old.png"]
            regex = ["^placeholder"]
            "#,
        );

        assert!(!filter.should_include(Path::new("Thumbs.db")));
        assert!(!filter.should_include(Path::new("bolt_old.png")));
        assert!(!filter.should_include(Path::new("placeholder-3.png")));
        assert!(filter.should_include(Path::new("bolt.png")));
    }

    #[test]
    fn test_include_overrides_exclude() {
        let filter = filter_from(
            r#"
            [filters.exclude]
            patterns = ["*.png"]

            [filters.include]
            patterns = ["keep-*.png", ".important.png"]
            "#,
        );

        assert!(filter.should_include(Path::new("keep-me.png")));
        assert!(filter.should_include(Path::new(".important.png")));
        assert!(!filter.should_include(Path::new("drop-me.png")));
    }

    #[test]
    fn test_invalid_patterns_return_errors() {
        let bad_regex = Config::parse("[filters.exclude]\nregex = [\"[invalid(\"]").expect("parse failed");
        assert!(matches!(
            bad_regex.scan_filter(),
            Err(ConfigError::InvalidRegexPattern { .. })
        ));

        let bad_glob = Config::parse("[filters.exclude]\npatterns = [\"[invalid\"]").expect("parse failed");
        assert!(matches!(bad_glob.scan_filter(), Err(ConfigError::InvalidGlobPattern(_))));
    }

    #[test]
    fn test_image_extensions_are_case_insensitive() {
        let filter = filter_from("[library]\nimage_extensions = [\".PNG\", \"webp\"]");
        assert!(filter.has_image_extension(Path::new("a.png")));
        assert!(filter.has_image_extension(Path::new("b.WEBP")));
        assert!(!filter.has_image_extension(Path::new("c.jpg")));
        assert!(!filter.has_image_extension(Path::new("noext")));
    }
}
