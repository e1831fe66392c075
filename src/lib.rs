//! iconsort - classify, rename and file game icon images
//!
//! This library turns classified icon batches into a tidy library:
//! slug-based filenames grouped into category folders, an append-only JSON
//! ledger per domain recording every processed icon, and in-place numbering
//! of a folder through a two-phase rename that survives interruption.

pub mod batch;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod domain;
pub mod filename;
pub mod logging;
pub mod mapping_store;
pub mod output;
pub mod rename_engine;
pub mod scan;

pub use batch::{ClassificationResult, ParsedBatch, load_batch, parse_batch};
pub use classifier::{ClassificationRule, KeywordClassifier, Theme};
pub use config::{Config, ConfigError, ScanFilter};
pub use domain::Domain;
pub use filename::{FileNode, FilenameGenerator, extract_base_name_and_number};
pub use mapping_store::{MappingEntry, MappingStore, StoreError};
pub use rename_engine::{
    BatchReport, BulkRenameError, BulkRenameReport, EntryOutcome, FileOps, RenameEngine, RenameStep,
    StdFileOps, recover_temporaries, two_phase_rename,
};

pub use cli::{Cli, RunStatus, run_cli};
