/// Integration tests for iconsort
///
/// These tests drive the command line end to end against a temporary
/// library root.
///
/// Test categories:
/// 1. Applying classified batches
/// 2. Keyword organize and dry runs
/// 3. In-place sorting and recovery
/// 4. Status and staging cleanup
use iconsort::cli::{Cli, RunStatus, run_cli};
use iconsort::domain::Domain;
use iconsort::mapping_store::MappingStore;
use iconsort::rename_engine::temp_name;
use clap::Parser;
use serde_json::Value;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

// ============================================================================
// Test Utilities
// ============================================================================

const PNG_HEADER: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// A temporary library root with an empty configuration file, so tests never
/// pick up a configuration from the environment.
struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let fixture = TestFixture { temp_dir };
        fixture.create_text_file("iconsort.toml", "");
        fixture
    }

    fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    fn create_file(&self, name: &str, content: &[u8]) {
        let file_path = self.path().join(name);
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        let mut file = File::create(&file_path).expect("Failed to create file");
        file.write_all(content).expect("Failed to write file content");
    }

    fn create_text_file(&self, name: &str, content: &str) {
        self.create_file(name, content.as_bytes());
    }

    fn create_icons(&self, names: &[&str]) {
        for name in names {
            self.create_file(name, PNG_HEADER);
        }
    }

    fn assert_file_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(path.is_file(), "File should exist: {}", path.display());
    }

    fn assert_file_not_exists(&self, rel_path: &str) {
        let path = self.path().join(rel_path);
        assert!(!path.exists(), "File should not exist: {}", path.display());
    }

    /// Sorted file names directly inside `rel_dir`.
    fn file_names(&self, rel_dir: &str) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.path().join(rel_dir))
            .expect("Failed to read directory")
            .flatten()
            .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    /// Runs the command line with `--root` and `--config` pointing at the fixture.
    fn run(&self, args: &[&str]) -> Result<RunStatus, String> {
        let root = self.path().to_string_lossy().to_string();
        let config = self.path().join("iconsort.toml").to_string_lossy().to_string();
        let mut argv = vec!["iconsort", "--root", root.as_str(), "--config", config.as_str()];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).expect("arguments should parse");
        run_cli(cli)
    }

    fn ledger(&self, domain: Domain) -> MappingStore {
        MappingStore::load(&self.path().join(domain.ledger_file_name()), domain).expect("ledger should load")
    }

    fn ledger_json(&self, domain: Domain) -> Value {
        let text = fs::read_to_string(self.path().join(domain.ledger_file_name())).expect("ledger should exist");
        serde_json::from_str(&text).expect("ledger should be JSON")
    }
}

// ============================================================================
// Category 1: Applying Classified Batches
// ============================================================================

#[test]
fn test_apply_files_icons_and_records_them() {
    let fixture = TestFixture::new();
    fixture.create_icons(&["unsorted/a1.png", "unsorted/a2.png", "unsorted/a3.png"]);
    fixture.create_text_file(
        "batch.json",
        r#"[
            {"original": "unsorted/a1.png", "name": "Healing Light", "category": "healing", "description": "Restores health"},
            {"original": "unsorted/a2.png", "name": "Healing Light", "category": "healing"},
            {"original": "unsorted/a3.png", "name": "Flame Strike", "category": "fire"}
        ]"#,
    );

    let status = fixture.run(&["apply", "batch.json"]).expect("apply should succeed");
    assert_eq!(status, RunStatus::Success);

    fixture.assert_file_exists("healing/healing-light.png");
    fixture.assert_file_exists("healing/healing-light_1.png");
    fixture.assert_file_exists("fire/flame-strike.png");
    fixture.assert_file_not_exists("unsorted/a1.png");

    let store = fixture.ledger(Domain::Abilities);
    assert_eq!(store.len(), 3);
    let first = store.get("unsorted/a1.png").expect("entry recorded");
    assert_eq!(first.new_path, "healing/healing-light.png");
    assert_eq!(first.description.as_deref(), Some("Restores health"));

    let json = fixture.ledger_json(Domain::Abilities);
    assert_eq!(json["abilities"].as_array().map(Vec::len), Some(3));
    assert_eq!(json["metadata"]["total_icons"], 3);
}

#[test]
fn test_apply_twice_is_idempotent() {
    let fixture = TestFixture::new();
    fixture.create_icons(&["unsorted/a1.png"]);
    fixture.create_text_file(
        "batch.json",
        r#"[{"original": "unsorted/a1.png", "name": "Frost Nova", "category": "ice"}]"#,
    );

    assert_eq!(fixture.run(&["apply", "batch.json"]), Ok(RunStatus::Success));
    assert_eq!(fixture.run(&["apply", "batch.json"]), Ok(RunStatus::Success));

    assert_eq!(fixture.file_names("ice"), vec!["frost-nova.png"]);
    assert_eq!(fixture.ledger(Domain::Abilities).len(), 1);
}

#[test]
fn test_apply_with_missing_source_is_partial() {
    let fixture = TestFixture::new();
    fixture.create_icons(&["unsorted/present.png"]);
    fixture.create_text_file(
        "batch.json",
        r#"[
            {"original": "unsorted/missing.png", "name": "Ghost", "category": "shadow"},
            {"original": "unsorted/present.png", "name": "Sun Ray", "category": "light"}
        ]"#,
    );

    assert_eq!(fixture.run(&["apply", "batch.json"]), Ok(RunStatus::Partial));

    fixture.assert_file_exists("light/sun-ray.png");
    let store = fixture.ledger(Domain::Abilities);
    assert_eq!(store.len(), 1);
    assert!(!store.is_processed("unsorted/missing.png"));
}

#[test]
fn test_apply_rejects_malformed_entries_but_files_the_rest() {
    let fixture = TestFixture::new();
    fixture.create_icons(&["unsorted/ore.png"]);
    fixture.create_text_file(
        "batch.json",
        r#"[
            {"name": "No Path"},
            {"original": "unsorted/ore.png", "name": "Copper Ore"}
        ]"#,
    );

    let status = fixture.run(&["--domain", "resources", "apply", "batch.json"]);
    assert_eq!(status, Ok(RunStatus::Partial));

    fixture.assert_file_exists("Misc/resource-copper-ore.png");
    let json = fixture.ledger_json(Domain::Resources);
    assert_eq!(json["resources"][0]["filename"], "resource-copper-ore.png");
}

#[test]
fn test_apply_invalid_batch_is_fatal() {
    let fixture = TestFixture::new();
    fixture.create_text_file("batch.json", r#"{"original": "a.png"}"#);

    assert!(fixture.run(&["apply", "batch.json"]).is_err());
    fixture.assert_file_not_exists("ability_mapping.json");
}

#[test]
fn test_apply_never_overwrites_existing_file() {
    let fixture = TestFixture::new();
    fixture.create_icons(&["unsorted/new.png"]);
    fixture.create_text_file("fire/fireball.png", "hand-placed icon");
    fixture.create_text_file(
        "batch.json",
        r#"[{"original": "unsorted/new.png", "name": "Fireball", "category": "fire"}]"#,
    );

    assert_eq!(fixture.run(&["apply", "batch.json"]), Ok(RunStatus::Success));

    assert_eq!(fixture.file_names("fire"), vec!["fireball.png", "fireball_1.png"]);
    let kept = fs::read_to_string(fixture.path().join("fire/fireball.png")).expect("file readable");
    assert_eq!(kept, "hand-placed icon");
}

// ============================================================================
// Category 2: Keyword Organize and Dry Runs
// ============================================================================

#[test]
fn test_organize_dry_run_changes_nothing() {
    let fixture = TestFixture::new();
    fixture.create_icons(&["unsorted/fireball.png", "unsorted/frost_nova.png"]);

    assert_eq!(fixture.run(&["organize", "--dry-run"]), Ok(RunStatus::Success));

    fixture.assert_file_exists("unsorted/fireball.png");
    fixture.assert_file_exists("unsorted/frost_nova.png");
    fixture.assert_file_not_exists("ability_mapping.json");
    assert!(!fixture.path().join("fire").exists());
}

#[test]
fn test_organize_files_by_keyword() {
    let fixture = TestFixture::new();
    fixture.create_icons(&["unsorted/fireball.png", "unsorted/frost_nova.png", "unsorted/banner.png"]);
    fixture.create_text_file("unsorted/readme.txt", "not an icon");

    assert_eq!(fixture.run(&["organize"]), Ok(RunStatus::Success));

    fixture.assert_file_exists("fire/fireball.png");
    fixture.assert_file_exists("ice/frost-nova.png");
    fixture.assert_file_exists("other/banner.png");
    fixture.assert_file_exists("unsorted/readme.txt");
    assert_eq!(fixture.ledger(Domain::Abilities).len(), 3);

    // Nothing left to do on a second run.
    assert_eq!(fixture.run(&["organize"]), Ok(RunStatus::Success));
    assert_eq!(fixture.ledger(Domain::Abilities).len(), 3);
}

#[test]
fn test_organize_uses_configured_rules() {
    let fixture = TestFixture::new();
    fixture.create_text_file(
        "iconsort.toml",
        r#"
fallback_category = "misc"

[[rules]]
category = "banners"
keywords = ["banner", "flag"]
"#,
    );
    fixture.create_icons(&["unsorted/war_banner.png", "unsorted/fireball.png"]);

    assert_eq!(fixture.run(&["organize"]), Ok(RunStatus::Success));

    fixture.assert_file_exists("banners/war-banner.png");
    fixture.assert_file_exists("misc/fireball.png");
}

// ============================================================================
// Category 3: In-place Sorting and Recovery
// ============================================================================

#[test]
fn test_sort_numbers_variants_in_order() {
    let fixture = TestFixture::new();
    fixture.create_icons(&[
        "fire/Fire Bolt 10.png",
        "fire/Fire Bolt 2.png",
        "fire/Fire Bolt.png",
        "fire/Ash.png",
    ]);

    assert_eq!(fixture.run(&["sort", "fire"]), Ok(RunStatus::Success));

    assert_eq!(
        fixture.file_names("fire"),
        vec!["001_Ash.png", "002_Fire Bolt.png", "003_Fire Bolt 2.png", "004_Fire Bolt 10.png"]
    );

    // Sorting again finds everything in place.
    assert_eq!(fixture.run(&["sort", "fire"]), Ok(RunStatus::Success));
    assert_eq!(fixture.file_names("fire").len(), 4);
    assert!(fixture.file_names("fire").iter().all(|n| !n.starts_with("__TEMP_")));
}

#[test]
fn test_sort_dry_run_changes_nothing() {
    let fixture = TestFixture::new();
    fixture.create_icons(&["mixed/b.png", "mixed/a.png"]);

    assert_eq!(fixture.run(&["sort", "mixed", "--dry-run"]), Ok(RunStatus::Success));
    assert_eq!(fixture.file_names("mixed"), vec!["a.png", "b.png"]);
}

#[test]
fn test_sort_by_theme_groups_before_names() {
    let fixture = TestFixture::new();
    fixture.create_icons(&["mixed/a_shield.png", "mixed/b_fire.png", "mixed/c_frost.png"]);

    assert_eq!(fixture.run(&["sort", "mixed", "--by-theme"]), Ok(RunStatus::Success));

    assert_eq!(
        fixture.file_names("mixed"),
        vec!["001_b_fire.png", "002_c_frost.png", "003_a_shield.png"]
    );
}

#[test]
fn test_sort_refuses_with_leftover_temporaries_until_recovered() {
    let fixture = TestFixture::new();
    fixture.create_icons(&["fire/b.png"]);
    let stranded = format!("fire/{}", temp_name(0, "a.png"));
    fixture.create_icons(&[stranded.as_str()]);

    assert!(fixture.run(&["sort", "fire"]).is_err());

    assert_eq!(fixture.run(&["recover", "fire"]), Ok(RunStatus::Success));
    assert_eq!(fixture.file_names("fire"), vec!["a.png", "b.png"]);

    assert_eq!(fixture.run(&["sort", "fire"]), Ok(RunStatus::Success));
    assert_eq!(fixture.file_names("fire"), vec!["001_a.png", "002_b.png"]);
}

#[test]
fn test_recover_leaves_conflicts_in_place() {
    let fixture = TestFixture::new();
    let stranded = format!("fire/{}", temp_name(3, "a.png"));
    fixture.create_icons(&["fire/a.png", stranded.as_str()]);

    assert_eq!(fixture.run(&["recover", "fire"]), Ok(RunStatus::Partial));
    fixture.assert_file_exists(&stranded);
}

// ============================================================================
// Category 4: Status and Staging Cleanup
// ============================================================================

#[test]
fn test_status_does_not_create_ledger() {
    let fixture = TestFixture::new();
    fixture.create_icons(&["unsorted/fireball.png"]);

    assert_eq!(fixture.run(&["status"]), Ok(RunStatus::Success));
    fixture.assert_file_not_exists("ability_mapping.json");
}

#[test]
fn test_cleanup_keeps_staging_with_files() {
    let fixture = TestFixture::new();
    fixture.create_icons(&["unsorted/fireball.png"]);

    assert_eq!(fixture.run(&["cleanup"]), Ok(RunStatus::Success));
    assert!(fixture.path().join("unsorted").is_dir());
}

#[test]
fn test_cleanup_removes_emptied_staging() {
    let fixture = TestFixture::new();
    fixture.create_icons(&["unsorted/fireball.png"]);

    assert_eq!(fixture.run(&["organize"]), Ok(RunStatus::Success));
    assert!(fixture.file_names("unsorted").is_empty());

    assert_eq!(fixture.run(&["cleanup"]), Ok(RunStatus::Success));
    assert!(!fixture.path().join("unsorted").exists());
}

#[test]
fn test_domains_keep_separate_ledgers() {
    let fixture = TestFixture::new();
    fixture.create_icons(&["unsorted/fireball.png", "incoming/iron_ore.png"]);

    assert_eq!(fixture.run(&["organize"]), Ok(RunStatus::Success));
    assert_eq!(
        fixture.run(&["--domain", "resources", "organize", "--staging", "incoming"]),
        Ok(RunStatus::Success)
    );

    fixture.assert_file_exists("fire/fireball.png");
    fixture.assert_file_exists("Blacksmithing/resource-iron-ore.png");
    assert_eq!(fixture.ledger(Domain::Abilities).len(), 1);
    assert_eq!(fixture.ledger(Domain::Resources).len(), 1);
}
