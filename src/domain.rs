//! Icon domains. Each domain owns one ledger file under the library root.

use clap::ValueEnum;

use crate::classifier::KeywordClassifier;
use crate::filename::FilenameGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Domain {
    /// Spell and ability icons.
    Abilities,
    /// Buff, debuff and condition icons.
    Statuses,
    /// Crafting material icons.
    Resources,
}

impl Domain {
    /// Name of the ledger file, relative to the library root.
    pub fn ledger_file_name(&self) -> &'static str {
        match self {
            Domain::Abilities => "ability_mapping.json",
            Domain::Statuses => "status_effect_mapping.json",
            Domain::Resources => "profession_resource_mapping.json",
        }
    }

    /// Key of the entry list in the ledger document.
    pub fn list_key(&self) -> &'static str {
        match self {
            Domain::Abilities => "abilities",
            Domain::Statuses => "statuses",
            Domain::Resources => "resources",
        }
    }

    pub fn filename_prefix(&self) -> Option<&'static str> {
        match self {
            Domain::Resources => Some("resource-"),
            Domain::Abilities | Domain::Statuses => None,
        }
    }

    /// Category used when a batch entry names none.
    pub fn fallback_category(&self) -> &'static str {
        match self {
            Domain::Resources => "Misc",
            Domain::Abilities | Domain::Statuses => "other",
        }
    }

    pub fn filename_generator(&self) -> FilenameGenerator {
        match self.filename_prefix() {
            Some(prefix) => FilenameGenerator::with_prefix(prefix),
            None => FilenameGenerator::default(),
        }
    }

    /// Built-in keyword rules, used when the configuration defines none.
    pub fn default_classifier(&self) -> KeywordClassifier {
        match self {
            Domain::Resources => KeywordClassifier::profession_resources(),
            Domain::Abilities | Domain::Statuses => KeywordClassifier::themed(),
        }
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.list_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_files_are_distinct() {
        let files = [
            Domain::Abilities.ledger_file_name(),
            Domain::Statuses.ledger_file_name(),
            Domain::Resources.ledger_file_name(),
        ];
        assert_ne!(files[0], files[1]);
        assert_ne!(files[1], files[2]);
        assert_ne!(files[0], files[2]);
    }

    #[test]
    fn test_resources_use_prefix() {
        let generator = Domain::Resources.filename_generator();
        assert_eq!(generator.prefix(), Some("resource-"));
        assert_eq!(Domain::Abilities.filename_generator().prefix(), None);
    }

    #[test]
    fn test_default_classifier_fallback_matches_domain() {
        for domain in [Domain::Abilities, Domain::Statuses, Domain::Resources] {
            assert_eq!(domain.default_classifier().fallback(), domain.fallback_category());
        }
    }
}
