/// Keyword classification of icon filenames and labels.
///
/// A classifier holds an ordered list of rules. Each rule pairs a category
/// (the folder an icon is filed under) with a set of keywords, and the first
/// rule with any keyword occurring in the lower-cased input decides the
/// category. Rule order is significant: two rules may share keywords, and two
/// rules may even share a category label, in which case both groups are kept
/// and evaluated at their own positions.
///
/// # Examples
///
/// ```
/// use iconsort::classifier::{ClassificationRule, KeywordClassifier};
///
/// let classifier = KeywordClassifier::new(
///     vec![
///         ClassificationRule::new("Blacksmithing", &["ore", "ingot"]),
///         ClassificationRule::new("Herbs", &["herb", "petal"]),
///     ],
///     "Misc",
/// );
/// assert_eq!(classifier.classify("Iron_Ingot.png"), "Blacksmithing");
/// assert_eq!(classifier.classify("mystery.png"), "Misc");
/// ```
use serde::{Deserialize, Serialize};

/// A single `(category, keywords)` rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRule {
    /// Category assigned when this rule matches.
    pub category: String,
    /// Substrings looked up in the lower-cased input.
    pub keywords: Vec<String>,
}

impl ClassificationRule {
    pub fn new(category: &str, keywords: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k.as_str()))
    }
}

/// First-match-wins keyword classifier.
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    rules: Vec<ClassificationRule>,
    fallback: String,
}

impl KeywordClassifier {
    /// Builds a classifier from rules in evaluation order.
    ///
    /// Keywords are lower-cased. Empty keywords are dropped since they would
    /// match every input and shadow all later rules.
    pub fn new(rules: Vec<ClassificationRule>, fallback: &str) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| ClassificationRule {
                category: rule.category,
                keywords: rule
                    .keywords
                    .into_iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .collect();

        Self {
            rules,
            fallback: fallback.to_string(),
        }
    }

    /// Rules for sorting ability and status icons into theme folders.
    pub fn themed() -> Self {
        let rules = Theme::MATCH_ORDER
            .iter()
            .map(|theme| ClassificationRule::new(theme.name(), theme.keywords()))
            .collect();
        Self::new(rules, Theme::Other.name())
    }

    /// Rules for sorting crafting material icons into profession folders.
    pub fn profession_resources() -> Self {
        Self::new(
            vec![
                ClassificationRule::new(
                    "Blacksmithing",
                    &["ore", "ingot", "anvil", "hammer", "metal", "iron", "steel"],
                ),
                ClassificationRule::new(
                    "Jewelcrafting",
                    &["gem", "jewel", "ruby", "sapphire", "emerald", "diamond", "pearl"],
                ),
                ClassificationRule::new("Herbs", &["herb", "leaf", "flower", "petal", "bloom", "root"]),
                ClassificationRule::new("Leatherworking", &["leather", "hide", "pelt", "fur", "scale"]),
                ClassificationRule::new("Tailoring", &["cloth", "silk", "thread", "linen", "wool", "fabric"]),
                ClassificationRule::new("Alchemy", &["potion", "vial", "flask", "elixir", "reagent"]),
                ClassificationRule::new("Enchanting", &["dust", "essence", "shard", "crystal", "rune"]),
                ClassificationRule::new("Cooking", &["meat", "fish", "bread", "spice", "egg", "cheese"]),
                ClassificationRule::new("Woodworking", &["wood", "log", "plank", "bark", "timber"]),
            ],
            "Misc",
        )
    }

    /// Returns the category for a filename or label.
    pub fn classify(&self, input: &str) -> &str {
        self.matching_rule(input)
            .map(|rule| rule.category.as_str())
            .unwrap_or(&self.fallback)
    }

    /// Returns the first rule matching the input, if any.
    pub fn matching_rule(&self, input: &str) -> Option<&ClassificationRule> {
        let lowered = input.to_lowercase();
        self.rules.iter().find(|rule| rule.matches(&lowered))
    }

    pub fn rules(&self) -> &[ClassificationRule] {
        &self.rules
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Distinct category labels in first-declaration order, fallback last.
    pub fn categories(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for rule in &self.rules {
            if !seen.contains(&rule.category.as_str()) {
                seen.push(&rule.category);
            }
        }
        if !seen.contains(&self.fallback.as_str()) {
            seen.push(&self.fallback);
        }
        seen
    }
}

/// Display-only grouping used to order sort output.
///
/// Variant order is the sort order. A theme is never written to disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Theme {
    Fire,
    Shadow,
    Light,
    Ice,
    Lightning,
    Nature,
    Necrotic,
    Psychic,
    Healing,
    Movement,
    Defense,
    Attack,
    Other,
}

impl Theme {
    /// Keyword evaluation order. Lightning is tried before Light so that
    /// "lightning" does not fall into the Light bucket through "light".
    const MATCH_ORDER: [Theme; 12] = [
        Theme::Fire,
        Theme::Shadow,
        Theme::Lightning,
        Theme::Light,
        Theme::Ice,
        Theme::Nature,
        Theme::Necrotic,
        Theme::Psychic,
        Theme::Healing,
        Theme::Movement,
        Theme::Defense,
        Theme::Attack,
    ];

    /// Buckets a filename or label, falling back to `Theme::Other`.
    ///
    /// ```
    /// use iconsort::classifier::Theme;
    ///
    /// assert_eq!(Theme::of("flaming-sword.png"), Theme::Fire);
    /// assert_eq!(Theme::of("Dark Abyss 2.png"), Theme::Shadow);
    /// assert_eq!(Theme::of("banner.png"), Theme::Other);
    /// ```
    pub fn of(label: &str) -> Theme {
        let lowered = label.to_lowercase();
        Self::MATCH_ORDER
            .into_iter()
            .find(|theme| theme.keywords().iter().any(|k| lowered.contains(k)))
            .unwrap_or(Theme::Other)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Theme::Fire => "fire",
            Theme::Shadow => "shadow",
            Theme::Light => "light",
            Theme::Ice => "ice",
            Theme::Lightning => "lightning",
            Theme::Nature => "nature",
            Theme::Necrotic => "necrotic",
            Theme::Psychic => "psychic",
            Theme::Healing => "healing",
            Theme::Movement => "movement",
            Theme::Defense => "defense",
            Theme::Attack => "attack",
            Theme::Other => "other",
        }
    }

    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            Theme::Fire => &["fire", "flam", "burn", "blaze", "inferno", "ember", "lava", "magma", "scorch"],
            Theme::Shadow => &["shadow", "dark", "void", "abyss", "shade", "night"],
            Theme::Light => &["light", "holy", "radiant", "sun", "divine", "glow"],
            Theme::Ice => &["ice", "frost", "frozen", "snow", "cold", "glacier"],
            Theme::Lightning => &["lightning", "thunder", "storm", "shock", "spark", "electric"],
            Theme::Nature => &["nature", "vine", "thorn", "tree", "earth", "poison", "leaf"],
            Theme::Necrotic => &["necro", "death", "skull", "bone", "undead", "decay", "blood"],
            Theme::Psychic => &["psychic", "mind", "brain", "illusion", "arcane"],
            Theme::Healing => &["heal", "cure", "restor", "regen", "mend"],
            Theme::Movement => &["dash", "teleport", "blink", "sprint", "jump", "haste", "wing"],
            Theme::Defense => &["shield", "armor", "block", "ward", "barrier", "protect", "fortif"],
            Theme::Attack => &["sword", "blade", "strike", "slash", "axe", "arrow", "spear", "dagger", "attack"],
            Theme::Other => &[],
        }
    }
}
