//! Declarative rule tables
//!
//! Keyword lists, exact-match labels, special labels and the subscription
//! lookup tables all live in `config/rules.toml`. Users can override the
//! embedded defaults by placing a file at
//! `~/.local/share/quo/config/rules.toml` or passing an explicit path.
//!
//! Tables keep declaration order; the classifier and the subscription
//! category matcher are first-match-wins.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::SuperCategory;

/// Rule tables shipped with the binary
pub const DEFAULT_RULES: &str = include_str!("../../../config/rules.toml");

/// Keyword and exact-match rules for one super-category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperCategoryRule {
    pub category: SuperCategory,
    /// Lowercase substrings matched against the lowercased label
    pub keywords: Vec<String>,
    /// Provider labels matched exactly (case-sensitive)
    pub exact_matches: Vec<String>,
}

/// Description fragment that identifies a well-known subscription service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnownService {
    pub fragment: String,
    pub category: String,
}

/// Keywords that map a recurring charge onto a subscription category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionCategoryRule {
    pub category: String,
    pub keywords: Vec<String>,
}

/// All rule tables used by the analyzers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleBook {
    pub super_categories: Vec<SuperCategoryRule>,
    pub special_labels: Vec<String>,
    pub broad_labels: Vec<String>,
    pub stop_words: Vec<String>,
    pub subscription_keywords: Vec<String>,
    pub known_services: Vec<KnownService>,
    pub category_keywords: Vec<SubscriptionCategoryRule>,
}

/// Where a loaded rule book came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesSource {
    /// Path passed explicitly by the caller
    Override(PathBuf),
    /// File found in the platform data directory
    DataDir(PathBuf),
    /// Tables compiled into the binary
    Embedded,
}

impl std::fmt::Display for RulesSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Override(path) => write!(f, "{} (override)", path.display()),
            Self::DataDir(path) => write!(f, "{} (data directory)", path.display()),
            Self::Embedded => write!(f, "built-in rules"),
        }
    }
}

static BUILTIN: OnceLock<RuleBook> = OnceLock::new();

impl RuleBook {
    /// Process-wide rule book parsed once from the embedded tables
    pub fn builtin() -> &'static RuleBook {
        BUILTIN.get_or_init(|| {
            parse_rules(DEFAULT_RULES, RuleBook::default())
                .expect("embedded rules.toml is valid")
        })
    }

    /// Parse a rules file layered over the built-in tables.
    ///
    /// Sections present in `content` replace the built-in section wholesale;
    /// absent sections keep the defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_rules(content, Self::builtin().clone())
    }

    /// Load rules from an explicit path, the data directory, or the built-ins
    pub fn load(override_path: Option<&Path>) -> Result<Self> {
        Self::resolve(override_path).map(|(rules, _)| rules)
    }

    /// Like [`RuleBook::load`], also reporting which source won
    pub fn resolve(override_path: Option<&Path>) -> Result<(Self, RulesSource)> {
        if let Some(path) = override_path {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "Rules file not found: {}",
                    path.display()
                )));
            }
            let rules = Self::from_file(path)?;
            return Ok((rules, RulesSource::Override(path.to_path_buf())));
        }

        if let Some(path) = default_rules_path() {
            if path.exists() {
                let rules = Self::from_file(&path)?;
                return Ok((rules, RulesSource::DataDir(path)));
            }
        }

        Ok((Self::builtin().clone(), RulesSource::Embedded))
    }

    fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading rules from {}", path.display());
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// True when `label` means "no useful category" (case-insensitive)
    pub fn is_special_label(&self, label: &str) -> bool {
        let label = label.trim().to_lowercase();
        self.special_labels.iter().any(|s| *s == label)
    }

    /// True when `label` is broad enough for a sub-breakdown
    pub fn is_broad_label(&self, label: &str) -> bool {
        let label = label.trim().to_lowercase();
        self.broad_labels.iter().any(|s| *s == label)
    }

    pub fn is_stop_word(&self, token: &str) -> bool {
        self.stop_words.iter().any(|s| s == token)
    }
}

/// Default override location: `<data_local_dir>/quo/config/rules.toml`
pub fn default_rules_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("quo").join("config").join("rules.toml"))
}

/// Raw rules structure for TOML parsing
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawRules {
    special_labels: Option<Vec<String>>,
    broad_labels: Option<Vec<String>>,
    stop_words: Option<Vec<String>>,
    super_category: Option<Vec<RawSuperCategory>>,
    subscriptions: Option<RawSubscriptions>,
}

#[derive(Debug, Deserialize)]
struct RawSuperCategory {
    name: String,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    exact_matches: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawSubscriptions {
    keywords: Option<Vec<String>>,
    known_service: Option<Vec<RawKnownService>>,
    category: Option<Vec<RawSubscriptionCategory>>,
}

#[derive(Debug, Deserialize)]
struct RawKnownService {
    fragment: String,
    category: String,
}

#[derive(Debug, Deserialize)]
struct RawSubscriptionCategory {
    name: String,
    #[serde(default)]
    keywords: Vec<String>,
}

fn lowercase_all(words: Vec<String>) -> Vec<String> {
    words
        .into_iter()
        .map(|w| w.trim().to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Parse TOML content and apply it over `rules`
fn parse_rules(content: &str, mut rules: RuleBook) -> Result<RuleBook> {
    let raw: RawRules = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid rules TOML: {}", e)))?;

    if let Some(labels) = raw.special_labels {
        rules.special_labels = lowercase_all(labels);
    }
    if let Some(labels) = raw.broad_labels {
        rules.broad_labels = lowercase_all(labels);
    }
    if let Some(words) = raw.stop_words {
        rules.stop_words = lowercase_all(words);
    }

    if let Some(groups) = raw.super_category {
        let mut parsed = Vec::with_capacity(groups.len());
        for group in groups {
            let category: SuperCategory = group.name.parse().map_err(Error::Config)?;
            if matches!(
                category,
                SuperCategory::OtherServices | SuperCategory::Uncategorized
            ) {
                return Err(Error::Config(format!(
                    "'{}' is assigned by fallback and cannot carry rules",
                    category
                )));
            }
            parsed.push(SuperCategoryRule {
                category,
                keywords: lowercase_all(group.keywords),
                exact_matches: group.exact_matches,
            });
        }
        rules.super_categories = parsed;
    }

    if let Some(subs) = raw.subscriptions {
        if let Some(keywords) = subs.keywords {
            rules.subscription_keywords = lowercase_all(keywords);
        }
        if let Some(services) = subs.known_service {
            rules.known_services = services
                .into_iter()
                .map(|s| KnownService {
                    fragment: s.fragment.trim().to_lowercase(),
                    category: s.category,
                })
                .collect();
        }
        if let Some(categories) = subs.category {
            rules.category_keywords = categories
                .into_iter()
                .map(|c| SubscriptionCategoryRule {
                    category: c.name,
                    keywords: lowercase_all(c.keywords),
                })
                .collect();
        }
    }

    debug!(
        "Parsed rules: {} super-categories, {} known services",
        rules.super_categories.len(),
        rules.known_services.len()
    );

    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_builtin_rules_parse() {
        let rules = RuleBook::builtin();
        assert_eq!(rules.super_categories.len(), 9);
        assert_eq!(
            rules.super_categories[0].category,
            SuperCategory::HealthWellness
        );
        assert_eq!(rules.super_categories[8].category, SuperCategory::HomeLiving);
        assert_eq!(rules.known_services.len(), 18);
        assert_eq!(rules.known_services[0].fragment, "spotify");
        assert_eq!(rules.category_keywords.len(), 12);
        assert!(rules.is_special_label("No Category"));
        assert!(rules.is_special_label("  UNKNOWN "));
        assert!(!rules.is_broad_label("no category"));
        assert!(rules.is_broad_label("Non-Depository Financing"));
    }

    #[test]
    fn test_override_replaces_only_given_sections() {
        let rules = RuleBook::from_toml(
            r#"
special_labels = ["Misc"]

[[super_category]]
name = "Food & Dining"
keywords = ["Pizza"]
exact_matches = ["Pizza Shops"]
"#,
        )
        .unwrap();

        assert_eq!(rules.special_labels, vec!["misc"]);
        assert_eq!(rules.super_categories.len(), 1);
        assert_eq!(rules.super_categories[0].keywords, vec!["pizza"]);
        // Untouched sections come from the built-ins
        assert_eq!(rules.known_services.len(), 18);
        assert!(!rules.stop_words.is_empty());
    }

    #[test]
    fn test_unknown_category_is_config_error() {
        let result = RuleBook::from_toml(
            r#"
[[super_category]]
name = "Pets"
keywords = ["vet"]
"#,
        );
        assert!(matches!(result, Err(Error::Config(_))));

        let result = RuleBook::from_toml(
            r#"
[[super_category]]
name = "Other Services"
keywords = ["misc"]
"#,
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            RuleBook::from_toml("special_labels = ["),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            RuleBook::from_toml("surprise = 1"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_resolve_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "stop_words = [\"zzz\"]").unwrap();

        let (rules, source) = RuleBook::resolve(Some(file.path())).unwrap();
        assert_eq!(rules.stop_words, vec!["zzz"]);
        assert_eq!(source, RulesSource::Override(file.path().to_path_buf()));
    }

    #[test]
    fn test_resolve_missing_explicit_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            RuleBook::load(Some(&missing)),
            Err(Error::Config(_))
        ));
    }
}
