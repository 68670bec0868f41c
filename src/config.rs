//! Service configuration loaded from environment variables.

use std::path::PathBuf;

use crate::recommend::{ArtifactKind, ArtifactSpec, FacadeOptions};

pub const CLASSIFIER_ARTIFACT: &str = "category_classifier";
pub const RULES_ARTIFACT: &str = "association_rules";

pub const DEFAULT_CLASSIFIER_FILE: &str = "category_classifier.json";
pub const DEFAULT_RULES_FILE: &str = "association_rules.json";

/// Panel size on product pages when the caller does not ask for one.
pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 4;
pub const DEFAULT_MAX_RECOMMENDATIONS: usize = 20;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the trained artifacts (from AURORAMART_MODELS_DIR)
    pub models_dir: PathBuf,
    /// SQLite catalogue path (from AURORAMART_DB_PATH)
    pub database_path: PathBuf,
    /// Classifier file name inside `models_dir` (from AURORAMART_CLASSIFIER_FILE)
    pub classifier_file: String,
    /// Rule table file name inside `models_dir` (from AURORAMART_RULES_FILE)
    pub rules_file: String,
    pub default_limit: usize,
    /// Upper bound on any requested limit (from AURORAMART_MAX_RECOMMENDATIONS)
    pub max_limit: usize,
    /// From AURORAMART_EXCLUDE_OUT_OF_STOCK; defaults to true
    pub exclude_out_of_stock: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key lookup. Unset or unparsable values fall
    /// back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let models_dir = lookup("AURORAMART_MODELS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.models_dir);

        let database_path = lookup("AURORAMART_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.database_path);

        let classifier_file =
            lookup("AURORAMART_CLASSIFIER_FILE").unwrap_or(defaults.classifier_file);
        let rules_file = lookup("AURORAMART_RULES_FILE").unwrap_or(defaults.rules_file);

        let max_limit = lookup("AURORAMART_MAX_RECOMMENDATIONS")
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.max_limit);

        let exclude_out_of_stock = lookup("AURORAMART_EXCLUDE_OUT_OF_STOCK")
            .and_then(|s| parse_flag(&s))
            .unwrap_or(defaults.exclude_out_of_stock);

        Self {
            models_dir,
            database_path,
            classifier_file,
            rules_file,
            default_limit: defaults.default_limit.min(max_limit),
            max_limit,
            exclude_out_of_stock,
        }
    }

    pub fn with_models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.models_dir = dir.into();
        self
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn artifact_specs(&self) -> Vec<ArtifactSpec> {
        vec![
            ArtifactSpec::new(
                CLASSIFIER_ARTIFACT,
                self.classifier_file.clone(),
                ArtifactKind::Classifier,
            ),
            ArtifactSpec::new(RULES_ARTIFACT, self.rules_file.clone(), ArtifactKind::RuleTable),
        ]
    }

    pub fn facade_options(&self) -> FacadeOptions {
        FacadeOptions {
            exclude_out_of_stock: self.exclude_out_of_stock,
            max_limit: self.max_limit,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = directories::ProjectDirs::from("", "", "auroramart")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".auroramart"));

        Self {
            models_dir: data_dir.join("models"),
            database_path: data_dir.join("auroramart.db"),
            classifier_file: DEFAULT_CLASSIFIER_FILE.to_string(),
            rules_file: DEFAULT_RULES_FILE.to_string(),
            default_limit: DEFAULT_RECOMMENDATION_LIMIT,
            max_limit: DEFAULT_MAX_RECOMMENDATIONS,
            exclude_out_of_stock: true,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
