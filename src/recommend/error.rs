use std::path::PathBuf;

use thiserror::Error;

/// Why an artifact could not be handed out by the store.
///
/// Load failures are memoized, so the same error is returned on every access
/// until the slot is reset.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ArtifactError {
    #[error("artifact not found at {}", path.display())]
    Missing { path: PathBuf },

    #[error("artifact at {} is unusable: {reason}", path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("no artifact registered under '{0}'")]
    NotRegistered(String),
}

impl ArtifactError {
    pub fn corrupt(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self::Corrupt {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// A survey answer that cannot be mapped onto the classifier's feature vector.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EncodingError {
    #[error("missing required attribute '{0}'")]
    MissingAttribute(&'static str),

    #[error("unknown value '{value}' for '{feature}'")]
    UnknownCategory { feature: &'static str, value: String },

    #[error("value '{value}' for '{feature}' is out of range")]
    OutOfRange { feature: &'static str, value: String },

    #[error("'{feature}' must be {expected}")]
    InvalidType {
        feature: &'static str,
        expected: &'static str,
    },
}

/// Reasons a model-backed path gave up and handed over to the heuristics.
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error("feature encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    #[error("no usable association rules")]
    EmptyRuleSet,

    #[error("catalogue lookup failed: {0}")]
    Catalogue(#[from] anyhow::Error),
}
