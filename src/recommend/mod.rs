//! Category prediction and "frequently bought together" recommendations.
//!
//! Callers go through [`RecommendationFacade`]. Each request is answered by a
//! trained artifact when the [`ArtifactStore`] can hand one out, and by the
//! deterministic [`heuristics`] otherwise; the result always says which.
//!
//! Artifacts are adapted to two small capability traits, [`Classifier`] and
//! [`RuleSource`], so nothing downstream depends on the on-disk format.

pub mod catalogue;
pub mod classifier;
pub mod encoder;
pub mod error;
pub mod facade;
pub mod heuristics;
pub mod predictor;
pub mod rules;
pub mod store;

pub use catalogue::Catalogue;
pub use classifier::DecisionTree;
pub use encoder::{EncodingTable, FeatureEncoder, FeatureVector, FEATURE_NAMES};
pub use error::{ArtifactError, EncodingError, RecommendError};
pub use facade::{FacadeOptions, RecommendationFacade};
pub use predictor::CategoryPredictor;
pub use rules::{AssociationRuleRecommender, RuleTable};
pub use store::{
    ArtifactDescriptor, ArtifactKind, ArtifactLoader, ArtifactSpec, ArtifactStore, FileLoader,
    LoadState, LoadedArtifact,
};

use crate::models::{AssociationRule, Source};

/// A predicted label and its probability.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
}

/// Anything that can turn an encoded feature vector into a category.
pub trait Classifier: Send + Sync {
    /// The categorical code table the classifier was trained with.
    fn encoding(&self) -> &EncodingTable;

    /// Must be deterministic: the same vector always yields the same result.
    fn classify(&self, features: &FeatureVector) -> Classification;
}

/// Anything that can list the co-purchase rules of a product.
pub trait RuleSource: Send + Sync {
    fn lookup_rules(&self, product_id: &str) -> &[AssociationRule];

    fn rule_count(&self) -> usize;
}

/// Which path answered a request, decided once per call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    ModelBacked(T),
    HeuristicBacked(T),
}

impl<T> Outcome<T> {
    pub fn source(&self) -> Source {
        match self {
            Self::ModelBacked(_) => Source::Model,
            Self::HeuristicBacked(_) => Source::Heuristic,
        }
    }

    pub fn into_inner(self) -> T {
        match self {
            Self::ModelBacked(value) | Self::HeuristicBacked(value) => value,
        }
    }

    /// Split into the value and the source tag callers see.
    pub fn into_parts(self) -> (T, Source) {
        let source = self.source();
        (self.into_inner(), source)
    }
}
