use std::sync::Arc;

use super::encoder::FeatureEncoder;
use super::error::RecommendError;
use super::heuristics;
use super::store::ArtifactStore;
use super::{Classification, Outcome};
use crate::models::RawAttributes;

/// Predicts a shopper's preferred category from onboarding survey answers.
#[derive(Clone)]
pub struct CategoryPredictor {
    store: Arc<ArtifactStore>,
    artifact: String,
}

impl CategoryPredictor {
    pub fn new(store: Arc<ArtifactStore>, artifact: impl Into<String>) -> Self {
        Self {
            store,
            artifact: artifact.into(),
        }
    }

    /// Model-backed when the classifier is loaded and the answers encode;
    /// heuristic otherwise.
    pub fn predict(&self, raw: &RawAttributes) -> Outcome<Classification> {
        match self.predict_with_model(raw) {
            Ok(classification) => Outcome::ModelBacked(classification),
            Err(_) => Outcome::HeuristicBacked(heuristics::predict_category(raw)),
        }
    }

    fn predict_with_model(&self, raw: &RawAttributes) -> Result<Classification, RecommendError> {
        let classifier = self.store.classifier(&self.artifact)?;
        let features = FeatureEncoder::new(classifier.encoding()).encode(raw)?;
        Ok(classifier.classify(&features))
    }
}
