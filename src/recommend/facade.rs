use std::collections::HashSet;
use std::sync::Arc;

use super::catalogue::Catalogue;
use super::predictor::CategoryPredictor;
use super::rules::AssociationRuleRecommender;
use super::store::{ArtifactDescriptor, ArtifactStore};
use crate::config::{Config, CLASSIFIER_ARTIFACT, RULES_ARTIFACT};
use crate::models::{CategoryPrediction, RawAttributes, RecommendationResult};

/// Request-shaping knobs for the facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacadeOptions {
    /// Drop out-of-stock and inactive products from rule-based results.
    pub exclude_out_of_stock: bool,
    /// Requested limits above this are clamped.
    pub max_limit: usize,
}

impl Default for FacadeOptions {
    fn default() -> Self {
        Self {
            exclude_out_of_stock: true,
            max_limit: 20,
        }
    }
}

/// Single entry point for onboarding and product pages.
///
/// Every call returns a usable result tagged with the path that produced it;
/// nothing here fails from the caller's point of view.
#[derive(Clone)]
pub struct RecommendationFacade {
    store: Arc<ArtifactStore>,
    predictor: CategoryPredictor,
    recommender: AssociationRuleRecommender,
    catalogue: Arc<dyn Catalogue>,
    options: FacadeOptions,
}

impl RecommendationFacade {
    pub fn new(
        store: Arc<ArtifactStore>,
        catalogue: Arc<dyn Catalogue>,
        options: FacadeOptions,
    ) -> Self {
        Self {
            predictor: CategoryPredictor::new(store.clone(), CLASSIFIER_ARTIFACT),
            recommender: AssociationRuleRecommender::new(store.clone(), RULES_ARTIFACT),
            store,
            catalogue,
            options,
        }
    }

    pub fn from_config(config: &Config, catalogue: Arc<dyn Catalogue>) -> Self {
        let store = Arc::new(ArtifactStore::new(
            config.models_dir.clone(),
            config.artifact_specs(),
        ));
        Self::new(store, catalogue, config.facade_options())
    }

    pub fn predict_category(&self, raw: &RawAttributes) -> CategoryPrediction {
        let (classification, source) = self.predictor.predict(raw).into_parts();
        CategoryPrediction {
            category: classification.label,
            confidence: classification.confidence,
            source,
        }
    }

    pub fn recommend_for_product(&self, product_id: &str, limit: usize) -> RecommendationResult {
        let limit = self.clamp(limit);
        let (items, source) = self
            .recommender
            .recommend(
                product_id,
                self.options.exclude_out_of_stock,
                limit,
                self.catalogue.as_ref(),
            )
            .into_parts();

        RecommendationResult {
            query: vec![product_id.to_string()],
            items,
            source,
            limit,
        }
    }

    /// Recommendations for a whole basket or listing page. Blank and repeated
    /// ids are ignored.
    pub fn recommend_for_basket(&self, product_ids: &[String], limit: usize) -> RecommendationResult {
        let limit = self.clamp(limit);

        let mut seen = HashSet::new();
        let basket: Vec<&str> = product_ids
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty() && seen.insert(*id))
            .collect();

        let (items, source) = self
            .recommender
            .recommend_basket(
                &basket,
                self.options.exclude_out_of_stock,
                limit,
                self.catalogue.as_ref(),
            )
            .into_parts();

        RecommendationResult {
            query: basket.iter().map(|id| id.to_string()).collect(),
            items,
            source,
            limit,
        }
    }

    /// Load state of every registered artifact. Does not trigger loads.
    pub fn artifacts(&self) -> Vec<ArtifactDescriptor> {
        self.store.descriptors()
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    pub fn options(&self) -> &FacadeOptions {
        &self.options
    }

    fn clamp(&self, limit: usize) -> usize {
        limit.min(self.options.max_limit)
    }
}
