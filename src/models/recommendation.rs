use serde::{Deserialize, Serialize};

use super::Source;

/// A recommended product and the score it was ranked by.
///
/// Model-backed scores are rule confidences; heuristic scores are average
/// ratings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredProduct {
    pub product_id: String,
    pub score: f64,
}

/// Ranked "frequently bought together" products for a product page or basket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationResult {
    /// The product ids the recommendations were requested for.
    pub query: Vec<String>,
    pub items: Vec<ScoredProduct>,
    pub source: Source,
    /// The effective limit after clamping; `items.len() <= limit`.
    pub limit: usize,
}

impl RecommendationResult {
    pub fn product_ids(&self) -> Vec<&str> {
        self.items.iter().map(|p| p.product_id.as_str()).collect()
    }
}

/// Input for basket recommendations on listing pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasketRecommendationInput {
    pub product_ids: Vec<String>,
    pub limit: Option<usize>,
}
