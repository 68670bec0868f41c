use std::collections::HashMap;

use anyhow::Result;

use crate::models::{Availability, Product};

/// The catalogue as seen by the recommender.
///
/// Stock levels and activity change independently of the mined rules, so the
/// recommender asks for them on every request instead of caching them.
pub trait Catalogue: Send + Sync {
    /// Current flags for each known id. Unknown ids are left out of the map.
    fn availability(&self, product_ids: &[&str]) -> Result<HashMap<String, Availability>>;

    fn category_of(&self, product_id: &str) -> Result<Option<String>>;

    /// Active products, optionally restricted to one category.
    fn active_products(&self, category: Option<&str>) -> Result<Vec<Product>>;
}
