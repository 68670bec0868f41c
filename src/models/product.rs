use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single SKU that customers can browse and purchase.
///
/// The recommender never owns product data. It asks the catalogue for the
/// current stock and activity flags of candidate SKUs, and for rating data when
/// it has to fall back to the top-rated heuristic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub unit_price: f64,
    /// Average customer rating on a 1-5 scale, if the product has been rated.
    pub rating: Option<f64>,
    pub review_count: u32,
    pub quantity_on_hand: u32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn in_stock(&self) -> bool {
        self.quantity_on_hand > 0
    }

    /// Rating used for ranking; unrated products rank as zero.
    pub fn rating_or_zero(&self) -> f64 {
        self.rating.unwrap_or(0.0)
    }
}

/// Top-level merchandising category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub name: String,
    pub slug: String,
}

/// Current stock and activity flags of a product, as reported by the catalogue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Availability {
    pub is_active: bool,
    pub in_stock: bool,
}

impl Availability {
    pub fn is_purchasable(&self) -> bool {
        self.is_active && self.in_stock
    }
}

/// Input for creating or replacing a product, keyed by SKU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertProductInput {
    pub sku: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub unit_price: f64,
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: u32,
    #[serde(default)]
    pub quantity_on_hand: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}
