//! Artifact-free fallbacks. Pure, deterministic and infallible.

use std::cmp::Ordering;

use super::encoder;
use super::Classification;
use crate::models::{Product, RawAttributes, ScoredProduct};

pub const DEFAULT_CATEGORY: &str = "Home & Kitchen";

/// Heuristic predictions carry no probability.
pub const HEURISTIC_CONFIDENCE: f64 = 0.0;

/// Every label the category heuristic can return.
pub const HEURISTIC_CATEGORIES: [&str; 6] = [
    "Beauty & Personal Care",
    "Electronics",
    "Groceries & Gourmet",
    "Home & Kitchen",
    "Sports & Outdoors",
    "Toys & Games",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HouseholdBucket {
    Single,
    Couple,
    Family,
}

impl HouseholdBucket {
    pub fn from_size(size: u32) -> Self {
        match size {
            0 | 1 => Self::Single,
            2 => Self::Couple,
            _ => Self::Family,
        }
    }
}

/// Income bracket × household bucket → default category.
const CATEGORY_TABLE: [(&str, HouseholdBucket, &str); 9] = [
    ("low", HouseholdBucket::Single, "Groceries & Gourmet"),
    ("low", HouseholdBucket::Couple, "Groceries & Gourmet"),
    ("low", HouseholdBucket::Family, "Toys & Games"),
    ("medium", HouseholdBucket::Single, "Electronics"),
    ("medium", HouseholdBucket::Couple, "Home & Kitchen"),
    ("medium", HouseholdBucket::Family, "Toys & Games"),
    ("high", HouseholdBucket::Single, "Electronics"),
    ("high", HouseholdBucket::Couple, "Home & Kitchen"),
    ("high", HouseholdBucket::Family, "Sports & Outdoors"),
];

pub fn category_for(income: &str, household: HouseholdBucket) -> Option<&'static str> {
    CATEGORY_TABLE
        .iter()
        .find(|(bracket, bucket, _)| *bracket == income && *bucket == household)
        .map(|(_, _, category)| *category)
}

/// Predict a category from whatever survey answers are usable.
///
/// Income × household decides when both are readable; otherwise gender; otherwise
/// [`DEFAULT_CATEGORY`].
pub fn predict_category(raw: &RawAttributes) -> Classification {
    let income = encoder::categorical_label("income", raw).ok().flatten();
    let household = encoder::household_size(raw).ok().map(HouseholdBucket::from_size);

    let by_bucket = income
        .zip(household)
        .and_then(|(income, household)| category_for(&income, household));

    let label = by_bucket.unwrap_or_else(|| {
        match encoder::categorical_label("gender", raw).ok().flatten().as_deref() {
            Some("f") => "Beauty & Personal Care",
            Some("m") => "Electronics",
            _ => DEFAULT_CATEGORY,
        }
    });

    Classification {
        label: label.to_string(),
        confidence: HEURISTIC_CONFIDENCE,
    }
}

/// Rating desc, review count desc, SKU asc.
pub fn rating_order(a: &Product, b: &Product) -> Ordering {
    b.rating_or_zero()
        .total_cmp(&a.rating_or_zero())
        .then_with(|| b.review_count.cmp(&a.review_count))
        .then_with(|| a.sku.cmp(&b.sku))
}

/// Top-rated active products, skipping `exclude` and, when asked, anything out
/// of stock. Scores are average ratings.
pub fn top_rated(
    products: &[Product],
    exclude: &[&str],
    exclude_out_of_stock: bool,
    limit: usize,
) -> Vec<ScoredProduct> {
    let mut candidates: Vec<&Product> = products
        .iter()
        .filter(|p| p.is_active)
        .filter(|p| !exclude_out_of_stock || p.in_stock())
        .filter(|p| !exclude.contains(&p.sku.as_str()))
        .collect();

    candidates.sort_by(|a, b| rating_order(a, b));

    candidates
        .into_iter()
        .take(limit)
        .map(|p| ScoredProduct {
            product_id: p.sku.clone(),
            score: p.rating_or_zero(),
        })
        .collect()
}
