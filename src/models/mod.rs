//! Domain models for AuroraMart.
//!
//! # Core Concepts
//!
//! ## Catalogue Entities
//!
//! - [`Product`]: A single SKU the storefront sells, with the stock, activity and
//!   rating data the recommender needs from the catalogue.
//! - [`Category`]: Top-level merchandising category a product belongs to.
//!
//! ## Recommendation Values
//!
//! These are produced fresh for every request and never persisted:
//!
//! - [`CategoryPrediction`]: Preferred category predicted from an onboarding survey.
//! - [`RecommendationResult`]: Ranked "frequently bought together" products.
//! - [`AssociationRule`]: A read-only antecedent → consequent co-purchase rule.
//!
//! Every recommendation value carries a [`Source`] so callers can tell whether a
//! trained artifact or a fallback heuristic produced it.

mod demographics;
mod prediction;
mod product;
mod recommendation;
mod rule;

pub use demographics::*;
pub use prediction::*;
pub use product::*;
pub use recommendation::*;
pub use rule::*;
