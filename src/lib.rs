//! AuroraMart storefront recommendation service.
//!
//! - [`recommend`]: artifact store, feature encoding, category prediction,
//!   association-rule ranking, heuristics and the facade tying them together.
//! - [`db`]: SQLite catalogue that supplies stock, activity and ratings.
//! - [`api`]: HTTP endpoints for onboarding and product pages.

pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod recommend;
