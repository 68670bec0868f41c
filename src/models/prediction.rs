use serde::{Deserialize, Serialize};

/// Which code path produced a recommendation value.
///
/// - `Model`: A loaded artifact answered the request
/// - `Heuristic`: The artifact was unavailable or unusable, so a deterministic
///   fallback answered instead
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Model,
    Heuristic,
}

/// Preferred category predicted for a shopper during onboarding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryPrediction {
    pub category: String,
    /// Probability of `category` at the classifier leaf, in `[0, 1]`.
    /// Heuristic predictions carry no probability and report `0.0`.
    pub confidence: f64,
    pub source: Source,
}
