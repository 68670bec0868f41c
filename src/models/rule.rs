use serde::{Deserialize, Serialize};

/// A co-purchase rule: shoppers who buy `antecedent` also buy `consequent`.
///
/// Rules are mined offline and are read-only once the rule table is loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssociationRule {
    pub antecedent: String,
    pub consequent: String,
    /// Fraction of antecedent baskets that also contain the consequent.
    pub confidence: f64,
    /// Number of transactions that contain both products.
    pub support: u64,
    pub lift: f64,
}
