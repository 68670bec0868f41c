//! Association-rule artifact and the "frequently bought together" ranking.
//!
//! The rule miner exports item-set rules:
//!
//! ```json
//! { "rules": [ { "antecedents": ["SKU-1"], "consequents": ["SKU-7", "SKU-9"],
//!                "confidence": 0.42, "support": 118, "lift": 3.1 } ] }
//! ```
//!
//! A product page looks rules up by a single SKU, so every item-set rule is
//! expanded into one pairwise rule per (antecedent, consequent) on load.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Deserialize;

use super::catalogue::Catalogue;
use super::error::RecommendError;
use super::heuristics;
use super::store::ArtifactStore;
use super::{Outcome, RuleSource};
use crate::models::{AssociationRule, ScoredProduct};

#[derive(Debug, Deserialize)]
struct RuleTableDocument {
    rules: Vec<RuleRow>,
}

#[derive(Debug, Deserialize)]
struct RuleRow {
    antecedents: Vec<String>,
    consequents: Vec<String>,
    confidence: f64,
    support: u64,
    lift: f64,
}

/// Pairwise rules indexed by antecedent.
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    by_antecedent: HashMap<String, Vec<AssociationRule>>,
    rule_count: usize,
}

impl RuleTable {
    pub fn from_json(bytes: &[u8]) -> Result<Self, String> {
        let doc: RuleTableDocument = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;

        let mut rules = Vec::new();
        for (i, row) in doc.rules.into_iter().enumerate() {
            if row.antecedents.is_empty() || row.consequents.is_empty() {
                return Err(format!("rule {} has an empty item set", i));
            }
            if !(0.0..=1.0).contains(&row.confidence) {
                return Err(format!("rule {} has confidence {} outside [0, 1]", i, row.confidence));
            }
            if !row.lift.is_finite() || row.lift < 0.0 {
                return Err(format!("rule {} has invalid lift {}", i, row.lift));
            }

            for antecedent in &row.antecedents {
                for consequent in &row.consequents {
                    if antecedent == consequent {
                        continue;
                    }
                    rules.push(AssociationRule {
                        antecedent: antecedent.clone(),
                        consequent: consequent.clone(),
                        confidence: row.confidence,
                        support: row.support,
                        lift: row.lift,
                    });
                }
            }
        }

        Ok(Self::from_rules(rules))
    }

    pub fn from_rules(rules: impl IntoIterator<Item = AssociationRule>) -> Self {
        let mut table = Self::default();
        for rule in rules {
            table
                .by_antecedent
                .entry(rule.antecedent.clone())
                .or_default()
                .push(rule);
            table.rule_count += 1;
        }
        table
    }

    pub fn len(&self) -> usize {
        self.rule_count
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count == 0
    }
}

impl RuleSource for RuleTable {
    fn lookup_rules(&self, product_id: &str) -> &[AssociationRule] {
        self.by_antecedent
            .get(product_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn rule_count(&self) -> usize {
        self.rule_count
    }
}

/// Confidence desc, lift desc, consequent id asc.
pub fn rule_order(a: &AssociationRule, b: &AssociationRule) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| b.lift.total_cmp(&a.lift))
        .then_with(|| a.consequent.cmp(&b.consequent))
}

/// Ranks co-purchased products from the rule-table artifact.
#[derive(Clone)]
pub struct AssociationRuleRecommender {
    store: Arc<ArtifactStore>,
    artifact: String,
}

impl AssociationRuleRecommender {
    pub fn new(store: Arc<ArtifactStore>, artifact: impl Into<String>) -> Self {
        Self {
            store,
            artifact: artifact.into(),
        }
    }

    /// Products frequently bought with `product_id`, never including it.
    pub fn recommend(
        &self,
        product_id: &str,
        exclude_out_of_stock: bool,
        limit: usize,
        catalogue: &dyn Catalogue,
    ) -> Outcome<Vec<ScoredProduct>> {
        self.recommend_for(&[product_id], exclude_out_of_stock, limit, catalogue)
    }

    /// Products frequently bought with any basket item, never including basket items.
    pub fn recommend_basket(
        &self,
        product_ids: &[&str],
        exclude_out_of_stock: bool,
        limit: usize,
        catalogue: &dyn Catalogue,
    ) -> Outcome<Vec<ScoredProduct>> {
        self.recommend_for(product_ids, exclude_out_of_stock, limit, catalogue)
    }

    fn recommend_for(
        &self,
        seeds: &[&str],
        exclude_out_of_stock: bool,
        limit: usize,
        catalogue: &dyn Catalogue,
    ) -> Outcome<Vec<ScoredProduct>> {
        match self.rank_by_rules(seeds, exclude_out_of_stock, limit, catalogue) {
            Ok(items) => Outcome::ModelBacked(items),
            Err(_) => Outcome::HeuristicBacked(fallback(
                seeds,
                exclude_out_of_stock,
                limit,
                catalogue,
            )),
        }
    }

    fn rank_by_rules(
        &self,
        seeds: &[&str],
        exclude_out_of_stock: bool,
        limit: usize,
        catalogue: &dyn Catalogue,
    ) -> Result<Vec<ScoredProduct>, RecommendError> {
        let rules = self.store.rule_source(&self.artifact)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let mut candidates: Vec<&AssociationRule> = seeds
            .iter()
            .flat_map(|seed| rules.lookup_rules(seed))
            .filter(|rule| !seeds.contains(&rule.consequent.as_str()))
            .collect();
        candidates.sort_by(|a, b| rule_order(a, b));

        // Sorted first, so the first rule seen for a consequent is its strongest.
        let mut seen = HashSet::new();
        candidates.retain(|rule| seen.insert(rule.consequent.as_str()));

        if exclude_out_of_stock && !candidates.is_empty() {
            let ids: Vec<&str> = candidates.iter().map(|r| r.consequent.as_str()).collect();
            let availability = catalogue.availability(&ids)?;
            candidates.retain(|rule| {
                availability
                    .get(&rule.consequent)
                    .is_some_and(|a| a.is_purchasable())
            });
        }

        candidates.truncate(limit);
        if candidates.is_empty() {
            return Err(RecommendError::EmptyRuleSet);
        }

        Ok(candidates
            .into_iter()
            .map(|rule| ScoredProduct {
                product_id: rule.consequent.clone(),
                score: rule.confidence,
            })
            .collect())
    }
}

/// Top-rated products in the seeds' shared category, or across the whole
/// catalogue when they have none in common. A failing catalogue yields nothing.
fn fallback(
    seeds: &[&str],
    exclude_out_of_stock: bool,
    limit: usize,
    catalogue: &dyn Catalogue,
) -> Vec<ScoredProduct> {
    let category = shared_category(seeds, catalogue);

    match catalogue.active_products(category.as_deref()) {
        Ok(products) => heuristics::top_rated(&products, seeds, exclude_out_of_stock, limit),
        Err(e) => {
            tracing::debug!("Catalogue unavailable for fallback recommendations: {}", e);
            Vec::new()
        }
    }
}

fn shared_category(seeds: &[&str], catalogue: &dyn Catalogue) -> Option<String> {
    let mut shared: Option<String> = None;
    for seed in seeds {
        let category = catalogue.category_of(seed).ok().flatten()?;
        match &shared {
            Some(existing) if *existing != category => return None,
            _ => shared = Some(category),
        }
    }
    shared
}
