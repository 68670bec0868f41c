//! Decision-tree classifier artifact.
//!
//! The offline trainer exports the fitted tree as JSON: the categorical
//! encoding table it was trained with, the class labels, and the tree flattened
//! into a node array where every child sits after its parent.
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "encoding": { "version": 1, "categorical": { "gender": { "codes": { "f": 0, "m": 1 } }, ... } },
//!   "classes": ["Electronics", "Home & Kitchen"],
//!   "nodes": [
//!     { "split": { "feature": "gender", "threshold": 0.5, "left": 1, "right": 2 } },
//!     { "leaf": { "distribution": [3, 9] } },
//!     { "leaf": { "distribution": [7, 2] } }
//!   ]
//! }
//! ```

use std::collections::HashSet;

use serde::Deserialize;

use super::encoder::{feature_index, EncodingTable, FeatureVector};
use super::{Classification, Classifier};

pub const TREE_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Deserialize)]
struct TreeDocument {
    format_version: u32,
    encoding: EncodingTable,
    classes: Vec<String>,
    nodes: Vec<NodeDocument>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum NodeDocument {
    Split {
        feature: String,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        distribution: Vec<f64>,
    },
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Leaves keep only their winning class, resolved once at load time.
    Leaf { class: usize, confidence: f64 },
}

/// A validated, immutable decision tree.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    encoding: EncodingTable,
    classes: Vec<String>,
    nodes: Vec<Node>,
}

impl DecisionTree {
    /// Parse and validate an exported tree. The error string describes the
    /// first schema violation found.
    pub fn from_json(bytes: &[u8]) -> Result<Self, String> {
        let doc: TreeDocument = serde_json::from_slice(bytes).map_err(|e| e.to_string())?;

        if doc.format_version != TREE_FORMAT_VERSION {
            return Err(format!(
                "tree format version {} is not supported",
                doc.format_version
            ));
        }

        let encoding = doc.encoding.prepare()?;

        if doc.classes.is_empty() {
            return Err("tree has no classes".to_string());
        }
        let mut seen = HashSet::new();
        if let Some(dup) = doc.classes.iter().find(|c| !seen.insert(c.as_str())) {
            return Err(format!("duplicate class label '{}'", dup));
        }

        if doc.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }

        let count = doc.nodes.len();
        let nodes = doc
            .nodes
            .into_iter()
            .enumerate()
            .map(|(i, node)| compile_node(i, node, count, &doc.classes))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            encoding,
            classes: doc.classes,
            nodes,
        })
    }
}

fn compile_node(
    index: usize,
    node: NodeDocument,
    count: usize,
    classes: &[String],
) -> Result<Node, String> {
    match node {
        NodeDocument::Split {
            feature,
            threshold,
            left,
            right,
        } => {
            let feature_idx = feature_index(&feature)
                .ok_or_else(|| format!("node {} splits on unknown feature '{}'", index, feature))?;
            if !threshold.is_finite() {
                return Err(format!("node {} has a non-finite threshold", index));
            }
            for child in [left, right] {
                if child <= index || child >= count {
                    return Err(format!("node {} has out-of-order child {}", index, child));
                }
            }
            Ok(Node::Split {
                feature: feature_idx,
                threshold,
                left,
                right,
            })
        }
        NodeDocument::Leaf { distribution } => {
            if distribution.len() != classes.len() {
                return Err(format!(
                    "leaf {} has {} weights for {} classes",
                    index,
                    distribution.len(),
                    classes.len()
                ));
            }
            if distribution.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(format!("leaf {} has a negative or non-finite weight", index));
            }
            let total: f64 = distribution.iter().sum();
            if total <= 0.0 {
                return Err(format!("leaf {} has no weight", index));
            }

            let (class, weight) = winning_class(&distribution, classes);
            Ok(Node::Leaf {
                class,
                confidence: weight / total,
            })
        }
    }
}

/// Highest weight wins; equal weights go to the lexicographically smallest label.
fn winning_class(distribution: &[f64], classes: &[String]) -> (usize, f64) {
    let mut best = 0;
    for (i, weight) in distribution.iter().enumerate().skip(1) {
        let current = distribution[best];
        if *weight > current || (*weight == current && classes[i] < classes[best]) {
            best = i;
        }
    }
    (best, distribution[best])
}

impl Classifier for DecisionTree {
    fn encoding(&self) -> &EncodingTable {
        &self.encoding
    }

    fn classify(&self, features: &FeatureVector) -> Classification {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = features.get(*feature).unwrap_or(f64::NAN);
                    // NaN fails the comparison and goes right, like the trainer.
                    index = if value <= *threshold { *left } else { *right };
                }
                Node::Leaf { class, confidence } => {
                    return Classification {
                        label: self.classes[*class].clone(),
                        confidence: *confidence,
                    };
                }
            }
        }
    }
}
