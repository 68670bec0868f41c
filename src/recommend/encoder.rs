//! Survey answers → classifier feature vector.
//!
//! The classifier was trained on a fixed feature order and a fixed
//! categorical → code table. The order lives here as [`FEATURE_NAMES`]; the
//! code table ships inside the classifier artifact as an [`EncodingTable`] so
//! both always come from the same training run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::EncodingError;
use crate::models::{AttributeValue, RawAttributes};

/// Bumped whenever [`FEATURE_NAMES`] or the normalization rules change.
pub const ENCODING_VERSION: u32 = 1;

pub const FEATURE_COUNT: usize = 8;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age",
    "gender",
    "employment",
    "occupation",
    "education",
    "household_size",
    "has_children",
    "income",
];

/// Features encoded through the artifact's code table.
pub const CATEGORICAL_FEATURES: [&str; 6] = [
    "age",
    "gender",
    "employment",
    "occupation",
    "education",
    "income",
];

pub const MAX_HOUSEHOLD_SIZE: u32 = 20;

/// Form field names that feed a canonical feature.
const ATTRIBUTE_ALIASES: &[(&str, &str)] = &[
    ("employment_status", "employment"),
    ("monthly_income_sgd", "income"),
];

const GENDER_ALIASES: &[(&str, &str)] = &[
    ("female", "f"),
    ("woman", "f"),
    ("male", "m"),
    ("man", "m"),
];

/// Monthly income thresholds (SGD) separating the low/medium/high brackets.
const INCOME_LOW_BELOW: f64 = 3000.0;
const INCOME_MEDIUM_BELOW: f64 = 8000.0;

/// Encoded features in [`FEATURE_NAMES`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    pub fn value(&self, feature: &str) -> Option<f64> {
        feature_index(feature).map(|i| self.values[i])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }
}

pub fn feature_index(feature: &str) -> Option<usize> {
    FEATURE_NAMES.iter().position(|f| *f == feature)
}

/// Training-time categorical code table, embedded in the classifier artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingTable {
    pub version: u32,
    pub categorical: BTreeMap<String, CategoryCodes>,
}

/// Codes for one categorical feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCodes {
    pub codes: BTreeMap<String, f64>,
    /// Code used when the attribute is absent. Without it the attribute is required.
    #[serde(default)]
    pub missing: Option<f64>,
}

impl EncodingTable {
    /// Check the table against this build's feature list and normalize its keys
    /// the same way survey answers are normalized.
    pub fn prepare(self) -> Result<Self, String> {
        if self.version != ENCODING_VERSION {
            return Err(format!(
                "encoding version {} does not match supported version {}",
                self.version, ENCODING_VERSION
            ));
        }

        if let Some(unknown) = self
            .categorical
            .keys()
            .find(|k| !CATEGORICAL_FEATURES.contains(&k.as_str()))
        {
            return Err(format!("encoding table has unknown feature '{}'", unknown));
        }

        let mut categorical = BTreeMap::new();
        for feature in CATEGORICAL_FEATURES {
            let table = self
                .categorical
                .get(feature)
                .ok_or_else(|| format!("encoding table is missing feature '{}'", feature))?;

            let mut codes = BTreeMap::new();
            for (label, code) in &table.codes {
                if !code.is_finite() {
                    return Err(format!("code for '{}' in '{}' is not finite", label, feature));
                }
                if codes.insert(normalize_label(feature, label), *code).is_some() {
                    return Err(format!("duplicate label '{}' in '{}'", label, feature));
                }
            }

            categorical.insert(
                feature.to_string(),
                CategoryCodes {
                    codes,
                    missing: table.missing,
                },
            );
        }

        Ok(Self {
            version: self.version,
            categorical,
        })
    }
}

pub struct FeatureEncoder<'a> {
    table: &'a EncodingTable,
}

impl<'a> FeatureEncoder<'a> {
    pub fn new(table: &'a EncodingTable) -> Self {
        Self { table }
    }

    pub fn encode(&self, raw: &RawAttributes) -> Result<FeatureVector, EncodingError> {
        let mut values = [0.0; FEATURE_COUNT];

        for (slot, &feature) in values.iter_mut().zip(FEATURE_NAMES.iter()) {
            *slot = match feature {
                "household_size" => f64::from(household_size(raw)?),
                "has_children" => {
                    if has_children(raw)? {
                        1.0
                    } else {
                        0.0
                    }
                }
                _ => self.categorical(feature, raw)?,
            };
        }

        Ok(FeatureVector { values })
    }

    fn categorical(&self, feature: &'static str, raw: &RawAttributes) -> Result<f64, EncodingError> {
        let label = categorical_label(feature, raw)?;
        let codes = self.table.categorical.get(feature);

        match (label, codes) {
            (Some(label), Some(codes)) => codes
                .codes
                .get(&label)
                .copied()
                .ok_or(EncodingError::UnknownCategory {
                    feature,
                    value: label,
                }),
            (None, Some(CategoryCodes {
                missing: Some(code),
                ..
            })) => Ok(*code),
            (None, _) => Err(EncodingError::MissingAttribute(feature)),
            (Some(label), None) => Err(EncodingError::UnknownCategory {
                feature,
                value: label,
            }),
        }
    }
}

/// Look up an attribute by canonical name, then by form alias. Blank and null
/// answers count as absent.
pub fn attribute<'r>(raw: &'r RawAttributes, feature: &str) -> Option<&'r AttributeValue> {
    let value = raw.get(feature).or_else(|| {
        ATTRIBUTE_ALIASES
            .iter()
            .filter(|(_, canonical)| *canonical == feature)
            .find_map(|(alias, _)| raw.get(*alias))
    })?;

    (!value.is_blank()).then_some(value)
}

/// Normalized label of a categorical feature, or `None` when the shopper
/// skipped it. Numeric ages and incomes are bucketed first.
pub fn categorical_label(
    feature: &'static str,
    raw: &RawAttributes,
) -> Result<Option<String>, EncodingError> {
    let Some(value) = attribute(raw, feature) else {
        return Ok(None);
    };

    let label = match (feature, value) {
        (_, AttributeValue::Bool(_)) => {
            return Err(EncodingError::InvalidType {
                feature,
                expected: "text",
            })
        }
        ("age", v) if v.as_number().is_some() => {
            age_bucket(v.as_number().unwrap_or_default(), v)?.to_string()
        }
        ("income", v) if v.as_number().is_some() => {
            income_bracket(v.as_number().unwrap_or_default(), v)?.to_string()
        }
        (_, v) => normalize_label(feature, &v.describe()),
    };

    Ok(Some(label))
}

fn normalize_label(feature: &str, label: &str) -> String {
    let key = label.trim().to_lowercase();
    if feature == "gender" {
        if let Some((_, canonical)) = GENDER_ALIASES.iter().find(|(alias, _)| *alias == key) {
            return canonical.to_string();
        }
    }
    key
}

fn age_bucket(age: f64, raw: &AttributeValue) -> Result<&'static str, EncodingError> {
    if !(18.0..=120.0).contains(&age) || age.fract() != 0.0 {
        return Err(EncodingError::OutOfRange {
            feature: "age",
            value: raw.describe(),
        });
    }

    Ok(match age as u32 {
        18..=24 => "18-24",
        25..=34 => "25-34",
        35..=44 => "35-44",
        45..=54 => "45-54",
        55..=64 => "55-64",
        _ => "65+",
    })
}

fn income_bracket(amount: f64, raw: &AttributeValue) -> Result<&'static str, EncodingError> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(EncodingError::OutOfRange {
            feature: "income",
            value: raw.describe(),
        });
    }

    Ok(if amount < INCOME_LOW_BELOW {
        "low"
    } else if amount < INCOME_MEDIUM_BELOW {
        "medium"
    } else {
        "high"
    })
}

pub fn household_size(raw: &RawAttributes) -> Result<u32, EncodingError> {
    const FEATURE: &str = "household_size";

    let value = attribute(raw, FEATURE).ok_or(EncodingError::MissingAttribute(FEATURE))?;
    let size = value.as_number().ok_or(EncodingError::InvalidType {
        feature: FEATURE,
        expected: "an integer",
    })?;

    if size.fract() != 0.0 || size < 1.0 || size > f64::from(MAX_HOUSEHOLD_SIZE) {
        return Err(EncodingError::OutOfRange {
            feature: FEATURE,
            value: value.describe(),
        });
    }

    Ok(size as u32)
}

pub fn has_children(raw: &RawAttributes) -> Result<bool, EncodingError> {
    const FEATURE: &str = "has_children";

    let value = attribute(raw, FEATURE).ok_or(EncodingError::MissingAttribute(FEATURE))?;
    let invalid = || EncodingError::InvalidType {
        feature: FEATURE,
        expected: "a boolean",
    };

    match value {
        AttributeValue::Bool(b) => Ok(*b),
        AttributeValue::Integer(0) => Ok(false),
        AttributeValue::Integer(1) => Ok(true),
        AttributeValue::Float(f) if *f == 0.0 => Ok(false),
        AttributeValue::Float(f) if *f == 1.0 => Ok(true),
        AttributeValue::Text(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => Ok(true),
            "false" | "no" | "n" | "0" => Ok(false),
            _ => Err(invalid()),
        },
        _ => Err(invalid()),
    }
}
