use serde::{Deserialize, Serialize};

use crate::domain::{FilterCategory, LevelRange, SubjectCode, Term};

/// Loosely typed filter value as it arrives from a presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Range { min: f64, max: f64 },
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionInput {
    pub category: FilterCategory,
    pub value: RawValue,
}

impl CriterionInput {
    pub fn new(category: FilterCategory, value: impl Into<RawValue>) -> Self {
        Self {
            category,
            value: value.into(),
        }
    }
}

/// Read-only snapshot of the active filters handed to a catalog query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<SubjectCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<LevelRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<Term>,
}

impl QueryDescriptor {
    pub fn is_unfiltered(&self) -> bool {
        *self == Self::default()
    }

    /// Key/value pairs in category order, suitable for a URL query string.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(subject) = &self.subject {
            pairs.push((FilterCategory::Subject.as_str(), subject.to_string()));
        }
        if let Some(rating_min) = self.rating_min {
            pairs.push((FilterCategory::RatingMin.as_str(), rating_min.to_string()));
        }
        if let Some(price_max) = self.price_max {
            pairs.push((FilterCategory::PriceMax.as_str(), price_max.to_string()));
        }
        if let Some(level) = self.level {
            pairs.push((FilterCategory::Level.as_str(), level.to_string()));
        }
        if let Some(term) = self.availability {
            pairs.push((FilterCategory::Availability.as_str(), term.to_string()));
        }
        pairs
    }
}
