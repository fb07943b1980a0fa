//! One-off data patches applied on top of a seeded catalog.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::Term;
use tracing::{info, warn};

use crate::{CatalogError, InMemoryCatalog};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CourseFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms: Option<Vec<Term>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoursePatch {
    pub code: String,
    pub set: CourseFields,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchDocument {
    #[serde(default)]
    pub patches: Vec<CoursePatch>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatchReport {
    pub changed: Vec<String>,
    pub unchanged: Vec<String>,
    pub applied_at: DateTime<Utc>,
}

impl InMemoryCatalog {
    /// Applies every patch in order, or none of them if any patch is invalid.
    pub fn apply_patch(&mut self, document: &PatchDocument) -> Result<PatchReport, CatalogError> {
        for patch in &document.patches {
            self.check_patch(patch)?;
        }

        let applied_at = Utc::now();
        let mut report = PatchReport {
            changed: Vec::new(),
            unchanged: Vec::new(),
            applied_at,
        };
        for patch in &document.patches {
            let code = patch.code.trim().to_ascii_uppercase();
            let Some(course) = self.courses.get_mut(&code) else {
                continue;
            };

            let mut changed = false;
            if let Some(title) = &patch.set.title {
                let title = title.trim();
                if course.title != title {
                    course.title = title.to_string();
                    changed = true;
                }
            }
            if let Some(price) = patch.set.price {
                if course.price != price {
                    course.price = price;
                    changed = true;
                }
            }
            if let Some(terms) = &patch.set.terms {
                let mut terms = terms.clone();
                terms.sort();
                terms.dedup();
                if course.terms != terms {
                    course.terms = terms;
                    changed = true;
                }
            }

            if changed {
                course.updated_at = Some(applied_at);
                report.changed.push(code);
            } else {
                report.unchanged.push(code);
            }
        }

        if report.changed.is_empty() {
            warn!(patches = document.patches.len(), "catalog patch changed nothing");
        } else {
            info!(changed = ?report.changed, "applied catalog patch");
        }
        Ok(report)
    }

    fn check_patch(&self, patch: &CoursePatch) -> Result<(), CatalogError> {
        let Some(course) = self.course(&patch.code) else {
            return Err(CatalogError::UnknownCourse(patch.code.clone()));
        };
        let invalid = |reason: String| CatalogError::InvalidPatch {
            code: course.code.clone(),
            reason,
        };

        if let Some(title) = &patch.set.title {
            if title.trim().is_empty() {
                return Err(invalid("title must not be empty".into()));
            }
        }
        if let Some(price) = patch.set.price {
            if !price.is_finite() || price < 0.0 {
                return Err(invalid(format!("price {price} is not a non-negative number")));
            }
        }
        Ok(())
    }
}

pub fn load_patch_file(path: impl AsRef<Path>) -> Result<PatchDocument> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read patch file '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse patch file '{}'", path.display()))
}
