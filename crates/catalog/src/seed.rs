//! Sequential catalog seeding from a JSON document.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::Term;
use tracing::info;

use crate::{CatalogError, InMemoryCatalog};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedCourse {
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub terms: Vec<Term>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedReview {
    pub course_code: String,
    pub rating: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeedDocument {
    #[serde(default)]
    pub courses: Vec<SeedCourse>,
    #[serde(default)]
    pub reviews: Vec<SeedReview>,
}

impl InMemoryCatalog {
    /// Courses are inserted first, then reviews. The first bad row aborts the
    /// whole seed.
    pub fn from_seed(document: SeedDocument) -> Result<Self, CatalogError> {
        let mut catalog = Self::new();
        for course in document.courses {
            catalog.insert_course(course)?;
        }
        for review in document.reviews {
            catalog
                .add_review(&review.course_code, review.rating, review.posted_at)
                .map_err(|err| match err {
                    CatalogError::UnknownCourse(code) => CatalogError::InvalidSeed(format!(
                        "review references unknown course {code}"
                    )),
                    other => other,
                })?;
        }
        info!(
            courses = catalog.course_count(),
            reviews = catalog.review_count(),
            "seeded course catalog"
        );
        Ok(catalog)
    }
}

pub fn load_seed_file(path: impl AsRef<Path>) -> Result<SeedDocument> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read seed file '{}'", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse seed file '{}'", path.display()))
}
