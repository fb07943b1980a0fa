use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use shared::{
    domain::{CourseId, CourseSummary, ReviewId, SubjectCode, Term, RATING_SCALE_MAX},
    error::{ApiError, ErrorCode},
    protocol::QueryDescriptor,
};
use thiserror::Error;
use tracing::debug;

mod patch;
mod seed;

pub use patch::{load_patch_file, CourseFields, CoursePatch, PatchDocument, PatchReport};
pub use seed::{load_seed_file, SeedCourse, SeedDocument, SeedReview};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("invalid seed data: {0}")]
    InvalidSeed(String),
    #[error("invalid patch for course {code}: {reason}")]
    InvalidPatch { code: String, reason: String },
    #[error("unknown course {0}")]
    UnknownCourse(String),
}

impl From<CatalogError> for ApiError {
    fn from(value: CatalogError) -> Self {
        let code = match value {
            CatalogError::UnknownCourse(_) => ErrorCode::NotFound,
            CatalogError::InvalidSeed(_) | CatalogError::InvalidPatch { .. } => {
                ErrorCode::Validation
            }
        };
        ApiError::new(code, value.to_string())
    }
}

/// Receives query descriptors and answers with matching courses.
pub trait CatalogQuery {
    fn query(&self, descriptor: &QueryDescriptor) -> Result<Vec<CourseSummary>>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Course {
    pub course_id: CourseId,
    pub code: String,
    pub subject: SubjectCode,
    pub title: String,
    pub level: u8,
    pub price: f64,
    pub terms: Vec<Term>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredReview {
    pub review_id: ReviewId,
    pub course_id: CourseId,
    pub rating: f64,
    pub posted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    courses: BTreeMap<String, Course>,
    reviews: Vec<StoredReview>,
    next_course_id: i64,
    next_review_id: i64,
    result_limit: Option<usize>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_result_limit(mut self, limit: usize) -> Self {
        self.result_limit = Some(limit);
        self
    }

    pub fn course_count(&self) -> usize {
        self.courses.len()
    }

    pub fn review_count(&self) -> usize {
        self.reviews.len()
    }

    pub fn course(&self, code: &str) -> Option<&Course> {
        self.courses.get(&code.trim().to_ascii_uppercase())
    }

    pub fn insert_course(&mut self, seed: SeedCourse) -> Result<CourseId, CatalogError> {
        let (code, subject, level) = parse_course_code(&seed.code)?;
        if self.courses.contains_key(&code) {
            return Err(CatalogError::InvalidSeed(format!("duplicate course code {code}")));
        }
        if seed.title.trim().is_empty() {
            return Err(CatalogError::InvalidSeed(format!("course {code} has an empty title")));
        }
        if !seed.price.is_finite() || seed.price < 0.0 {
            return Err(CatalogError::InvalidSeed(format!(
                "course {code} has invalid price {}",
                seed.price
            )));
        }

        self.next_course_id += 1;
        let course_id = CourseId(self.next_course_id);
        let mut terms = seed.terms;
        terms.sort();
        terms.dedup();
        self.courses.insert(
            code.clone(),
            Course {
                course_id,
                code,
                subject,
                title: seed.title.trim().to_string(),
                level,
                price: seed.price,
                terms,
                updated_at: None,
            },
        );
        Ok(course_id)
    }

    pub fn add_review(
        &mut self,
        course_code: &str,
        rating: f64,
        posted_at: Option<DateTime<Utc>>,
    ) -> Result<ReviewId, CatalogError> {
        let course_id = self
            .course(course_code)
            .map(|course| course.course_id)
            .ok_or_else(|| CatalogError::UnknownCourse(course_code.to_string()))?;
        if !rating.is_finite() || !(0.0..=RATING_SCALE_MAX).contains(&rating) {
            return Err(CatalogError::InvalidSeed(format!(
                "review for {course_code} has rating {rating} outside 0..={RATING_SCALE_MAX}"
            )));
        }

        self.next_review_id += 1;
        let review_id = ReviewId(self.next_review_id);
        self.reviews.push(StoredReview {
            review_id,
            course_id,
            rating,
            posted_at,
        });
        Ok(review_id)
    }

    pub fn summary(&self, code: &str) -> Option<CourseSummary> {
        self.course(code).map(|course| self.summarize(course))
    }

    fn summarize(&self, course: &Course) -> CourseSummary {
        let ratings: Vec<f64> = self
            .reviews
            .iter()
            .filter(|review| review.course_id == course.course_id)
            .map(|review| review.rating)
            .collect();
        let rating = (!ratings.is_empty())
            .then(|| ratings.iter().sum::<f64>() / ratings.len() as f64);

        CourseSummary {
            course_id: course.course_id,
            code: course.code.clone(),
            subject: course.subject.clone(),
            title: course.title.clone(),
            level: course.level,
            price: course.price,
            terms: course.terms.clone(),
            rating,
            review_count: ratings.len(),
        }
    }
}

impl CatalogQuery for InMemoryCatalog {
    fn query(&self, descriptor: &QueryDescriptor) -> Result<Vec<CourseSummary>> {
        let limit = self.result_limit.unwrap_or(usize::MAX);
        let results: Vec<CourseSummary> = self
            .courses
            .values()
            .map(|course| self.summarize(course))
            .filter(|summary| matches(summary, descriptor))
            .take(limit)
            .collect();
        debug!(
            filters = descriptor.to_query_pairs().len(),
            results = results.len(),
            "catalog query evaluated"
        );
        Ok(results)
    }
}

/// Evaluates a descriptor against one course. Thresholds are inclusive, and an
/// unrated course never satisfies a rating threshold.
pub fn matches(course: &CourseSummary, descriptor: &QueryDescriptor) -> bool {
    if let Some(subject) = &descriptor.subject {
        if &course.subject != subject {
            return false;
        }
    }
    if let Some(rating_min) = descriptor.rating_min {
        match course.rating {
            Some(rating) if rating >= rating_min => {}
            _ => return false,
        }
    }
    if let Some(price_max) = descriptor.price_max {
        if course.price > price_max {
            return false;
        }
    }
    if let Some(level) = descriptor.level {
        if !level.contains(course.level) {
            return false;
        }
    }
    if let Some(term) = descriptor.availability {
        if !course.terms.contains(&term) {
            return false;
        }
    }
    true
}

/// Splits a course code such as `COMP1511` into its normalized code, subject
/// prefix and year level (the first digit).
fn parse_course_code(raw: &str) -> Result<(String, SubjectCode, u8), CatalogError> {
    let code = raw.trim().to_ascii_uppercase();
    let split = code
        .find(|c: char| c.is_ascii_digit())
        .ok_or_else(|| CatalogError::InvalidSeed(format!("course code '{raw}' has no number")))?;
    let (prefix, number) = code.split_at(split);

    let subject = SubjectCode::parse(prefix)
        .filter(|_| prefix.chars().all(|c| c.is_ascii_alphabetic()))
        .ok_or_else(|| CatalogError::InvalidSeed(format!("course code '{raw}' has a bad subject")))?;
    if number.len() != 4 || !number.chars().all(|c| c.is_ascii_digit()) {
        return Err(CatalogError::InvalidSeed(format!(
            "course code '{raw}' must end in four digits"
        )));
    }
    let level = number.as_bytes()[0] - b'0';
    if level == 0 {
        return Err(CatalogError::InvalidSeed(format!(
            "course code '{raw}' has year level 0"
        )));
    }

    Ok((code, subject, level))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
