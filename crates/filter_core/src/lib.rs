//! Filter state for the course catalog: the set of active criteria, the
//! operations that change it, and the query descriptor derived from it.
//!
//! The engine is single-threaded. Every operation, including observer
//! notification, finishes before it returns; hosts that share an engine across
//! threads must serialize calls themselves.

use std::collections::BTreeMap;

use shared::{
    domain::FilterCategory,
    error::{ApiError, ErrorCode},
    protocol::QueryDescriptor,
};
use thiserror::Error;
use tracing::{debug, info_span, warn, Span};

mod criterion;
mod observers;

pub use criterion::{FilterCriterion, IntoCriterion};
pub use observers::{ObserverId, ObserverRegistry};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("invalid {category} criterion: {reason}")]
    InvalidCriterion {
        category: FilterCategory,
        reason: String,
    },
}

impl FilterError {
    pub fn invalid(category: FilterCategory, reason: impl Into<String>) -> Self {
        FilterError::InvalidCriterion {
            category,
            reason: reason.into(),
        }
    }

    pub fn category(&self) -> FilterCategory {
        match self {
            FilterError::InvalidCriterion { category, .. } => *category,
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(value: FilterError) -> Self {
        ApiError::new(ErrorCode::Validation, value.to_string())
    }
}

/// What an applied operation did to the state.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterChange {
    Set {
        criterion: FilterCriterion,
        replaced: Option<FilterCriterion>,
    },
    Cleared(FilterCriterion),
    ClearedAll(Vec<FilterCriterion>),
}

/// Delivered to observers after a change has been applied.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNotification {
    pub change: FilterChange,
    pub active_count: usize,
    pub descriptor: QueryDescriptor,
}

/// Active criteria keyed by category; at most one per category.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterState {
    entries: BTreeMap<FilterCategory, FilterCriterion>,
}

impl FilterState {
    pub fn active_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, category: FilterCategory) -> Option<&FilterCriterion> {
        self.entries.get(&category)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FilterCriterion> {
        self.entries.values()
    }

    pub fn descriptor(&self) -> QueryDescriptor {
        let mut descriptor = QueryDescriptor::default();
        for criterion in self.entries.values() {
            match criterion {
                FilterCriterion::Subject(subject) => descriptor.subject = Some(subject.clone()),
                FilterCriterion::RatingMin(value) => descriptor.rating_min = Some(value.get()),
                FilterCriterion::PriceMax(value) => descriptor.price_max = Some(value.get()),
                FilterCriterion::Level(range) => descriptor.level = Some(*range),
                FilterCriterion::Availability(term) => descriptor.availability = Some(*term),
            }
        }
        descriptor
    }

    fn insert(&mut self, criterion: FilterCriterion) -> Option<FilterCriterion> {
        self.entries.insert(criterion.category(), criterion)
    }

    fn remove(&mut self, category: FilterCategory) -> Option<FilterCriterion> {
        self.entries.remove(&category)
    }

    fn take_all(&mut self) -> Vec<FilterCriterion> {
        std::mem::take(&mut self.entries).into_values().collect()
    }
}

pub struct FilterEngine {
    state: FilterState,
    observers: ObserverRegistry,
    span: Span,
}

impl Default for FilterEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterEngine {
    pub fn new() -> Self {
        Self::with_span(info_span!("filter_engine"))
    }

    /// Builds an engine that records its events under `span`.
    pub fn with_span(span: Span) -> Self {
        Self {
            state: FilterState::default(),
            observers: ObserverRegistry::new(),
            span,
        }
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    pub fn active_count(&self) -> usize {
        self.state.active_count()
    }

    pub fn build_query_descriptor(&self) -> QueryDescriptor {
        self.state.descriptor()
    }

    pub fn subscribe<F>(&self, observer: F) -> ObserverId
    where
        F: FnMut(&FilterNotification) + 'static,
    {
        self.observers.subscribe(observer)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.observers.unsubscribe(id)
    }

    /// Shared handle to the observer list, usable from inside an observer.
    pub fn observers(&self) -> ObserverRegistry {
        self.observers.clone()
    }

    /// Inserts or replaces the criterion for its category.
    ///
    /// Returns `Ok(false)` when an equal criterion was already active.
    pub fn set_criterion(&mut self, criterion: impl IntoCriterion) -> Result<bool, FilterError> {
        let criterion = self.accept(criterion)?;
        if self.state.get(criterion.category()) == Some(&criterion) {
            return Ok(false);
        }
        let replaced = self.state.insert(criterion.clone());
        self.commit(FilterChange::Set {
            criterion,
            replaced,
        });
        Ok(true)
    }

    pub fn clear_criterion(&mut self, category: FilterCategory) -> bool {
        match self.state.remove(category) {
            Some(removed) => {
                self.commit(FilterChange::Cleared(removed));
                true
            }
            None => false,
        }
    }

    /// Removes the criterion if an equal one is active, otherwise sets it.
    pub fn toggle_criterion(&mut self, criterion: impl IntoCriterion) -> Result<bool, FilterError> {
        let criterion = self.accept(criterion)?;
        let category = criterion.category();
        if self.state.get(category) == Some(&criterion) {
            return Ok(self.clear_criterion(category));
        }
        let replaced = self.state.insert(criterion.clone());
        self.commit(FilterChange::Set {
            criterion,
            replaced,
        });
        Ok(true)
    }

    pub fn clear_all(&mut self) -> bool {
        if self.state.is_empty() {
            return false;
        }
        let removed = self.state.take_all();
        self.commit(FilterChange::ClearedAll(removed));
        true
    }

    fn accept(&self, criterion: impl IntoCriterion) -> Result<FilterCriterion, FilterError> {
        criterion.into_criterion().inspect_err(|err| {
            let _entered = self.span.enter();
            warn!(category = %err.category(), error = %err, "rejected filter criterion");
        })
    }

    fn commit(&self, change: FilterChange) {
        let _entered = self.span.enter();
        let notification = FilterNotification {
            change,
            active_count: self.state.active_count(),
            descriptor: self.state.descriptor(),
        };
        debug!(
            active_count = notification.active_count,
            observers = self.observers.len(),
            change = ?notification.change,
            "filter state changed"
        );
        self.observers.notify(&notification);
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
