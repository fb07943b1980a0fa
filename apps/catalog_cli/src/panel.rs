//! Presentation model for the filter-panel button: badge count, open flag and
//! style flags, kept in sync with an engine through a subscription.

use std::{cell::Cell, rc::Rc};

use filter_core::{FilterEngine, ObserverId, ObserverRegistry};
use serde::Serialize;

const LABEL: &str = "Filters";

/// Independent style flags; a renderer may combine them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ButtonStyle {
    pub emphasized: bool,
    pub open: bool,
    pub default: bool,
}

pub struct FilterButton {
    active_count: Rc<Cell<usize>>,
    open: bool,
    registry: ObserverRegistry,
    subscription: ObserverId,
}

impl FilterButton {
    pub fn attach(engine: &FilterEngine) -> Self {
        let active_count = Rc::new(Cell::new(engine.active_count()));
        let badge = active_count.clone();
        let subscription = engine.subscribe(move |notification| {
            badge.set(notification.active_count);
        });

        Self {
            active_count,
            open: false,
            registry: engine.observers(),
            subscription,
        }
    }

    pub fn active_count(&self) -> usize {
        self.active_count.get()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Flips the panel and returns the new open state.
    pub fn toggle_panel(&mut self) -> bool {
        self.open = !self.open;
        self.open
    }

    pub fn badge(&self) -> Option<String> {
        match self.active_count() {
            0 => None,
            n => Some(format!("({n})")),
        }
    }

    pub fn label(&self) -> String {
        match self.badge() {
            Some(badge) => format!("{LABEL} {badge}"),
            None => LABEL.to_string(),
        }
    }

    pub fn style(&self) -> ButtonStyle {
        let emphasized = self.active_count() > 0;
        ButtonStyle {
            emphasized,
            open: self.open,
            default: !emphasized && !self.open,
        }
    }
}

impl Drop for FilterButton {
    fn drop(&mut self) {
        self.registry.unsubscribe(self.subscription);
    }
}
