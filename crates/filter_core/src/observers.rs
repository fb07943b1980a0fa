//! Synchronous observer registry shared between an engine and its subscribers.

use std::{cell::RefCell, rc::Rc};

use tracing::warn;

use crate::FilterNotification;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Callback = Rc<RefCell<dyn FnMut(&FilterNotification)>>;

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    entries: Vec<(ObserverId, Callback)>,
}

/// Cloneable handle to the observer list.
///
/// Clones share the same list, so an observer may capture a handle and
/// unsubscribe itself (or anyone else) while a notification is running.
#[derive(Clone, Default)]
pub struct ObserverRegistry {
    inner: Rc<RefCell<RegistryInner>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, observer: F) -> ObserverId
    where
        F: FnMut(&FilterNotification) + 'static,
    {
        let mut inner = self.inner.borrow_mut();
        let id = ObserverId(inner.next_id);
        inner.next_id += 1;
        let callback: Callback = Rc::new(RefCell::new(observer));
        inner.entries.push((id, callback));
        id
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        let mut inner = self.inner.borrow_mut();
        let before = inner.entries.len();
        inner.entries.retain(|(entry_id, _)| *entry_id != id);
        inner.entries.len() != before
    }

    pub fn is_subscribed(&self, id: ObserverId) -> bool {
        self.inner
            .borrow()
            .entries
            .iter()
            .any(|(entry_id, _)| *entry_id == id)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invokes observers in subscription order.
    ///
    /// Works from a snapshot taken before the first call: observers added
    /// during the pass are not called for this change, and observers removed
    /// during the pass are skipped.
    pub(crate) fn notify(&self, notification: &FilterNotification) {
        let snapshot: Vec<(ObserverId, Callback)> = self.inner.borrow().entries.clone();
        for (id, callback) in snapshot {
            if !self.is_subscribed(id) {
                continue;
            }
            match callback.try_borrow_mut() {
                Ok(mut observer) => (*observer)(notification),
                Err(_) => warn!(observer = id.0, "skipping re-entrant filter observer"),
            }
        }
    }
}
