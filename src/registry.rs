//! Listener registry for one route's poll task.
//!
//! Listeners have no identity beyond their allocation: two `Arc`s pointing at
//! the same listener are the same registration. Duplicate registration is
//! allowed and results in duplicate notifications.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::model::BusPosition;

/// Receives every non-empty batch of bus positions for a route.
///
/// Called synchronously on the poll thread; implementations that need another
/// thread must hand the data off themselves and must not block indefinitely.
pub trait BusUpdateListener: Send + Sync {
    fn on_update_buses(&self, buses: &[BusPosition]);

    /// Short name used in log lines.
    fn name(&self) -> &str {
        "listener"
    }
}

impl<F> BusUpdateListener for F
where
    F: Fn(&[BusPosition]) + Send + Sync,
{
    fn on_update_buses(&self, buses: &[BusPosition]) {
        self(buses)
    }
}

pub type SharedListener = Arc<dyn BusUpdateListener>;

/// Insertion-ordered list of listeners, guarded by a mutex so it can be
/// mutated from any thread while a poll is iterating a snapshot.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Mutex<Vec<SharedListener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `listener`, even if it is already registered.
    pub fn add(&self, listener: SharedListener) {
        self.lock().push(listener);
    }

    /// Removes the first registration of `listener`. Returns `false` if it
    /// was not registered.
    pub fn remove(&self, listener: &SharedListener) -> bool {
        let mut listeners = self.lock();
        match listeners
            .iter()
            .position(|l| std::ptr::addr_eq(Arc::as_ptr(l), Arc::as_ptr(listener)))
        {
            Some(idx) => {
                listeners.remove(idx);
                true
            }
            None => false,
        }
    }

    /// Copy of the current listeners in insertion order.
    pub fn snapshot(&self) -> Vec<SharedListener> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Listeners run outside the lock, so a poisoned guard still holds a
    // consistent Vec.
    fn lock(&self) -> MutexGuard<'_, Vec<SharedListener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
