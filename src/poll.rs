//! # BusPollTask: one fetch-and-notify cycle per invocation
//!
//! The task is driven by an external periodic scheduler. Each call to
//! [`BusPollTask::run`] fetches the positions for its route and hands the
//! result to every registered listener on the calling thread.
//!
//! ## State
//! ```text
//!   Idle ──run()──► Polling ──(fetch ok/err, listeners done, or panic)──► Idle
//!                                                          │
//!                                                          └─► notify_all waiters
//! ```
//!
//! ## Guarantees
//! - The task is back to `Idle` whenever `run` returns or unwinds, and stays
//!   `Polling` while any overlapping `run` on the same task is in flight.
//! - A failed fetch notifies nobody; the failure is only logged.
//! - A panicking listener is logged and skipped; later listeners still run.
//! - `run` never panics into the scheduler.
//!
//! ## Not guaranteed
//! - Listeners registered while a cycle is already notifying may or may not
//!   see that cycle.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, error, info_span, warn};

use crate::model::{BusPosition, Route};
use crate::registry::{ListenerRegistry, SharedListener};
use crate::source::TransitDataSource;

/// What one invocation of [`BusPollTask::run`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The fetch failed (or panicked); nobody was notified.
    Failed,
    /// The fetch returned no buses; nobody was notified.
    Empty,
    /// `buses` positions were delivered; `listeners` calls completed without panicking.
    Delivered { buses: usize, listeners: usize },
}

/// Count of in-flight runs plus the lock/condvar pair that lets other threads
/// wait for it to drop to zero. The count is only written under `lock`, so
/// overlapping runs keep the task `Polling` until the last one ends.
#[derive(Default)]
struct PollState {
    running: AtomicUsize,
    lock: Mutex<()>,
    idle: Condvar,
}

impl PollState {
    fn begin(&self) -> PollingGuard<'_> {
        let _held = self.guard();
        self.running.fetch_add(1, Ordering::AcqRel);
        PollingGuard { state: self }
    }

    fn finish(&self) {
        let _held = self.guard();
        if self.running.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_all();
        }
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Resets the state to idle on drop, including during unwinding.
struct PollingGuard<'a> {
    state: &'a PollState,
}

impl Drop for PollingGuard<'_> {
    fn drop(&mut self) {
        self.state.finish();
    }
}

/// Periodic poll of one route, fanned out to a shared listener registry.
pub struct BusPollTask<S> {
    route: Route,
    source: S,
    registry: Arc<ListenerRegistry>,
    state: PollState,
}

impl<S: TransitDataSource> BusPollTask<S> {
    pub fn new(route: Route, source: S, registry: Arc<ListenerRegistry>) -> Self {
        Self {
            route,
            source,
            registry,
            state: PollState::default(),
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn registry(&self) -> &Arc<ListenerRegistry> {
        &self.registry
    }

    pub fn add_listener(&self, listener: SharedListener) {
        self.registry.add(listener);
    }

    pub fn remove_listener(&self, listener: &SharedListener) -> bool {
        self.registry.remove(listener)
    }

    /// True while a fetch-and-notify cycle is in flight.
    pub fn is_polling(&self) -> bool {
        self.state.running.load(Ordering::Acquire) > 0
    }

    /// Runs one fetch-and-notify cycle on the calling thread.
    pub fn run(&self) -> PollOutcome {
        let _polling = self.state.begin();
        let span = info_span!("bus_poll", route = %self.route);
        let _entered = span.enter();

        let fetched = catch_unwind(AssertUnwindSafe(|| {
            self.source.fetch_bus_positions(&self.route)
        }));

        let buses = match fetched {
            Ok(Ok(buses)) => buses,
            Ok(Err(e)) => {
                warn!(error = %e, kind = e.as_label(), "Bus fetch failed, skipping this cycle");
                return PollOutcome::Failed;
            }
            Err(panic) => {
                error!(panic = panic_message(&*panic), "Bus source panicked, skipping this cycle");
                return PollOutcome::Failed;
            }
        };

        if buses.is_empty() {
            debug!("No buses reported");
            return PollOutcome::Empty;
        }

        let listeners = self.notify(&buses);
        PollOutcome::Delivered {
            buses: buses.len(),
            listeners,
        }
    }

    fn notify(&self, buses: &[BusPosition]) -> usize {
        let snapshot = self.registry.snapshot();
        debug!(buses = buses.len(), listeners = snapshot.len(), "Notifying listeners");

        let mut delivered = 0;
        for listener in &snapshot {
            match catch_unwind(AssertUnwindSafe(|| listener.on_update_buses(buses))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    error!(
                        listener = listener.name(),
                        panic = panic_message(&*panic),
                        "Listener panicked"
                    );
                }
            }
        }
        delivered
    }

    /// Blocks until no cycle is in flight. Returns immediately when idle.
    pub fn await_completion(&self) {
        let mut held = self.state.guard();
        while self.is_polling() {
            held = self
                .state
                .idle
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Like [`await_completion`](Self::await_completion) but gives up after
    /// `timeout`. Returns `true` if the task was idle on return.
    pub fn await_completion_timeout(&self, timeout: Duration) -> bool {
        let held = self.state.guard();
        let (_held, _) = self
            .state
            .idle
            .wait_timeout_while(held, timeout, |_| self.is_polling())
            .unwrap_or_else(PoisonError::into_inner);
        !self.is_polling()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
