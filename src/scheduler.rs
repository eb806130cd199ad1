//! Fixed-delay timer that drives a poll job on one dedicated thread.
//!
//! Runs never overlap: the next run starts `period` after the previous one
//! returned. The first run happens immediately.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

#[derive(Debug, Clone)]
pub struct PollScheduler {
    period: Duration,
    max_runs: Option<usize>,
}

impl PollScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            max_runs: None,
        }
    }

    /// Stop by itself after `runs` invocations. `0` means run until stopped.
    pub fn with_max_runs(mut self, runs: usize) -> Self {
        self.max_runs = (runs > 0).then_some(runs);
        self
    }

    /// Spawns the timer thread and starts invoking `job`.
    pub fn start<F>(self, mut job: F) -> std::io::Result<SchedulerHandle>
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let Self { period, max_runs } = self;

        let thread = thread::Builder::new()
            .name("bus-poll-timer".into())
            .spawn(move || {
                info!(?period, ?max_runs, "Poll timer started");
                loop {
                    job();
                    let done = counter.fetch_add(1, Ordering::AcqRel) + 1;

                    if max_runs.is_some_and(|max| done >= max) {
                        debug!(runs = done, "Run limit reached");
                        break;
                    }

                    match stop_rx.recv_timeout(period) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                info!(runs = counter.load(Ordering::Acquire), "Poll timer stopped");
            })?;

        Ok(SchedulerHandle {
            stop: Some(stop_tx),
            thread: Some(thread),
            runs,
        })
    }
}

/// Owner of a running timer thread. Dropping it stops the timer.
pub struct SchedulerHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
    runs: Arc<AtomicUsize>,
}

impl SchedulerHandle {
    /// Number of completed job invocations so far.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::Acquire)
    }

    /// Signals the timer to stop and waits for the current run, if any, to end.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Waits for the timer to finish on its own. Without a run limit this
    /// blocks until the process exits.
    pub fn wait(mut self) {
        self.join();
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.join();
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Poll timer thread panicked");
            }
        }
    }
}

impl Drop for SchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_runs_until_limit() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let handle = PollScheduler::new(Duration::from_millis(5))
            .with_max_runs(3)
            .start(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        handle.wait();
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_first_run_is_immediate_and_stop_is_prompt() {
        let (tx, rx) = mpsc::channel();
        let handle = PollScheduler::new(Duration::from_secs(3600))
            .start(move || {
                let _ = tx.send(());
            })
            .unwrap();

        rx.recv_timeout(Duration::from_secs(5)).unwrap();

        let started = Instant::now();
        handle.stop();
        assert!(started.elapsed() < Duration::from_secs(5));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_huge_period_starts_and_stops() {
        let (tx, rx) = mpsc::channel();
        let handle = PollScheduler::new(Duration::MAX)
            .start(move || {
                let _ = tx.send(());
            })
            .unwrap();

        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        handle.stop();
    }

    #[test]
    fn test_zero_max_runs_means_unbounded() {
        let handle = PollScheduler::new(Duration::from_millis(1))
            .with_max_runs(0)
            .start(|| {})
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.runs() < 5 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(1));
        }
        assert!(handle.runs() >= 5);
        handle.stop();
    }
}
