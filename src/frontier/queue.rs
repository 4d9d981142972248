//! In-memory frontier shared by all workers
//!
//! Every operation takes the same mutex, so a dequeue is exclusive and a
//! commit or requeue is never observed half-applied.

use crate::frontier::{is_storable, FrontierError, FrontierResult, FrontierSnapshot, Side};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What happened to a URL handed back after a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequeueOutcome {
    /// Pushed to the head of the queue
    Front,

    /// Pushed to the tail of the queue (retry budget for priority exhausted)
    Back,

    /// Already completed through another queue entry; not requeued
    Dropped,
}

#[derive(Debug, Default)]
struct FrontierState {
    pending: VecDeque<String>,
    completed: HashSet<String>,
    in_flight: HashSet<String>,
    failures: HashMap<String, u32>,
}

/// Pending queue plus completed set, safe to share between worker threads
#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    max_priority_retries: Option<u32>,
}

impl Frontier {
    /// Creates an empty frontier
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier from a persisted snapshot
    ///
    /// Pending order is preserved; duplicate completed entries collapse.
    pub fn from_snapshot(snapshot: FrontierSnapshot) -> Self {
        let state = FrontierState {
            pending: snapshot.pending.into(),
            completed: snapshot.completed.into_iter().collect(),
            ..FrontierState::default()
        };

        Self {
            state: Mutex::new(state),
            max_priority_retries: None,
        }
    }

    /// Limits how many times a failing URL jumps the queue
    ///
    /// After `max` failures the URL is requeued at the tail instead, so a
    /// permanently broken page cannot monopolize the workers. `None` means
    /// failures are always retried at the head.
    pub fn with_max_priority_retries(mut self, max: Option<u32>) -> Self {
        self.max_priority_retries = max;
        self
    }

    // A worker panicking never leaves the state half-updated, so a poisoned
    // lock is still safe to use and must stay usable for the final save.
    fn lock(&self) -> MutexGuard<'_, FrontierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pushes a URL to either end of the pending queue
    ///
    /// Duplicates are allowed. Returns false (and leaves the queue untouched)
    /// if the URL cannot be represented as one line of `queue.txt`.
    pub fn enqueue(&self, url: &str, side: Side) -> bool {
        if !is_storable(url) {
            tracing::warn!("Rejecting unstorable frontier entry {:?}", url);
            return false;
        }

        let mut state = self.lock();
        match side {
            Side::Back => state.pending.push_back(url.to_string()),
            Side::Front => state.pending.push_front(url.to_string()),
        }
        true
    }

    /// Claims the URL at the head of the queue
    ///
    /// Stale entries (already completed, or currently claimed by another
    /// worker) are discarded on the way. The claimed URL stays in flight until
    /// it is committed or requeued.
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The claimed URL
    /// * `Err(FrontierError::Empty)` - Nothing claimable is left
    pub fn dequeue(&self) -> FrontierResult<String> {
        let mut state = self.lock();

        while let Some(url) = state.pending.pop_front() {
            if state.completed.contains(&url) {
                tracing::trace!("Discarding completed duplicate {}", url);
                continue;
            }

            if state.in_flight.contains(&url) {
                tracing::trace!("Discarding duplicate of in-flight {}", url);
                continue;
            }

            state.in_flight.insert(url.clone());
            return Ok(url);
        }

        Err(FrontierError::Empty)
    }

    /// Marks a URL as completed
    ///
    /// Returns true if the URL was not completed before.
    pub fn commit(&self, url: &str) -> bool {
        let mut state = self.lock();
        state.in_flight.remove(url);
        state.failures.remove(url);
        state.completed.insert(url.to_string())
    }

    /// Hands back a URL whose processing failed
    ///
    /// A URL that is already completed is dropped. Otherwise it goes back to
    /// the head of the queue, or to the tail once its priority retries are
    /// used up.
    pub fn requeue(&self, url: &str) -> RequeueOutcome {
        let mut state = self.lock();
        state.in_flight.remove(url);

        if state.completed.contains(url) {
            state.failures.remove(url);
            return RequeueOutcome::Dropped;
        }

        let failures = {
            let count = state.failures.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        match self.max_priority_retries {
            Some(max) if failures > max => {
                state.pending.push_back(url.to_string());
                RequeueOutcome::Back
            }
            _ => {
                state.pending.push_front(url.to_string());
                RequeueOutcome::Front
            }
        }
    }

    /// Enqueues seed URLs at the tail, skipping anything already pending or
    /// completed
    ///
    /// Running the same seed list twice against the same progress directory
    /// therefore adds nothing the second time.
    ///
    /// # Returns
    ///
    /// The number of URLs actually enqueued
    pub fn seed<I, S>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.lock();
        let mut known: HashSet<String> = state.pending.iter().cloned().collect();
        let mut added = 0;

        for url in urls {
            let url = url.as_ref();
            if !is_storable(url) {
                tracing::warn!("Skipping unstorable seed {:?}", url);
                continue;
            }

            if state.completed.contains(url) || !known.insert(url.to_string()) {
                tracing::debug!("Seed already known: {}", url);
                continue;
            }

            state.pending.push_back(url.to_string());
            added += 1;
        }

        added
    }

    /// Returns true if the URL has been completed
    pub fn is_completed(&self, url: &str) -> bool {
        self.lock().completed.contains(url)
    }

    /// Returns the number of entries in the pending queue
    pub fn remaining(&self) -> usize {
        self.lock().pending.len()
    }

    /// Returns the number of completed URLs
    pub fn completed_count(&self) -> usize {
        self.lock().completed.len()
    }

    /// Returns the number of URLs currently claimed by workers
    pub fn in_flight_count(&self) -> usize {
        self.lock().in_flight.len()
    }

    /// Returns how many times the URL has failed since it last succeeded
    pub fn failures(&self, url: &str) -> u32 {
        self.lock().failures.get(url).copied().unwrap_or(0)
    }

    /// Takes a consistent copy of the frontier for persistence
    ///
    /// URLs still in flight are placed at the head of `pending`, so a worker
    /// that died mid-page never loses its URL.
    pub fn snapshot(&self) -> FrontierSnapshot {
        let state = self.lock();

        let mut in_flight: Vec<String> = state.in_flight.iter().cloned().collect();
        in_flight.sort();

        let pending = in_flight
            .into_iter()
            .chain(state.pending.iter().cloned())
            .collect();

        let mut completed: Vec<String> = state.completed.iter().cloned().collect();
        completed.sort();

        FrontierSnapshot { pending, completed }
    }
}
