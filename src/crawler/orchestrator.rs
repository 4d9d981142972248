//! Crawl orchestration
//!
//! The orchestrator owns one run of the engine:
//! - Loading the frontier from the progress directory and seeding it
//! - Starting one named OS thread per worker
//! - Joining every worker, even after a panic or a failed spawn
//! - Saving the frontier exactly once at the end

use crate::config::Config;
use crate::crawler::pacing::Pacing;
use crate::crawler::signal::TerminationSignal;
use crate::crawler::worker::{ExitReason, Worker, WorkerIdentity, WorkerReport};
use crate::frontier::{Frontier, ProgressStore};
use crate::output::Sink;
use crate::source::PageSource;
use crate::{ConfigError, SweepError};
use std::any::Any;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Default worker name format
pub const DEFAULT_NAME_FORMAT: &str = "Crawler-{}";

/// Engine parameters for one run
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Number of worker threads
    pub workers: usize,

    /// Worker name template; `{}` is replaced by the 1-based index
    pub name_format: String,

    /// Delay policy shared by all workers
    pub pacing: Pacing,

    /// Per-worker limit on failures in a row
    pub max_consecutive_failures: Option<u32>,

    /// Per-URL limit on retries at the head of the queue
    pub max_priority_retries: Option<u32>,
}

impl EngineSettings {
    /// Creates settings with no pacing and no retry limits
    pub fn new(workers: usize) -> Self {
        Self {
            workers,
            name_format: DEFAULT_NAME_FORMAT.to_string(),
            pacing: Pacing::none(),
            max_consecutive_failures: None,
            max_priority_retries: None,
        }
    }

    /// Builds settings from a validated configuration
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(Self {
            workers: config.engine.workers as usize,
            name_format: config.engine.name_format.clone(),
            pacing: Pacing::from_config(&config.pacing)?,
            max_consecutive_failures: config.engine.max_consecutive_failures,
            max_priority_retries: config.engine.max_priority_retries,
        })
    }

    /// Returns the name of the worker at the given 1-based index
    ///
    /// # Example
    ///
    /// ```
    /// use sumi_sweep::crawler::EngineSettings;
    ///
    /// let settings = EngineSettings::new(2);
    /// assert_eq!(settings.worker_name(2), "Crawler-2");
    /// ```
    pub fn worker_name(&self, index: usize) -> String {
        self.name_format.replace("{}", &index.to_string())
    }
}

/// Outcome of a completed run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// One report per worker, in index order
    pub workers: Vec<WorkerReport>,

    /// Seed URLs newly added at startup
    pub seeded: usize,

    /// URLs left in the saved queue
    pub pending: usize,

    /// URLs in the saved history
    pub completed: usize,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl RunReport {
    /// Total URLs committed during this run
    pub fn processed(&self) -> u64 {
        self.workers.iter().map(|w| w.processed).sum()
    }

    /// Total failed attempts during this run
    pub fn failures(&self) -> u64 {
        self.workers.iter().map(|w| w.failures).sum()
    }

    /// Total records handed to the sink during this run
    pub fn records(&self) -> u64 {
        self.workers.iter().map(|w| w.records).sum()
    }

    /// Returns true if any worker stopped because of the termination signal
    pub fn interrupted(&self) -> bool {
        self.workers
            .iter()
            .any(|w| w.exit == ExitReason::Terminated)
    }
}

/// Runs a set of workers over a persisted frontier
pub struct Orchestrator<R> {
    settings: EngineSettings,
    store: ProgressStore,
    frontier: Arc<Frontier>,
    signal: Arc<TerminationSignal>,
    sink: Arc<dyn Sink<R>>,
    seeded: usize,
}

impl<R: Send + 'static> Orchestrator<R> {
    /// Loads the frontier and seeds it
    ///
    /// Seeds already pending or completed are skipped, so restarting with the
    /// same seed list resumes instead of starting over.
    ///
    /// # Arguments
    ///
    /// * `settings` - Engine parameters
    /// * `store` - Progress directory to load from and save to
    /// * `seeds` - Start URLs
    /// * `sink` - Receives every extracted record
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Ready to run
    /// * `Err(SweepError)` - The progress files could not be loaded
    pub fn new<I, S>(
        settings: EngineSettings,
        store: ProgressStore,
        seeds: I,
        sink: Arc<dyn Sink<R>>,
    ) -> Result<Self, SweepError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let snapshot = store.load()?;
        tracing::info!(
            "Loaded frontier from {}: {} pending, {} completed",
            store.dir().display(),
            snapshot.pending.len(),
            snapshot.completed.len()
        );

        let frontier = Frontier::from_snapshot(snapshot)
            .with_max_priority_retries(settings.max_priority_retries);

        let seeded = frontier.seed(seeds);
        if seeded > 0 {
            tracing::info!("Seeded frontier with {} new URL(s)", seeded);
        }

        Ok(Self {
            settings,
            store,
            frontier: Arc::new(frontier),
            signal: Arc::new(TerminationSignal::new()),
            sink,
            seeded,
        })
    }

    /// Returns the shared frontier
    pub fn frontier(&self) -> &Arc<Frontier> {
        &self.frontier
    }

    /// Returns the shared termination signal
    ///
    /// Triggering it asks every worker to stop after its current URL.
    pub fn signal(&self) -> Arc<TerminationSignal> {
        Arc::clone(&self.signal)
    }

    /// Returns how many seeds were newly enqueued
    pub fn seeded(&self) -> usize {
        self.seeded
    }

    /// Runs the workers to completion and saves the frontier
    ///
    /// `factory` is called once per worker, on that worker's thread, to build
    /// its page source. The frontier is saved on every path. If a worker
    /// panicked or could not be started, the error is returned after the
    /// save.
    ///
    /// # Returns
    ///
    /// * `Ok(RunReport)` - Every worker exited normally
    /// * `Err(SweepError::Worker)` - A worker panicked or failed to spawn
    /// * `Err(SweepError::Frontier)` - The final save failed
    pub fn run<S, F>(self, factory: F) -> Result<RunReport, SweepError>
    where
        S: PageSource<Record = R> + 'static,
        F: Fn(&WorkerIdentity) -> S + Send + Sync + 'static,
    {
        let started = Instant::now();
        let factory = Arc::new(factory);
        let mut handles: Vec<(String, JoinHandle<WorkerReport>)> = Vec::new();
        let mut worker_errors: Vec<(String, String)> = Vec::new();

        tracing::info!("Starting {} worker(s)", self.settings.workers);

        for index in 1..=self.settings.workers {
            let identity = WorkerIdentity {
                index,
                name: self.settings.worker_name(index),
            };
            let name = identity.name.clone();

            let factory = Arc::clone(&factory);
            let frontier = Arc::clone(&self.frontier);
            let signal = Arc::clone(&self.signal);
            let sink = Arc::clone(&self.sink);
            let pacing = self.settings.pacing.clone();
            let max_failures = self.settings.max_consecutive_failures;

            let spawned = thread::Builder::new().name(name.clone()).spawn(move || {
                let _guard = PanicGuard {
                    signal: Arc::clone(&signal),
                };
                let source = factory(&identity);
                Worker::new(identity, source, frontier, signal, sink, pacing)
                    .with_max_consecutive_failures(max_failures)
                    .run()
            });

            match spawned {
                Ok(handle) => handles.push((name, handle)),
                Err(e) => {
                    tracing::error!("Failed to spawn worker {}: {}", name, e);
                    self.signal.trigger();
                    worker_errors.push((name, format!("failed to spawn thread: {}", e)));
                    break;
                }
            }
        }

        let mut reports = Vec::with_capacity(handles.len());
        for (name, handle) in handles {
            match handle.join() {
                Ok(report) => reports.push(report),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!("Worker {} panicked: {}", name, message);
                    self.signal.trigger();
                    worker_errors.push((name, format!("panicked: {}", message)));
                }
            }
        }

        let snapshot = self.frontier.snapshot();
        self.store.save(&snapshot)?;

        let report = RunReport {
            workers: reports,
            seeded: self.seeded,
            pending: snapshot.pending.len(),
            completed: snapshot.completed.len(),
            elapsed: started.elapsed(),
        };

        tracing::info!(
            "Run finished in {:.1}s: {} processed, {} failed attempts, {} pending, {} completed",
            report.elapsed.as_secs_f64(),
            report.processed(),
            report.failures(),
            report.pending,
            report.completed
        );

        match worker_errors.into_iter().next() {
            Some((name, message)) => Err(SweepError::Worker { name, message }),
            None => Ok(report),
        }
    }
}

/// Raises the termination signal if the worker thread unwinds
struct PanicGuard {
    signal: Arc<TerminationSignal>,
}

impl Drop for PanicGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            self.signal.trigger();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
