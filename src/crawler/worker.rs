//! Crawl worker
//!
//! A worker owns one [`PageSource`] and runs on its own OS thread. It claims
//! URLs from the shared [`Frontier`], hands the extracted records to the
//! [`Sink`], commits the URL and enqueues whatever the page linked to. Any
//! failure puts the URL back so another attempt picks it up later.

use crate::crawler::pacing::Pacing;
use crate::crawler::signal::TerminationSignal;
use crate::frontier::{Frontier, RequeueOutcome, Side};
use crate::output::{Sink, SinkError};
use crate::source::PageSource;
use std::error::Error as StdError;
use std::sync::Arc;
use thiserror::Error;

/// Name and position of a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerIdentity {
    /// 1-based index within the run
    pub index: usize,

    /// Name used in log lines and as the thread name
    pub name: String,
}

/// Why a worker stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The pending queue was empty
    Drained,

    /// The termination signal was raised
    Terminated,

    /// Too many attempts failed in a row
    FailureLimit,

    /// `on_start` failed; no URL was claimed
    StartFailed,
}

/// Counters collected by one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerReport {
    pub name: String,

    /// URLs committed
    pub processed: u64,

    /// Failed attempts
    pub failures: u64,

    /// Failed URLs put back into the queue
    pub requeued: u64,

    /// Failed URLs dropped because they were completed elsewhere
    pub dropped: u64,

    /// Records handed to the sink
    pub records: u64,

    /// Discovered URLs enqueued
    pub discovered: u64,

    pub exit: ExitReason,
}

impl WorkerReport {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            processed: 0,
            failures: 0,
            requeued: 0,
            dropped: 0,
            records: 0,
            discovered: 0,
            exit: ExitReason::Drained,
        }
    }
}

/// A failed attempt at one URL
#[derive(Debug, Error)]
enum AttemptError<E: StdError + 'static> {
    #[error("page source failed")]
    Source(#[source] E),

    #[error("sink rejected records")]
    Sink(#[source] SinkError),
}

/// One crawl worker
pub struct Worker<S: PageSource> {
    identity: WorkerIdentity,
    source: S,
    frontier: Arc<Frontier>,
    signal: Arc<TerminationSignal>,
    sink: Arc<dyn Sink<S::Record>>,
    pacing: Pacing,
    max_consecutive_failures: Option<u32>,
}

impl<S: PageSource> Worker<S> {
    /// Creates a worker
    ///
    /// # Arguments
    ///
    /// * `identity` - Name and index assigned by the orchestrator
    /// * `source` - This worker's page source
    /// * `frontier` - Shared frontier
    /// * `signal` - Shared termination signal
    /// * `sink` - Shared record sink
    /// * `pacing` - Delay policy applied after every attempt
    pub fn new(
        identity: WorkerIdentity,
        source: S,
        frontier: Arc<Frontier>,
        signal: Arc<TerminationSignal>,
        sink: Arc<dyn Sink<S::Record>>,
        pacing: Pacing,
    ) -> Self {
        Self {
            identity,
            source,
            frontier,
            signal,
            sink,
            pacing,
            max_consecutive_failures: None,
        }
    }

    /// Stops the worker after `max` failed attempts in a row
    pub fn with_max_consecutive_failures(mut self, max: Option<u32>) -> Self {
        self.max_consecutive_failures = max;
        self
    }

    /// Returns the worker's identity
    pub fn identity(&self) -> &WorkerIdentity {
        &self.identity
    }

    /// Runs until the queue drains, the signal is raised or the failure limit
    /// is hit
    ///
    /// `on_exit` is called on every path, including a failed `on_start`.
    pub fn run(mut self) -> WorkerReport {
        let mut report = WorkerReport::new(&self.identity.name);

        if let Err(e) = self.source.on_start() {
            tracing::error!(
                "{}: page source failed to start: {}",
                self.identity.name,
                error_chain(&e)
            );
            report.exit = ExitReason::StartFailed;
            self.source.on_exit();
            return report;
        }

        tracing::info!("{} started", self.identity.name);
        let exit = self.run_loop(&mut report);
        report.exit = exit;
        self.source.on_exit();

        tracing::info!(
            "{} stopped ({:?}): {} processed, {} failed, {} records",
            self.identity.name,
            report.exit,
            report.processed,
            report.failures,
            report.records
        );

        report
    }

    fn run_loop(&mut self, report: &mut WorkerReport) -> ExitReason {
        let mut consecutive_failures = 0u32;

        loop {
            if self.signal.is_set() {
                return ExitReason::Terminated;
            }
            if self.frontier.remaining() == 0 {
                return ExitReason::Drained;
            }

            // Another worker may have emptied the queue since the check above
            let Ok(url) = self.frontier.dequeue() else {
                continue;
            };

            tracing::debug!("{}: processing {}", self.identity.name, url);

            match self.attempt(&url) {
                Ok((records, discovered)) => {
                    consecutive_failures = 0;
                    report.processed += 1;
                    report.records += records;
                    report.discovered += discovered;
                }
                Err(e) => {
                    consecutive_failures += 1;
                    report.failures += 1;
                    self.handle_failure(&url, &e, report);

                    if let Some(max) = self.max_consecutive_failures {
                        if consecutive_failures >= max {
                            tracing::warn!(
                                "{}: {} consecutive failures, stopping",
                                self.identity.name,
                                consecutive_failures
                            );
                            return ExitReason::FailureLimit;
                        }
                    }
                }
            }

            if self.pacing.sleep(1, &self.signal) {
                return ExitReason::Terminated;
            }
        }
    }

    /// Processes one claimed URL
    ///
    /// Returns the number of records emitted and of discovered URLs enqueued.
    /// The URL is committed only after the sink accepted the records.
    fn attempt(&mut self, url: &str) -> Result<(u64, u64), AttemptError<S::Error>> {
        let page = self
            .source
            .fetch_and_parse(url)
            .map_err(AttemptError::Source)?;

        self.sink.consume(&page.records).map_err(AttemptError::Sink)?;
        self.frontier.commit(url);

        let mut enqueued = 0;
        for link in &page.discovered {
            if self.frontier.is_completed(link) {
                continue;
            }
            if self.frontier.enqueue(link, Side::Back) {
                enqueued += 1;
            }
        }

        Ok((page.records.len() as u64, enqueued))
    }

    fn handle_failure(
        &mut self,
        url: &str,
        error: &AttemptError<S::Error>,
        report: &mut WorkerReport,
    ) {
        self.source.on_parse_error();

        tracing::error!(
            "{}: failed to process {}: {}",
            self.identity.name,
            url,
            error_chain(error)
        );

        match self.frontier.requeue(url) {
            RequeueOutcome::Front => report.requeued += 1,
            RequeueOutcome::Back => {
                report.requeued += 1;
                tracing::warn!(
                    "{}: {} failed {} times, moved to the back of the queue",
                    self.identity.name,
                    url,
                    self.frontier.failures(url)
                );
            }
            RequeueOutcome::Dropped => {
                report.dropped += 1;
                tracing::debug!(
                    "{}: {} already completed, not requeued",
                    self.identity.name,
                    url
                );
            }
        }
    }
}

/// Formats an error with all of its sources
fn error_chain(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
