//! Crawler module: the crawl orchestration engine
//!
//! This module contains the core crawling logic, including:
//! - The shared termination signal
//! - Randomized pacing between requests
//! - Workers that claim, process, commit or requeue URLs
//! - The orchestrator that runs workers and persists the frontier

mod orchestrator;
mod pacing;
mod signal;
mod worker;

pub use orchestrator::{EngineSettings, Orchestrator, RunReport, DEFAULT_NAME_FORMAT};
pub use pacing::Pacing;
pub use signal::TerminationSignal;
pub use worker::{ExitReason, Worker, WorkerIdentity, WorkerReport};

use crate::config::Config;
use crate::frontier::ProgressStore;
use crate::output::{Sink, SqliteSink};
use crate::source::{build_http_client, HttpPageSource, PageRecord};
use crate::url::normalize_url;
use crate::SweepError;
use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Handle;

/// Normalizes seed URLs the same way discovered links are normalized
///
/// Seeds and links then share one spelling per page, so a page that links to
/// its own seed URL is not enqueued a second time.
pub fn prepare_seeds(seeds: &[String]) -> Result<Vec<String>, SweepError> {
    seeds
        .iter()
        .map(|seed| {
            normalize_url(seed)
                .map(|url| url.to_string())
                .map_err(SweepError::from)
        })
        .collect()
}

/// Runs a complete crawl operation
///
/// This is the main entry point used by the binary. It will:
/// 1. Open the SQLite output
/// 2. Load (or, with `fresh`, clear) the progress directory and seed it with
///    the normalized seed URLs
/// 3. Run one [`HttpPageSource`] worker per configured slot
/// 4. Stop the workers cooperatively on Ctrl-C
/// 5. Save the frontier
///
/// The engine itself is blocking, so it runs on tokio's blocking pool while
/// this task waits for either its completion or Ctrl-C.
///
/// # Arguments
///
/// * `config` - The crawler configuration
/// * `fresh` - Discard saved progress before starting
///
/// # Returns
///
/// * `Ok(RunReport)` - Crawl finished or was interrupted cleanly
/// * `Err(SweepError)` - Crawl failed
pub async fn crawl(config: Config, fresh: bool) -> Result<RunReport, SweepError> {
    let store = ProgressStore::new(&config.engine.progress_dir);
    if fresh {
        tracing::info!("Clearing saved progress in {}", store.dir().display());
        store.clear()?;
    }

    let client = build_http_client(&config.user_agent, &config.fetch)?;
    let sink: Arc<dyn Sink<PageRecord>> =
        Arc::new(SqliteSink::new(Path::new(&config.output.database_path))?);

    let seeds = prepare_seeds(&config.engine.seeds)?;
    let settings = EngineSettings::from_config(&config)?;
    let orchestrator = Orchestrator::new(settings, store, &seeds, sink)?;
    let signal = orchestrator.signal();

    let runtime = Handle::current();
    let same_site_only = config.fetch.same_site_only;
    let mut task = tokio::task::spawn_blocking(move || {
        orchestrator.run(move |identity: &WorkerIdentity| {
            HttpPageSource::new(
                identity.name.clone(),
                client.clone(),
                runtime.clone(),
                same_site_only,
            )
        })
    });

    let joined = tokio::select! {
        joined = &mut task => joined,
        interrupt = tokio::signal::ctrl_c() => {
            match interrupt {
                Ok(()) => {
                    tracing::info!("Interrupt received, finishing in-flight pages");
                    signal.trigger();
                }
                Err(e) => tracing::warn!("Failed to listen for Ctrl-C: {}", e),
            }
            task.await
        }
    };

    joined.map_err(|e| SweepError::Worker {
        name: "orchestrator".to_string(),
        message: e.to_string(),
    })?
}
