//! Progress statistics
//!
//! Summarizes the persisted frontier and the output database without
//! crawling anything. Used by `--stats`.

use crate::frontier::ProgressStore;
use crate::output::SqliteSink;
use crate::SweepError;
use std::path::Path;

/// Progress summary
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlStatistics {
    /// URLs still waiting in `queue.txt`
    pub pending: u64,

    /// URLs recorded in `history.txt`
    pub completed: u64,

    /// Rows in the output database, if it exists
    pub records: Option<u64>,

    /// Image URLs in the output database, if it exists
    pub images: Option<u64>,
}

impl CrawlStatistics {
    /// Fraction of known URLs that are completed, as a percentage
    pub fn completion_rate(&self) -> f64 {
        let total = self.pending + self.completed;
        if total == 0 {
            0.0
        } else {
            (self.completed as f64 / total as f64) * 100.0
        }
    }
}

/// Loads statistics from the progress directory and output database
///
/// A missing database is not an error; it means nothing was written yet.
///
/// # Arguments
///
/// * `store` - The progress directory
/// * `database_path` - Path to the SQLite output
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(SweepError)` - The progress files or the database could not be read
pub fn load_statistics(store: &ProgressStore, database_path: &Path) -> Result<CrawlStatistics, SweepError> {
    let snapshot = store.load()?;

    let (records, images) = if database_path.exists() {
        let sink = SqliteSink::new(database_path)?;
        (Some(sink.count_records()?), Some(sink.count_images()?))
    } else {
        (None, None)
    };

    Ok(CrawlStatistics {
        pending: snapshot.pending.len() as u64,
        completed: snapshot.completed.len() as u64,
        records,
        images,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Frontier:");
    println!("  Pending URLs: {}", stats.pending);
    println!("  Completed URLs: {}", stats.completed);
    println!();

    println!("Output:");
    match (stats.records, stats.images) {
        (Some(records), Some(images)) => {
            println!("  Page records: {}", records);
            println!("  Image URLs: {}", images);
        }
        _ => println!("  No output database yet"),
    }
    println!();

    println!(
        "Completion: {:.1}% ({} / {} known URLs)",
        stats.completion_rate(),
        stats.completed,
        stats.pending + stats.completed
    );
}
