//! Composite and in-memory sinks

use crate::output::traits::{Sink, SinkResult};
use std::sync::{Mutex, PoisonError};

/// Runs a batch through several sinks in order
///
/// The first failing stage aborts the batch; later stages do not see it.
pub struct Pipeline<R> {
    stages: Vec<Box<dyn Sink<R>>>,
}

impl<R> Pipeline<R> {
    /// Creates an empty pipeline
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Appends a stage
    pub fn with_stage(mut self, stage: impl Sink<R> + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Appends a stage in place
    pub fn add(&mut self, stage: impl Sink<R> + 'static) {
        self.stages.push(Box::new(stage));
    }

    /// Returns the number of stages
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the pipeline has no stages
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

impl<R> Default for Pipeline<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Sink<R> for Pipeline<R> {
    fn consume(&self, records: &[R]) -> SinkResult<()> {
        for stage in &self.stages {
            stage.consume(records)?;
        }
        Ok(())
    }
}

/// Collects every record in memory
#[derive(Debug, Default)]
pub struct MemorySink<R> {
    records: Mutex<Vec<R>>,
    batches: Mutex<usize>,
}

impl<R: Clone> MemorySink<R> {
    /// Creates an empty sink
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            batches: Mutex::new(0),
        }
    }

    /// Returns a copy of everything consumed so far
    pub fn records(&self) -> Vec<R> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns how many batches were consumed, empty ones included
    pub fn batches(&self) -> usize {
        *self.batches.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: Clone + Send> Sink<R> for MemorySink<R> {
    fn consume(&self, records: &[R]) -> SinkResult<()> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(records);
        *self.batches.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        Ok(())
    }
}
