use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Errors raised by an [`ActivitySource`](super::ActivitySource).
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The health check failed; the source was not queried.
    #[error("Source unavailable: {message}")]
    Unavailable { message: String },

    /// Every list the source was asked for failed.
    #[error("All {} lists failed: {}", .failures.len(), join_failures(.failures))]
    Fetch { failures: BTreeMap<String, String> },

    /// The run was cancelled while this source was working.
    #[error("Cancelled")]
    Cancelled,

    /// Unexpected/internal error.
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl SourceError {
    #[inline]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    #[inline]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

fn join_failures(failures: &BTreeMap<String, String>) -> String {
    failures
        .iter()
        .map(|(id, err)| format!("{id}: {err}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Per-source failures collected during one `generate` run.
#[derive(Debug, Clone, Default)]
pub struct AggregateError {
    failures: BTreeMap<String, SourceError>,
}

impl AggregateError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source: impl Into<String>, error: SourceError) {
        self.failures.insert(source.into(), error);
    }

    pub fn get(&self, source: &str) -> Option<&SourceError> {
        self.failures.get(source)
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SourceError)> {
        self.failures.iter()
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} source(s) failed", self.failures.len())?;
        for (source, err) in &self.failures {
            write!(f, "\n  {source}: {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Fatal outcomes of [`Generator::generate`](super::Generator::generate).
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Cancellation was observed before visiting a source.
    #[error("Report generation cancelled")]
    Cancelled,

    /// No source produced any task and at least one failed.
    #[error("Failed to fetch from all sources: {0}")]
    AllSourcesFailed(AggregateError),
}
