//! Destinations for progress records.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::model::ProgressRecord;
use crate::error::{DatabaseError, SubmissionError};

/// Accepts progress records keyed by session id with upsert semantics.
#[async_trait]
pub trait LeadSink: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &str;

    /// Insert or merge the record for `record.session_id`.
    async fn upsert(&self, record: &ProgressRecord) -> Result<(), SubmissionError>;
}

/// Fans a record out to every configured sink.
///
/// Every sink is attempted even when an earlier one fails; the first error is
/// returned so the caller can offer a retry.
#[derive(Default, Clone)]
pub struct CompositeSink {
    sinks: Vec<Arc<dyn LeadSink>>,
}

impl CompositeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn LeadSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl LeadSink for CompositeSink {
    fn name(&self) -> &str {
        "composite"
    }

    async fn upsert(&self, record: &ProgressRecord) -> Result<(), SubmissionError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = sink.upsert(record).await {
                warn!(
                    sink = sink.name(),
                    session_id = %record.session_id,
                    error = %e,
                    "Lead sink failed"
                );
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

/// Read side of progressive tracking. Used to bring back sessions that are no
/// longer held in memory.
#[async_trait]
pub trait ProgressSource: Send + Sync {
    async fn load(&self, session_id: &str) -> Result<Option<ProgressRecord>, DatabaseError>;
}
