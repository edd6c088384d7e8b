use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
    /// Extraction or decoding failed for one frame. Consumers degrade
    /// (blank thumbnail, skipped preload) instead of surfacing this.
    #[error("source unavailable: {source_id} at {timestamp:.3}s: {reason}")]
    SourceUnavailable {
        source_id: String,
        timestamp: f64,
        reason: String,
    },
}

impl CacheError {
    pub fn source_unavailable(
        source_id: impl Into<String>,
        timestamp: f64,
        reason: impl Into<String>,
    ) -> Self {
        Self::SourceUnavailable {
            source_id: source_id.into(),
            timestamp,
            reason: reason.into(),
        }
    }
}
