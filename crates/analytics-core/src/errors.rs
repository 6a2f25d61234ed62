//! The error taxonomy as a real `thiserror` enum
//! instead of prose. Each variant carries a stable `.code()` string and,
//! where useful, a human-facing hint.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("buffer is full: {0}")]
    BufferFull(String),

    #[error("buffer I/O error: {0}")]
    BufferIoError(#[from] std::io::Error),

    #[error("sink init failed: {sink_id}: {reason}")]
    SinkInitFailed { sink_id: String, reason: String },

    #[error("sink write failed: {sink_id}: {reason}")]
    SinkWriteFailed { sink_id: String, reason: String },

    #[error("circuit breaker open for sink {sink_id}")]
    CircuitBreakerOpen { sink_id: String },

    #[error("dead-letter queue I/O error: {0}")]
    DlqIoError(String),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("event failed validation: {0}")]
    EventInvalid(String),
}

impl AnalyticsError {
    /// Stable machine-readable code, independent of the human message.
    pub fn code(&self) -> &'static str {
        match self {
            AnalyticsError::BufferFull(_) => "BufferFull",
            AnalyticsError::BufferIoError(_) => "BufferIOError",
            AnalyticsError::SinkInitFailed { .. } => "SinkInitFailed",
            AnalyticsError::SinkWriteFailed { .. } => "SinkWriteFailed",
            AnalyticsError::CircuitBreakerOpen { .. } => "CircuitBreakerOpen",
            AnalyticsError::DlqIoError(_) => "DLQIOError",
            AnalyticsError::ConfigInvalid(_) => "ConfigInvalid",
            AnalyticsError::EventInvalid(_) => "EventInvalid",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_is_stable_independent_of_message() {
        let e = AnalyticsError::SinkWriteFailed { sink_id: "fs".into(), reason: "disk full".into() };
        assert_eq!(e.code(), "SinkWriteFailed");
        assert!(e.to_string().contains("disk full"));
    }
}
