use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::upstream::UpstreamError;

#[derive(Debug, Error)]
/// Per-candidate scoring failure. Never aborts a batch.
pub enum ScoringError {
    /// Provider payload matched neither logprob shape, or held invalid values.
    #[error("unrecognized upstream payload: {reason}")]
    UpstreamShape {
        reason: String,
        /// Raw payload for diagnostics; logged, not returned to clients.
        payload: Box<serde_json::Value>,
    },

    /// Candidate text could not be located at a token boundary.
    #[error("cannot align candidate with echoed tokens: {reason}")]
    SegmentAlignment { reason: String },

    /// Answer segment had no scored tokens.
    #[error("answer segment contains no scored tokens")]
    EmptySegment,

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// The request deadline passed before this candidate finished.
    #[error("request deadline of {}ms exceeded before scoring finished", .deadline.as_millis())]
    Timeout { deadline: Duration },

    /// The scoring task itself failed (panicked or was cancelled).
    #[error("scoring task failed: {0}")]
    Internal(String),
}

impl ScoringError {
    pub fn upstream_shape(reason: impl Into<String>, payload: &serde_json::Value) -> Self {
        ScoringError::UpstreamShape {
            reason: reason.into(),
            payload: Box::new(payload.clone()),
        }
    }

    pub fn alignment(reason: impl Into<String>) -> Self {
        ScoringError::SegmentAlignment {
            reason: reason.into(),
        }
    }

    /// Stable kind reported in results.
    pub fn kind(&self) -> ScoringErrorKind {
        match self {
            ScoringError::UpstreamShape { .. } => ScoringErrorKind::UpstreamShapeError,
            ScoringError::SegmentAlignment { .. } => ScoringErrorKind::SegmentAlignmentError,
            ScoringError::EmptySegment => ScoringErrorKind::EmptySegmentError,
            ScoringError::Upstream(e) => match e {
                UpstreamError::Unavailable { .. } => ScoringErrorKind::UpstreamUnavailableError,
                UpstreamError::EchoUnsupported { .. } | UpstreamError::Rejected { .. } => {
                    ScoringErrorKind::UpstreamRejectedError
                }
                UpstreamError::InvalidJson(_) => ScoringErrorKind::UpstreamShapeError,
                UpstreamError::InvalidPath(_) => ScoringErrorKind::InternalError,
            },
            ScoringError::Timeout { .. } => ScoringErrorKind::TimeoutError,
            ScoringError::Internal(_) => ScoringErrorKind::InternalError,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
/// Error kinds as they appear in `results[].error.kind`.
pub enum ScoringErrorKind {
    UpstreamShapeError,
    SegmentAlignmentError,
    EmptySegmentError,
    UpstreamUnavailableError,
    UpstreamRejectedError,
    TimeoutError,
    InternalError,
}

impl ScoringErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoringErrorKind::UpstreamShapeError => "upstream_shape_error",
            ScoringErrorKind::SegmentAlignmentError => "segment_alignment_error",
            ScoringErrorKind::EmptySegmentError => "empty_segment_error",
            ScoringErrorKind::UpstreamUnavailableError => "upstream_unavailable_error",
            ScoringErrorKind::UpstreamRejectedError => "upstream_rejected_error",
            ScoringErrorKind::TimeoutError => "timeout_error",
            ScoringErrorKind::InternalError => "internal_error",
        }
    }
}

impl std::fmt::Display for ScoringErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
