//! Error taxonomy for the render graph core.
//!
//! Every failure mode named in the design is a distinct variant so a caller
//! can branch on what went wrong instead of matching on a formatted string.
//! `ArenaExhausted` and `StateTrackingFailure` are fatal: they indicate a
//! bug in the graph or its caller rather than recoverable input, and the
//! host renderer is expected to treat them as non-recoverable for the
//! frame in flight.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RenderGraphError>;

#[derive(Debug, Error)]
pub enum RenderGraphError {
    #[error("duplicate pass name `{0}`")]
    DuplicatePassName(String),

    #[error("pass `{pass}` reads resource `{resource}` which no pass in the graph writes")]
    ReadWithoutProducer { pass: String, resource: String },

    #[error("pass `{pass}` used a handle that belongs to a different graph")]
    ForeignHandle { pass: String },

    #[error(
        "passes `{a}` and `{b}` both declare a write to overlapping subresources of `{resource}`"
    )]
    WriteSetOverlap {
        a: String,
        b: String,
        resource: String,
    },

    #[error("dependency cycle detected: {}", .cycle.join(" -> "))]
    CycleDetected { cycle: Vec<String> },

    #[error("frame arena exhausted: requested {requested} bytes, {available} available")]
    ArenaExhausted { requested: usize, available: usize },

    #[error("device failed to create resource `{resource}`: {reason}")]
    ResourceUnavailable { resource: String, reason: String },

    #[error("resource state tracker could not reconcile `{resource}`: {detail}")]
    StateTrackingFailure { resource: String, detail: String },

    #[error("command recorder error: {0}")]
    RecorderError(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl RenderGraphError {
    /// Fatal conditions indicate an engine bug rather than recoverable input;
    /// the core never retries them, and the caller should drop the frame and
    /// not attempt to keep using the graph.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ArenaExhausted { .. } | Self::StateTrackingFailure { .. }
        )
    }

    pub fn recorder(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::RecorderError(Box::new(err))
    }
}
