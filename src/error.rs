//! Error types for the timeline engine.
//!
//! Per the engine's error handling design, almost nothing here is fatal:
//! invalid property specs, unresolved selectors and unsupported DOM writes
//! are logged and skipped (see [`crate::log`]). The only error that
//! propagates to the caller is [`EngineError::AsyncPipeExhausted`], raised
//! when [`crate::timeline::Timeline::move_to`] cannot settle the structural
//! discovery of a frame within a bounded number of iterations.

use thiserror::Error;

/// Errors that can propagate out of the public API.
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    /// The async pipe did not settle within
    /// [`crate::config::EngineConfig::max_async_iterations`] iterations.
    ///
    /// This indicates an instruction closure (or a closure it awaited) keeps
    /// registering new entities every time it is polled, which would
    /// otherwise spin the scheduler forever.
    #[error("max async loop reached ({0} iterations)")]
    AsyncPipeExhausted(u32),

    /// An instruction closure for a given [`crate::timeline::Timeline`] was
    /// spawned more than once. This is a programming error in the engine
    /// itself (an instruction function is a single-shot, per the contract in
    /// §4.3) rather than something user code can trigger.
    #[error("instruction closure spawned more than once for the same timeline")]
    InvalidInstructionReentry,

    /// Debug-only invariant guard: `move_to` was asked to seek to a time
    /// that is not a multiple of [`crate::config::FRAME_MS`] away from the
    /// previous position. The public `Player` driver never does this; it
    /// exists to catch misuse of `Timeline::move_to` directly in tests.
    #[error("seek target {0} is not frame-aligned from current position")]
    NonMonotonicSeek(i64),
}

pub type EngineResult<T> = Result<T, EngineError>;
