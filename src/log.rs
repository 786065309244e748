//! Thin logging shims.
//!
//! The engine never fails the caller for user-data errors (invalid tween
//! specs, unresolved selectors, unsupported DOM writes); it logs and moves
//! on. These macros route through `tracing` when the `tracing` feature is
//! enabled (the default) and become no-ops otherwise, so the crate builds
//! with zero logging dependencies when a downstream embedder wants that.

#[cfg(feature = "tracing")]
macro_rules! engine_warn {
    ($($arg:tt)*) => { tracing::warn!($($arg)*) };
}
#[cfg(not(feature = "tracing"))]
macro_rules! engine_warn {
    ($($arg:tt)*) => {{}};
}

pub(crate) use engine_warn;
