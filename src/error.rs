//! Error types for the role-handle API.
//!
//! The ring has exactly two failure modes, both capacity failures: pushing
//! into a full ring and popping from an empty one. The raw [`SpscRing`]
//! surface reports them as `false`/`None`/short counts; the handle surface
//! renders them as errors so the rejected value is not lost and call sites
//! can `?` out of setup code.
//!
//! [`SpscRing`]: crate::SpscRing

use thiserror::Error;

/// Error returned by [`Producer::push`] when the ring is full.
///
/// Carries the rejected value so the caller can retry without cloning.
///
/// [`Producer::push`]: crate::Producer::push
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PushError<T> {
    /// The ring holds `capacity()` elements; nothing was written.
    #[error("ring buffer is full")]
    Full(T),
}

/// Error returned by [`Consumer::pop`] when the ring is empty.
///
/// [`Consumer::pop`]: crate::Consumer::pop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PopError {
    /// No element was published; nothing was read.
    #[error("ring buffer is empty")]
    Empty,
}
