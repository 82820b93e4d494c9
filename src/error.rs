//! Typed errors for the arena backend.
//!
//! The allocator core never raises these — its four primitives stay
//! null-return, per the crate root docs. `ArenaError` is surfaced only from
//! [`crate::arena::VirtualArena`] construction and `Allocator::new`/
//! `Allocator::with_backend`; `extend` itself reports failure by returning
//! `None`, logged at `warn` level, for an embedder wiring up their own
//! backend or a caller diagnosing why construction returned failure.

use thiserror::Error;

/// Failure modes of the concrete arena backend.
#[derive(Debug, Error)]
pub enum ArenaError {
  /// The requested reservation or extension would exceed the arena's
  /// fixed `reserve_bytes` ceiling.
  #[error("arena reservation exceeded: requested {requested} bytes, {remaining} remaining")]
  ReservationExceeded {
    /// Bytes requested by the failed `extend`/construction call.
    requested: usize,
    /// Bytes left in the reservation before the request.
    remaining: usize,
  },

  /// The initial `mmap` reservation failed.
  #[error("mmap failed with errno {0}")]
  Mmap(i32),
}
