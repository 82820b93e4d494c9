//! Construction-time configuration for an allocator instance.

/// Knobs gathered at construction time, mirroring the teacher crate's
/// validating `const fn new()` style.
#[derive(Debug, Clone, Copy)]
pub struct AllocatorConfig {
  /// Bytes of virtual address space the arena backend reserves up front.
  /// `Allocator::new` fails if this is below one block's worth of bytes.
  pub reserve_bytes: usize,
  /// Bytes committed before the prologue/epilogue are installed, analogous
  /// to one upfront `mem_sbrk` call in a CS:APP-style `mm_init`.
  pub initial_extend_bytes: usize,
  /// When set, every primitive runs the invariant checker before
  /// returning. Off by default — `check` stays a diagnostic the caller
  /// opts into, as the design intends.
  pub check_after_every_call: bool,
}

/// Default reservation: generous enough for the demo binary and the test
/// suite's largest scenarios without needing multiple `extend` calls.
const DEFAULT_RESERVE_BYTES: usize = 64 * 1024 * 1024;
const DEFAULT_INITIAL_EXTEND_BYTES: usize = 4096;

impl AllocatorConfig {
  /// Builds a configuration, validating that the reservation can hold at
  /// least the initial extension plus prologue/epilogue overhead.
  ///
  /// # Panics
  /// Panics if `reserve_bytes < initial_extend_bytes` or either is zero.
  pub const fn new(reserve_bytes: usize, initial_extend_bytes: usize, check_after_every_call: bool) -> Self {
    assert!(reserve_bytes > 0, "reserve_bytes must be nonzero");
    assert!(initial_extend_bytes > 0, "initial_extend_bytes must be nonzero");
    assert!(
      reserve_bytes >= initial_extend_bytes,
      "reserve_bytes must be able to hold the initial extension"
    );
    Self { reserve_bytes, initial_extend_bytes, check_after_every_call }
  }

  /// Returns this configuration with checking forced on, useful for tests
  /// that want every call self-verified.
  pub const fn with_checking(mut self) -> Self {
    self.check_after_every_call = true;
    self
  }
}

impl Default for AllocatorConfig {
  fn default() -> Self {
    Self::new(DEFAULT_RESERVE_BYTES, DEFAULT_INITIAL_EXTEND_BYTES, false)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_is_internally_consistent() {
    let config = AllocatorConfig::default();
    assert!(config.reserve_bytes >= config.initial_extend_bytes);
    assert!(!config.check_after_every_call);
  }

  #[test]
  fn with_checking_flips_only_that_flag() {
    let config = AllocatorConfig::default().with_checking();
    assert!(config.check_after_every_call);
    assert_eq!(config.reserve_bytes, DEFAULT_RESERVE_BYTES);
  }

  #[test]
  #[should_panic(expected = "reserve_bytes must be able to hold")]
  fn rejects_reservation_smaller_than_initial_extension() {
    AllocatorConfig::new(1024, 4096, false);
  }
}
