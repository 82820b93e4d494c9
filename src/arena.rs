//! The arena backend: the external byte-region provider the core consumes
//! through `extend`/`low_bound`/`high_bound`/`total_size`.
//!
//! The core never assumes a particular backend — [`ArenaBackend`] is the
//! seam. [`VirtualArena`] is the one concrete implementation this crate
//! ships, built the same way the teacher crate grows its heap (ask the OS
//! once, bump a high-water mark forever) but on a private `mmap` reservation
//! instead of the process-wide `sbrk` break, so that independent allocator
//! instances — one per test, for instance — never collide.
//!
//! ```text
//!   reserve_bytes (PROT_NONE, reserved but not backed by memory)
//!   ┌──────────────────────────────────────────────────────────┐
//!   │ committed (PROT_READ|WRITE)           │   uncommitted    │
//!   └──────────────────────────────────────────────────────────┘
//!   ^ base                                  ^ high              ^ base+reserve_bytes
//!
//!   extend(delta) mprotects [high, high+delta) to PROT_READ|WRITE
//!   and returns the old `high` as the base of the newly usable span.
//! ```

use std::ffi::c_void;
use std::ptr;

use crate::error::ArenaError;

/// The interface the placement engine consumes to grow its heap.
///
/// Implementors must never relocate previously returned addresses: once
/// `extend` hands out a base address, it stays valid for the arena's
/// lifetime.
pub trait ArenaBackend {
  /// Commits `delta` more bytes at the current high bound and returns the
  /// address at which the new span begins. Returns `None` if the backend
  /// cannot grow by `delta` bytes (e.g. the reservation is exhausted).
  fn extend(&mut self, delta: usize) -> Option<usize>;

  /// The lowest address ever handed out by this arena.
  fn low_bound(&self) -> usize;

  /// The address one past the last committed byte.
  fn high_bound(&self) -> usize;

  /// Total committed bytes (`high_bound() - low_bound()`).
  fn total_size(&self) -> usize {
    self.high_bound() - self.low_bound()
  }
}

/// A private, never-relocating virtual memory reservation.
///
/// Reserves `reserve_bytes` of address space up front with `PROT_NONE` (no
/// physical backing, so the reservation is cheap even when large), then
/// commits pages with `mprotect` as `extend` is called. The reservation is
/// released with `munmap` on drop.
#[derive(Debug)]
pub struct VirtualArena {
  base: usize,
  high: usize,
  reserved_end: usize,
  page_size: usize,
}

impl VirtualArena {
  /// Reserves `reserve_bytes` of address space, rounded up to a whole
  /// number of pages. No memory is committed yet; call `extend` to make
  /// bytes usable.
  pub fn new(reserve_bytes: usize) -> Result<Self, ArenaError> {
    let page_size = page_size();
    let reserve_bytes = round_up(reserve_bytes, page_size);
    // Safety: flags request an anonymous, private mapping with no backing
    // file; `addr` is null so the kernel chooses the base.
    let mapping = unsafe {
      libc::mmap(
        ptr::null_mut(),
        reserve_bytes,
        libc::PROT_NONE,
        libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
        -1,
        0,
      )
    };
    if mapping == libc::MAP_FAILED {
      return Err(ArenaError::Mmap(errno()));
    }
    let base = mapping as usize;
    log::debug!("reserved {reserve_bytes} bytes of virtual address space at {base:#x}");
    Ok(Self { base, high: base, reserved_end: base + reserve_bytes, page_size })
  }
}

impl ArenaBackend for VirtualArena {
  fn extend(&mut self, delta: usize) -> Option<usize> {
    if delta == 0 {
      return Some(self.high);
    }
    let committed = round_up(delta, self.page_size);
    let new_high = self.high.checked_add(committed)?;
    if new_high > self.reserved_end {
      log::warn!(
        "arena reservation exceeded: requested {committed} bytes, {} remaining",
        self.reserved_end - self.high
      );
      return None;
    }
    // Safety: [self.high, new_high) lies within the reservation made in
    // `new` and is page-aligned by construction.
    let result = unsafe { libc::mprotect(self.high as *mut c_void, committed, libc::PROT_READ | libc::PROT_WRITE) };
    if result != 0 {
      log::warn!("mprotect failed with errno {}", errno());
      return None;
    }
    let base = self.high;
    log::debug!("arena extended by {committed} bytes, new high bound {new_high:#x}");
    self.high = new_high;
    Some(base)
  }

  fn low_bound(&self) -> usize {
    self.base
  }

  fn high_bound(&self) -> usize {
    self.high
  }
}

impl Drop for VirtualArena {
  fn drop(&mut self) {
    // Safety: `self.base` and the reservation length were returned by the
    // `mmap` call in `new` and have not been unmapped before.
    unsafe {
      libc::munmap(self.base as *mut c_void, self.reserved_end - self.base);
    }
  }
}

fn page_size() -> usize {
  // Safety: `_SC_PAGESIZE` is always a valid `sysconf` argument.
  unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize }
}

fn round_up(value: usize, multiple: usize) -> usize {
  ((value + multiple - 1) / multiple) * multiple
}

fn errno() -> i32 {
  // Safety: `__errno_location`/equivalent is always safe to read.
  unsafe { *libc::__errno_location() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_reserves_without_committing() {
    let arena = VirtualArena::new(4096).expect("reservation should succeed");
    assert_eq!(arena.low_bound(), arena.high_bound());
    assert_eq!(arena.total_size(), 0);
  }

  #[test]
  fn extend_commits_and_advances_high_bound() {
    let mut arena = VirtualArena::new(64 * 1024).expect("reservation should succeed");
    let base = arena.extend(4096).expect("extend should succeed within the reservation");
    assert_eq!(base, arena.low_bound());
    assert_eq!(arena.high_bound(), base + 4096);
    assert_eq!(arena.total_size(), 4096);
  }

  #[test]
  fn extend_beyond_reservation_fails() {
    let mut arena = VirtualArena::new(4096).expect("reservation should succeed");
    assert!(arena.extend(4096).is_some());
    assert!(arena.extend(4096).is_none(), "second extend should exceed the 4096-byte reservation");
  }

  #[test]
  fn committed_memory_is_readable_and_writable() {
    let mut arena = VirtualArena::new(4096).expect("reservation should succeed");
    let base = arena.extend(4096).unwrap();
    unsafe {
      let ptr = base as *mut u8;
      ptr.write(0xAB);
      assert_eq!(ptr.read(), 0xAB);
    }
  }

  #[test]
  fn independent_instances_do_not_share_addresses() {
    let a = VirtualArena::new(4096).expect("reservation should succeed");
    let b = VirtualArena::new(4096).expect("reservation should succeed");
    assert_ne!(a.low_bound(), b.low_bound());
  }
}
