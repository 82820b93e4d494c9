//! Boundary-tag encoding and address arithmetic.
//!
//! This module is the only place in the crate that casts raw addresses to
//! and from the 8-byte words that make up a block's header and footer. The
//! rest of the core (the free-list index, fit search, splitting,
//! coalescing) works in terms of plain `usize` block handles and never
//! touches a pointer directly — see the crate root docs for the rationale.
//!
//! # Layout
//!
//! ```text
//!   Allocated block (no footer):
//!   ┌────────┬──────────────────────────────┐
//!   │ header │           payload            │
//!   │ 8 bytes│        size - 8 bytes        │
//!   └────────┴──────────────────────────────┘
//!   ^ addr                ^ addr + 8 (payload)
//!
//!   Free block (footer duplicates the header's size):
//!   ┌────────┬────────┬────────┬─────...────┬────────┐
//!   │ header │  prev  │  next  │   unused   │ footer │
//!   │ 8 bytes│ 8 bytes│ 8 bytes│            │ 8 bytes│
//!   └────────┴────────┴────────┴─────...────┴────────┘
//!   ^ addr                                  ^ addr + size - 8
//! ```
//!
//! A word is packed as `size | (allocated as bit 0) | (prev_allocated as
//! bit 1)`. Bit 2 is reserved and always zero. `size` is always a multiple
//! of 16, so the low 4 bits are free for flags; only bits 0 and 1 are used.

use std::ptr;

/// Minimum size of any block: header + two free-list links + footer,
/// already a multiple of [`crate::align::ALIGNMENT`].
pub const MIN_FREE_BLOCK: usize = 32;

/// Size in bytes of a header or footer word.
pub const WORD_SIZE: usize = 8;

/// Size in bytes of the 16-byte prologue (header + footer, both
/// marked allocated).
pub const PROLOGUE_SIZE: usize = 16;

/// Size in bytes of the epilogue header (no payload, no footer).
pub const EPILOGUE_SIZE: usize = 8;

/// Size in bytes of the alignment pad that precedes the prologue.
pub const PAD_SIZE: usize = 8;

const ALLOCATED_BIT: u64 = 1 << 0;
const PREV_ALLOCATED_BIT: u64 = 1 << 1;
const SIZE_MASK: u64 = !0x7;

/// Packs a size and the two flag bits into a boundary-tag word.
#[inline]
pub(crate) const fn pack(size: usize, allocated: bool, prev_allocated: bool) -> u64 {
  let mut word = size as u64;
  if allocated {
    word |= ALLOCATED_BIT;
  }
  if prev_allocated {
    word |= PREV_ALLOCATED_BIT;
  }
  word
}

/// Extracts the size field from a boundary-tag word.
#[inline]
pub(crate) const fn unpack_size(word: u64) -> usize {
  (word & SIZE_MASK) as usize
}

/// Extracts the `A` (allocated) flag from a boundary-tag word.
#[inline]
pub(crate) const fn unpack_allocated(word: u64) -> bool {
  word & ALLOCATED_BIT != 0
}

/// Extracts the `P` (previous-allocated) flag from a boundary-tag word.
#[inline]
pub(crate) const fn unpack_prev_allocated(word: u64) -> bool {
  word & PREV_ALLOCATED_BIT != 0
}

/// Reads the 64-bit word at `addr`.
///
/// # Safety
/// `addr` must be 8-byte aligned and point at readable memory owned by the
/// arena.
#[inline]
pub(crate) unsafe fn read_word(addr: usize) -> u64 {
  unsafe { ptr::read(addr as *const u64) }
}

/// Writes the 64-bit word `value` at `addr`.
///
/// # Safety
/// `addr` must be 8-byte aligned and point at writable memory owned by the
/// arena.
#[inline]
pub(crate) unsafe fn write_word(addr: usize, value: u64) {
  unsafe { ptr::write(addr as *mut u64, value) }
}

/// Address of a block's header, given its payload address.
#[inline]
pub(crate) const fn header_of_payload(payload: usize) -> usize {
  payload - WORD_SIZE
}

/// Address of a block's payload, given its header address.
#[inline]
pub(crate) const fn payload_addr(block: usize) -> usize {
  block + WORD_SIZE
}

/// Reads the size recorded in a block's header.
///
/// # Safety
/// `block` must be a valid header address.
#[inline]
pub(crate) unsafe fn size(block: usize) -> usize {
  unsafe { unpack_size(read_word(block)) }
}

/// Reads the `A` bit recorded in a block's header.
///
/// # Safety
/// `block` must be a valid header address.
#[inline]
pub(crate) unsafe fn is_allocated(block: usize) -> bool {
  unsafe { unpack_allocated(read_word(block)) }
}

/// Reads the `P` bit recorded in a block's header.
///
/// # Safety
/// `block` must be a valid header address.
#[inline]
pub(crate) unsafe fn prev_allocated(block: usize) -> bool {
  unsafe { unpack_prev_allocated(read_word(block)) }
}

/// Writes a block's header.
///
/// # Safety
/// `block` must be a valid, writable header address.
#[inline]
pub(crate) unsafe fn set_header(block: usize, size: usize, allocated: bool, prev_allocated: bool) {
  unsafe { write_word(block, pack(size, allocated, prev_allocated)) }
}

/// Address of a free block's footer, given its header address.
///
/// Only meaningful while the block is free — allocated blocks carry no
/// footer and this address may belong to the next block's payload.
///
/// # Safety
/// `block` must be a valid header address whose recorded size is correct.
#[inline]
pub(crate) unsafe fn footer_addr(block: usize) -> usize {
  unsafe { block + size(block) - WORD_SIZE }
}

/// Writes a free block's footer. The footer always describes the block as
/// free (`A = 0`); its `P` bit is unused and written as zero.
///
/// # Safety
/// `block` must be a valid, writable header address, and the block must
/// be large enough to hold a footer at `footer_addr(block)`.
#[inline]
pub(crate) unsafe fn set_footer(block: usize, size: usize) {
  unsafe { write_word(footer_addr(block), pack(size, false, false)) }
}

/// Flips the `P` bit of `block`'s header without disturbing its size or
/// `A` bit. Every transition of a block's own allocation state must call
/// this on the *next* block in the same critical section.
///
/// # Safety
/// `block` must be a valid, writable header address.
#[inline]
pub(crate) unsafe fn set_prev_allocated(block: usize, prev_allocated: bool) {
  unsafe {
    let word = read_word(block);
    let size = unpack_size(word);
    let allocated = unpack_allocated(word);
    set_header(block, size, allocated, prev_allocated);
  }
}

/// Address of the block immediately following `block`.
///
/// # Safety
/// `block` must be a valid header address whose recorded size is correct.
#[inline]
pub(crate) unsafe fn next_block(block: usize) -> usize {
  unsafe { block + size(block) }
}

/// Address of the block immediately preceding `block`.
///
/// Only legal when `block`'s header has `P = 0`: the predecessor is then
/// free and therefore carries a footer we can read its size from. Calling
/// this when `P = 1` would read into the payload of an allocated
/// predecessor, which has no footer — the one shortcut this design
/// explicitly forbids (see the crate root docs on resolved ambiguities).
///
/// # Safety
/// `block` must be a valid header address with `P = 0`, and the word at
/// `block - WORD_SIZE` must be the predecessor's footer.
#[inline]
pub(crate) unsafe fn prev_block(block: usize) -> usize {
  unsafe {
    debug_assert!(!prev_allocated(block), "prev_block called with P=1: predecessor has no footer");
    let prev_size = unpack_size(read_word(block - WORD_SIZE));
    block - prev_size
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn pack_unpack_round_trips() {
    for &(size, a, p) in &[(16usize, false, false), (32, true, false), (65536, false, true), (128, true, true)] {
      let word = pack(size, a, p);
      assert_eq!(unpack_size(word), size);
      assert_eq!(unpack_allocated(word), a);
      assert_eq!(unpack_prev_allocated(word), p);
    }
  }

  #[test]
  fn payload_and_header_are_inverses() {
    let block = 0x10000;
    assert_eq!(header_of_payload(payload_addr(block)), block);
  }

  fn with_buffer<R>(len: usize, f: impl FnOnce(usize) -> R) -> R {
    let mut buf = vec![0u8; len];
    let base = buf.as_mut_ptr() as usize;
    let result = f(base);
    drop(buf);
    result
  }

  #[test]
  fn header_write_read_round_trips() {
    with_buffer(64, |base| unsafe {
      set_header(base, 48, true, false);
      assert_eq!(size(base), 48);
      assert!(is_allocated(base));
      assert!(!prev_allocated(base));
    });
  }

  #[test]
  fn footer_round_trips_and_sits_at_the_end_of_the_block() {
    with_buffer(64, |base| unsafe {
      set_header(base, 48, false, true);
      set_footer(base, 48);
      assert_eq!(footer_addr(base), base + 48 - WORD_SIZE);
      assert_eq!(size(footer_addr(base)), 48);
      assert!(!is_allocated(footer_addr(base)));
    });
  }

  #[test]
  fn set_prev_allocated_preserves_size_and_own_allocated_bit() {
    with_buffer(64, |base| unsafe {
      set_header(base, 32, true, false);
      set_prev_allocated(base, true);
      assert_eq!(size(base), 32);
      assert!(is_allocated(base));
      assert!(prev_allocated(base));
    });
  }

  #[test]
  fn next_block_steps_by_the_recorded_size() {
    with_buffer(96, |base| unsafe {
      set_header(base, 32, true, true);
      assert_eq!(next_block(base), base + 32);
    });
  }

  #[test]
  fn prev_block_reads_the_predecessor_footer_size() {
    with_buffer(96, |base| unsafe {
      // predecessor: free block of size 32 at `base`.
      set_header(base, 32, false, true);
      set_footer(base, 32);
      // successor: allocated block at base+32, P=0 (predecessor is free).
      let successor = base + 32;
      set_header(successor, 16, true, false);
      assert_eq!(prev_block(successor), base);
    });
  }
}
