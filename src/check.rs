//! The invariant checker: a two-pass validation of the heap's boundary
//! tags and free-list membership, used as a diagnostic, not on the hot
//! path. See the crate root docs for the list of invariants this proves.

use std::collections::HashSet;
use std::error;
use std::fmt;

use crate::block;
use crate::free_list::FreeListIndex;
use crate::size_class::{self, NUM_CLASSES};

/// A single invariant violation found by [`run`]. Each variant names the
/// offending address so a caller can correlate it with their own
/// allocation log.
#[derive(Debug)]
pub enum Violation {
  /// A block's recorded size is zero or not a multiple of 16 (I1).
  BadSize { address: usize, size: usize },
  /// A block's `P` bit disagrees with its predecessor's actual state (I2).
  PrevAllocatedMismatch { address: usize, recorded: bool, actual: bool },
  /// A free block's footer does not duplicate its header (I3).
  FooterMismatch { address: usize },
  /// Two adjacent blocks are both free — coalescing should have merged
  /// them (I4).
  AdjacentFreeBlocks { first: usize, second: usize },
  /// A free block lives in a class other than its size router to (I5).
  MisroutedFreeBlock { address: usize, size: usize, list_class: usize, expected_class: usize },
  /// A size class's circular list is not well-formed (I6).
  MalformedFreeList { class: usize },
  /// A free-list node lies outside the live heap range (I7).
  OutOfBounds { address: usize },
  /// A free-list node is not 16-byte aligned (I7).
  Misaligned { address: usize },
  /// A free block found by the heap walk is not resident in any free list
  /// (I5).
  UnlistedFreeBlock { address: usize },
  /// A free-list entry does not correspond to a free block found by the
  /// heap walk — a dangling or duplicate link.
  PhantomFreeListEntry { address: usize },
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::BadSize { address, size } => write!(f, "block at {address:#x} has invalid size {size}"),
      Self::PrevAllocatedMismatch { address, recorded, actual } => {
        write!(f, "block at {address:#x} records P={recorded}, predecessor is actually allocated={actual}")
      }
      Self::FooterMismatch { address } => write!(f, "free block at {address:#x} footer does not match its header"),
      Self::AdjacentFreeBlocks { first, second } => {
        write!(f, "adjacent free blocks at {first:#x} and {second:#x} were not coalesced")
      }
      Self::MisroutedFreeBlock { address, size, list_class, expected_class } => write!(
        f,
        "free block at {address:#x} of size {size} sits in class {list_class}, router says {expected_class}"
      ),
      Self::MalformedFreeList { class } => write!(f, "free list for class {class} is not a well-formed circular list"),
      Self::OutOfBounds { address } => write!(f, "free-list node at {address:#x} lies outside the live heap"),
      Self::Misaligned { address } => write!(f, "free-list node at {address:#x} is not 16-byte aligned"),
      Self::UnlistedFreeBlock { address } => {
        write!(f, "free block at {address:#x} found in the heap walk but not in any free list")
      }
      Self::PhantomFreeListEntry { address } => {
        write!(f, "free-list entry at {address:#x} does not correspond to a free block in the heap walk")
      }
    }
  }
}

impl error::Error for Violation {}

/// Walks the heap forward from `first_block` to `epilogue`, then walks
/// every size class's free list, cross-checking both passes against each
/// other.
///
/// # Safety
/// `first_block` and `epilogue` must bound a live, well-formed block run,
/// and `free_lists` must be the index over that same run.
pub(crate) unsafe fn run(first_block: usize, epilogue: usize, free_lists: &FreeListIndex) -> Result<(), Violation> {
  let mut cursor = first_block;
  let mut prev_allocated = true; // the prologue is always allocated.
  let mut walked_free = HashSet::new();

  while cursor != epilogue {
    let size = unsafe { block::size(cursor) };
    if size == 0 || size % 16 != 0 {
      return Err(Violation::BadSize { address: cursor, size });
    }
    let allocated = unsafe { block::is_allocated(cursor) };
    let recorded_prev = unsafe { block::prev_allocated(cursor) };
    if recorded_prev != prev_allocated {
      return Err(Violation::PrevAllocatedMismatch { address: cursor, recorded: recorded_prev, actual: prev_allocated });
    }

    if !allocated {
      let footer = unsafe { block::read_word(block::footer_addr(cursor)) };
      if block::unpack_size(footer) != size || block::unpack_allocated(footer) {
        return Err(Violation::FooterMismatch { address: cursor });
      }
      if !prev_allocated {
        let predecessor = unsafe { block::prev_block(cursor) };
        return Err(Violation::AdjacentFreeBlocks { first: predecessor, second: cursor });
      }
      walked_free.insert(cursor);
    }

    prev_allocated = allocated;
    cursor = unsafe { block::next_block(cursor) };
  }

  let mut listed_free = HashSet::new();
  for class in 0..NUM_CLASSES {
    if unsafe { !free_lists.is_well_formed(class) } {
      return Err(Violation::MalformedFreeList { class });
    }
    for node in free_lists.iter(class) {
      if node < first_block || node >= epilogue {
        return Err(Violation::OutOfBounds { address: node });
      }
      if block::payload_addr(node) % 16 != 0 {
        return Err(Violation::Misaligned { address: node });
      }
      let size = unsafe { block::size(node) };
      let expected_class = size_class::class_of(size);
      if expected_class != class {
        return Err(Violation::MisroutedFreeBlock { address: node, size, list_class: class, expected_class });
      }
      if !walked_free.contains(&node) {
        return Err(Violation::PhantomFreeListEntry { address: node });
      }
      listed_free.insert(node);
    }
  }

  if let Some(&address) = walked_free.difference(&listed_free).next() {
    return Err(Violation::UnlistedFreeBlock { address });
  }

  Ok(())
}
