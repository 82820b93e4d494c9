//! The placement engine: fit search, split & place, coalesce, and heap
//! growth, wired together behind the four public primitives.
//!
//! This supersedes the teacher crate's `BumpAllocator` — same idea of a
//! struct owning the heap and handing out pointers, but backed by a
//! segregated free list instead of a bump pointer, so freed space is
//! actually reused.

use std::ptr;

use crate::align::align16;
use crate::arena::{ArenaBackend, VirtualArena};
use crate::block::{self, EPILOGUE_SIZE, MIN_FREE_BLOCK, PAD_SIZE, PROLOGUE_SIZE, WORD_SIZE};
use crate::check::{self, Violation};
use crate::config::AllocatorConfig;
use crate::error::ArenaError;
use crate::free_list::FreeListIndex;
use crate::size_class;

fn required_block_size(requested: usize) -> usize {
  align16(requested + WORD_SIZE).max(MIN_FREE_BLOCK)
}

/// A segregated free-list allocator over a single growable arena.
///
/// `A` is the arena backend — [`VirtualArena`] for the crate's own demo and
/// tests, or any other type implementing [`ArenaBackend`] an embedder
/// wants to supply. `Allocator::new` is this type's `init`: there is no
/// separate fallible initialization step after construction.
pub struct Allocator<A: ArenaBackend> {
  arena: A,
  free_lists: FreeListIndex,
  first_block: usize,
  epilogue: usize,
  config: AllocatorConfig,
}

impl Allocator<VirtualArena> {
  /// Builds an allocator backed by a private `mmap` reservation sized per
  /// `config.reserve_bytes`.
  pub fn new(config: AllocatorConfig) -> Result<Self, ArenaError> {
    let arena = VirtualArena::new(config.reserve_bytes)?;
    Self::with_backend(arena, config)
  }
}

impl<A: ArenaBackend> Allocator<A> {
  /// Builds an allocator over an already-constructed arena backend. This
  /// is the generic constructor an embedder supplying their own
  /// [`ArenaBackend`] calls instead of [`Allocator::new`].
  pub fn with_backend(mut arena: A, config: AllocatorConfig) -> Result<Self, ArenaError> {
    let base = arena
      .extend(config.initial_extend_bytes)
      .ok_or(ArenaError::ReservationExceeded { requested: config.initial_extend_bytes, remaining: 0 })?;
    let committed = arena.high_bound() - base;
    let overhead = PAD_SIZE + PROLOGUE_SIZE + EPILOGUE_SIZE;
    if committed < overhead + MIN_FREE_BLOCK {
      return Err(ArenaError::ReservationExceeded { requested: overhead + MIN_FREE_BLOCK, remaining: committed });
    }

    let prologue = base + PAD_SIZE;
    let first_block = prologue + PROLOGUE_SIZE;
    let epilogue = base + committed - EPILOGUE_SIZE;
    let free_size = epilogue - first_block;

    // Safety: `[base, base + committed)` was just committed by `extend`
    // above and is exclusively owned by this allocator.
    unsafe {
      block::set_header(prologue, PROLOGUE_SIZE, true, true);
      block::write_word(block::footer_addr(prologue), block::pack(PROLOGUE_SIZE, true, true));
      block::set_header(first_block, free_size, false, true);
      block::set_footer(first_block, free_size);
      block::set_header(epilogue, 0, true, false);
    }

    let mut free_lists = FreeListIndex::new();
    let class = size_class::class_of(free_size);
    // Safety: `first_block` was just formatted as a valid free block above.
    unsafe { free_lists.insert(first_block, class) };

    log::debug!("allocator initialized: {committed} bytes committed, initial free block of {free_size} bytes at {first_block:#x}");

    Ok(Self { arena, free_lists, first_block, epilogue, config })
  }

  /// Allocates a block of at least `size` bytes, returning null on failure
  /// (arena exhaustion) and for `size == 0`.
  pub fn allocate(&mut self, size: usize) -> *mut u8 {
    if size == 0 {
      log::trace!("allocate(0) returns null");
      return ptr::null_mut();
    }
    let required = required_block_size(size);
    let block = match self.find_fit(required) {
      Some((block, class)) => {
        // Safety: `block` was just found resident in `class`'s list.
        unsafe { self.free_lists.unlink(block, class) };
        block
      }
      None => match self.grow_heap(required) {
        Some(block) => {
          let class = size_class::class_of(unsafe { block::size(block) });
          // Safety: `grow_heap` always inserts the block it returns.
          unsafe { self.free_lists.unlink(block, class) };
          block
        }
        None => {
          log::warn!("allocate({size}) failed: arena exhausted");
          return ptr::null_mut();
        }
      },
    };
    let original_size = unsafe { block::size(block) };
    let placed = self.place(block, original_size, required);
    self.maybe_check("allocate");
    // Safety: `placed` was just formatted as a valid allocated block.
    unsafe { block::payload_addr(placed) as *mut u8 }
  }

  /// Releases a block previously returned by `allocate`/`reallocate`/
  /// `zero_allocate`. A null pointer is a no-op.
  ///
  /// # Safety
  /// `ptr` must have been returned by this allocator and not already
  /// released.
  pub fn release(&mut self, ptr: *mut u8) {
    if ptr.is_null() {
      return;
    }
    let block = block::header_of_payload(ptr as usize);
    // Safety: `block` is a live allocation's header by the caller's
    // contract.
    unsafe {
      let size = block::size(block);
      let prev_alloc = block::prev_allocated(block);
      block::set_header(block, size, false, prev_alloc);
      block::set_footer(block, size);
      let next = block::next_block(block);
      block::set_prev_allocated(next, false);
      self.coalesce(block);
    }
    self.maybe_check("release");
  }

  /// Resizes a previously allocated block, preserving its contents up to
  /// the smaller of the old and new sizes. `ptr == null` behaves like
  /// `allocate`; `new_size == 0` behaves like `release` and returns null.
  ///
  /// # Safety
  /// `ptr` must be null or have been returned by this allocator and not
  /// already released.
  pub fn reallocate(&mut self, ptr: *mut u8, new_size: usize) -> *mut u8 {
    if ptr.is_null() {
      return self.allocate(new_size);
    }
    if new_size == 0 {
      self.release(ptr);
      return ptr::null_mut();
    }

    let block = block::header_of_payload(ptr as usize);
    let required = required_block_size(new_size);
    // Safety: `block` is a live allocation's header by the caller's
    // contract.
    let old_size = unsafe { block::size(block) };

    if required <= old_size {
      self.shrink_in_place(block, old_size, required);
      self.maybe_check("reallocate(shrink)");
      return ptr;
    }

    // Safety: `block` is a live allocation's header.
    let next = unsafe { block::next_block(block) };
    // Safety: `next` is a valid header, either a live block or the epilogue.
    if !unsafe { block::is_allocated(next) } {
      let next_size = unsafe { block::size(next) };
      if old_size + next_size >= required {
        let class = size_class::class_of(next_size);
        // Safety: `next` is resident in `class`'s list, confirmed free above.
        unsafe { self.free_lists.unlink(next, class) };
        let combined = old_size + next_size;
        let placed = self.place(block, combined, required);
        self.maybe_check("reallocate(grow-in-place)");
        // Safety: `placed` is a freshly formatted allocated block.
        return unsafe { block::payload_addr(placed) as *mut u8 };
      }
    }

    let new_ptr = self.allocate(new_size);
    if new_ptr.is_null() {
      return ptr::null_mut();
    }
    let copy_len = old_size - WORD_SIZE;
    // Safety: `ptr` has at least `copy_len` readable bytes (its old
    // payload), `new_ptr` has at least `new_size >= copy_len` writable
    // bytes, and the two allocations never overlap.
    unsafe { ptr::copy_nonoverlapping(ptr, new_ptr, copy_len) };
    self.release(ptr);
    new_ptr
  }

  /// Allocates `count * size` bytes, zeroed, guarding against overflow in
  /// the multiplication.
  pub fn zero_allocate(&mut self, count: usize, size: usize) -> *mut u8 {
    let Some(total) = count.checked_mul(size) else {
      log::warn!("zero_allocate({count}, {size}) overflowed");
      return ptr::null_mut();
    };
    let ptr = self.allocate(total);
    if !ptr.is_null() {
      // Safety: `allocate` guarantees at least `total` writable bytes.
      unsafe { ptr::write_bytes(ptr, 0, total) };
    }
    ptr
  }

  /// Runs the full invariant checker over the current heap and free-list
  /// state. Diagnostic only — never called on the hot path unless
  /// `config.check_after_every_call` is set.
  pub fn check(&self) -> Result<(), Violation> {
    // Safety: `first_block`/`epilogue` bound the live block run and
    // `free_lists` is this allocator's own index.
    unsafe { check::run(self.first_block, self.epilogue, &self.free_lists) }
  }

  fn maybe_check(&self, stage: &str) {
    if self.config.check_after_every_call {
      if let Err(violation) = self.check() {
        log::warn!("invariant check failed after {stage}: {violation}");
      }
    }
  }

  fn find_fit(&self, required: usize) -> Option<(usize, usize)> {
    let start_class = size_class::class_of(required);
    for class in start_class..size_class::NUM_CLASSES {
      for block in self.free_lists.iter(class) {
        // Safety: every address yielded by `iter` is a live free block.
        if unsafe { block::size(block) } >= required {
          log::trace!("fit found in class {class} for required size {required}");
          return Some((block, class));
        }
      }
    }
    None
  }

  /// Places `required` bytes at `block`, which currently has size
  /// `original_size` and is not resident in any free list. Splits off a
  /// remainder when it would be at least [`MIN_FREE_BLOCK`], otherwise
  /// absorbs the whole block.
  fn place(&mut self, block: usize, original_size: usize, required: usize) -> usize {
    // Safety: `block` is a valid header with `original_size` recorded or
    // about to be recorded, exclusively owned by this call.
    unsafe {
      let prev_alloc = block::prev_allocated(block);
      let remainder_size = original_size - required;
      if remainder_size >= MIN_FREE_BLOCK {
        block::set_header(block, required, true, prev_alloc);
        let remainder = block::next_block(block);
        block::set_header(remainder, remainder_size, false, true);
        block::set_footer(remainder, remainder_size);
        let class = size_class::class_of(remainder_size);
        self.free_lists.insert(remainder, class);
        log::trace!("split block at {block:#x}: placed {required}, remainder {remainder_size} reinserted as class {class}");
      } else {
        block::set_header(block, original_size, true, prev_alloc);
        let successor = block::next_block(block);
        block::set_prev_allocated(successor, true);
        log::trace!("absorbed whole block at {block:#x} of size {original_size} for required {required}");
      }
    }
    block
  }

  fn shrink_in_place(&mut self, block: usize, old_size: usize, required: usize) {
    let remainder_size = old_size - required;
    if remainder_size < MIN_FREE_BLOCK {
      return;
    }
    // Safety: `block` is a live allocation of size `old_size`.
    unsafe {
      let prev_alloc = block::prev_allocated(block);
      block::set_header(block, required, true, prev_alloc);
      let free_part = block::next_block(block);
      block::set_header(free_part, remainder_size, false, true);
      block::set_footer(free_part, remainder_size);
      let next = block::next_block(free_part);
      block::set_prev_allocated(next, false);
      self.coalesce(free_part);
    }
  }

  /// Requests `min_size` more bytes from the arena backend, formats them
  /// as a new free block over the old epilogue's position, writes a fresh
  /// epilogue, and coalesces with the previous tail block if it was free.
  /// Returns the (possibly merged) free block's address.
  ///
  /// The new free block reuses the old epilogue's 8 bytes as its header —
  /// `extend` hands back the old high bound, which is `old_epilogue +
  /// EPILOGUE_SIZE`, not `old_epilogue` itself.
  fn grow_heap(&mut self, min_size: usize) -> Option<usize> {
    let growth = align16(min_size + EPILOGUE_SIZE).max(self.config.initial_extend_bytes);
    let old_epilogue = self.epilogue;
    // Safety: `old_epilogue` is this allocator's current epilogue header.
    let prev_alloc = unsafe { block::prev_allocated(old_epilogue) };
    let base = self.arena.extend(growth)?;
    debug_assert_eq!(
      base,
      old_epilogue + EPILOGUE_SIZE,
      "arena backend must grow contiguously from the old high bound"
    );
    let new_block = old_epilogue;
    let new_high = self.arena.high_bound();
    let new_epilogue = new_high - EPILOGUE_SIZE;
    let new_size = new_epilogue - new_block;

    // Safety: `[old_epilogue, new_high)` was just committed by `extend`
    // (the final `EPILOGUE_SIZE` bytes of the old region plus the new span).
    unsafe {
      block::set_header(new_block, new_size, false, prev_alloc);
      block::set_footer(new_block, new_size);
      block::set_header(new_epilogue, 0, true, false);
      self.epilogue = new_epilogue;
    }
    log::debug!("arena extended by {growth} bytes; new free block of {new_size} bytes at {new_block:#x}");
    Some(self.coalesce(new_block))
  }

  /// Merges `block` (already free, not yet resident in any free list, with
  /// its successor's `P` bit already reflecting its free state) with any
  /// free neighbors, then inserts the result into the appropriate class.
  /// Returns the merged block's address.
  fn coalesce(&mut self, block: usize) -> usize {
    // Safety: `block` is a freshly freed block owned exclusively by this
    // call; its neighbors are valid headers by the heap's own invariants.
    unsafe {
      let original_size = block::size(block);
      let next = block::next_block(block);
      let next_alloc = block::is_allocated(next);
      let prev_alloc = block::prev_allocated(block);

      let mut merged = block;
      let mut merged_size = original_size;
      let mut merged_prev_alloc = prev_alloc;

      if !prev_alloc {
        let prev = block::prev_block(block);
        let prev_size = block::size(prev);
        self.free_lists.unlink(prev, size_class::class_of(prev_size));
        merged_prev_alloc = block::prev_allocated(prev);
        merged = prev;
        merged_size += prev_size;
      }

      if !next_alloc {
        let next_size = block::size(next);
        self.free_lists.unlink(next, size_class::class_of(next_size));
        merged_size += next_size;
      }

      block::set_header(merged, merged_size, false, merged_prev_alloc);
      block::set_footer(merged, merged_size);
      let successor = block::next_block(merged);
      block::set_prev_allocated(successor, false);

      let class = size_class::class_of(merged_size);
      self.free_lists.insert(merged, class);
      log::trace!("coalesced into block at {merged:#x} of size {merged_size}, class {class}");
      merged
    }
  }
}
