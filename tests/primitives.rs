//! End-to-end scenarios exercising the four primitives against a real
//! `VirtualArena`, mirroring the allocator's own lifecycle rather than
//! poking at internal block layout directly.

use rallocator::{Allocator, AllocatorConfig};

fn allocator() -> Allocator<rallocator::VirtualArena> {
  Allocator::new(AllocatorConfig::new(1024 * 1024, 4096, true).with_checking())
    .expect("arena reservation should succeed")
}

#[test]
fn init_then_allocate_one_leaves_one_free_block_behind() {
  let mut a = allocator();
  let ptr = a.allocate(1);
  assert!(!ptr.is_null());
  assert_eq!(ptr as usize % 16, 0);
  assert!(a.check().is_ok());
  a.release(ptr);
}

#[test]
fn allocate_release_allocate_reuses_the_exact_block() {
  let mut a = allocator();
  let first = a.allocate(100);
  a.release(first);
  let second = a.allocate(100);
  assert_eq!(first, second);
  a.release(second);
}

#[test]
fn interleaved_allocate_and_release_never_breaks_invariants() {
  let mut a = allocator();
  let mut live = Vec::new();
  for round in 0..64 {
    let size = 16 + (round % 7) * 32;
    let ptr = a.allocate(size);
    assert!(!ptr.is_null());
    live.push(ptr);
    if round % 3 == 0 {
      if let Some(ptr) = live.pop() {
        a.release(ptr);
      }
    }
    assert!(a.check().is_ok());
  }
  for ptr in live {
    a.release(ptr);
  }
  assert!(a.check().is_ok());
}

#[test]
fn reallocate_grow_then_shrink_round_trips_data() {
  let mut a = allocator();
  let ptr = a.allocate(16);
  unsafe { ptr.write_bytes(0x42, 16) };
  let grown = a.reallocate(ptr, 4096);
  assert!(!grown.is_null());
  unsafe {
    for i in 0..16 {
      assert_eq!(grown.add(i).read(), 0x42);
    }
  }
  let shrunk = a.reallocate(grown, 8);
  unsafe {
    for i in 0..8 {
      assert_eq!(shrunk.add(i).read(), 0x42);
    }
  }
  a.release(shrunk);
  assert!(a.check().is_ok());
}

#[test]
fn zero_allocate_produces_zeroed_memory_for_an_array() {
  let mut a = allocator();
  let ptr = a.zero_allocate(64, 4);
  assert!(!ptr.is_null());
  unsafe {
    for i in 0..256 {
      assert_eq!(ptr.add(i).read(), 0);
    }
  }
  a.release(ptr);
}

#[test]
fn growing_the_heap_past_the_initial_reservation_still_checks_out() {
  let mut a = allocator();
  let mut live = Vec::new();
  for _ in 0..300 {
    let ptr = a.allocate(512);
    assert!(!ptr.is_null());
    live.push(ptr);
  }
  assert!(a.check().is_ok());
  for ptr in live {
    a.release(ptr);
  }
  assert!(a.check().is_ok());
}
