//! Property-based coverage: randomized sequences of allocator calls must
//! never leave the heap or free-list index in a state the checker rejects.

use proptest::prelude::*;

use rallocator::{Allocator, AllocatorConfig};

#[derive(Debug, Clone)]
enum Op {
  Allocate { size: usize },
  Release { index: usize },
  Reallocate { index: usize, new_size: usize },
  ZeroAllocate { count: usize, size: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
  prop_oneof![
    (1usize..=2048).prop_map(|size| Op::Allocate { size }),
    (0usize..32).prop_map(|index| Op::Release { index }),
    (0usize..32, 1usize..=2048).prop_map(|(index, new_size)| Op::Reallocate { index, new_size }),
    (0usize..8, 1usize..=64).prop_map(|(count, size)| Op::ZeroAllocate { count, size }),
  ]
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  #[test]
  fn random_operation_sequences_keep_the_heap_consistent(ops in prop::collection::vec(op_strategy(), 1..200)) {
    let mut allocator = Allocator::new(AllocatorConfig::new(8 * 1024 * 1024, 4096, false))
      .expect("arena reservation should succeed");
    let mut live: Vec<*mut u8> = Vec::new();

    for op in ops {
      match op {
        Op::Allocate { size } => {
          let ptr = allocator.allocate(size);
          if !ptr.is_null() {
            prop_assert_eq!(ptr as usize % 16, 0, "payload must be 16-byte aligned");
            live.push(ptr);
          }
        }
        Op::Release { index } => {
          if !live.is_empty() {
            let ptr = live.remove(index % live.len());
            allocator.release(ptr);
          }
        }
        Op::Reallocate { index, new_size } => {
          if !live.is_empty() {
            let slot = index % live.len();
            let ptr = live[slot];
            let result = allocator.reallocate(ptr, new_size);
            if result.is_null() {
              live.remove(slot);
            } else {
              live[slot] = result;
            }
          }
        }
        Op::ZeroAllocate { count, size } => {
          let ptr = allocator.zero_allocate(count, size);
          if !ptr.is_null() {
            live.push(ptr);
          }
        }
      }
      prop_assert!(allocator.check().is_ok(), "invariant checker failed mid-sequence");
    }

    for ptr in live {
      allocator.release(ptr);
    }
    prop_assert!(allocator.check().is_ok(), "invariant checker failed after releasing everything");
  }
}
