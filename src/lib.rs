//! # rallocator - A Segregated Free-List Memory Allocator
//!
//! This crate provides a general-purpose dynamic memory allocator over a
//! single, monotonically growable contiguous byte region. It implements the
//! four classical allocation primitives — `allocate`, `release`,
//! `reallocate`, and `zero_allocate` — on top of a segregated explicit
//! free-list placement engine, together with an internal consistency
//! checker.
//!
//! ## Overview
//!
//! ```text
//!   Arena layout:
//!
//!   ┌─────┬───────────┬──────────────────────────────────────┬──────────┐
//!   │ pad │  prologue │              block run                │ epilogue │
//!   │  8  │    16     │         (grows via extend)            │    8     │
//!   └─────┴───────────┴──────────────────────────────────────┴──────────┘
//!   ^ L                                                                 ^ H (grows only)
//! ```
//!
//! Each block in the run carries an 8-byte boundary-tag header; free
//! blocks additionally carry a footer and overlay free-list links onto
//! their payload:
//!
//! ```text
//!   Allocated block (no footer):
//!   ┌────────┬──────────────────────────────┐
//!   │ header │           payload            │
//!   └────────┴──────────────────────────────┘
//!
//!   Free block:
//!   ┌────────┬────────┬────────┬─────...────┬────────┐
//!   │ header │  prev  │  next  │   unused   │ footer │
//!   └────────┴────────┴────────┴─────...────┴────────┘
//! ```
//!
//! Free blocks are bucketed into 14 segregated size classes (see
//! [`size_class`]) and chained into circular doubly linked lists (see
//! [`free_list`]). `allocate` walks these lists first-fit; `release`
//! eagerly coalesces with free neighbors; `reallocate` trims in place,
//! grows in place when the next block is free, or falls back to
//! allocate-copy-release.
//!
//! ## Crate Structure
//!
//! ```text
//!   rallocator
//!   ├── align      - fixed 16-byte alignment helpers
//!   ├── block      - boundary-tag encoding and address arithmetic
//!   ├── size_class - maps a size to one of 14 segregated classes
//!   ├── free_list  - the segregated circular doubly linked free lists
//!   ├── allocator  - fit search, split & place, coalesce, heap growth
//!   ├── check      - the invariant checker
//!   ├── arena      - the `ArenaBackend` trait and `VirtualArena` impl
//!   ├── config     - construction-time allocator configuration
//!   └── error      - typed arena backend errors
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use rallocator::{Allocator, AllocatorConfig};
//!
//! let mut allocator = Allocator::new(AllocatorConfig::default())
//!     .expect("arena reservation should succeed");
//!
//! let ptr = allocator.allocate(64);
//! assert!(!ptr.is_null());
//!
//! unsafe {
//!     ptr.write(42);
//!     assert_eq!(ptr.read(), 42);
//! }
//!
//! allocator.release(ptr);
//! ```
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management.
//! Raw pointer arithmetic is confined to [`block`]; the rest of the core
//! works in terms of plain `usize` block handles. Callers of `release` and
//! `reallocate` must ensure pointers were returned by the same allocator
//! instance and are not released twice.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: no synchronization primitives.
//! - **No compaction**: live data is never relocated.
//! - **The arena only grows**: memory is never returned to the OS.
//! - **Unix-only**: [`arena::VirtualArena`] requires `libc`'s `mmap` family.

pub mod align;
mod allocator;
mod arena;
mod block;
mod check;
mod config;
mod error;
mod free_list;
mod size_class;

pub use allocator::Allocator;
pub use arena::{ArenaBackend, VirtualArena};
pub use check::Violation;
pub use config::AllocatorConfig;
pub use error::ArenaError;
