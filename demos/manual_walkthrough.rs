use std::io::Read;

use rallocator::{Allocator, AllocatorConfig};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `htop`, `gdb`, or just visually track how the arena grows.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn main() {
  env_logger::init();

  // Our segregated free-list allocator, backed by a private `VirtualArena`.
  // Typically it holds:
  // - the arena backend (address space reservation + committed high bound)
  // - 14 segregated free-list heads
  // - the current epilogue address
  let mut allocator = Allocator::new(AllocatorConfig::default().with_checking())
    .expect("arena reservation should succeed");

  println!("[start] allocator initialized, checker enabled after every call");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Allocate space for a u32.
  // --------------------------------------------------------------------
  let first_block = allocator.allocate(4);
  println!("\n[1] Allocate 4 bytes (u32) -> {first_block:?}");
  unsafe {
    (first_block as *mut u32).write(0xDEADBEEF);
    println!("[1] Value written to first_block = {:#X}", (first_block as *const u32).read());
  }
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Allocate 12 bytes.
  //    Shows how the size-class router and split-and-place logic handle
  //    an "odd-sized" allocation relative to the 16-byte alignment.
  // --------------------------------------------------------------------
  let second_block = allocator.allocate(12);
  println!("\n[2] Allocate 12 bytes -> {second_block:?}");
  unsafe { second_block.write_bytes(0xAB, 12) };
  println!("[2] Initialized second block with 0xAB");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Allocate a u64 to confirm 16-byte payload alignment.
  // --------------------------------------------------------------------
  let third_block = allocator.allocate(8);
  println!("\n[3] Allocate 8 bytes (u64) -> {third_block:?}");
  unsafe {
    (third_block as *mut u64).write(0x1122334455667788);
    println!("[3] Value written = {:#X}", (third_block as *const u64).read());
  }
  println!("[3] Address = {:#x}, addr % 16 = {}", third_block as usize, third_block as usize % 16);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Release the first block.
  //    Unlike a pure bump allocator, this one coalesces eagerly and
  //    re-inserts the freed block into its size class's free list.
  // --------------------------------------------------------------------
  allocator.release(first_block);
  println!("\n[4] Released first_block at {first_block:?}");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) Allocate a small block to see whether the fit search reuses the
  //    block just freed in step 4.
  // --------------------------------------------------------------------
  let fifth_block = allocator.allocate(2);
  println!("\n[5] Allocate 2 bytes (check reuse of freed block) -> {fifth_block:?}");
  println!(
    "[5] fifth_block == first_block? {}",
    if fifth_block == first_block { "yes, the free-list reused it" } else { "no, placed elsewhere" }
  );
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 6) Allocate a block larger than the initial heap to trigger growth.
  // --------------------------------------------------------------------
  let big_block = allocator.allocate(64 * 1024);
  println!("\n[6] Allocate a 64 KiB block, forcing heap growth -> {big_block:?}");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 7) Grow the u64 allocation in place, then shrink it back down.
  // --------------------------------------------------------------------
  let grown = allocator.reallocate(third_block, 256);
  println!("\n[7] Reallocate third_block up to 256 bytes -> {grown:?}");
  let shrunk = allocator.reallocate(grown, 8);
  println!("[7] Reallocate back down to 8 bytes -> {shrunk:?}");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 8) Run the invariant checker explicitly and report the result.
  // --------------------------------------------------------------------
  match allocator.check() {
    Ok(()) => println!("\n[8] Invariant check passed."),
    Err(violation) => println!("\n[8] Invariant check FAILED: {violation}"),
  }

  allocator.release(second_block);
  allocator.release(fifth_block);
  allocator.release(big_block);
  allocator.release(shrunk);

  println!("\n[9] End of walkthrough. All live allocations released.");
}
