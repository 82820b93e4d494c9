//! Maps a free block's size to one of the 14 segregated size classes.
//!
//! | Class | Band           |
//! |-------|----------------|
//! | 0     | 0–16           |
//! | 1     | 17–32          |
//! | 2     | 33–64          |
//! | 3     | 65–128         |
//! | 4     | 129–256        |
//! | 5     | 257–512        |
//! | 6     | 513–1024       |
//! | 7     | 1025–2048      |
//! | 8     | 2049–4096      |
//! | 9     | 4097–8192      |
//! | 10    | 8193–16384     |
//! | 11    | 16385–32768    |
//! | 12    | 32769–65536    |
//! | 13    | > 65536        |
//!
//! Size 16 is a closed-interval member of class 0 (`size <= 16`, not
//! `size < 17` chained with a separate `size < 33` branch) — the exact
//! ambiguity the design flags, resolved once here rather than left to
//! drift between call sites.

/// Number of segregated free-list classes.
pub const NUM_CLASSES: usize = 14;

/// Returns the size class that a free block of the given size belongs to.
///
/// The router is monotone: `s1 <= s2` implies `class_of(s1) <= class_of(s2)`,
/// which is what lets fit search stop scanning once the classes run out
/// rather than backtrack.
pub(crate) const fn class_of(size: usize) -> usize {
  if size <= 16 {
    return 0;
  }
  let mut upper = 32usize;
  let mut class = 1usize;
  while class < NUM_CLASSES - 1 {
    if size <= upper {
      return class;
    }
    upper <<= 1;
    class += 1;
  }
  NUM_CLASSES - 1
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn bands_match_the_table() {
    let cases: &[(usize, usize)] = &[
      (16, 0),
      (17, 1),
      (32, 1),
      (33, 2),
      (64, 2),
      (65, 3),
      (128, 3),
      (129, 4),
      (256, 4),
      (257, 5),
      (512, 5),
      (513, 6),
      (1024, 6),
      (1025, 7),
      (2048, 7),
      (2049, 8),
      (4096, 8),
      (4097, 9),
      (8192, 9),
      (8193, 10),
      (16384, 10),
      (16385, 11),
      (32768, 11),
      (32769, 12),
      (65536, 12),
      (65537, 13),
      (1 << 20, 13),
    ];
    for &(size, expected) in cases {
      assert_eq!(class_of(size), expected, "size {size}");
    }
  }

  #[test]
  fn router_is_monotone() {
    let mut previous = class_of(16);
    for size in (16..=200_000usize).step_by(16) {
      let class = class_of(size);
      assert!(class >= previous, "router not monotone at size {size}");
      assert!(class < NUM_CLASSES);
      previous = class;
    }
  }

  #[test]
  fn router_is_total_up_to_the_last_class() {
    assert_eq!(class_of(usize::MAX), NUM_CLASSES - 1);
  }
}
