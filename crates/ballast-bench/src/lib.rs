//! Benchmark workloads and utilities for Ballast buffers.
//!
//! Provides deterministic inputs shared by the criterion benches:
//!
//! - [`PUSH_SIZES`]: element counts for the append benchmarks
//! - [`insert_positions`]: reproducible insertion indices via seed
//! - [`fill_people`]: a [`SequenceBuffer`] pre-filled with fixture records

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use ballast_buffer::SequenceBuffer;
use ballast_test_utils::Person;

/// Element counts used by the append benchmarks: small, cache-resident,
/// and large enough to cross several doublings.
pub const PUSH_SIZES: [usize; 3] = [64, 4_096, 262_144];

/// Generate `n` deterministic insertion indices for a text that starts at
/// `start_len` bytes and grows by one byte per insertion.
///
/// Each index is valid for the length the text has at that step.
pub fn insert_positions(start_len: usize, n: usize, seed: u64) -> Vec<usize> {
    let mut positions = Vec::with_capacity(n);
    let mut state = seed;
    for i in 0..n {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        let len = start_len + i;
        positions.push(((state >> 33) % (len as u64 + 1)) as usize);
    }
    positions
}

/// Build a sequence holding `n` records cycled from [`Person::roster`].
pub fn fill_people(n: usize) -> SequenceBuffer<Person> {
    let roster = Person::roster();
    let mut people = SequenceBuffer::with_capacity(n);
    for i in 0..n {
        people.push(roster[i % roster.len()]);
    }
    people
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_positions_stay_in_bounds() {
        let positions = insert_positions(10, 100, 42);
        assert_eq!(positions.len(), 100);
        for (i, &pos) in positions.iter().enumerate() {
            assert!(pos <= 10 + i, "position {pos} out of bounds at step {i}");
        }
    }

    #[test]
    fn insert_positions_deterministic() {
        assert_eq!(insert_positions(0, 16, 7), insert_positions(0, 16, 7));
    }

    #[test]
    fn fill_people_has_exact_capacity() {
        let people = fill_people(10);
        assert_eq!(people.len(), 10);
        assert_eq!(people.capacity(), 10);
    }
}
