//! Reusable element fixtures.
//!
//! - [`Person`]: a fixed-size record with inline name storage, used by the
//!   growth scenarios and the benchmark workloads.
//! - [`sample_text`]: deterministic byte strings of a given length.

/// Maximum name length stored inline in a [`Person`].
pub const NAME_LEN: usize = 16;

/// A fixed-size record: inline name bytes plus an age.
///
/// Every `Person` has the same size, so a buffer of them exercises the
/// element-count-to-bytes arithmetic with a non-trivial element size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Person {
    name: [u8; NAME_LEN],
    name_len: u8,
    pub age: u32,
}

impl Person {
    /// Build a record, truncating `name` to [`NAME_LEN`] bytes.
    pub fn new(name: &str, age: u32) -> Self {
        let bytes = name.as_bytes();
        let len = bytes.len().min(NAME_LEN);
        let mut stored = [0u8; NAME_LEN];
        stored[..len].copy_from_slice(&bytes[..len]);
        Self {
            name: stored,
            name_len: len as u8,
            age,
        }
    }

    pub fn name(&self) -> &[u8] {
        &self.name[..self.name_len as usize]
    }

    /// The four records used by the walk-through scenarios.
    pub fn roster() -> [Person; 4] {
        [
            Person::new("Alice", 30),
            Person::new("Bob", 25),
            Person::new("Charlie", 35),
            Person::new("Diana", 28),
        ]
    }
}

/// Deterministic printable bytes of length `len` (`a..z` repeating).
pub fn sample_text(len: usize) -> Vec<u8> {
    (0..len).map(|i| b'a' + (i % 26) as u8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_names_are_truncated() {
        let p = Person::new("Maximilian-Alexander", 40);
        assert_eq!(p.name(), b"Maximilian-Alexa");
    }

    #[test]
    fn roster_is_stable() {
        let roster = Person::roster();
        assert_eq!(roster[2].name(), b"Charlie");
        assert_eq!(roster[3].age, 28);
    }

    #[test]
    fn sample_text_wraps_alphabet() {
        let text = sample_text(28);
        assert_eq!(&text[..3], b"abc");
        assert_eq!(&text[26..], b"ab");
    }
}
