//! Ballast: growable buffers that take their memory from a caller-chosen
//! allocator.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Ballast sub-crates. For most users, adding `ballast` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use ballast::prelude::*;
//!
//! // A sequence of records on the process heap.
//! let mut ages: SequenceBuffer<u32> = SequenceBuffer::with_capacity(2);
//! ages.push(30);
//! ages.push(25);
//! ages.push(35);
//! assert_eq!(ages.len(), 3);
//! assert!(ages.capacity() >= 4);
//! assert_eq!(ages.pop(), Some(35));
//!
//! // Text is always NUL-terminated once it owns storage.
//! let mut greeting = TextBuffer::from("Hello, ");
//! greeting.push_str("world!");
//! assert_eq!(greeting.as_c_str(), c"Hello, world!");
//!
//! // Index violations are reported, never undefined.
//! assert_eq!(
//!     greeting.remove(99),
//!     Err(BufferError::IndexOutOfBounds { index: 99, len: 13 })
//! );
//!
//! // Any allocator works, including a bundle of plain functions.
//! let mut text = TextBuffer::new_in(FnAllocator::system());
//! text.push_str("bundle");
//! assert_eq!(text.substring(0, 3).unwrap().as_bytes(), b"bun");
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`core`] | `ballast-core` | `Allocator` trait, `System`, `FnAllocator`, `BufferError` |
//! | [`buffer`] | `ballast-buffer` | `RawBuffer`, `SequenceBuffer`, `TextBuffer`, `BufferConfig` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Allocator contract and error type (`ballast-core`).
///
/// Implement [`core::Allocator`] to plug a custom memory source into every
/// buffer type.
pub use ballast_core as core;

/// Buffer types and their configuration (`ballast-buffer`).
///
/// [`buffer::RawBuffer`] manages capacity only, [`buffer::SequenceBuffer`]
/// adds a length and element semantics, and [`buffer::TextBuffer`] adds a
/// NUL terminator on top of a byte sequence.
pub use ballast_buffer as buffer;

/// Common imports for typical Ballast usage.
///
/// ```rust
/// use ballast::prelude::*;
/// ```
pub mod prelude {
    // Allocators
    pub use ballast_core::{Allocator, FnAllocator, System};

    // Errors
    pub use ballast_core::BufferError;

    // Buffers
    pub use ballast_buffer::{RawBuffer, SequenceBuffer, TextBuffer};

    // Configuration
    pub use ballast_buffer::{BufferConfig, ShrinkFailure};
}
