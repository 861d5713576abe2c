//! Core types and traits for the Ballast buffer workspace.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the abstractions every buffer type is built against:
//!
//! - [`Allocator`]: the three-operation memory capability (allocate,
//!   deallocate, reallocate) that buffers draw their storage from.
//! - [`System`]: the default allocator, a zero-sized wrapper over the
//!   platform allocator.
//! - [`FnAllocator`]: an allocator assembled from three plain functions,
//!   for embedders that select an allocator at runtime.
//! - [`BufferError`]: the error type shared by all buffer operations.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod alloc;
pub mod error;

pub use alloc::{Allocator, FnAllocator, System};
pub use error::BufferError;
