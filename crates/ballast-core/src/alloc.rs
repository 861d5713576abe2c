//! The allocator capability and its shipped implementations.
//!
//! Every buffer in the workspace is parameterised over an [`Allocator`].
//! The trait carries exactly three operations: allocate, deallocate, and
//! reallocate. Requests are described by a [`Layout`] so that element
//! alignment reaches the platform allocator; a failed request is `None`.
//!
//! Buffers never request zero-sized layouts. Zero-sized element types are
//! handled above this layer without touching the allocator.

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::fmt;
use std::ptr::NonNull;

/// A source of raw memory for buffers.
///
/// # Safety
///
/// Implementors must return regions that are valid for reads and writes of
/// `layout.size()` bytes, aligned to `layout.align()`, and not aliased by
/// any other live allocation. `reallocate` must preserve the first
/// `min(old_layout.size(), new_size)` bytes. Buffers rely on these
/// guarantees to hand out safe slices over the returned memory.
pub unsafe trait Allocator {
    /// Allocate a region described by `layout`.
    ///
    /// Returns `None` when the request cannot be satisfied.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Release a region previously returned by this allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must have been returned by `allocate` or `reallocate` on this
    /// allocator with a layout equal to `layout`, and must not be used
    /// afterwards.
    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout);

    /// Resize a region to `new_size` bytes, keeping `old_layout.align()`.
    ///
    /// `old_layout` is passed for allocators that must know the prior
    /// extent (arenas, pools). On `None` the original region is untouched
    /// and still owned by the caller.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live region from this allocator with layout
    /// `old_layout`, and `new_size` must be non-zero and must not overflow
    /// `isize` when rounded up to `old_layout.align()`.
    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>>;
}

unsafe impl<A: Allocator + ?Sized> Allocator for &A {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        (**self).allocate(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: forwarded verbatim; the caller upholds the contract.
        unsafe { (**self).deallocate(ptr, layout) }
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        // SAFETY: forwarded verbatim; the caller upholds the contract.
        unsafe { (**self).reallocate(ptr, old_layout, new_size) }
    }
}

/// The platform allocator.
///
/// Zero-sized and stateless: every buffer that uses it carries no extra
/// bytes, and two `System` values are interchangeable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct System;

unsafe impl Allocator for System {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return None;
        }
        // SAFETY: layout has a non-zero size.
        NonNull::new(unsafe { std::alloc::alloc(layout) })
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: ptr came from `alloc`/`realloc` with this layout.
        unsafe { std::alloc::dealloc(ptr.as_ptr(), layout) }
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        // SAFETY: ptr is live with old_layout; new_size is non-zero and
        // in range per the caller contract.
        NonNull::new(unsafe { std::alloc::realloc(ptr.as_ptr(), old_layout, new_size) })
    }
}

/// Signature of [`FnAllocator`]'s allocate operation.
pub type AllocateFn = fn(Layout) -> Option<NonNull<u8>>;

/// Signature of [`FnAllocator`]'s deallocate operation.
pub type DeallocateFn = unsafe fn(NonNull<u8>, Layout);

/// Signature of [`FnAllocator`]'s reallocate operation.
pub type ReallocateFn = unsafe fn(NonNull<u8>, Layout, usize) -> Option<NonNull<u8>>;

/// An allocator assembled from three plain functions.
///
/// Useful when the allocator is chosen at runtime (for example by an
/// embedding application) but the buffer type should stay the same.
/// Copying an `FnAllocator` copies three function pointers.
#[derive(Clone, Copy)]
pub struct FnAllocator {
    allocate: AllocateFn,
    deallocate: DeallocateFn,
    reallocate: ReallocateFn,
}

impl FnAllocator {
    /// Bundle three functions into an allocator.
    ///
    /// # Safety
    ///
    /// Together the functions must satisfy the [`Allocator`] contract:
    /// `deallocate` and `reallocate` must accept every region produced by
    /// `allocate` and `reallocate`.
    pub const unsafe fn new(
        allocate: AllocateFn,
        deallocate: DeallocateFn,
        reallocate: ReallocateFn,
    ) -> Self {
        Self {
            allocate,
            deallocate,
            reallocate,
        }
    }

    /// The platform allocator expressed as a function bundle.
    pub const fn system() -> Self {
        Self {
            allocate: system_allocate,
            deallocate: system_deallocate,
            reallocate: system_reallocate,
        }
    }
}

impl Default for FnAllocator {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for FnAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAllocator")
            .field("allocate", &(self.allocate as *const ()))
            .field("deallocate", &(self.deallocate as *const ()))
            .field("reallocate", &(self.reallocate as *const ()))
            .finish()
    }
}

unsafe impl Allocator for FnAllocator {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        (self.allocate)(layout)
    }

    unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: the bundle was declared contract-abiding in `new`.
        unsafe { (self.deallocate)(ptr, layout) }
    }

    unsafe fn reallocate(
        &self,
        ptr: NonNull<u8>,
        old_layout: Layout,
        new_size: usize,
    ) -> Option<NonNull<u8>> {
        // SAFETY: the bundle was declared contract-abiding in `new`.
        unsafe { (self.reallocate)(ptr, old_layout, new_size) }
    }
}

fn system_allocate(layout: Layout) -> Option<NonNull<u8>> {
    System.allocate(layout)
}

unsafe fn system_deallocate(ptr: NonNull<u8>, layout: Layout) {
    // SAFETY: forwarded from the caller.
    unsafe { System.deallocate(ptr, layout) }
}

unsafe fn system_reallocate(
    ptr: NonNull<u8>,
    old_layout: Layout,
    new_size: usize,
) -> Option<NonNull<u8>> {
    // SAFETY: forwarded from the caller.
    unsafe { System.reallocate(ptr, old_layout, new_size) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill_and_check<A: Allocator>(alloc: &A) {
        let layout = Layout::array::<u32>(8).unwrap();
        let ptr = alloc.allocate(layout).unwrap();
        // SAFETY: ptr is valid for 8 u32s, freshly allocated.
        unsafe {
            let words = ptr.cast::<u32>().as_ptr();
            for i in 0..8 {
                words.add(i).write(i as u32 * 3);
            }
            let grown = alloc.reallocate(ptr, layout, 16 * 4).unwrap();
            let words = grown.cast::<u32>().as_ptr();
            for i in 0..8 {
                assert_eq!(words.add(i).read(), i as u32 * 3);
            }
            alloc.deallocate(grown, Layout::array::<u32>(16).unwrap());
        }
    }

    #[test]
    fn system_preserves_contents_across_realloc() {
        fill_and_check(&System);
    }

    #[test]
    fn fn_bundle_preserves_contents_across_realloc() {
        fill_and_check(&FnAllocator::system());
    }

    #[test]
    fn borrowed_allocator_forwards() {
        let system = System;
        fill_and_check(&&system);
    }

    #[test]
    fn zero_sized_request_is_refused() {
        assert!(System.allocate(Layout::new::<()>()).is_none());
    }

    #[test]
    fn allocation_respects_alignment() {
        let layout = Layout::from_size_align(64, 64).unwrap();
        let ptr = System.allocate(layout).unwrap();
        assert_eq!(ptr.as_ptr() as usize % 64, 0);
        // SAFETY: allocated above with the same layout.
        unsafe { System.deallocate(ptr, layout) };
    }

    #[test]
    fn custom_bundle_is_invoked() {
        fn refuse(_: Layout) -> Option<NonNull<u8>> {
            None
        }
        // SAFETY: `refuse` never hands out memory, so the system
        // deallocate/reallocate are never reached with foreign regions.
        let alloc = unsafe { FnAllocator::new(refuse, system_deallocate, system_reallocate) };
        assert!(alloc.allocate(Layout::new::<u64>()).is_none());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn realloc_keeps_prefix(
                bytes in proptest::collection::vec(any::<u8>(), 1..256),
                new_size in 1usize..512,
            ) {
                let layout = Layout::array::<u8>(bytes.len()).unwrap();
                let ptr = System.allocate(layout).unwrap();
                // SAFETY: ptr is valid for bytes.len() bytes; after realloc
                // it is valid for new_size bytes.
                unsafe {
                    std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len());
                    let moved = System.reallocate(ptr, layout, new_size).unwrap();
                    let kept = bytes.len().min(new_size);
                    let view = std::slice::from_raw_parts(moved.as_ptr(), kept);
                    prop_assert_eq!(view, &bytes[..kept]);
                    System.deallocate(moved, Layout::array::<u8>(new_size).unwrap());
                }
            }
        }
    }
}
