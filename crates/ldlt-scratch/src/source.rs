//! Memory sources a [`ScopedBuffer`](crate::ScopedBuffer) draws from.
//!
//! Two capabilities are consumed, never synthesized, by this crate:
//!
//! - [`StackSource`]: storage owned by the calling frame. The canonical
//!   implementation is [`InlineStack`], a fixed-size aligned byte array the
//!   caller declares as a local variable. Targets or callers without usable
//!   frame storage pass [`HeapOnly`] instead.
//! - [`HeapSource`]: the system allocator ([`SystemHeap`]) or an
//!   instrumented stand-in used by tests.

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::mem::MaybeUninit;
use std::ptr::NonNull;

use crate::config::ScratchConfig;

/// Byte capacity of the [`InlineStack`] used by
/// [`with_workspace`](crate::with_workspace).
pub const DEFAULT_INLINE_BYTES: usize = ScratchConfig::DEFAULT_STACK_THRESHOLD;

/// Storage owned by the caller's own frame.
///
/// # Safety
///
/// A pointer returned by [`carve`](StackSource::carve) must be aligned to
/// `align`, valid for reads and writes of `len` bytes, and not aliased by
/// anything else for as long as the source stays mutably borrowed.
/// [`ScopedBuffer`](crate::ScopedBuffer) holds that borrow for its whole
/// life, which is what keeps the region from escaping the frame.
pub unsafe trait StackSource {
    /// Reserve `len` bytes aligned to `align` (a power of two).
    ///
    /// Returns `None` if the storage is too small, in which case the caller
    /// falls back to the heap.
    fn carve(&mut self, len: usize, align: usize) -> Option<NonNull<u8>>;

    /// Total bytes this source can ever provide.
    fn capacity(&self) -> usize;
}

/// A fixed-size, cacheline-aligned byte array for use as a local variable.
///
/// ```
/// use ldlt_scratch::{InlineStack, StackSource};
///
/// let mut frame = InlineStack::<1024>::new();
/// assert_eq!(frame.capacity(), 1024);
/// assert!(frame.carve(512, 64).is_some());
/// assert!(frame.carve(2048, 64).is_none());
/// ```
#[repr(C, align(64))]
pub struct InlineStack<const N: usize> {
    bytes: [MaybeUninit<u8>; N],
}

impl<const N: usize> InlineStack<N> {
    /// Uninitialized storage of `N` bytes.
    pub const fn new() -> Self {
        Self {
            bytes: [MaybeUninit::uninit(); N],
        }
    }
}

impl<const N: usize> Default for InlineStack<N> {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: the returned pointer lies inside `self.bytes`, is aligned by
// construction, and the region is only reachable through `&mut self`.
unsafe impl<const N: usize> StackSource for InlineStack<N> {
    fn carve(&mut self, len: usize, align: usize) -> Option<NonNull<u8>> {
        if !align.is_power_of_two() {
            return None;
        }
        let base = self.bytes.as_mut_ptr().cast::<u8>();
        let pad = base.align_offset(align);
        if pad.checked_add(len)? > N {
            return None;
        }
        // SAFETY: pad + len <= N, so base + pad stays inside the array.
        NonNull::new(unsafe { base.add(pad) })
    }

    fn capacity(&self) -> usize {
        N
    }
}

/// A stack source that never yields memory; every request goes to the heap.
#[derive(Clone, Copy, Debug, Default)]
pub struct HeapOnly;

// SAFETY: never returns a pointer.
unsafe impl StackSource for HeapOnly {
    fn carve(&mut self, _len: usize, _align: usize) -> Option<NonNull<u8>> {
        None
    }

    fn capacity(&self) -> usize {
        0
    }
}

/// A heap allocator consumed by [`ScopedBuffer`](crate::ScopedBuffer).
///
/// # Safety
///
/// `allocate` must return either `None` or a pointer valid for reads and
/// writes of `layout.size()` bytes aligned to `layout.align()`, which stays
/// valid until passed to `free` with the same layout.
pub unsafe trait HeapSource {
    /// Allocate uninitialized memory for `layout`. `layout.size()` is never
    /// zero.
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>>;

    /// Release memory previously returned by `allocate`.
    ///
    /// # Safety
    ///
    /// `ptr` must have come from `self.allocate(layout)` and not have been
    /// freed already.
    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout);
}

/// The global allocator via `std::alloc`.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemHeap;

// SAFETY: forwards to the global allocator, which upholds the contract.
unsafe impl HeapSource for SystemHeap {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        if layout.size() == 0 {
            return None;
        }
        // SAFETY: layout has non-zero size (checked above).
        NonNull::new(unsafe { alloc::alloc(layout) })
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: guaranteed by the caller.
        unsafe { alloc::dealloc(ptr.as_ptr(), layout) }
    }
}
