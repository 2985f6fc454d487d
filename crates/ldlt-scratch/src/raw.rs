//! Low-level primitives for scratch memory.
//!
//! The only place region pointers become slices. Every `unsafe` function
//! documents its contract; [`cast_slice_mut`] is the safe reinterpretation
//! used by both the buffer and the workspace view set.

#![allow(unsafe_code)]

use std::mem;
use std::ptr::{self, NonNull};
use std::slice;

use crate::element::Element;

/// A non-null pointer aligned to `align`, for regions with no backing memory.
pub(crate) fn dangling(align: usize) -> NonNull<u8> {
    NonNull::new(ptr::without_provenance_mut(align)).unwrap_or(NonNull::dangling())
}

/// Fill `len` bytes at `ptr` with zero.
///
/// # Safety
///
/// `ptr` must be valid for writes of `len` bytes.
pub(crate) unsafe fn zero(ptr: NonNull<u8>, len: usize) {
    // SAFETY: guaranteed by the caller.
    unsafe { ptr.as_ptr().write_bytes(0, len) }
}

/// View `len` initialized bytes at `ptr` as a shared slice.
///
/// # Safety
///
/// `ptr` must be valid and initialized for `len` bytes, and not mutated
/// for `'a`.
pub(crate) unsafe fn bytes<'a>(ptr: NonNull<u8>, len: usize) -> &'a [u8] {
    // SAFETY: guaranteed by the caller.
    unsafe { slice::from_raw_parts(ptr.as_ptr(), len) }
}

/// View `len` initialized bytes at `ptr` as an exclusive slice.
///
/// # Safety
///
/// `ptr` must be valid and initialized for `len` bytes, and not otherwise
/// accessed for `'a`.
pub(crate) unsafe fn bytes_mut<'a>(ptr: NonNull<u8>, len: usize) -> &'a mut [u8] {
    // SAFETY: guaranteed by the caller.
    unsafe { slice::from_raw_parts_mut(ptr.as_ptr(), len) }
}

/// Reinterpret `bytes` as a slice of `T`.
///
/// Returns `None` if the start is not aligned for `T`. Trailing bytes that
/// do not fill a whole element are left out of the result.
pub(crate) fn cast_slice_mut<T: Element>(bytes: &mut [u8]) -> Option<&mut [T]> {
    if bytes.as_ptr().addr() % mem::align_of::<T>() != 0 {
        return None;
    }
    let len = bytes.len() / mem::size_of::<T>();
    // SAFETY: the pointer is aligned for T, `len * size_of::<T>()` bytes are
    // in bounds and initialized, every bit pattern is a valid `T` (Element
    // contract), and the exclusive borrow moves into the result.
    Some(unsafe { slice::from_raw_parts_mut(bytes.as_mut_ptr().cast::<T>(), len) })
}
