//! One scoped scratch region, stack- or heap-backed.
//!
//! A [`ScopedBuffer`] moves through three states:
//!
//! ```text
//! Unacquired ──acquire──▶ Acquired{Stack | Heap} ──drop──▶ Released
//! ```
//!
//! There is no public release call. A heap region is freed by `Drop`, so it
//! is released exactly once on every exit path of the owning scope: normal
//! return, `?` early return, or unwinding. A stack region needs no release;
//! its storage belongs to the caller's frame.
//!
//! The `'frame` lifetime parameter is the mutable borrow of the
//! [`StackSource`]. Because the buffer holds that borrow, it cannot outlive
//! the storage it may point into:
//!
//! ```compile_fail
//! use ldlt_scratch::{InlineStack, ScopedBuffer, ScratchConfig, SystemHeap};
//!
//! fn escape() -> ScopedBuffer<'static> {
//!     let mut frame = InlineStack::<256>::new();
//!     ScopedBuffer::acquire::<f64>(4, &ScratchConfig::default(), &mut frame, SystemHeap)
//!         .unwrap()
//! }
//! ```

#![allow(unsafe_code)]

use std::alloc::Layout;
use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ptr::NonNull;

use tracing::{debug, trace};

use crate::classify::{Origin, SizeClassifier};
use crate::config::ScratchConfig;
use crate::element::Element;
use crate::error::ScratchError;
use crate::layout::{align_step, round_up};
use crate::raw;
use crate::source::{HeapSource, StackSource, SystemHeap};
use crate::view::{MatrixView, VectorView};

/// Exclusive owner (heap) or borrower (stack) of one zero-initialized
/// scratch region.
///
/// Not `Send` or `Sync`: a buffer is created and destroyed by the same call
/// frame.
pub struct ScopedBuffer<'frame, H: HeapSource = SystemHeap> {
    ptr: NonNull<u8>,
    len: usize,
    align: usize,
    origin: Origin,
    heap: H,
    _frame: PhantomData<&'frame mut [u8]>,
}

impl<'frame, H: HeapSource> ScopedBuffer<'frame, H> {
    /// Acquire room for `element_count` elements of `T`.
    ///
    /// The byte size is padded to `T`'s alignment granule under `config`
    /// and the region is aligned to `config.alignment`.
    pub fn acquire<T: Element>(
        element_count: usize,
        config: &ScratchConfig,
        stack: &'frame mut (impl StackSource + ?Sized),
        heap: H,
    ) -> Result<Self, ScratchError> {
        config.validate()?;
        let size = mem::size_of::<T>();
        let raw_bytes = element_count
            .checked_mul(size)
            .ok_or(ScratchError::SizeOverflow {
                what: "element count * element size",
            })?;
        let granule = align_step(config.alignment, size) * size;
        let len = round_up(raw_bytes, granule).ok_or(ScratchError::SizeOverflow {
            what: "alignment padding",
        })?;
        Self::acquire_bytes(
            len,
            config.alignment,
            &SizeClassifier::new(config),
            stack,
            heap,
        )
    }

    /// Acquire `len` bytes aligned to `align`.
    ///
    /// `classifier` picks the origin. A stack pick is served from `stack`;
    /// if `stack` is too small the request falls back to `heap`. A zero
    /// `len` touches no memory and reports [`Origin::Stack`].
    ///
    /// On error nothing has been acquired.
    pub fn acquire_bytes<S: StackSource + ?Sized>(
        len: usize,
        align: usize,
        classifier: &SizeClassifier,
        stack: &'frame mut S,
        heap: H,
    ) -> Result<Self, ScratchError> {
        if !align.is_power_of_two() {
            return Err(ScratchError::InvalidConfig {
                reason: format!("alignment must be a power of two, got {align}"),
            });
        }

        if len == 0 {
            return Ok(Self::from_parts(raw::dangling(align), 0, align, Origin::Stack, heap));
        }

        if classifier.classify_bytes(len) == Origin::Stack {
            if let Some(ptr) = stack.carve(len, align) {
                // SAFETY: carve returned `len` writable bytes.
                unsafe { raw::zero(ptr, len) };
                trace!(bytes = len, align, "acquired stack scratch");
                return Ok(Self::from_parts(ptr, len, align, Origin::Stack, heap));
            }
            debug!(
                bytes = len,
                capacity = stack.capacity(),
                "stack source too small, falling back to heap"
            );
        }

        let layout = Layout::from_size_align(len, align).map_err(|_| ScratchError::SizeOverflow {
            what: "allocation layout",
        })?;
        let ptr = heap
            .allocate(layout)
            .ok_or(ScratchError::AllocationFailed { bytes: len, align })?;
        // SAFETY: allocate returned `len` writable bytes.
        unsafe { raw::zero(ptr, len) };
        debug!(bytes = len, align, "acquired heap scratch");
        Ok(Self::from_parts(ptr, len, align, Origin::Heap, heap))
    }

    fn from_parts(ptr: NonNull<u8>, len: usize, align: usize, origin: Origin, heap: H) -> Self {
        Self {
            ptr,
            len,
            align,
            origin,
            heap,
            _frame: PhantomData,
        }
    }

    /// Where the region's memory came from.
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Region length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the region is empty.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Alignment of the region's start.
    pub fn align(&self) -> usize {
        self.align
    }

    /// Start of the region.
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    /// The region's bytes.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: the region is `len` initialized bytes owned or borrowed by
        // self; the shared borrow of self prevents mutation.
        unsafe { raw::bytes(self.ptr, self.len) }
    }

    /// The region's bytes, mutably.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: as above, with exclusivity from `&mut self`.
        unsafe { raw::bytes_mut(self.ptr, self.len) }
    }

    /// View `len` elements of `T` starting `offset` bytes into the region.
    pub fn slice_vector<T: Element>(
        &mut self,
        offset: usize,
        len: usize,
    ) -> Result<VectorView<'_, T>, ScratchError> {
        let bytes = len
            .checked_mul(mem::size_of::<T>())
            .ok_or(ScratchError::SizeOverflow {
                what: "vector view size",
            })?;
        let data = self.typed_range::<T>(offset, bytes)?;
        Ok(VectorView::new(data))
    }

    /// View a `rows × cols` column-major matrix of `T` with column stride
    /// `stride`, starting `offset` bytes into the region.
    pub fn slice_matrix<T: Element>(
        &mut self,
        offset: usize,
        rows: usize,
        cols: usize,
        stride: usize,
    ) -> Result<MatrixView<'_, T>, ScratchError> {
        if stride < rows {
            return Err(ScratchError::InvalidStride { rows, stride });
        }
        let bytes = MatrixView::<T>::required_len(rows, cols, stride)
            .and_then(|n| n.checked_mul(mem::size_of::<T>()))
            .ok_or(ScratchError::SizeOverflow {
                what: "matrix view size",
            })?;
        let data = self.typed_range::<T>(offset, bytes)?;
        Ok(MatrixView::new(data, rows, cols, stride))
    }

    fn typed_range<T: Element>(
        &mut self,
        offset: usize,
        bytes: usize,
    ) -> Result<&mut [T], ScratchError> {
        let capacity = self.len;
        let end = offset
            .checked_add(bytes)
            .filter(|&end| end <= capacity)
            .ok_or(ScratchError::OutOfBounds {
                offset,
                len: bytes,
                capacity,
            })?;
        let align = mem::align_of::<T>();
        raw::cast_slice_mut::<T>(&mut self.as_bytes_mut()[offset..end])
            .ok_or(ScratchError::Misaligned { offset, align })
    }
}

impl<H: HeapSource> Drop for ScopedBuffer<'_, H> {
    fn drop(&mut self) {
        if self.origin != Origin::Heap {
            return;
        }
        // Constructed by `acquire_bytes` from this exact size and align.
        if let Ok(layout) = Layout::from_size_align(self.len, self.align) {
            // SAFETY: ptr came from `self.heap.allocate(layout)` and drop
            // runs once.
            unsafe { self.heap.free(self.ptr, layout) };
            debug!(bytes = self.len, align = self.align, "released heap scratch");
        }
    }
}

impl<H: HeapSource> fmt::Debug for ScopedBuffer<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedBuffer")
            .field("origin", &self.origin)
            .field("len", &self.len)
            .field("align", &self.align)
            .finish()
    }
}
