//! Named multi-buffer workspaces: plan, classify, acquire once, slice.
//!
//! [`Workspace::request`] runs the whole pipeline for an ordered list of
//! [`BufferSpec`]s:
//!
//! 1. [`WorkspaceLayout::plan`] computes padded offsets and the total.
//! 2. [`SizeClassifier`] picks stack or heap for the total.
//! 3. [`ScopedBuffer::acquire_bytes`] acquires one region.
//! 4. [`Workspace::views`] splits the region into the declared typed views.
//!
//! [`with_workspace`] wraps all four around a closure, supplying an
//! [`InlineStack`] from its own frame.

use std::mem;

use smallvec::SmallVec;
use tracing::debug;

use crate::buffer::ScopedBuffer;
use crate::classify::{Origin, SizeClassifier};
use crate::config::ScratchConfig;
use crate::element::Element;
use crate::error::ScratchError;
use crate::layout::{BufferSlot, BufferSpec, DimensionSpec, WorkspaceLayout};
use crate::raw;
use crate::source::{HeapSource, InlineStack, StackSource, SystemHeap, DEFAULT_INLINE_BYTES};
use crate::view::{MatrixView, VectorView};

/// One scoped acquisition serving a set of named buffers.
#[derive(Debug)]
pub struct Workspace<'frame, H: HeapSource = SystemHeap> {
    buffer: ScopedBuffer<'frame, H>,
    layout: WorkspaceLayout,
}

impl<'frame> Workspace<'frame, SystemHeap> {
    /// Plan `specs` and acquire them as one region, using the system heap
    /// when the stack is not chosen or `stack` is too small.
    pub fn request<S: StackSource + ?Sized>(
        specs: &[BufferSpec],
        config: &ScratchConfig,
        stack: &'frame mut S,
    ) -> Result<Self, ScratchError> {
        Self::request_in(specs, config, stack, SystemHeap)
    }
}

impl<'frame, H: HeapSource> Workspace<'frame, H> {
    /// Like [`Workspace::request`] with an explicit heap source.
    pub fn request_in<S: StackSource + ?Sized>(
        specs: &[BufferSpec],
        config: &ScratchConfig,
        stack: &'frame mut S,
        heap: H,
    ) -> Result<Self, ScratchError> {
        let layout = WorkspaceLayout::plan(specs, config)?;
        let classifier = SizeClassifier::new(config);
        let buffer = ScopedBuffer::acquire_bytes(
            layout.total_bytes(),
            layout.alignment(),
            &classifier,
            stack,
            heap,
        )?;
        debug!(
            buffers = layout.len(),
            total_bytes = layout.total_bytes(),
            origin = ?buffer.origin(),
            "acquired workspace"
        );
        Ok(Self { buffer, layout })
    }

    /// Where the region's memory came from.
    pub fn origin(&self) -> Origin {
        self.buffer.origin()
    }

    /// The planned offset table.
    pub fn layout(&self) -> &WorkspaceLayout {
        &self.layout
    }

    /// Total bytes acquired.
    pub fn total_bytes(&self) -> usize {
        self.layout.total_bytes()
    }

    /// The underlying region.
    pub fn buffer(&self) -> &ScopedBuffer<'frame, H> {
        &self.buffer
    }

    /// Split the region into its named buffers.
    ///
    /// Every buffer can be taken once from the returned set; the views all
    /// borrow the workspace, so they can be used together.
    pub fn views(&mut self) -> WorkspaceViews<'_> {
        let mut rest = self.buffer.as_bytes_mut();
        let mut consumed = 0usize;
        let mut chunks = SmallVec::with_capacity(self.layout.len());
        for slot in self.layout.iter() {
            let (_, tail) = mem::take(&mut rest).split_at_mut(slot.offset - consumed);
            let (chunk, tail) = tail.split_at_mut(slot.raw_bytes);
            rest = tail;
            consumed = slot.end();
            chunks.push(Some(chunk));
        }
        WorkspaceViews {
            layout: &self.layout,
            chunks,
        }
    }
}

/// The named, typed views of one [`Workspace`].
pub struct WorkspaceViews<'w> {
    layout: &'w WorkspaceLayout,
    chunks: SmallVec<[Option<&'w mut [u8]>; 8]>,
}

impl<'w> WorkspaceViews<'w> {
    /// Take the vector buffer `name` as `T`.
    pub fn vector<T: Element>(
        &mut self,
        name: &'static str,
    ) -> Result<VectorView<'w, T>, ScratchError> {
        let (index, slot) = self.lookup::<T>(name)?;
        let DimensionSpec::Vector { .. } = slot.spec.dims else {
            return Err(ScratchError::ShapeMismatch { name });
        };
        let data = self.take::<T>(index, slot)?;
        Ok(VectorView::new(data))
    }

    /// Take the matrix buffer `name` as `T`.
    pub fn matrix<T: Element>(
        &mut self,
        name: &'static str,
    ) -> Result<MatrixView<'w, T>, ScratchError> {
        let (index, slot) = self.lookup::<T>(name)?;
        let DimensionSpec::Matrix { rows, cols, stride } = slot.spec.dims else {
            return Err(ScratchError::ShapeMismatch { name });
        };
        let data = self.take::<T>(index, slot)?;
        Ok(MatrixView::new(data, rows, cols, stride))
    }

    /// Whether `name` has not been taken yet.
    pub fn is_available(&self, name: &str) -> bool {
        self.layout
            .index_of(name)
            .is_some_and(|i| self.chunks[i].is_some())
    }

    fn lookup<T: Element>(&self, name: &'static str) -> Result<(usize, BufferSlot), ScratchError> {
        let (index, slot) = self
            .layout
            .get_full(name)
            .ok_or(ScratchError::UnknownBuffer { name })?;
        let slot = *slot;
        if !slot.spec.element.is::<T>() {
            return Err(ScratchError::TypeMismatch {
                name,
                expected: slot.spec.element.name,
                actual: T::NAME,
            });
        }
        Ok((index, slot))
    }

    fn take<T: Element>(
        &mut self,
        index: usize,
        slot: BufferSlot,
    ) -> Result<&'w mut [T], ScratchError> {
        let name = slot.spec.name;
        let chunk = self.chunks[index]
            .take()
            .ok_or(ScratchError::AlreadyBorrowed { name })?;
        raw::cast_slice_mut::<T>(chunk).ok_or(ScratchError::Misaligned {
            offset: slot.offset,
            align: slot.spec.element.align,
        })
    }
}

/// Run `f` with the views of a workspace backed by this function's own
/// frame when the request is small enough, or the heap otherwise.
///
/// ```
/// use ldlt_scratch::{with_workspace, BufferSpec, ScratchConfig, ScratchError};
///
/// let sum = with_workspace(
///     &[BufferSpec::vector::<f64>("tmp", 4)],
///     &ScratchConfig::default(),
///     |views| {
///         let mut tmp = views.vector::<f64>("tmp")?;
///         tmp.copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
///         Ok::<_, ScratchError>(tmp.iter().sum::<f64>())
///     },
/// )?;
/// assert_eq!(sum, 10.0);
/// # Ok::<(), ScratchError>(())
/// ```
pub fn with_workspace<R, E, F>(specs: &[BufferSpec], config: &ScratchConfig, f: F) -> Result<R, E>
where
    F: FnOnce(&mut WorkspaceViews<'_>) -> Result<R, E>,
    E: From<ScratchError>,
{
    let mut frame = InlineStack::<DEFAULT_INLINE_BYTES>::new();
    let mut workspace = Workspace::request(specs, config, &mut frame)?;
    let mut views = workspace.views();
    f(&mut views)
}
