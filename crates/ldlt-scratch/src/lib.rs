//! Scoped stack-or-heap scratch workspaces for LDLT factorization kernels.
//!
//! Numeric kernels need short-lived vectors and column-major matrices for
//! intermediate results. This crate packs a set of such buffers into one
//! alignment-padded region, decides per request whether that region comes
//! from storage in the caller's own frame or from the heap, and releases it
//! exactly once when the owning value goes out of scope.
//!
//! # Architecture
//!
//! ```text
//! Workspace (request API)
//! ├── WorkspaceLayout   (named, ordered, padded offsets; IndexMap)
//! ├── SizeClassifier    (threshold test → Origin::Stack | Origin::Heap)
//! └── ScopedBuffer<'frame, H>
//!     ├── StackSource   (InlineStack<N> declared by the caller, or HeapOnly)
//!     └── HeapSource    (SystemHeap, or an instrumented source in tests)
//!         └── VectorView / MatrixView (borrowed typed windows)
//! ```
//!
//! # Frame safety
//!
//! Stack-backed memory lives in an [`InlineStack`] the caller declares as a
//! local. A [`ScopedBuffer`] mutably borrows that source for its whole life,
//! so returning the buffer (or any view into it) from the frame that owns
//! the storage is a borrow error, not undefined behaviour.
//!
//! ```
//! use ldlt_scratch::{BufferSpec, InlineStack, Origin, ScratchConfig, Workspace};
//!
//! let config = ScratchConfig::default();
//! let mut frame = InlineStack::<8192>::new();
//! let specs = [
//!     BufferSpec::vector::<f64>("d", 5),
//!     BufferSpec::matrix::<f64>("l", 3, 3),
//! ];
//! let mut ws = Workspace::request(&specs, &config, &mut frame)?;
//! assert_eq!(ws.origin(), Origin::Stack);
//!
//! let mut views = ws.views();
//! let mut d = views.vector::<f64>("d")?;
//! let mut l = views.matrix::<f64>("l")?;
//! d[0] = 1.0;
//! l[(2, 1)] = 4.0;
//! # Ok::<(), ldlt_scratch::ScratchError>(())
//! ```
//!
//! # Unsafe code
//!
//! The crate denies `unsafe_code` and re-allows it only in `raw`,
//! [`source`], [`element`], and [`buffer`], where each block carries a
//! `// SAFETY:` comment. Views and the workspace split are built from safe
//! slice operations on top of those.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod buffer;
pub mod classify;
pub mod config;
pub mod element;
pub mod error;
pub mod layout;
mod raw;
pub mod source;
pub mod view;
pub mod workspace;

// Public re-exports for the primary API surface.
pub use buffer::ScopedBuffer;
pub use classify::{should_use_stack, Origin, SizeClassifier};
pub use config::ScratchConfig;
pub use element::{Element, ElementLayout};
pub use error::ScratchError;
pub use layout::{align_step, round_up, BufferSlot, BufferSpec, DimensionSpec, WorkspaceLayout};
pub use source::{HeapOnly, HeapSource, InlineStack, StackSource, SystemHeap};
pub use view::{MatrixView, VectorView};
pub use workspace::{with_workspace, Workspace, WorkspaceViews};
