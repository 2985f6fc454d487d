//! Test utilities for ldlt-scratch development.
//!
//! Instrumented [`HeapSource`] implementations:
//!
//! - [`CountingHeap`]: forwards to the system heap and counts allocations
//!   and releases, so tests can assert every heap region is freed exactly
//!   once.
//! - [`FailingHeap`]: refuses every allocation.
//! - [`BudgetHeap`]: a [`CountingHeap`] that refuses requests once a byte
//!   budget is spent.
//!
//! Counters are shared through `Arc`, so a clone handed to a buffer reports
//! into the same statistics the test inspects.

#![deny(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::alloc::Layout;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ldlt_scratch::{HeapSource, SystemHeap};

/// Shared allocation statistics.
#[derive(Debug, Default)]
pub struct HeapStats {
    allocations: AtomicUsize,
    releases: AtomicUsize,
    failures: AtomicUsize,
    live_bytes: AtomicUsize,
}

impl HeapStats {
    /// Successful allocations so far.
    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::SeqCst)
    }

    /// Releases so far.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Refused allocation requests so far.
    pub fn failures(&self) -> usize {
        self.failures.load(Ordering::SeqCst)
    }

    /// Bytes currently allocated and not yet released.
    pub fn live_bytes(&self) -> usize {
        self.live_bytes.load(Ordering::SeqCst)
    }

    /// Allocations not yet released.
    pub fn outstanding(&self) -> usize {
        self.allocations() - self.releases()
    }
}

/// System heap wrapper that records every allocation and release.
#[derive(Clone, Debug, Default)]
pub struct CountingHeap {
    stats: Arc<HeapStats>,
}

impl CountingHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The statistics shared by every clone of this heap.
    pub fn stats(&self) -> &HeapStats {
        &self.stats
    }
}

// SAFETY: forwards to `SystemHeap`, adding only counter updates.
#[allow(unsafe_code)]
unsafe impl HeapSource for CountingHeap {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        match SystemHeap.allocate(layout) {
            Some(ptr) => {
                self.stats.allocations.fetch_add(1, Ordering::SeqCst);
                self.stats.live_bytes.fetch_add(layout.size(), Ordering::SeqCst);
                Some(ptr)
            }
            None => {
                self.stats.failures.fetch_add(1, Ordering::SeqCst);
                None
            }
        }
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        self.stats.releases.fetch_add(1, Ordering::SeqCst);
        self.stats.live_bytes.fetch_sub(layout.size(), Ordering::SeqCst);
        // SAFETY: ptr came from `SystemHeap.allocate(layout)` in `allocate`.
        unsafe { SystemHeap.free(ptr, layout) }
    }
}

/// A heap that refuses every request.
#[derive(Clone, Debug, Default)]
pub struct FailingHeap {
    attempts: Arc<AtomicUsize>,
}

impl FailingHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocation requests received so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

// SAFETY: never returns a pointer, so `free` is never legitimately called.
#[allow(unsafe_code)]
unsafe impl HeapSource for FailingHeap {
    fn allocate(&self, _layout: Layout) -> Option<NonNull<u8>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        None
    }

    unsafe fn free(&self, _ptr: NonNull<u8>, _layout: Layout) {
        panic!("FailingHeap::free called, but FailingHeap never allocates");
    }
}

/// A counting heap with a total byte budget across all live allocations.
#[derive(Clone, Debug)]
pub struct BudgetHeap {
    inner: CountingHeap,
    budget: usize,
}

impl BudgetHeap {
    /// Allow at most `budget` live bytes at any time.
    pub fn new(budget: usize) -> Self {
        Self {
            inner: CountingHeap::new(),
            budget,
        }
    }

    pub fn stats(&self) -> &HeapStats {
        self.inner.stats()
    }
}

// SAFETY: either refuses or forwards to `CountingHeap`.
#[allow(unsafe_code)]
unsafe impl HeapSource for BudgetHeap {
    fn allocate(&self, layout: Layout) -> Option<NonNull<u8>> {
        let live = self.inner.stats().live_bytes();
        if live.saturating_add(layout.size()) > self.budget {
            self.inner.stats.failures.fetch_add(1, Ordering::SeqCst);
            return None;
        }
        self.inner.allocate(layout)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, layout: Layout) {
        // SAFETY: guaranteed by the caller; ptr came from `self.inner`.
        unsafe { self.inner.free(ptr, layout) }
    }
}
