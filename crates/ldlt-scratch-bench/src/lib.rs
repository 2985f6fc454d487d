//! Benchmark profiles for ldlt-scratch.
//!
//! Workspace shapes matching what an LDLT update kernel requests:
//!
//! - [`ldlt_profile`]: `n × n` factor, pivot vector, and work vector
//! - [`SMALL_N`] fits under the default stack threshold, [`LARGE_N`] does not

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use ldlt_scratch::BufferSpec;

/// Dimension whose [`ldlt_profile`] is served from frame storage.
pub const SMALL_N: usize = 16;

/// Dimension whose [`ldlt_profile`] spills to the heap.
pub const LARGE_N: usize = 128;

/// Factor, pivots, and work vector for an `n`-dimensional LDLT step.
pub fn ldlt_profile(n: usize) -> [BufferSpec; 3] {
    [
        BufferSpec::matrix::<f64>("l", n, n),
        BufferSpec::vector::<f64>("d", n),
        BufferSpec::vector::<f64>("work", n),
    ]
}

/// A wide mixed-type profile for layout planning benchmarks.
pub fn mixed_profile() -> [BufferSpec; 6] {
    [
        BufferSpec::matrix::<f64>("l", 12, 12),
        BufferSpec::vector::<f64>("d", 12),
        BufferSpec::vector::<f32>("scale", 12),
        BufferSpec::vector::<u8>("mask", 12),
        BufferSpec::vector::<usize>("perm", 12),
        BufferSpec::matrix_strided::<f64>("panel", 12, 4, 16),
    ]
}
