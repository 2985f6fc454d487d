//! Typed windows over scratch memory.
//!
//! Views never own memory. They wrap an exclusive borrow of part of a
//! [`ScopedBuffer`](crate::ScopedBuffer), so the borrow checker bounds
//! their lifetime by the buffer's.

use std::ops::{Deref, DerefMut, Index, IndexMut};

/// A mutable 1-D window of `T`.
#[derive(Debug)]
pub struct VectorView<'a, T> {
    data: &'a mut [T],
}

impl<'a, T> VectorView<'a, T> {
    pub(crate) fn new(data: &'a mut [T]) -> Self {
        Self { data }
    }

    /// Give up the view wrapper and keep the slice.
    pub fn into_slice(self) -> &'a mut [T] {
        self.data
    }
}

impl<T> Deref for VectorView<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.data
    }
}

impl<T> DerefMut for VectorView<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.data
    }
}

/// A mutable column-major 2-D window of `T`.
///
/// Element `(i, j)` lives at `data[i + j * stride]`; `stride >= rows`.
#[derive(Debug)]
pub struct MatrixView<'a, T> {
    data: &'a mut [T],
    rows: usize,
    cols: usize,
    stride: usize,
}

impl<'a, T: Copy> MatrixView<'a, T> {
    /// Elements a `rows × cols` matrix with column stride `stride` spans.
    pub(crate) fn required_len(rows: usize, cols: usize, stride: usize) -> Option<usize> {
        if cols == 0 {
            return Some(0);
        }
        stride.checked_mul(cols - 1)?.checked_add(rows)
    }

    /// Caller has checked `stride >= rows` and
    /// `data.len() >= required_len(rows, cols, stride)`.
    pub(crate) fn new(data: &'a mut [T], rows: usize, cols: usize, stride: usize) -> Self {
        debug_assert!(stride >= rows);
        debug_assert!(Self::required_len(rows, cols, stride).is_some_and(|n| n <= data.len()));
        Self {
            data,
            rows,
            cols,
            stride,
        }
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns.
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Distance in elements between the starts of adjacent columns.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Element `(row, col)`, or `None` if out of range.
    pub fn get(&self, row: usize, col: usize) -> Option<T> {
        (row < self.rows && col < self.cols).then(|| self.data[row + col * self.stride])
    }

    /// Mutable element `(row, col)`, or `None` if out of range.
    pub fn get_mut(&mut self, row: usize, col: usize) -> Option<&mut T> {
        if row < self.rows && col < self.cols {
            Some(&mut self.data[row + col * self.stride])
        } else {
            None
        }
    }

    /// Column `col` as a slice of `rows` elements.
    ///
    /// # Panics
    ///
    /// Panics if `col >= cols`.
    pub fn col(&self, col: usize) -> &[T] {
        assert!(col < self.cols, "column {col} out of range ({})", self.cols);
        let start = col * self.stride;
        &self.data[start..start + self.rows]
    }

    /// Column `col` as a mutable slice of `rows` elements.
    ///
    /// # Panics
    ///
    /// Panics if `col >= cols`.
    pub fn col_mut(&mut self, col: usize) -> &mut [T] {
        assert!(col < self.cols, "column {col} out of range ({})", self.cols);
        let start = col * self.stride;
        &mut self.data[start..start + self.rows]
    }

    /// Set every in-range element to `value`. Stride padding is untouched.
    pub fn fill(&mut self, value: T) {
        for j in 0..self.cols {
            self.col_mut(j).fill(value);
        }
    }

    /// The underlying storage, including stride padding.
    pub fn as_slice(&self) -> &[T] {
        self.data
    }

    /// The underlying storage, including stride padding.
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.data
    }
}

impl<T: Copy> Index<(usize, usize)> for MatrixView<'_, T> {
    type Output = T;

    fn index(&self, (row, col): (usize, usize)) -> &T {
        assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) out of range for {}x{} matrix",
            self.rows,
            self.cols
        );
        &self.data[row + col * self.stride]
    }
}

impl<T: Copy> IndexMut<(usize, usize)> for MatrixView<'_, T> {
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut T {
        assert!(
            row < self.rows && col < self.cols,
            "index ({row}, {col}) out of range for {}x{} matrix",
            self.rows,
            self.cols
        );
        &mut self.data[row + col * self.stride]
    }
}
