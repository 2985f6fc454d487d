//! Alignment planning for multi-buffer workspaces.
//!
//! A [`WorkspaceLayout`] packs an ordered list of named [`BufferSpec`]s into
//! one contiguous region. Each buffer's byte size is rounded up to the
//! alignment granule of its element type, and each buffer starts at the
//! running sum of the rounded sizes before it:
//!
//! ```text
//! offset[0] = 0
//! offset[i] = offset[i-1] + round_up(raw[i-1], granule[i-1])
//! total     = offset[n-1] + round_up(raw[n-1], granule[n-1])
//! ```
//!
//! Slots are stored in an `IndexMap` so lookup by name is O(1) while
//! declaration order is preserved.

use indexmap::IndexMap;
use tracing::trace;

use crate::config::ScratchConfig;
use crate::element::{Element, ElementLayout};
use crate::error::ScratchError;

/// Round `size` up to the next multiple of `step`.
///
/// A `step` of zero is treated as one. Returns `None` only if the result
/// does not fit in `usize`.
pub fn round_up(size: usize, step: usize) -> Option<usize> {
    size.checked_next_multiple_of(step.max(1))
}

/// Number of elements of `element_size` bytes per alignment granule.
///
/// `alignment / element_size`, floored at one so element types wider than
/// the alignment still get a non-zero step.
pub fn align_step(alignment: usize, element_size: usize) -> usize {
    (alignment / element_size.max(1)).max(1)
}

/// Shape of one scratch buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DimensionSpec {
    /// A contiguous vector of `len` elements.
    Vector {
        /// Element count.
        len: usize,
    },
    /// A column-major matrix. Column `j` starts at element `j * stride`.
    Matrix {
        /// Row count.
        rows: usize,
        /// Column count.
        cols: usize,
        /// Distance in elements between column starts; `stride >= rows`.
        stride: usize,
    },
}

impl DimensionSpec {
    /// A vector of `len` elements.
    pub fn vector(len: usize) -> Self {
        Self::Vector { len }
    }

    /// A densely packed column-major matrix (`stride == rows`).
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self::Matrix {
            rows,
            cols,
            stride: rows,
        }
    }

    /// Elements reserved for this shape (`stride * cols` for matrices).
    ///
    /// Returns `None` on overflow.
    pub fn element_count(&self) -> Option<usize> {
        match *self {
            Self::Vector { len } => Some(len),
            Self::Matrix { cols, stride, .. } => stride.checked_mul(cols),
        }
    }

    fn check_stride(&self) -> Result<(), ScratchError> {
        match *self {
            Self::Matrix { rows, stride, .. } if stride < rows => {
                Err(ScratchError::InvalidStride { rows, stride })
            }
            _ => Ok(()),
        }
    }
}

/// A named, typed buffer declaration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferSpec {
    /// Name used to retrieve the view.
    pub name: &'static str,
    /// Element type stored in the buffer.
    pub element: ElementLayout,
    /// Vector or matrix shape.
    pub dims: DimensionSpec,
}

impl BufferSpec {
    /// Declare a vector of `len` elements of `T`.
    pub fn vector<T: Element>(name: &'static str, len: usize) -> Self {
        Self {
            name,
            element: ElementLayout::of::<T>(),
            dims: DimensionSpec::vector(len),
        }
    }

    /// Declare a dense `rows × cols` column-major matrix of `T`.
    pub fn matrix<T: Element>(name: &'static str, rows: usize, cols: usize) -> Self {
        Self {
            name,
            element: ElementLayout::of::<T>(),
            dims: DimensionSpec::matrix(rows, cols),
        }
    }

    /// Declare a `rows × cols` column-major matrix of `T` with an explicit
    /// column stride.
    pub fn matrix_strided<T: Element>(
        name: &'static str,
        rows: usize,
        cols: usize,
        stride: usize,
    ) -> Self {
        Self {
            name,
            element: ElementLayout::of::<T>(),
            dims: DimensionSpec::Matrix { rows, cols, stride },
        }
    }
}

/// A planned buffer: its declaration plus its place in the region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BufferSlot {
    /// The declaration this slot was planned from.
    pub spec: BufferSpec,
    /// Byte offset from the start of the region.
    pub offset: usize,
    /// Bytes the buffer's elements occupy.
    pub raw_bytes: usize,
    /// `raw_bytes` rounded up to the element's alignment granule.
    pub padded_bytes: usize,
}

impl BufferSlot {
    /// Exclusive end of the bytes the buffer's elements occupy.
    pub fn end(&self) -> usize {
        self.offset + self.raw_bytes
    }
}

/// Ordered, named offset table for one packed acquisition.
#[derive(Clone, Debug)]
pub struct WorkspaceLayout {
    slots: IndexMap<&'static str, BufferSlot>,
    total_bytes: usize,
    alignment: usize,
}

impl WorkspaceLayout {
    /// Plan `specs` in order under `config`.
    ///
    /// Validates the config, rejects duplicate names and matrices whose
    /// stride is smaller than their row count, and fails with
    /// [`ScratchError::SizeOverflow`] if any size or offset does not fit in
    /// `usize`.
    pub fn plan(specs: &[BufferSpec], config: &ScratchConfig) -> Result<Self, ScratchError> {
        config.validate()?;

        let mut slots = IndexMap::with_capacity(specs.len());
        let mut cursor = 0usize;
        for spec in specs {
            spec.dims.check_stride()?;
            if slots.contains_key(spec.name) {
                return Err(ScratchError::DuplicateBuffer { name: spec.name });
            }

            let count = spec.dims.element_count().ok_or(ScratchError::SizeOverflow {
                what: "element count",
            })?;
            let raw_bytes = count
                .checked_mul(spec.element.size)
                .ok_or(ScratchError::SizeOverflow {
                    what: "element count * element size",
                })?;
            let granule = align_step(config.alignment, spec.element.size) * spec.element.size;
            let padded_bytes = round_up(raw_bytes, granule).ok_or(ScratchError::SizeOverflow {
                what: "alignment padding",
            })?;
            // A no-op under a validated config.
            let offset = round_up(cursor, spec.element.align).ok_or(ScratchError::SizeOverflow {
                what: "buffer offset",
            })?;
            cursor = offset
                .checked_add(padded_bytes)
                .ok_or(ScratchError::SizeOverflow {
                    what: "workspace total",
                })?;

            slots.insert(
                spec.name,
                BufferSlot {
                    spec: *spec,
                    offset,
                    raw_bytes,
                    padded_bytes,
                },
            );
        }

        trace!(
            buffers = slots.len(),
            total_bytes = cursor,
            alignment = config.alignment,
            "planned workspace layout"
        );

        Ok(Self {
            slots,
            total_bytes: cursor,
            alignment: config.alignment,
        })
    }

    /// Look up a slot by name.
    pub fn get(&self, name: &str) -> Option<&BufferSlot> {
        self.slots.get(name)
    }

    /// Look up a slot and its position in declaration order.
    pub fn get_full(&self, name: &str) -> Option<(usize, &BufferSlot)> {
        self.slots.get_full(name).map(|(i, _, slot)| (i, slot))
    }

    /// Position of `name` in declaration order.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.slots.get_index_of(name)
    }

    /// Slots in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &BufferSlot> {
        self.slots.values()
    }

    /// Number of planned buffers.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether the layout has no buffers.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Total bytes the packed region must provide.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Alignment the region's start must satisfy.
    pub fn alignment(&self) -> usize {
        self.alignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_up_basics() {
        assert_eq!(round_up(80, 64), Some(128));
        assert_eq!(round_up(64, 64), Some(64));
        assert_eq!(round_up(0, 64), Some(0));
        assert_eq!(round_up(7, 0), Some(7));
        assert_eq!(round_up(usize::MAX, 64), None);
    }

    #[test]
    fn align_step_floors_at_one() {
        assert_eq!(align_step(64, 8), 8);
        assert_eq!(align_step(64, 4), 16);
        assert_eq!(align_step(4, 8), 1);
        assert_eq!(align_step(64, 0), 64);
    }

    #[test]
    fn single_vector_is_padded_to_cacheline() {
        let config = ScratchConfig::default();
        let layout = WorkspaceLayout::plan(&[BufferSpec::vector::<f64>("x", 10)], &config).unwrap();
        let slot = layout.get("x").unwrap();
        assert_eq!(slot.offset, 0);
        assert_eq!(slot.raw_bytes, 80);
        assert_eq!(slot.padded_bytes, 128);
        assert_eq!(layout.total_bytes(), 128);
    }

    #[test]
    fn vector_then_matrix_offsets() {
        let config = ScratchConfig::default();
        let layout = WorkspaceLayout::plan(
            &[
                BufferSpec::vector::<f64>("v", 5),
                BufferSpec::matrix::<f64>("m", 3, 3),
            ],
            &config,
        )
        .unwrap();
        let v = layout.get("v").unwrap();
        let m = layout.get("m").unwrap();
        assert_eq!(v.offset, 0);
        assert_eq!(v.padded_bytes, 64);
        assert_eq!(m.offset, v.padded_bytes);
        assert_eq!(m.raw_bytes, 72);
        assert!(v.end() <= m.offset);
        assert_eq!(layout.total_bytes(), 64 + 128);
    }

    #[test]
    fn mixed_element_types_stay_aligned() {
        let config = ScratchConfig::default();
        let layout = WorkspaceLayout::plan(
            &[
                BufferSpec::vector::<u8>("mask", 3),
                BufferSpec::vector::<f32>("w", 17),
                BufferSpec::vector::<f64>("d", 1),
            ],
            &config,
        )
        .unwrap();
        for slot in layout.iter() {
            assert_eq!(slot.offset % config.alignment, 0);
            assert_eq!(slot.offset % slot.spec.element.align, 0);
        }
        assert_eq!(layout.get("w").unwrap().offset, 64);
        assert_eq!(layout.get("d").unwrap().offset, 192);
    }

    #[test]
    fn strided_matrix_reserves_stride_times_cols() {
        let config = ScratchConfig::default();
        let layout =
            WorkspaceLayout::plan(&[BufferSpec::matrix_strided::<f32>("a", 3, 4, 8)], &config)
                .unwrap();
        assert_eq!(layout.get("a").unwrap().raw_bytes, 8 * 4 * 4);
    }

    #[test]
    fn stride_below_rows_rejected() {
        let config = ScratchConfig::default();
        let err = WorkspaceLayout::plan(&[BufferSpec::matrix_strided::<f32>("a", 4, 2, 3)], &config)
            .unwrap_err();
        assert_eq!(err, ScratchError::InvalidStride { rows: 4, stride: 3 });
    }

    #[test]
    fn duplicate_names_rejected() {
        let config = ScratchConfig::default();
        let err = WorkspaceLayout::plan(
            &[
                BufferSpec::vector::<f64>("x", 1),
                BufferSpec::vector::<f64>("x", 2),
            ],
            &config,
        )
        .unwrap_err();
        assert_eq!(err, ScratchError::DuplicateBuffer { name: "x" });
    }

    #[test]
    fn overflowing_size_rejected() {
        let config = ScratchConfig::default();
        let err = WorkspaceLayout::plan(&[BufferSpec::vector::<f64>("x", usize::MAX / 4)], &config)
            .unwrap_err();
        assert!(matches!(err, ScratchError::SizeOverflow { .. }));

        let err = WorkspaceLayout::plan(
            &[BufferSpec::matrix::<f64>("m", usize::MAX / 2, 3)],
            &config,
        )
        .unwrap_err();
        assert!(matches!(err, ScratchError::SizeOverflow { .. }));
    }

    #[test]
    fn invalid_config_rejected_before_planning() {
        let config = ScratchConfig::new().with_alignment(24);
        let err = WorkspaceLayout::plan(&[BufferSpec::vector::<f64>("x", 1)], &config).unwrap_err();
        assert!(matches!(err, ScratchError::InvalidConfig { .. }));
    }

    #[test]
    fn empty_layout_has_zero_total() {
        let layout = WorkspaceLayout::plan(&[], &ScratchConfig::default()).unwrap();
        assert!(layout.is_empty());
        assert_eq!(layout.total_bytes(), 0);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_spec(index: usize) -> impl Strategy<Value = BufferSpec> {
            // Names must be 'static; a fixed table is enough for up to 8 slots.
            const NAMES: [&str; 8] = ["a", "b", "c", "d", "e", "f", "g", "h"];
            let name = NAMES[index];
            prop_oneof![
                (0usize..200).prop_map(move |n| BufferSpec::vector::<f64>(name, n)),
                (0usize..200).prop_map(move |n| BufferSpec::vector::<f32>(name, n)),
                (0usize..200).prop_map(move |n| BufferSpec::vector::<u8>(name, n)),
                (0usize..20, 0usize..20)
                    .prop_map(move |(r, c)| BufferSpec::matrix::<f64>(name, r, c)),
            ]
        }

        fn arb_specs() -> impl Strategy<Value = Vec<BufferSpec>> {
            (1usize..=8).prop_flat_map(|n| {
                (0..n).map(arb_spec).collect::<Vec<_>>()
            })
        }

        proptest! {
            #[test]
            fn round_up_is_idempotent(x in 0usize..1_000_000, a in 1usize..4096) {
                let once = round_up(x, a).unwrap();
                prop_assert_eq!(round_up(once, a).unwrap(), once);
            }

            #[test]
            fn round_up_is_upper_multiple(x in 0usize..1_000_000, a in 1usize..4096) {
                let r = round_up(x, a).unwrap();
                prop_assert!(r >= x);
                prop_assert_eq!(r % a, 0);
                prop_assert!(r - x < a);
            }

            #[test]
            fn total_is_sum_of_padded_and_slots_disjoint(specs in arb_specs()) {
                let config = ScratchConfig::default();
                let layout = WorkspaceLayout::plan(&specs, &config).unwrap();
                let padded_sum: usize = layout.iter().map(|s| s.padded_bytes).sum();
                prop_assert_eq!(layout.total_bytes(), padded_sum);

                let slots: Vec<_> = layout.iter().collect();
                for pair in slots.windows(2) {
                    prop_assert!(pair[0].offset <= pair[1].offset);
                    prop_assert!(pair[0].end() <= pair[1].offset);
                }
                for (i, a) in slots.iter().enumerate() {
                    for b in &slots[i + 1..] {
                        let disjoint = a.end() <= b.offset || b.end() <= a.offset;
                        prop_assert!(disjoint || a.raw_bytes == 0 || b.raw_bytes == 0);
                    }
                }
            }
        }
    }
}
