//! Element types that may live in scratch buffers.

#![allow(unsafe_code)]

use std::any::TypeId;
use std::mem;

mod sealed {
    pub trait Sealed {}
}

/// A plain numeric type that can be stored in scratch memory.
///
/// # Safety
///
/// Implementors must be `Copy`, have no drop glue or padding, and accept
/// every bit pattern (including all-zero) as a valid value. Scratch regions
/// are zero-filled on acquisition and then reinterpreted as `[Self]`, and
/// one region may be viewed as different element types over its life. The
/// trait is sealed; the implementations below are the complete set.
pub unsafe trait Element: Copy + 'static + sealed::Sealed {
    /// Type name used in error messages.
    const NAME: &'static str;
}

macro_rules! impl_element {
    ($($t:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $t {}
            // SAFETY: primitive numeric; every bit pattern is a valid value.
            unsafe impl Element for $t {
                const NAME: &'static str = stringify!($t);
            }
        )*
    };
}

impl_element!(f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

/// Runtime description of an element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ElementLayout {
    /// `size_of::<T>()`.
    pub size: usize,
    /// `align_of::<T>()`.
    pub align: usize,
    /// Identity of `T`, checked when a typed view is requested.
    pub type_id: TypeId,
    /// `T::NAME`.
    pub name: &'static str,
}

impl ElementLayout {
    /// Describe `T`.
    pub fn of<T: Element>() -> Self {
        Self {
            size: mem::size_of::<T>(),
            align: mem::align_of::<T>(),
            type_id: TypeId::of::<T>(),
            name: T::NAME,
        }
    }

    /// Whether this layout describes `T`.
    pub fn is<T: Element>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}
