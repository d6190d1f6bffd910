use std::fmt;

use bytemuck::Pod;

/// Supported element kinds for matrix storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// 8-bit unsigned integer.
    U8,
    /// 32-bit signed integer.
    I32,
    /// 32-bit unsigned integer.
    U32,
    /// 32-bit floating point.
    F32,
}

impl ElementKind {
    /// All supported kinds, in declaration order.
    pub const ALL: [ElementKind; 4] = [
        ElementKind::U8,
        ElementKind::I32,
        ElementKind::U32,
        ElementKind::F32,
    ];

    /// Returns the size in bytes of a single element.
    ///
    /// - U8: 1 byte
    /// - I32, U32, F32: 4 bytes
    pub fn size_in_bytes(&self) -> usize {
        match self {
            ElementKind::U8 => 1,
            ElementKind::I32 | ElementKind::U32 | ElementKind::F32 => 4,
        }
    }

    /// Returns true for the integer kinds, whose arithmetic wraps.
    pub fn is_integer(&self) -> bool {
        !matches!(self, ElementKind::F32)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::U8 => write!(f, "u8"),
            ElementKind::I32 => write!(f, "i32"),
            ElementKind::U32 => write!(f, "u32"),
            ElementKind::F32 => write!(f, "f32"),
        }
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for u8 {}
    impl Sealed for i32 {}
    impl Sealed for u32 {}
    impl Sealed for f32 {}
}

/// A numeric element a [`Matrix`](crate::Matrix) can hold.
///
/// Sealed to `u8`, `i32`, `u32` and `f32`. Products are accumulated in the
/// element's own type: integer kinds wrap on overflow, `f32` accumulates in
/// single precision.
pub trait Element:
    sealed::Sealed + Pod + Default + PartialEq + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    /// The runtime tag for this type.
    const KIND: ElementKind;

    fn zero() -> Self;

    fn one() -> Self;

    /// Returns `acc + a * b` using the native arithmetic of the type.
    fn mul_add(acc: Self, a: Self, b: Self) -> Self;

    /// Casts a sample from `[0, 1)` into this type (integers truncate).
    fn from_unit(v: f64) -> Self;

    /// Widens to `f64` for comparisons.
    fn to_f64(self) -> f64;
}

macro_rules! impl_integer_element {
    ($t:ty, $kind:expr) => {
        impl Element for $t {
            const KIND: ElementKind = $kind;

            fn zero() -> Self {
                0
            }

            fn one() -> Self {
                1
            }

            #[inline]
            fn mul_add(acc: Self, a: Self, b: Self) -> Self {
                acc.wrapping_add(a.wrapping_mul(b))
            }

            fn from_unit(v: f64) -> Self {
                v as $t
            }

            fn to_f64(self) -> f64 {
                self as f64
            }
        }
    };
}

impl_integer_element!(u8, ElementKind::U8);
impl_integer_element!(i32, ElementKind::I32);
impl_integer_element!(u32, ElementKind::U32);

impl Element for f32 {
    const KIND: ElementKind = ElementKind::F32;

    fn zero() -> Self {
        0.0
    }

    fn one() -> Self {
        1.0
    }

    #[inline]
    fn mul_add(acc: Self, a: Self, b: Self) -> Self {
        // Plain multiply then add, not a fused FMA, so every strategy rounds
        // the same way.
        acc + a * b
    }

    fn from_unit(v: f64) -> Self {
        v as f32
    }

    fn to_f64(self) -> f64 {
        self as f64
    }
}

/// Returns the byte width of `T`.
pub fn type_size<T: Element>() -> usize {
    T::KIND.size_in_bytes()
}
