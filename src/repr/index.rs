//! Storage widths for per-node integer fields and thresholds.
//!
//! Each capacity axis of a [`Forest`](super::Forest) is a type parameter
//! bounded by one of these traits. The planner reads the `MAX_VALUE`
//! constants to decide which width a model needs.

use std::fmt::Debug;
use std::hash::Hash;

mod sealed {
    pub trait Sealed {}

    impl Sealed for u16 {}
    impl Sealed for u32 {}
    impl Sealed for f32 {}
    impl Sealed for f64 {}
}

/// Unsigned integer width used for feature indices and node offsets.
pub trait IndexWidth:
    sealed::Sealed + Copy + Default + Eq + Ord + Hash + Debug + Send + Sync + 'static
{
    /// Largest value this width can store.
    const MAX_VALUE: usize;

    /// Widen to `usize`.
    fn to_usize(self) -> usize;

    /// Narrow from `usize`, or `None` if the value does not fit.
    fn from_usize(value: usize) -> Option<Self>;
}

impl IndexWidth for u16 {
    const MAX_VALUE: usize = u16::MAX as usize;

    #[inline]
    fn to_usize(self) -> usize {
        self as usize
    }

    #[inline]
    fn from_usize(value: usize) -> Option<Self> {
        u16::try_from(value).ok()
    }
}

impl IndexWidth for u32 {
    const MAX_VALUE: usize = u32::MAX as usize;

    #[inline]
    fn to_usize(self) -> usize {
        self as usize
    }

    #[inline]
    fn from_usize(value: usize) -> Option<Self> {
        u32::try_from(value).ok()
    }
}

/// Floating point precision of split thresholds.
pub trait Threshold:
    sealed::Sealed + Copy + Default + PartialOrd + Debug + Send + Sync + 'static
{
    /// True for double precision.
    const DOUBLE: bool;

    /// Convert from `f64`, rounding to this precision.
    fn from_f64(value: f64) -> Self;

    /// Widen to `f64`.
    fn to_f64(self) -> f64;

    /// Returns true if the value is NaN.
    fn is_nan(self) -> bool;
}

impl Threshold for f32 {
    const DOUBLE: bool = false;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value as f32
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }
}

impl Threshold for f64 {
    const DOUBLE: bool = true;

    #[inline]
    fn from_f64(value: f64) -> Self {
        value
    }

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }
}
