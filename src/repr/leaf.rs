//! Leaf value types for the separate output array.

use std::fmt::Debug;

/// Trait for values stored in a forest's separate leaf output array.
pub trait LeafValue: Clone + Default + Debug + PartialEq + Send + Sync + 'static {
    /// The single value of this leaf, if it is scalar.
    ///
    /// Scalar leaves can be stored inline in the node value array when the
    /// forest has no separate output array.
    fn as_scalar(&self) -> Option<f64>;
}

/// Scalar leaf value (single f32).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScalarLeaf(pub f32);

impl LeafValue for ScalarLeaf {
    #[inline]
    fn as_scalar(&self) -> Option<f64> {
        Some(self.0 as f64)
    }
}

impl From<f32> for ScalarLeaf {
    fn from(value: f32) -> Self {
        Self(value)
    }
}

impl From<ScalarLeaf> for f32 {
    fn from(leaf: ScalarLeaf) -> Self {
        leaf.0
    }
}

/// Vector leaf value, one entry per output group (multi-class models).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorLeaf(pub Box<[f32]>);

impl VectorLeaf {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values.into_boxed_slice())
    }

    #[inline]
    pub fn values(&self) -> &[f32] {
        &self.0
    }
}

impl LeafValue for VectorLeaf {
    #[inline]
    fn as_scalar(&self) -> Option<f64> {
        None
    }
}
