//! Per-node value payload.

/// Value slot of a node.
///
/// What a node holds depends on its role: split nodes hold the threshold or
/// the category set they test, leaves hold their output. When a forest keeps
/// a separate output array, leaves still carry an `Output` tag here (with a
/// zero value) and the real output lives in that array.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeValue<T, H> {
    /// Numeric split: near child if `value < threshold`.
    Threshold(T),
    /// Categorical split: distant child if the category is in the set.
    Categories(H),
    /// Leaf output.
    Output(T),
}

impl<T: Copy, H: Copy> NodeValue<T, H> {
    #[inline]
    pub fn is_output(&self) -> bool {
        matches!(self, Self::Output(_))
    }

    #[inline]
    pub fn is_categorical(&self) -> bool {
        matches!(self, Self::Categories(_))
    }

    /// Split threshold, if this is a numeric split.
    #[inline]
    pub fn threshold(&self) -> Option<T> {
        match *self {
            Self::Threshold(t) => Some(t),
            _ => None,
        }
    }

    /// Category set handle, if this is a categorical split.
    #[inline]
    pub fn categories(&self) -> Option<H> {
        match *self {
            Self::Categories(h) => Some(h),
            _ => None,
        }
    }

    /// Inline leaf output, if this is a leaf.
    #[inline]
    pub fn output(&self) -> Option<T> {
        match *self {
            Self::Output(v) => Some(v),
            _ => None,
        }
    }
}
