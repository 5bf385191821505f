//! Feature access for a single sample during traversal.

/// Read-only access to the feature values of one sample.
///
/// Missing features are reported as NaN, including indices past the end of
/// the sample.
pub trait SampleAccessor {
    /// Value of feature `index`, or NaN if it is missing.
    fn feature(&self, index: usize) -> f64;
}

impl SampleAccessor for [f32] {
    #[inline]
    fn feature(&self, index: usize) -> f64 {
        self.get(index).map_or(f64::NAN, |&v| v as f64)
    }
}

impl SampleAccessor for [f64] {
    #[inline]
    fn feature(&self, index: usize) -> f64 {
        self.get(index).copied().unwrap_or(f64::NAN)
    }
}

impl SampleAccessor for Vec<f32> {
    #[inline]
    fn feature(&self, index: usize) -> f64 {
        self.as_slice().feature(index)
    }
}

impl SampleAccessor for Vec<f64> {
    #[inline]
    fn feature(&self, index: usize) -> f64 {
        self.as_slice().feature(index)
    }
}

impl<const N: usize> SampleAccessor for [f32; N] {
    #[inline]
    fn feature(&self, index: usize) -> f64 {
        self.as_slice().feature(index)
    }
}

impl<const N: usize> SampleAccessor for [f64; N] {
    #[inline]
    fn feature(&self, index: usize) -> f64 {
        self.as_slice().feature(index)
    }
}
