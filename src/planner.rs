//! Capacity planning: choose the narrowest encoding that fits a model.
//!
//! A forest is specialized along four independent axes, each narrow or wide:
//!
//! | bit | axis       | narrow                 | wide                      |
//! |-----|------------|------------------------|---------------------------|
//! | 0   | categories | 32-bit inline bitset   | external sets, u32 index  |
//! | 1   | offsets    | u16                    | u32                       |
//! | 2   | features   | u16                    | u32                       |
//! | 3   | precision  | f32 thresholds         | f64 thresholds            |
//!
//! [`plan_specialization`] measures nothing itself; it maps statistics of a
//! source model to a [`Specialization`] or rejects the model outright.

use bon::Builder;

use crate::layout::TreeLayout;
use crate::repr::{CategoryEncoding, ExternalCategories, IndexWidth, InlineCategories};

/// Largest feature count of the narrow feature index width.
pub const MAX_FEW_FEATURES: usize = <u16 as IndexWidth>::MAX_VALUE;
/// Largest feature count of the wide feature index width.
pub const MAX_MANY_FEATURES: usize = <u32 as IndexWidth>::MAX_VALUE;
/// Largest offset of the narrow offset width.
pub const MAX_SMALL_TREES: usize = <u16 as IndexWidth>::MAX_VALUE;
/// Largest offset of the wide offset width.
pub const MAX_LARGE_TREES: usize = <u32 as IndexWidth>::MAX_VALUE;
/// Largest category cardinality of inline category sets.
pub const MAX_FEW_CATEGORIES: usize = InlineCategories::MAX_CATEGORIES;
/// Largest category cardinality of external category sets.
pub const MAX_MANY_CATEGORIES: usize = ExternalCategories::MAX_CATEGORIES;

/// The model cannot be represented by any specialization.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UnusableModelError {
    #[error("model contains too many features ({num_features} > {max})")]
    TooManyFeatures { num_features: usize, max: usize },
    #[error("model contains too large of trees (node offset {max_node_offset} > {max})")]
    TreesTooLarge { max_node_offset: usize, max: usize },
    #[error("model contains feature with too many categories ({num_categories} > {max})")]
    TooManyCategories { num_categories: usize, max: usize },
}

// =============================================================================
// Specialization
// =============================================================================

/// 4-bit selector identifying one encoding specialization.
///
/// Index 0 is the all-narrow, single precision encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct Specialization(u8);

impl Specialization {
    pub const CATEGORY_BIT: u8 = 0;
    pub const OFFSET_BIT: u8 = 1;
    pub const FEATURE_BIT: u8 = 2;
    pub const PRECISION_BIT: u8 = 3;

    /// Number of specializations.
    pub const COUNT: usize = 16;

    /// Compose a selector from the four axis choices.
    pub const fn new(
        double_precision: bool,
        wide_features: bool,
        wide_offsets: bool,
        external_categories: bool,
    ) -> Self {
        Self(
            ((double_precision as u8) << Self::PRECISION_BIT)
                | ((wide_features as u8) << Self::FEATURE_BIT)
                | ((wide_offsets as u8) << Self::OFFSET_BIT)
                | ((external_categories as u8) << Self::CATEGORY_BIT),
        )
    }

    /// Selector from its raw index, or `None` if `index >= 16`.
    pub const fn from_index(index: u8) -> Option<Self> {
        if (index as usize) < Self::COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// All specializations in index order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT as u8).map(Specialization)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    const fn bit(self, bit: u8) -> bool {
        (self.0 >> bit) & 1 != 0
    }

    /// f64 thresholds.
    #[inline]
    pub const fn double_precision(self) -> bool {
        self.bit(Self::PRECISION_BIT)
    }

    /// u32 feature indices.
    #[inline]
    pub const fn wide_features(self) -> bool {
        self.bit(Self::FEATURE_BIT)
    }

    /// u32 node offsets.
    #[inline]
    pub const fn wide_offsets(self) -> bool {
        self.bit(Self::OFFSET_BIT)
    }

    /// Category sets in external storage.
    #[inline]
    pub const fn external_categories(self) -> bool {
        self.bit(Self::CATEGORY_BIT)
    }

    /// Whether this selector is at least as wide as `other` on every axis.
    #[inline]
    pub const fn covers(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl From<Specialization> for u8 {
    fn from(spec: Specialization) -> Self {
        spec.0
    }
}

impl TryFrom<u8> for Specialization {
    type Error = String;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Self::from_index(index).ok_or_else(|| format!("specialization index {index} out of range"))
    }
}

impl std::fmt::Display for Specialization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/features:{}/offsets:{}/categories:{}",
            if self.double_precision() { "f64" } else { "f32" },
            if self.wide_features() { "u32" } else { "u16" },
            if self.wide_offsets() { "u32" } else { "u16" },
            if self.external_categories() { "external" } else { "inline" },
        )
    }
}

// =============================================================================
// ForestStats
// =============================================================================

/// Measured size statistics of a source model.
///
/// # Example
///
/// ```
/// use boosters_compact::planner::{plan_specialization, ForestStats};
///
/// let stats = ForestStats::builder()
///     .max_nodes_per_tree(31)
///     .max_depth(4)
///     .num_features(10)
///     .build();
/// assert_eq!(plan_specialization(&stats).unwrap().index(), 0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Builder)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForestStats {
    /// Node count of the largest tree.
    pub max_nodes_per_tree: usize,
    /// Depth (in edges) of the deepest tree.
    pub max_depth: usize,
    pub num_features: usize,
    /// Largest category cardinality of any categorical feature.
    #[builder(default)]
    pub max_num_categories: usize,
    #[builder(default)]
    pub use_double_thresholds: bool,
    /// Layout the forest will be stored in. Default: depth-first.
    #[builder(default)]
    #[cfg_attr(feature = "serde", serde(default))]
    pub layout: TreeLayout,
}

impl ForestStats {
    /// Worst-case value any stored offset must hold.
    ///
    /// A depth-first offset spans at most the near subtree plus one, so it is
    /// bounded by both the node count and `2^max_depth`. Breadth-first
    /// offsets are tree-local positions, bounded by the node count only.
    pub fn max_node_offset(&self) -> usize {
        match self.layout {
            TreeLayout::DepthFirst => {
                let depth_bound = u32::try_from(self.max_depth)
                    .ok()
                    .and_then(|depth| 1usize.checked_shl(depth))
                    .unwrap_or(usize::MAX);
                self.max_nodes_per_tree.min(depth_bound)
            }
            TreeLayout::BreadthFirst => self.max_nodes_per_tree,
        }
    }
}

// =============================================================================
// Planning
// =============================================================================

/// Select the narrowest specialization able to represent a model.
///
/// # Errors
///
/// Returns [`UnusableModelError`] if a statistic exceeds the widest width of
/// its axis. There is no fallback: the model cannot be loaded.
pub fn plan_specialization(stats: &ForestStats) -> Result<Specialization, UnusableModelError> {
    let result = plan(stats);
    match &result {
        Ok(spec) => tracing::debug!(
            max_nodes_per_tree = stats.max_nodes_per_tree,
            max_depth = stats.max_depth,
            num_features = stats.num_features,
            max_num_categories = stats.max_num_categories,
            layout = ?stats.layout,
            selector = spec.index(),
            %spec,
            "planned forest specialization"
        ),
        Err(err) => tracing::warn!(%err, ?stats, "model rejected by capacity planner"),
    }
    result
}

fn plan(stats: &ForestStats) -> Result<Specialization, UnusableModelError> {
    if stats.num_features > MAX_MANY_FEATURES {
        return Err(UnusableModelError::TooManyFeatures {
            num_features: stats.num_features,
            max: MAX_MANY_FEATURES,
        });
    }

    let max_node_offset = stats.max_node_offset();
    if max_node_offset > MAX_LARGE_TREES {
        return Err(UnusableModelError::TreesTooLarge {
            max_node_offset,
            max: MAX_LARGE_TREES,
        });
    }

    if stats.max_num_categories > MAX_MANY_CATEGORIES {
        return Err(UnusableModelError::TooManyCategories {
            num_categories: stats.max_num_categories,
            max: MAX_MANY_CATEGORIES,
        });
    }

    Ok(Specialization::new(
        stats.use_double_thresholds,
        stats.num_features > MAX_FEW_FEATURES,
        max_node_offset > MAX_SMALL_TREES,
        stats.max_num_categories > MAX_FEW_CATEGORIES,
    ))
}
