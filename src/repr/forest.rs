//! Flattened multi-tree forest storage.
//!
//! All trees of an ensemble live in one set of parallel arrays. Tree `t`
//! owns the flat index range `tree_offsets[t]..tree_offsets[t + 1]`, and the
//! last entry of `tree_offsets` is the total node count.

use std::marker::PhantomData;
use std::ops::Range;

use crate::layout::{TreeLayout, TreeView};
use crate::planner::{Specialization, MAX_FEW_FEATURES, MAX_SMALL_TREES};
use crate::sample::SampleAccessor;

use super::categories::{float_to_category, CategoriesStorage, CategoryEncoding};
use super::index::{IndexWidth, Threshold};
use super::leaf::{LeafValue, ScalarLeaf};
use super::node::NodeValue;

/// Structural validation errors for [`Forest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForestValidationError {
    #[error("{array} has {len} entries but the forest has {n_nodes} nodes")]
    ArrayLenMismatch {
        array: &'static str,
        len: usize,
        n_nodes: usize,
    },
    #[error("tree offsets must start at 0")]
    TreeOffsetsStart,
    #[error("tree offsets must be strictly ascending (tree {tree} is empty or reversed)")]
    TreeOffsetsNotAscending { tree: usize },
    #[error("last tree offset is {last} but the forest has {n_nodes} nodes")]
    TreeOffsetsEnd { last: usize, n_nodes: usize },
    #[error("num_class must be at least 1")]
    InvalidNumClass,
    #[error("node {node} has offset {offset} but its value is {found}")]
    LeafMismatch {
        node: usize,
        offset: usize,
        found: &'static str,
    },
    #[error("node {node} categorical flag disagrees with its value")]
    CategoricalFlagMismatch { node: usize },
    #[error("node {node} references a category set that does not exist")]
    UnresolvedCategorySet { node: usize },
    #[error("child {child} of node {node} is outside tree {tree}")]
    ChildOutOfTree { tree: usize, node: usize, child: usize },
    #[error("node {node} of tree {tree} is reachable from {parents} parents")]
    InvalidParentCount {
        tree: usize,
        node: usize,
        parents: usize,
    },
}

/// Leaf output of a node, as stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LeafOutput<'a, L> {
    /// Scalar output stored in the node value array.
    Inline(f64),
    /// Output stored in the separate output array.
    Separate(&'a L),
}

/// Owned, pre-filled arrays a [`Forest`] is built from.
///
/// All per-node vectors must have the same length. `categorical` and
/// `outputs` are optional arrays; `categories` is empty unless `C` is
/// external.
#[derive(Debug, Clone)]
pub struct ForestParts<T, F, O, C: CategoryEncoding, L = ScalarLeaf> {
    pub layout: TreeLayout,
    pub values: Vec<NodeValue<T, C::Handle>>,
    pub features: Vec<F>,
    pub offsets: Vec<O>,
    pub default_distant: Vec<bool>,
    pub categorical: Option<Vec<bool>>,
    pub outputs: Option<Vec<L>>,
    pub categories: CategoriesStorage,
    pub tree_offsets: Vec<usize>,
    pub num_class: usize,
}

/// Structure-of-Arrays forest for one encoding specialization.
///
/// # Type Parameters
///
/// - `T`: threshold precision (`f32` or `f64`)
/// - `F`: feature index width (`u16` or `u32`)
/// - `O`: node offset width (`u16` or `u32`)
/// - `C`: category set encoding ([`InlineCategories`] or [`ExternalCategories`])
/// - `L`: separate leaf output type
///
/// The forest is immutable once built and can be shared across threads.
///
/// [`InlineCategories`]: super::InlineCategories
/// [`ExternalCategories`]: super::ExternalCategories
#[derive(Debug, Clone)]
pub struct Forest<T, F, O, C: CategoryEncoding, L = ScalarLeaf> {
    layout: TreeLayout,
    values: Box<[NodeValue<T, C::Handle>]>,
    features: Box<[F]>,
    offsets: Box<[O]>,
    default_distant: Box<[bool]>,
    categorical: Option<Box<[bool]>>,
    outputs: Option<Box<[L]>>,
    categories: CategoriesStorage,
    tree_offsets: Box<[usize]>,
    num_class: usize,
    _encoding: PhantomData<C>,
}

impl<T, F, O, C, L> Forest<T, F, O, C, L>
where
    T: Threshold,
    F: IndexWidth,
    O: IndexWidth,
    C: CategoryEncoding,
    L: LeafValue,
{
    /// Take ownership of pre-filled arrays.
    ///
    /// Only array shapes, `tree_offsets` and `num_class` are checked here.
    /// Node content is trusted; use [`validate`](Self::validate) to check it.
    pub fn new(parts: ForestParts<T, F, O, C, L>) -> Result<Self, ForestValidationError> {
        let n_nodes = parts.values.len();
        let check_len = |array: &'static str, len: usize| {
            if len == n_nodes {
                Ok(())
            } else {
                Err(ForestValidationError::ArrayLenMismatch { array, len, n_nodes })
            }
        };
        check_len("features", parts.features.len())?;
        check_len("offsets", parts.offsets.len())?;
        check_len("default_distant", parts.default_distant.len())?;
        if let Some(categorical) = &parts.categorical {
            check_len("categorical", categorical.len())?;
        }
        if let Some(outputs) = &parts.outputs {
            check_len("outputs", outputs.len())?;
        }

        if parts.tree_offsets.first() != Some(&0) {
            return Err(ForestValidationError::TreeOffsetsStart);
        }
        if let Some(tree) = parts.tree_offsets.windows(2).position(|w| w[0] >= w[1]) {
            return Err(ForestValidationError::TreeOffsetsNotAscending { tree });
        }
        let last = parts.tree_offsets[parts.tree_offsets.len() - 1];
        if last != n_nodes {
            return Err(ForestValidationError::TreeOffsetsEnd { last, n_nodes });
        }
        if parts.num_class == 0 {
            return Err(ForestValidationError::InvalidNumClass);
        }

        Ok(Self {
            layout: parts.layout,
            values: parts.values.into_boxed_slice(),
            features: parts.features.into_boxed_slice(),
            offsets: parts.offsets.into_boxed_slice(),
            default_distant: parts.default_distant.into_boxed_slice(),
            categorical: parts.categorical.map(Vec::into_boxed_slice),
            outputs: parts.outputs.map(Vec::into_boxed_slice),
            categories: parts.categories,
            tree_offsets: parts.tree_offsets.into_boxed_slice(),
            num_class: parts.num_class,
            _encoding: PhantomData,
        })
    }

    // =========================================================================
    // Forest-level queries
    // =========================================================================

    #[inline]
    pub fn layout(&self) -> TreeLayout {
        self.layout
    }

    /// Number of trees.
    #[inline]
    pub fn num_trees(&self) -> usize {
        self.tree_offsets.len() - 1
    }

    /// Total number of nodes across all trees.
    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn num_class(&self) -> usize {
        self.num_class
    }

    /// Root index of every tree, followed by the total node count.
    #[inline]
    pub fn tree_offsets(&self) -> &[usize] {
        &self.tree_offsets
    }

    /// Flat index range of tree `tree`.
    #[inline]
    pub fn tree_range(&self, tree: usize) -> Range<usize> {
        self.tree_offsets[tree]..self.tree_offsets[tree + 1]
    }

    /// Number of nodes in tree `tree`.
    #[inline]
    pub fn tree_size(&self, tree: usize) -> usize {
        let range = self.tree_range(tree);
        range.end - range.start
    }

    /// Navigation view of one tree. Indices on the view are tree-local.
    #[inline]
    pub fn tree_view(&self, tree: usize) -> TreeView<'_, O> {
        TreeView::new(&self.offsets[self.tree_range(tree)], self.layout)
    }

    #[inline]
    pub fn categories(&self) -> &CategoriesStorage {
        &self.categories
    }

    /// Selector matching this forest's precision, widths and category encoding.
    pub fn specialization(&self) -> Specialization {
        Specialization::new(
            T::DOUBLE,
            F::MAX_VALUE > MAX_FEW_FEATURES,
            O::MAX_VALUE > MAX_SMALL_TREES,
            C::EXTERNAL,
        )
    }

    /// Whether leaf outputs live in a separate array.
    #[inline]
    pub fn has_separate_outputs(&self) -> bool {
        self.outputs.is_some()
    }

    // =========================================================================
    // Per-node accessors (flat indices)
    // =========================================================================

    #[inline]
    pub fn value(&self, index: usize) -> NodeValue<T, C::Handle> {
        self.values[index]
    }

    /// Feature tested by a split node.
    #[inline]
    pub fn feature(&self, index: usize) -> usize {
        self.features[index].to_usize()
    }

    /// Stored offset of a node (zero for leaves).
    #[inline]
    pub fn offset(&self, index: usize) -> usize {
        self.offsets[index].to_usize()
    }

    /// Whether a missing feature routes to the distant child.
    #[inline]
    pub fn default_distant(&self, index: usize) -> bool {
        self.default_distant[index]
    }

    #[inline]
    pub fn is_categorical(&self, index: usize) -> bool {
        self.categorical.as_ref().is_some_and(|flags| flags[index])
    }

    #[inline]
    pub fn is_leaf(&self, index: usize) -> bool {
        self.offset(index) == 0
    }

    /// Output of a leaf node, or `None` for split nodes.
    pub fn leaf_output(&self, index: usize) -> Option<LeafOutput<'_, L>> {
        if !self.is_leaf(index) {
            return None;
        }
        match &self.outputs {
            Some(outputs) => Some(LeafOutput::Separate(&outputs[index])),
            None => self.values[index]
                .output()
                .map(|v| LeafOutput::Inline(v.to_f64())),
        }
    }

    /// Membership test against the category set of a categorical node.
    #[inline]
    pub fn category_contains(&self, index: usize, category: u32) -> bool {
        match self.values[index] {
            NodeValue::Categories(handle) => C::contains(handle, &self.categories, category),
            _ => false,
        }
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// Resolve the branch of a split node for a feature value.
    ///
    /// Returns true for the distant child. NaN follows `default_distant`.
    #[inline]
    pub fn branch_taken(&self, index: usize, feature_value: f64) -> bool {
        if feature_value.is_nan() {
            return self.default_distant[index];
        }
        match self.values[index] {
            NodeValue::Threshold(threshold) => T::from_f64(feature_value) >= threshold,
            NodeValue::Categories(handle) => float_to_category(feature_value)
                .is_some_and(|category| C::contains(handle, &self.categories, category)),
            NodeValue::Output(_) => {
                debug_assert!(false, "branch_taken called on leaf node {index}");
                false
            }
        }
    }

    /// Descend tree `tree` for one sample and return the flat leaf index.
    #[inline]
    pub fn traverse_to_leaf<S: SampleAccessor + ?Sized>(&self, tree: usize, sample: &S) -> usize {
        let base = self.tree_offsets[tree];
        let local = self.tree_view(tree).descend(|i| {
            let node = base + i;
            self.branch_taken(node, sample.feature(self.feature(node)))
        });
        base + local
    }

    // =========================================================================
    // Validation
    // =========================================================================

    /// Check node content against the forest invariants.
    ///
    /// Verifies the leaf sentinel, categorical flags, category set handles,
    /// that every child lies after its parent inside the same tree, and that
    /// every non-root node has exactly one parent.
    pub fn validate(&self) -> Result<(), ForestValidationError> {
        let mut parents = Vec::new();
        for tree in 0..self.num_trees() {
            let range = self.tree_range(tree);
            let view = self.tree_view(tree);
            parents.clear();
            parents.resize(view.len(), 0usize);

            for local in 0..view.len() {
                let node = range.start + local;
                let offset = view.offset(local);
                let value = self.values[node];

                if (offset == 0) != value.is_output() {
                    let found = match value {
                        NodeValue::Threshold(_) => "a threshold",
                        NodeValue::Categories(_) => "a category set",
                        NodeValue::Output(_) => "a leaf output",
                    };
                    return Err(ForestValidationError::LeafMismatch { node, offset, found });
                }
                if self.is_categorical(node) != value.is_categorical() {
                    return Err(ForestValidationError::CategoricalFlagMismatch { node });
                }
                if let NodeValue::Categories(handle) = value {
                    if !C::resolves(handle, &self.categories) {
                        return Err(ForestValidationError::UnresolvedCategorySet { node });
                    }
                }

                if offset != 0 {
                    for branch in [false, true] {
                        let child = self.layout.next_index(local, offset, branch);
                        if child <= local || child >= view.len() {
                            return Err(ForestValidationError::ChildOutOfTree {
                                tree,
                                node,
                                child: range.start + child,
                            });
                        }
                        parents[child] += 1;
                    }
                }
            }

            for (local, &count) in parents.iter().enumerate() {
                let expected = usize::from(local != 0);
                if count != expected {
                    return Err(ForestValidationError::InvalidParentCount {
                        tree,
                        node: range.start + local,
                        parents: count,
                    });
                }
            }
        }
        Ok(())
    }
}
