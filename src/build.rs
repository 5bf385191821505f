//! Building compact forests from abstract source trees.
//!
//! Source trees use explicit left/right child indices in any node order.
//! [`ForestBuilder`] checks their structure, lays them out in the configured
//! [`TreeLayout`], measures [`ForestStats`], asks the planner for a
//! [`Specialization`] and fills the matching [`ForestModel`] variant.
//!
//! Split semantics of source nodes:
//! - numeric: go left if `value < threshold`
//! - categorical: go right if the category is in the set
//! - missing value: follow `default_left`
//!
//! Left maps to the near child and right to the distant child.
//!
//! # Example
//!
//! ```
//! use boosters_compact::build::{ForestBuilder, SourceTree};
//! use boosters_compact::{ForestConfig, ScalarLeaf};
//!
//! let mut tree = SourceTree::new();
//! tree.add_split(0, 0.5, true, 1, 2);
//! tree.add_leaf(ScalarLeaf(1.0));
//! tree.add_leaf(ScalarLeaf(2.0));
//!
//! let model = ForestBuilder::new(ForestConfig::default())
//!     .with_tree(tree)
//!     .build()
//!     .unwrap();
//! assert_eq!(model.specialization().index(), 0);
//! assert_eq!(model.traverse_to_leaf(0, &[0.7f32][..]), 2);
//! ```

use std::collections::VecDeque;

use crate::config::ForestConfig;
use crate::layout::TreeLayout;
use crate::planner::{plan_specialization, ForestStats, Specialization, UnusableModelError};
use crate::repr::{
    CategoriesStorageBuilder, CategoryEncoding, Forest, ForestFactory, ForestModel, ForestParts,
    ForestValidationError, IndexWidth, LeafValue, NodeValue, ScalarLeaf, Threshold,
};

// =============================================================================
// Errors
// =============================================================================

/// Structural errors in a source tree.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceTreeError {
    #[error("tree {tree} has no nodes")]
    EmptyTree { tree: usize },
    #[error("node {node} of tree {tree} references child {child} but the tree has {n_nodes} nodes")]
    ChildOutOfBounds {
        tree: usize,
        node: usize,
        child: usize,
        n_nodes: usize,
    },
    #[error("node {node} of tree {tree} is reached more than once (cycle or shared subtree)")]
    DuplicateVisit { tree: usize, node: usize },
    #[error("node {node} of tree {tree} is unreachable from the root")]
    UnreachableNode { tree: usize, node: usize },
    #[error("node {node} of tree {tree} tests feature {feature} but only {num_features} features are declared")]
    FeatureOutOfRange {
        tree: usize,
        node: usize,
        feature: usize,
        num_features: usize,
    },
}

/// Errors from [`ForestBuilder::build`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Source(#[from] SourceTreeError),
    #[error(transparent)]
    Unusable(#[from] UnusableModelError),
    #[error(transparent)]
    Invalid(#[from] ForestValidationError),
    #[error("specialization {requested} is narrower than the planned {planned}")]
    TooNarrow {
        requested: Specialization,
        planned: Specialization,
    },
    #[error("external category storage exceeds u32 addressing")]
    CategoryStorageFull,
}

// =============================================================================
// Source trees
// =============================================================================

/// A node of a source tree.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceNode<L> {
    Numeric {
        feature: usize,
        threshold: f64,
        default_left: bool,
        left: usize,
        right: usize,
    },
    Categorical {
        feature: usize,
        /// Categories that go right.
        categories: Vec<u32>,
        default_left: bool,
        left: usize,
        right: usize,
    },
    Leaf(L),
}

impl<L> SourceNode<L> {
    /// Left and right child, or `None` for a leaf.
    #[inline]
    pub fn children(&self) -> Option<(usize, usize)> {
        match *self {
            Self::Numeric { left, right, .. } | Self::Categorical { left, right, .. } => {
                Some((left, right))
            }
            Self::Leaf(_) => None,
        }
    }

    #[inline]
    pub fn feature(&self) -> Option<usize> {
        match *self {
            Self::Numeric { feature, .. } | Self::Categorical { feature, .. } => Some(feature),
            Self::Leaf(_) => None,
        }
    }
}

/// A decision tree with explicit child pointers. Node 0 is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceTree<L = ScalarLeaf> {
    nodes: Vec<SourceNode<L>>,
}

impl<L> Default for SourceTree<L> {
    fn default() -> Self {
        Self { nodes: Vec::new() }
    }
}

impl<L> SourceTree<L> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: Vec<SourceNode<L>>) -> Self {
        Self { nodes }
    }

    /// Add a numeric split node. Returns the node index.
    pub fn add_split(
        &mut self,
        feature: usize,
        threshold: f64,
        default_left: bool,
        left: usize,
        right: usize,
    ) -> usize {
        self.push(SourceNode::Numeric {
            feature,
            threshold,
            default_left,
            left,
            right,
        })
    }

    /// Add a categorical split node. Returns the node index.
    pub fn add_categorical(
        &mut self,
        feature: usize,
        categories: Vec<u32>,
        default_left: bool,
        left: usize,
        right: usize,
    ) -> usize {
        self.push(SourceNode::Categorical {
            feature,
            categories,
            default_left,
            left,
            right,
        })
    }

    /// Add a leaf node. Returns the node index.
    pub fn add_leaf(&mut self, value: L) -> usize {
        self.push(SourceNode::Leaf(value))
    }

    fn push(&mut self, node: SourceNode<L>) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    #[inline]
    pub fn nodes(&self) -> &[SourceNode<L>] {
        &self.nodes
    }

    #[inline]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }
}

// =============================================================================
// Layout
// =============================================================================

/// One source tree placed in physical order.
#[derive(Debug)]
struct PlacedTree {
    /// Source node index at each physical position.
    order: Vec<usize>,
    /// Stored offset at each physical position.
    offsets: Vec<usize>,
    depth: usize,
}

fn place_tree<L>(
    tree_idx: usize,
    tree: &SourceTree<L>,
    layout: TreeLayout,
) -> Result<PlacedTree, SourceTreeError> {
    let n_nodes = tree.n_nodes();
    if n_nodes == 0 {
        return Err(SourceTreeError::EmptyTree { tree: tree_idx });
    }

    let mut position = vec![usize::MAX; n_nodes];
    let mut depth = vec![0usize; n_nodes];
    let mut order = Vec::with_capacity(n_nodes);
    let mut pending = VecDeque::from([0usize]);

    // Depth-first pops the most recent node (left pushed last, so it lands
    // right after its parent); breadth-first pops the oldest.
    let next = |pending: &mut VecDeque<usize>| match layout {
        TreeLayout::DepthFirst => pending.pop_back(),
        TreeLayout::BreadthFirst => pending.pop_front(),
    };

    while let Some(node) = next(&mut pending) {
        if position[node] != usize::MAX {
            return Err(SourceTreeError::DuplicateVisit { tree: tree_idx, node });
        }
        position[node] = order.len();
        order.push(node);

        if let Some((left, right)) = tree.nodes[node].children() {
            for child in [left, right] {
                if child >= n_nodes {
                    return Err(SourceTreeError::ChildOutOfBounds {
                        tree: tree_idx,
                        node,
                        child,
                        n_nodes,
                    });
                }
                depth[child] = depth[node] + 1;
            }
            match layout {
                TreeLayout::DepthFirst => pending.extend([right, left]),
                TreeLayout::BreadthFirst => pending.extend([left, right]),
            }
        }
    }

    if let Some(node) = position.iter().position(|&p| p == usize::MAX) {
        return Err(SourceTreeError::UnreachableNode { tree: tree_idx, node });
    }

    let offsets = order
        .iter()
        .enumerate()
        .map(|(pos, &node)| match tree.nodes[node].children() {
            None => 0,
            Some((left, right)) => match layout {
                TreeLayout::DepthFirst => {
                    debug_assert_eq!(position[left], pos + 1);
                    position[right] - pos
                }
                TreeLayout::BreadthFirst => {
                    debug_assert_eq!(position[right], position[left] + 1);
                    position[left]
                }
            },
        })
        .collect();

    let depth = depth.iter().copied().max().unwrap_or(0);
    tracing::trace!(tree = tree_idx, n_nodes, depth, ?layout, "placed tree");

    Ok(PlacedTree {
        order,
        offsets,
        depth,
    })
}

// =============================================================================
// ForestBuilder
// =============================================================================

/// Builds a [`ForestModel`] in the narrowest specialization that fits.
#[derive(Debug, Clone)]
pub struct ForestBuilder<L: LeafValue = ScalarLeaf> {
    config: ForestConfig,
    trees: Vec<SourceTree<L>>,
}

impl<L: LeafValue> ForestBuilder<L> {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
        }
    }

    /// Add a tree.
    pub fn push_tree(&mut self, tree: SourceTree<L>) {
        self.trees.push(tree);
    }

    pub fn with_tree(mut self, tree: SourceTree<L>) -> Self {
        self.push_tree(tree);
        self
    }

    pub fn with_trees(mut self, trees: impl IntoIterator<Item = SourceTree<L>>) -> Self {
        self.trees.extend(trees);
        self
    }

    #[inline]
    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    /// Lay out the trees and measure planner statistics without building.
    pub fn stats(&self) -> Result<ForestStats, SourceTreeError> {
        Ok(self.place()?.stats)
    }

    /// Plan and build the forest.
    ///
    /// # Errors
    ///
    /// - [`BuildError::Source`] for malformed source trees
    /// - [`BuildError::Unusable`] if no specialization can hold the model
    /// - [`BuildError::Invalid`] if the validation pass fails
    pub fn build(&self) -> Result<ForestModel<L>, BuildError> {
        let placed = self.place()?;
        let spec = plan_specialization(&placed.stats)?;
        self.build_placed(&placed, spec)
    }

    /// Build in a given specialization instead of the planned one.
    ///
    /// # Errors
    ///
    /// Besides the errors of [`build`](Self::build), returns
    /// [`BuildError::TooNarrow`] unless `spec` is at least as wide as the
    /// planned specialization on every axis, precision included.
    pub fn build_as(&self, spec: Specialization) -> Result<ForestModel<L>, BuildError> {
        let placed = self.place()?;
        let planned = plan_specialization(&placed.stats)?;
        if !spec.covers(planned) {
            return Err(BuildError::TooNarrow {
                requested: spec,
                planned,
            });
        }
        self.build_placed(&placed, spec)
    }

    fn build_placed(
        &self,
        placed: &PlacedForest<'_, L>,
        spec: Specialization,
    ) -> Result<ForestModel<L>, BuildError> {
        let model = ForestModel::instantiate(spec, placed)?;
        if self.config.validate {
            model.validate()?;
        }
        tracing::debug!(
            n_trees = model.num_trees(),
            n_nodes = model.num_nodes(),
            layout = ?model.layout(),
            %spec,
            "built forest"
        );
        Ok(model)
    }

    fn place(&self) -> Result<PlacedForest<'_, L>, SourceTreeError> {
        let layout = self.config.layout;
        let trees = self
            .trees
            .iter()
            .enumerate()
            .map(|(i, tree)| place_tree(i, tree, layout))
            .collect::<Result<Vec<_>, _>>()?;

        let used_features = self
            .trees
            .iter()
            .flat_map(|t| t.nodes.iter().filter_map(SourceNode::feature))
            .max()
            .map_or(0, |f| f + 1);
        let num_features = match self.config.num_features {
            Some(declared) => {
                self.check_features(declared)?;
                declared
            }
            None => used_features,
        };

        let max_num_categories = self
            .trees
            .iter()
            .flat_map(|t| t.nodes.iter())
            .filter_map(|node| match node {
                SourceNode::Categorical { categories, .. } => {
                    Some(categories.iter().max().map_or(0, |&c| c as usize + 1))
                }
                _ => None,
            })
            .max()
            .unwrap_or(0);

        let separate_outputs = self.config.separate_outputs
            || self
                .trees
                .iter()
                .flat_map(|t| t.nodes.iter())
                .any(|node| matches!(node, SourceNode::Leaf(v) if v.as_scalar().is_none()));

        let stats = ForestStats {
            max_nodes_per_tree: self.trees.iter().map(SourceTree::n_nodes).max().unwrap_or(0),
            max_depth: trees.iter().map(|t| t.depth).max().unwrap_or(0),
            num_features,
            max_num_categories,
            use_double_thresholds: self.config.double_precision,
            layout,
        };

        Ok(PlacedForest {
            sources: &self.trees,
            trees,
            stats,
            separate_outputs,
            num_class: self.config.num_class,
            layout,
        })
    }

    fn check_features(&self, num_features: usize) -> Result<(), SourceTreeError> {
        for (tree, source) in self.trees.iter().enumerate() {
            for (node, n) in source.nodes.iter().enumerate() {
                if let Some(feature) = n.feature().filter(|&f| f >= num_features) {
                    return Err(SourceTreeError::FeatureOutOfRange {
                        tree,
                        node,
                        feature,
                        num_features,
                    });
                }
            }
        }
        Ok(())
    }
}

/// Trees in physical order plus the statistics the planner needs.
struct PlacedForest<'a, L> {
    sources: &'a [SourceTree<L>],
    trees: Vec<PlacedTree>,
    stats: ForestStats,
    separate_outputs: bool,
    num_class: usize,
    layout: TreeLayout,
}

impl<L: LeafValue> ForestFactory<L> for PlacedForest<'_, L> {
    type Error = BuildError;

    fn build<T, F, O, C>(&self) -> Result<Forest<T, F, O, C, L>, BuildError>
    where
        T: Threshold,
        F: IndexWidth,
        O: IndexWidth,
        C: CategoryEncoding,
    {
        let n_nodes: usize = self.trees.iter().map(|t| t.order.len()).sum();
        let too_many_features = |num_features| UnusableModelError::TooManyFeatures {
            num_features,
            max: F::MAX_VALUE,
        };

        let mut values = Vec::with_capacity(n_nodes);
        let mut features = Vec::with_capacity(n_nodes);
        let mut offsets = Vec::with_capacity(n_nodes);
        let mut default_distant = Vec::with_capacity(n_nodes);
        let mut categorical = Vec::with_capacity(n_nodes);
        let mut outputs = self.separate_outputs.then(|| Vec::with_capacity(n_nodes));
        let mut categories = CategoriesStorageBuilder::new();
        let mut tree_offsets = Vec::with_capacity(self.trees.len() + 1);
        tree_offsets.push(0);

        for (source, placed) in self.sources.iter().zip(&self.trees) {
            for (&node, &offset) in placed.order.iter().zip(&placed.offsets) {
                let stored = O::from_usize(offset).ok_or(UnusableModelError::TreesTooLarge {
                    max_node_offset: offset,
                    max: O::MAX_VALUE,
                })?;
                offsets.push(stored);

                match &source.nodes[node] {
                    SourceNode::Numeric {
                        feature,
                        threshold,
                        default_left,
                        ..
                    } => {
                        values.push(NodeValue::Threshold(T::from_f64(*threshold)));
                        features.push(F::from_usize(*feature).ok_or(too_many_features(feature + 1))?);
                        default_distant.push(!default_left);
                        categorical.push(false);
                    }
                    SourceNode::Categorical {
                        feature,
                        categories: set,
                        default_left,
                        ..
                    } => {
                        let handle = C::encode(set, &mut categories).ok_or_else(|| {
                            if C::EXTERNAL {
                                BuildError::CategoryStorageFull
                            } else {
                                UnusableModelError::TooManyCategories {
                                    num_categories: set.iter().max().map_or(0, |&c| c as usize + 1),
                                    max: C::MAX_CATEGORIES,
                                }
                                .into()
                            }
                        })?;
                        values.push(NodeValue::Categories(handle));
                        features.push(F::from_usize(*feature).ok_or(too_many_features(feature + 1))?);
                        default_distant.push(!default_left);
                        categorical.push(true);
                    }
                    SourceNode::Leaf(leaf) => {
                        let inline = match &outputs {
                            Some(_) => T::default(),
                            None => T::from_f64(leaf.as_scalar().unwrap_or_default()),
                        };
                        values.push(NodeValue::Output(inline));
                        features.push(F::default());
                        default_distant.push(false);
                        categorical.push(false);
                    }
                }

                if let Some(outputs) = outputs.as_mut() {
                    outputs.push(match &source.nodes[node] {
                        SourceNode::Leaf(leaf) => leaf.clone(),
                        _ => L::default(),
                    });
                }
            }
            tree_offsets.push(values.len());
        }

        let categorical = categorical.contains(&true).then_some(categorical);
        let forest = Forest::new(ForestParts {
            layout: self.layout,
            values,
            features,
            offsets,
            default_distant,
            categorical,
            outputs,
            categories: categories.build(),
            tree_offsets,
            num_class: self.num_class,
        })?;
        Ok(forest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::{LeafOutput, VectorLeaf};

    /// ```text
    ///        [0] f0 < 0.5
    ///        /          \
    ///    [1] leaf=1.0   [2] f1 < 0.3
    ///                    /          \
    ///               [3] leaf=2.0   [4] leaf=3.0
    /// ```
    fn source_tree() -> SourceTree {
        let mut tree = SourceTree::new();
        tree.add_split(0, 0.5, true, 1, 2);
        tree.add_leaf(ScalarLeaf(1.0));
        tree.add_split(1, 0.3, false, 3, 4);
        tree.add_leaf(ScalarLeaf(2.0));
        tree.add_leaf(ScalarLeaf(3.0));
        tree
    }

    fn leaf_value(model: &ForestModel, index: usize) -> f64 {
        match model.leaf_output(index) {
            Some(LeafOutput::Inline(v)) => v,
            Some(LeafOutput::Separate(leaf)) => leaf.0 as f64,
            None => panic!("node {index} is not a leaf"),
        }
    }

    #[test]
    fn depth_first_placement() {
        let placed = place_tree(0, &source_tree(), TreeLayout::DepthFirst).unwrap();
        assert_eq!(placed.order, vec![0, 1, 2, 3, 4]);
        assert_eq!(placed.offsets, vec![2, 0, 2, 0, 0]);
        assert_eq!(placed.depth, 2);
    }

    #[test]
    fn breadth_first_placement() {
        // Put the deep subtree on the left to make the orders differ
        let mut tree = SourceTree::new();
        tree.add_split(0, 0.5, true, 2, 1);
        tree.add_leaf(ScalarLeaf(1.0));
        tree.add_split(1, 0.3, false, 3, 4);
        tree.add_leaf(ScalarLeaf(2.0));
        tree.add_leaf(ScalarLeaf(3.0));

        let df = place_tree(0, &tree, TreeLayout::DepthFirst).unwrap();
        assert_eq!(df.order, vec![0, 2, 3, 4, 1]);
        assert_eq!(df.offsets, vec![4, 2, 0, 0, 0]);

        let bf = place_tree(0, &tree, TreeLayout::BreadthFirst).unwrap();
        assert_eq!(bf.order, vec![0, 2, 1, 3, 4]);
        assert_eq!(bf.offsets, vec![1, 3, 0, 0, 0]);
    }

    #[test]
    fn rejects_malformed_trees() {
        let empty: SourceTree = SourceTree::new();
        assert_eq!(
            place_tree(3, &empty, TreeLayout::DepthFirst).unwrap_err(),
            SourceTreeError::EmptyTree { tree: 3 }
        );

        let mut dangling = SourceTree::new();
        dangling.add_split(0, 0.5, true, 1, 7);
        dangling.add_leaf(ScalarLeaf(0.0));
        assert!(matches!(
            place_tree(0, &dangling, TreeLayout::DepthFirst),
            Err(SourceTreeError::ChildOutOfBounds { child: 7, .. })
        ));

        let mut cycle = SourceTree::new();
        cycle.add_split(0, 0.5, true, 1, 0);
        cycle.add_leaf(ScalarLeaf(0.0));
        assert!(matches!(
            place_tree(0, &cycle, TreeLayout::BreadthFirst),
            Err(SourceTreeError::DuplicateVisit { node: 0, .. })
        ));

        let mut orphan = SourceTree::new();
        orphan.add_leaf(ScalarLeaf(0.0));
        orphan.add_leaf(ScalarLeaf(1.0));
        assert_eq!(
            place_tree(0, &orphan, TreeLayout::DepthFirst).unwrap_err(),
            SourceTreeError::UnreachableNode { tree: 0, node: 1 }
        );
    }

    #[test]
    fn measures_stats() {
        let mut cat_tree = SourceTree::new();
        cat_tree.add_categorical(4, vec![2, 40], true, 1, 2);
        cat_tree.add_leaf(ScalarLeaf(0.0));
        cat_tree.add_leaf(ScalarLeaf(1.0));

        let builder = ForestBuilder::new(ForestConfig::default())
            .with_tree(source_tree())
            .with_tree(cat_tree);
        let stats = builder.stats().unwrap();
        assert_eq!(stats.max_nodes_per_tree, 5);
        assert_eq!(stats.max_depth, 2);
        assert_eq!(stats.num_features, 5);
        assert_eq!(stats.max_num_categories, 41);

        let model = builder.build().unwrap();
        assert!(model.specialization().external_categories());
        assert!(model.is_categorical(5));
        assert_eq!(model.traverse_to_leaf(1, &[0.0, 0.0, 0.0, 0.0, 40.0f32][..]), 7);
        assert_eq!(model.traverse_to_leaf(1, &[0.0, 0.0, 0.0, 0.0, 3.0f32][..]), 6);
    }

    #[test]
    fn declared_features_must_cover_splits() {
        let config = ForestConfig::builder().num_features(1).build().unwrap();
        let err = ForestBuilder::new(config)
            .with_tree(source_tree())
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            BuildError::Source(SourceTreeError::FeatureOutOfRange { feature: 1, .. })
        ));
    }

    #[test]
    fn built_forest_descends_like_source() {
        for layout in [TreeLayout::DepthFirst, TreeLayout::BreadthFirst] {
            let config = ForestConfig::builder().layout(layout).build().unwrap();
            let model = ForestBuilder::new(config)
                .with_tree(source_tree())
                .build()
                .unwrap();
            assert_eq!(model.layout(), layout);

            let cases: [(&[f32], f64); 5] = [
                (&[0.3, 0.0], 1.0),
                (&[0.7, 0.2], 2.0),
                (&[0.7, 0.5], 3.0),
                (&[f32::NAN, 0.5], 1.0),
                (&[0.7, f32::NAN], 3.0),
            ];
            for (row, expected) in cases {
                let leaf = model.traverse_to_leaf(0, row);
                assert_eq!(leaf_value(&model, leaf), expected, "{layout:?} {row:?}");
            }
        }
    }

    #[test]
    fn vector_leaves_force_separate_outputs() {
        let mut tree = SourceTree::new();
        tree.add_split(0, 0.0, true, 1, 2);
        tree.add_leaf(VectorLeaf::new(vec![0.1, 0.9]));
        tree.add_leaf(VectorLeaf::new(vec![0.8, 0.2]));

        let config = ForestConfig::builder().num_class(2).build().unwrap();
        let model = ForestBuilder::new(config).with_tree(tree).build().unwrap();
        assert_eq!(model.num_class(), 2);
        let leaf = model.traverse_to_leaf(0, &[1.0f32][..]);
        match model.leaf_output(leaf) {
            Some(LeafOutput::Separate(v)) => assert_eq!(v.values(), &[0.8, 0.2]),
            other => panic!("expected separate output, got {other:?}"),
        }
    }

    #[test]
    fn build_as_wider_specialization() {
        let builder = ForestBuilder::new(ForestConfig::default()).with_tree(source_tree());
        let wide = Specialization::new(true, true, true, true);
        let model = builder.build_as(wide).unwrap();
        assert_eq!(model.specialization(), wide);
        assert_eq!(model.threshold(0), Some(0.5));
    }

    #[test]
    fn build_as_rejects_narrower_precision() {
        let mut tree = SourceTree::new();
        tree.add_split(0, 0.1000000002, true, 1, 2);
        tree.add_leaf(ScalarLeaf(1.0));
        tree.add_leaf(ScalarLeaf(2.0));

        let config = ForestConfig::builder().double_precision(true).build().unwrap();
        let builder = ForestBuilder::new(config).with_tree(tree);
        let planned = builder.build().unwrap();
        assert!(planned.specialization().double_precision());
        // Only f64 thresholds keep this value on the near side
        assert_eq!(planned.traverse_to_leaf(0, &[0.1000000001f64][..]), 1);

        let err = builder.build_as(Specialization::default()).unwrap_err();
        assert_eq!(
            err,
            BuildError::TooNarrow {
                requested: Specialization::default(),
                planned: planned.specialization(),
            }
        );
        assert!(err.to_string().contains("narrower than the planned"));
    }

    #[test]
    fn build_as_rejects_narrower_offsets() {
        let config = ForestConfig::builder()
            .layout(TreeLayout::BreadthFirst)
            .build()
            .unwrap();
        let builder = ForestBuilder::new(config).with_tree(crate::testing::left_spine(40_000));
        let narrow_offsets = Specialization::new(false, true, false, true);
        assert!(matches!(
            builder.build_as(narrow_offsets),
            Err(BuildError::TooNarrow { planned, .. }) if planned.wide_offsets()
        ));
    }

    #[test]
    fn empty_forest_builds() {
        let model = ForestBuilder::<ScalarLeaf>::new(ForestConfig::default())
            .build()
            .unwrap();
        assert_eq!(model.num_trees(), 0);
        assert_eq!(model.num_nodes(), 0);
    }
}
