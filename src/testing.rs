//! Fixture trees and reference traversal shared by unit and integration tests.
//!
//! # Usage
//!
//! ```
//! use boosters_compact::testing::{balanced_tree, source_leaf};
//!
//! let tree = balanced_tree(3, 2);
//! assert_eq!(tree.n_nodes(), 15);
//! let leaf = source_leaf(&tree, &[0.9f32, 0.1][..]);
//! assert!(tree.nodes()[leaf].children().is_none());
//! ```

use crate::build::{SourceNode, SourceTree};
use crate::repr::{float_to_category, ScalarLeaf};
use crate::sample::SampleAccessor;

// =============================================================================
// Fixture Trees
// =============================================================================

/// A single split on `feature` with two leaves.
pub fn stump(feature: usize, threshold: f64, left: f32, right: f32) -> SourceTree {
    let mut tree = SourceTree::new();
    tree.add_split(feature, threshold, true, 1, 2);
    tree.add_leaf(ScalarLeaf(left));
    tree.add_leaf(ScalarLeaf(right));
    tree
}

/// A single categorical split. Categories in `categories` go right.
pub fn categorical_stump(feature: usize, categories: Vec<u32>) -> SourceTree {
    let mut tree = SourceTree::new();
    tree.add_categorical(feature, categories, true, 1, 2);
    tree.add_leaf(ScalarLeaf(-1.0));
    tree.add_leaf(ScalarLeaf(1.0));
    tree
}

/// A complete binary tree of `depth` levels of splits.
///
/// Split nodes cycle through `num_features` features with thresholds that
/// alternate around 0.5. Leaves hold their left-to-right rank. Nodes are
/// stored in heap order, so node `i` has children `2i + 1` and `2i + 2`.
pub fn balanced_tree(depth: u32, num_features: usize) -> SourceTree {
    let n_splits = (1usize << depth) - 1;
    let n_nodes = (1usize << (depth + 1)) - 1;
    let nodes = (0..n_nodes)
        .map(|i| {
            if i < n_splits {
                SourceNode::Numeric {
                    feature: i % num_features.max(1),
                    threshold: if i % 2 == 0 { 0.5 } else { 0.25 },
                    default_left: i % 3 != 0,
                    left: 2 * i + 1,
                    right: 2 * i + 2,
                }
            } else {
                SourceNode::Leaf(ScalarLeaf((i - n_splits) as f32))
            }
        })
        .collect();
    SourceTree::from_nodes(nodes)
}

/// A tree whose splits all chain through the left child.
///
/// `depth` splits and `depth + 1` leaves. Split `l` tests feature 0 against
/// threshold `l`; its right child is a leaf holding `l`, and the left child
/// of the last split is a leaf holding `depth`. In depth-first order the
/// root's distant child is the last node, so the root offset is `2 * depth`.
pub fn left_spine(depth: usize) -> SourceTree {
    let mut tree = SourceTree::new();
    for level in 0..depth {
        let split = 2 * level;
        tree.add_split(0, level as f64, true, split + 2, split + 1);
        tree.add_leaf(ScalarLeaf(level as f32));
    }
    tree.add_leaf(ScalarLeaf(depth as f32));
    tree
}

// =============================================================================
// Reference Traversal
// =============================================================================

/// Walk a source tree directly and return the index of the reached leaf.
///
/// Uses the same decision rule as the compact forest, so results can be
/// compared leaf by leaf.
pub fn source_leaf<L, S: SampleAccessor + ?Sized>(tree: &SourceTree<L>, sample: &S) -> usize {
    let nodes = tree.nodes();
    let mut index = 0;
    loop {
        index = match &nodes[index] {
            SourceNode::Leaf(_) => return index,
            SourceNode::Numeric {
                feature,
                threshold,
                default_left,
                left,
                right,
            } => {
                let value = sample.feature(*feature);
                let go_left = if value.is_nan() {
                    *default_left
                } else {
                    value < *threshold
                };
                if go_left {
                    *left
                } else {
                    *right
                }
            }
            SourceNode::Categorical {
                feature,
                categories,
                default_left,
                left,
                right,
            } => {
                let value = sample.feature(*feature);
                let go_left = if value.is_nan() {
                    *default_left
                } else {
                    !float_to_category(value).is_some_and(|c| categories.contains(&c))
                };
                if go_left {
                    *left
                } else {
                    *right
                }
            }
        };
    }
}
