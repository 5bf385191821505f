//! Property-based tests for the navigator and built forests.
//!
//! Random source trees with numeric and categorical splits are laid out in
//! both layouts and checked against the navigation rules and against a
//! direct walk of the source tree.

use std::collections::VecDeque;

use proptest::collection::vec as prop_vec;
use proptest::prelude::*;

use boosters_compact::build::{ForestBuilder, SourceNode, SourceTree};
use boosters_compact::testing::source_leaf;
use boosters_compact::{
    ForestConfig, ForestModel, LeafOutput, ScalarLeaf, Specialization, TreeLayout,
};

const NUM_FEATURES: usize = 4;
const MAX_DEPTH: usize = 8;
const MAX_CATEGORY: u32 = 8;

// =============================================================================
// Arbitrary Tree Generators
// =============================================================================

/// Split choices for one node: numeric, or categorical with a set of ids.
#[derive(Debug, Clone)]
enum SplitKind {
    Numeric(f32),
    Categorical(Vec<u32>),
}

/// Grow a tree breadth-first, consuming one split flag per node.
///
/// Leaves store their source node index so the reached leaf can be
/// identified after layout.
fn grow_tree(splits: &[bool], kinds: &[SplitKind], features: &[usize]) -> SourceTree {
    let mut nodes: Vec<Option<SourceNode<ScalarLeaf>>> = vec![None];
    let mut pending = VecDeque::from([(0usize, 0usize)]);
    let mut k = 0;

    while let Some((index, depth)) = pending.pop_front() {
        let split = splits.get(k).copied().unwrap_or(false) && depth < MAX_DEPTH;
        nodes[index] = Some(if split {
            let left = nodes.len();
            nodes.extend([None, None]);
            pending.extend([(left, depth + 1), (left + 1, depth + 1)]);
            let feature = features[k % features.len()];
            let default_left = k % 2 == 0;
            match &kinds[k % kinds.len()] {
                SplitKind::Numeric(threshold) => SourceNode::Numeric {
                    feature,
                    threshold: *threshold as f64,
                    default_left,
                    left,
                    right: left + 1,
                },
                SplitKind::Categorical(categories) => SourceNode::Categorical {
                    feature,
                    categories: categories.clone(),
                    default_left,
                    left,
                    right: left + 1,
                },
            }
        } else {
            SourceNode::Leaf(ScalarLeaf(index as f32))
        });
        k += 1;
    }

    SourceTree::from_nodes(nodes.into_iter().flatten().collect())
}

fn arb_split_kind() -> impl Strategy<Value = SplitKind> {
    prop_oneof![
        2 => (0.0f32..MAX_CATEGORY as f32).prop_map(SplitKind::Numeric),
        1 => prop_vec(0..MAX_CATEGORY, 0..4).prop_map(SplitKind::Categorical),
    ]
}

fn arb_tree() -> impl Strategy<Value = SourceTree> {
    (
        prop_vec(any::<bool>(), 1..48),
        prop_vec(arb_split_kind(), 1..16),
        prop_vec(0..NUM_FEATURES, 1..16),
    )
        .prop_map(|(splits, kinds, features)| grow_tree(&splits, &kinds, &features))
}

/// Feature values mix fractions, whole category ids, negatives and NaN.
fn arb_row() -> impl Strategy<Value = Vec<f32>> {
    prop_vec(
        prop_oneof![
            3 => 0.0f32..MAX_CATEGORY as f32,
            3 => (0..MAX_CATEGORY + 2).prop_map(|c| c as f32),
            1 => Just(-1.0f32),
            1 => Just(f32::NAN),
        ],
        NUM_FEATURES,
    )
}

fn arb_layout() -> impl Strategy<Value = TreeLayout> {
    prop_oneof![Just(TreeLayout::DepthFirst), Just(TreeLayout::BreadthFirst)]
}

fn build(trees: &[SourceTree], layout: TreeLayout) -> ForestModel {
    let config = ForestConfig::builder().layout(layout).build().unwrap();
    ForestBuilder::new(config)
        .with_trees(trees.iter().cloned())
        .build()
        .unwrap()
}

fn source_depth(tree: &SourceTree) -> usize {
    fn go(tree: &SourceTree, node: usize) -> usize {
        match tree.nodes()[node].children() {
            Some((l, r)) => 1 + go(tree, l).max(go(tree, r)),
            None => 0,
        }
    }
    go(tree, 0)
}

fn inline_leaf(model: &ForestModel, index: usize) -> f64 {
    match model.leaf_output(index) {
        Some(LeafOutput::Inline(value)) => value,
        other => panic!("node {index} has no inline output: {other:?}"),
    }
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn children_follow_layout_rules(trees in prop_vec(arb_tree(), 1..4), layout in arb_layout()) {
        let model = build(&trees, layout);
        for tree in 0..model.num_trees() {
            let base = model.tree_offsets()[tree];
            let size = model.tree_size(tree);
            for local in 0..size {
                let offset = model.offset(base + local);
                if offset == 0 {
                    prop_assert!(model.is_leaf(base + local));
                    continue;
                }
                let near = layout.next_index(local, offset, false);
                let distant = layout.next_index(local, offset, true);
                match layout {
                    TreeLayout::DepthFirst => {
                        prop_assert_eq!(near, local + 1);
                        prop_assert_eq!(distant, local + offset);
                    }
                    TreeLayout::BreadthFirst => {
                        prop_assert_eq!(near, offset);
                        prop_assert_eq!(distant, near + 1);
                    }
                }
                prop_assert!(local < near && near < distant && distant < size);
            }
        }
    }

    #[test]
    fn paths_end_within_depth(
        trees in prop_vec(arb_tree(), 1..4),
        layout in arb_layout(),
        row in arb_row(),
    ) {
        let model = build(&trees, layout);
        for (tree, source) in trees.iter().enumerate() {
            let base = model.tree_offsets()[tree];
            let size = model.tree_size(tree);
            let mut local = 0;
            let mut steps = 0;
            while !model.is_leaf(base + local) {
                let node = base + local;
                let branch = model.branch_taken(node, row[model.feature(node)] as f64);
                local = layout.next_index(local, model.offset(node), branch);
                steps += 1;
                prop_assert!(local < size);
            }
            prop_assert!(steps <= source_depth(source));
            prop_assert_eq!(base + local, model.traverse_to_leaf(tree, &row[..]));
        }
    }

    #[test]
    fn descent_matches_source_walk(
        trees in prop_vec(arb_tree(), 1..4),
        layout in arb_layout(),
        rows in prop_vec(arb_row(), 1..8),
    ) {
        let model = build(&trees, layout);
        for row in &rows {
            for (tree, source) in trees.iter().enumerate() {
                let expected = source_leaf(source, &row[..]) as f64;
                let leaf = model.traverse_to_leaf(tree, &row[..]);
                prop_assert_eq!(inline_leaf(&model, leaf), expected);
            }
        }
    }

    #[test]
    fn categorical_splits_follow_set_membership(tree in arb_tree(), row in arb_row()) {
        let model = build(std::slice::from_ref(&tree), TreeLayout::DepthFirst);
        let base = model.tree_offsets()[0];
        for node in model.tree_range(0) {
            if !model.is_categorical(node) {
                continue;
            }
            let value = row[model.feature(node)];
            let expected = if value.is_nan() {
                model.default_distant(node)
            } else {
                value >= 0.0
                    && value.fract() == 0.0
                    && model.category_contains(node, value as u32)
            };
            prop_assert_eq!(model.branch_taken(node, value as f64), expected, "node {}", node - base);
        }
    }

    #[test]
    fn every_specialization_descends_alike(tree in arb_tree(), layout in arb_layout(), row in arb_row()) {
        let config = ForestConfig::builder().layout(layout).build().unwrap();
        let builder = ForestBuilder::new(config).with_tree(tree.clone());
        let expected = source_leaf(&tree, &row[..]) as f64;
        for spec in Specialization::all() {
            let model = builder.build_as(spec).unwrap();
            prop_assert_eq!(model.specialization(), spec);
            let leaf = model.traverse_to_leaf(0, &row[..]);
            prop_assert_eq!(inline_leaf(&model, leaf), expected);
        }
    }
}
