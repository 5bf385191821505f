//! Closed registry of instantiated forest specializations.
//!
//! [`ForestModel`] has one variant per [`Specialization`] index. The variant
//! is picked once when a model is loaded; callers either match on it to get
//! the concrete [`Forest`] or use the dispatching accessors below.

use std::ops::Range;

use crate::layout::TreeLayout;
use crate::planner::Specialization;
use crate::sample::SampleAccessor;

use super::categories::{CategoryEncoding, ExternalCategories, InlineCategories};
use super::forest::{Forest, ForestValidationError, LeafOutput};
use super::index::{IndexWidth, Threshold};
use super::leaf::{LeafValue, ScalarLeaf};

/// Source of forests that can be materialized in any specialization.
///
/// [`ForestModel::instantiate`] calls `build` with the concrete widths of the
/// selected specialization.
pub trait ForestFactory<L: LeafValue> {
    type Error;

    fn build<T, F, O, C>(&self) -> Result<Forest<T, F, O, C, L>, Self::Error>
    where
        T: Threshold,
        F: IndexWidth,
        O: IndexWidth,
        C: CategoryEncoding;
}

macro_rules! forest_model {
    ($($index:literal => $variant:ident($t:ty, $f:ty, $o:ty, $c:ty),)*) => {
        /// A loaded forest in whichever specialization the planner selected.
        ///
        /// Variants are named `<precision><feature width><offset width><category encoding>`.
        #[derive(Debug, Clone)]
        pub enum ForestModel<L: LeafValue = ScalarLeaf> {
            $(
                #[doc = concat!("Specialization ", stringify!($index), ".")]
                $variant(Forest<$t, $f, $o, $c, L>),
            )*
        }

        $(
            impl<L: LeafValue> From<Forest<$t, $f, $o, $c, L>> for ForestModel<L> {
                fn from(forest: Forest<$t, $f, $o, $c, L>) -> Self {
                    Self::$variant(forest)
                }
            }
        )*

        impl<L: LeafValue> ForestModel<L> {
            /// Build the variant selected by `spec`.
            pub fn instantiate<B: ForestFactory<L>>(
                spec: Specialization,
                factory: &B,
            ) -> Result<Self, B::Error> {
                match spec.index() {
                    $($index => factory.build::<$t, $f, $o, $c>().map(Self::$variant),)*
                    index => unreachable!("specialization index {index} out of range"),
                }
            }

            /// Selector of the active variant.
            pub fn specialization(&self) -> Specialization {
                match self {
                    $(Self::$variant(forest) => forest.specialization(),)*
                }
            }

            pub fn layout(&self) -> TreeLayout {
                match self {
                    $(Self::$variant(forest) => forest.layout(),)*
                }
            }

            pub fn num_trees(&self) -> usize {
                match self {
                    $(Self::$variant(forest) => forest.num_trees(),)*
                }
            }

            pub fn num_nodes(&self) -> usize {
                match self {
                    $(Self::$variant(forest) => forest.num_nodes(),)*
                }
            }

            pub fn num_class(&self) -> usize {
                match self {
                    $(Self::$variant(forest) => forest.num_class(),)*
                }
            }

            /// Root index of every tree, followed by the total node count.
            pub fn tree_offsets(&self) -> &[usize] {
                match self {
                    $(Self::$variant(forest) => forest.tree_offsets(),)*
                }
            }

            pub fn tree_range(&self, tree: usize) -> Range<usize> {
                match self {
                    $(Self::$variant(forest) => forest.tree_range(tree),)*
                }
            }

            pub fn tree_size(&self, tree: usize) -> usize {
                match self {
                    $(Self::$variant(forest) => forest.tree_size(tree),)*
                }
            }

            pub fn feature(&self, index: usize) -> usize {
                match self {
                    $(Self::$variant(forest) => forest.feature(index),)*
                }
            }

            pub fn offset(&self, index: usize) -> usize {
                match self {
                    $(Self::$variant(forest) => forest.offset(index),)*
                }
            }

            pub fn default_distant(&self, index: usize) -> bool {
                match self {
                    $(Self::$variant(forest) => forest.default_distant(index),)*
                }
            }

            pub fn is_categorical(&self, index: usize) -> bool {
                match self {
                    $(Self::$variant(forest) => forest.is_categorical(index),)*
                }
            }

            pub fn is_leaf(&self, index: usize) -> bool {
                match self {
                    $(Self::$variant(forest) => forest.is_leaf(index),)*
                }
            }

            /// Split threshold of a numeric split node, widened to f64.
            pub fn threshold(&self, index: usize) -> Option<f64> {
                match self {
                    $(Self::$variant(forest) => forest.value(index).threshold().map(Threshold::to_f64),)*
                }
            }

            pub fn leaf_output(&self, index: usize) -> Option<LeafOutput<'_, L>> {
                match self {
                    $(Self::$variant(forest) => forest.leaf_output(index),)*
                }
            }

            pub fn category_contains(&self, index: usize, category: u32) -> bool {
                match self {
                    $(Self::$variant(forest) => forest.category_contains(index, category),)*
                }
            }

            pub fn branch_taken(&self, index: usize, feature_value: f64) -> bool {
                match self {
                    $(Self::$variant(forest) => forest.branch_taken(index, feature_value),)*
                }
            }

            /// Descend tree `tree` for one sample and return the flat leaf index.
            pub fn traverse_to_leaf<S: SampleAccessor + ?Sized>(&self, tree: usize, sample: &S) -> usize {
                match self {
                    $(Self::$variant(forest) => forest.traverse_to_leaf(tree, sample),)*
                }
            }

            pub fn validate(&self) -> Result<(), ForestValidationError> {
                match self {
                    $(Self::$variant(forest) => forest.validate(),)*
                }
            }
        }
    };
}

forest_model! {
    0 => F32Feat16Off16Inline(f32, u16, u16, InlineCategories),
    1 => F32Feat16Off16External(f32, u16, u16, ExternalCategories),
    2 => F32Feat16Off32Inline(f32, u16, u32, InlineCategories),
    3 => F32Feat16Off32External(f32, u16, u32, ExternalCategories),
    4 => F32Feat32Off16Inline(f32, u32, u16, InlineCategories),
    5 => F32Feat32Off16External(f32, u32, u16, ExternalCategories),
    6 => F32Feat32Off32Inline(f32, u32, u32, InlineCategories),
    7 => F32Feat32Off32External(f32, u32, u32, ExternalCategories),
    8 => F64Feat16Off16Inline(f64, u16, u16, InlineCategories),
    9 => F64Feat16Off16External(f64, u16, u16, ExternalCategories),
    10 => F64Feat16Off32Inline(f64, u16, u32, InlineCategories),
    11 => F64Feat16Off32External(f64, u16, u32, ExternalCategories),
    12 => F64Feat32Off16Inline(f64, u32, u16, InlineCategories),
    13 => F64Feat32Off16External(f64, u32, u16, ExternalCategories),
    14 => F64Feat32Off32Inline(f64, u32, u32, InlineCategories),
    15 => F64Feat32Off32External(f64, u32, u32, ExternalCategories),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repr::{CategoriesStorage, ForestParts, NodeValue};

    fn stump<T: Threshold>() -> ForestParts<T, u16, u16, InlineCategories> {
        ForestParts {
            layout: TreeLayout::DepthFirst,
            values: vec![
                NodeValue::Threshold(T::from_f64(0.5)),
                NodeValue::Output(T::from_f64(-1.0)),
                NodeValue::Output(T::from_f64(1.0)),
            ],
            features: vec![0, 0, 0],
            offsets: vec![2, 0, 0],
            default_distant: vec![false; 3],
            categorical: None,
            outputs: None,
            categories: CategoriesStorage::empty(),
            tree_offsets: vec![0, 3],
            num_class: 1,
        }
    }

    #[test]
    fn variant_reports_its_selector() {
        let model: ForestModel = Forest::new(stump::<f32>()).unwrap().into();
        assert_eq!(model.specialization().index(), 0);
        assert!(matches!(model, ForestModel::F32Feat16Off16Inline(_)));

        let model: ForestModel = Forest::new(stump::<f64>()).unwrap().into();
        assert_eq!(model.specialization().index(), 8);
        assert!(model.specialization().double_precision());
    }

    struct StumpFactory;

    impl ForestFactory<ScalarLeaf> for StumpFactory {
        type Error = ForestValidationError;

        fn build<T, F, O, C>(&self) -> Result<Forest<T, F, O, C>, Self::Error>
        where
            T: Threshold,
            F: IndexWidth,
            O: IndexWidth,
            C: CategoryEncoding,
        {
            Forest::new(ForestParts {
                layout: TreeLayout::DepthFirst,
                values: vec![
                    NodeValue::Threshold(T::from_f64(0.5)),
                    NodeValue::Output(T::default()),
                    NodeValue::Output(T::default()),
                ],
                features: vec![F::default(); 3],
                offsets: [2, 0, 0].into_iter().filter_map(O::from_usize).collect(),
                default_distant: vec![false; 3],
                categorical: None,
                outputs: None,
                categories: CategoriesStorage::empty(),
                tree_offsets: vec![0, 3],
                num_class: 1,
            })
        }
    }

    #[test]
    fn instantiate_covers_every_specialization() {
        for spec in Specialization::all() {
            let model = ForestModel::instantiate(spec, &StumpFactory).unwrap();
            assert_eq!(model.specialization(), spec);
            assert_eq!(model.traverse_to_leaf(0, &[1.0f32][..]), 2);
        }
    }

    #[test]
    fn dispatch_reaches_forest() {
        let model: ForestModel = Forest::new(stump::<f64>()).unwrap().into();
        assert_eq!(model.num_trees(), 1);
        assert_eq!(model.num_nodes(), 3);
        assert_eq!(model.tree_offsets(), &[0, 3]);
        assert_eq!(model.tree_range(0), 0..3);
        assert!(!model.category_contains(0, 1));
        assert_eq!(model.threshold(0), Some(0.5));
        assert_eq!(model.traverse_to_leaf(0, &[0.7f64][..]), 2);
        assert_eq!(model.leaf_output(2), Some(LeafOutput::Inline(1.0)));
        assert!(model.validate().is_ok());
    }
}
