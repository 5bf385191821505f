//! boosters-compact: compact flattened encoding of decision tree ensembles.
//!
//! Every node of every tree is stored in a handful of parallel arrays. The
//! width of each array (threshold precision, feature index, child offset,
//! category set encoding) is chosen per model by the capacity planner, so a
//! small model pays for 16-bit indices and a huge one still loads.
//!
//! - [`layout`]: the two physical node orderings and the single-step navigator
//! - [`repr`]: the forest arrays and the registry of all 16 specializations
//! - [`planner`]: statistics to specialization selector
//! - [`build`]: abstract source trees to a planned, laid-out forest
//!
//! # Example
//!
//! ```
//! use boosters_compact::build::{ForestBuilder, SourceTree};
//! use boosters_compact::{ForestConfig, ScalarLeaf, TreeLayout};
//!
//! let mut tree = SourceTree::new();
//! tree.add_split(0, 0.5, true, 1, 2);
//! tree.add_leaf(ScalarLeaf(-1.0));
//! tree.add_leaf(ScalarLeaf(1.0));
//!
//! let config = ForestConfig::builder()
//!     .layout(TreeLayout::BreadthFirst)
//!     .build()
//!     .unwrap();
//! let model = ForestBuilder::new(config).with_tree(tree).build().unwrap();
//!
//! let leaf = model.traverse_to_leaf(0, &[0.1f32][..]);
//! assert!(model.is_leaf(leaf));
//! ```

pub mod build;
pub mod config;
pub mod layout;
pub mod planner;
pub mod repr;
pub mod sample;
pub mod testing;

pub use build::{BuildError, ForestBuilder, SourceNode, SourceTree, SourceTreeError};
pub use config::{ConfigError, ForestConfig};
pub use layout::{TreeLayout, TreeView};
pub use planner::{plan_specialization, ForestStats, Specialization, UnusableModelError};
pub use repr::{
    CategoryEncoding, ExternalCategories, Forest, ForestModel, ForestParts,
    ForestValidationError, InlineCategories, LeafOutput, LeafValue, NodeValue, ScalarLeaf,
    VectorLeaf,
};
pub use sample::SampleAccessor;
