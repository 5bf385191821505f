//! Flattened forest representations.
//!
//! - [`Forest`]: parallel node arrays for one encoding specialization
//! - [`ForestModel`]: the closed set of all 16 specializations
//! - [`NodeValue`], [`LeafValue`]: per-node payloads
//! - [`CategoryEncoding`]: inline or external category sets

pub mod categories;
pub mod forest;
pub mod index;
pub mod leaf;
pub mod model;
pub mod node;

pub use categories::{
    float_to_category, CategoriesStorage, CategoriesStorageBuilder, CategoryEncoding,
    CategorySet, CategorySetRef, ExternalCategories, InlineCategories, InlineCategorySet,
};
pub use forest::{Forest, ForestParts, ForestValidationError, LeafOutput};
pub use index::{IndexWidth, Threshold};
pub use leaf::{LeafValue, ScalarLeaf, VectorLeaf};
pub use model::{ForestFactory, ForestModel};
pub use node::NodeValue;
