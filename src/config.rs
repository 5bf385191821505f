//! Forest construction configuration.
//!
//! [`ForestConfig`] uses the `bon` builder with a validating finish function.
//!
//! # Example
//!
//! ```
//! use boosters_compact::{ForestConfig, TreeLayout};
//!
//! // Defaults: depth-first, single precision, inline leaf outputs
//! let config = ForestConfig::builder().build().unwrap();
//! assert_eq!(config.layout, TreeLayout::DepthFirst);
//!
//! let config = ForestConfig::builder()
//!     .layout(TreeLayout::BreadthFirst)
//!     .double_precision(true)
//!     .num_class(3)
//!     .build()
//!     .unwrap();
//! assert_eq!(config.num_class, 3);
//! ```

use bon::Builder;

use crate::layout::TreeLayout;

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("num_class must be at least 1")]
    InvalidNumClass,
    #[error("num_features must be at least 1 when set")]
    InvalidNumFeatures,
}

/// Configuration for building a forest from source trees.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(
    derive(Clone, Debug),
    finish_fn(vis = "", name = __build_internal)
)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ForestConfig {
    /// Physical node ordering. Default: depth-first.
    #[builder(default)]
    pub layout: TreeLayout,

    /// Store thresholds in f64. Default: false.
    #[builder(default)]
    pub double_precision: bool,

    /// Keep leaf outputs in a separate array even when they are scalar.
    ///
    /// Forced on when any leaf is not scalar. Default: false.
    #[builder(default)]
    pub separate_outputs: bool,

    /// Declared feature count. `None` infers `max feature index + 1`.
    pub num_features: Option<usize>,

    /// Number of classes the leaf outputs contribute to. Default: 1.
    #[builder(default = 1)]
    pub num_class: usize,

    /// Run the full validation pass on the built forest. Default: true.
    #[builder(default = true)]
    pub validate: bool,
}

impl<S: forest_config_builder::IsComplete> ForestConfigBuilder<S> {
    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `num_class == 0` or `num_features == Some(0)`.
    pub fn build(self) -> Result<ForestConfig, ConfigError> {
        let config = self.__build_internal();
        config.validate_params()?;
        Ok(config)
    }
}

impl ForestConfig {
    fn validate_params(&self) -> Result<(), ConfigError> {
        if self.num_class == 0 {
            return Err(ConfigError::InvalidNumClass);
        }
        if self.num_features == Some(0) {
            return Err(ConfigError::InvalidNumFeatures);
        }
        Ok(())
    }
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            layout: TreeLayout::default(),
            double_precision: false,
            separate_outputs: false,
            num_features: None,
            num_class: 1,
            validate: true,
        }
    }
}
