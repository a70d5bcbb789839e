//! Configuration types for the Tessera engine.
//!
//! All types implement [`serde::Deserialize`] so that front ends can load them
//! from a file. Every field has a default, and a configuration file only needs
//! to mention what it changes.
//!
//! - [`EngineConfig`] - Top-level configuration.
//! - [`LayoutConfig`] - Tunables of the built-in overlap removal.
//! - [`SizeConfig`] - Node sizes used when no renderer can measure them.
//! - [`NeighborhoodConfig`] - Placement of nodes added by the neighborhood materializer.
//!
//! # Example
//!
//! ```
//! # use tessera::config::EngineConfig;
//! let config = EngineConfig::default();
//! assert!(config.validate().is_ok());
//! assert_eq!(config.layout().max_iterations(), 100);
//! ```

use serde::Deserialize;

use crate::error::TesseraError;

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    layout: LayoutConfig,

    #[serde(default)]
    sizes: SizeConfig,

    #[serde(default)]
    neighborhood: NeighborhoodConfig,
}

impl EngineConfig {
    pub fn new(layout: LayoutConfig, sizes: SizeConfig, neighborhood: NeighborhoodConfig) -> Self {
        Self {
            layout,
            sizes,
            neighborhood,
        }
    }

    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    pub fn sizes(&self) -> &SizeConfig {
        &self.sizes
    }

    pub fn neighborhood(&self) -> &NeighborhoodConfig {
        &self.neighborhood
    }

    /// Checks that every dimension is positive and finite.
    ///
    /// # Errors
    ///
    /// Returns [`TesseraError::Config`] naming the first offending field.
    pub fn validate(&self) -> Result<(), TesseraError> {
        let dimensions = [
            ("layout.min_spacing", self.layout.min_spacing),
            ("sizes.node_width", self.sizes.node_width),
            ("sizes.node_height", self.sizes.node_height),
            ("sizes.diagram_node_width", self.sizes.diagram_node_width),
            ("sizes.diagram_node_height", self.sizes.diagram_node_height),
            ("neighborhood.spacing", self.neighborhood.spacing),
        ];
        for (name, value) in dimensions {
            if !value.is_finite() || value < 0.0 {
                return Err(TesseraError::Config(format!(
                    "`{name}` must be a non-negative number, got {value}"
                )));
            }
        }
        if self.layout.max_iterations == 0 {
            return Err(TesseraError::Config(
                "`layout.max_iterations` must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Tunables of the built-in overlap removal.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Minimum gap kept between two boxes.
    min_spacing: f32,

    /// Upper bound on separation passes before the layout gives up.
    max_iterations: usize,
}

impl LayoutConfig {
    pub fn new(min_spacing: f32, max_iterations: usize) -> Self {
        Self {
            min_spacing,
            max_iterations,
        }
    }

    pub fn min_spacing(&self) -> f32 {
        self.min_spacing
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_spacing: 20.0,
            max_iterations: 100,
        }
    }
}

/// Default node dimensions.
///
/// Front ends with a renderer measure nodes themselves; these sizes are used
/// by [`crate::layout::FixedSizes`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SizeConfig {
    node_width: f32,
    node_height: f32,
    diagram_node_width: f32,
    diagram_node_height: f32,
}

impl SizeConfig {
    pub fn new(
        node_width: f32,
        node_height: f32,
        diagram_node_width: f32,
        diagram_node_height: f32,
    ) -> Self {
        Self {
            node_width,
            node_height,
            diagram_node_width,
            diagram_node_height,
        }
    }

    pub fn node_width(&self) -> f32 {
        self.node_width
    }

    pub fn node_height(&self) -> f32 {
        self.node_height
    }

    pub fn diagram_node_width(&self) -> f32 {
        self.diagram_node_width
    }

    pub fn diagram_node_height(&self) -> f32 {
        self.diagram_node_height
    }
}

impl Default for SizeConfig {
    fn default() -> Self {
        Self {
            node_width: 160.0,
            node_height: 60.0,
            diagram_node_width: 200.0,
            diagram_node_height: 100.0,
        }
    }
}

/// Placement of nodes created by [`crate::neighborhood::add_entity_neighborhood`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NeighborhoodConfig {
    /// Gap between the focused node and the neighbours placed around it.
    spacing: f32,
}

impl NeighborhoodConfig {
    pub fn new(spacing: f32) -> Self {
        Self { spacing }
    }

    pub fn spacing(&self) -> f32 {
        self.spacing
    }
}

impl Default for NeighborhoodConfig {
    fn default() -> Self {
        Self { spacing: 40.0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: EngineConfig = toml::from_str(
            r#"
            [layout]
            min_spacing = 8.0

            [sizes]
            node_width = 90.0
            "#,
        )
        .unwrap();

        assert_eq!(config.layout().min_spacing(), 8.0);
        assert_eq!(config.layout().max_iterations(), 100);
        assert_eq!(config.sizes().node_width(), 90.0);
        assert_eq!(config.sizes().node_height(), 60.0);
        assert_eq!(config.neighborhood().spacing(), 40.0);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config.sizes().diagram_node_width(), 200.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_size() {
        let config = EngineConfig::new(
            LayoutConfig::default(),
            SizeConfig::new(-1.0, 60.0, 200.0, 100.0),
            NeighborhoodConfig::default(),
        );

        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sizes.node_width"));
    }

    #[test]
    fn test_validate_rejects_zero_iterations() {
        let config = EngineConfig::new(
            LayoutConfig::new(10.0, 0),
            SizeConfig::default(),
            NeighborhoodConfig::default(),
        );

        assert!(matches!(config.validate(), Err(TesseraError::Config(_))));
    }
}
