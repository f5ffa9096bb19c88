//! Configuration for implore-octree
//!
//! Controls how an index is built by the in-memory store and how
//! directed queries order their child visits.

use serde::{Deserialize, Serialize};

use crate::error::{OctreeError, OctreeResult};

/// Deepest level a build may subdivide to
pub const MAX_SUPPORTED_DEPTH: u32 = 32;

/// Octree configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OctreeConfig {
    /// Leaf capacity used when building an index
    pub max_points_per_node: usize,
    /// Size of the level-of-detail subsample kept on interior nodes
    pub lod_points_per_node: usize,
    /// Build-time cap on subdivision depth
    pub max_depth: u32,
    /// Visit children of interior nodes nearest-first during range queries.
    /// Only the visiting order changes; results are identical either way.
    pub ordered_children: bool,
}

impl Default for OctreeConfig {
    fn default() -> Self {
        Self {
            max_points_per_node: 4096,
            lod_points_per_node: 1024,
            max_depth: 21,
            ordered_children: false,
        }
    }
}

impl OctreeConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the leaf capacity
    pub fn with_max_points_per_node(mut self, max_points_per_node: usize) -> Self {
        self.max_points_per_node = max_points_per_node;
        self
    }

    /// Set the level-of-detail sample size
    pub fn with_lod_points_per_node(mut self, lod_points_per_node: usize) -> Self {
        self.lod_points_per_node = lod_points_per_node;
        self
    }

    /// Set the maximum build depth
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Enable or disable nearest-first child ordering
    pub fn with_ordered_children(mut self, ordered_children: bool) -> Self {
        self.ordered_children = ordered_children;
        self
    }

    /// Load configuration from a TOML string
    pub fn from_toml(toml_str: &str) -> OctreeResult<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| OctreeError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to TOML
    pub fn to_toml(&self) -> OctreeResult<String> {
        toml::to_string_pretty(self).map_err(|e| OctreeError::ConfigParse(e.to_string()))
    }

    /// Load configuration from a JSON string
    pub fn from_json(json_str: &str) -> OctreeResult<Self> {
        let config: Self =
            serde_json::from_str(json_str).map_err(|e| OctreeError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to JSON
    pub fn to_json(&self) -> OctreeResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| OctreeError::ConfigParse(e.to_string()))
    }

    /// Validate configuration values
    pub fn validate(&self) -> OctreeResult<()> {
        if self.max_points_per_node == 0 {
            return Err(OctreeError::InvalidConfig(
                "max_points_per_node must be positive".to_string(),
            ));
        }

        if self.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(OctreeError::InvalidConfig(format!(
                "max_depth must be at most {}, got {}",
                MAX_SUPPORTED_DEPTH, self.max_depth
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = OctreeConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.ordered_children);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = OctreeConfig::from_toml(
            r#"
            max_points_per_node = 64
            ordered_children = true
            "#,
        )
        .unwrap();

        assert_eq!(config.max_points_per_node, 64);
        assert!(config.ordered_children);
        assert_eq!(config.max_depth, OctreeConfig::default().max_depth);
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = OctreeConfig::new()
            .with_max_points_per_node(128)
            .with_lod_points_per_node(16);
        let text = config.to_toml().unwrap();
        assert_eq!(OctreeConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_json_config() {
        let config = OctreeConfig::from_json(r#"{ "max_depth": 8 }"#).unwrap();
        assert_eq!(config.max_depth, 8);
        assert!(config.to_json().unwrap().contains("max_depth"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            OctreeConfig::from_toml("max_points_per_node = 0"),
            Err(OctreeError::InvalidConfig(_))
        ));
        assert!(matches!(
            OctreeConfig::from_toml("max_depth = 99"),
            Err(OctreeError::InvalidConfig(_))
        ));
        assert!(matches!(
            OctreeConfig::from_toml("max_depth = \"deep\""),
            Err(OctreeError::ConfigParse(_))
        ));
    }
}
