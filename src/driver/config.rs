//! Driver Configuration
//!
//! Built once at startup, shared as `Arc<DriverConfig>` and never mutated.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default CSI driver name
pub const DEFAULT_DRIVER_NAME: &str = "goofys.csi.azure.com";

// =============================================================================
// Capabilities
// =============================================================================

/// Capabilities of the node service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeServiceCapability {
    StageUnstageVolume,
    GetVolumeStats,
    ExpandVolume,
}

/// Capabilities of the controller service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControllerServiceCapability {
    CreateDeleteVolume,
    PublishUnpublishVolume,
    ListVolumes,
    GetCapacity,
}

/// Capabilities of the plugin as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PluginCapability {
    ControllerService,
    VolumeAccessibilityConstraints,
}

// =============================================================================
// Driver Configuration
// =============================================================================

/// Static driver configuration
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// CSI driver name
    pub driver_name: String,
    /// Driver version reported to the orchestrator
    pub vendor_version: String,
    /// Identifier of this node
    pub node_id: String,
    /// Supported node capabilities
    pub node_capabilities: Vec<NodeServiceCapability>,
    /// Supported controller capabilities
    pub controller_capabilities: Vec<ControllerServiceCapability>,
    /// Supported plugin capabilities
    pub plugin_capabilities: Vec<PluginCapability>,
}

impl DriverConfig {
    /// Configuration for a node plugin with default capabilities
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            driver_name: DEFAULT_DRIVER_NAME.to_string(),
            vendor_version: crate::VERSION.to_string(),
            node_id: node_id.into(),
            node_capabilities: vec![NodeServiceCapability::StageUnstageVolume],
            controller_capabilities: Vec::new(),
            plugin_capabilities: vec![PluginCapability::ControllerService],
        }
    }

    /// Override the driver name
    pub fn with_driver_name(mut self, driver_name: impl Into<String>) -> Self {
        self.driver_name = driver_name.into();
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<()> {
        if self.driver_name.is_empty() {
            return Err(Error::Configuration("driver name must not be empty".into()));
        }
        if self.vendor_version.is_empty() {
            return Err(Error::Configuration("vendor version must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DriverConfig::new("node-1");
        assert_eq!(config.driver_name, DEFAULT_DRIVER_NAME);
        assert_eq!(config.node_id, "node-1");
        assert_eq!(
            config.node_capabilities,
            vec![NodeServiceCapability::StageUnstageVolume]
        );
        assert!(config.controller_capabilities.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_driver_name_is_rejected() {
        let config = DriverConfig::new("node-1").with_driver_name("");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_capability_serialization() {
        let json = serde_json::to_string(&NodeServiceCapability::StageUnstageVolume).unwrap();
        assert_eq!(json, "\"STAGE_UNSTAGE_VOLUME\"");
    }
}
