//! Identity and Capability Responder
//!
//! Answers identity and capability queries from the static
//! [`DriverConfig`]. Volume statistics and expansion are not supported and
//! always answer [`Error::Unimplemented`].

use super::config::{
    ControllerServiceCapability, DriverConfig, NodeServiceCapability, PluginCapability,
};
use crate::domain::ports::{ExpandVolumeRequest, VolumeStatsRequest};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfoResponse {
    pub name: String,
    pub vendor_version: String,
    pub manifest: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResponse {
    pub ready: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginCapabilitiesResponse {
    pub capabilities: Vec<PluginCapability>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCapabilitiesResponse {
    pub capabilities: Vec<NodeServiceCapability>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerCapabilitiesResponse {
    pub capabilities: Vec<ControllerServiceCapability>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfoResponse {
    pub node_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStatsResponse {
    pub available_bytes: u64,
    pub total_bytes: u64,
    pub used_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpandVolumeResponse {
    pub capacity_bytes: u64,
}

// =============================================================================
// Responder
// =============================================================================

/// Identity and capability responder
#[derive(Debug, Clone)]
pub struct IdentityResponder {
    config: Arc<DriverConfig>,
}

impl IdentityResponder {
    pub fn new(config: Arc<DriverConfig>) -> Self {
        Self { config }
    }

    pub fn plugin_info(&self) -> PluginInfoResponse {
        PluginInfoResponse {
            name: self.config.driver_name.clone(),
            vendor_version: self.config.vendor_version.clone(),
            manifest: BTreeMap::new(),
        }
    }

    pub fn probe(&self) -> ProbeResponse {
        ProbeResponse { ready: true }
    }

    pub fn plugin_capabilities(&self) -> PluginCapabilitiesResponse {
        PluginCapabilitiesResponse {
            capabilities: self.config.plugin_capabilities.clone(),
        }
    }

    pub fn node_capabilities(&self) -> NodeCapabilitiesResponse {
        debug!("Using default NodeGetCapabilities");
        NodeCapabilitiesResponse {
            capabilities: self.config.node_capabilities.clone(),
        }
    }

    pub fn controller_capabilities(&self) -> ControllerCapabilitiesResponse {
        ControllerCapabilitiesResponse {
            capabilities: self.config.controller_capabilities.clone(),
        }
    }

    pub fn node_info(&self) -> NodeInfoResponse {
        debug!("Using default NodeGetInfo");
        NodeInfoResponse {
            node_id: self.config.node_id.clone(),
        }
    }

    pub fn volume_stats(&self, _req: &VolumeStatsRequest) -> Result<VolumeStatsResponse> {
        Err(Error::Unimplemented("NodeGetVolumeStats".into()))
    }

    pub fn expand_volume(&self, _req: &ExpandVolumeRequest) -> Result<ExpandVolumeResponse> {
        Err(Error::Unimplemented("NodeExpandVolume".into()))
    }
}
