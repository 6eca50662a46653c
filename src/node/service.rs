//! Node Service
//!
//! The RPC-shaped entry points of the plugin. Each handler delegates to its
//! reconciler or to the identity responder and records metrics; handlers
//! share no mutable state, so concurrent calls on the same path rely only on
//! the probe-before-act behaviour of the reconcilers.

use super::{PublishReconciler, StageReconciler, TeardownReconciler};
use crate::domain::ports::{
    AttributeResolverRef, EmptyResponse, ExpandVolumeRequest, MounterRef, PublishVolumeRequest,
    StageVolumeRequest, UnpublishVolumeRequest, UnstageVolumeRequest, VolumeStatsRequest,
};
use crate::driver::{
    ControllerCapabilitiesResponse, DriverConfig, ExpandVolumeResponse, IdentityResponder, NodeCapabilitiesResponse,
    NodeInfoResponse, PluginCapabilitiesResponse, PluginInfoResponse, ProbeResponse,
    VolumeStatsResponse,
};
use crate::error::Result;
use crate::metrics::NodeMetrics;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Node service backing the RPC surface
pub struct NodeService {
    identity: IdentityResponder,
    stage: StageReconciler,
    publish: PublishReconciler,
    teardown: TeardownReconciler,
    metrics: NodeMetrics,
}

impl NodeService {
    /// Create a new node service
    pub fn new(
        config: Arc<DriverConfig>,
        mounter: MounterRef,
        resolver: AttributeResolverRef,
        metrics: NodeMetrics,
    ) -> Arc<Self> {
        if config.node_id.is_empty() {
            warn!("Node ID is empty");
        }

        Arc::new(Self {
            identity: IdentityResponder::new(config),
            stage: StageReconciler::new(mounter.clone(), resolver),
            publish: PublishReconciler::new(mounter.clone()),
            teardown: TeardownReconciler::new(mounter),
            metrics,
        })
    }

    pub fn metrics(&self) -> &NodeMetrics {
        &self.metrics
    }

    // =========================================================================
    // Identity
    // =========================================================================

    pub fn get_plugin_info(&self) -> PluginInfoResponse {
        self.identity.plugin_info()
    }

    pub fn get_plugin_capabilities(&self) -> PluginCapabilitiesResponse {
        self.identity.plugin_capabilities()
    }

    pub fn probe(&self) -> ProbeResponse {
        self.identity.probe()
    }

    pub fn controller_get_capabilities(&self) -> ControllerCapabilitiesResponse {
        self.identity.controller_capabilities()
    }

    // =========================================================================
    // Node
    // =========================================================================

    pub async fn node_stage_volume(&self, req: StageVolumeRequest) -> Result<EmptyResponse> {
        debug!(request = ?req, "NodeStageVolume called");
        let started = Instant::now();
        let result = self.stage.reconcile(&req).await.map(|_| EmptyResponse {});
        self.metrics.observe("node_stage_volume", started, &result);
        result
    }

    pub async fn node_unstage_volume(&self, req: UnstageVolumeRequest) -> Result<EmptyResponse> {
        debug!(request = ?req, "NodeUnstageVolume called");
        let started = Instant::now();
        let result = self.teardown.unstage(&req).await.map(|_| EmptyResponse {});
        self.metrics.observe("node_unstage_volume", started, &result);
        result
    }

    pub async fn node_publish_volume(&self, req: PublishVolumeRequest) -> Result<EmptyResponse> {
        debug!(request = ?req, "NodePublishVolume called");
        let started = Instant::now();
        let result = self.publish.reconcile(&req).await.map(|_| EmptyResponse {});
        self.metrics.observe("node_publish_volume", started, &result);
        result
    }

    pub async fn node_unpublish_volume(
        &self,
        req: UnpublishVolumeRequest,
    ) -> Result<EmptyResponse> {
        debug!(request = ?req, "NodeUnpublishVolume called");
        let started = Instant::now();
        let result = self.teardown.unpublish(&req).await.map(|_| EmptyResponse {});
        self.metrics.observe("node_unpublish_volume", started, &result);
        result
    }

    pub fn node_get_capabilities(&self) -> NodeCapabilitiesResponse {
        self.identity.node_capabilities()
    }

    pub fn node_get_info(&self) -> NodeInfoResponse {
        self.identity.node_info()
    }

    pub fn node_get_volume_stats(&self, req: VolumeStatsRequest) -> Result<VolumeStatsResponse> {
        self.identity.volume_stats(&req)
    }

    pub fn node_expand_volume(&self, req: ExpandVolumeRequest) -> Result<ExpandVolumeResponse> {
        self.identity.expand_volume(&req)
    }
}
