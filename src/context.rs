// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Runtime Context
 * Per-target execution context handed to checks
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::check::CheckOutput;
use crate::host::{Exchange, HostRequest, HostResponse, HostSdk, RequestSpec};
use crate::html::HtmlCache;
use crate::request_queue::RequestQueue;
use crate::types::{ScanConfig, ScanTarget};

/// Outputs of completed dependency checks for one target, keyed by check
/// id. Written by the batch executor, read by dependent checks; no task
/// objects cross this boundary.
#[derive(Clone, Default)]
pub struct DependencyOutputs {
    outputs: Arc<RwLock<HashMap<String, CheckOutput>>>,
}

impl DependencyOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    /// The exact output the dependency produced during this scan, or
    /// `None` if it did not run (or produced none).
    pub fn get(&self, check_id: &str) -> Option<CheckOutput> {
        self.outputs.read().get(check_id).cloned()
    }

    pub(crate) fn insert(&self, check_id: &str, output: CheckOutput) {
        self.outputs.write().insert(check_id.to_string(), output);
    }
}

/// The capability adapter handed to checks in place of the raw host SDK.
/// Lookups pass through; `send` is routed through the throttled request
/// queue so check-issued traffic honors concurrency, spacing and
/// cancellation. Checks never see the host directly.
pub struct CheckSdk {
    host: Arc<dyn HostSdk>,
    queue: Arc<RequestQueue>,
    target_request_id: String,
    check_id: String,
}

impl CheckSdk {
    /// Look up a captured exchange by request id.
    pub async fn get(&self, request_id: &str) -> Option<ScanTarget> {
        self.host.request(request_id).await
    }

    /// Send a request through the scan's request queue.
    pub async fn send(&self, spec: RequestSpec) -> Result<Exchange> {
        let pending_request_id = Uuid::new_v4().to_string();
        self.queue
            .enqueue(
                spec,
                pending_request_id,
                self.target_request_id.clone(),
                self.check_id.clone(),
            )
            .await
    }

    pub fn in_scope(&self, request: &dyn HostRequest) -> bool {
        self.host.in_scope(request)
    }

    pub fn matches(
        &self,
        filter: &str,
        request: &dyn HostRequest,
        response: Option<&dyn HostResponse>,
    ) -> bool {
        self.host.matches(filter, request, response)
    }
}

/// Everything a check sees while executing: the target, scan config, the
/// wrapped SDK, the lazy HTML cache and dependency outputs.
pub struct RuntimeContext {
    pub target: ScanTarget,
    pub config: ScanConfig,
    pub sdk: CheckSdk,
    pub html: Arc<HtmlCache>,
    pub dependencies: DependencyOutputs,
}

/// Per-target assembly point. Built once when the target enters the
/// scan; stamped into a [`RuntimeContext`] per check so queued sends can
/// be attributed to their issuing check.
pub struct TargetContext {
    target: ScanTarget,
    config: ScanConfig,
    host: Arc<dyn HostSdk>,
    queue: Arc<RequestQueue>,
    html: Arc<HtmlCache>,
    dependencies: DependencyOutputs,
}

impl TargetContext {
    pub fn new(
        target: ScanTarget,
        config: ScanConfig,
        host: Arc<dyn HostSdk>,
        queue: Arc<RequestQueue>,
        html: Arc<HtmlCache>,
    ) -> Self {
        Self {
            target,
            config,
            host,
            queue,
            html,
            dependencies: DependencyOutputs::new(),
        }
    }

    pub fn target(&self) -> &ScanTarget {
        &self.target
    }

    pub fn dependencies(&self) -> &DependencyOutputs {
        &self.dependencies
    }

    pub fn for_check(&self, check_id: &str) -> Arc<RuntimeContext> {
        Arc::new(RuntimeContext {
            target: self.target.clone(),
            config: self.config.clone(),
            sdk: CheckSdk {
                host: Arc::clone(&self.host),
                queue: Arc::clone(&self.queue),
                target_request_id: self.target.request_id(),
                check_id: check_id.to_string(),
            },
            html: Arc::clone(&self.html),
            dependencies: self.dependencies.clone(),
        })
    }
}
