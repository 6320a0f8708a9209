// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Engine Core Types
 * Severities, findings, targets, scan configuration and outcomes
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::host::{HostRequest, HostResponse};

/// Severity of a finding, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn all() -> Vec<Severity> {
        vec![
            Severity::Info,
            Severity::Low,
            Severity::Medium,
            Severity::High,
            Severity::Critical,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggressivity tier for active testing. Checks declare the minimum tier
/// they need; the configured tier gates them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Aggressivity {
    #[default]
    Low,
    Medium,
    High,
}

impl Aggressivity {
    pub fn tier(&self) -> u8 {
        match self {
            Aggressivity::Low => 1,
            Aggressivity::Medium => 2,
            Aggressivity::High => 3,
        }
    }
}

impl std::fmt::Display for Aggressivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Aggressivity::Low => write!(f, "low"),
            Aggressivity::Medium => write!(f, "medium"),
            Aggressivity::High => write!(f, "high"),
        }
    }
}

/// Request budget an active check declares for one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggressivityBounds {
    pub min_requests: u32,
    pub max_requests: u32,
}

/// A byte range inside the correlated request or response, with an
/// optional display hint for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingLocation {
    pub start: usize,
    pub end: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Ties a finding back to the host request it was observed on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindingCorrelation {
    #[serde(rename = "requestID")]
    pub request_id: String,
    pub locations: Vec<FindingLocation>,
}

/// A single security observation attributed to one check and one target.
/// Findings are never mutated after emission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub name: String,
    pub description: String,
    pub severity: Severity,
    pub correlation: FindingCorrelation,
}

impl Finding {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
        request_id: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            severity,
            correlation: FindingCorrelation {
                request_id: request_id.into(),
                locations: Vec::new(),
            },
        }
    }

    pub fn with_location(mut self, start: usize, end: usize, hint: Option<&str>) -> Self {
        self.correlation.locations.push(FindingLocation {
            start,
            end,
            hint: hint.map(String::from),
        });
        self
    }
}

/// A captured HTTP exchange selected for scanning. The request is always
/// present; passive checks usually also need the response.
#[derive(Clone)]
pub struct ScanTarget {
    pub request: Arc<dyn HostRequest>,
    pub response: Option<Arc<dyn HostResponse>>,
}

impl ScanTarget {
    pub fn request_id(&self) -> String {
        self.request.id()
    }
}

impl std::fmt::Debug for ScanTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScanTarget")
            .field("request", &self.request.id())
            .field("response", &self.response.as_ref().map(|r| r.id()))
            .finish()
    }
}

/// Why a scan stopped before finishing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterruptReason {
    Cancelled,
    Timeout,
}

impl std::fmt::Display for InterruptReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InterruptReason::Cancelled => write!(f, "Cancelled"),
            InterruptReason::Timeout => write!(f, "Timeout"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanConfig {
    /// Tier gating active checks via their `min_aggressivity`.
    #[serde(default)]
    pub aggressivity: Aggressivity,

    /// Checks whose severity set is disjoint from this list never run.
    #[serde(default = "default_severities")]
    pub severities: Vec<Severity>,

    /// Skip targets the host considers out of scope.
    #[serde(default = "default_true")]
    pub in_scope_only: bool,

    #[serde(default = "default_concurrent_targets")]
    pub concurrent_targets: usize,

    #[serde(default = "default_concurrent_checks")]
    pub concurrent_checks: usize,

    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Spacing between check-issued sends, in milliseconds.
    #[serde(default)]
    pub requests_delay_ms: u64,

    /// Whole-scan timeout in seconds; 0 disables.
    #[serde(default)]
    pub scan_timeout: u64,

    /// Per-check timeout in seconds; 0 disables.
    #[serde(default = "default_check_timeout")]
    pub check_timeout: u64,
}

fn default_severities() -> Vec<Severity> {
    Severity::all()
}

fn default_true() -> bool {
    true
}

fn default_concurrent_targets() -> usize {
    3
}

fn default_concurrent_checks() -> usize {
    5
}

fn default_concurrent_requests() -> usize {
    2
}

fn default_check_timeout() -> u64 {
    60
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            aggressivity: Aggressivity::Low,
            severities: Severity::all(),
            in_scope_only: true,
            concurrent_targets: 3,
            concurrent_checks: 5,
            concurrent_requests: 2,
            requests_delay_ms: 0,
            scan_timeout: 0,
            check_timeout: 60,
        }
    }
}

impl ScanConfig {
    /// True when at least one of the check's severities is enabled.
    pub fn severity_enabled(&self, severities: &[Severity]) -> bool {
        severities.iter().any(|s| self.severities.contains(s))
    }
}

/// Result of a completed, interrupted, or failed scan.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind")]
pub enum ScanOutcome {
    Finished {
        findings: Vec<Finding>,
    },
    Interrupted {
        reason: InterruptReason,
        findings: Vec<Finding>,
    },
    Error {
        error: String,
    },
}

impl ScanOutcome {
    pub fn findings(&self) -> &[Finding] {
        match self {
            ScanOutcome::Finished { findings } => findings,
            ScanOutcome::Interrupted { findings, .. } => findings,
            ScanOutcome::Error { .. } => &[],
        }
    }
}

/// Applicable-check counts computed without executing anything; the UI
/// sizes progress bars from this.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEstimate {
    pub checks_total: usize,
    /// Per-target breakdown keyed by request id.
    pub per_target: HashMap<String, usize>,
}
