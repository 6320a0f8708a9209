// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Engine Library
 * Scan runner for captured HTTP traffic
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */
pub mod check;
pub mod context;
pub mod dedupe;
pub mod errors;
pub mod events;
pub mod history;
pub mod host;
pub mod html;
pub mod interrupt;
pub mod types;

// Execution pipeline
pub mod executor;
pub mod interpreter;
pub mod request_queue;
pub mod runner;

// Registry and planning
pub mod registry;

// Built-in check catalog
pub mod checks;

pub use check::{CheckBuilder, CheckDefinition, CheckMetadata, CheckType, StepAction};
pub use errors::{EngineError, ErrorCode, PlanError, ScanInterrupted};
pub use events::{EventBus, EventCollector, ScanEvent};
pub use host::{Exchange, HostRequest, HostResponse, HostSdk, RequestSpec};
pub use registry::{CheckRegistry, ScanPlan};
pub use runner::{RunnerState, ScanRunner};
pub use types::{
    Aggressivity, Finding, InterruptReason, ScanConfig, ScanEstimate, ScanOutcome, ScanTarget,
    Severity,
};
