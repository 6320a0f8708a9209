// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Runner
 * Top-level orchestration: targets, batches, cancellation, history
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, error, info};

use crate::context::TargetContext;
use crate::dedupe::DedupeIndex;
use crate::errors::{EngineError, PlanError, ScanInterrupted};
use crate::events::{EventBus, ScanEvent};
use crate::executor::{run_batch, select_check, BatchContext, FindingsMap};
use crate::history::{CheckExecutionRecord, ExecutionHistory};
use crate::host::HostSdk;
use crate::html::HtmlCache;
use crate::interrupt::InterruptSignal;
use crate::registry::{CheckRegistry, ScanPlan};
use crate::request_queue::RequestQueue;
use crate::types::{Finding, InterruptReason, ScanConfig, ScanEstimate, ScanOutcome};

/// Lifecycle of one runner. Runners are single-shot: a finished,
/// interrupted or errored runner never runs again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Running,
    Finished,
    Interrupted,
    Errored,
}

/// Orchestrates one scan over a set of captured targets: builds per-target
/// contexts, walks the dependency-ordered plan, owns the dedupe index,
/// findings, dependency outputs, HTML cache and execution history, and
/// drives cooperative cancellation through every level.
pub struct ScanRunner {
    plan: ScanPlan,
    config: ScanConfig,
    host: Arc<dyn HostSdk>,
    events: EventBus,
    interrupt: Arc<InterruptSignal>,
    state: Mutex<RunnerState>,
    dedupe: DedupeIndex,
    findings: Mutex<FindingsMap>,
    history: Mutex<ExecutionHistory>,
    html: Arc<HtmlCache>,
}

impl ScanRunner {
    /// Plan the registered checks and build an idle runner. Plan-time
    /// validation failures abort construction.
    pub fn new(
        registry: CheckRegistry,
        config: ScanConfig,
        host: Arc<dyn HostSdk>,
    ) -> Result<Self, PlanError> {
        let plan = registry.plan()?;
        info!(
            "scan plan ready: {} checks in {} batches",
            plan.total_checks(),
            plan.batches().len()
        );
        Ok(Self {
            plan,
            config,
            host: Arc::clone(&host),
            events: EventBus::new(),
            interrupt: Arc::new(InterruptSignal::new()),
            state: Mutex::new(RunnerState::Idle),
            dedupe: DedupeIndex::new(),
            findings: Mutex::new(HashMap::new()),
            history: Mutex::new(ExecutionHistory::new()),
            html: Arc::new(HtmlCache::new(host)),
        })
    }

    pub fn state(&self) -> RunnerState {
        *self.state.lock()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ScanEvent> {
        self.events.subscribe()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Immutable snapshot of everything executed so far.
    pub fn execution_history(&self) -> Vec<CheckExecutionRecord> {
        self.history.lock().snapshot()
    }

    /// Pre-seed the dedupe index, e.g. to merge with a prior scan. Only
    /// valid while idle.
    pub fn external_dedupe_keys(
        &self,
        entries: HashMap<String, HashSet<String>>,
    ) -> Result<(), EngineError> {
        let state = self.state.lock();
        if *state != RunnerState::Idle {
            return Err(EngineError::already_running());
        }
        self.dedupe.seed(entries);
        Ok(())
    }

    /// Count applicable checks per target without executing anything.
    /// Runs against a snapshot of the dedupe index, so estimation never
    /// pollutes the live scan. `skip_if_found_by` cannot be evaluated
    /// before any findings exist and is counted as applicable.
    pub async fn estimate(&self, request_ids: &[String]) -> ScanEstimate {
        let dedupe = self.dedupe.snapshot();
        let mut estimate = ScanEstimate::default();

        for request_id in request_ids {
            let Some(target) = self.host.request(request_id).await else {
                debug!("estimate: target {} not resolvable, skipping", request_id);
                continue;
            };
            if self.config.in_scope_only && !self.host.in_scope(target.request.as_ref()) {
                continue;
            }

            let mut count = 0usize;
            for batch in self.plan.batches() {
                for check in batch {
                    if select_check(check, &target, &self.config, &dedupe) {
                        count += 1;
                    }
                }
            }
            estimate.per_target.insert(request_id.clone(), count);
            estimate.checks_total += count;
        }

        estimate
    }

    /// Execute the scan. Single-shot: any later invocation reports an
    /// error outcome. Emits `scan:started` first and `scan:finished`
    /// last, whatever the outcome.
    pub async fn run(&self, request_ids: Vec<String>) -> ScanOutcome {
        {
            let mut state = self.state.lock();
            if *state != RunnerState::Idle {
                return ScanOutcome::Error {
                    error: "scan already running".to_string(),
                };
            }
            *state = RunnerState::Running;
        }

        info!("scan started over {} targets", request_ids.len());
        self.events.emit(ScanEvent::Started);

        let queue = RequestQueue::new(
            Arc::clone(&self.host),
            &self.config,
            self.events.clone(),
            Arc::clone(&self.interrupt),
        );

        let scan = self.scan_targets(request_ids, queue);
        tokio::pin!(scan);

        // the scan clock starts here; 0 disables the race entirely
        let result: Result<()> = if self.config.scan_timeout > 0 {
            tokio::select! {
                res = &mut scan => res,
                _ = tokio::time::sleep(Duration::from_secs(self.config.scan_timeout)) => {
                    self.interrupt.trigger(InterruptReason::Timeout);
                    Err(ScanInterrupted::new(InterruptReason::Timeout).into())
                }
            }
        } else {
            scan.await
        };

        let outcome = match result {
            Ok(()) => {
                *self.state.lock() = RunnerState::Finished;
                info!("scan finished");
                ScanOutcome::Finished {
                    findings: self.collect_findings(),
                }
            }
            Err(err) => match err.downcast::<ScanInterrupted>() {
                Ok(interrupted) => {
                    *self.state.lock() = RunnerState::Interrupted;
                    info!("scan interrupted: {}", interrupted.reason);
                    self.events.emit(ScanEvent::Interrupted {
                        reason: interrupted.reason,
                    });
                    ScanOutcome::Interrupted {
                        reason: interrupted.reason,
                        findings: self.collect_findings(),
                    }
                }
                Err(other) => {
                    *self.state.lock() = RunnerState::Errored;
                    error!("scan failed: {}", other);
                    ScanOutcome::Error {
                        error: other.to_string(),
                    }
                }
            },
        };

        self.events.emit(ScanEvent::Finished);
        outcome
    }

    /// Request cancellation and wait for the scan to acknowledge it.
    /// Idempotent; a runner that never started (or already stopped) is
    /// left untouched.
    pub async fn cancel(&self, reason: InterruptReason) {
        let mut rx = self.events.subscribe();
        {
            let state = self.state.lock();
            if *state != RunnerState::Running {
                return;
            }
        }

        self.interrupt.trigger(reason);

        loop {
            match rx.recv().await {
                Ok(ScanEvent::Interrupted { .. }) | Ok(ScanEvent::Finished) => return,
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }

    async fn scan_targets(&self, request_ids: Vec<String>, queue: Arc<RequestQueue>) -> Result<()> {
        let concurrency = self.config.concurrent_targets.max(1);

        let mut pool = stream::iter(request_ids.into_iter().map(|request_id| {
            let queue = Arc::clone(&queue);
            async move { self.scan_target(request_id, queue).await }
        }))
        .buffer_unordered(concurrency);

        let mut interrupted: Option<ScanInterrupted> = None;
        let mut first_error: Option<anyhow::Error> = None;

        while let Some(result) = pool.next().await {
            match result {
                Ok(()) => {}
                Err(err) => match err.downcast::<ScanInterrupted>() {
                    Ok(i) => {
                        if interrupted.is_none() {
                            interrupted = Some(i);
                        }
                    }
                    Err(other) => {
                        if first_error.is_none() {
                            first_error = Some(other);
                        }
                    }
                },
            }
        }
        drop(pool);

        if let Some(interrupted) = interrupted {
            return Err(interrupted.into());
        }
        if let Some(err) = first_error {
            return Err(err);
        }
        Ok(())
    }

    async fn scan_target(&self, request_id: String, queue: Arc<RequestQueue>) -> Result<()> {
        self.interrupt.check()?;

        let target = self
            .host
            .request(&request_id)
            .await
            .ok_or_else(|| EngineError::request_not_found(&request_id))?;

        if self.config.in_scope_only && !self.host.in_scope(target.request.as_ref()) {
            debug!("target {} out of scope, skipping", request_id);
            return Ok(());
        }

        let target_ctx = TargetContext::new(
            target,
            self.config.clone(),
            Arc::clone(&self.host),
            queue,
            Arc::clone(&self.html),
        );
        let shared = BatchContext {
            config: &self.config,
            interrupt: self.interrupt.as_ref(),
            events: &self.events,
            dedupe: &self.dedupe,
            findings: &self.findings,
            history: &self.history,
        };

        for batch in self.plan.batches() {
            self.interrupt.check()?;
            run_batch(batch, &target_ctx, &shared).await?;
        }

        debug!("target {} done", request_id);
        Ok(())
    }

    /// Findings in plan order, concatenating each check's list.
    fn collect_findings(&self) -> Vec<Finding> {
        let findings = self.findings.lock();
        let mut all = Vec::new();
        for batch in self.plan.batches() {
            for check in batch {
                if let Some(list) = findings.get(check.id()) {
                    all.extend(list.iter().cloned());
                }
            }
        }
        all
    }
}
