// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Batch Executor
 * Filters a batch down to applicable checks and runs them concurrently
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use parking_lot::Mutex;
use tracing::debug;

use crate::check::CheckDefinition;
use crate::context::TargetContext;
use crate::dedupe::DedupeIndex;
use crate::errors::{EngineError, ScanInterrupted, ScanRuntimeError};
use crate::events::{EventBus, ScanEvent};
use crate::history::{CheckExecutionRecord, ExecutionError, ExecutionHistory, ExecutionStatus};
use crate::interpreter::{drive, TaskReport, TaskStatus};
use crate::interrupt::InterruptSignal;
use crate::types::{Finding, ScanConfig, ScanTarget};

pub type FindingsMap = HashMap<String, Vec<Finding>>;

/// Runner-owned state a batch mutates while it drains. All mutations stay
/// inside executor-controlled code paths; locks are never held across an
/// await.
pub struct BatchContext<'a> {
    pub config: &'a ScanConfig,
    pub interrupt: &'a InterruptSignal,
    pub events: &'a EventBus,
    pub dedupe: &'a DedupeIndex,
    pub findings: &'a Mutex<FindingsMap>,
    pub history: &'a Mutex<ExecutionHistory>,
}

/// Decide whether one check runs against one target. Claims the dedupe
/// key as a side effect when the check defines one; callers must iterate
/// checks in registration order so the first claimant wins
/// deterministically.
pub fn select_check(
    check: &CheckDefinition,
    target: &ScanTarget,
    config: &ScanConfig,
    dedupe: &DedupeIndex,
) -> bool {
    if !config.severity_enabled(&check.metadata.severities) {
        return false;
    }
    if let Some(min) = check.metadata.min_aggressivity {
        if min > config.aggressivity {
            return false;
        }
    }
    if !check.applies_to(target) {
        return false;
    }
    if let Some(key) = check.dedupe_key_for(target) {
        if !dedupe.should_run(check.id(), &key) {
            debug!(
                "check {} already claimed key for {}",
                check.id(),
                target.request_id()
            );
            return false;
        }
    }
    true
}

/// Run one batch against one target. Check failures never abort the
/// batch; `ScanInterrupted` stops the pool and propagates; anything else
/// uncaught is aggregated into a `ScanRuntimeError` once the batch has
/// drained.
pub async fn run_batch(
    batch: &[Arc<CheckDefinition>],
    target_ctx: &TargetContext,
    shared: &BatchContext<'_>,
) -> Result<()> {
    let mut selected: Vec<Arc<CheckDefinition>> = Vec::new();
    for check in batch {
        if !select_check(check, target_ctx.target(), shared.config, shared.dedupe) {
            continue;
        }
        if let Some(found_by) = &check.metadata.skip_if_found_by {
            let already_found = shared
                .findings
                .lock()
                .get(found_by)
                .is_some_and(|findings| !findings.is_empty());
            if already_found {
                debug!(
                    "check {} skipped: {} already has findings",
                    check.id(),
                    found_by
                );
                continue;
            }
        }
        selected.push(Arc::clone(check));
    }

    if selected.is_empty() {
        return Ok(());
    }

    let concurrency = shared.config.concurrent_checks.max(1);
    let timeout_secs = shared.config.check_timeout;

    let mut pool = stream::iter(selected.into_iter().map(|check| {
        let ctx = target_ctx.for_check(check.id());
        let events = shared.events.clone();
        let interrupt = shared.interrupt;
        async move {
            // once the interrupt reason is set no new check starts
            interrupt.check()?;

            let check_id = check.id().to_string();
            let target_request_id = ctx.target.request_id();
            events.emit(ScanEvent::CheckStarted {
                check_id: check_id.clone(),
                target_request_id: target_request_id.clone(),
            });

            let mut task = check.create(ctx);
            let report = if timeout_secs > 0 {
                match tokio::time::timeout(
                    Duration::from_secs(timeout_secs),
                    drive(&mut task, interrupt, &events),
                )
                .await
                {
                    Ok(driven) => driven?,
                    Err(_) => timeout_report(&check_id, &target_request_id, timeout_secs),
                }
            } else {
                drive(&mut task, interrupt, &events).await?
            };

            if let TaskStatus::Failed { code, message } = &report.status {
                events.emit(ScanEvent::CheckFailed {
                    check_id: check_id.clone(),
                    target_request_id: target_request_id.clone(),
                    error_code: *code,
                    error_message: message.clone(),
                });
            }
            events.emit(ScanEvent::CheckFinished {
                check_id,
                target_request_id,
            });

            Ok::<TaskReport, anyhow::Error>(report)
        }
    }))
    .buffer_unordered(concurrency);

    let mut interrupted: Option<ScanInterrupted> = None;
    let mut stray_errors: Vec<String> = Vec::new();

    while let Some(result) = pool.next().await {
        match result {
            Ok(report) => commit(report, target_ctx, shared),
            Err(err) => match err.downcast::<ScanInterrupted>() {
                Ok(i) => {
                    if interrupted.is_none() {
                        interrupted = Some(i);
                    }
                }
                Err(other) => stray_errors.push(other.to_string()),
            },
        }
    }
    drop(pool);

    if let Some(interrupted) = interrupted {
        return Err(interrupted.into());
    }
    if !stray_errors.is_empty() {
        return Err(ScanRuntimeError {
            errors: stray_errors,
        }
        .into());
    }
    Ok(())
}

fn timeout_report(check_id: &str, target_request_id: &str, timeout_secs: u64) -> TaskReport {
    let failure = EngineError::check_timeout(check_id, timeout_secs);
    let now = Utc::now();
    TaskReport {
        check_id: check_id.to_string(),
        target_request_id: target_request_id.to_string(),
        status: TaskStatus::Failed {
            code: failure.code,
            message: failure.message,
        },
        findings: Vec::new(),
        steps: Vec::new(),
        started_at: now,
        finished_at: now,
    }
}

fn commit(report: TaskReport, target_ctx: &TargetContext, shared: &BatchContext<'_>) {
    let record = match report.status {
        TaskStatus::Completed { output } => {
            if !report.findings.is_empty() {
                shared
                    .findings
                    .lock()
                    .entry(report.check_id.clone())
                    .or_default()
                    .extend(report.findings.clone());
            }
            if let Some(output) = output.clone() {
                target_ctx.dependencies().insert(&report.check_id, output);
            }
            CheckExecutionRecord {
                check_id: report.check_id,
                target_request_id: report.target_request_id,
                steps: report.steps,
                status: ExecutionStatus::Completed,
                final_output: output,
                error: None,
                started_at: report.started_at,
                finished_at: report.finished_at,
            }
        }
        TaskStatus::Failed { code, message } => CheckExecutionRecord {
            check_id: report.check_id,
            target_request_id: report.target_request_id,
            steps: report.steps,
            status: ExecutionStatus::Failed,
            final_output: None,
            error: Some(ExecutionError { code, message }),
            started_at: report.started_at,
            finished_at: report.finished_at,
        },
    };
    shared.history.lock().append(record);
}
