// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Task Interpreter
 * Drives a check's step machine to completion, tick by tick
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::check::{CheckOutput, CheckTask, TickStatus};
use crate::errors::{classify_check_error, CheckErrorKind, ErrorCode, ScanInterrupted};
use crate::events::{EventBus, ScanEvent};
use crate::history::{StepExecutionRecord, StepResultKind};
use crate::interrupt::InterruptSignal;
use crate::types::Finding;

/// How one driven task ended.
#[derive(Debug)]
pub enum TaskStatus {
    Completed { output: Option<CheckOutput> },
    Failed { code: ErrorCode, message: String },
}

/// Everything the batch executor needs to commit one execution: terminal
/// status, findings accumulated across ticks, and the per-tick records.
#[derive(Debug)]
pub struct TaskReport {
    pub check_id: String,
    pub target_request_id: String,
    pub status: TaskStatus,
    pub findings: Vec<Finding>,
    pub steps: Vec<StepExecutionRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl TaskReport {
    pub fn is_completed(&self) -> bool {
        matches!(self.status, TaskStatus::Completed { .. })
    }
}

/// Run the task until it finishes or fails. Check-level errors are caught
/// here and reported as failed; only `ScanInterrupted` escapes, unwinding
/// the batch. Each tick re-checks the interrupt flag before resuming, and
/// nothing is recorded for an aborted tick.
pub async fn drive(
    task: &mut CheckTask,
    interrupt: &InterruptSignal,
    events: &EventBus,
) -> Result<TaskReport, ScanInterrupted> {
    let check_id = task.check_id().to_string();
    let target_request_id = task.target().request_id();
    let started_at = Utc::now();

    let mut steps: Vec<StepExecutionRecord> = Vec::new();
    let mut findings: Vec<Finding> = Vec::new();

    loop {
        interrupt.check()?;

        let state_before = task.state().clone();
        let step_name = task.step_name().to_string();

        match task.tick().await {
            Ok(outcome) => {
                for finding in &outcome.findings {
                    events.emit(ScanEvent::Finding {
                        target_request_id: target_request_id.clone(),
                        check_id: check_id.clone(),
                        finding: finding.clone(),
                    });
                }

                let result = match outcome.status {
                    TickStatus::Done => StepResultKind::Done,
                    TickStatus::Continue => StepResultKind::Continue {
                        // a continue always names its successor
                        next_step: outcome.next_step.clone().unwrap_or_default(),
                    },
                };
                steps.push(StepExecutionRecord {
                    step_name,
                    state_before,
                    state_after: task.state().clone(),
                    findings: outcome.findings.clone(),
                    result,
                });
                findings.extend(outcome.findings);

                if outcome.status == TickStatus::Done {
                    return Ok(TaskReport {
                        check_id,
                        target_request_id,
                        status: TaskStatus::Completed {
                            output: task.take_output(),
                        },
                        findings,
                        steps,
                        started_at,
                        finished_at: Utc::now(),
                    });
                }
            }
            Err(err) => match classify_check_error(err) {
                CheckErrorKind::Interrupted(interrupted) => return Err(interrupted),
                CheckErrorKind::Failed { code, message } => {
                    debug!("check {} failed on {}: {} ({})", check_id, target_request_id, message, code);
                    return Ok(TaskReport {
                        check_id,
                        target_request_id,
                        status: TaskStatus::Failed { code, message },
                        findings,
                        steps,
                        started_at,
                        finished_at: Utc::now(),
                    });
                }
            },
        }
    }
}
