// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Execution History
 * Append-only record of every check execution and its ticks
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ErrorCode;
use crate::types::Finding;

/// How one check execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Completed,
    Failed,
}

/// Terminal error of a failed execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionError {
    pub code: ErrorCode,
    pub message: String,
}

/// One interpreter tick: state before and after, findings emitted, and
/// whether the check continued or finished.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepExecutionRecord {
    pub step_name: String,
    pub state_before: Value,
    pub state_after: Value,
    pub findings: Vec<Finding>,
    pub result: StepResultKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StepResultKind {
    Done,
    Continue {
        #[serde(rename = "nextStep")]
        next_step: String,
    },
}

/// One check execution against one target, appended after the task
/// terminates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckExecutionRecord {
    pub check_id: String,
    #[serde(rename = "targetRequestID")]
    pub target_request_id: String,
    pub steps: Vec<StepExecutionRecord>,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_output: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ExecutionError>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CheckExecutionRecord {
    pub fn is_completed(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }

    /// All findings recorded across this execution's steps.
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.steps.iter().flat_map(|step| step.findings.iter())
    }
}

/// Append-only execution history; snapshots are cheap clones handed to
/// the observability surface.
#[derive(Debug, Default)]
pub struct ExecutionHistory {
    records: Vec<CheckExecutionRecord>,
}

impl ExecutionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, record: CheckExecutionRecord) {
        self.records.push(record);
    }

    pub fn snapshot(&self) -> Vec<CheckExecutionRecord> {
        self.records.clone()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records_for(&self, check_id: &str) -> Vec<&CheckExecutionRecord> {
        self.records
            .iter()
            .filter(|r| r.check_id == check_id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Severity;

    fn record(check_id: &str, status: ExecutionStatus) -> CheckExecutionRecord {
        CheckExecutionRecord {
            check_id: check_id.to_string(),
            target_request_id: "r1".to_string(),
            steps: vec![StepExecutionRecord {
                step_name: "scan".to_string(),
                state_before: Value::Null,
                state_after: Value::Null,
                findings: vec![Finding::new("f", "d", Severity::Low, "r1")],
                result: StepResultKind::Done,
            }],
            status,
            final_output: None,
            error: None,
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn snapshot_is_independent_of_later_appends() {
        let mut history = ExecutionHistory::new();
        history.append(record("a", ExecutionStatus::Completed));

        let snapshot = history.snapshot();
        history.append(record("b", ExecutionStatus::Failed));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(history.len(), 2);
    }

    #[test]
    fn records_for_filters_by_check() {
        let mut history = ExecutionHistory::new();
        history.append(record("a", ExecutionStatus::Completed));
        history.append(record("b", ExecutionStatus::Completed));
        history.append(record("a", ExecutionStatus::Failed));

        assert_eq!(history.records_for("a").len(), 2);
        assert_eq!(history.records_for("missing").len(), 0);
    }

    #[test]
    fn record_serializes_wire_names() {
        let json = serde_json::to_string(&record("a", ExecutionStatus::Completed)).unwrap();
        assert!(json.contains("\"checkId\":\"a\""));
        assert!(json.contains("\"targetRequestID\":\"r1\""));
        assert!(json.contains("\"status\":\"completed\""));
        assert!(json.contains("\"stateBefore\""));
    }
}
