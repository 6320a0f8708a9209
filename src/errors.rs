// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Scan Engine Error Types
 * Stable error codes surfaced in events and execution history
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::InterruptReason;

/// Stable error codes. The string form is what events and history records
/// carry; variants never change meaning between releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// A target request, its response, or a body could not be obtained
    /// from the host.
    RequestNotFound,
    /// A check declared a dependency on an unregistered check id.
    UnknownDependency,
    /// The dependency graph contains a cycle.
    CyclicDependencies,
    /// A check exceeded the configured per-check timeout.
    CheckTimeout,
    /// Check code failed with an error the engine cannot classify.
    UnknownCheckError,
    /// A mutator was called while a scan was running or after it finished.
    ScanAlreadyRunning,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::RequestNotFound => "REQUEST_NOT_FOUND",
            ErrorCode::UnknownDependency => "UNKNOWN_DEPENDENCY",
            ErrorCode::CyclicDependencies => "CYCLIC_DEPENDENCIES",
            ErrorCode::CheckTimeout => "CHECK_TIMEOUT",
            ErrorCode::UnknownCheckError => "UNKNOWN_CHECK_ERROR",
            ErrorCode::ScanAlreadyRunning => "SCAN_ALREADY_RUNNING",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A coded failure. Raised by engine plumbing (host lookups, timeouts) and
/// by check code that wants a specific code in its `failed` record; any
/// other error coming out of a check is classified as
/// `UNKNOWN_CHECK_ERROR` by the task interpreter.
#[derive(Error, Debug, Clone)]
#[error("{code}: {message}")]
pub struct EngineError {
    pub code: ErrorCode,
    pub message: String,
}

impl EngineError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn request_not_found(request_id: &str) -> Self {
        Self::new(
            ErrorCode::RequestNotFound,
            format!("request `{}` could not be resolved by the host", request_id),
        )
    }

    pub fn check_timeout(check_id: &str, timeout_secs: u64) -> Self {
        Self::new(
            ErrorCode::CheckTimeout,
            format!("check `{}` exceeded {}s timeout", check_id, timeout_secs),
        )
    }

    pub fn already_running() -> Self {
        Self::new(ErrorCode::ScanAlreadyRunning, "scan already running")
    }
}

/// Plan-time validation failures. These abort scan construction before any
/// target is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("unknown dependency `{dependency}` declared by check `{check}`")]
    UnknownDependency { check: String, dependency: String },

    #[error("cyclic dependencies among checks: {}", remaining.join(", "))]
    CyclicDependencies { remaining: Vec<String> },
}

impl PlanError {
    pub fn code(&self) -> ErrorCode {
        match self {
            PlanError::UnknownDependency { .. } => ErrorCode::UnknownDependency,
            PlanError::CyclicDependencies { .. } => ErrorCode::CyclicDependencies,
        }
    }
}

/// Raised at suspension points once the interrupt reason is set. Unwinds
/// every level of the runner and produces the `Interrupted` outcome;
/// findings accumulated so far are preserved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("scan interrupted: {reason}")]
pub struct ScanInterrupted {
    pub reason: InterruptReason,
}

impl ScanInterrupted {
    pub fn new(reason: InterruptReason) -> Self {
        Self { reason }
    }
}

/// Aggregate of uncategorizable errors that surfaced while a batch
/// drained. The batch executor collects these instead of aborting
/// mid-batch, then raises them together.
#[derive(Error, Debug)]
#[error("scan runtime error: {}", errors.join("; "))]
pub struct ScanRuntimeError {
    pub errors: Vec<String>,
}

/// Classification of an `anyhow::Error` escaping check code, per the
/// propagation rules: interrupts unwind, coded failures keep their code,
/// everything else becomes `UNKNOWN_CHECK_ERROR`.
pub enum CheckErrorKind {
    Interrupted(ScanInterrupted),
    Failed { code: ErrorCode, message: String },
}

pub fn classify_check_error(err: anyhow::Error) -> CheckErrorKind {
    if let Some(interrupted) = err.downcast_ref::<ScanInterrupted>() {
        return CheckErrorKind::Interrupted(interrupted.clone());
    }
    if let Some(coded) = err.downcast_ref::<EngineError>() {
        return CheckErrorKind::Failed {
            code: coded.code,
            message: coded.message.clone(),
        };
    }
    CheckErrorKind::Failed {
        code: ErrorCode::UnknownCheckError,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_are_stable_strings() {
        assert_eq!(ErrorCode::RequestNotFound.as_str(), "REQUEST_NOT_FOUND");
        assert_eq!(ErrorCode::UnknownDependency.as_str(), "UNKNOWN_DEPENDENCY");
        assert_eq!(
            ErrorCode::CyclicDependencies.as_str(),
            "CYCLIC_DEPENDENCIES"
        );
        assert_eq!(ErrorCode::CheckTimeout.as_str(), "CHECK_TIMEOUT");
        assert_eq!(ErrorCode::UnknownCheckError.as_str(), "UNKNOWN_CHECK_ERROR");
        assert_eq!(
            ErrorCode::ScanAlreadyRunning.as_str(),
            "SCAN_ALREADY_RUNNING"
        );
    }

    #[test]
    fn error_codes_serialize_to_wire_form() {
        let json = serde_json::to_string(&ErrorCode::CheckTimeout).unwrap();
        assert_eq!(json, "\"CHECK_TIMEOUT\"");
    }

    #[test]
    fn classify_preserves_coded_failures() {
        let err = anyhow::Error::new(EngineError::request_not_found("r1"));
        match classify_check_error(err) {
            CheckErrorKind::Failed { code, .. } => {
                assert_eq!(code, ErrorCode::RequestNotFound)
            }
            _ => panic!("expected failed classification"),
        }
    }

    #[test]
    fn classify_maps_unknown_errors() {
        let err = anyhow::anyhow!("regex blew up");
        match classify_check_error(err) {
            CheckErrorKind::Failed { code, message } => {
                assert_eq!(code, ErrorCode::UnknownCheckError);
                assert!(message.contains("regex blew up"));
            }
            _ => panic!("expected failed classification"),
        }
    }

    #[test]
    fn classify_propagates_interrupts() {
        let err = anyhow::Error::new(ScanInterrupted::new(InterruptReason::Cancelled));
        match classify_check_error(err) {
            CheckErrorKind::Interrupted(i) => {
                assert_eq!(i.reason, InterruptReason::Cancelled)
            }
            _ => panic!("expected interrupt classification"),
        }
    }
}
