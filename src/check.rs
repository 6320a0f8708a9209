// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Check Plugin Surface
 * Metadata, step registration, and the per-execution task state machine
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::RuntimeContext;
use crate::errors::{EngineError, ErrorCode};
use crate::types::{Aggressivity, AggressivityBounds, Finding, ScanTarget, Severity};

/// Check state and dependency outputs are structured JSON so every tick
/// can be snapshotted into execution history verbatim.
pub type CheckState = Value;
pub type CheckOutput = Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckType {
    /// Inspects captured traffic only.
    Passive,
    /// Issues its own requests through the throttled queue.
    Active,
}

/// Declarative record describing a check. The `id` is stable across
/// releases; everything else is display or scheduling input.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckMetadata {
    pub id: String,
    pub name: String,
    pub description: String,
    #[serde(rename = "type")]
    pub check_type: CheckType,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Severities this check can emit; must be non-empty.
    pub severities: Vec<Severity>,
    /// Request budget for active checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggressivity: Option<AggressivityBounds>,
    /// Minimum configured tier for this check to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_aggressivity: Option<Aggressivity>,
    /// Ids of checks whose outputs this check consumes.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Skip this check when the referenced check already has findings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_if_found_by: Option<String>,
}

/// What a step hands back to the interpreter.
#[derive(Debug)]
pub enum StepAction {
    Continue {
        next_step: String,
        state: CheckState,
        findings: Vec<Finding>,
    },
    Done {
        state: Option<CheckState>,
        findings: Vec<Finding>,
        output: Option<CheckOutput>,
    },
}

impl StepAction {
    pub fn done() -> Self {
        StepAction::Done {
            state: None,
            findings: Vec::new(),
            output: None,
        }
    }

    pub fn done_with(findings: Vec<Finding>, output: Option<CheckOutput>) -> Self {
        StepAction::Done {
            state: None,
            findings,
            output,
        }
    }

    pub fn continue_with(next_step: &str, state: CheckState) -> Self {
        StepAction::Continue {
            next_step: next_step.to_string(),
            state,
            findings: Vec::new(),
        }
    }

    pub fn continue_reporting(next_step: &str, state: CheckState, findings: Vec<Finding>) -> Self {
        StepAction::Continue {
            next_step: next_step.to_string(),
            state,
            findings,
        }
    }
}

pub type StepFn = Arc<
    dyn Fn(CheckState, Arc<RuntimeContext>) -> BoxFuture<'static, Result<StepAction>>
        + Send
        + Sync,
>;
type WhenFn = Arc<dyn Fn(&ScanTarget) -> bool + Send + Sync>;
type DedupeKeyFn = Arc<dyn Fn(&ScanTarget) -> String + Send + Sync>;
type InitStateFn = Arc<dyn Fn() -> CheckState + Send + Sync>;

/// A registered check: metadata plus the step machine that executes it.
pub struct CheckDefinition {
    pub metadata: CheckMetadata,
    init_state: InitStateFn,
    when: Option<WhenFn>,
    dedupe_key: Option<DedupeKeyFn>,
    entry_step: String,
    steps: HashMap<String, StepFn>,
}

impl CheckDefinition {
    pub fn id(&self) -> &str {
        &self.metadata.id
    }

    /// `when` predicate; checks without one apply to every target.
    pub fn applies_to(&self, target: &ScanTarget) -> bool {
        self.when.as_ref().map_or(true, |when| when(target))
    }

    /// Dedupe key for this target, when the check defines a strategy.
    pub fn dedupe_key_for(&self, target: &ScanTarget) -> Option<String> {
        self.dedupe_key.as_ref().map(|key| key(target))
    }

    pub fn has_dedupe_key(&self) -> bool {
        self.dedupe_key.is_some()
    }

    /// Instantiate a task for one target execution.
    pub fn create(&self, context: Arc<RuntimeContext>) -> CheckTask {
        CheckTask {
            check_id: self.metadata.id.clone(),
            step_name: self.entry_step.clone(),
            state: (self.init_state)(),
            output: None,
            finished: false,
            steps: self.steps.clone(),
            context,
        }
    }
}

impl std::fmt::Debug for CheckDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckDefinition")
            .field("id", &self.metadata.id)
            .field("steps", &self.steps.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for check definitions. The first registered step is the entry
/// point; registering at least one step is part of the plugin contract.
pub struct CheckBuilder {
    metadata: CheckMetadata,
    init_state: InitStateFn,
    when: Option<WhenFn>,
    dedupe_key: Option<DedupeKeyFn>,
    entry_step: Option<String>,
    steps: HashMap<String, StepFn>,
}

impl CheckBuilder {
    pub fn new(metadata: CheckMetadata) -> Self {
        Self {
            metadata,
            init_state: Arc::new(|| Value::Null),
            when: None,
            dedupe_key: None,
            entry_step: None,
            steps: HashMap::new(),
        }
    }

    pub fn init_state<F>(mut self, init: F) -> Self
    where
        F: Fn() -> CheckState + Send + Sync + 'static,
    {
        self.init_state = Arc::new(init);
        self
    }

    pub fn when<F>(mut self, when: F) -> Self
    where
        F: Fn(&ScanTarget) -> bool + Send + Sync + 'static,
    {
        self.when = Some(Arc::new(when));
        self
    }

    pub fn dedupe_key<F>(mut self, key: F) -> Self
    where
        F: Fn(&ScanTarget) -> String + Send + Sync + 'static,
    {
        self.dedupe_key = Some(Arc::new(key));
        self
    }

    pub fn step<F, Fut>(mut self, name: &str, handler: F) -> Self
    where
        F: Fn(CheckState, Arc<RuntimeContext>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<StepAction>> + Send + 'static,
    {
        if self.entry_step.is_none() {
            self.entry_step = Some(name.to_string());
        }
        let step: StepFn = Arc::new(move |state, ctx| {
            let fut: BoxFuture<'static, Result<StepAction>> = Box::pin(handler(state, ctx));
            fut
        });
        self.steps.insert(name.to_string(), step);
        self
    }

    pub fn build(self) -> CheckDefinition {
        assert!(
            !self.metadata.severities.is_empty(),
            "check `{}` must declare at least one severity",
            self.metadata.id
        );
        let entry_step = self
            .entry_step
            .unwrap_or_else(|| panic!("check `{}` registered no steps", self.metadata.id));
        CheckDefinition {
            metadata: self.metadata,
            init_state: self.init_state,
            when: self.when,
            dedupe_key: self.dedupe_key,
            entry_step,
            steps: self.steps,
        }
    }
}

/// Outcome of one interpreter tick, after the action has been applied to
/// the task.
#[derive(Debug)]
pub struct TickOutcome {
    pub status: TickStatus,
    pub findings: Vec<Finding>,
    pub next_step: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickStatus {
    Continue,
    Done,
}

/// One check execution against one target: current step, private state,
/// and the output accumulated for dependents.
pub struct CheckTask {
    check_id: String,
    step_name: String,
    state: CheckState,
    output: Option<CheckOutput>,
    finished: bool,
    steps: HashMap<String, StepFn>,
    context: Arc<RuntimeContext>,
}

impl CheckTask {
    pub fn check_id(&self) -> &str {
        &self.check_id
    }

    pub fn step_name(&self) -> &str {
        &self.step_name
    }

    pub fn state(&self) -> &CheckState {
        &self.state
    }

    pub fn target(&self) -> &ScanTarget {
        &self.context.target
    }

    pub fn output(&self) -> Option<&CheckOutput> {
        self.output.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn take_output(&mut self) -> Option<CheckOutput> {
        self.output.take()
    }

    /// Run the current step once and fold its action into the task.
    pub async fn tick(&mut self) -> Result<TickOutcome> {
        let step = self.steps.get(&self.step_name).cloned().ok_or_else(|| {
            EngineError::new(
                ErrorCode::UnknownCheckError,
                format!(
                    "check `{}` continued to unregistered step `{}`",
                    self.check_id, self.step_name
                ),
            )
        })?;

        let action = step(self.state.clone(), Arc::clone(&self.context)).await?;

        match action {
            StepAction::Continue {
                next_step,
                state,
                findings,
            } => {
                self.step_name = next_step.clone();
                self.state = state;
                Ok(TickOutcome {
                    status: TickStatus::Continue,
                    findings,
                    next_step: Some(next_step),
                })
            }
            StepAction::Done {
                state,
                findings,
                output,
            } => {
                if let Some(state) = state {
                    self.state = state;
                }
                self.output = output;
                self.finished = true;
                Ok(TickOutcome {
                    status: TickStatus::Done,
                    findings,
                    next_step: None,
                })
            }
        }
    }
}

/// Default dedupe strategy: host, port and path joined with a separator
/// that cannot appear in any component.
pub fn host_port_path_key(target: &ScanTarget) -> String {
    format!(
        "{}\u{1}{}\u{1}{}",
        target.request.host(),
        target.request.port(),
        target.request.path()
    )
}

/// Dedupe strategy for host-wide checks.
pub fn host_port_key(target: &ScanTarget) -> String {
    format!("{}\u{1}{}", target.request.host(), target.request.port())
}
