// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Framing protection audit for targets that do enforce a policy.
//! Depends on `csp-not-enforced`: its output says whether a policy
//! exists and what it was, so this check never re-derives enforcement.
//! Responses without any policy are that check's finding, not ours.

use serde_json::json;

use crate::check::{CheckBuilder, CheckDefinition, CheckMetadata, CheckType, StepAction};
use crate::checks::csp::CspPolicy;
use crate::checks::{csp_not_enforced, is_html_response};
use crate::host::first_header;
use crate::types::{Finding, Severity};

pub const ID: &str = "csp-clickjacking";

pub fn check() -> CheckDefinition {
    CheckBuilder::new(CheckMetadata {
        id: ID.to_string(),
        name: "CSP Missing Framing Protection".to_string(),
        description: "Enforced policy lacks frame-ancestors and no X-Frame-Options fallback"
            .to_string(),
        check_type: CheckType::Passive,
        tags: vec!["csp".to_string(), "clickjacking".to_string()],
        severities: vec![Severity::Medium],
        aggressivity: None,
        min_aggressivity: None,
        depends_on: vec![csp_not_enforced::ID.to_string()],
        skip_if_found_by: None,
    })
    .when(is_html_response)
    .step("scan", |_state, ctx| async move {
        let Some(upstream) = ctx.dependencies.get(csp_not_enforced::ID) else {
            // dependency did not run for this target; nothing to assess
            return Ok(StepAction::done());
        };

        if upstream["enforced"] != json!(true) {
            // missing enforcement is already reported upstream
            return Ok(StepAction::done());
        }
        let Some(raw) = upstream["policy"].as_str() else {
            return Ok(StepAction::done());
        };

        let policy = CspPolicy::parse(raw);
        if policy.has_frame_ancestors() {
            return Ok(StepAction::done_with(
                Vec::new(),
                Some(json!({ "framingControlled": true })),
            ));
        }

        let has_xfo = ctx
            .target
            .response
            .as_ref()
            .and_then(|response| first_header(response.as_ref(), "x-frame-options"))
            .is_some();
        if has_xfo {
            return Ok(StepAction::done_with(
                Vec::new(),
                Some(json!({ "framingControlled": true, "via": "x-frame-options" })),
            ));
        }

        let finding = Finding::new(
            "No Framing Protection In Enforced CSP",
            "The enforced Content-Security-Policy declares no frame-ancestors \
             directive and the response carries no X-Frame-Options fallback, \
             so the page can be framed by any origin for clickjacking.",
            Severity::Medium,
            ctx.target.request_id(),
        );

        Ok(StepAction::done_with(
            vec![finding],
            Some(json!({ "framingControlled": false })),
        ))
    })
    .build()
}
