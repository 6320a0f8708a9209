// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Flags HTML responses served without an enforced Content Security
//! Policy. The output records what was found so dependent checks can
//! reason about the policy without re-parsing headers.

use serde_json::json;

use crate::check::{CheckBuilder, CheckDefinition, CheckMetadata, CheckType, StepAction};
use crate::checks::{csp, is_html_response};
use crate::types::{Finding, Severity};

pub const ID: &str = "csp-not-enforced";

pub fn check() -> CheckDefinition {
    CheckBuilder::new(CheckMetadata {
        id: ID.to_string(),
        name: "CSP Not Enforced".to_string(),
        description: "HTML response served without an enforced Content Security Policy"
            .to_string(),
        check_type: CheckType::Passive,
        tags: vec!["csp".to_string(), "headers".to_string()],
        severities: vec![Severity::High],
        aggressivity: None,
        min_aggressivity: None,
        depends_on: Vec::new(),
        skip_if_found_by: None,
    })
    .when(is_html_response)
    .step("scan", |_state, ctx| async move {
        let Some(response) = ctx.target.response.clone() else {
            return Ok(StepAction::done());
        };
        let request_id = ctx.target.request_id();

        if let Some(policy) = csp::header_policy(response.as_ref()) {
            return Ok(StepAction::done_with(
                Vec::new(),
                Some(json!({ "enforced": true, "policy": policy, "source": "header" })),
            ));
        }

        // header absent; a policy can still arrive via <meta http-equiv>
        let document = ctx.html.parse(&request_id).await?;
        if let Some(policy) = document.http_equiv(csp::CSP_HEADER) {
            return Ok(StepAction::done_with(
                Vec::new(),
                Some(json!({ "enforced": true, "policy": policy, "source": "meta" })),
            ));
        }

        let finding = Finding::new(
            "Content Security Policy Not Enforced",
            "The response is rendered as HTML but carries no enforced \
             Content-Security-Policy, leaving injected markup and script \
             unconstrained by the browser.",
            Severity::High,
            request_id,
        );

        Ok(StepAction::done_with(
            vec![finding],
            Some(json!({ "enforced": false, "policy": null })),
        ))
    })
    .build()
}
