// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Flags enforced policies whose effective script sources still admit
//! untrusted script: a bare wildcard, or `'unsafe-inline'` with no
//! nonce, hash or `'strict-dynamic'` to rein it in.

use serde_json::json;

use crate::check::{CheckBuilder, CheckDefinition, CheckMetadata, CheckType, StepAction};
use crate::checks::csp::{self, CspPolicy};
use crate::checks::is_html_response;
use crate::types::{Finding, Severity};

pub const ID: &str = "csp-untrusted-script";

pub fn check() -> CheckDefinition {
    CheckBuilder::new(CheckMetadata {
        id: ID.to_string(),
        name: "CSP Allows Untrusted Script".to_string(),
        description: "Content Security Policy permits script from untrusted sources".to_string(),
        check_type: CheckType::Passive,
        tags: vec!["csp".to_string(), "headers".to_string()],
        severities: vec![Severity::Critical],
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

        let raw = match csp::header_policy(response.as_ref()) {
            Some(raw) => raw,
            None => {
                let document = ctx.html.parse(&request_id).await?;
                match document.http_equiv(csp::CSP_HEADER) {
                    Some(raw) => raw.to_string(),
                    // no enforced policy at all; csp-not-enforced owns that case
                    None => return Ok(StepAction::done()),
                }
            }
        };

        let policy = CspPolicy::parse(&raw);
        if !policy.allows_untrusted_script() {
            return Ok(StepAction::done_with(
                Vec::new(),
                Some(json!({ "policy": raw, "untrustedScript": false })),
            ));
        }

        let mut finding = Finding::new(
            "CSP Permits Untrusted Script",
            format!(
                "The effective script sources of the enforced policy `{}` \
                 allow script execution from untrusted origins, so the \
                 policy offers no real XSS containment.",
                raw
            ),
            Severity::Critical,
            request_id,
        );
        if let Some(offset) = raw.find('*') {
            finding = finding.with_location(offset, offset + 1, Some(csp::CSP_HEADER));
        }

        Ok(StepAction::done_with(
            vec![finding],
            Some(json!({ "policy": raw, "untrustedScript": true })),
        ))
    })
    .build()
}
