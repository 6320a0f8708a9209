// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Version disclosure via `Server` and `X-Powered-By`. Origin-wide, so
//! deduplicated per host and port like the HSTS audit.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use crate::check::{host_port_key, CheckBuilder, CheckDefinition, CheckMetadata, CheckType, StepAction};
use crate::host::first_header;
use crate::types::{Finding, Severity};

pub const ID: &str = "server-header-disclosure";

static VERSIONED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*([a-z0-9_. \-]+?)/(\d[\w.\-]*)").unwrap());

pub fn check() -> CheckDefinition {
    CheckBuilder::new(CheckMetadata {
        id: ID.to_string(),
        name: "Server Header Disclosure".to_string(),
        description: "Response headers reveal server software or its version".to_string(),
        check_type: CheckType::Passive,
        tags: vec!["headers".to_string(), "fingerprinting".to_string()],
        severities: vec![Severity::Info, Severity::Low],
        aggressivity: None,
        min_aggressivity: None,
        depends_on: Vec::new(),
        skip_if_found_by: None,
    })
    .when(|target| target.response.is_some())
    .dedupe_key(host_port_key)
    .step("scan", |_state, ctx| async move {
        let Some(response) = ctx.target.response.clone() else {
            return Ok(StepAction::done());
        };
        let request_id = ctx.target.request_id();
        let mut findings = Vec::new();
        let mut disclosed = Vec::new();

        for header in ["server", "x-powered-by"] {
            let Some(value) = first_header(response.as_ref(), header) else {
                continue;
            };
            disclosed.push(json!({ "header": header, "value": value }));

            if let Some(caps) = VERSIONED.captures(&value) {
                findings.push(Finding::new(
                    "Server Version Disclosure",
                    format!(
                        "`{}: {}` pins the deployment to {} {}, handing \
                         attackers an exact CVE shopping list.",
                        header,
                        value,
                        caps[1].trim(),
                        &caps[2]
                    ),
                    Severity::Low,
                    request_id.clone(),
                ));
            } else {
                findings.push(Finding::new(
                    "Server Software Disclosure",
                    format!("`{}: {}` identifies the server software.", header, value),
                    Severity::Info,
                    request_id.clone(),
                ));
            }
        }

        Ok(StepAction::done_with(
            findings,
            Some(json!({ "disclosed": disclosed })),
        ))
    })
    .build()
}
