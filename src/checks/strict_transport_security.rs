// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! HSTS audit for HTTPS targets. Deduplicated per host and port: the
//! header is an origin-wide property, re-reporting it for every captured
//! path is noise.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use url::Url;

use crate::check::{host_port_key, CheckBuilder, CheckDefinition, CheckMetadata, CheckType, StepAction};
use crate::host::first_header;
use crate::types::{Finding, Severity};

pub const ID: &str = "strict-transport-security";

static MAX_AGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)max-age\s*=\s*(\d+)").unwrap());

pub fn check() -> CheckDefinition {
    CheckBuilder::new(CheckMetadata {
        id: ID.to_string(),
        name: "Strict Transport Security".to_string(),
        description: "HTTPS response without HSTS, or with a throwaway max-age".to_string(),
        check_type: CheckType::Passive,
        tags: vec!["headers".to_string(), "transport".to_string()],
        severities: vec![Severity::Medium],
        aggressivity: None,
        min_aggressivity: None,
        depends_on: Vec::new(),
        skip_if_found_by: None,
    })
    .when(|target| {
        target.response.is_some()
            && Url::parse(&target.request.url())
                .map(|u| u.scheme() == "https")
                .unwrap_or(false)
    })
    .dedupe_key(host_port_key)
    .step("scan", |_state, ctx| async move {
        let Some(response) = ctx.target.response.clone() else {
            return Ok(StepAction::done());
        };
        let request_id = ctx.target.request_id();

        let Some(hsts) = first_header(response.as_ref(), "strict-transport-security") else {
            let finding = Finding::new(
                "Missing HSTS Header",
                "An HTTPS origin without Strict-Transport-Security remains \
                 exposed to SSL-stripping on first contact.",
                Severity::Medium,
                request_id,
            );
            return Ok(StepAction::done_with(
                vec![finding],
                Some(json!({ "hsts": false })),
            ));
        };

        let max_age = MAX_AGE
            .captures(&hsts)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok());

        if let Some(age) = max_age {
            if age <= 1 {
                let finding = Finding::new(
                    "Throwaway HSTS max-age",
                    format!(
                        "Strict-Transport-Security is present but max-age={} \
                         expires the pin immediately.",
                        age
                    ),
                    Severity::Medium,
                    request_id,
                );
                return Ok(StepAction::done_with(
                    vec![finding],
                    Some(json!({ "hsts": true, "maxAge": age })),
                ));
            }
        }

        Ok(StepAction::done_with(
            Vec::new(),
            Some(json!({ "hsts": true, "maxAge": max_age })),
        ))
    })
    .build()
}
