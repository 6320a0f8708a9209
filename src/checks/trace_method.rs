// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Active TRACE probe. Re-issues the captured request as TRACE through
//! the scan's request queue and checks whether the origin reflects it.
//! Two steps: `probe` performs the send, `assess` judges the stored
//! evidence, so the probe's state lands in execution history between the
//! ticks.

use serde_json::json;

use crate::check::{
    host_port_path_key, CheckBuilder, CheckDefinition, CheckMetadata, CheckType, StepAction,
};
use crate::host::first_header;
use crate::types::{Aggressivity, AggressivityBounds, Finding, Severity};

pub const ID: &str = "trace-method";

pub fn check() -> CheckDefinition {
    CheckBuilder::new(CheckMetadata {
        id: ID.to_string(),
        name: "TRACE Method Enabled".to_string(),
        description: "Origin answers TRACE and reflects the request".to_string(),
        check_type: CheckType::Active,
        tags: vec!["methods".to_string(), "probe".to_string()],
        severities: vec![Severity::Low],
        aggressivity: Some(AggressivityBounds {
            min_requests: 1,
            max_requests: 1,
        }),
        min_aggressivity: Some(Aggressivity::Medium),
        depends_on: Vec::new(),
        skip_if_found_by: None,
    })
    .dedupe_key(host_port_path_key)
    .init_state(|| json!({}))
    .step("probe", |_state, ctx| async move {
        let spec = ctx
            .target
            .request
            .to_spec()
            .with_method("TRACE")
            .with_body(Vec::new());

        let exchange = ctx.sdk.send(spec).await?;
        let response = exchange.response;

        let body = String::from_utf8_lossy(&response.body()).into_owned();
        let content_type = first_header(response.as_ref(), "content-type").unwrap_or_default();
        let reflected =
            content_type.to_lowercase().contains("message/http") || body.contains("TRACE ");

        Ok(StepAction::continue_with(
            "assess",
            json!({
                "code": response.code(),
                "reflected": reflected,
                "probeResponseId": response.id(),
            }),
        ))
    })
    .step("assess", |state, ctx| async move {
        let enabled = state["code"] == json!(200) && state["reflected"] == json!(true);
        if !enabled {
            return Ok(StepAction::done_with(
                Vec::new(),
                Some(json!({ "traceEnabled": false })),
            ));
        }

        let finding = Finding::new(
            "TRACE Method Enabled",
            "The origin accepts TRACE and echoes the request back, which \
             can expose internal headers added by intermediaries.",
            Severity::Low,
            ctx.target.request_id(),
        );

        Ok(StepAction::done_with(
            vec![finding],
            Some(json!({ "traceEnabled": true })),
        ))
    })
    .build()
}
