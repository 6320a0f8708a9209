// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Built-in Check Catalog
 * Checks registered through the public plugin surface
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use crate::check::CheckDefinition;
use crate::host::first_header;
use crate::types::ScanTarget;

pub mod csp;

pub mod csp_clickjacking;
pub mod csp_not_enforced;
pub mod csp_untrusted_script;
pub mod server_header_disclosure;
pub mod strict_transport_security;
pub mod trace_method;

/// The built-in catalog in registration order. Order matters: it breaks
/// ties when two checks race for a dedupe key and keeps planned batches
/// stable between runs.
pub fn builtin_checks() -> Vec<CheckDefinition> {
    vec![
        csp_not_enforced::check(),
        csp_untrusted_script::check(),
        csp_clickjacking::check(),
        strict_transport_security::check(),
        server_header_disclosure::check(),
        trace_method::check(),
    ]
}

/// True when the target carries an HTML response. Header-less responses
/// are treated as non-HTML; browser-side policies are meaningless there.
pub(crate) fn is_html_response(target: &ScanTarget) -> bool {
    let Some(response) = target.response.as_ref() else {
        return false;
    };
    first_header(response.as_ref(), "content-type")
        .map(|ct| ct.to_lowercase().contains("text/html"))
        .unwrap_or(false)
}
