// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Content Security Policy Model
 * Directive parsing shared by the CSP check family
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::collections::HashMap;

use crate::host::{first_header, HostResponse};

/// Enforced-policy header. The report-only variant deliberately does not
/// count as enforcement.
pub const CSP_HEADER: &str = "content-security-policy";

/// One parsed directive with the source-list flags the checks care about.
#[derive(Debug, Clone, Default)]
pub struct CspDirective {
    pub values: Vec<String>,
    pub has_wildcard: bool,
    pub has_unsafe_inline: bool,
    pub has_strict_dynamic: bool,
    pub has_nonce_or_hash: bool,
}

impl CspDirective {
    fn parse_values(&mut self, values: &str) {
        for value in values.split_whitespace() {
            let v = value.trim();
            self.values.push(v.to_string());

            match v.to_lowercase().as_str() {
                "*" => self.has_wildcard = true,
                "'unsafe-inline'" => self.has_unsafe_inline = true,
                "'strict-dynamic'" => self.has_strict_dynamic = true,
                _ if v.starts_with("'nonce-")
                    || v.starts_with("'sha256-")
                    || v.starts_with("'sha384-")
                    || v.starts_with("'sha512-") =>
                {
                    self.has_nonce_or_hash = true;
                }
                _ => {}
            }
        }
    }
}

/// A parsed policy string.
#[derive(Debug, Clone)]
pub struct CspPolicy {
    pub raw: String,
    directives: HashMap<String, CspDirective>,
}

impl CspPolicy {
    pub fn parse(raw: &str) -> Self {
        let mut directives = HashMap::new();

        for part in raw.split(';') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            let mut pieces = part.splitn(2, ' ');
            if let Some(name) = pieces.next() {
                let mut directive = CspDirective::default();
                if let Some(values) = pieces.next() {
                    directive.parse_values(values);
                }
                directives.insert(name.to_lowercase(), directive);
            }
        }

        Self {
            raw: raw.to_string(),
            directives,
        }
    }

    pub fn directive(&self, name: &str) -> Option<&CspDirective> {
        self.directives.get(&name.to_lowercase())
    }

    /// Effective script sources: `script-src`, falling back to
    /// `default-src`.
    pub fn effective_script_src(&self) -> Option<&CspDirective> {
        self.directive("script-src")
            .or_else(|| self.directive("default-src"))
    }

    /// A policy allows untrusted script when its effective script sources
    /// include a bare wildcard, or `'unsafe-inline'` that is not
    /// neutralized by nonces, hashes or `'strict-dynamic'`.
    pub fn allows_untrusted_script(&self) -> bool {
        let Some(sources) = self.effective_script_src() else {
            return false;
        };
        if sources.has_wildcard {
            return true;
        }
        sources.has_unsafe_inline && !sources.has_nonce_or_hash && !sources.has_strict_dynamic
    }

    pub fn has_frame_ancestors(&self) -> bool {
        self.directives.contains_key("frame-ancestors")
    }
}

/// The enforced policy of a response, from the header only. Callers that
/// also honor `<meta http-equiv>` delivery combine this with the parsed
/// document.
pub fn header_policy(response: &dyn HostResponse) -> Option<String> {
    first_header(response, CSP_HEADER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_directives_and_flags() {
        let policy =
            CspPolicy::parse("default-src 'self'; script-src 'self' *; frame-ancestors 'none'");
        assert!(policy.directive("script-src").unwrap().has_wildcard);
        assert!(!policy.directive("default-src").unwrap().has_wildcard);
        assert!(policy.has_frame_ancestors());
    }

    #[test]
    fn script_src_falls_back_to_default_src() {
        let policy = CspPolicy::parse("default-src *");
        assert!(policy.effective_script_src().unwrap().has_wildcard);
        assert!(policy.allows_untrusted_script());
    }

    #[test]
    fn wildcard_script_src_is_untrusted() {
        let policy = CspPolicy::parse("script-src *");
        assert!(policy.allows_untrusted_script());
    }

    #[test]
    fn unsafe_inline_with_nonce_is_tolerated() {
        let policy = CspPolicy::parse("script-src 'unsafe-inline' 'nonce-abc123'");
        assert!(!policy.allows_untrusted_script());

        let policy = CspPolicy::parse("script-src 'unsafe-inline'");
        assert!(policy.allows_untrusted_script());
    }

    #[test]
    fn strict_dynamic_neutralizes_unsafe_inline() {
        let policy = CspPolicy::parse("script-src 'unsafe-inline' 'strict-dynamic'");
        assert!(!policy.allows_untrusted_script());
    }

    #[test]
    fn tight_policy_is_clean() {
        let policy = CspPolicy::parse("script-src 'self'; object-src 'none'");
        assert!(!policy.allows_untrusted_script());
        assert!(!policy.has_frame_ancestors());
    }

    #[test]
    fn empty_policy_has_no_script_sources() {
        let policy = CspPolicy::parse("");
        assert!(policy.effective_script_src().is_none());
        assert!(!policy.allows_untrusted_script());
    }
}
