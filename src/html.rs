// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - HTML Parse Cache
 * Lazy, memoized parse of target response bodies
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use scraper::{Html, Selector};
use tokio::sync::Mutex;
use tracing::debug;

use crate::errors::EngineError;
use crate::host::HostSdk;

/// Owned projection of a parsed HTML document. The DOM itself is dropped
/// at parse time; only what checks inspect survives, so cached entries
/// stay `Send` across await points.
#[derive(Debug, Clone, Default)]
pub struct ParsedHtml {
    pub title: Option<String>,
    /// `http-equiv` meta tags as `(directive, content)` pairs, lowercased
    /// directive names.
    pub meta_http_equiv: Vec<(String, String)>,
    /// External script sources in document order.
    pub script_sources: Vec<String>,
    /// Number of inline script blocks.
    pub inline_scripts: usize,
    /// `(action, method)` per form.
    pub forms: Vec<(String, String)>,
    pub body_len: usize,
}

impl ParsedHtml {
    pub fn parse(body: &str) -> Self {
        let document = Html::parse_document(body);

        let title_selector = Selector::parse("title").unwrap();
        let meta_selector = Selector::parse("meta[http-equiv]").unwrap();
        let script_selector = Selector::parse("script").unwrap();
        let form_selector = Selector::parse("form").unwrap();

        let title = document
            .select(&title_selector)
            .next()
            .map(|t| t.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());

        let mut meta_http_equiv = Vec::new();
        for meta in document.select(&meta_selector) {
            if let Some(directive) = meta.value().attr("http-equiv") {
                let content = meta.value().attr("content").unwrap_or_default();
                meta_http_equiv.push((directive.to_lowercase(), content.to_string()));
            }
        }

        let mut script_sources = Vec::new();
        let mut inline_scripts = 0;
        for script in document.select(&script_selector) {
            match script.value().attr("src") {
                Some(src) => script_sources.push(src.to_string()),
                None => inline_scripts += 1,
            }
        }

        let forms = document
            .select(&form_selector)
            .map(|form| {
                let action = form.value().attr("action").unwrap_or_default().to_string();
                let method = form
                    .value()
                    .attr("method")
                    .unwrap_or("GET")
                    .to_uppercase();
                (action, method)
            })
            .collect();

        Self {
            title,
            meta_http_equiv,
            script_sources,
            inline_scripts,
            forms,
            body_len: body.len(),
        }
    }

    /// Content of an `http-equiv` meta tag, if present.
    pub fn http_equiv(&self, directive: &str) -> Option<&str> {
        let wanted = directive.to_lowercase();
        self.meta_http_equiv
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, content)| content.as_str())
    }
}

/// Write-once cache of parsed documents keyed by request id. The body is
/// fetched from the host on first use and every later reader observes the
/// same [`ParsedHtml`].
pub struct HtmlCache {
    sdk: Arc<dyn HostSdk>,
    cache: Mutex<HashMap<String, Arc<ParsedHtml>>>,
}

impl HtmlCache {
    pub fn new(sdk: Arc<dyn HostSdk>) -> Self {
        Self {
            sdk,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Parse the response body of the given request, memoized. Fails with
    /// `REQUEST_NOT_FOUND` when the request or its response cannot be
    /// obtained from the host.
    pub async fn parse(&self, request_id: &str) -> Result<Arc<ParsedHtml>> {
        {
            let cache = self.cache.lock().await;
            if let Some(parsed) = cache.get(request_id) {
                return Ok(Arc::clone(parsed));
            }
        }

        let target = self
            .sdk
            .request(request_id)
            .await
            .ok_or_else(|| EngineError::request_not_found(request_id))?;
        let response = target
            .response
            .ok_or_else(|| EngineError::request_not_found(request_id))?;

        let body = String::from_utf8_lossy(&response.body()).into_owned();
        let parsed = Arc::new(ParsedHtml::parse(&body));
        debug!(
            "parsed html for {}: {} bytes, {} scripts",
            request_id,
            parsed.body_len,
            parsed.script_sources.len() + parsed.inline_scripts
        );

        let mut cache = self.cache.lock().await;
        // another task may have parsed the same body while we did; keep
        // the first entry so readers all observe one document
        let entry = cache
            .entry(request_id.to_string())
            .or_insert_with(|| Arc::clone(&parsed));
        Ok(Arc::clone(entry))
    }
}
