// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.
#![allow(dead_code)]

/**
 * Bountyy Oy - Integration Test Host
 * In-memory capture/replay host standing in for the real SDK
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use tutka_engine::host::{Exchange, HostRequest, HostResponse, HostSdk, RequestSpec};
use tutka_engine::types::ScanTarget;

#[derive(Debug, Clone)]
pub struct MockRequest {
    pub id: String,
    pub method: String,
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub path: String,
    pub query: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl MockRequest {
    pub fn get(id: &str, host: &str, path: &str) -> Self {
        Self {
            id: id.to_string(),
            method: "GET".to_string(),
            host: host.to_string(),
            port: 443,
            tls: true,
            path: path.to_string(),
            query: String::new(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn plain_http(mut self) -> Self {
        self.tls = false;
        self.port = 80;
        self
    }

    fn from_spec(id: &str, spec: &RequestSpec) -> Self {
        Self {
            id: id.to_string(),
            method: spec.method.clone(),
            host: spec.host.clone(),
            port: spec.port,
            tls: spec.tls,
            path: spec.path.clone(),
            query: spec.query.clone(),
            headers: spec.headers.clone(),
            body: spec.body.clone(),
        }
    }
}

impl HostRequest for MockRequest {
    fn id(&self) -> String {
        self.id.clone()
    }
    fn host(&self) -> String {
        self.host.clone()
    }
    fn port(&self) -> u16 {
        self.port
    }
    fn path(&self) -> String {
        self.path.clone()
    }
    fn query(&self) -> String {
        self.query.clone()
    }
    fn url(&self) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        format!("{}://{}{}", scheme, self.host, self.path)
    }
    fn method(&self) -> String {
        self.method.clone()
    }
    fn to_spec(&self) -> RequestSpec {
        RequestSpec {
            method: self.method.clone(),
            host: self.host.clone(),
            port: self.port,
            tls: self.tls,
            path: self.path.clone(),
            query: self.query.clone(),
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct MockResponse {
    pub id: String,
    pub code: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl MockResponse {
    pub fn new(id: &str, code: u16) -> Self {
        Self {
            id: id.to_string(),
            code,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self
    }

    pub fn html(id: &str) -> Self {
        Self::new(id, 200).header("content-type", "text/html; charset=utf-8")
    }
}

impl HostResponse for MockResponse {
    fn id(&self) -> String {
        self.id.clone()
    }
    fn code(&self) -> u16 {
        self.code
    }
    fn header(&self, name: &str) -> Option<Vec<String>> {
        let wanted = name.to_lowercase();
        let values: Vec<String> = self
            .headers
            .iter()
            .filter(|(n, _)| n.to_lowercase() == wanted)
            .map(|(_, v)| v.clone())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    }
    fn body(&self) -> Vec<u8> {
        self.body.clone()
    }
}

type Responder = Box<dyn Fn(&RequestSpec) -> MockResponse + Send + Sync>;

/// In-memory host: captured exchanges by request id, a programmable
/// responder for check-issued sends, and a log of everything sent.
pub struct MockHost {
    captured: Mutex<HashMap<String, (Arc<MockRequest>, Option<Arc<MockResponse>>)>>,
    sends: Mutex<Vec<(RequestSpec, Instant)>>,
    responder: Mutex<Option<Responder>>,
    send_delay: Mutex<Duration>,
    out_of_scope_hosts: Mutex<Vec<String>>,
    sent_counter: AtomicUsize,
}

impl MockHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            captured: Mutex::new(HashMap::new()),
            sends: Mutex::new(Vec::new()),
            responder: Mutex::new(None),
            send_delay: Mutex::new(Duration::ZERO),
            out_of_scope_hosts: Mutex::new(Vec::new()),
            sent_counter: AtomicUsize::new(0),
        })
    }

    pub fn capture(&self, request: MockRequest, response: Option<MockResponse>) {
        self.captured.lock().insert(
            request.id.clone(),
            (Arc::new(request), response.map(Arc::new)),
        );
    }

    pub fn set_responder<F>(&self, responder: F)
    where
        F: Fn(&RequestSpec) -> MockResponse + Send + Sync + 'static,
    {
        *self.responder.lock() = Some(Box::new(responder));
    }

    pub fn set_send_delay(&self, delay: Duration) {
        *self.send_delay.lock() = delay;
    }

    pub fn mark_out_of_scope(&self, host: &str) {
        self.out_of_scope_hosts.lock().push(host.to_string());
    }

    pub fn sends(&self) -> Vec<(RequestSpec, Instant)> {
        self.sends.lock().clone()
    }

    pub fn send_count(&self) -> usize {
        self.sends.lock().len()
    }
}

#[async_trait]
impl HostSdk for MockHost {
    async fn request(&self, id: &str) -> Option<ScanTarget> {
        let captured = self.captured.lock();
        captured.get(id).map(|(request, response)| ScanTarget {
            request: Arc::clone(request) as Arc<dyn HostRequest>,
            response: response
                .as_ref()
                .map(|r| Arc::clone(r) as Arc<dyn HostResponse>),
        })
    }

    async fn send(&self, spec: RequestSpec) -> Result<Exchange> {
        let delay = *self.send_delay.lock();
        if delay > Duration::ZERO {
            tokio::time::sleep(delay).await;
        }

        self.sends.lock().push((spec.clone(), Instant::now()));
        let n = self.sent_counter.fetch_add(1, Ordering::SeqCst) + 1;

        let mut response = match self.responder.lock().as_ref() {
            Some(responder) => responder(&spec),
            None => MockResponse::new("", 200),
        };
        response.id = format!("sent-resp-{}", n);

        Ok(Exchange {
            request: Arc::new(MockRequest::from_spec(&format!("sent-req-{}", n), &spec)),
            response: Arc::new(response),
        })
    }

    fn in_scope(&self, request: &dyn HostRequest) -> bool {
        !self
            .out_of_scope_hosts
            .lock()
            .contains(&request.host())
    }

    fn matches(
        &self,
        _filter: &str,
        _request: &dyn HostRequest,
        _response: Option<&dyn HostResponse>,
    ) -> bool {
        true
    }
}

/// Capture a plain HTML page under `id` at `https://<host><path>`.
pub fn capture_page(
    host: &MockHost,
    id: &str,
    domain: &str,
    path: &str,
    headers: &[(&str, &str)],
    body: &str,
) {
    let request = MockRequest::get(id, domain, path);
    let mut response = MockResponse::html(&format!("{}-resp", id)).body(body);
    for (name, value) in headers {
        response = response.header(name, value);
    }
    host.capture(request, Some(response));
}
