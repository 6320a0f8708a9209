// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Host capture/replay SDK surface.
//!
//! The engine never opens sockets itself; it asks the host to resolve
//! captured exchanges and to send pre-built requests. Everything the
//! engine needs from the host is expressed through these capability
//! traits, so tests can run against an in-memory host and production can
//! bind the real capture SDK.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::types::ScanTarget;

/// A request the host is asked to send. Built from a captured request via
/// [`HostRequest::to_spec`] and then adjusted by the issuing check.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestSpec {
    pub method: String,
    pub host: String,
    pub port: u16,
    pub tls: bool,
    pub path: String,
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub body: Vec<u8>,
}

impl RequestSpec {
    pub fn with_method(mut self, method: &str) -> Self {
        self.method = method.to_string();
        self
    }

    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.to_string();
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// A captured request owned by the host, referenced by opaque id.
pub trait HostRequest: Send + Sync {
    fn id(&self) -> String;
    fn host(&self) -> String;
    fn port(&self) -> u16;
    fn path(&self) -> String;
    fn query(&self) -> String;
    fn url(&self) -> String;
    fn method(&self) -> String;
    fn to_spec(&self) -> RequestSpec;
}

/// A captured response owned by the host.
pub trait HostResponse: Send + Sync {
    fn id(&self) -> String;
    fn code(&self) -> u16;
    /// All values of a header, case-insensitive; `None` when absent.
    fn header(&self, name: &str) -> Option<Vec<String>>;
    fn body(&self) -> Vec<u8>;
}

/// A request/response pair produced by a host send.
#[derive(Clone)]
pub struct Exchange {
    pub request: Arc<dyn HostRequest>,
    pub response: Arc<dyn HostResponse>,
}

impl std::fmt::Debug for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exchange")
            .field("request", &self.request.id())
            .field("response", &self.response.id())
            .finish()
    }
}

/// The host capture/replay SDK. `send` may fail for transport reasons;
/// the caller decides what that means for the issuing check.
#[async_trait]
pub trait HostSdk: Send + Sync {
    /// Look up a captured exchange by request id.
    async fn request(&self, id: &str) -> Option<ScanTarget>;

    /// Send a pre-built request and return the resulting exchange.
    async fn send(&self, spec: RequestSpec) -> Result<Exchange>;

    /// Whether the request falls inside the host's configured scope.
    fn in_scope(&self, request: &dyn HostRequest) -> bool;

    /// Evaluate a host-side filter expression against an exchange.
    fn matches(
        &self,
        filter: &str,
        request: &dyn HostRequest,
        response: Option<&dyn HostResponse>,
    ) -> bool;
}

/// Convenience for single-valued headers.
pub fn first_header(response: &dyn HostResponse, name: &str) -> Option<String> {
    response
        .header(name)
        .and_then(|values| values.into_iter().next())
}
