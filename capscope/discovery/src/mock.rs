//! In-process transport for tests.
//!
//! Serves canned responses by method + path-substring match and counts
//! every request, so tests can assert how many probes a pass issued.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::transport::{ProbeTransport, TransportError, TransportRequest, TransportResponse};

struct MockRoute {
    method: Option<String>,
    path_contains: String,
    status: u16,
    json: Option<Value>,
    fail: bool,
}

/// Route-table transport. Routes match in insertion order; the first
/// route whose method (if set) and path-substring match wins. Unmatched
/// requests get the default status.
pub struct MockTransport {
    routes: Vec<MockRoute>,
    default_status: u16,
    request_count: AtomicUsize,
    request_log: Mutex<Vec<String>>,
}

impl MockTransport {
    pub fn new(default_status: u16) -> Self {
        Self {
            routes: Vec::new(),
            default_status,
            request_count: AtomicUsize::new(0),
            request_log: Mutex::new(Vec::new()),
        }
    }

    pub fn route(mut self, path_contains: &str, status: u16) -> Self {
        self.routes.push(MockRoute {
            method: None,
            path_contains: path_contains.to_string(),
            status,
            json: None,
            fail: false,
        });
        self
    }

    pub fn route_method(mut self, method: &str, path_contains: &str, status: u16) -> Self {
        self.routes.push(MockRoute {
            method: Some(method.to_string()),
            path_contains: path_contains.to_string(),
            status,
            json: None,
            fail: false,
        });
        self
    }

    pub fn route_json(mut self, path_contains: &str, status: u16, json: Value) -> Self {
        self.routes.push(MockRoute {
            method: None,
            path_contains: path_contains.to_string(),
            status,
            json: Some(json),
            fail: false,
        });
        self
    }

    /// Requests matching this path fail at the transport level.
    pub fn fail_route(mut self, path_contains: &str) -> Self {
        self.routes.push(MockRoute {
            method: None,
            path_contains: path_contains.to_string(),
            status: 0,
            json: None,
            fail: true,
        });
        self
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// `"METHOD /path"` for every request seen, in order.
    pub fn requests(&self) -> Vec<String> {
        self.request_log
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl ProbeTransport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        let path = match request.url.query() {
            Some(query) => format!("{}?{}", request.url.path(), query),
            None => request.url.path().to_string(),
        };
        self.request_log
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(format!("{} {}", request.method.as_str(), path));

        for route in &self.routes {
            let method_matches = route
                .method
                .as_deref()
                .map_or(true, |m| m.eq_ignore_ascii_case(request.method.as_str()));
            if method_matches && path.contains(&route.path_contains) {
                if route.fail {
                    return Err(TransportError::Connect("mock transport failure".into()));
                }
                return Ok(TransportResponse {
                    status: route.status,
                    json: route.json.clone(),
                });
            }
        }

        Ok(TransportResponse {
            status: self.default_status,
            json: None,
        })
    }
}
