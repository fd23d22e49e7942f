//! Request/response seam between command logic and the network.

use std::{future::Future, sync::Arc};

use roomsync_proto::{Method, Route};
use serde_json::Value;

use crate::error::TransportError;

/// One HTTP exchange to perform.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// HTTP method.
    pub method: Method,
    /// Absolute path, e.g. `/api/pieces`.
    pub path: String,
    /// JSON body for POST requests.
    pub body: Option<Value>,
}

impl Request {
    /// Request for `route` with an optional JSON body.
    pub fn new(route: &Route, body: Option<Value>) -> Self {
        Self { method: route.method(), path: route.path(), body }
    }

    /// The route this request targets, if it is a known one.
    pub fn route(&self) -> Option<Route> {
        Route::parse(self.method, &self.path)
    }
}

/// Completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,
    /// Raw body.
    pub body: Vec<u8>,
}

impl Response {
    /// Response with a JSON body.
    pub fn json(status: u16, body: &Value) -> Self {
        Self { status, body: body.to_string().into_bytes() }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs request/response exchanges with the backend.
///
/// Production uses HTTP (`transport::HttpBackend`); tests and the harness
/// use in-memory models.
pub trait Backend: Send + Sync {
    /// Send one request and wait for the complete response.
    ///
    /// Non-2xx statuses are returned as `Ok`; only a failed exchange is an
    /// error.
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send;
}

impl<B: Backend> Backend for Arc<B> {
    fn execute(
        &self,
        request: Request,
    ) -> impl Future<Output = Result<Response, TransportError>> + Send {
        (**self).execute(request)
    }
}
