//! A small in-memory router for standing up handlers in tests.
//!
//! Patterns are `/`-separated; a segment written as `{name}` captures one
//! path segment into [`RouteParams`], which the router stores in the
//! request extensions before calling the route's handler.
//!
//! # Example
//!
//! ```ignore
//! use htest::{Client, MockRouter, RouteParams};
//!
//! let router = MockRouter::new().get("/users/{id}", |req: http::Request<_>| async move {
//!     let id = req.extensions().get::<RouteParams>().and_then(|p| p.get("id")).unwrap_or("");
//!     http::Response::new(http_body_util::Full::from(id.to_string()))
//! });
//!
//! Client::new().to(router).get("/users/42").send_blocking().expect("42");
//! ```

use crate::client::{box_response, Handler, HandlerFuture};
use crate::consts;
use bytes::Bytes;
use http::{header, HeaderValue, Method, StatusCode};
use http_body_util::Full;
use std::sync::Arc;

/// Path parameters captured by a [`MockRouter`] match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RouteParams {
    inner: Vec<(String, String)>,
}

impl RouteParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a parameter.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Returns the value captured for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns the number of captured parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Iterates `(name, value)` pairs in pattern order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Static(String),
    Param(String),
}

fn compile(pattern: &str) -> Vec<PatternSegment> {
    split(pattern)
        .map(|seg| {
            match seg
                .strip_prefix('{')
                .and_then(|rest| rest.strip_suffix('}'))
            {
                Some(name) => PatternSegment::Param(name.to_string()),
                None => PatternSegment::Static(seg.to_string()),
            }
        })
        .collect()
}

fn split(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

struct Route {
    method: Method,
    pattern: Vec<PatternSegment>,
    handler: Arc<dyn Handler>,
}

impl Route {
    fn matches(&self, path: &str) -> Option<RouteParams> {
        let mut params = RouteParams::new();
        let mut segments = split(path);
        for expected in &self.pattern {
            let actual = segments.next()?;
            match expected {
                PatternSegment::Static(s) if s == actual => {}
                PatternSegment::Static(_) => return None,
                PatternSegment::Param(name) => params.push(name.as_str(), actual),
            }
        }
        segments.next().is_none().then_some(params)
    }
}

/// Routes requests by method and path pattern.
///
/// Unknown paths answer `404 Not Found`; a known path requested with an
/// unregistered method answers `405 Method Not Allowed` with an `Allow`
/// header. Routes are tried in registration order.
#[derive(Default)]
pub struct MockRouter {
    routes: Vec<Route>,
}

impl MockRouter {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method` on `pattern`.
    #[must_use]
    pub fn route(mut self, method: Method, pattern: &str, handler: impl Handler) -> Self {
        self.routes.push(Route {
            method,
            pattern: compile(pattern),
            handler: Arc::new(handler),
        });
        self
    }

    /// Registers a GET route.
    #[must_use]
    pub fn get(self, pattern: &str, handler: impl Handler) -> Self {
        self.route(Method::GET, pattern, handler)
    }

    /// Registers a POST route.
    #[must_use]
    pub fn post(self, pattern: &str, handler: impl Handler) -> Self {
        self.route(Method::POST, pattern, handler)
    }

    /// Registers a PUT route.
    #[must_use]
    pub fn put(self, pattern: &str, handler: impl Handler) -> Self {
        self.route(Method::PUT, pattern, handler)
    }

    /// Registers a DELETE route.
    #[must_use]
    pub fn delete(self, pattern: &str, handler: impl Handler) -> Self {
        self.route(Method::DELETE, pattern, handler)
    }

    /// Returns the number of registered routes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns true if no routes are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl std::fmt::Debug for MockRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockRouter")
            .field("routes", &self.routes.len())
            .finish()
    }
}

impl Handler for MockRouter {
    fn call(&self, mut request: http::Request<Full<Bytes>>) -> HandlerFuture {
        let path = request.uri().path().to_string();
        let mut allowed: Vec<&str> = Vec::new();

        for route in &self.routes {
            let Some(params) = route.matches(&path) else {
                continue;
            };
            if route.method == request.method() {
                tracing::trace!(method = %route.method, path = %path, "route matched");
                request.extensions_mut().insert(params);
                return route.handler.call(request);
            }
            if !allowed.contains(&route.method.as_str()) {
                allowed.push(route.method.as_str());
            }
        }

        let response = if allowed.is_empty() {
            plain(StatusCode::NOT_FOUND, "Not Found")
        } else {
            let mut response = plain(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
            if let Ok(value) = HeaderValue::try_from(allowed.join(", ")) {
                response.headers_mut().insert(header::ALLOW, value);
            }
            response
        };
        Box::pin(async move { Ok(box_response(response)) })
    }
}

fn plain(status: StatusCode, body: &'static str) -> http::Response<Full<Bytes>> {
    let mut response = http::Response::new(Full::new(Bytes::from_static(body.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(consts::mime::TEXT_PLAIN),
    );
    response
}

/// A handler that answers `{"method": ..., "path": ...}` as JSON.
pub fn echo() -> impl Handler {
    |req: http::Request<Full<Bytes>>| async move {
        let body = serde_json::json!({
            "method": req.method().as_str(),
            "path": req.uri().path(),
        });
        let mut response = http::Response::new(Full::new(Bytes::from(body.to_string())));
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(consts::mime::APPLICATION_JSON),
        );
        response
    }
}

/// A handler that always answers `status` with `body`.
pub fn fixed_response(status: StatusCode, body: impl Into<Bytes>) -> impl Handler {
    let body = body.into();
    move |_req: http::Request<Full<Bytes>>| {
        let body = body.clone();
        async move {
            let mut response = http::Response::new(Full::new(body));
            *response.status_mut() = status;
            response
        }
    }
}
