//! Test client and in-process dispatch.

use crate::config::ClientConfig;
use crate::context::AssertContext;
use crate::error::{HtestError, HtestResult};
use crate::logging;
use crate::reporter::{FailureKind, PanicReporter, Reporter, SharedReporter};
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::{BoxError, Response};
use crate::value::DEFAULT_TIME_LAYOUT;
use bytes::Bytes;
use futures_util::FutureExt;
use http::Method;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Full};
use std::any::Any;
use std::future::Future;
use std::io::Read;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

/// Response body type produced by every [`Handler`].
pub type HandlerBody = UnsyncBoxBody<Bytes, BoxError>;

/// Future returned by [`Handler::call`].
pub type HandlerFuture =
    Pin<Box<dyn Future<Output = Result<http::Response<HandlerBody>, BoxError>> + Send>>;

/// Anything that accepts a request and produces a response.
///
/// Implemented for async closures
/// `Fn(http::Request<Full<Bytes>>) -> impl Future<Output = http::Response<B>>`,
/// for [`MockRouter`](crate::MockRouter), and through [`Client::to_fn`] and
/// [`Client::to_service`] for synchronous functions and `hyper` services.
pub trait Handler: Send + Sync + 'static {
    /// Handles one request.
    fn call(&self, request: http::Request<Full<Bytes>>) -> HandlerFuture;
}

impl<F, Fut, B> Handler for F
where
    F: Fn(http::Request<Full<Bytes>>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = http::Response<B>> + Send + 'static,
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    fn call(&self, request: http::Request<Full<Bytes>>) -> HandlerFuture {
        let fut = self(request);
        Box::pin(async move { Ok(box_response(fut.await)) })
    }
}

/// Boxes a response body into the [`HandlerBody`] type.
pub fn box_response<B>(response: http::Response<B>) -> http::Response<HandlerBody>
where
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    response.map(|body| body.map_err(Into::into).boxed_unsync())
}

/// Adapter for synchronous handler functions.
struct FnHandler<F> {
    f: Arc<F>,
}

impl<F, B> Handler for FnHandler<F>
where
    F: Fn(http::Request<Bytes>) -> http::Response<B> + Send + Sync + 'static,
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    fn call(&self, request: http::Request<Full<Bytes>>) -> HandlerFuture {
        let f = Arc::clone(&self.f);
        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let body = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            };
            Ok(box_response(f(http::Request::from_parts(parts, body))))
        })
    }
}

/// Adapter for `hyper` services.
struct ServiceHandler<S> {
    service: S,
}

impl<S, B> Handler for ServiceHandler<S>
where
    S: hyper::service::Service<http::Request<Full<Bytes>>, Response = http::Response<B>>
        + Send
        + Sync
        + 'static,
    S::Future: Send + 'static,
    S::Error: Into<BoxError>,
    B: http_body::Body<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    fn call(&self, request: http::Request<Full<Bytes>>) -> HandlerFuture {
        let fut = self.service.call(request);
        Box::pin(async move { fut.await.map(box_response).map_err(Into::into) })
    }
}

/// A test client for making in-process HTTP requests.
///
/// The client never opens a socket: each request is handed straight to the
/// bound handler and its response is captured in memory.
///
/// # Example
///
/// ```ignore
/// use htest::Client;
///
/// let client = Client::new().to_fn(|_req| {
///     http::Response::new(http_body_util::Full::from(r#"{"name":"hexi"}"#))
/// });
///
/// client
///     .get("/name")
///     .send_blocking()
///     .status_ok()
///     .json()
///     .string("name", "hexi");
/// ```
#[must_use]
#[derive(Clone)]
pub struct Client {
    /// The handler under test.
    handler: Option<Arc<dyn Handler>>,
    /// Default headers to add to all requests.
    default_headers: Vec<(String, String)>,
    /// Reporter and assertion settings.
    ctx: AssertContext,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Creates a client that panics on failures (see [`PanicReporter`]).
    pub fn new() -> Self {
        Self::with_shared_reporter(Arc::new(PanicReporter::new()))
    }

    /// Creates a client reporting to `reporter`.
    pub fn with_reporter(reporter: impl Reporter + 'static) -> Self {
        Self::with_shared_reporter(Arc::new(reporter))
    }

    /// Creates a client reporting to an already shared reporter.
    pub fn with_shared_reporter(reporter: SharedReporter) -> Self {
        Self {
            handler: None,
            default_headers: Vec::new(),
            ctx: AssertContext::new(reporter, DEFAULT_TIME_LAYOUT),
        }
    }

    /// Creates a client from configuration and installs its log settings.
    ///
    /// # Errors
    ///
    /// Returns [`HtestError::Config`] if `config.log.level` is not a valid
    /// filter.
    pub fn from_config(config: &ClientConfig, reporter: SharedReporter) -> HtestResult<Self> {
        logging::init_logging(&config.log)?;
        let mut client = Self {
            handler: None,
            default_headers: Vec::new(),
            ctx: AssertContext::new(reporter, config.time_layout.as_str()),
        };
        for (name, value) in &config.default_headers {
            client = client.with_default_header(name, value);
        }
        Ok(client)
    }

    /// Binds the handler under test.
    pub fn to(mut self, handler: impl Handler) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Binds a synchronous handler function.
    pub fn to_fn<F, B>(self, f: F) -> Self
    where
        F: Fn(http::Request<Bytes>) -> http::Response<B> + Send + Sync + 'static,
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        self.to(FnHandler { f: Arc::new(f) })
    }

    /// Binds a `hyper` service.
    pub fn to_service<S, B>(self, service: S) -> Self
    where
        S: hyper::service::Service<http::Request<Full<Bytes>>, Response = http::Response<B>>
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
        S::Error: Into<BoxError>,
        B: http_body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        self.to(ServiceHandler { service })
    }

    /// Adds a default header that will be included in all requests.
    pub fn with_default_header(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Creates a GET request.
    pub fn get(&self, uri: impl AsRef<str>) -> ClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Creates a HEAD request.
    pub fn head(&self, uri: impl AsRef<str>) -> ClientRequest<'_> {
        self.request(Method::HEAD, uri)
    }

    /// Creates a TRACE request.
    pub fn trace(&self, uri: impl AsRef<str>) -> ClientRequest<'_> {
        self.request(Method::TRACE, uri)
    }

    /// Creates an OPTIONS request.
    pub fn options(&self, uri: impl AsRef<str>) -> ClientRequest<'_> {
        self.request(Method::OPTIONS, uri)
    }

    /// Creates a CONNECT request.
    pub fn connect(&self, uri: impl AsRef<str>) -> ClientRequest<'_> {
        self.request(Method::CONNECT, uri)
    }

    /// Creates a DELETE request.
    pub fn delete(&self, uri: impl AsRef<str>) -> ClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Creates a POST request with a body.
    pub fn post(&self, uri: impl AsRef<str>, body: impl Into<Bytes>) -> ClientRequest<'_> {
        self.request(Method::POST, uri).body(body)
    }

    /// Creates a PUT request with a body.
    pub fn put(&self, uri: impl AsRef<str>, body: impl Into<Bytes>) -> ClientRequest<'_> {
        self.request(Method::PUT, uri).body(body)
    }

    /// Creates a PATCH request with a body.
    pub fn patch(&self, uri: impl AsRef<str>, body: impl Into<Bytes>) -> ClientRequest<'_> {
        self.request(Method::PATCH, uri).body(body)
    }

    /// Creates a request with a custom method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> ClientRequest<'_> {
        ClientRequest::new(self, TestRequestBuilder::new(method, uri))
    }

    /// Dispatches a built request, returning errors instead of reporting them.
    async fn dispatch(&self, request: TestRequest) -> Result<Response, HtestError> {
        let handler = self
            .handler
            .clone()
            .ok_or(HtestError::NoHandler)?;

        let method = request.method.clone();
        let uri = request.uri.clone();
        tracing::debug!(%method, %uri, "dispatching request");

        let ctx = self.ctx.clone();
        let exchange = async move {
            let response = handler
                .call(request.into_http_request())
                .await
                .map_err(|e| HtestError::Handler(e.to_string()))?;
            Response::capture(response, ctx).await
        };

        let response = AssertUnwindSafe(exchange)
            .catch_unwind()
            .await
            .map_err(|payload| HtestError::HandlerPanic(panic_message(payload.as_ref())))??;

        tracing::debug!(%method, %uri, status = response.status_code(), "captured response");
        Ok(response)
    }

    fn fail_hard(&self, kind: FailureKind, error: &HtestError) -> Response {
        self.ctx.hard(kind, error.to_string());
        Response::degraded(&self.ctx)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("has_handler", &self.handler.is_some())
            .field("default_headers", &self.default_headers)
            .field("ctx", &self.ctx)
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// A request builder bound to a test client.
#[must_use]
pub struct ClientRequest<'a> {
    client: &'a Client,
    builder: TestRequestBuilder,
}

impl<'a> ClientRequest<'a> {
    fn new(client: &'a Client, builder: TestRequestBuilder) -> Self {
        let builder = builder.headers(
            client
                .default_headers
                .iter()
                .map(|(n, v)| (n.as_str(), v.as_str())),
        );
        Self { client, builder }
    }

    /// Sets a header, replacing any earlier value for the same name.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Applies a batch of headers in iteration order.
    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.builder = self.builder.headers(headers);
        self
    }

    /// Sets the Content-Type header.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Sets the Accept header.
    pub fn accept(mut self, accept: impl AsRef<str>) -> Self {
        self.builder = self.builder.accept(accept);
        self
    }

    /// Sets the Authorization header with a Bearer token.
    pub fn bearer_token(mut self, token: impl AsRef<str>) -> Self {
        self.builder = self.builder.bearer_token(token);
        self
    }

    /// Sets the raw request body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Drains `reader` into the request body.
    pub fn body_reader(mut self, reader: impl Read) -> Self {
        self.builder = self.builder.body_reader(reader);
        self
    }

    /// Sets the request body as JSON.
    pub fn json<T: serde::Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sets the request body as form-urlencoded.
    pub fn form<T: serde::Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.form(value);
        self
    }

    /// Sends the request and returns the response.
    ///
    /// Build and dispatch errors are reported as hard failures; the returned
    /// response is then degraded and all further assertions are no-ops.
    pub async fn send(self) -> Response {
        let client = self.client;
        let request = match self.builder.build() {
            Ok(request) => request,
            Err(e) => return client.fail_hard(FailureKind::Request, &e),
        };
        match client.dispatch(request).await {
            Ok(response) => response,
            Err(e) => client.fail_hard(FailureKind::Dispatch, &e),
        }
    }

    /// Sends the request on a private current-thread runtime.
    ///
    /// For plain `#[test]` functions. Must not be called from inside a
    /// `tokio` runtime.
    pub fn send_blocking(self) -> Response {
        let client = self.client;
        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.send()),
            Err(e) => client.fail_hard(
                FailureKind::Dispatch,
                &HtestError::Handler(format!("cannot start runtime: {e}")),
            ),
        }
    }

    /// Sends the request and returns a Result.
    pub async fn try_send(self) -> Result<Response, HtestError> {
        let request = self.builder.build()?;
        self.client.dispatch(request).await
    }
}
