//! Test response wrapper.

use crate::consts::{self, header as names, mime};
use crate::context::AssertContext;
use crate::error::HtestError;
use crate::json::{preview, JsonView};
use crate::reporter::{FailureKind, SharedReporter};
use crate::value::DEFAULT_TIME_LAYOUT;
use crate::xml::{self, XmlView};
use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use std::fmt;

/// Boxed error type accepted from handler bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A captured response with chained assertions.
///
/// Assertion methods record a failure on mismatch and return `&Self`, so a
/// single expression can check status, headers and body together:
///
/// ```ignore
/// client
///     .get("/users/1")
///     .send()
///     .await
///     .status_ok()
///     .header_content_type("application/json")
///     .json()
///     .string("name", "hexi");
/// ```
///
/// A response whose dispatch failed hard is *degraded*: every assertion on it
/// and on views derived from it is a no-op.
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    ctx: AssertContext,
}

impl Response {
    /// Creates a response from raw parts (for testing views and assertions
    /// without a handler).
    pub fn new(
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
        reporter: SharedReporter,
    ) -> Self {
        Self::from_parts(
            status,
            headers,
            body,
            AssertContext::new(reporter, DEFAULT_TIME_LAYOUT),
        )
    }

    pub(crate) fn from_parts(
        status: StatusCode,
        headers: HeaderMap,
        body: Bytes,
        ctx: AssertContext,
    ) -> Self {
        Self {
            status,
            headers,
            body,
            ctx,
        }
    }

    /// Captures an HTTP response, draining its body completely.
    pub(crate) async fn capture<B>(
        response: http::Response<B>,
        ctx: AssertContext,
    ) -> Result<Self, HtestError>
    where
        B: http_body::Body<Data = Bytes>,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = response.into_parts();
        let body_bytes = body
            .collect()
            .await
            .map_err(|e| HtestError::BodyRead(e.into().to_string()))?
            .to_bytes();

        Ok(Self::from_parts(parts.status, parts.headers, body_bytes, ctx))
    }

    /// A placeholder returned after a hard failure.
    pub(crate) fn degraded(ctx: &AssertContext) -> Self {
        Self::from_parts(
            StatusCode::INTERNAL_SERVER_ERROR,
            HeaderMap::new(),
            Bytes::new(),
            ctx.degrade(),
        )
    }

    /// Returns true if this response stands in for a failed dispatch.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.ctx.is_degraded()
    }

    /// Returns the status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the status code as a u16.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// Returns the status line text, e.g. `"200 OK"`.
    #[must_use]
    pub fn status_text(&self) -> String {
        consts::status_text(self.status)
    }

    /// Returns true if the status is successful (2xx).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns true if the status is a client error (4xx).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// Returns true if the status is a server error (5xx).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// Returns a reference to the headers.
    #[must_use]
    pub fn header_map(&self) -> &HeaderMap {
        &self.headers
    }

    /// Gets the first header value by name.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// Gets the first header value as a string.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// Gets every value of a header, in the order the handler wrote them.
    #[must_use]
    pub fn header_values(&self, name: impl AsRef<str>) -> Vec<&str> {
        self.headers
            .get_all(name.as_ref())
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect()
    }

    /// Returns the Content-Type header value.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// Returns the raw body bytes.
    #[must_use]
    pub fn bytes(&self) -> Bytes {
        self.body.clone()
    }

    /// Returns the body as a string.
    ///
    /// Invalid UTF-8 is replaced lossily and recorded as a body failure.
    pub fn string(&self) -> String {
        match std::str::from_utf8(&self.body) {
            Ok(text) => text.to_string(),
            Err(e) => {
                self.ctx
                    .soft(FailureKind::Body, format!("body is not valid UTF-8: {e}"));
                String::from_utf8_lossy(&self.body).into_owned()
            }
        }
    }

    // Assertion methods

    /// Asserts that the status code equals `expected`.
    pub fn code(&self, expected: u16) -> &Self {
        if self.status.as_u16() != expected {
            self.ctx.soft(
                FailureKind::Status,
                format!(
                    "expected status {}, got {}",
                    expected,
                    self.status.as_u16()
                ),
            );
        }
        self
    }

    /// Asserts that the status line equals `expected`, e.g. `"404 Not Found"`.
    pub fn status_line(&self, expected: &str) -> &Self {
        let actual = self.status_text();
        if actual != expected {
            self.ctx.soft(
                FailureKind::Status,
                format!("expected status '{expected}', got '{actual}'"),
            );
        }
        self
    }

    /// Asserts that the status equals `expected`.
    pub fn status_is(&self, expected: StatusCode) -> &Self {
        if self.status != expected {
            self.ctx.soft(
                FailureKind::Status,
                format!(
                    "expected status {}, got {}",
                    consts::status_text(expected),
                    self.status_text()
                ),
            );
        }
        self
    }

    /// Asserts that the first value of header `name` equals `expected`.
    ///
    /// The comparison is case-sensitive.
    pub fn headers(&self, name: &str, expected: &str) -> &Self {
        let actual = self.header(name).map(|v| String::from_utf8_lossy(v.as_bytes()));
        match actual {
            Some(actual) if actual == expected => {}
            Some(actual) => self.ctx.soft(
                FailureKind::Header,
                format!("header '{name}': expected '{expected}', got '{actual}'"),
            ),
            None => self.ctx.soft(
                FailureKind::Header,
                format!("header '{name}': expected '{expected}', got <missing>"),
            ),
        }
        self
    }

    /// Asserts that the raw body equals `expected`.
    pub fn expect(&self, expected: impl AsRef<[u8]>) -> &Self {
        let expected = expected.as_ref();
        if self.body.as_ref() != expected {
            self.ctx.soft(
                FailureKind::Body,
                format!(
                    "body mismatch: expected {}, got {}",
                    preview(expected),
                    preview(&self.body)
                ),
            );
        }
        self
    }

    /// Decodes the body into `target`, choosing JSON or XML by content type.
    ///
    /// `application/json` and `+json` types decode as JSON; `application/xml`,
    /// `text/xml` and `+xml` types as XML. Without a content type the first
    /// non-space byte decides (`<` means XML). Other types are a decode
    /// failure.
    pub fn bind<T: DeserializeOwned>(&self, target: &mut T) -> &Self {
        if self.ctx.is_degraded() {
            return self;
        }
        match self.decode() {
            Ok(value) => *target = value,
            Err(e) => self
                .ctx
                .soft(FailureKind::Decode, format!("cannot bind body: {e}")),
        }
        self
    }

    fn decode<T: DeserializeOwned>(&self) -> Result<T, HtestError> {
        match body_format(self.content_type(), &self.body)? {
            BodyFormat::Json => Ok(serde_json::from_slice(&self.body)?),
            BodyFormat::Xml => xml::decode(&self.body),
        }
    }

    /// Promotes the body to a JSON view.
    pub fn json(&self) -> JsonView {
        JsonView::with_context(self.body.clone(), self.ctx.clone())
    }

    /// Promotes the body to an XML view.
    pub fn xml(&self) -> XmlView {
        XmlView::with_context(self.body.clone(), self.ctx.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyFormat {
    Json,
    Xml,
}

fn body_format(content_type: Option<&str>, body: &[u8]) -> Result<BodyFormat, HtestError> {
    let Some(content_type) = content_type else {
        let first = body.iter().find(|b| !b.is_ascii_whitespace());
        return Ok(if first == Some(&b'<') {
            BodyFormat::Xml
        } else {
            BodyFormat::Json
        });
    };

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if essence == mime::APPLICATION_JSON || essence.ends_with("+json") {
        Ok(BodyFormat::Json)
    } else if essence == mime::APPLICATION_XML
        || essence == mime::TEXT_XML
        || essence.ends_with("+xml")
    {
        Ok(BodyFormat::Xml)
    } else {
        Err(HtestError::UnsupportedContentType(content_type.to_string()))
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .field("degraded", &self.ctx.is_degraded())
            .finish()
    }
}

/// Generates one status assertion per well-known code.
macro_rules! status_assertions {
    ($($method:ident => $code:ident),* $(,)?) => {
        impl Response {
            $(
                #[doc = concat!("Asserts that the status is `", stringify!($code), "`.")]
                pub fn $method(&self) -> &Self {
                    self.status_is(StatusCode::$code)
                }
            )*
        }

        /// Every named status assertion and the code it checks.
        pub const STATUS_TABLE: &[(&str, StatusCode)] = &[
            $((stringify!($method), StatusCode::$code)),*
        ];
    };
}

/// Generates one header assertion per well-known header.
macro_rules! header_assertions {
    ($($method:ident => $name:ident),* $(,)?) => {
        impl Response {
            $(
                #[doc = concat!("Asserts the first `", stringify!($name), "` header value.")]
                pub fn $method(&self, expected: &str) -> &Self {
                    self.headers(names::$name, expected)
                }
            )*
        }

        /// Every named header assertion and the header it checks.
        pub const HEADER_TABLE: &[(&str, &str)] = &[
            $((stringify!($method), names::$name)),*
        ];
    };
}

status_assertions! {
    status_continue => CONTINUE,
    status_switching_protocols => SWITCHING_PROTOCOLS,
    status_processing => PROCESSING,
    status_ok => OK,
    status_created => CREATED,
    status_accepted => ACCEPTED,
    status_non_authoritative_info => NON_AUTHORITATIVE_INFORMATION,
    status_no_content => NO_CONTENT,
    status_reset_content => RESET_CONTENT,
    status_partial_content => PARTIAL_CONTENT,
    status_multi_status => MULTI_STATUS,
    status_already_reported => ALREADY_REPORTED,
    status_im_used => IM_USED,
    status_multiple_choices => MULTIPLE_CHOICES,
    status_moved_permanently => MOVED_PERMANENTLY,
    status_found => FOUND,
    status_see_other => SEE_OTHER,
    status_not_modified => NOT_MODIFIED,
    status_use_proxy => USE_PROXY,
    status_temporary_redirect => TEMPORARY_REDIRECT,
    status_permanent_redirect => PERMANENT_REDIRECT,
    status_bad_request => BAD_REQUEST,
    status_unauthorized => UNAUTHORIZED,
    status_payment_required => PAYMENT_REQUIRED,
    status_forbidden => FORBIDDEN,
    status_not_found => NOT_FOUND,
    status_method_not_allowed => METHOD_NOT_ALLOWED,
    status_not_acceptable => NOT_ACCEPTABLE,
    status_proxy_auth_required => PROXY_AUTHENTICATION_REQUIRED,
    status_request_timeout => REQUEST_TIMEOUT,
    status_conflict => CONFLICT,
    status_gone => GONE,
    status_length_required => LENGTH_REQUIRED,
    status_precondition_failed => PRECONDITION_FAILED,
    status_request_entity_too_large => PAYLOAD_TOO_LARGE,
    status_request_uri_too_long => URI_TOO_LONG,
    status_unsupported_media_type => UNSUPPORTED_MEDIA_TYPE,
    status_requested_range_not_satisfiable => RANGE_NOT_SATISFIABLE,
    status_expectation_failed => EXPECTATION_FAILED,
    status_teapot => IM_A_TEAPOT,
    status_unprocessable_entity => UNPROCESSABLE_ENTITY,
    status_locked => LOCKED,
    status_failed_dependency => FAILED_DEPENDENCY,
    status_upgrade_required => UPGRADE_REQUIRED,
    status_precondition_required => PRECONDITION_REQUIRED,
    status_too_many_requests => TOO_MANY_REQUESTS,
    status_request_header_fields_too_large => REQUEST_HEADER_FIELDS_TOO_LARGE,
    status_unavailable_for_legal_reasons => UNAVAILABLE_FOR_LEGAL_REASONS,
    status_internal_server_error => INTERNAL_SERVER_ERROR,
    status_not_implemented => NOT_IMPLEMENTED,
    status_bad_gateway => BAD_GATEWAY,
    status_service_unavailable => SERVICE_UNAVAILABLE,
    status_gateway_timeout => GATEWAY_TIMEOUT,
    status_http_version_not_supported => HTTP_VERSION_NOT_SUPPORTED,
    status_variant_also_negotiates => VARIANT_ALSO_NEGOTIATES,
    status_insufficient_storage => INSUFFICIENT_STORAGE,
    status_loop_detected => LOOP_DETECTED,
    status_not_extended => NOT_EXTENDED,
    status_network_authentication_required => NETWORK_AUTHENTICATION_REQUIRED,
}

header_assertions! {
    header_accept => ACCEPT,
    header_accept_encoding => ACCEPT_ENCODING,
    header_allow => ALLOW,
    header_authorization => AUTHORIZATION,
    header_content_disposition => CONTENT_DISPOSITION,
    header_content_encoding => CONTENT_ENCODING,
    header_content_length => CONTENT_LENGTH,
    header_content_type => CONTENT_TYPE,
    header_cookie => COOKIE,
    header_set_cookie => SET_COOKIE,
    header_if_modified_since => IF_MODIFIED_SINCE,
    header_last_modified => LAST_MODIFIED,
    header_location => LOCATION,
    header_upgrade => UPGRADE,
    header_vary => VARY,
    header_www_authenticate => WWW_AUTHENTICATE,
    header_x_forwarded_for => X_FORWARDED_FOR,
    header_x_forwarded_proto => X_FORWARDED_PROTO,
    header_x_forwarded_protocol => X_FORWARDED_PROTOCOL,
    header_x_forwarded_ssl => X_FORWARDED_SSL,
    header_x_url_scheme => X_URL_SCHEME,
    header_x_http_method_override => X_HTTP_METHOD_OVERRIDE,
    header_x_real_ip => X_REAL_IP,
    header_x_request_id => X_REQUEST_ID,
    header_server => SERVER,
    header_origin => ORIGIN,
    header_access_control_request_method => ACCESS_CONTROL_REQUEST_METHOD,
    header_access_control_request_headers => ACCESS_CONTROL_REQUEST_HEADERS,
    header_access_control_allow_origin => ACCESS_CONTROL_ALLOW_ORIGIN,
    header_access_control_allow_methods => ACCESS_CONTROL_ALLOW_METHODS,
    header_access_control_allow_headers => ACCESS_CONTROL_ALLOW_HEADERS,
    header_access_control_allow_credentials => ACCESS_CONTROL_ALLOW_CREDENTIALS,
    header_access_control_expose_headers => ACCESS_CONTROL_EXPOSE_HEADERS,
    header_access_control_max_age => ACCESS_CONTROL_MAX_AGE,
    header_strict_transport_security => STRICT_TRANSPORT_SECURITY,
    header_x_content_type_options => X_CONTENT_TYPE_OPTIONS,
    header_x_xss_protection => X_XSS_PROTECTION,
    header_x_frame_options => X_FRAME_OPTIONS,
    header_content_security_policy => CONTENT_SECURITY_POLICY,
    header_x_csrf_token => X_CSRF_TOKEN,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::Recorder;
    use serde::Deserialize;
    use std::sync::Arc;

    const USER_JSON: &str = "{\n\t\"id\": 1,\n\t\"name\": \"hexi\"\n}";

    fn create_response(
        status: u16,
        content_type: Option<&str>,
        body: &str,
    ) -> (Response, Recorder) {
        let recorder = Recorder::new();
        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(content_type).unwrap());
        }
        let response = Response::new(
            StatusCode::from_u16(status).unwrap(),
            headers,
            Bytes::from(body.to_string()),
            Arc::new(recorder.clone()),
        );
        (response, recorder)
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct User {
        id: u32,
        name: String,
    }

    #[test]
    fn test_status_accessors() {
        let (response, _) = create_response(404, None, "");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.status_code(), 404);
        assert_eq!(response.status_text(), "404 Not Found");
        assert!(response.is_client_error());
        assert!(!response.is_success());
        assert!(!response.is_server_error());
    }

    #[test]
    fn test_status_assertions_pass() {
        let (response, recorder) = create_response(200, None, "");
        response
            .status_ok()
            .code(200)
            .status_line("200 OK")
            .status_is(StatusCode::OK);
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_status_mismatch_reports_once() {
        let (response, recorder) = create_response(400, None, "");
        response.status_ok();

        let failures = recorder.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::Status);
        assert!(failures[0].message.contains("200"));
        assert!(failures[0].message.contains("400"));
    }

    #[test]
    fn test_every_status_method_matches_its_code() {
        for (name, code) in STATUS_TABLE {
            let (response, recorder) = create_response(code.as_u16(), None, "");
            response.status_is(*code).code(code.as_u16());
            assert!(recorder.is_empty(), "{name}");
        }
        assert_eq!(STATUS_TABLE.len(), 59);
    }

    #[test]
    fn test_named_statuses() {
        let (response, recorder) = create_response(418, None, "");
        response.status_teapot().status_not_found();
        assert_eq!(recorder.count(FailureKind::Status), 1);

        let (response, recorder) = create_response(413, None, "");
        response.status_request_entity_too_large();
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_header_assertions() {
        let (response, recorder) = create_response(200, Some("application/json"), "{}");
        response
            .header_content_type("application/json")
            .headers("content-type", "application/json");
        assert!(recorder.is_empty());

        response.header_content_type("Application/JSON");
        response.header_x_request_id("abc");
        let failures = recorder.failures();
        assert_eq!(failures.len(), 2);
        assert!(failures[0].message.contains("got 'application/json'"));
        assert!(failures[1].message.contains("<missing>"));
    }

    #[test]
    fn test_header_table_names_are_valid() {
        for (method, name) in HEADER_TABLE {
            assert!(http::HeaderName::try_from(*name).is_ok(), "{method}");
        }
    }

    #[test]
    fn test_multi_valued_headers() {
        let recorder = Recorder::new();
        let mut headers = HeaderMap::new();
        headers.append(header::SET_COOKIE, HeaderValue::from_static("a=1"));
        headers.append(header::SET_COOKIE, HeaderValue::from_static("b=2"));
        let response = Response::new(
            StatusCode::OK,
            headers,
            Bytes::new(),
            Arc::new(recorder.clone()),
        );

        assert_eq!(response.header_values("set-cookie"), vec!["a=1", "b=2"]);
        response.header_set_cookie("a=1");
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_body_accessors() {
        let (response, recorder) = create_response(200, None, USER_JSON);
        assert_eq!(response.string(), USER_JSON);
        assert_eq!(response.bytes().as_ref(), USER_JSON.as_bytes());
        response.expect(USER_JSON);
        assert!(recorder.is_empty());

        response.expect("{}");
        assert_eq!(recorder.count(FailureKind::Body), 1);
    }

    #[test]
    fn test_non_utf8_string() {
        let recorder = Recorder::new();
        let response = Response::new(
            StatusCode::OK,
            HeaderMap::new(),
            Bytes::from_static(&[0xff, 0xfe]),
            Arc::new(recorder.clone()),
        );
        let _ = response.string();
        assert_eq!(recorder.count(FailureKind::Body), 1);
    }

    #[test]
    fn test_bind_json() {
        let (response, recorder) =
            create_response(200, Some("application/json; charset=UTF-8"), USER_JSON);
        let mut user = User::default();
        response.bind(&mut user);
        assert!(recorder.is_empty());
        assert_eq!(user.name, "hexi");
    }

    #[test]
    fn test_bind_xml() {
        let (response, recorder) = create_response(
            200,
            Some("text/xml"),
            "<user><id>1</id><name>hexi</name></user>",
        );
        let mut user = User::default();
        response.bind(&mut user);
        assert!(recorder.is_empty(), "{:?}", recorder.failures());
        assert_eq!(user.id, 1);
    }

    #[test]
    fn test_bind_sniffs_without_content_type() {
        let (response, recorder) = create_response(200, None, USER_JSON);
        let mut user = User::default();
        response.bind(&mut user);
        assert!(recorder.is_empty());
        assert_eq!(user.id, 1);

        let (response, recorder) =
            create_response(200, None, "  <user><id>2</id><name>x</name></user>");
        response.bind(&mut user);
        assert!(recorder.is_empty());
        assert_eq!(user.id, 2);
    }

    #[test]
    fn test_bind_unsupported_content_type() {
        let (response, recorder) = create_response(200, Some("text/html"), USER_JSON);
        let mut user = User::default();
        response.bind(&mut user);
        let failures = recorder.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::Decode);
        assert!(failures[0].message.contains("text/html"));
    }

    #[test]
    fn test_bind_malformed() {
        let (response, recorder) = create_response(200, Some("application/json"), "{\"id\":");
        let mut user = User::default();
        response.bind(&mut user);
        assert_eq!(recorder.count(FailureKind::Decode), 1);
    }

    #[test]
    fn test_degraded_response_is_silent() {
        let recorder = Recorder::new();
        let ctx = AssertContext::new(Arc::new(recorder.clone()), DEFAULT_TIME_LAYOUT);
        let response = Response::degraded(&ctx);

        let mut user = User::default();
        response
            .status_ok()
            .code(201)
            .header_content_type("application/json")
            .expect("anything")
            .bind(&mut user);
        response.json().exist("name").string("name", "hexi").not_empty();
        response.xml().exist("user").json().not_empty();

        assert!(response.is_degraded());
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_views_share_body() {
        let (response, recorder) = create_response(200, Some("application/json"), USER_JSON);
        let first = response.json();
        let second = response.json();
        first.string("name", "hexi");
        second.int("id", 1);
        assert_eq!(first.raw().as_ptr(), second.raw().as_ptr());
        assert!(recorder.is_empty());
    }
}
