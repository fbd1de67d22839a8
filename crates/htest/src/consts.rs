//! Named HTTP constants: methods, MIME types, header names, status text.
//!
//! These are immutable tables shared by every test case.

use http::StatusCode;

/// HTTP method names.
pub mod method {
    /// `GET`
    pub const GET: &str = "GET";
    /// `HEAD`
    pub const HEAD: &str = "HEAD";
    /// `POST`
    pub const POST: &str = "POST";
    /// `PUT`
    pub const PUT: &str = "PUT";
    /// `PATCH`
    pub const PATCH: &str = "PATCH";
    /// `DELETE`
    pub const DELETE: &str = "DELETE";
    /// `CONNECT`
    pub const CONNECT: &str = "CONNECT";
    /// `OPTIONS`
    pub const OPTIONS: &str = "OPTIONS";
    /// `TRACE`
    pub const TRACE: &str = "TRACE";
}

/// MIME types.
pub mod mime {
    /// `application/json`
    pub const APPLICATION_JSON: &str = "application/json";
    /// `application/json; charset=UTF-8`
    pub const APPLICATION_JSON_UTF8: &str = "application/json; charset=UTF-8";
    /// `application/javascript`
    pub const APPLICATION_JAVASCRIPT: &str = "application/javascript";
    /// `application/javascript; charset=UTF-8`
    pub const APPLICATION_JAVASCRIPT_UTF8: &str = "application/javascript; charset=UTF-8";
    /// `application/xml`
    pub const APPLICATION_XML: &str = "application/xml";
    /// `application/xml; charset=UTF-8`
    pub const APPLICATION_XML_UTF8: &str = "application/xml; charset=UTF-8";
    /// `text/xml`
    pub const TEXT_XML: &str = "text/xml";
    /// `text/xml; charset=UTF-8`
    pub const TEXT_XML_UTF8: &str = "text/xml; charset=UTF-8";
    /// `application/x-www-form-urlencoded`
    pub const APPLICATION_FORM: &str = "application/x-www-form-urlencoded";
    /// `application/protobuf`
    pub const APPLICATION_PROTOBUF: &str = "application/protobuf";
    /// `application/msgpack`
    pub const APPLICATION_MSGPACK: &str = "application/msgpack";
    /// `text/html`
    pub const TEXT_HTML: &str = "text/html";
    /// `text/html; charset=UTF-8`
    pub const TEXT_HTML_UTF8: &str = "text/html; charset=UTF-8";
    /// `text/plain`
    pub const TEXT_PLAIN: &str = "text/plain";
    /// `text/plain; charset=UTF-8`
    pub const TEXT_PLAIN_UTF8: &str = "text/plain; charset=UTF-8";
    /// `multipart/form-data`
    pub const MULTIPART_FORM: &str = "multipart/form-data";
    /// `application/octet-stream`
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

/// Header names in canonical form.
pub mod header {
    /// `Accept`
    pub const ACCEPT: &str = "Accept";
    /// `Accept-Encoding`
    pub const ACCEPT_ENCODING: &str = "Accept-Encoding";
    /// `Allow`
    pub const ALLOW: &str = "Allow";
    /// `Authorization`
    pub const AUTHORIZATION: &str = "Authorization";
    /// `Content-Disposition`
    pub const CONTENT_DISPOSITION: &str = "Content-Disposition";
    /// `Content-Encoding`
    pub const CONTENT_ENCODING: &str = "Content-Encoding";
    /// `Content-Length`
    pub const CONTENT_LENGTH: &str = "Content-Length";
    /// `Content-Type`
    pub const CONTENT_TYPE: &str = "Content-Type";
    /// `Cookie`
    pub const COOKIE: &str = "Cookie";
    /// `Set-Cookie`
    pub const SET_COOKIE: &str = "Set-Cookie";
    /// `If-Modified-Since`
    pub const IF_MODIFIED_SINCE: &str = "If-Modified-Since";
    /// `Last-Modified`
    pub const LAST_MODIFIED: &str = "Last-Modified";
    /// `Location`
    pub const LOCATION: &str = "Location";
    /// `Upgrade`
    pub const UPGRADE: &str = "Upgrade";
    /// `Vary`
    pub const VARY: &str = "Vary";
    /// `WWW-Authenticate`
    pub const WWW_AUTHENTICATE: &str = "WWW-Authenticate";
    /// `X-Forwarded-For`
    pub const X_FORWARDED_FOR: &str = "X-Forwarded-For";
    /// `X-Forwarded-Proto`
    pub const X_FORWARDED_PROTO: &str = "X-Forwarded-Proto";
    /// `X-Forwarded-Protocol`
    pub const X_FORWARDED_PROTOCOL: &str = "X-Forwarded-Protocol";
    /// `X-Forwarded-Ssl`
    pub const X_FORWARDED_SSL: &str = "X-Forwarded-Ssl";
    /// `X-Url-Scheme`
    pub const X_URL_SCHEME: &str = "X-Url-Scheme";
    /// `X-HTTP-Method-Override`
    pub const X_HTTP_METHOD_OVERRIDE: &str = "X-HTTP-Method-Override";
    /// `X-Real-IP`
    pub const X_REAL_IP: &str = "X-Real-IP";
    /// `X-Request-ID`
    pub const X_REQUEST_ID: &str = "X-Request-ID";
    /// `Server`
    pub const SERVER: &str = "Server";
    /// `Origin`
    pub const ORIGIN: &str = "Origin";
    /// `Access-Control-Request-Method`
    pub const ACCESS_CONTROL_REQUEST_METHOD: &str = "Access-Control-Request-Method";
    /// `Access-Control-Request-Headers`
    pub const ACCESS_CONTROL_REQUEST_HEADERS: &str = "Access-Control-Request-Headers";
    /// `Access-Control-Allow-Origin`
    pub const ACCESS_CONTROL_ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
    /// `Access-Control-Allow-Methods`
    pub const ACCESS_CONTROL_ALLOW_METHODS: &str = "Access-Control-Allow-Methods";
    /// `Access-Control-Allow-Headers`
    pub const ACCESS_CONTROL_ALLOW_HEADERS: &str = "Access-Control-Allow-Headers";
    /// `Access-Control-Allow-Credentials`
    pub const ACCESS_CONTROL_ALLOW_CREDENTIALS: &str = "Access-Control-Allow-Credentials";
    /// `Access-Control-Expose-Headers`
    pub const ACCESS_CONTROL_EXPOSE_HEADERS: &str = "Access-Control-Expose-Headers";
    /// `Access-Control-Max-Age`
    pub const ACCESS_CONTROL_MAX_AGE: &str = "Access-Control-Max-Age";
    /// `Strict-Transport-Security`
    pub const STRICT_TRANSPORT_SECURITY: &str = "Strict-Transport-Security";
    /// `X-Content-Type-Options`
    pub const X_CONTENT_TYPE_OPTIONS: &str = "X-Content-Type-Options";
    /// `X-XSS-Protection`
    pub const X_XSS_PROTECTION: &str = "X-XSS-Protection";
    /// `X-Frame-Options`
    pub const X_FRAME_OPTIONS: &str = "X-Frame-Options";
    /// `Content-Security-Policy`
    pub const CONTENT_SECURITY_POLICY: &str = "Content-Security-Policy";
    /// `X-CSRF-Token`
    pub const X_CSRF_TOKEN: &str = "X-CSRF-Token";
}

/// Returns the status line text for a code, e.g. `"404 Not Found"`.
///
/// Codes without a registered reason phrase render as the bare number.
#[must_use]
pub fn status_text(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => format!("{} {}", status.as_u16(), reason),
        None => status.as_u16().to_string(),
    }
}

/// Body-less methods default to an empty body when none is supplied.
#[must_use]
pub fn is_bodyless(method: &http::Method) -> bool {
    matches!(
        method.as_str(),
        method::GET
            | method::HEAD
            | method::TRACE
            | method::OPTIONS
            | method::CONNECT
            | method::DELETE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        assert_eq!(status_text(StatusCode::OK), "200 OK");
        assert_eq!(status_text(StatusCode::NOT_FOUND), "404 Not Found");
        assert_eq!(status_text(StatusCode::IM_A_TEAPOT), "418 I'm a teapot");
        let unknown = StatusCode::from_u16(599).unwrap();
        assert_eq!(status_text(unknown), "599");
    }

    #[test]
    fn test_bodyless_methods() {
        assert!(is_bodyless(&http::Method::GET));
        assert!(is_bodyless(&http::Method::DELETE));
        assert!(!is_bodyless(&http::Method::POST));
        assert!(!is_bodyless(&http::Method::PATCH));
    }

    #[test]
    fn test_header_names_parse() {
        for name in [
            header::X_XSS_PROTECTION,
            header::WWW_AUTHENTICATE,
            header::ACCESS_CONTROL_MAX_AGE,
        ] {
            assert!(http::HeaderName::try_from(name).is_ok(), "{name}");
        }
    }
}
