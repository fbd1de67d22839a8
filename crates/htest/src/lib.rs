//! # htest
//!
//! Fluent assertions for HTTP handlers, run in-process without binding a
//! port.
//!
//! A [`Client`] hands each request straight to the handler under test and
//! wraps what comes back in a [`Response`]. Every assertion returns the
//! wrapper it was called on, so checks chain; a failed check is handed to a
//! [`Reporter`] and the chain keeps going.
//!
//! ## Key Features
//!
//! - **In-Memory Dispatch**: async closures, sync functions, `hyper` services
//!   or a [`MockRouter`]
//! - **Status and Header Assertions**: one method per well-known code and
//!   header, plus generic forms
//! - **Body Assertions**: path queries over JSON and XML bodies with typed
//!   coercion (`string`, `int`, `uint`, `float`, `bool`, `time`)
//! - **XML Bridge**: any XML body can be queried as JSON via [`XmlView::json`]
//! - **Pluggable Reporting**: panic at the end of the test by default, or
//!   collect failures with a [`Recorder`]
//!
//! ## Example
//!
//! ```ignore
//! use htest::Client;
//!
//! #[tokio::test]
//! async fn test_name() {
//!     let client = Client::new().to_fn(|_req| {
//!         http::Response::builder()
//!             .header("content-type", "application/json")
//!             .body(http_body_util::Full::from(r#"{"name":"hexi","age":3}"#))
//!             .unwrap()
//!     });
//!
//!     client
//!         .get("/name")
//!         .send()
//!         .await
//!         .status_ok()
//!         .header_content_type("application/json")
//!         .json()
//!         .string("name", "hexi")
//!         .int("age", 3)
//!         .not_exist("stuid");
//! }
//! ```
//!
//! ## Paths
//!
//! Paths are dotted keys with bracketed or numeric indices: `user.name`,
//! `items[0].id`, `items.0.id`. A literal dot inside a key is written `\.`.
//! For XML bodies the root element is the first segment (`user.name` for
//! `<user><name>hexi</name></user>`); attributes are `-attr` and mixed text
//! is `#text`.

#![doc(html_root_url = "https://docs.rs/htest/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
pub mod config;
pub mod consts;
mod context;
mod error;
mod json;
pub mod logging;
mod mock;
mod path;
mod reporter;
mod request;
mod response;
mod value;
mod xml;

pub use client::{box_response, Client, ClientRequest, Handler, HandlerBody, HandlerFuture};
pub use config::ClientConfig;
pub use error::{HtestError, HtestResult};
pub use json::JsonView;
pub use logging::LogConfig;
pub use mock::{echo, fixed_response, MockRouter, RouteParams};
pub use reporter::{Failure, FailureKind, PanicReporter, Recorder, Reporter, SharedReporter};
pub use request::{TestRequest, TestRequestBuilder};
pub use response::{BoxError, Response, HEADER_TABLE, STATUS_TABLE};
pub use value::DEFAULT_TIME_LAYOUT;
pub use xml::{parse_document, XmlElement, XmlView};
