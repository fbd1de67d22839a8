//! JSON body assertions.

use crate::context::AssertContext;
use crate::path;
use crate::reporter::{FailureKind, SharedReporter};
use crate::value::{self, Parsed, DEFAULT_TIME_LAYOUT};
use bytes::Bytes;
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;

/// An immutable, parsed view of a JSON body.
///
/// Every assertion reports violations to the view's reporter and returns
/// `&Self`, so a single expression can check several fields:
///
/// ```ignore
/// response
///     .json()
///     .exist("name")
///     .not_exist("stuid")
///     .string("name", "hexi")
///     .int("age", 18);
/// ```
pub struct JsonView {
    raw: Bytes,
    parsed: Parsed<Value>,
    ctx: AssertContext,
}

impl JsonView {
    /// Parses `raw` into a view reporting to `reporter`.
    ///
    /// A body that fails to parse is reported once as a
    /// [`FailureKind::Parse`] failure and still yields a view. Path and typed
    /// assertions on it are skipped; emptiness checks treat it as empty.
    pub fn new(raw: impl Into<Bytes>, reporter: SharedReporter) -> Self {
        Self::with_context(
            raw.into(),
            AssertContext::new(reporter, DEFAULT_TIME_LAYOUT),
        )
    }

    pub(crate) fn with_context(raw: Bytes, ctx: AssertContext) -> Self {
        let parsed = parse(&raw);
        if let Parsed::Malformed(reason) = &parsed {
            ctx.soft(FailureKind::Parse, format!("body is not valid JSON: {reason}"));
        }
        Self { raw, parsed, ctx }
    }

    pub(crate) fn from_parts(raw: Bytes, parsed: Parsed<Value>, ctx: AssertContext) -> Self {
        Self { raw, parsed, ctx }
    }

    /// Returns the raw body this view was built from.
    #[must_use]
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Returns the parsed document, if the body parsed.
    #[must_use]
    pub fn document(&self) -> Option<&Value> {
        self.parsed.document()
    }

    /// Returns the value at `path`, if it resolves.
    #[must_use]
    pub fn value(&self, path: &str) -> Option<&Value> {
        self.parsed.document().and_then(|doc| path::lookup(doc, path))
    }

    /// Asserts that `path` resolves to a value. `null` counts as present.
    pub fn exist(&self, path: &str) -> &Self {
        match self.resolve(path) {
            Err(reason) => value::skip_unparsed(path, &reason),
            Ok(None) => self.ctx.soft(
                FailureKind::PathMissing,
                format!("path '{path}' should exist"),
            ),
            Ok(Some(_)) => {}
        }
        self
    }

    /// Asserts that `path` does not resolve.
    pub fn not_exist(&self, path: &str) -> &Self {
        match self.resolve(path) {
            Err(reason) => value::skip_unparsed(path, &reason),
            Ok(Some(found)) => self.ctx.soft(
                FailureKind::PathPresent,
                format!(
                    "path '{path}' should not exist, found {}",
                    value::describe(found)
                ),
            ),
            Ok(None) => {}
        }
        self
    }

    /// Asserts that the string at `path` equals `expected`.
    ///
    /// Numbers and booleans compare by their textual form.
    pub fn string(&self, path: &str, expected: &str) -> &Self {
        let expected = expected.to_string();
        value::check(
            &self.ctx,
            self.resolve_owned(path),
            path,
            "string",
            &expected,
            value::to_string,
        );
        self
    }

    /// Asserts that the integer at `path` equals `expected`.
    pub fn int(&self, path: &str, expected: i64) -> &Self {
        value::check(
            &self.ctx,
            self.resolve_owned(path),
            path,
            "int",
            &expected,
            value::to_i64,
        );
        self
    }

    /// Asserts that the unsigned integer at `path` equals `expected`.
    pub fn uint(&self, path: &str, expected: u64) -> &Self {
        value::check(
            &self.ctx,
            self.resolve_owned(path),
            path,
            "uint",
            &expected,
            value::to_u64,
        );
        self
    }

    /// Asserts that the number at `path` equals `expected`.
    pub fn float(&self, path: &str, expected: f64) -> &Self {
        value::check(
            &self.ctx,
            self.resolve_owned(path),
            path,
            "float",
            &expected,
            value::to_f64,
        );
        self
    }

    /// Asserts that the boolean at `path` equals `expected`.
    pub fn bool(&self, path: &str, expected: bool) -> &Self {
        value::check(
            &self.ctx,
            self.resolve_owned(path),
            path,
            "bool",
            &expected,
            value::to_bool,
        );
        self
    }

    /// Shorthand for `bool(path, true)`.
    pub fn is_true(&self, path: &str) -> &Self {
        self.bool(path, true)
    }

    /// Shorthand for `bool(path, false)`.
    pub fn is_false(&self, path: &str) -> &Self {
        self.bool(path, false)
    }

    /// Asserts that the timestamp string at `path` equals `expected`.
    ///
    /// `layout` is a `chrono` format string; `None` uses the client's
    /// configured layout (by default `%Y-%m-%d %H:%M:%S`).
    pub fn time(&self, path: &str, expected: NaiveDateTime, layout: Option<&str>) -> &Self {
        let layout = layout.unwrap_or_else(|| self.ctx.time_layout()).to_string();
        value::check(
            &self.ctx,
            self.resolve_owned(path),
            path,
            "time",
            &expected,
            |v| value::to_time(v, &layout),
        );
        self
    }

    /// Returns true when the body counts as empty.
    ///
    /// See [`empty`](Self::empty) for the rule.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        value::is_effectively_empty(&self.parsed)
    }

    /// Asserts that the body is empty.
    ///
    /// Blank bodies, `null`, `{}`, `[]` and `""` are empty. A body that is
    /// not valid JSON is *also* empty: this keeps emptiness checks quiet when
    /// the upstream payload is broken, at the cost of hiding that breakage.
    /// Use [`exist`](Self::exist) or a typed assertion to surface parse errors.
    pub fn empty(&self) -> &Self {
        if !self.is_empty() {
            self.ctx.soft(
                FailureKind::Emptiness,
                format!("expected empty JSON body, got {}", preview(&self.raw)),
            );
        }
        self
    }

    /// Asserts that the body is not empty. Exact negation of [`empty`](Self::empty).
    pub fn not_empty(&self) -> &Self {
        if self.is_empty() {
            self.ctx.soft(
                FailureKind::Emptiness,
                format!("expected non-empty JSON body, got {}", preview(&self.raw)),
            );
        }
        self
    }

    /// Decodes the body into `target`, reporting a decode failure on error.
    ///
    /// `target` is left untouched when decoding fails.
    pub fn bind<T: DeserializeOwned>(&self, target: &mut T) -> &Self {
        if self.ctx.is_degraded() {
            return self;
        }
        match serde_json::from_slice::<T>(&self.raw) {
            Ok(value) => *target = value,
            Err(e) => self
                .ctx
                .soft(FailureKind::Decode, format!("cannot bind JSON body: {e}")),
        }
        self
    }

    fn resolve(&self, path: &str) -> Result<Option<&Value>, String> {
        match &self.parsed {
            Parsed::Blank => Ok(None),
            Parsed::Document(doc) => Ok(path::lookup(doc, path)),
            Parsed::Malformed(reason) => Err(format!("body is not valid JSON: {reason}")),
        }
    }

    fn resolve_owned(&self, path: &str) -> Result<Option<Value>, String> {
        self.resolve(path).map(|found| found.cloned())
    }
}

impl fmt::Debug for JsonView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonView")
            .field("raw_len", &self.raw.len())
            .field("parsed", &self.parsed)
            .field("ctx", &self.ctx)
            .finish()
    }
}

fn parse(raw: &[u8]) -> Parsed<Value> {
    if value::is_blank(raw) {
        return Parsed::Blank;
    }
    match serde_json::from_slice(raw) {
        Ok(doc) => Parsed::Document(doc),
        Err(e) => Parsed::Malformed(e.to_string()),
    }
}

/// Truncated, lossy rendering of a body for failure messages.
pub(crate) fn preview(raw: &[u8]) -> String {
    const LIMIT: usize = 120;
    let text = String::from_utf8_lossy(raw);
    if text.chars().count() > LIMIT {
        let head: String = text.chars().take(LIMIT).collect();
        format!("{head:?}...")
    } else {
        format!("{text:?}")
    }
}
