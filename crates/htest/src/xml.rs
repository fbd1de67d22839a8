//! XML body assertions and the XML to JSON bridge.
//!
//! Paths address the element tree with the same structure the JSON bridge
//! produces: the root element name is the first segment, repeated child
//! elements form an array, attributes are reached as `-name` and mixed text
//! as `#text`.
//!
//! ```text
//! <user id="7"><name>hexi</name><tag>a</tag><tag>b</tag></user>
//!
//! user.-id     => "7"
//! user.name    => "hexi"
//! user.tag.1   => "b"
//! ```

use crate::context::AssertContext;
use crate::json::{preview, JsonView};
use crate::path::{self, Segment};
use crate::reporter::{FailureKind, SharedReporter};
use crate::value::{self, Parsed, DEFAULT_TIME_LAYOUT};
use crate::HtestError;
use bytes::Bytes;
use chrono::NaiveDateTime;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::cell::OnceCell;
use std::fmt;

/// An element of a parsed XML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Element name, including any namespace prefix.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Child elements in document order.
    pub children: Vec<XmlElement>,
    /// Concatenated, trimmed character data directly inside this element.
    pub text: String,
}

impl XmlElement {
    fn new(name: String) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            children: Vec::new(),
            text: String::new(),
        }
    }

    /// True for an element with no attributes and no child elements.
    fn is_leaf(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty()
    }

    /// Converts this element's content to JSON.
    ///
    /// A leaf element without attributes becomes its text; anything else
    /// becomes an object keyed by attribute (`-name`), child element name
    /// (arrays for repeats) and `#text`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        if self.is_leaf() {
            return Value::String(self.text.clone());
        }

        let mut map = Map::new();
        for (key, val) in &self.attributes {
            map.insert(format!("-{key}"), Value::String(val.clone()));
        }
        for child in &self.children {
            let converted = child.to_json();
            match map.get_mut(&child.name) {
                Some(Value::Array(items)) => items.push(converted),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, converted]);
                }
                None => {
                    map.insert(child.name.clone(), converted);
                }
            }
        }
        if !self.text.is_empty() {
            map.insert("#text".to_string(), Value::String(self.text.clone()));
        }
        Value::Object(map)
    }

    /// Converts the whole document rooted at this element, keyed by its name.
    #[must_use]
    pub fn to_json_document(&self) -> Value {
        let mut map = Map::new();
        map.insert(self.name.clone(), self.to_json());
        Value::Object(map)
    }

    fn children_named(&self, name: &str) -> Vec<&XmlElement> {
        self.children.iter().filter(|c| c.name == name).collect()
    }
}

/// Parses a document into its root element.
///
/// Unclosed elements, mismatched end tags, and more than one root element
/// are errors.
pub fn parse_document(raw: &[u8]) -> Result<XmlElement, HtestError> {
    let mut reader = Reader::from_reader(raw);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => {
                let element = open_element(&start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&start)?;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| HtestError::Xml("unexpected end tag".to_string()))?;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                append_text(&mut stack, &text);
            }
            Event::CData(data) => {
                let data = data.into_inner();
                append_text(&mut stack, &String::from_utf8_lossy(&data));
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(HtestError::Xml(format!(
            "unexpected end of document: <{}> is not closed",
            open.name
        )));
    }
    root.ok_or_else(|| HtestError::Xml("document has no root element".to_string()))
}

fn open_element(start: &quick_xml::events::BytesStart<'_>) -> Result<XmlElement, HtestError> {
    let mut element = XmlElement::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(|e| HtestError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let val = attr.unescape_value()?.into_owned();
        element.attributes.push((key, val));
    }
    Ok(element)
}

fn close_element(
    element: XmlElement,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
) -> Result<(), HtestError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(HtestError::Xml(format!(
            "multiple root elements: <{}>",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

fn append_text(stack: &mut [XmlElement], text: &str) {
    if let Some(current) = stack.last_mut() {
        current.text.push_str(text);
    }
}

/// Walks the element tree with bridge semantics.
fn lookup(root: &XmlElement, path: &str) -> Option<Value> {
    enum Cursor<'a> {
        Element(&'a XmlElement),
        Group(Vec<&'a XmlElement>),
        Leaf(Value),
    }

    let segments = path::parse(path)?;
    let mut segments = segments.iter();
    let Some(first) = segments.next() else {
        return Some(root.to_json_document());
    };
    match first {
        Segment::Key(name) if *name == root.name => {}
        _ => return None,
    }

    let mut cursor = Cursor::Element(root);
    for segment in segments {
        cursor = match (cursor, segment) {
            (Cursor::Element(element), Segment::Key(key)) => {
                if let Some(attr) = key.strip_prefix('-') {
                    let (_, val) = element.attributes.iter().find(|(k, _)| k == attr)?;
                    Cursor::Leaf(Value::String(val.clone()))
                } else if key == "#text" {
                    if element.is_leaf() || element.text.is_empty() {
                        return None;
                    }
                    Cursor::Leaf(Value::String(element.text.clone()))
                } else {
                    let mut matches = element.children_named(key);
                    match matches.len() {
                        0 => return None,
                        1 => Cursor::Element(matches.remove(0)),
                        _ => Cursor::Group(matches),
                    }
                }
            }
            (Cursor::Group(group), Segment::Index(i)) => Cursor::Element(group.get(*i)?),
            (Cursor::Group(group), Segment::Key(key)) => {
                Cursor::Element(group.get(key.parse::<usize>().ok()?)?)
            }
            _ => return None,
        };
    }

    Some(match cursor {
        Cursor::Element(element) => element.to_json(),
        Cursor::Group(group) => Value::Array(group.iter().map(|e| e.to_json()).collect()),
        Cursor::Leaf(value) => value,
    })
}

/// An immutable, parsed view of an XML body.
///
/// The derived JSON view is built on the first call to [`json`](Self::json)
/// and cached for the lifetime of this view; it is never rebuilt.
pub struct XmlView {
    raw: Bytes,
    parsed: Parsed<XmlElement>,
    ctx: AssertContext,
    json: OnceCell<JsonView>,
}

impl XmlView {
    /// Parses `raw` into a view reporting to `reporter`.
    pub fn new(raw: impl Into<Bytes>, reporter: SharedReporter) -> Self {
        Self::with_context(
            raw.into(),
            AssertContext::new(reporter, DEFAULT_TIME_LAYOUT),
        )
    }

    pub(crate) fn with_context(raw: Bytes, ctx: AssertContext) -> Self {
        let parsed = if value::is_blank(&raw) {
            Parsed::Blank
        } else {
            match parse_document(&raw) {
                Ok(root) => Parsed::Document(root),
                Err(e) => {
                    ctx.soft(FailureKind::Parse, format!("body is not valid XML: {e}"));
                    Parsed::Malformed(e.to_string())
                }
            }
        };
        Self {
            raw,
            parsed,
            ctx,
            json: OnceCell::new(),
        }
    }

    /// Returns the raw body this view was built from.
    #[must_use]
    pub fn raw(&self) -> &Bytes {
        &self.raw
    }

    /// Returns the root element, if the body parsed.
    #[must_use]
    pub fn root(&self) -> Option<&XmlElement> {
        self.parsed.document()
    }

    /// Returns the bridge value at `path`, if it resolves.
    #[must_use]
    pub fn value(&self, path: &str) -> Option<Value> {
        self.parsed.document().and_then(|root| lookup(root, path))
    }

    /// Returns the JSON view of this document, building it on first use.
    ///
    /// Malformed or blank XML yields an empty JSON view rather than an
    /// error, so `xml.json().not_empty()` fails and `xml.json().empty()`
    /// passes for broken input.
    pub fn json(&self) -> &JsonView {
        self.json.get_or_init(|| {
            let converted = match &self.parsed {
                Parsed::Document(root) => Parsed::Document(root.to_json_document()),
                Parsed::Blank | Parsed::Malformed(_) => Parsed::Blank,
            };
            let raw = match &converted {
                Parsed::Document(doc) => Bytes::from(doc.to_string()),
                _ => Bytes::new(),
            };
            JsonView::from_parts(raw, converted, self.ctx.clone())
        })
    }

    /// Asserts that `path` resolves.
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
                    value::describe(&found)
                ),
            ),
            Ok(None) => {}
        }
        self
    }

    /// Asserts that the text at `path` equals `expected`.
    pub fn string(&self, path: &str, expected: &str) -> &Self {
        let expected = expected.to_string();
        value::check(
            &self.ctx,
            self.resolve(path),
            path,
            "string",
            &expected,
            value::to_string,
        );
        self
    }

    /// Asserts that the text at `path` is the integer `expected`.
    pub fn int(&self, path: &str, expected: i64) -> &Self {
        value::check(&self.ctx, self.resolve(path), path, "int", &expected, value::to_i64);
        self
    }

    /// Asserts that the text at `path` is the unsigned integer `expected`.
    pub fn uint(&self, path: &str, expected: u64) -> &Self {
        value::check(&self.ctx, self.resolve(path), path, "uint", &expected, value::to_u64);
        self
    }

    /// Asserts that the text at `path` is the number `expected`.
    pub fn float(&self, path: &str, expected: f64) -> &Self {
        value::check(&self.ctx, self.resolve(path), path, "float", &expected, value::to_f64);
        self
    }

    /// Asserts that the text at `path` is the literal `true` or `false`.
    pub fn bool(&self, path: &str, expected: bool) -> &Self {
        value::check(&self.ctx, self.resolve(path), path, "bool", &expected, value::to_bool);
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

    /// Asserts that the timestamp at `path` equals `expected`.
    pub fn time(&self, path: &str, expected: NaiveDateTime, layout: Option<&str>) -> &Self {
        let layout = layout.unwrap_or_else(|| self.ctx.time_layout()).to_string();
        value::check(
            &self.ctx,
            self.resolve(path),
            path,
            "time",
            &expected,
            |v| value::to_time(v, &layout),
        );
        self
    }

    /// Returns true when the source is blank.
    ///
    /// Unlike the JSON rule, malformed XML is not empty here; use
    /// `json().is_empty()` for the lenient check.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self.parsed, Parsed::Blank)
    }

    /// Asserts that the source is blank.
    pub fn empty(&self) -> &Self {
        if !self.is_empty() {
            self.ctx.soft(
                FailureKind::Emptiness,
                format!("expected empty XML body, got {}", preview(&self.raw)),
            );
        }
        self
    }

    /// Asserts that the source is not blank. Exact negation of [`empty`](Self::empty).
    pub fn not_empty(&self) -> &Self {
        if self.is_empty() {
            self.ctx
                .soft(FailureKind::Emptiness, "expected non-empty XML body, got \"\"");
        }
        self
    }

    /// Decodes the body into `target` with `quick-xml`'s serde support.
    pub fn bind<T: DeserializeOwned>(&self, target: &mut T) -> &Self {
        if self.ctx.is_degraded() {
            return self;
        }
        match decode(&self.raw) {
            Ok(value) => *target = value,
            Err(e) => self
                .ctx
                .soft(FailureKind::Decode, format!("cannot bind XML body: {e}")),
        }
        self
    }

    fn resolve(&self, path: &str) -> Result<Option<Value>, String> {
        match &self.parsed {
            Parsed::Blank => Ok(None),
            Parsed::Document(root) => Ok(lookup(root, path)),
            Parsed::Malformed(reason) => Err(format!("body is not valid XML: {reason}")),
        }
    }
}

/// Deserializes an XML body.
pub(crate) fn decode<T: DeserializeOwned>(raw: &[u8]) -> Result<T, HtestError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| HtestError::Xml(format!("body is not UTF-8: {e}")))?;
    Ok(quick_xml::de::from_str(text)?)
}

impl fmt::Debug for XmlView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlView")
            .field("raw_len", &self.raw.len())
            .field("parsed", &self.parsed)
            .field("json_built", &self.json.get().is_some())
            .finish()
    }
}
