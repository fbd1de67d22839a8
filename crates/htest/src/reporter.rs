//! Failure reporting.
//!
//! Every wrapper in this crate carries an `Arc<dyn Reporter>` instead of
//! relying on ambient test state. Assertions hand their violations to the
//! reporter and keep going; setup errors are reported as hard failures and
//! degrade the rest of the chain to no-ops.

use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Category of a recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The request could not be built (bad path, bad header, unreadable body).
    Request,
    /// The handler panicked or its body could not be drained.
    Dispatch,
    /// Status code or status line mismatch.
    Status,
    /// Header value mismatch.
    Header,
    /// Raw body mismatch or non UTF-8 body.
    Body,
    /// The body could not be parsed into a view.
    Parse,
    /// Binding into a typed record failed.
    Decode,
    /// A path expected to exist is absent.
    PathMissing,
    /// A path expected to be absent exists.
    PathPresent,
    /// The value at a path could not be coerced to the requested type.
    TypeMismatch,
    /// The coerced value differs from the expected one.
    ValueMismatch,
    /// Emptiness check violated.
    Emptiness,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Request => "request",
            Self::Dispatch => "dispatch",
            Self::Status => "status",
            Self::Header => "header",
            Self::Body => "body",
            Self::Parse => "parse",
            Self::Decode => "decode",
            Self::PathMissing => "path missing",
            Self::PathPresent => "path present",
            Self::TypeMismatch => "type mismatch",
            Self::ValueMismatch => "value mismatch",
            Self::Emptiness => "emptiness",
        };
        f.write_str(name)
    }
}

/// A single assertion violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// What kind of check failed.
    pub kind: FailureKind,
    /// Human-readable description including actual vs. expected.
    pub message: String,
}

impl Failure {
    /// Creates a new failure.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Sink for test failures.
pub trait Reporter: Send + Sync {
    /// Records a failure and lets the test continue.
    fn soft(&self, failure: Failure);

    /// Records an unrecoverable failure.
    ///
    /// Implementations may halt the test (panic); callers treat the rest of
    /// the chain as a no-op either way.
    fn hard(&self, failure: Failure);
}

/// Shared handle to a reporter.
pub type SharedReporter = Arc<dyn Reporter>;

/// A reporter that only collects failures.
///
/// Cloning yields a handle onto the same collection, which makes it
/// convenient for asserting on the failures a chain produced.
///
/// # Example
///
/// ```ignore
/// let recorder = Recorder::new();
/// let client = Client::with_reporter(recorder.clone()).to(handler);
///
/// client.get("/").send_blocking().status_ok();
/// assert_eq!(recorder.count(FailureKind::Status), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    failures: Arc<Mutex<Vec<Failure>>>,
}

impl Recorder {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of every failure recorded so far.
    #[must_use]
    pub fn failures(&self) -> Vec<Failure> {
        self.failures.lock().clone()
    }

    /// Returns the number of recorded failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.lock().len()
    }

    /// Returns true if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.lock().is_empty()
    }

    /// Returns the number of recorded failures of the given kind.
    #[must_use]
    pub fn count(&self, kind: FailureKind) -> usize {
        self.failures.lock().iter().filter(|f| f.kind == kind).count()
    }

    /// Removes and returns every recorded failure.
    pub fn take(&self) -> Vec<Failure> {
        std::mem::take(&mut *self.failures.lock())
    }

    fn push(&self, failure: Failure) {
        self.failures.lock().push(failure);
    }
}

impl Reporter for Recorder {
    fn soft(&self, failure: Failure) {
        tracing::warn!(kind = %failure.kind, "{}", failure.message);
        self.push(failure);
    }

    fn hard(&self, failure: Failure) {
        tracing::error!(kind = %failure.kind, "{}", failure.message);
        self.push(failure);
    }
}

/// The reporter used by [`Client::new`](crate::Client::new).
///
/// Soft failures are collected and reported together when the last handle is
/// dropped, so one fluent chain can surface several independent violations in
/// a single test run. Hard failures panic immediately.
#[derive(Debug, Default)]
pub struct PanicReporter {
    recorder: Recorder,
}

impl PanicReporter {
    /// Creates a new panicking reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Reporter for PanicReporter {
    fn soft(&self, failure: Failure) {
        self.recorder.soft(failure);
    }

    fn hard(&self, failure: Failure) {
        self.recorder.hard(failure);
        let pending = self.recorder.take();
        panic!("{}", render(&pending));
    }
}

impl Drop for PanicReporter {
    fn drop(&mut self) {
        if std::thread::panicking() || self.recorder.is_empty() {
            return;
        }
        panic!("{}", render(&self.recorder.take()));
    }
}

fn render(failures: &[Failure]) -> String {
    let mut out = format!("{} assertion(s) failed:", failures.len());
    for failure in failures {
        out.push_str("\n  ");
        out.push_str(&failure.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorder_collects() {
        let recorder = Recorder::new();
        let handle = recorder.clone();

        handle.soft(Failure::new(FailureKind::Status, "expected 200, got 400"));
        handle.hard(Failure::new(FailureKind::Request, "bad path"));

        assert_eq!(recorder.len(), 2);
        assert_eq!(recorder.count(FailureKind::Status), 1);
        assert_eq!(recorder.count(FailureKind::Header), 0);
        assert_eq!(
            recorder.failures()[0].to_string(),
            "[status] expected 200, got 400"
        );
    }

    #[test]
    fn test_recorder_take_clears() {
        let recorder = Recorder::new();
        recorder.soft(Failure::new(FailureKind::Body, "mismatch"));
        assert_eq!(recorder.take().len(), 1);
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_panic_reporter_clean_drop() {
        let reporter = PanicReporter::new();
        drop(reporter);
    }

    #[test]
    #[should_panic(expected = "1 assertion(s) failed")]
    fn test_panic_reporter_panics_on_drop() {
        let reporter = PanicReporter::new();
        reporter.soft(Failure::new(FailureKind::Body, "mismatch"));
    }

    #[test]
    #[should_panic(expected = "bad path")]
    fn test_panic_reporter_hard_panics() {
        let reporter = PanicReporter::new();
        reporter.hard(Failure::new(FailureKind::Request, "bad path"));
    }
}
