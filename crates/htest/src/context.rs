//! Assertion context shared by a response and every view derived from it.

use crate::reporter::{Failure, FailureKind, SharedReporter};
use std::sync::Arc;

/// Reporter handle plus per-client settings, threaded through every wrapper.
///
/// A degraded context belongs to a chain whose dispatch already failed hard;
/// everything reported through it is dropped.
#[derive(Clone)]
pub(crate) struct AssertContext {
    reporter: SharedReporter,
    time_layout: Arc<str>,
    degraded: bool,
}

impl AssertContext {
    pub(crate) fn new(reporter: SharedReporter, time_layout: impl Into<Arc<str>>) -> Self {
        Self {
            reporter,
            time_layout: time_layout.into(),
            degraded: false,
        }
    }

    /// Returns a copy of this context that swallows all further reports.
    pub(crate) fn degrade(&self) -> Self {
        Self {
            degraded: true,
            ..self.clone()
        }
    }

    pub(crate) fn is_degraded(&self) -> bool {
        self.degraded
    }

    pub(crate) fn time_layout(&self) -> &str {
        &self.time_layout
    }

    pub(crate) fn soft(&self, kind: FailureKind, message: impl Into<String>) {
        if !self.degraded {
            self.reporter.soft(Failure::new(kind, message));
        }
    }

    pub(crate) fn hard(&self, kind: FailureKind, message: impl Into<String>) {
        if !self.degraded {
            self.reporter.hard(Failure::new(kind, message));
        }
    }
}

impl std::fmt::Debug for AssertContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssertContext")
            .field("time_layout", &self.time_layout)
            .field("degraded", &self.degraded)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::Recorder;

    #[test]
    fn test_degraded_context_is_silent() {
        let recorder = Recorder::new();
        let ctx = AssertContext::new(Arc::new(recorder.clone()), "%Y");

        ctx.soft(FailureKind::Body, "first");
        let degraded = ctx.degrade();
        degraded.soft(FailureKind::Body, "second");
        degraded.hard(FailureKind::Dispatch, "third");

        assert!(degraded.is_degraded());
        assert!(!ctx.is_degraded());
        assert_eq!(recorder.len(), 1);
    }
}
