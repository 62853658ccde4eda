//! Explicit logging handle.
//!
//! Components receive a [`Diagnostics`] at construction and emit their
//! `tracing` events inside [`Diagnostics::scope`], so each component logs to
//! the dispatcher it was built with rather than to whatever happens to be the
//! process-wide default. [`Diagnostics::none`] drops every event.

use tracing::Dispatch;
use tracing::dispatcher;

#[derive(Clone, Debug)]
pub struct Diagnostics {
    dispatch: Dispatch,
}

impl Diagnostics {
    /// Wrap an existing dispatcher.
    #[must_use]
    pub const fn new(dispatch: Dispatch) -> Self {
        Self { dispatch }
    }

    /// Build a handle around a subscriber.
    #[must_use]
    pub fn from_subscriber<S>(subscriber: S) -> Self
    where
        S: tracing::Subscriber + Send + Sync + 'static,
    {
        Self::new(Dispatch::new(subscriber))
    }

    /// A handle that discards every event.
    #[must_use]
    pub fn none() -> Self {
        Self::new(Dispatch::none())
    }

    /// Capture the dispatcher that is current on this thread.
    #[must_use]
    pub fn current() -> Self {
        dispatcher::get_default(|d| Self::new(d.clone()))
    }

    /// Run `f` with this handle's dispatcher as the thread default.
    pub fn scope<R>(&self, f: impl FnOnce() -> R) -> R {
        dispatcher::with_default(&self.dispatch, f)
    }

    #[must_use]
    pub const fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::current()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::logging::CapturedLogs;

    #[test]
    fn scope_routes_events_to_handle() {
        let logs = CapturedLogs::new();
        let diag = logs.diagnostics();
        diag.scope(|| tracing::info!(skill = "deploy", "created skill"));
        let out = logs.contents();
        assert!(out.contains("created skill"));
        assert!(out.contains("deploy"));
    }

    #[test]
    fn none_discards_events() {
        let logs = CapturedLogs::new();
        let _outer = logs.diagnostics();
        let value = Diagnostics::none().scope(|| {
            tracing::warn!("should vanish");
            42
        });
        assert_eq!(value, 42);
        assert!(logs.contents().is_empty());
    }
}
