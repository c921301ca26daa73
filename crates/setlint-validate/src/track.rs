//! Progress tracking for module loads and check runs
//!
//! A [`Track`] brackets one unit of work. Starting it fires
//! `on_load_start`, completing it fires `on_load_complete`. A track that is
//! dropped without completing (an error path) fires nothing further.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

/// Callback receiving a progress label
pub type Hook = Arc<dyn Fn(&str) + Send + Sync>;

/// Start/complete notifications for progress display
#[derive(Clone)]
pub struct LoadHooks {
    on_load_start: Hook,
    on_load_complete: Hook,
}

impl Default for LoadHooks {
    fn default() -> Self {
        Self {
            on_load_start: Arc::new(|_| {}),
            on_load_complete: Arc::new(|_| {}),
        }
    }
}

impl fmt::Debug for LoadHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadHooks").finish_non_exhaustive()
    }
}

impl LoadHooks {
    /// Create hooks from a start and a completion callback
    pub fn new<S, C>(on_load_start: S, on_load_complete: C) -> Self
    where
        S: Fn(&str) + Send + Sync + 'static,
        C: Fn(&str) + Send + Sync + 'static,
    {
        Self {
            on_load_start: Arc::new(on_load_start),
            on_load_complete: Arc::new(on_load_complete),
        }
    }

    /// Replace the start callback
    pub fn on_load_start(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_load_start = Arc::new(hook);
        self
    }

    /// Replace the completion callback
    pub fn on_load_complete(mut self, hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_load_complete = Arc::new(hook);
        self
    }
}

/// An in-flight unit of tracked work
#[must_use = "a track fires its completion hook only when completed"]
pub struct Track<'a> {
    hooks: &'a LoadHooks,
    label: String,
}

impl<'a> Track<'a> {
    /// Announce the start of a unit of work
    pub fn start(hooks: &'a LoadHooks, label: impl Into<String>) -> Self {
        let label = label.into();
        debug!("start: {}", label);
        (hooks.on_load_start)(&label);
        Self { hooks, label }
    }

    /// The label passed to both hooks
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Announce successful completion
    pub fn complete(self) {
        debug!("done: {}", self.label);
        (self.hooks.on_load_complete)(&self.label);
    }
}
