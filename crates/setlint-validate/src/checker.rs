//! Tiered check orchestration

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use setlint_core::{Check, CheckBody, CheckError, CheckResult, ContentSet, Document, Issue, Tier};
use tracing::{debug, info};

use crate::config::Settings;
use crate::error::{Result, ValidateError};
use crate::loader::PluginLoader;
use crate::pool;
use crate::registry::CheckRegistry;
use crate::track::{LoadHooks, Track};

/// Runs every registered check against a content set
///
/// Checks run in three phases: whole-set, per-document, cross-document.
/// Within a phase, jobs run on a bounded worker pool. The returned issues
/// are sorted by descending severity; ties keep phase, registration and
/// document order.
pub struct Checker {
    registry: Arc<CheckRegistry>,
    loader: PluginLoader,
    builtin: Vec<Check>,
    hooks: LoadHooks,
    workers: usize,
    load_lock: Mutex<()>,
}

impl Checker {
    /// Create a checker loading plugins from `plugin_dir`
    pub fn new(plugin_dir: impl Into<PathBuf>) -> Self {
        let workers = pool::default_workers();
        Self {
            registry: Arc::new(CheckRegistry::new()),
            loader: PluginLoader::new(plugin_dir).with_workers(workers),
            builtin: Vec::new(),
            hooks: LoadHooks::default(),
            workers,
            load_lock: Mutex::new(()),
        }
    }

    /// Create a checker from settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.plugins.directory).with_workers(settings.worker_count())
    }

    /// Add compiled-in checks, registered ahead of plugins on every load
    pub fn with_builtin(mut self, checks: impl IntoIterator<Item = Check>) -> Self {
        self.builtin.extend(checks);
        self
    }

    /// Set the progress hooks
    pub fn with_hooks(mut self, hooks: LoadHooks) -> Self {
        self.set_hooks(hooks);
        self
    }

    /// Set the maximum number of concurrent jobs
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self.loader.set_workers(self.workers);
        self
    }

    /// Share a registry with other owners
    pub fn with_registry(mut self, registry: Arc<CheckRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Replace the progress hooks
    pub fn set_hooks(&mut self, hooks: LoadHooks) {
        self.loader.set_hooks(hooks.clone());
        self.hooks = hooks;
    }

    /// The check registry
    pub fn registry(&self) -> &Arc<CheckRegistry> {
        &self.registry
    }

    /// The plugin directory
    pub fn plugin_dir(&self) -> &Path {
        self.loader.directory()
    }

    /// Register a check directly
    pub fn register(&self, check: Check) {
        self.registry.register(check);
    }

    /// Reload the registry from the builtin checks and the plugin directory
    ///
    /// The new registry replaces the old one only once it is complete. If
    /// loading fails the registry is left empty, so the next
    /// [`Checker::get_issues`] retries.
    pub fn load_all(&self) -> Result<usize> {
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.reload()
    }

    /// Load one plugin module into the registry
    pub fn load_one(&self, path: impl AsRef<Path>) -> Result<usize> {
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.loader.load_one(path, &self.registry)
    }

    /// Produce every issue for `set`
    ///
    /// Loads the registry first if it is empty, then runs against one
    /// snapshot of it. The first failing check fails the whole call.
    pub fn get_issues(&self, set: &ContentSet) -> Result<Vec<Issue>> {
        self.ensure_loaded()?;
        let checks = self.registry.snapshot();

        let mut issues = self.run_whole_set(&checks, set)?;
        issues.extend(self.run_per_document(&checks, set)?);
        issues.extend(self.run_cross_document(&checks, set)?);

        sort_by_severity(&mut issues);
        debug!("{} produced {} issue(s)", set.name, issues.len());
        Ok(issues)
    }

    fn ensure_loaded(&self) -> Result<()> {
        if !self.registry.is_empty() {
            return Ok(());
        }
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);
        if self.registry.is_empty() {
            self.reload()?;
        }
        Ok(())
    }

    fn reload(&self) -> Result<usize> {
        let staging = CheckRegistry::new();
        for check in &self.builtin {
            staging.register(check.clone());
        }
        if let Err(err) = self.loader.load_all(&staging) {
            self.registry.clear();
            return Err(err);
        }

        let count = staging.len();
        self.registry.replace_with(staging);
        info!(
            "Registry holds {} check(s) ({} builtin)",
            count,
            self.builtin.len()
        );
        Ok(count)
    }

    fn run_whole_set(&self, checks: &CheckRegistry, set: &ContentSet) -> Result<Vec<Issue>> {
        let checks = checks.checks(Tier::WholeSet);
        let batches = pool::run_bounded(&checks, self.workers, |check| match check.body() {
            CheckBody::WholeSet(body) => self.run_check(check, None, || body.issues(set)),
            _ => Ok(Vec::new()),
        })?;
        Ok(batches.into_iter().flatten().collect())
    }

    fn run_per_document(&self, checks: &CheckRegistry, set: &ContentSet) -> Result<Vec<Issue>> {
        let checks = checks.checks(Tier::PerDocument);
        let jobs: Vec<(usize, &Document, &Check)> = set
            .documents
            .iter()
            .enumerate()
            .flat_map(|(index, document)| {
                checks
                    .iter()
                    .filter(move |check| check.info().supports(&document.mode))
                    .map(move |check| (index, document, check))
            })
            .collect();

        let tracks: Vec<DocumentTrack<'_>> = set
            .documents
            .iter()
            .enumerate()
            .map(|(index, document)| {
                let pending = jobs.iter().filter(|(i, _, _)| *i == index).count();
                DocumentTrack::new(&self.hooks, document, pending)
            })
            .collect();

        let batches = pool::run_bounded(&jobs, self.workers, |(index, document, check)| {
            let track = &tracks[*index];
            track.begin();
            let outcome = match check.body() {
                CheckBody::PerDocument(body) => {
                    self.run_check(check, Some(*document), || body.issues(document))
                }
                _ => Ok(Vec::new()),
            };
            if outcome.is_ok() {
                track.finish_one();
            }
            outcome
        })?;
        Ok(batches.into_iter().flatten().collect())
    }

    fn run_cross_document(&self, checks: &CheckRegistry, set: &ContentSet) -> Result<Vec<Issue>> {
        let checks: Vec<Check> = checks
            .checks(Tier::CrossDocument)
            .into_iter()
            .filter(|check| set.has_any_mode(&check.info().modes))
            .collect();

        let batches = pool::run_bounded(&checks, self.workers, |check| match check.body() {
            CheckBody::CrossDocument(body) => self.run_check(check, None, || body.issues(set)),
            _ => Ok(Vec::new()),
        })?;
        Ok(batches.into_iter().flatten().collect())
    }

    fn run_check<F>(&self, check: &Check, document: Option<&Document>, run: F) -> Result<Vec<Issue>>
    where
        F: FnOnce() -> CheckResult,
    {
        let info = check.info();
        let label = match document {
            Some(document) => format!("Checking for {}.. in {}", info.message, document.name),
            None => format!("Checking for {}..", info.message),
        };
        let track = Track::start(&self.hooks, label);

        let outcome = panic::catch_unwind(AssertUnwindSafe(run))
            .unwrap_or_else(|payload| Err(CheckError::Panicked(panic_message(payload.as_ref()))));
        let mut issues = outcome.map_err(|source| ValidateError::CheckFailed {
            check: Arc::clone(info),
            source,
        })?;

        sort_by_severity(&mut issues);
        let issues = issues
            .into_iter()
            .map(|issue| {
                let issue = match document {
                    Some(document) if issue.document.is_none() => {
                        issue.with_document(&document.name)
                    }
                    _ => issue,
                };
                issue.with_origin(Arc::clone(info))
            })
            .collect();

        track.complete();
        Ok(issues)
    }
}

enum TrackState<'a> {
    Pending,
    Running(Track<'a>),
    Done,
}

/// Progress of one document across its per-document jobs
///
/// Starts with the first job of the document and completes when its last
/// job succeeds. Documents without eligible checks start and complete at
/// once.
struct DocumentTrack<'a> {
    hooks: &'a LoadHooks,
    label: String,
    remaining: AtomicUsize,
    state: Mutex<TrackState<'a>>,
}

impl<'a> DocumentTrack<'a> {
    fn new(hooks: &'a LoadHooks, document: &Document, pending: usize) -> Self {
        let label = format!("Checking for issues in {}...", document.name);
        if pending == 0 {
            Track::start(hooks, label.clone()).complete();
        }
        Self {
            hooks,
            label,
            remaining: AtomicUsize::new(pending),
            state: Mutex::new(TrackState::Pending),
        }
    }

    fn begin(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*state, TrackState::Pending) {
            *state = TrackState::Running(Track::start(self.hooks, self.label.clone()));
        }
    }

    fn finish_one(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) != 1 {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let TrackState::Running(track) = std::mem::replace(&mut *state, TrackState::Done) {
            track.complete();
        }
    }
}

fn sort_by_severity(issues: &mut [Issue]) {
    issues.sort_by(|a, b| b.severity.cmp(&a.severity));
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "check panicked".to_string()
    }
}
