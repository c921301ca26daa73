//! Plugin module discovery and loading

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glob::Pattern;
use setlint_core::Check;
use setlint_plugins::{PluginEngine, PluginModule, PLUGIN_EXTENSION};
use tracing::{debug, info, warn};

use crate::error::{Result, ValidateError};
use crate::pool;
use crate::registry::CheckRegistry;
use crate::track::{LoadHooks, Track};

/// Discovers `.rhai` modules in a directory and registers their checks
pub struct PluginLoader {
    directory: PathBuf,
    engine: Arc<PluginEngine>,
    hooks: LoadHooks,
    workers: usize,
}

impl PluginLoader {
    /// Create a loader for a plugin directory
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            engine: Arc::new(PluginEngine::new()),
            hooks: LoadHooks::default(),
            workers: pool::default_workers(),
        }
    }

    /// Set the progress hooks fired around each module load
    pub fn with_hooks(mut self, hooks: LoadHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Set the maximum number of modules loaded concurrently
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub(crate) fn set_hooks(&mut self, hooks: LoadHooks) {
        self.hooks = hooks;
    }

    pub(crate) fn set_workers(&mut self, workers: usize) {
        self.workers = workers.max(1);
    }

    /// The configured plugin directory
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Shared script engine used for every module
    pub fn engine(&self) -> &Arc<PluginEngine> {
        &self.engine
    }

    /// List plugin module files, sorted by path
    ///
    /// A missing directory is created and yields no modules. If creation is
    /// refused for lack of permission, the loader degrades to no modules.
    pub fn plugin_paths(&self) -> Result<Vec<PathBuf>> {
        let directory = resolve(&self.directory);

        if !directory.exists() {
            return match fs::create_dir_all(&directory) {
                Ok(()) => {
                    debug!("Created plugin directory {}", directory.display());
                    Ok(Vec::new())
                }
                Err(err) => degrade_on_denied(&directory, err),
            };
        }

        let pattern = format!(
            "{}/*.{}",
            Pattern::escape(&directory.to_string_lossy()),
            PLUGIN_EXTENSION
        );

        let mut paths = Vec::new();
        for entry in glob::glob(&pattern)? {
            let path = entry.map_err(|err| ValidateError::PluginDirectory {
                path: err.path().to_path_buf(),
                source: err.into_error(),
            })?;
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        Ok(paths)
    }

    /// Load every module in the plugin directory into `registry`
    ///
    /// Modules are compiled in parallel. Their checks are registered in
    /// path order once every module has loaded; a module that fails to
    /// load aborts the cycle before anything is registered.
    pub fn load_all(&self, registry: &CheckRegistry) -> Result<usize> {
        let paths = self.plugin_paths()?;
        debug!(
            "Loading {} plugin module(s) from {}",
            paths.len(),
            self.directory.display()
        );

        let batches = pool::run_bounded(&paths, self.workers, |path| self.load_checks(path))?;

        let mut count = 0;
        for check in batches.into_iter().flatten() {
            registry.register(check);
            count += 1;
        }

        info!(
            "Loaded {} check(s) from {} plugin module(s)",
            count,
            paths.len()
        );
        Ok(count)
    }

    /// Load a single module file into `registry`
    ///
    /// Relative paths are resolved against the working directory.
    pub fn load_one(&self, path: impl AsRef<Path>, registry: &CheckRegistry) -> Result<usize> {
        let checks = self.load_checks(path.as_ref())?;
        let count = checks.len();
        for check in checks {
            registry.register(check);
        }
        Ok(count)
    }

    fn load_checks(&self, path: &Path) -> Result<Vec<Check>> {
        let path = resolve(path);
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let track = Track::start(&self.hooks, format!("Loading checks from \"{}\"...", file_name));

        let module = PluginModule::load(&self.engine, &path).map_err(|source| {
            ValidateError::PluginLoad {
                path: path.clone(),
                source,
            }
        })?;
        let checks = module.checks();
        debug!("{} provides {} check(s)", file_name, checks.len());

        track.complete();
        Ok(checks)
    }
}

fn resolve(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

fn degrade_on_denied(directory: &Path, err: io::Error) -> Result<Vec<PathBuf>> {
    if err.kind() == io::ErrorKind::PermissionDenied {
        warn!(
            "Cannot create plugin directory {}: {}; continuing without plugins",
            directory.display(),
            err
        );
        return Ok(Vec::new());
    }
    Err(ValidateError::PluginDirectory {
        path: directory.to_path_buf(),
        source: err,
    })
}
