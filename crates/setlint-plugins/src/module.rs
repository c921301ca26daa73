//! Plugin module loading
//!
//! Compiles a `.rhai` file, finds its check factories and turns each valid
//! descriptor into a [`Check`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rhai::{Array, Dynamic, FnAccess, FnPtr, Map, AST};
use setlint_core::{Check, CheckMetadata, Mode, Tier};
use tracing::{debug, warn};

use crate::script::ScriptCheck;
use crate::{PluginEngine, PluginError, Result};

/// File extension of plugin modules
pub const PLUGIN_EXTENSION: &str = "rhai";

/// Name prefix that marks a script function as a check factory
pub const FACTORY_PREFIX: &str = "check_";

/// A compiled plugin module
pub struct PluginModule {
    engine: Arc<PluginEngine>,
    ast: Arc<AST>,
    path: PathBuf,
}

/// What a factory returned, after validation
#[derive(Debug)]
struct Descriptor {
    tier: Tier,
    message: String,
    modes: Vec<Mode>,
    run: String,
}

impl PluginModule {
    /// Read and compile a module file
    pub fn load(engine: &Arc<PluginEngine>, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = fs::read_to_string(path)?;
        Self::from_source(engine, path, &source)
    }

    /// Compile a module from source text
    pub fn from_source(
        engine: &Arc<PluginEngine>,
        path: impl Into<PathBuf>,
        source: &str,
    ) -> Result<Self> {
        let ast = engine.compile(source)?;
        Ok(Self {
            engine: Arc::clone(engine),
            ast: Arc::new(ast),
            path: path.into(),
        })
    }

    /// Path the module was loaded from
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Module name used to prefix check names (the file stem)
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "plugin".to_string())
    }

    /// Names of the functions carrying the check-factory marker
    pub fn factories(&self) -> Vec<String> {
        self.ast
            .iter_functions()
            .filter(|f| matches!(f.access, FnAccess::Public))
            .filter(|f| f.params.is_empty() && f.name.starts_with(FACTORY_PREFIX))
            .map(|f| f.name.to_string())
            .collect()
    }

    /// Instantiate every factory in the module
    ///
    /// Factories that fail or describe an invalid check are skipped with a
    /// warning.
    pub fn checks(&self) -> Vec<Check> {
        let mut checks = Vec::new();

        for factory in self.factories() {
            match self.instantiate(&factory) {
                Ok(check) => {
                    debug!(check = %check.info().name, "instantiated scripted check");
                    checks.push(check);
                }
                Err(e) => {
                    warn!(
                        module = %self.path.display(),
                        factory = %factory,
                        "skipping check factory: {}",
                        e
                    );
                }
            }
        }

        checks
    }

    /// Run one factory and build its check
    fn instantiate(&self, factory: &str) -> Result<Check> {
        let value = self.engine.call(&self.ast, factory, Vec::new())?;
        let descriptor = self.parse_descriptor(factory, value)?;

        let metadata = CheckMetadata::new(
            format!("{}::{}", self.name(), factory),
            descriptor.message,
        )
        .with_modes(descriptor.modes);

        let script = ScriptCheck::new(
            Arc::clone(&self.engine),
            Arc::clone(&self.ast),
            descriptor.run,
            metadata,
        );

        let check = match descriptor.tier {
            Tier::WholeSet => Check::whole_set(script),
            Tier::PerDocument => Check::per_document(script),
            Tier::CrossDocument => Check::cross_document(script),
        };

        Ok(check.with_source(&self.path))
    }

    fn parse_descriptor(&self, factory: &str, value: Dynamic) -> Result<Descriptor> {
        let invalid = |reason: String| PluginError::InvalidDescriptor {
            factory: factory.to_string(),
            reason,
        };

        let map = value
            .try_cast::<Map>()
            .ok_or_else(|| invalid("factory must return a map".to_string()))?;

        let tier = map
            .get("tier")
            .and_then(|v| v.clone().try_cast::<String>())
            .ok_or_else(|| invalid("missing 'tier'".to_string()))?
            .parse::<Tier>()
            .map_err(invalid)?;

        let message = map
            .get("message")
            .and_then(|v| v.clone().try_cast::<String>())
            .ok_or_else(|| invalid("missing 'message'".to_string()))?;

        let modes = match map.get("modes") {
            Some(value) => value
                .clone()
                .try_cast::<Array>()
                .ok_or_else(|| invalid("'modes' must be an array".to_string()))?
                .into_iter()
                .map(|m| m.into_string().map(Mode::new))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| invalid("'modes' must contain strings".to_string()))?,
            None => Vec::new(),
        };

        if tier != Tier::WholeSet && modes.is_empty() {
            return Err(invalid(format!("{} checks need at least one mode", tier)));
        }

        let run = map
            .get("run")
            .and_then(|v| {
                let v = v.clone();
                if v.is::<FnPtr>() {
                    v.try_cast::<FnPtr>().map(|f| f.fn_name().to_string())
                } else {
                    v.try_cast::<String>()
                }
            })
            .ok_or_else(|| invalid("missing 'run'".to_string()))?;

        let takes_one_argument = self
            .ast
            .iter_functions()
            .any(|f| f.name == run && f.params.len() == 1);
        if !takes_one_argument {
            return Err(invalid(format!(
                "no function '{}' taking one argument",
                run
            )));
        }

        Ok(Descriptor {
            tier,
            message,
            modes,
            run,
        })
    }
}
