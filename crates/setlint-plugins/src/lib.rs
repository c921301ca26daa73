//! Rhai plugin modules for setlint checks
//!
//! A plugin module is a Rhai script. Every public, zero-parameter function
//! whose name starts with `check_` is a check factory: calling it returns a
//! descriptor map, and the function it names produces the issues.
//!
//! # Example
//!
//! ```ignore
//! // checks/titles.rhai
//! fn check_title_length() {
//!     #{
//!         tier: "document",
//!         message: "Overly long titles.",
//!         modes: ["standard", "taiko"],
//!         run: "title_length",
//!     }
//! }
//!
//! fn title_length(doc) {
//!     let issues = [];
//!     if doc.name.len() > 80 {
//!         issues.push(warning("Title exceeds 80 characters"));
//!     }
//!     issues
//! }
//! ```
//!
//! ```ignore
//! use std::sync::Arc;
//! use setlint_plugins::{PluginEngine, PluginModule};
//!
//! let engine = Arc::new(PluginEngine::new());
//! let module = PluginModule::load(&engine, "checks/titles.rhai")?;
//! let checks = module.checks();
//! ```

pub mod module;
pub mod script;

use rhai::{Array, CallFnOptions, Dynamic, Engine, Map, Scope, AST};
use serde::Serialize;
use setlint_core::{Issue, Severity};
use thiserror::Error;

pub use module::{PluginModule, FACTORY_PREFIX, PLUGIN_EXTENSION};
pub use script::ScriptCheck;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Errors that can occur while loading or running plugin modules
#[derive(Debug, Error)]
pub enum PluginError {
    /// Module file could not be read
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Script compilation failed
    #[error("Script compilation error: {0}")]
    CompileError(String),

    /// Script execution failed
    #[error("Script execution error: {0}")]
    ExecutionError(String),

    /// Invalid issue format returned by script
    #[error("Invalid issue format: {0}")]
    InvalidIssue(String),

    /// Script did not return expected type
    #[error("Script must return an array of issues")]
    InvalidReturnType,

    /// A check factory returned something that does not describe a check
    #[error("Invalid check descriptor from '{factory}': {reason}")]
    InvalidDescriptor { factory: String, reason: String },
}

/// Result type for plugin operations
pub type Result<T> = std::result::Result<T, PluginError>;

/// The plugin engine that compiles and runs check scripts
pub struct PluginEngine {
    engine: Engine,
}

impl Default for PluginEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginEngine {
    /// Create a new plugin engine with default configuration
    pub fn new() -> Self {
        let mut engine = Engine::new();

        // Set reasonable limits for safety
        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(64);
        engine.set_max_operations(1_000_000);
        engine.set_max_modules(10);
        engine.set_max_string_size(1_000_000);
        engine.set_max_array_size(100_000);
        engine.set_max_map_size(10_000);

        Self::register_helpers(&mut engine);

        Self { engine }
    }

    /// Register helper functions available to scripts
    fn register_helpers(engine: &mut Engine) {
        fn issue_map(severity: Severity, message: &str) -> Map {
            let mut map = Map::new();
            map.insert("severity".into(), Dynamic::from(severity.to_string()));
            map.insert("message".into(), Dynamic::from(message.to_string()));
            map
        }

        engine.register_fn("issue", |severity: &str, message: &str| -> Map {
            let mut map = issue_map(Severity::Warning, message);
            map.insert("severity".into(), Dynamic::from(severity.to_string()));
            map
        });
        engine.register_fn("info", |message: &str| issue_map(Severity::Info, message));
        engine.register_fn("minor", |message: &str| issue_map(Severity::Minor, message));
        engine.register_fn("warning", |message: &str| {
            issue_map(Severity::Warning, message)
        });
        engine.register_fn("problem", |message: &str| {
            issue_map(Severity::Problem, message)
        });
        engine.register_fn("error", |message: &str| issue_map(Severity::Error, message));

        // String helper: check if contains (case-insensitive)
        engine.register_fn("contains_ci", |haystack: &str, needle: &str| -> bool {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        });
    }

    /// Compile a Rhai script into an AST
    pub fn compile(&self, script: &str) -> Result<AST> {
        self.engine
            .compile(script)
            .map_err(|e| PluginError::CompileError(e.to_string()))
    }

    /// Call a script function by name
    ///
    /// Top-level statements of the script are not re-evaluated.
    pub fn call(&self, ast: &AST, name: &str, args: Vec<Dynamic>) -> Result<Dynamic> {
        let options = CallFnOptions::new().eval_ast(false);
        let mut scope = Scope::new();

        self.engine
            .call_fn_with_options::<Dynamic>(options, &mut scope, ast, name, args)
            .map_err(|e| PluginError::ExecutionError(e.to_string()))
    }

    /// Run a check function against a serializable input
    ///
    /// The function receives the input as a Rhai map and should return an
    /// array of issue maps.
    pub fn run_check<T: Serialize>(&self, ast: &AST, name: &str, input: &T) -> Result<Vec<Issue>> {
        let input = rhai::serde::to_dynamic(input).map_err(|e| {
            PluginError::ExecutionError(format!("Failed to serialize input: {}", e))
        })?;

        let result = self.call(ast, name, vec![input])?;

        self.convert_result_to_issues(result)
    }

    /// Convert script result to Vec<Issue>
    fn convert_result_to_issues(&self, result: Dynamic) -> Result<Vec<Issue>> {
        let array = result
            .try_cast::<Array>()
            .ok_or(PluginError::InvalidReturnType)?;

        array
            .into_iter()
            .map(|item| self.convert_item_to_issue(item))
            .collect()
    }

    /// Convert a single Dynamic item to Issue
    fn convert_item_to_issue(&self, item: Dynamic) -> Result<Issue> {
        let map = item
            .try_cast::<Map>()
            .ok_or_else(|| PluginError::InvalidIssue("Expected a map/object".to_string()))?;

        // Extract message (required)
        let message = map
            .get("message")
            .and_then(|v| v.clone().try_cast::<String>())
            .ok_or_else(|| PluginError::InvalidIssue("Missing 'message' field".to_string()))?;

        // Extract severity (default: warning)
        let severity = match map
            .get("severity")
            .and_then(|v| v.clone().try_cast::<String>())
        {
            Some(name) => Severity::parse(&name).ok_or_else(|| {
                PluginError::InvalidIssue(format!("Unknown severity '{}'", name))
            })?,
            None => Severity::Warning,
        };

        let mut issue = Issue::new(severity, message);

        if let Some(document) = map
            .get("document")
            .and_then(|v| v.clone().try_cast::<String>())
        {
            issue = issue.with_document(document);
        }

        if let Some(context) = map
            .get("context")
            .and_then(|v| v.clone().try_cast::<String>())
        {
            issue = issue.with_context(context);
        }

        Ok(issue)
    }

    /// Access the underlying Rhai engine
    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}
