//! Checks backed by Rhai script functions

use std::sync::Arc;

use rhai::AST;
use serde::Serialize;
use setlint_core::{
    CheckError, CheckMetadata, CheckResult, ContentSet, CrossDocumentCheck, Document,
    DocumentCheck, WholeSetCheck,
};

use crate::PluginEngine;

/// A check whose body is a function in a compiled plugin module
///
/// The same type serves all three tiers; the module wraps it in the
/// [`setlint_core::Check`] variant its descriptor asked for.
pub struct ScriptCheck {
    engine: Arc<PluginEngine>,
    ast: Arc<AST>,
    run: String,
    metadata: CheckMetadata,
}

impl ScriptCheck {
    /// Create a scripted check
    pub fn new(
        engine: Arc<PluginEngine>,
        ast: Arc<AST>,
        run: impl Into<String>,
        metadata: CheckMetadata,
    ) -> Self {
        Self {
            engine,
            ast,
            run: run.into(),
            metadata,
        }
    }

    /// Name of the script function producing issues
    pub fn function(&self) -> &str {
        &self.run
    }

    fn run_on<T: Serialize>(&self, input: &T) -> CheckResult {
        self.engine
            .run_check(&self.ast, &self.run, input)
            .map_err(|e| CheckError::Script(e.to_string()))
    }
}

impl WholeSetCheck for ScriptCheck {
    fn metadata(&self) -> CheckMetadata {
        self.metadata.clone()
    }

    fn issues(&self, set: &ContentSet) -> CheckResult {
        self.run_on(set)
    }
}

impl DocumentCheck for ScriptCheck {
    fn metadata(&self) -> CheckMetadata {
        self.metadata.clone()
    }

    fn issues(&self, document: &Document) -> CheckResult {
        self.run_on(document)
    }
}

impl CrossDocumentCheck for ScriptCheck {
    fn metadata(&self) -> CheckMetadata {
        self.metadata.clone()
    }

    fn issues(&self, set: &ContentSet) -> CheckResult {
        self.run_on(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_error_becomes_check_error() {
        let engine = Arc::new(PluginEngine::new());
        let ast = Arc::new(engine.compile(r#"fn run(x) { throw "broken"; }"#).unwrap());
        let check = ScriptCheck::new(engine, ast, "run", CheckMetadata::new("s", "S."));

        let result = WholeSetCheck::issues(&check, &ContentSet::new("x"));
        match result {
            Err(CheckError::Script(message)) => assert!(message.contains("broken")),
            other => panic!("expected script error, got {:?}", other.map(|v| v.len())),
        }
    }

    #[test]
    fn test_document_input() {
        let engine = Arc::new(PluginEngine::new());
        let ast = Arc::new(
            engine
                .compile(r#"fn run(doc) { [info(`${doc.name}:${doc.mode}`)] }"#)
                .unwrap(),
        );
        let check = ScriptCheck::new(engine, ast, "run", CheckMetadata::new("s", "S."));
        assert_eq!(check.function(), "run");

        let issues = DocumentCheck::issues(&check, &Document::new("Hard", "Mania")).unwrap();
        assert_eq!(issues[0].message, "Hard:mania");
    }
}
