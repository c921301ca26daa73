//! End-to-end orchestration tests for the checker

use std::fs;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use setlint_core::{
    Check, CheckError, CheckMetadata, CheckResult, ContentSet, CrossDocumentCheck, Document,
    DocumentCheck, Issue, Severity, Tier, WholeSetCheck,
};
use setlint_validate::{Checker, LoadHooks, ValidateError};
use tempfile::TempDir;

/// Whole-set check emitting a fixed list of severities
struct Emits {
    name: &'static str,
    severities: Vec<Severity>,
}

impl WholeSetCheck for Emits {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata::new(self.name, "Fixed issues.")
    }

    fn issues(&self, _set: &ContentSet) -> CheckResult {
        Ok(self
            .severities
            .iter()
            .enumerate()
            .map(|(i, severity)| Issue::new(*severity, format!("{}#{}", self.name, i)))
            .collect())
    }
}

/// Per-document check recording every document it sees
struct DocumentSpy {
    modes: Vec<&'static str>,
    seen: Arc<Mutex<Vec<String>>>,
}

impl DocumentCheck for DocumentSpy {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata::new("document-spy", "Spied documents.").with_modes(self.modes.clone())
    }

    fn issues(&self, document: &Document) -> CheckResult {
        self.seen.lock().unwrap().push(document.name.clone());
        Ok(vec![Issue::problem(format!("{} looked at", document.name))])
    }
}

/// Cross-document check counting its invocations
struct CrossSpy {
    modes: Vec<&'static str>,
    calls: Arc<AtomicUsize>,
}

impl CrossDocumentCheck for CrossSpy {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata::new("cross-spy", "Cross spied.").with_modes(self.modes.clone())
    }

    fn issues(&self, set: &ContentSet) -> CheckResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Issue::minor(format!("{} documents", set.len()))])
    }
}

struct Fails;

impl WholeSetCheck for Fails {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata::new("always-fails", "Failures.")
    }

    fn issues(&self, _set: &ContentSet) -> CheckResult {
        Err(CheckError::Failed("cannot read set".to_string()))
    }
}

struct Panics;

impl DocumentCheck for Panics {
    fn metadata(&self) -> CheckMetadata {
        CheckMetadata::new("always-panics", "Panics.").with_modes(["a"])
    }

    fn issues(&self, _document: &Document) -> CheckResult {
        panic!("index out of range")
    }
}

fn empty_plugins() -> TempDir {
    TempDir::new().unwrap()
}

fn mixed_set() -> ContentSet {
    ContentSet::new("mixed")
        .with_document(Document::new("Alpha", "a"))
        .with_document(Document::new("Beta", "b"))
}

fn assert_non_increasing(issues: &[Issue]) {
    for pair in issues.windows(2) {
        assert!(
            pair[0].severity >= pair[1].severity,
            "{} precedes {}",
            pair[0].severity,
            pair[1].severity
        );
    }
}

#[test]
fn test_mixed_tiers_scenario() {
    let plugins = empty_plugins();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let checker = Checker::new(plugins.path()).with_builtin([
        Check::whole_set(Emits {
            name: "general",
            severities: vec![Severity::Warning],
        }),
        Check::per_document(DocumentSpy {
            modes: vec!["a"],
            seen: Arc::clone(&seen),
        }),
    ]);

    let issues = checker.get_issues(&mixed_set()).unwrap();

    let severities: Vec<Severity> = issues.iter().map(|i| i.severity).collect();
    assert_eq!(severities, vec![Severity::Problem, Severity::Warning]);

    let problem = &issues[0];
    assert_eq!(problem.origin().unwrap().name, "document-spy");
    assert_eq!(problem.origin().unwrap().tier, Tier::PerDocument);
    assert_eq!(problem.document.as_deref(), Some("Alpha"));
    assert_eq!(issues[1].origin().unwrap().name, "general");

    assert_eq!(*seen.lock().unwrap(), vec!["Alpha"]);
}

#[test]
fn test_ties_keep_emission_order() {
    let plugins = empty_plugins();
    let checker = Checker::new(plugins.path()).with_workers(4).with_builtin([
        Check::whole_set(Emits {
            name: "first",
            severities: vec![Severity::Error, Severity::Info],
        }),
        Check::whole_set(Emits {
            name: "second",
            severities: vec![Severity::Error, Severity::Info],
        }),
    ]);

    let issues = checker.get_issues(&ContentSet::new("set")).unwrap();
    let messages: Vec<&str> = issues.iter().map(|i| i.message.as_str()).collect();

    assert_eq!(messages, vec!["first#0", "second#0", "first#1", "second#1"]);
}

#[test]
fn test_severity_non_increasing() {
    let plugins = empty_plugins();
    let calls = Arc::new(AtomicUsize::new(0));
    let checker = Checker::new(plugins.path()).with_builtin([
        Check::whole_set(Emits {
            name: "low-high",
            severities: vec![Severity::Info, Severity::Minor, Severity::Error],
        }),
        Check::per_document(DocumentSpy {
            modes: vec!["a", "b"],
            seen: Arc::new(Mutex::new(Vec::new())),
        }),
        Check::cross_document(CrossSpy {
            modes: vec!["b"],
            calls: Arc::clone(&calls),
        }),
        Check::whole_set(Emits {
            name: "mid",
            severities: vec![Severity::Warning, Severity::Info],
        }),
    ]);

    let issues = checker.get_issues(&mixed_set()).unwrap();

    assert_eq!(issues.len(), 8);
    assert_non_increasing(&issues);
    assert!(issues.iter().all(|i| i.origin().is_some()));
}

#[test]
fn test_per_document_mode_filtering() {
    let plugins = empty_plugins();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let checker = Checker::new(plugins.path()).with_builtin([Check::per_document(
        DocumentSpy {
            modes: vec!["b"],
            seen: Arc::clone(&seen),
        },
    )]);
    let set = mixed_set()
        .with_document(Document::new("Gamma", "B"))
        .with_document(Document::new("Delta", "c"));

    let issues = checker.get_issues(&set).unwrap();

    let mut seen = seen.lock().unwrap().clone();
    seen.sort();
    assert_eq!(seen, vec!["Beta", "Gamma"]);

    let documents: Vec<_> = issues.iter().filter_map(|i| i.document.as_deref()).collect();
    assert_eq!(documents, vec!["Beta", "Gamma"]);
}

#[test]
fn test_cross_document_runs_only_with_supported_mode() {
    let plugins = empty_plugins();
    let calls = Arc::new(AtomicUsize::new(0));
    let checker = Checker::new(plugins.path()).with_builtin([Check::cross_document(CrossSpy {
        modes: vec!["b", "z"],
        calls: Arc::clone(&calls),
    })]);

    let only_a = ContentSet::new("only-a").with_document(Document::new("Alpha", "a"));
    assert!(checker.get_issues(&only_a).unwrap().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let issues = checker.get_issues(&mixed_set()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(issues.len(), 1);
    // The check still receives the whole set
    assert_eq!(issues[0].message, "2 documents");
    assert_eq!(issues[0].document, None);
}

#[test]
fn test_empty_set_runs_only_whole_set_checks() {
    let plugins = empty_plugins();
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(Mutex::new(Vec::new()));
    let checker = Checker::new(plugins.path()).with_builtin([
        Check::whole_set(Emits {
            name: "general",
            severities: vec![Severity::Minor],
        }),
        Check::per_document(DocumentSpy {
            modes: vec!["a"],
            seen: Arc::clone(&seen),
        }),
        Check::cross_document(CrossSpy {
            modes: vec!["a"],
            calls: Arc::clone(&calls),
        }),
    ]);

    let issues = checker.get_issues(&ContentSet::new("empty")).unwrap();

    assert_eq!(issues.len(), 1);
    assert!(seen.lock().unwrap().is_empty());
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_failing_check_fails_the_run() {
    let plugins = empty_plugins();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let checker = Checker::new(plugins.path()).with_builtin([
        Check::whole_set(Emits {
            name: "fine",
            severities: vec![Severity::Info],
        }),
        Check::whole_set(Fails),
        Check::per_document(DocumentSpy {
            modes: vec!["a"],
            seen: Arc::clone(&seen),
        }),
    ]);

    let err = checker.get_issues(&mixed_set()).unwrap_err();

    assert_eq!(err.failing_check().unwrap().name, "always-fails");
    assert!(matches!(
        err,
        ValidateError::CheckFailed {
            source: CheckError::Failed(_),
            ..
        }
    ));
    assert!(err.to_string().contains("cannot read set"));
    // Later phases never start
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_panicking_check_fails_the_run() {
    let plugins = empty_plugins();
    let checker = Checker::new(plugins.path()).with_builtin([Check::per_document(Panics)]);

    let err = checker.get_issues(&mixed_set()).unwrap_err();

    assert_eq!(err.failing_check().unwrap().name, "always-panics");
    match err {
        ValidateError::CheckFailed {
            source: CheckError::Panicked(message),
            ..
        } => assert!(message.contains("index out of range")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_loads_once_until_cleared() {
    let plugins = empty_plugins();
    fs::write(
        plugins.path().join("general.rhai"),
        r#"
fn check_title() {
    #{ tier: "set", message: "Missing title.", run: "title" }
}

fn title(set) {
    if set.name == "" { [warning("The set has no title.")] } else { [] }
}
"#,
    )
    .unwrap();

    let loads = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&loads);
    let checker = Checker::new(plugins.path()).with_hooks(LoadHooks::default().on_load_start(
        move |label| {
            if label.starts_with("Loading checks from") {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        },
    ));

    let untitled = ContentSet::new("");
    assert_eq!(checker.get_issues(&untitled).unwrap().len(), 1);
    assert_eq!(checker.get_issues(&untitled).unwrap().len(), 1);
    assert_eq!(loads.load(Ordering::SeqCst), 1);

    checker.registry().clear();
    let issues = checker.get_issues(&untitled).unwrap();
    assert_eq!(loads.load(Ordering::SeqCst), 2);
    assert_eq!(issues[0].origin().unwrap().name, "general::check_title");
    assert!(issues[0]
        .origin()
        .unwrap()
        .source
        .as_ref()
        .unwrap()
        .ends_with("general.rhai"));
}

#[test]
fn test_explicit_load_all_replaces_registry() {
    let plugins = empty_plugins();
    let checker = Checker::new(plugins.path()).with_builtin([Check::whole_set(Emits {
        name: "builtin",
        severities: vec![Severity::Info],
    })]);
    checker.register(Check::whole_set(Emits {
        name: "direct",
        severities: vec![Severity::Info],
    }));
    assert_eq!(checker.registry().len(), 1);

    let count = checker.load_all().unwrap();

    assert_eq!(count, 1);
    let names: Vec<String> = checker
        .registry()
        .all()
        .iter()
        .map(|c| c.info().name.clone())
        .collect();
    assert_eq!(names, vec!["builtin"]);
}

#[test]
fn test_load_one_adds_to_registry() {
    let plugins = empty_plugins();
    let module = plugins.path().join("extra.rhai");
    fs::write(
        &module,
        r#"
fn check_offsets() {
    #{ tier: "per-document", message: "Offsets.", modes: ["a"], run: "offsets" }
}

fn offsets(doc) { [minor(`${doc.name} offset`)] }
"#,
    )
    .unwrap();

    let checker = Checker::new(plugins.path());
    assert_eq!(checker.load_one(&module).unwrap(), 1);
    assert_eq!(checker.registry().count(Tier::PerDocument), 1);

    let issues = checker.get_issues(&mixed_set()).unwrap();
    assert_eq!(issues.len(), 1);
    assert_eq!(issues[0].message, "Alpha offset");
    assert_eq!(issues[0].document.as_deref(), Some("Alpha"));
}

#[test]
fn test_broken_module_aborts_and_retries() {
    let plugins = empty_plugins();
    fs::write(plugins.path().join("broken.rhai"), "fn check_broken( {").unwrap();
    let checker = Checker::new(plugins.path()).with_builtin([Check::whole_set(Emits {
        name: "builtin",
        severities: vec![Severity::Info],
    })]);

    let err = checker.get_issues(&mixed_set()).unwrap_err();
    assert!(matches!(err, ValidateError::PluginLoad { .. }));
    assert!(checker.registry().is_empty());

    fs::remove_file(plugins.path().join("broken.rhai")).unwrap();
    assert_eq!(checker.get_issues(&mixed_set()).unwrap().len(), 1);
}

#[test]
fn test_invalid_factory_is_skipped() {
    let plugins = empty_plugins();
    fs::write(
        plugins.path().join("mixed.rhai"),
        r#"
fn check_good() {
    #{ tier: "cross", message: "Good.", modes: ["b"], run: "good" }
}

fn check_no_modes() {
    #{ tier: "document", message: "No modes.", modes: [], run: "good" }
}

fn check_unknown_tier() {
    #{ tier: "galaxy", message: "Unknown.", run: "good" }
}

fn check_not_a_map() { 42 }

fn check_missing_run() {
    #{ tier: "set", message: "No run.", run: "absent" }
}

fn good(set) { [info("fine")] }
"#,
    )
    .unwrap();

    let checker = Checker::new(plugins.path());
    assert_eq!(checker.load_all().unwrap(), 1);
    assert_eq!(checker.registry().checks(Tier::CrossDocument)[0].info().name, "mixed::check_good");
}

#[cfg(unix)]
#[test]
fn test_uncreatable_directory_yields_no_checks() {
    use std::os::unix::fs::PermissionsExt;

    let root = TempDir::new().unwrap();
    let parent = root.path().join("locked");
    fs::create_dir(&parent).unwrap();
    fs::set_permissions(&parent, fs::Permissions::from_mode(0o555)).unwrap();

    // Privileged users ignore the mode bits, so there is nothing to deny
    if fs::create_dir(parent.join("writable")).is_ok() {
        fs::remove_dir(parent.join("writable")).unwrap();
        fs::set_permissions(&parent, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let checker = Checker::new(parent.join("checks"));
    let result = checker.load_all();
    let created = parent.join("checks").exists();
    fs::set_permissions(&parent, fs::Permissions::from_mode(0o755)).unwrap();

    assert_eq!(result.unwrap(), 0);
    assert!(!created);
    assert!(checker.registry().is_empty());
}

#[test]
fn test_reload_keeps_registry_visible() {
    let plugins = empty_plugins();
    fs::write(plugins.path().join("helpers.rhai"), "fn helper(x) { [] }").unwrap();

    let loading = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&loading);
    let checker = Checker::new(plugins.path())
        .with_workers(2)
        .with_builtin([
            Check::whole_set(Emits {
                name: "general",
                severities: vec![Severity::Warning],
            }),
            Check::per_document(DocumentSpy {
                modes: vec!["a"],
                seen: Arc::new(Mutex::new(Vec::new())),
            }),
        ])
        .with_hooks(LoadHooks::default().on_load_start(move |label| {
            if label.starts_with("Loading checks from") {
                flag.store(true, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(300));
            }
        }));

    assert_eq!(checker.get_issues(&mixed_set()).unwrap().len(), 2);
    loading.store(false, Ordering::SeqCst);

    thread::scope(|scope| {
        let reload = scope.spawn(|| checker.load_all());
        while !loading.load(Ordering::SeqCst) {
            thread::yield_now();
        }

        assert_eq!(checker.registry().len(), 2);
        assert_eq!(checker.get_issues(&mixed_set()).unwrap().len(), 2);
        assert_eq!(reload.join().unwrap().unwrap(), 2);
    });
}

#[test]
fn test_script_checks_across_tiers() {
    let plugins = empty_plugins();
    fs::write(
        plugins.path().join("consistency.rhai"),
        r#"
fn check_creator() {
    #{ tier: "set", message: "Creator.", run: "creator" }
}

fn creator(set) {
    if set.attributes.creator == () { [problem("No creator.")] } else { [] }
}

fn check_columns() {
    #{ tier: "document", message: "Column counts.", modes: ["a"], run: Fn("columns") }
}

fn columns(doc) {
    if doc.attributes.columns > 7 { [error("Too many columns.")] } else { [] }
}

fn check_spread() {
    #{ tier: "cross-document", message: "Spread.", modes: ["a", "b"], run: "spread" }
}

fn spread(set) {
    if set.documents.len() < 3 {
        [issue("minor", "Small spread.")]
    } else {
        []
    }
}
"#,
    )
    .unwrap();

    let set = ContentSet::new("columns")
        .with_document(Document::new("Alpha", "a").with_attribute("columns", 9))
        .with_document(Document::new("Beta", "b").with_attribute("columns", 9));

    let checker = Checker::new(plugins.path()).with_workers(3);
    let issues = checker.get_issues(&set).unwrap();

    let summary: Vec<(Severity, &str)> = issues
        .iter()
        .map(|i| (i.severity, i.message.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (Severity::Error, "Too many columns."),
            (Severity::Problem, "No creator."),
            (Severity::Minor, "Small spread."),
        ]
    );
    assert_eq!(issues[0].document.as_deref(), Some("Alpha"));
    assert_eq!(
        issues[0].origin().unwrap().name,
        "consistency::check_columns"
    );
}
