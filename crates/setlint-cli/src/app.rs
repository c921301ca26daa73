//! CLI Application logic
//!
//! Contains the command-line interface implementation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use setlint_core::{Check, ContentSet, Issue, Severity, Tier};
use setlint_validate::config::SETTINGS_FILE_NAMES;
use setlint_validate::{Checker, LoadHooks, Settings};

/// Output format for issues and check listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    #[default]
    Text,
    /// JSON output for tool consumption
    Json,
}

#[derive(Parser)]
#[command(name = "setlint")]
#[command(author, version, about = "Pluggable consistency checks for content sets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a content set for issues
    Check {
        /// Content set file (.toml or .json)
        input: PathBuf,

        /// Plugin directory (overrides the settings file)
        #[arg(short, long)]
        plugins: Option<PathBuf>,

        /// Settings file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Maximum number of concurrent jobs
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Output format (text or json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Print progress to stderr
        #[arg(long)]
        progress: bool,
    },

    /// List the available checks
    List {
        /// Plugin directory (overrides the settings file)
        #[arg(short, long)]
        plugins: Option<PathBuf>,

        /// Settings file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output format (text or json)
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

/// Run the CLI application
///
/// Parses arguments and dispatches to the matching command. Exits with
/// status 1 when a checked content set has error-severity issues.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            input,
            plugins,
            config,
            jobs,
            format,
            progress,
        } => {
            let settings = load_settings(config.as_deref())?;
            let settings = apply_overrides(settings, plugins, jobs);
            let has_errors = check_command(&input, &settings, format, progress)?;
            if has_errors {
                std::process::exit(1);
            }
        }
        Commands::List {
            plugins,
            config,
            format,
        } => {
            let settings = load_settings(config.as_deref())?;
            let settings = apply_overrides(settings, plugins, None);
            list_command(&settings, format)?;
        }
    }

    Ok(())
}

/// Execute the check command
///
/// Prints the issues and returns whether any of them is an error.
pub fn check_command(
    input: &Path,
    settings: &Settings,
    format: OutputFormat,
    progress: bool,
) -> Result<bool> {
    let issues = collect_issues(input, settings, progress)?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&issues)
                .context("Failed to serialize issues to JSON")?;
            println!("{}", json);
        }
        OutputFormat::Text => print!("{}", render_issues(input, &issues)),
    }

    Ok(issues.iter().any(Issue::is_error))
}

/// Load a content set and run every check against it
pub fn collect_issues(input: &Path, settings: &Settings, progress: bool) -> Result<Vec<Issue>> {
    let set = load_content_set(input)?;

    let mut checker = Checker::from_settings(settings);
    if progress {
        checker.set_hooks(progress_hooks());
    }

    checker
        .get_issues(&set)
        .with_context(|| format!("Failed to check {}", input.display()))
}

/// Execute the list command
pub fn list_command(settings: &Settings, format: OutputFormat) -> Result<()> {
    let checks = available_checks(settings)?;

    match format {
        OutputFormat::Json => {
            let infos: Vec<_> = checks.iter().map(|c| c.info().as_ref()).collect();
            let json = serde_json::to_string_pretty(&infos)
                .context("Failed to serialize checks to JSON")?;
            println!("{}", json);
        }
        OutputFormat::Text => print!("{}", render_check_list(&checks)),
    }

    Ok(())
}

/// Load the plugin directory and return every registered check
pub fn available_checks(settings: &Settings) -> Result<Vec<Check>> {
    let checker = Checker::from_settings(settings);
    checker.load_all().with_context(|| {
        format!(
            "Failed to load checks from {}",
            settings.plugins.directory.display()
        )
    })?;
    Ok(checker.registry().all())
}

/// Human-readable report for a list of issues
pub fn render_issues(input: &Path, issues: &[Issue]) -> String {
    if issues.is_empty() {
        return format!("✓ No issues found in {}\n", input.display());
    }

    let mut out = String::new();
    for issue in issues {
        out.push_str(&issue.to_string());
        out.push_str("\n\n");
    }

    let counts: Vec<String> = Severity::ALL
        .iter()
        .rev()
        .filter_map(|severity| {
            let count = issues.iter().filter(|i| i.severity == *severity).count();
            (count > 0).then(|| format!("{} {}", count, severity))
        })
        .collect();
    out.push_str(&format!(
        "Found {} issue(s): {}\n",
        issues.len(),
        counts.join(", ")
    ));
    out
}

/// Human-readable listing of checks grouped by tier
pub fn render_check_list(checks: &[Check]) -> String {
    if checks.is_empty() {
        return "No checks available\n".to_string();
    }

    let mut out = String::new();
    for tier in Tier::ALL {
        let in_tier: Vec<&Check> = checks.iter().filter(|c| c.tier() == tier).collect();
        if in_tier.is_empty() {
            continue;
        }

        out.push_str(&format!("{} ({})\n", tier, in_tier.len()));
        for check in in_tier {
            let info = check.info();
            out.push_str(&format!("  {}  {}", info.name, info.message));
            if !info.modes.is_empty() {
                let modes: Vec<&str> = info.modes.iter().map(|m| m.as_str()).collect();
                out.push_str(&format!("  [{}]", modes.join(", ")));
            }
            if let Some(ref source) = info.source {
                out.push_str(&format!("  ({})", source.display()));
            }
            out.push('\n');
        }
    }
    out
}

/// Read a content set from a `.toml` or `.json` file
pub fn load_content_set(path: &Path) -> Result<ContentSet> {
    if !path.exists() {
        anyhow::bail!("Content set file not found: {}", path.display());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read content set: {}", path.display()))?;

    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mut set: ContentSet = match extension.as_str() {
        "toml" => toml::from_str(&content)
            .with_context(|| format!("Failed to parse content set: {}", path.display()))?,
        "json" => serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse content set: {}", path.display()))?,
        other => anyhow::bail!(
            "Unsupported content set format '{}' (expected .toml or .json): {}",
            other,
            path.display()
        ),
    };

    if set.root.is_none() {
        set.root = path.parent().map(Path::to_path_buf);
    }
    if set.name.is_empty() {
        if let Some(stem) = path.file_stem() {
            set.name = stem.to_string_lossy().into_owned();
        }
    }

    debug!(
        "Loaded content set '{}' with {} document(s)",
        set.name,
        set.len()
    );
    Ok(set)
}

/// Load settings from an explicit file, or from a settings file in the
/// working directory, or fall back to defaults
pub fn load_settings(config_path: Option<&Path>) -> Result<Settings> {
    match config_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            read_settings(path)
        }
        None => discover_settings(Path::new(".")),
    }
}

/// Load the first settings file found in `dir`, or defaults if there is none
///
/// A settings file that exists but does not parse is an error.
pub fn discover_settings(dir: &Path) -> Result<Settings> {
    for candidate in SETTINGS_FILE_NAMES {
        let path = dir.join(candidate);
        if path.exists() {
            debug!("Using settings from {}", path.display());
            return read_settings(&path);
        }
    }
    Ok(Settings::default())
}

fn read_settings(path: &Path) -> Result<Settings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    Settings::from_toml_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Apply command-line overrides on top of loaded settings
pub fn apply_overrides(
    mut settings: Settings,
    plugins: Option<PathBuf>,
    jobs: Option<usize>,
) -> Settings {
    if let Some(directory) = plugins {
        settings.plugins.directory = directory;
    }
    if jobs.is_some() {
        settings.execution.workers = jobs;
    }
    settings
}

fn progress_hooks() -> LoadHooks {
    LoadHooks::default().on_load_start(|label| eprintln!("{}", label))
}

#[cfg(test)]
mod tests {
    use super::*;
    use setlint_core::{CheckMetadata, CheckResult, DocumentCheck};

    #[test]
    fn test_cli_parse_check() {
        let args = vec!["setlint", "check", "set.toml"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Check {
                input,
                plugins,
                config,
                jobs,
                format,
                progress,
            } => {
                assert_eq!(input, PathBuf::from("set.toml"));
                assert!(plugins.is_none());
                assert!(config.is_none());
                assert!(jobs.is_none());
                assert_eq!(format, OutputFormat::Text);
                assert!(!progress);
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_parse_check_all_options() {
        let args = vec![
            "setlint",
            "check",
            "set.json",
            "--plugins",
            "lint",
            "--config",
            "ci.toml",
            "--jobs",
            "2",
            "--format",
            "json",
            "--progress",
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Check {
                plugins,
                config,
                jobs,
                format,
                progress,
                ..
            } => {
                assert_eq!(plugins, Some(PathBuf::from("lint")));
                assert_eq!(config, Some(PathBuf::from("ci.toml")));
                assert_eq!(jobs, Some(2));
                assert_eq!(format, OutputFormat::Json);
                assert!(progress);
            }
            _ => panic!("Expected Check command"),
        }
    }

    #[test]
    fn test_cli_parse_list() {
        let args = vec!["setlint", "list", "-p", "lint", "-f", "json"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::List {
                plugins, format, ..
            } => {
                assert_eq!(plugins, Some(PathBuf::from("lint")));
                assert_eq!(format, OutputFormat::Json);
            }
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_cli_parse_check_requires_input() {
        assert!(Cli::try_parse_from(vec!["setlint", "check"]).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let settings = apply_overrides(Settings::default(), Some(PathBuf::from("x")), Some(3));
        assert_eq!(settings.plugins.directory, PathBuf::from("x"));
        assert_eq!(settings.execution.workers, Some(3));

        let untouched = apply_overrides(Settings::default(), None, None);
        assert_eq!(untouched, Settings::default());
    }

    #[test]
    fn test_load_settings_missing_file() {
        let err = load_settings(Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_discover_settings_rejects_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("setlint.toml"),
            "[execution]\nworkers = \"many\"\n",
        )
        .unwrap();

        let err = discover_settings(dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
        assert!(err.to_string().contains("setlint.toml"));
    }

    #[test]
    fn test_discover_settings_order_and_default() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            discover_settings(dir.path()).unwrap().worker_count(),
            Settings::default().worker_count()
        );

        fs::write(dir.path().join(".setlint.toml"), "[execution]\nworkers = 2\n").unwrap();
        assert_eq!(discover_settings(dir.path()).unwrap().worker_count(), 2);

        fs::write(dir.path().join("setlint.toml"), "[execution]\nworkers = 7\n").unwrap();
        assert_eq!(discover_settings(dir.path()).unwrap().worker_count(), 7);
    }

    #[test]
    fn test_render_issues_summary() {
        let issues = vec![
            Issue::error("Broken"),
            Issue::warning("Odd").with_document("Hard"),
            Issue::warning("Odder"),
        ];
        let text = render_issues(Path::new("set.toml"), &issues);

        assert!(text.contains("error: Broken"));
        assert!(text.contains("  --> Hard"));
        assert!(text.ends_with("Found 3 issue(s): 1 error, 2 warning\n"));
    }

    #[test]
    fn test_render_issues_empty() {
        let text = render_issues(Path::new("set.toml"), &[]);
        assert_eq!(text, "✓ No issues found in set.toml\n");
    }

    struct Keys;

    impl DocumentCheck for Keys {
        fn metadata(&self) -> CheckMetadata {
            CheckMetadata::new("keys", "Key counts.").with_modes(["mania", "taiko"])
        }

        fn issues(&self, _document: &setlint_core::Document) -> CheckResult {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_render_check_list() {
        let text = render_check_list(&[Check::per_document(Keys)]);
        assert_eq!(text, "per-document (1)\n  keys  Key counts.  [mania, taiko]\n");
        assert_eq!(render_check_list(&[]), "No checks available\n");
    }
}
