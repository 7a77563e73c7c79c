use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use schemavault_core::serialize;
use schemavault_core::{Config, Report, Severity};
use schemavault_engine::checker::ConsistencyChecker;
use schemavault_engine::dereference::Dereferencer;
use schemavault_engine::materialize::Materializer;
use schemavault_engine::resolver::Resolver;
use schemavault_engine::scanner;

mod git;

/// SchemaVault - versioned JSON Schema repository tool
#[derive(Parser)]
#[command(name = "schemavault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: schemavault.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Materialize current schema sources into versioned artifacts
    Materialize {
        /// Current files to materialize (all discovered sources if empty)
        paths: Vec<PathBuf>,

        /// Compute everything but write nothing
        #[arg(long)]
        dry_run: bool,
    },

    /// Materialize the current sources modified in git
    MaterializeModified {
        /// Read modified paths from the index instead of the working tree
        #[arg(long)]
        staged: bool,

        /// git add the written artifacts
        #[arg(long)]
        stage: bool,
    },

    /// Print a schema fully dereferenced
    Dereference {
        /// Schema file to dereference
        path: PathBuf,
    },

    /// Check repository consistency (structural, robustness, compatibility)
    Check {
        /// Repository path to check (default: config root)
        path: Option<PathBuf>,

        /// Output file for report.json
        #[arg(short, long, default_value = "report.json")]
        output: PathBuf,

        /// Also output markdown report
        #[arg(short, long)]
        markdown: Option<PathBuf>,
    },

    /// Install a pre-commit hook that materializes staged sources
    InstallHook,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    // Load config if specified
    let config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else if Path::new("schemavault.toml").exists() {
        Config::from_file(Path::new("schemavault.toml"))?
    } else {
        if cli.verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    match cli.command {
        Commands::Materialize { paths, dry_run } => {
            materialize_command(&config, &paths, dry_run, cli.verbose)
        }
        Commands::MaterializeModified { staged, stage } => {
            materialize_modified_command(&config, staged, stage, cli.verbose)
        }
        Commands::Dereference { path } => dereference_command(&config, &path),
        Commands::Check { path, output, markdown } => check_command(
            &config,
            path.as_deref(),
            &output,
            markdown.as_deref(),
            cli.verbose,
        ),
        Commands::InstallHook => install_hook_command(cli.verbose),
    }
}

/// Materialize command - write versioned artifacts for current sources
fn materialize_command(
    config: &Config,
    paths: &[PathBuf],
    dry_run: bool,
    verbose: bool,
) -> Result<()> {
    let sources = if paths.is_empty() {
        discover_current_sources(config, &config.root)?
    } else {
        paths.to_vec()
    };

    if sources.is_empty() {
        println!("{}", "No current schema sources found".yellow());
        return Ok(());
    }

    let materializer = Materializer::new(config).dry_run(dry_run);
    let mut written = Vec::new();

    for source in &sources {
        if verbose {
            eprintln!("  {} {}...", "Materializing".cyan(), source.display());
        }
        let paths = materializer.materialize_current(source)?;
        written.extend(paths);
    }

    let action = if dry_run { "Would write" } else { "Wrote" };
    println!("{} {} paths:", action.green(), written.len());
    for path in &written {
        println!("  {}", path.display());
    }

    Ok(())
}

/// Materialize-modified command - materialize current sources touched in git
fn materialize_modified_command(
    config: &Config,
    staged: bool,
    stage: bool,
    verbose: bool,
) -> Result<()> {
    let root = git::find_repo_root()?;
    let modified = git::list_modified_paths(&root, staged)?;

    let current_name = Path::new(&config.current_name);
    let sources: Vec<PathBuf> = modified
        .into_iter()
        .filter(|path| path.file_name() == current_name.file_name())
        .collect();

    if sources.is_empty() {
        println!("{}", "No modified current schema sources".yellow());
        return Ok(());
    }

    let materializer = Materializer::new(config);
    let mut written = Vec::new();

    for source in &sources {
        if verbose {
            eprintln!("  {} {}...", "Materializing".cyan(), source.display());
        }
        written.extend(materializer.materialize_current(source)?);
    }

    println!("{} {} paths", "Wrote".green(), written.len());

    if stage {
        git::stage(&root, &written)?;
        if verbose {
            eprintln!("{} {} paths", "Staged".cyan(), written.len());
        }
    }

    Ok(())
}

/// Dereference command - print an expanded schema to stdout
fn dereference_command(config: &Config, path: &Path) -> Result<()> {
    let schema = serialize::load_document(path)?;
    let resolver = Resolver::new(config.schema_base_uris.clone(), config.root.clone());
    let mut doc = Dereferencer::new(&resolver).dereference(&schema)?;
    if let Some(bounds) = config.enforced_numeric_bounds {
        doc = schemavault_engine::bounds::enforce_bounds(&doc, bounds);
    }

    print!("{}", serialize::serialize(&doc, config.primary_content_type())?);
    Ok(())
}

/// Check command - run all consistency rule sets
fn check_command(
    config: &Config,
    path: Option<&Path>,
    output: &Path,
    markdown: Option<&Path>,
    verbose: bool,
) -> Result<()> {
    let base = path.unwrap_or(&config.root);

    if verbose {
        eprintln!("{} {}", "Checking repository at".cyan(), base.display());
    }

    let report = ConsistencyChecker::new(config).check_all(base)?;

    report.save_to_file(output)?;
    if verbose {
        eprintln!("{} {}", "Report saved to:".green(), output.display());
    }

    if let Some(md_path) = markdown {
        std::fs::write(md_path, generate_markdown_report(&report))?;
        if verbose {
            eprintln!("{} {}", "Markdown report saved to:".green(), md_path.display());
        }
    }

    print_report_summary(&report);

    // Exit with error code if there are errors
    if report.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

/// Install-hook command - write a pre-commit hook
fn install_hook_command(verbose: bool) -> Result<()> {
    let root = git::find_repo_root()?;
    let hook_path = root.join(".git/hooks/pre-commit");

    let script = "#!/bin/sh\n# Materialize staged schema sources before committing.\nexec schemavault materialize-modified --staged --stage\n";
    std::fs::write(&hook_path, script)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&hook_path, std::fs::Permissions::from_mode(0o755))?;
    }

    if verbose {
        eprintln!("{} {}", "Hook installed at".cyan(), hook_path.display());
    }
    println!("{}", "Pre-commit hook installed".green());

    Ok(())
}

/// All current sources under `base`, in the scanner's dependency order
fn discover_current_sources(config: &Config, base: &Path) -> Result<Vec<PathBuf>> {
    let infos = scanner::find_all_schemas_info(base, config)?;
    Ok(infos
        .into_iter()
        .filter(|info| info.current)
        .map(|info| info.path)
        .collect())
}

/// Print report summary to stdout
fn print_report_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Schema Consistency Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!(
        "Checked {} schemas, {} materialized versions",
        report.summary.schemas_checked, report.summary.versions_checked
    );
    println!();

    println!("{}", "Summary:".bold());
    println!("  Total diagnostics: {}", report.summary.total);

    if report.summary.errors > 0 {
        println!("  Errors:   {}", format!("{}", report.summary.errors).red().bold());
    } else {
        println!("  Errors:   {}", format!("{}", report.summary.errors).green());
    }

    if report.summary.warnings > 0 {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).yellow());
    } else {
        println!("  Warnings: {}", format!("{}", report.summary.warnings).green());
    }

    println!("  Info:     {}", report.summary.info);
    println!();

    if report.diagnostics.is_empty() {
        println!("{}", "✓ No issues found!".green().bold());
    } else {
        println!("{}", "Diagnostics:".bold());
        for diag in &report.diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "ERROR".red().bold(),
                Severity::Warn => "WARN".yellow().bold(),
                Severity::Info => "INFO".cyan(),
            };

            println!("  [{}] {}: {}", severity_str, diag.code, diag.message);

            if let Some(loc) = &diag.location {
                println!("    at {loc}");
            }

            if let Some(exp) = &diag.expected {
                println!("    Expected: {exp}");
            }
            if let Some(act) = &diag.actual {
                println!("    Actual:   {act}");
            }
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}

/// Generate markdown report
fn generate_markdown_report(report: &Report) -> String {
    let mut md = String::new();

    md.push_str("# Schema Consistency Report\n\n");
    md.push_str(&format!("**Version:** {}\n\n", report.version));
    md.push_str(&format!("**Timestamp:** {}\n\n", report.timestamp));

    md.push_str("## Summary\n\n");
    md.push_str(&format!("- Schemas checked: {}\n", report.summary.schemas_checked));
    md.push_str(&format!("- Versions checked: {}\n", report.summary.versions_checked));
    md.push_str(&format!("- Total diagnostics: {}\n", report.summary.total));
    md.push_str(&format!("- Errors: {}\n", report.summary.errors));
    md.push_str(&format!("- Warnings: {}\n", report.summary.warnings));
    md.push_str(&format!("- Info: {}\n", report.summary.info));
    md.push('\n');

    if report.diagnostics.is_empty() {
        md.push_str("✅ **No issues found!**\n");
    } else {
        md.push_str("## Diagnostics\n\n");

        for diag in &report.diagnostics {
            let severity_emoji = match diag.severity {
                Severity::Error => "❌",
                Severity::Warn => "⚠️",
                Severity::Info => "ℹ️",
            };

            md.push_str(&format!("### {} {} - {}\n\n", severity_emoji, diag.severity, diag.code));
            md.push_str(&format!("{}\n\n", diag.message));

            if let Some(loc) = &diag.location {
                md.push_str(&format!("**Location:** {loc}\n\n"));
            }

            if let Some(exp) = &diag.expected {
                md.push_str(&format!("**Expected:** `{exp}`\n\n"));
            }
            if let Some(act) = &diag.actual {
                md.push_str(&format!("**Actual:** `{act}`\n\n"));
            }
        }
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn markdown_report_for_clean_run() {
        let report = Report::new();
        let md = generate_markdown_report(&report);
        assert!(md.contains("No issues found"));
    }

    #[test]
    fn discovers_only_current_sources() {
        use schemavault_core::ContentType;
        use serde_json::json;

        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().join("basic");
        std::fs::create_dir_all(&dir).unwrap();

        let doc = json!({
            "$id": "/basic/1.0.0",
            "title": "basic",
            "type": "object",
            "properties": { "name": { "type": "string" } }
        });
        let text = serialize::serialize(&doc, ContentType::Yaml).unwrap();
        std::fs::write(dir.join("current.yaml"), &text).unwrap();
        std::fs::write(dir.join("1.0.0.yaml"), &text).unwrap();

        let config = Config::default();
        let sources = discover_current_sources(&config, tmp.path()).unwrap();

        assert_eq!(sources.len(), 1);
        assert!(sources[0].ends_with("basic/current.yaml"));
    }
}
