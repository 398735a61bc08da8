use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, MultiSelect};
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use assetsweep::cli::{Cli, Commands, ExtensionsArgs, RelocateArgs, ScanArgs};
use assetsweep::{
    colors, discover_extensions, CancelToken, RelocationReport, ScanOptions, ScanOutcome,
    ScanProgress, Workflow, DEFAULT_REFS_GLOB, RESTORE_SCRIPTS_DIR,
};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Disable colors if requested
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Diagnostics go to stderr so they never mix with the reports
    let filter = if cli.verbose {
        EnvFilter::new("assetsweep=debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!("Running {} command", cli.command.name());

    match &cli.command {
        Commands::Extensions(args) => handle_extensions(args)?,
        Commands::Scan(args) => handle_scan(args)?,
        Commands::Relocate(args) => handle_relocate(args)?,
        Commands::Interactive => handle_interactive()?,
    }

    Ok(())
}

fn handle_extensions(args: &ExtensionsArgs) -> Result<()> {
    let project = args.project.canonicalize().unwrap_or(args.project.clone());

    let extensions = discover_extensions(&project).context("Failed to discover extensions")?;

    if extensions.is_empty() {
        println!(
            "{} No file extensions found under {}",
            "ℹ️".cyan(),
            project.display()
        );
        return Ok(());
    }

    println!(
        "{} extensions found under {}",
        extensions.len().to_string().color(colors::SUCCESS),
        project.display().to_string().color(colors::PATH)
    );
    for ext in &extensions {
        println!("  {ext}");
    }

    Ok(())
}

fn handle_scan(args: &ScanArgs) -> Result<()> {
    let project = args.project.canonicalize().unwrap_or(args.project.clone());

    let mut options = ScanOptions::new(&project, &args.extensions);
    options.refs_glob = args.refs.clone();
    options.threads = args.threads;

    let workflow = Workflow::new();
    let outcome = scan_with_progress(&workflow, options)?;
    print_scan_report(&outcome, args.detailed);

    Ok(())
}

fn handle_relocate(args: &RelocateArgs) -> Result<()> {
    let project = args.project.canonicalize().unwrap_or(args.project.clone());

    let mut options = ScanOptions::new(&project, &args.extensions);
    options.refs_glob = args.refs.clone();
    options.threads = args.threads;

    let workflow = Workflow::new();
    let outcome = scan_with_progress(&workflow, options)?;
    print_scan_report(&outcome, false);

    if outcome.unused.is_empty() {
        return Ok(());
    }

    if args.dry_run {
        println!();
        println!("{} DRY RUN: no files will be moved", "🌵".yellow());
        println!(
            "   {} files would move to a new backup under {}",
            outcome.unused.len(),
            args.backup.display()
        );
        return Ok(());
    }

    if !args.yes {
        let confirm = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!(
                "Move {} unused files to a backup under {}?",
                outcome.unused.len(),
                args.backup.display()
            ))
            .default(false)
            .interact()?;

        if !confirm {
            println!("{} Relocation cancelled", "ℹ️".cyan());
            return Ok(());
        }
    }

    let report = workflow.relocate(&args.backup)?;
    print_relocation_summary(&report);

    Ok(())
}

/// Guided session mirroring the three phases: pick directories, discover and
/// select extensions, scan, then confirm the relocation.
fn handle_interactive() -> Result<()> {
    let theme = ColorfulTheme::default();

    println!("{}", "ASSETSWEEP - GUIDED SESSION".bold().color(colors::HEADER));
    println!("{}", "─".repeat(50).color(colors::PATH));

    let project_input: String = Input::with_theme(&theme)
        .with_prompt("Project directory")
        .validate_with(|input: &String| -> Result<(), &str> {
            if Path::new(input).is_dir() {
                Ok(())
            } else {
                Err("Not a directory")
            }
        })
        .interact_text()?;
    let project = PathBuf::from(&project_input);
    let project = project.canonicalize().unwrap_or(project);

    let backup_input: String = Input::with_theme(&theme)
        .with_prompt("Backup directory")
        .validate_with(|input: &String| -> Result<(), &str> {
            if Path::new(input).is_dir() {
                Ok(())
            } else {
                Err("Not a directory")
            }
        })
        .interact_text()?;
    let backup = PathBuf::from(&backup_input);

    let workflow = Workflow::new();

    let extensions = workflow.discover_extensions(&project)?;
    if extensions.is_empty() {
        println!("{} No file extensions found in the project", "ℹ️".cyan());
        return Ok(());
    }

    let selections = MultiSelect::with_theme(&theme)
        .with_prompt("Select asset extensions (space toggles, enter confirms)")
        .items(&extensions)
        .interact()?;
    let selected: Vec<String> = selections.iter().map(|&i| extensions[i].clone()).collect();

    let refs: String = Input::with_theme(&theme)
        .with_prompt("Referencing file glob")
        .default(DEFAULT_REFS_GLOB.to_string())
        .interact_text()?;

    let mut options = ScanOptions::new(&project, &selected);
    options.refs_glob = refs;

    let outcome = scan_with_progress(&workflow, options)?;
    print_scan_report(&outcome, false);

    if outcome.unused.is_empty() {
        return Ok(());
    }

    let confirm = Confirm::with_theme(&theme)
        .with_prompt(format!(
            "Move {} unused files to a backup under {}?",
            outcome.unused.len(),
            backup.display()
        ))
        .default(false)
        .interact()?;

    if !confirm {
        println!("{} Relocation cancelled", "ℹ️".cyan());
        return Ok(());
    }

    let report = workflow.relocate(&backup)?;
    print_relocation_summary(&report);

    Ok(())
}

/// Run a scan with a live progress bar over the referencing files.
fn scan_with_progress(workflow: &Workflow, options: ScanOptions) -> Result<ScanOutcome> {
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} files ({percent}%)")?
            .progress_chars("#>-"),
    );

    let progress = |event: &ScanProgress| match event {
        ScanProgress::Started {
            referencing_files, ..
        } => pb.set_length(*referencing_files as u64),
        ScanProgress::FileScanned { .. } => pb.inc(1),
        ScanProgress::Finished { .. } => {}
    };

    let outcome = workflow.scan(options, &progress, &CancelToken::new())?;
    pb.finish_and_clear();

    Ok(outcome)
}

fn print_scan_report(outcome: &ScanOutcome, detailed: bool) {
    println!();
    println!("{}", "SCAN RESULTS".bold().color(colors::HEADER));
    println!("{}", "─".repeat(50).color(colors::PATH));
    println!(
        "Candidates: {}   Referencing files scanned: {}",
        outcome.total_candidates().to_string().color(colors::SUCCESS),
        outcome.referencing_files.to_string().color(colors::SUCCESS)
    );
    println!(
        "Used: {}   Unused: {}",
        outcome.used.len().to_string().color(colors::SUCCESS),
        outcome.unused.len().to_string().color(colors::UNUSED)
    );

    if detailed && !outcome.used.is_empty() {
        println!();
        println!("{}", "REFERENCED ASSETS".bold().color(colors::HEADER));
        for file in &outcome.used {
            println!(
                "  {}",
                file.relative_path.display().to_string().color(colors::PATH)
            );
        }
    }

    if outcome.unused.is_empty() {
        println!();
        println!("{} No unused assets found", "✨".green());
        return;
    }

    println!();
    println!("{}", "UNUSED ASSETS".bold().color(colors::UNUSED));
    for (i, file) in outcome.unused.iter().enumerate() {
        println!(
            "{:3}. {}",
            i + 1,
            file.relative_path.display().to_string().color(colors::PATH)
        );
    }
}

fn print_relocation_summary(report: &RelocationReport) {
    println!();
    match &report.backup_dir {
        Some(dir) => {
            println!(
                "{} {} files moved to {}",
                "✅".green(),
                report.files_moved,
                dir.display().to_string().color(colors::PATH)
            );
            println!(
                "💾 {:.1} MB relocated",
                report.total_size_bytes as f64 / (1024.0 * 1024.0)
            );
            println!(
                "{} Restore scripts written to {}",
                "💡".cyan(),
                dir.join(RESTORE_SCRIPTS_DIR)
                    .display()
                    .to_string()
                    .color(colors::PATH)
            );
        }
        None => {
            println!("{} No unused files to move", "ℹ️".cyan());
        }
    }
}
