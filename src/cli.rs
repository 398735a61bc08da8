use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::DEFAULT_REFS_GLOB;

#[derive(Parser, Debug)]
#[command(
    name = "assetsweep",
    about = "Find unused asset files in a project and move them to a restorable backup",
    version,
    author,
    long_about = "AssetSweep walks a project directory, cross-references asset\n\
                  files against the project's source files, and moves the assets\n\
                  nothing references into a timestamped backup directory.\n\n\
                  Every relocation comes with generated restore scripts (sh,\n\
                  PowerShell, batch) that move the files straight back."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every file extension found under the project directory
    Extensions(ExtensionsArgs),

    /// Find asset files that no referencing source file mentions
    Scan(ScanArgs),

    /// Scan, then move unused assets into a timestamped backup
    Relocate(RelocateArgs),

    /// Guided session: pick directories and extensions interactively
    Interactive,
}

#[derive(Args, Debug)]
pub struct ExtensionsArgs {
    /// Project directory to inspect
    pub project: PathBuf,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Project directory to scan
    pub project: PathBuf,

    /// Asset extension to check, repeatable (e.g. -e png -e jpg)
    #[arg(short = 'e', long = "ext")]
    pub extensions: Vec<String>,

    /// Glob matched against referencing source file names
    #[arg(long, default_value = DEFAULT_REFS_GLOB)]
    pub refs: String,

    /// Worker threads for the reference scan (0 = auto)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Also list the assets that are referenced
    #[arg(short = 'd', long)]
    pub detailed: bool,
}

#[derive(Args, Debug)]
pub struct RelocateArgs {
    /// Project directory to scan
    pub project: PathBuf,

    /// Backup directory that will receive the timestamped backup folder
    #[arg(short, long)]
    pub backup: PathBuf,

    /// Asset extension to check, repeatable (e.g. -e png -e jpg)
    #[arg(short = 'e', long = "ext")]
    pub extensions: Vec<String>,

    /// Glob matched against referencing source file names
    #[arg(long, default_value = DEFAULT_REFS_GLOB)]
    pub refs: String,

    /// Worker threads for the reference scan (0 = auto)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Show what would be moved without touching anything
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl Commands {
    /// Get the command name
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Extensions(_) => "extensions",
            Commands::Scan(_) => "scan",
            Commands::Relocate(_) => "relocate",
            Commands::Interactive => "interactive",
        }
    }
}
