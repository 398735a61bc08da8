//! AssetSweep - Find unused asset files and move them to a restorable backup

pub mod cli;
pub mod extensions;
pub mod relocate;
pub mod restore;
pub mod scanner;
pub mod workflow;

// Re-exports for easy access
pub use cli::{Cli, Commands};
pub use extensions::discover_extensions;
pub use relocate::{RelocateOptions, RelocationReport, Relocator};
pub use restore::write_restore_scripts;
pub use scanner::{
    CancelToken, CandidateFile, ScanError, ScanOptions, ScanOutcome, ScanProgress, Scanner,
};
pub use workflow::{Workflow, WorkflowError, WorkflowState};

pub mod colors {
    use colored::Color;

    pub const HEADER: Color = Color::TrueColor { r: 157, g: 77, b: 255 };
    pub const SUCCESS: Color = Color::TrueColor { r: 77, g: 255, b: 157 };
    pub const PATH: Color = Color::TrueColor { r: 77, g: 195, b: 255 };
    pub const WARNING: Color = Color::TrueColor { r: 255, g: 217, b: 61 };
    pub const UNUSED: Color = Color::TrueColor { r: 255, g: 107, b: 157 };
}

/// Current version of AssetSweep
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default glob for referencing source files
pub const DEFAULT_REFS_GLOB: &str = "*.php";

/// Upper bound for auto-sized scan worker pools
pub const MAX_SCAN_THREADS: usize = 8;

/// Timestamp format for backup directory names (minute granularity)
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M";

/// Subfolder of the backup directory holding the generated restore scripts
pub const RESTORE_SCRIPTS_DIR: &str = "restore_scripts";

/// Relocation manifest file written into the backup directory
pub const MANIFEST_FILE_NAME: &str = "relocation_manifest.json";
