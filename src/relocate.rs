use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::restore::write_restore_scripts;
use crate::scanner::CandidateFile;
use crate::{BACKUP_TIMESTAMP_FORMAT, MANIFEST_FILE_NAME};

/// Where to relocate from and to. Supplied per invocation, never persisted.
#[derive(Debug, Clone)]
pub struct RelocateOptions {
    pub project_root: PathBuf,
    pub backup_root: PathBuf,
}

/// Manifest written into the backup directory, one entry per moved file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelocationManifest {
    pub created: DateTime<Local>,
    pub project_root: PathBuf,
    pub backup_dir: PathBuf,
    pub files: Vec<RelocatedFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelocatedFile {
    pub original_path: PathBuf,
    pub backup_path: PathBuf,
    pub size_bytes: u64,
}

/// Summary returned to the caller after a relocation.
#[derive(Debug, Clone)]
pub struct RelocationReport {
    pub files_moved: usize,
    pub total_size_bytes: u64,
    /// None when there was nothing to move
    pub backup_dir: Option<PathBuf>,
}

impl RelocationReport {
    fn empty() -> Self {
        Self {
            files_moved: 0,
            total_size_bytes: 0,
            backup_dir: None,
        }
    }
}

/// Moves unused files into a timestamped backup directory, mirroring their
/// project-relative paths, then writes the manifest and restore scripts.
#[derive(Debug, Clone)]
pub struct Relocator {
    options: RelocateOptions,
}

impl Relocator {
    pub fn new(options: RelocateOptions) -> Self {
        Self { options }
    }

    /// Relocate the given unused files.
    ///
    /// An empty set is a no-op: no backup directory is created. On the first
    /// failing move the remaining moves are aborted and an error is
    /// returned; the manifest and restore scripts are still written for the
    /// files already moved, so a partial relocation stays reversible.
    pub fn relocate(&self, unused: &[CandidateFile]) -> Result<RelocationReport> {
        if unused.is_empty() {
            return Ok(RelocationReport::empty());
        }

        if !self.options.backup_root.is_dir() {
            bail!(
                "Backup directory does not exist: {}",
                self.options.backup_root.display()
            );
        }

        let backup_dir = self.backup_dir_name();
        fs::create_dir_all(&backup_dir).with_context(|| {
            format!("Failed to create backup directory {}", backup_dir.display())
        })?;

        let mut manifest = RelocationManifest {
            created: Local::now(),
            project_root: self.options.project_root.clone(),
            backup_dir: backup_dir.clone(),
            files: Vec::new(),
        };
        let mut move_error = None;

        for candidate in unused {
            match self.move_one(candidate, &backup_dir) {
                Ok(entry) => manifest.files.push(entry),
                Err(e) => {
                    // Abort-and-report: stop here, never continue past a failure
                    move_error = Some(e);
                    break;
                }
            }
        }

        // Whatever did move must stay restorable, even on an aborted run
        if !manifest.files.is_empty() {
            let manifest_path = backup_dir.join(MANIFEST_FILE_NAME);
            let data = serde_json::to_string_pretty(&manifest)
                .context("Failed to serialize relocation manifest")?;
            fs::write(&manifest_path, data).with_context(|| {
                format!("Failed to write manifest {}", manifest_path.display())
            })?;

            write_restore_scripts(&backup_dir, &self.options.project_root)?;
        }

        if let Some(e) = move_error {
            return Err(e.context(format!(
                "Relocation aborted after {} of {} files; files already moved can be \
                 restored with the scripts in {}",
                manifest.files.len(),
                unused.len(),
                backup_dir.display()
            )));
        }

        Ok(RelocationReport {
            files_moved: manifest.files.len(),
            total_size_bytes: manifest.files.iter().map(|f| f.size_bytes).sum(),
            backup_dir: Some(backup_dir),
        })
    }

    /// Backup directory name: project folder name plus a minute-granularity
    /// timestamp, under the designated backup root.
    fn backup_dir_name(&self) -> PathBuf {
        let folder_name = self
            .options
            .project_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "backup".to_string());
        let timestamp = Local::now().format(BACKUP_TIMESTAMP_FORMAT);

        self.options
            .backup_root
            .join(format!("{folder_name}_unused_assets_backup_{timestamp}"))
    }

    /// Move a single file under the backup directory, recreating its
    /// relative directory chain. Works across filesystems.
    fn move_one(&self, candidate: &CandidateFile, backup_dir: &Path) -> Result<RelocatedFile> {
        let dest = backup_dir.join(&candidate.relative_path);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let size_bytes =
            fs_extra::file::move_file(&candidate.path, &dest, &fs_extra::file::CopyOptions::new())
                .with_context(|| {
                    format!(
                        "Failed to move {} to {}",
                        candidate.path.display(),
                        dest.display()
                    )
                })?;

        tracing::debug!("Moved {} -> {}", candidate.path.display(), dest.display());

        Ok(RelocatedFile {
            original_path: candidate.path.clone(),
            backup_path: dest,
            size_bytes,
        })
    }
}
