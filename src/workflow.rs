use std::path::Path;
use std::sync::Mutex;

use thiserror::Error;

use crate::extensions;
use crate::relocate::{RelocateOptions, RelocationReport, Relocator};
use crate::scanner::{CancelToken, ScanError, ScanOptions, ScanOutcome, ScanProgress, Scanner};

/// Session state: Idle -> ExtensionsDiscovered -> ScanRunning -> ScanComplete
/// -> (RelocationComplete | Idle).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowState {
    Idle,
    ExtensionsDiscovered,
    ScanRunning,
    ScanComplete,
    RelocationComplete,
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("a scan is already running")]
    ScanInProgress,
    #[error("no completed scan; run a scan first")]
    NoScanResult,
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

struct Inner {
    state: WorkflowState,
    outcome: Option<ScanOutcome>,
}

/// Drives one extension-discovery / scan / relocation session.
///
/// A scan request while a scan is in flight is rejected, not queued. The
/// scan result lives here as an immutable value until the next scan or a
/// reset replaces it.
pub struct Workflow {
    inner: Mutex<Inner>,
}

impl Workflow {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: WorkflowState::Idle,
                outcome: None,
            }),
        }
    }

    pub fn state(&self) -> WorkflowState {
        self.inner.lock().unwrap().state
    }

    /// The latest completed scan result, if any.
    pub fn outcome(&self) -> Option<ScanOutcome> {
        self.inner.lock().unwrap().outcome.clone()
    }

    /// Phase 1: list the distinct extensions under the project root.
    pub fn discover_extensions(&self, project_root: &Path) -> Result<Vec<String>, WorkflowError> {
        if self.state() == WorkflowState::ScanRunning {
            return Err(WorkflowError::ScanInProgress);
        }

        let found = extensions::discover_extensions(project_root)?;

        let mut inner = self.inner.lock().unwrap();
        inner.state = WorkflowState::ExtensionsDiscovered;
        inner.outcome = None;
        Ok(found)
    }

    /// Phase 2: run the reference scan.
    ///
    /// On failure or cancellation the workflow returns to its pre-scan state.
    pub fn scan(
        &self,
        options: ScanOptions,
        progress: &(dyn Fn(&ScanProgress) + Send + Sync),
        cancel: &CancelToken,
    ) -> Result<ScanOutcome, WorkflowError> {
        let previous = {
            let mut inner = self.inner.lock().unwrap();
            if inner.state == WorkflowState::ScanRunning {
                return Err(WorkflowError::ScanInProgress);
            }
            let previous = inner.state;
            inner.state = WorkflowState::ScanRunning;
            inner.outcome = None;
            previous
        };

        let result = Scanner::new(options).scan(progress, cancel);

        let mut inner = self.inner.lock().unwrap();
        match result {
            Ok(outcome) => {
                inner.state = WorkflowState::ScanComplete;
                inner.outcome = Some(outcome.clone());
                Ok(outcome)
            }
            Err(e) => {
                inner.state = previous;
                Err(e.into())
            }
        }
    }

    /// Phase 3: relocate the unused files from the completed scan.
    pub fn relocate(&self, backup_root: &Path) -> Result<RelocationReport, WorkflowError> {
        let outcome = {
            let inner = self.inner.lock().unwrap();
            match (inner.state, &inner.outcome) {
                (WorkflowState::ScanComplete, Some(outcome)) => outcome.clone(),
                _ => return Err(WorkflowError::NoScanResult),
            }
        };

        let relocator = Relocator::new(RelocateOptions {
            project_root: outcome.project_root.clone(),
            backup_root: backup_root.to_path_buf(),
        });
        let report = relocator.relocate(&outcome.unused)?;

        self.inner.lock().unwrap().state = WorkflowState::RelocationComplete;
        Ok(report)
    }

    /// Drop the scan result and return to Idle.
    pub fn reset(&self) -> Result<(), WorkflowError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == WorkflowState::ScanRunning {
            return Err(WorkflowError::ScanInProgress);
        }
        inner.state = WorkflowState::Idle;
        inner.outcome = None;
        Ok(())
    }
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn options(root: &Path) -> ScanOptions {
        ScanOptions::new(root, &["png".to_string()])
    }

    fn silent() -> impl Fn(&ScanProgress) + Send + Sync {
        |_: &ScanProgress| {}
    }

    #[test]
    fn test_full_session_walks_the_state_machine() {
        let project = TempDir::new().unwrap();
        let backup = TempDir::new().unwrap();
        fs::write(project.path().join("a.png"), b"a").unwrap();

        let workflow = Workflow::new();
        assert_eq!(workflow.state(), WorkflowState::Idle);

        let extensions = workflow.discover_extensions(project.path()).unwrap();
        assert_eq!(extensions, vec![".png"]);
        assert_eq!(workflow.state(), WorkflowState::ExtensionsDiscovered);

        let outcome = workflow
            .scan(options(project.path()), &silent(), &CancelToken::new())
            .unwrap();
        assert_eq!(workflow.state(), WorkflowState::ScanComplete);
        assert_eq!(outcome.unused.len(), 1);

        let report = workflow.relocate(backup.path()).unwrap();
        assert_eq!(workflow.state(), WorkflowState::RelocationComplete);
        assert_eq!(report.files_moved, 1);
    }

    #[test]
    fn test_relocate_without_scan_is_rejected() {
        let backup = TempDir::new().unwrap();

        let workflow = Workflow::new();
        let result = workflow.relocate(backup.path());
        assert!(matches!(result, Err(WorkflowError::NoScanResult)));
    }

    #[test]
    fn test_second_scan_while_running_is_rejected() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("a.png"), b"a").unwrap();
        fs::write(project.path().join("index.php"), b"a.png").unwrap();

        let workflow = Workflow::new();
        let rejected = Mutex::new(None);

        // Issue a second scan from inside the first one's progress callback,
        // while the state is still ScanRunning
        let progress = |e: &ScanProgress| {
            if matches!(e, ScanProgress::Started { .. }) {
                let result = workflow.scan(options(project.path()), &silent(), &CancelToken::new());
                *rejected.lock().unwrap() =
                    Some(matches!(result, Err(WorkflowError::ScanInProgress)));
            }
        };

        workflow
            .scan(options(project.path()), &progress, &CancelToken::new())
            .unwrap();

        assert_eq!(*rejected.lock().unwrap(), Some(true));
        assert_eq!(workflow.state(), WorkflowState::ScanComplete);
    }

    #[test]
    fn test_failed_scan_restores_previous_state() {
        let project = TempDir::new().unwrap();

        let workflow = Workflow::new();
        let empty: Vec<String> = Vec::new();
        let result = workflow.scan(
            ScanOptions::new(project.path(), &empty),
            &silent(),
            &CancelToken::new(),
        );

        assert!(matches!(
            result,
            Err(WorkflowError::Scan(ScanError::NoExtensionsSelected))
        ));
        assert_eq!(workflow.state(), WorkflowState::Idle);
    }

    #[test]
    fn test_reset_returns_to_idle() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("a.png"), b"a").unwrap();

        let workflow = Workflow::new();
        workflow
            .scan(options(project.path()), &silent(), &CancelToken::new())
            .unwrap();
        assert!(workflow.outcome().is_some());

        workflow.reset().unwrap();
        assert_eq!(workflow.state(), WorkflowState::Idle);
        assert!(workflow.outcome().is_none());
    }
}
