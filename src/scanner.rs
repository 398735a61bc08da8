use std::collections::HashSet;
use std::fs;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use regex::RegexSet;
use thiserror::Error;
use walkdir::WalkDir;

use crate::extensions::{normalize_selected, normalized_extension};
use crate::{DEFAULT_REFS_GLOB, MAX_SCAN_THREADS};

/// An asset file whose extension matched the user's selection.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    /// Absolute path of the file
    pub path: PathBuf,
    /// Path relative to the project root
    pub relative_path: PathBuf,
    /// File name used for reference matching
    pub basename: String,
    /// Canonical extension (".png")
    pub extension: String,
}

/// Inputs for one reference scan. Nothing here is persisted between runs.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub project_root: PathBuf,
    /// Selected asset extensions, canonical form
    pub extensions: Vec<String>,
    /// Glob matched against referencing file names
    pub refs_glob: String,
    /// Worker threads for the reference scan, 0 = auto
    pub threads: usize,
}

impl ScanOptions {
    pub fn new<P: Into<PathBuf>>(project_root: P, extensions: &[String]) -> Self {
        Self {
            project_root: project_root.into(),
            extensions: extensions.iter().map(|e| normalize_selected(e)).collect(),
            refs_glob: DEFAULT_REFS_GLOB.to_string(),
            threads: 0,
        }
    }
}

/// Immutable result of a reference scan.
///
/// `used` and `unused` partition the candidate set: every candidate appears
/// in exactly one of the two.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub project_root: PathBuf,
    pub used: Vec<CandidateFile>,
    pub unused: Vec<CandidateFile>,
    /// How many referencing files were scanned
    pub referencing_files: usize,
}

impl ScanOutcome {
    pub fn total_candidates(&self) -> usize {
        self.used.len() + self.unused.len()
    }
}

/// Progress events emitted while a scan runs.
///
/// The scan core knows nothing about terminals; the caller decides how to
/// render these (progress bar, log lines, nothing).
#[derive(Debug, Clone)]
pub enum ScanProgress {
    Started {
        candidates: usize,
        referencing_files: usize,
    },
    FileScanned {
        path: PathBuf,
        processed: usize,
        total: usize,
        percent: u8,
    },
    Finished {
        used: usize,
        unused: usize,
    },
}

/// Cooperative cancellation flag, checked between file reads.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no asset extensions selected")]
    NoExtensionsSelected,
    #[error("cannot read project directory {path}: {source}")]
    ProjectRoot {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid referencing-file glob {glob:?}: {source}")]
    RefsGlob {
        glob: String,
        source: glob::PatternError,
    },
    #[error("failed to compile basename patterns: {0}")]
    Patterns(#[from] regex::Error),
    #[error("failed to build scan worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("scan cancelled")]
    Cancelled,
}

/// Runs the reference scan: enumerate candidates, scan referencing files in
/// parallel for whole-word basename mentions, partition into used/unused.
pub struct Scanner {
    options: ScanOptions,
}

impl Scanner {
    pub fn new(options: ScanOptions) -> Self {
        Self { options }
    }

    /// Run the scan.
    ///
    /// Referencing files are processed on a bounded worker pool. Each worker
    /// collects its own set of matched candidate indices; the partial sets
    /// are merged after all workers finish. The processed-file counter and
    /// progress callback run under a single lock so events arrive in order.
    pub fn scan(
        &self,
        progress: &(dyn Fn(&ScanProgress) + Send + Sync),
        cancel: &CancelToken,
    ) -> Result<ScanOutcome, ScanError> {
        if self.options.extensions.is_empty() {
            return Err(ScanError::NoExtensionsSelected);
        }

        fs::read_dir(&self.options.project_root).map_err(|source| ScanError::ProjectRoot {
            path: self.options.project_root.clone(),
            source,
        })?;

        let pattern =
            glob::Pattern::new(&self.options.refs_glob).map_err(|source| ScanError::RefsGlob {
                glob: self.options.refs_glob.clone(),
                source,
            })?;

        let candidates = self.collect_candidates();
        let referencing = self.collect_referencing_files(&pattern);
        let total = referencing.len();

        progress(&ScanProgress::Started {
            candidates: candidates.len(),
            referencing_files: total,
        });

        // One whole-word pattern per candidate basename; a single pass over
        // each file's text reports every candidate it mentions.
        let patterns: Vec<String> = candidates
            .iter()
            .map(|c| format!(r"\b{}\b", regex::escape(&c.basename)))
            .collect();
        let matcher = RegexSet::new(&patterns)?;

        let threads = self.effective_threads();
        tracing::debug!("Scanning {total} referencing files on {threads} workers");

        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("assetsweep-worker-{i}"))
            .build()?;

        let processed = Mutex::new(0usize);
        let used_indices: HashSet<usize> = pool.install(|| {
            referencing
                .par_iter()
                .map(|path| {
                    if cancel.is_cancelled() {
                        return Err(ScanError::Cancelled);
                    }

                    let matched = self.match_references(path, &matcher);

                    {
                        let mut count = processed.lock().unwrap();
                        *count += 1;
                        progress(&ScanProgress::FileScanned {
                            path: path.clone(),
                            processed: *count,
                            total,
                            percent: percent(*count, total),
                        });
                    }

                    Ok(matched)
                })
                .try_reduce(HashSet::new, |mut acc, part| {
                    acc.extend(part);
                    Ok(acc)
                })
        })?;

        let mut used = Vec::new();
        let mut unused = Vec::new();
        for (index, candidate) in candidates.into_iter().enumerate() {
            if used_indices.contains(&index) {
                used.push(candidate);
            } else {
                unused.push(candidate);
            }
        }

        progress(&ScanProgress::Finished {
            used: used.len(),
            unused: unused.len(),
        });

        Ok(ScanOutcome {
            project_root: self.options.project_root.clone(),
            used,
            unused,
            referencing_files: total,
        })
    }

    /// Read one referencing file and return the candidate indices it mentions.
    ///
    /// An unreadable file is skipped, not fatal. Content is decoded lossily,
    /// so encoding damage never aborts a scan either.
    fn match_references(&self, path: &Path, matcher: &RegexSet) -> HashSet<usize> {
        match fs::read(path) {
            Ok(bytes) => {
                let text = String::from_utf8_lossy(&bytes);
                matcher.matches(&text).into_iter().collect()
            }
            Err(e) => {
                tracing::warn!("Skipping unreadable referencing file {}: {e}", path.display());
                HashSet::new()
            }
        }
    }

    /// All files under the root whose extension is in the chosen subset.
    fn collect_candidates(&self) -> Vec<CandidateFile> {
        let selected: HashSet<&str> = self.options.extensions.iter().map(String::as_str).collect();
        let mut candidates = Vec::new();

        for entry in WalkDir::new(&self.options.project_root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }

            let extension = match normalized_extension(entry.path()) {
                Some(ext) => ext,
                None => continue,
            };

            if !selected.contains(extension.as_str()) {
                continue;
            }

            let path = entry.path().to_path_buf();
            let relative_path = path
                .strip_prefix(&self.options.project_root)
                .unwrap_or(&path)
                .to_path_buf();
            let basename = entry.file_name().to_string_lossy().into_owned();

            candidates.push(CandidateFile {
                path,
                relative_path,
                basename,
                extension,
            });
        }

        candidates.sort_by(|a, b| a.path.cmp(&b.path));
        candidates
    }

    /// All files under the root whose name matches the referencing glob.
    fn collect_referencing_files(&self, pattern: &glob::Pattern) -> Vec<PathBuf> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.options.project_root)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }

            if pattern.matches(&entry.file_name().to_string_lossy()) {
                files.push(entry.path().to_path_buf());
            }
        }

        files.sort();
        files
    }

    fn effective_threads(&self) -> usize {
        if self.options.threads > 0 {
            self.options.threads
        } else {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
                .min(MAX_SCAN_THREADS)
        }
    }
}

/// Progress percentage; defined as 0 when there are no referencing files.
fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        0
    } else {
        ((processed * 100) / total) as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn no_progress() -> impl Fn(&ScanProgress) + Send + Sync {
        |_: &ScanProgress| {}
    }

    fn scan(root: &Path, extensions: &[&str]) -> Result<ScanOutcome, ScanError> {
        let extensions: Vec<String> = extensions.iter().map(|e| e.to_string()).collect();
        let scanner = Scanner::new(ScanOptions::new(root, &extensions));
        scanner.scan(&no_progress(), &CancelToken::new())
    }

    #[test]
    fn test_referenced_and_unreferenced_are_partitioned() -> Result<(), ScanError> {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("img")).unwrap();
        fs::write(root.join("img/a.png"), b"a").unwrap();
        fs::write(root.join("img/b.png"), b"b").unwrap();
        fs::write(root.join("index.php"), br#"<img src="b.png">"#).unwrap();

        let outcome = scan(root, &["png"])?;

        assert_eq!(outcome.total_candidates(), 2);
        assert_eq!(outcome.used.len(), 1);
        assert_eq!(outcome.used[0].basename, "b.png");
        assert_eq!(outcome.unused.len(), 1);
        assert_eq!(outcome.unused[0].relative_path, Path::new("img/a.png"));
        Ok(())
    }

    #[test]
    fn test_matching_is_whole_word() -> Result<(), ScanError> {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("a.png"), b"a").unwrap();
        // "ba.png" must not count as a mention of "a.png"
        fs::write(root.join("page.php"), b"echo 'ba.png';").unwrap();

        let outcome = scan(root, &["png"])?;
        assert_eq!(outcome.used.len(), 0);
        assert_eq!(outcome.unused.len(), 1);

        fs::write(root.join("page.php"), br#"<img src="a.png">"#).unwrap();

        let outcome = scan(root, &["png"])?;
        assert_eq!(outcome.used.len(), 1);
        assert_eq!(outcome.unused.len(), 0);
        Ok(())
    }

    #[test]
    fn test_duplicate_basenames_both_marked_used() -> Result<(), ScanError> {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::create_dir_all(root.join("img")).unwrap();
        fs::create_dir_all(root.join("icons")).unwrap();
        fs::write(root.join("img/logo.png"), b"1").unwrap();
        fs::write(root.join("icons/logo.png"), b"2").unwrap();
        fs::write(root.join("index.php"), b"src=logo.png").unwrap();

        let outcome = scan(root, &["png"])?;
        assert_eq!(outcome.used.len(), 2);
        assert!(outcome.unused.is_empty());
        Ok(())
    }

    #[test]
    fn test_empty_extension_selection_is_error() {
        let temp_dir = TempDir::new().unwrap();

        let result = scan(temp_dir.path(), &[]);
        assert!(matches!(result, Err(ScanError::NoExtensionsSelected)));
    }

    #[test]
    fn test_missing_project_root_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("gone");

        let result = scan(&missing, &["png"]);
        assert!(matches!(result, Err(ScanError::ProjectRoot { .. })));
    }

    #[test]
    fn test_zero_referencing_files_marks_everything_unused() -> Result<(), ScanError> {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("a.png"), b"a").unwrap();
        fs::write(root.join("b.png"), b"b").unwrap();

        let events = Mutex::new(Vec::new());
        let progress = |e: &ScanProgress| events.lock().unwrap().push(e.clone());

        let extensions = vec!["png".to_string()];
        let scanner = Scanner::new(ScanOptions::new(root, &extensions));
        let outcome = scanner.scan(&progress, &CancelToken::new())?;

        assert_eq!(outcome.referencing_files, 0);
        assert!(outcome.used.is_empty());
        assert_eq!(outcome.unused.len(), 2);

        // No per-file events, and nothing ever divided by zero
        let events = events.into_inner().unwrap();
        assert!(events
            .iter()
            .all(|e| !matches!(e, ScanProgress::FileScanned { .. })));
        Ok(())
    }

    #[test]
    fn test_progress_reaches_one_hundred_percent() -> Result<(), ScanError> {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("a.png"), b"a").unwrap();
        for i in 0..5 {
            fs::write(root.join(format!("page{i}.php")), b"nothing here").unwrap();
        }

        let events = Mutex::new(Vec::new());
        let progress = |e: &ScanProgress| events.lock().unwrap().push(e.clone());

        let extensions = vec![".png".to_string()];
        let scanner = Scanner::new(ScanOptions::new(root, &extensions));
        scanner.scan(&progress, &CancelToken::new())?;

        let events = events.into_inner().unwrap();
        let last_percent = events
            .iter()
            .filter_map(|e| match e {
                ScanProgress::FileScanned {
                    processed, percent, ..
                } => Some((*processed, *percent)),
                _ => None,
            })
            .max();
        assert_eq!(last_percent, Some((5, 100)));
        Ok(())
    }

    #[test]
    fn test_cancelled_scan_returns_cancelled() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("a.png"), b"a").unwrap();
        fs::write(root.join("index.php"), b"a.png").unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();

        let extensions = vec!["png".to_string()];
        let scanner = Scanner::new(ScanOptions::new(root, &extensions));
        let result = scanner.scan(&no_progress(), &cancel);
        assert!(matches!(result, Err(ScanError::Cancelled)));
    }

    #[test]
    fn test_refs_glob_is_configurable() -> Result<(), ScanError> {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();

        fs::write(root.join("a.png"), b"a").unwrap();
        fs::write(root.join("main.js"), b"load('a.png')").unwrap();
        fs::write(root.join("index.php"), b"no mention").unwrap();

        let extensions = vec!["png".to_string()];
        let mut options = ScanOptions::new(root, &extensions);
        options.refs_glob = "*.js".to_string();

        let outcome = Scanner::new(options).scan(&no_progress(), &CancelToken::new())?;
        assert_eq!(outcome.used.len(), 1);
        Ok(())
    }

    #[test]
    fn test_percent_zero_total() {
        assert_eq!(percent(0, 0), 0);
        assert_eq!(percent(1, 4), 25);
        assert_eq!(percent(4, 4), 100);
    }
}
