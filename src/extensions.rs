use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Scan the project tree and return the sorted list of distinct file extensions.
///
/// Extensions are reported with their leading dot, lowercased (".png").
/// Files without an extension contribute nothing. The traversal is read-only
/// and does not follow symlinks.
pub fn discover_extensions(project_root: &Path) -> Result<Vec<String>> {
    // Fail up front on a missing or unreadable root rather than mid-walk
    fs::read_dir(project_root)
        .with_context(|| format!("Cannot read project directory: {}", project_root.display()))?;

    let mut extensions = BTreeSet::new();

    for entry in WalkDir::new(project_root).follow_links(false) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry: {e}");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        if let Some(ext) = normalized_extension(entry.path()) {
            extensions.insert(ext);
        }
    }

    Ok(extensions.into_iter().collect())
}

/// Extension of a path in canonical form: leading dot, lowercase.
pub(crate) fn normalized_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_lowercase()))
}

/// Normalize a user-supplied extension ("png", ".PNG") to canonical form.
pub fn normalize_selected(ext: &str) -> String {
    let trimmed = ext.trim().trim_start_matches('.');
    format!(".{}", trimmed.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_discover_extensions_sorted_and_distinct() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let root = temp_dir.path();

        fs::create_dir_all(root.join("img"))?;
        fs::write(root.join("img/a.png"), b"png")?;
        fs::write(root.join("img/b.PNG"), b"png")?;
        fs::write(root.join("index.php"), b"<?php ?>")?;
        fs::write(root.join("style.css"), b"body {}")?;
        fs::write(root.join("README"), b"no extension")?;

        let extensions = discover_extensions(root)?;

        assert_eq!(extensions, vec![".css", ".php", ".png"]);
        Ok(())
    }

    #[test]
    fn test_discover_extensions_missing_root_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        assert!(discover_extensions(&missing).is_err());
    }

    #[test]
    fn test_discover_extensions_empty_tree() -> Result<()> {
        let temp_dir = TempDir::new()?;

        let extensions = discover_extensions(temp_dir.path())?;
        assert!(extensions.is_empty());
        Ok(())
    }

    #[test]
    fn test_normalize_selected() {
        assert_eq!(normalize_selected("png"), ".png");
        assert_eq!(normalize_selected(".PNG"), ".png");
        assert_eq!(normalize_selected(" .Jpg "), ".jpg");
    }
}
