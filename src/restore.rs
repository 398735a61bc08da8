use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use path_slash::PathExt;

use crate::{MANIFEST_FILE_NAME, RESTORE_SCRIPTS_DIR};

/// Write the three restore scripts into `<backup_dir>/restore_scripts/`.
///
/// Each script is a self-contained, literal reversal of the relocation: it
/// walks the backup directory, computes every file's relative path and moves
/// it back under the original project root. The `restore_scripts` folder and
/// the relocation manifest are excluded so a restore puts back only project
/// files. Returns the paths of the generated scripts.
pub fn write_restore_scripts(backup_dir: &Path, project_root: &Path) -> Result<Vec<PathBuf>> {
    let scripts_dir = backup_dir.join(RESTORE_SCRIPTS_DIR);
    fs::create_dir_all(&scripts_dir).with_context(|| {
        format!(
            "Failed to create restore scripts directory {}",
            scripts_dir.display()
        )
    })?;

    let scripts = [
        ("restore_files.sh", sh_script(backup_dir, project_root)),
        ("restore_files.ps1", powershell_script(backup_dir, project_root)),
        ("restore_files.bat", batch_script(backup_dir, project_root)),
    ];

    let mut written = Vec::new();
    for (name, content) in scripts {
        let path = scripts_dir.join(name);
        fs::write(&path, content)
            .with_context(|| format!("Failed to write restore script {}", path.display()))?;
        written.push(path);
    }

    Ok(written)
}

fn sh_script(backup_dir: &Path, project_root: &Path) -> String {
    let backup = sh_quote(&backup_dir.to_slash_lossy());
    let project = sh_quote(&project_root.to_slash_lossy());

    format!(
        "#!/bin/sh\n\
         # Restores files moved by assetsweep back into the original project tree.\n\
         backup_dir={backup}\n\
         original_project_dir={project}\n\
         \n\
         cd \"$backup_dir\" || exit 1\n\
         find . -path ./{RESTORE_SCRIPTS_DIR} -prune -o -name {MANIFEST_FILE_NAME} -prune -o -type f -print | \
         while IFS= read -r file; do\n\
         \x20   relative_path=\"${{file#./}}\"\n\
         \x20   mkdir -p \"$original_project_dir/$(dirname \"$relative_path\")\"\n\
         \x20   mv \"$file\" \"$original_project_dir/$relative_path\"\n\
         done\n\
         echo 'Files restored successfully!'\n"
    )
}

fn powershell_script(backup_dir: &Path, project_root: &Path) -> String {
    let backup = ps_quote(&backup_dir.to_string_lossy());
    let project = ps_quote(&project_root.to_string_lossy());

    format!(
        "# Restores files moved by assetsweep back into the original project tree.\n\
         $backup_dir = {backup}\n\
         $original_project_dir = {project}\n\
         \n\
         Get-ChildItem -Path $backup_dir -Recurse -File |\n\
         \x20   Where-Object {{\n\
         \x20       $_.Name -ne '{MANIFEST_FILE_NAME}' -and\n\
         \x20       -not $_.FullName.StartsWith((Join-Path $backup_dir '{RESTORE_SCRIPTS_DIR}'))\n\
         \x20   }} |\n\
         \x20   ForEach-Object {{\n\
         \x20       $relative_path = $_.FullName.Substring($backup_dir.Length + 1)\n\
         \x20       $original_path = Join-Path $original_project_dir $relative_path\n\
         \x20       New-Item -ItemType Directory -Force -Path (Split-Path $original_path) | Out-Null\n\
         \x20       Move-Item -Path $_.FullName -Destination $original_path\n\
         \x20   }}\n\
         Write-Host 'Files restored successfully!'\n"
    )
}

fn batch_script(backup_dir: &Path, project_root: &Path) -> String {
    let backup = backup_dir.to_string_lossy();
    let project = project_root.to_string_lossy();

    format!(
        "@echo off\n\
         rem Restores files moved by assetsweep back into the original project tree.\n\
         set \"backup_dir={backup}\"\n\
         set \"original_project_dir={project}\"\n\
         \n\
         for /r \"%backup_dir%\" %%F in (*) do (\n\
         \x20   setlocal enabledelayedexpansion\n\
         \x20   set \"file_path=%%F\"\n\
         \x20   set \"relative_path=!file_path:%backup_dir%\\=!\"\n\
         \x20   if \"!relative_path!\"==\"!relative_path:{RESTORE_SCRIPTS_DIR}\\=!\" \
         if /i not \"!relative_path!\"==\"{MANIFEST_FILE_NAME}\" (\n\
         \x20       for %%D in (\"%original_project_dir%\\!relative_path!\\..\") do \
         if not exist \"%%~fD\" mkdir \"%%~fD\"\n\
         \x20       move \"%%F\" \"%original_project_dir%\\!relative_path!\" >nul\n\
         \x20   )\n\
         \x20   endlocal\n\
         )\n\
         echo Files restored successfully!\n"
    )
}

/// Single-quote a string for POSIX sh: ' becomes '\''
fn sh_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

/// Single-quote a string for PowerShell: ' is doubled
fn ps_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}
