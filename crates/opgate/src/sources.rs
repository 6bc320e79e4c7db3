//! Source-file discovery for per-file checks.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::toolchain::SourceRules;

/// Every file under `root` with the configured extension, relative to
/// `root` and sorted. Excluded directory names are skipped at any depth.
pub fn list_source_files(root: &Path, rules: &SourceRules) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk(root, root, rules, &mut files)?;
    files.sort();
    Ok(files)
}

fn walk(root: &Path, dir: &Path, rules: &SourceRules, files: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            let excluded = entry
                .file_name()
                .to_str()
                .map(|name| rules.excluded_dirs.iter().any(|d| d == name))
                .unwrap_or(false);
            if !excluded {
                walk(root, &path, rules, files)?;
            }
        } else if file_type.is_file()
            && path.extension().and_then(|e| e.to_str()) == Some(rules.extension.as_str())
        {
            if let Ok(relative) = path.strip_prefix(root) {
                files.push(relative.to_path_buf());
            }
        }
    }
    Ok(())
}
