//! License-header scan.
//!
//! A file conforms when one of its first `header_lines` lines matches the
//! configured pattern (a copyright notice or a generated-code marker).

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::ledger::FailureLedger;

/// Check the leading lines of `reader` for a header match.
pub fn has_license_header(reader: impl BufRead, header_lines: usize, pattern: &Regex) -> io::Result<bool> {
    for line in reader.lines().take(header_lines) {
        if pattern.is_match(&line?) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Record every file under `root` that lacks a header.
///
/// Returns the number of non-conforming files.
pub fn scan(
    root: &Path,
    files: &[PathBuf],
    header_lines: usize,
    pattern: &Regex,
    ledger: &mut FailureLedger,
) -> io::Result<usize> {
    let mut missing = 0;
    for file in files {
        let reader = BufReader::new(File::open(root.join(file))?);
        // Unreadable (non UTF-8) headers count as missing.
        let ok = match has_license_header(reader, header_lines, pattern) {
            Ok(ok) => ok,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => false,
            Err(e) => return Err(e),
        };
        if !ok {
            ledger.record(file.display().to_string(), "");
            missing += 1;
        }
    }
    Ok(missing)
}
