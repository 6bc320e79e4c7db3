//! Coverage fragment merging.
//!
//! Each unit-test package writes at most one fragment: a header line (e.g.
//! `mode: atomic`) followed by per-statement records. The aggregator folds
//! fragments into a single report that keeps exactly one header.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::Result;
use crate::toolchain::CoverageSettings;

/// One header line plus the records contributed so far, in merge order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoverageReport {
    header: Option<String>,
    records: Vec<String>,
}

impl CoverageReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    pub fn records(&self) -> &[String] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.header.is_none() && self.records.is_empty()
    }

    /// Fold one fragment's text in and return how many records it added.
    ///
    /// The fragment's first line is its header. It becomes the report header
    /// when the report has none yet and is dropped otherwise.
    pub fn merge_text(&mut self, fragment: &str) -> usize {
        let mut lines = fragment.lines();
        let header = match lines.next() {
            Some(h) if !h.trim().is_empty() => h.trim_end(),
            _ => return 0,
        };
        if self.header.is_none() {
            self.header = Some(header.to_string());
        }

        let before = self.records.len();
        self.records.extend(
            lines
                .filter(|l| !l.trim().is_empty())
                .map(|l| l.trim_end().to_string()),
        );
        self.records.len() - before
    }

    /// Report text: header then records, newline-terminated.
    pub fn render(&self) -> String {
        let mut out = String::new();
        if let Some(header) = &self.header {
            out.push_str(header);
            out.push('\n');
        }
        for record in &self.records {
            out.push_str(record);
            out.push('\n');
        }
        out
    }
}

/// Owns the report and fragment files for one unit pass.
#[derive(Debug)]
pub struct CoverageAggregator {
    report_path: PathBuf,
    fragment_path: PathBuf,
    report: CoverageReport,
    fragments_merged: usize,
}

impl CoverageAggregator {
    /// Resolve paths under `workspace` and remove leftovers from earlier runs.
    pub async fn start(workspace: &Path, settings: &CoverageSettings) -> Result<Self> {
        let aggregator = Self {
            report_path: workspace.join(&settings.report),
            fragment_path: workspace.join(&settings.fragment),
            report: CoverageReport::new(),
            fragments_merged: 0,
        };
        remove_if_exists(&aggregator.report_path).await?;
        aggregator.clear_fragment().await?;
        Ok(aggregator)
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    pub fn fragment_path(&self) -> &Path {
        &self.fragment_path
    }

    pub fn report(&self) -> &CoverageReport {
        &self.report
    }

    pub fn fragments_merged(&self) -> usize {
        self.fragments_merged
    }

    /// Delete a stale fragment so it cannot be counted twice.
    pub async fn clear_fragment(&self) -> Result<()> {
        remove_if_exists(&self.fragment_path).await
    }

    /// Fold the fragment into the report and delete it.
    ///
    /// Returns `false` when the package produced no fragment.
    pub async fn fold_fragment(&mut self) -> Result<bool> {
        let text = match tokio::fs::read_to_string(&self.fragment_path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        };
        let added = self.report.merge_text(&text);
        tokio::fs::remove_file(&self.fragment_path).await?;
        self.fragments_merged += 1;
        debug!(path = %self.fragment_path.display(), records = added, "Merged coverage fragment");
        Ok(true)
    }

    /// Write the combined report and return it.
    pub async fn finish(self) -> Result<CoverageReport> {
        tokio::fs::write(&self.report_path, self.report.render()).await?;
        Ok(self.report)
    }
}

async fn remove_if_exists(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
