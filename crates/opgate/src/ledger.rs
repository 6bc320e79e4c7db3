//! Failure ledger for lint-style checks.
//!
//! A lint pass scans every subject and records each violation here instead of
//! stopping at the first one. The pass fails iff the ledger is non-empty.

use std::fmt;

/// One recorded violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Which check flagged it (e.g. `gofmt`, `license header`).
    pub check: String,

    /// File or package the violation belongs to.
    pub subject: String,

    /// Tool output or a short explanation.
    pub diagnostic: String,
}

/// Ordered collection of violations found during one lint pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureLedger {
    name: String,
    entries: Vec<LedgerEntry>,
    check: String,
}

impl FailureLedger {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            check: name.clone(),
            name,
            entries: Vec::new(),
        }
    }

    /// Set the check name attached to subsequent entries.
    pub fn begin_check(&mut self, check: impl Into<String>) {
        self.check = check.into();
    }

    pub fn record(&mut self, subject: impl Into<String>, diagnostic: impl Into<String>) {
        self.entries.push(LedgerEntry {
            check: self.check.clone(),
            subject: subject.into(),
            diagnostic: diagnostic.into(),
        });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Checks that recorded at least one violation, in first-seen order.
    pub fn failed_checks(&self) -> Vec<&str> {
        let mut checks: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !checks.contains(&entry.check.as_str()) {
                checks.push(&entry.check);
            }
        }
        checks
    }

    /// One-line description for error messages.
    pub fn summary(&self) -> String {
        format!(
            "{} found {} violation(s) in: {}",
            self.name,
            self.entries.len(),
            self.failed_checks().join(", ")
        )
    }

    /// Convert into a result: `Err(PolicyViolation)` when anything was recorded.
    pub fn into_result(self) -> crate::error::Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(crate::error::GateError::PolicyViolation(self))
        }
    }
}

impl fmt::Display for FailureLedger {
    /// Full multi-line rendering, grouped by check.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for check in self.failed_checks() {
            writeln!(f, "{} checking failed:", check)?;
            for entry in self.entries.iter().filter(|e| e.check == check) {
                if entry.diagnostic.is_empty() {
                    writeln!(f, "  {}", entry.subject)?;
                } else {
                    writeln!(f, "  {}:", entry.subject)?;
                    for line in entry.diagnostic.lines() {
                        writeln!(f, "    {}", line)?;
                    }
                }
            }
        }
        Ok(())
    }
}
