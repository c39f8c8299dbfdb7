//! Install outcomes, per module and per batch.

use serde::Serialize;
use std::fmt;

/// Final state of one module after an install attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallStatus {
    /// Files copied (or rewritten with force) and aggregators wired.
    Installed,
    /// Module directory already present; aggregators re-checked.
    Skipped,
    /// A prerequisite module is absent or failed earlier in the batch.
    DependencyMissing,
    /// Files are in place but at least one aggregator could not be updated.
    PartialFailure,
    /// Nothing usable was produced for this module.
    Failed,
}

impl InstallStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Installed => "installed",
            Self::Skipped => "skipped",
            Self::DependencyMissing => "dependency_missing",
            Self::PartialFailure => "partial_failure",
            Self::Failed => "failed",
        }
    }

    /// Whether the module ended up usable in the project.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Installed | Self::Skipped)
    }
}

impl fmt::Display for InstallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened to one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOutcome {
    Created,
    Updated,
    Unchanged,
    Skipped,
    Failed,
}

impl ChangeOutcome {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Unchanged => "unchanged",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ChangeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One file touched (or deliberately left alone) during an install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    /// Project-relative, forward-slash path.
    pub path: String,
    pub outcome: ChangeOutcome,
}

impl FileChange {
    pub fn new(path: impl Into<String>, outcome: ChangeOutcome) -> Self {
        Self {
            path: path.into(),
            outcome,
        }
    }
}

/// Result of installing a single module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub module: String,
    pub status: InstallStatus,
    /// Human-readable reasons and warnings, in the order they arose.
    pub details: Vec<String>,
    pub changes: Vec<FileChange>,
    /// True when nothing was written.
    pub dry_run: bool,
    /// Prerequisites installed first on behalf of this module.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub prerequisites: Vec<InstallReport>,
}

impl InstallReport {
    pub fn new(module: impl Into<String>, status: InstallStatus) -> Self {
        Self {
            module: module.into(),
            status,
            details: Vec::new(),
            changes: Vec::new(),
            dry_run: false,
            prerequisites: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    pub fn record(&mut self, path: impl Into<String>, outcome: ChangeOutcome) {
        self.changes.push(FileChange::new(path, outcome));
    }

    /// Files whose content changed (or would change, in a dry run).
    pub fn written(&self) -> impl Iterator<Item = &FileChange> {
        self.changes
            .iter()
            .filter(|c| matches!(c.outcome, ChangeOutcome::Created | ChangeOutcome::Updated))
    }
}

/// Per-status totals of a batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchCounts {
    pub installed: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Result of installing several modules in dependency order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub reports: Vec<InstallReport>,
}

impl BatchReport {
    pub fn push(&mut self, report: InstallReport) {
        self.reports.push(report);
    }

    pub fn get(&self, module: &str) -> Option<&InstallReport> {
        self.reports.iter().find(|r| r.module == module)
    }

    /// Installed, skipped, and everything else counted as failed.
    pub fn counts(&self) -> BatchCounts {
        self.reports
            .iter()
            .fold(BatchCounts::default(), |mut acc, r| {
                match r.status {
                    InstallStatus::Installed => acc.installed += 1,
                    InstallStatus::Skipped => acc.skipped += 1,
                    _ => acc.failed += 1,
                }
                acc
            })
    }

    pub fn is_complete(&self) -> bool {
        self.reports.iter().all(|r| r.status.is_success())
    }
}

/// Result of removing a module from a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveReport {
    pub module: String,
    /// Project-relative directory that was deleted.
    pub removed_dir: String,
    /// Whether the route registration was removed.
    pub unregistered: bool,
    pub details: Vec<String>,
}

/// Installed state of a module, derived from the project tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleState {
    pub module: String,
    pub files_present: bool,
    pub registered: bool,
}

impl ModuleState {
    pub fn is_installed(&self) -> bool {
        self.files_present && self.registered
    }
}
