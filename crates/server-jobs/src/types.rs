// crates/server-jobs/src/types.rs
//! Types for the scan job system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Unique identifier for a scan job.
pub type ScanId = String;

/// Caller-supplied scan options. Stored and returned as-is, never interpreted.
pub type ScanOptions = Map<String, Value>;

/// Status of a scan job.
///
/// A job starts `Running` and moves exactly once to a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Running,
    Completed,
    Failed,
}

impl ScanStatus {
    /// Whether no further mutation of the job may happen.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ScanStatus::Running)
    }
}

/// Coarse risk bucket reported in the scan summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// Bucket a 0-99 risk score into quarters.
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=24 => RiskLevel::Low,
            25..=49 => RiskLevel::Medium,
            50..=74 => RiskLevel::High,
            _ => RiskLevel::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSummary {
    pub risk_score: u8,
    pub risk_level: RiskLevel,
    pub target: String,
    /// Time from `createdAt` to `completedAt`, e.g. `"5.00s"`.
    pub scan_duration: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VulnerabilityCounts {
    pub critical: u32,
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

/// Findings attached to a job when it completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanResults {
    pub summary: ScanSummary,
    pub vulnerabilities: VulnerabilityCounts,
    pub open_ports: u32,
}

/// A tracked scan job, as stored in the job store and returned by the API.
///
/// Values handed out by the store are snapshots: mutating one does not touch
/// the stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanJob {
    pub id: ScanId,
    pub target: String,
    pub options: ScanOptions,
    pub status: ScanStatus,
    pub progress: u8,
    pub results: Option<ScanResults>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ScanJob {
    /// A fresh `running` job at 0% progress.
    pub fn new(id: ScanId, target: impl Into<String>, options: ScanOptions) -> Self {
        Self {
            id,
            target: target.into(),
            options,
            status: ScanStatus::Running,
            progress: 0,
            results: None,
            created_at: Utc::now(),
            completed_at: None,
            error: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Advance progress by `step` points, capped at 100.
    ///
    /// Returns the resulting progress. Terminal jobs are left untouched.
    pub fn advance(&mut self, step: u8) -> u8 {
        if !self.is_terminal() {
            self.progress = self.progress.saturating_add(step).min(100);
        }
        self.progress
    }

    /// Mark the job completed at 100% with its results, finished at `at`.
    ///
    /// Returns `false` (and changes nothing) if the job is already terminal.
    pub fn complete(&mut self, results: ScanResults, at: DateTime<Utc>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.progress = 100;
        self.status = ScanStatus::Completed;
        self.results = Some(results);
        self.completed_at = Some(at);
        true
    }

    /// Mark the job failed with an error detail. Progress is frozen where it is.
    ///
    /// Returns `false` (and changes nothing) if the job is already terminal.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.is_terminal() {
            return false;
        }
        self.status = ScanStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
        true
    }
}

/// Body of a report request for a completed scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportPayload {
    pub message: String,
    pub scan_id: ScanId,
    pub results: ScanResults,
}

#[cfg(test)]
pub(crate) fn sample_results(target: &str) -> ScanResults {
    ScanResults {
        summary: ScanSummary {
            risk_score: 42,
            risk_level: RiskLevel::from_score(42),
            target: target.to_string(),
            scan_duration: "5.00s".to_string(),
        },
        vulnerabilities: VulnerabilityCounts {
            critical: 1,
            high: 2,
            medium: 3,
            low: 4,
        },
        open_ports: 3,
    }
}
