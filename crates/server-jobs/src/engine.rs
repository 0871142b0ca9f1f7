// crates/server-jobs/src/engine.rs
//! Scan engine seam: produces the findings attached to a completed job.

use std::time::Duration;

use rand::Rng;
use thiserror::Error;

use super::types::{RiskLevel, ScanOptions, ScanResults, ScanSummary, VulnerabilityCounts};

/// Error reported by a scan engine. Turns the job `failed`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("scan engine failed: {0}")]
pub struct EngineError(pub String);

/// Everything an engine gets to know about the scan it is finishing.
#[derive(Debug, Clone, Copy)]
pub struct ScanContext<'a> {
    pub target: &'a str,
    pub options: &'a ScanOptions,
    /// Time from the job's `created_at` to its `completed_at`.
    pub elapsed: Duration,
}

/// Source of scan findings.
///
/// Called once per job on the blocking pool, outside the store lock, right
/// before the job's final transition. A panic fails that job only.
pub trait ScanEngine: Send + Sync + 'static {
    fn scan(&self, ctx: &ScanContext<'_>) -> Result<ScanResults, EngineError>;
}

/// Placeholder engine returning random findings in the documented ranges.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedEngine;

impl ScanEngine for SimulatedEngine {
    fn scan(&self, ctx: &ScanContext<'_>) -> Result<ScanResults, EngineError> {
        let mut rng = rand::thread_rng();
        let risk_score: u8 = rng.gen_range(0..100);

        Ok(ScanResults {
            summary: ScanSummary {
                risk_score,
                risk_level: RiskLevel::from_score(risk_score),
                target: ctx.target.to_string(),
                scan_duration: format_duration(ctx.elapsed),
            },
            vulnerabilities: VulnerabilityCounts {
                critical: rng.gen_range(0..3),
                high: rng.gen_range(0..5),
                medium: rng.gen_range(0..10),
                low: rng.gen_range(0..15),
            },
            open_ports: rng.gen_range(1..=10),
        })
    }
}

/// `"12.34s"`
pub fn format_duration(elapsed: Duration) -> String {
    format!("{:.2}s", elapsed.as_secs_f64())
}
