// crates/server-jobs/src/service.rs
//! Entry point used by the HTTP layer: create, read, list, delete and report.

use std::sync::Arc;

use uuid::Uuid;

use super::driver::{DriverConfig, ProgressDriver};
use super::engine::{ScanEngine, SimulatedEngine};
use super::error::{ScanError, ServiceResult};
use super::store::{InMemoryJobStore, JobStore};
use super::types::{ReportPayload, ScanId, ScanJob, ScanOptions, ScanStatus};

/// Message returned alongside the results of a completed scan.
pub const REPORT_MESSAGE: &str = "PDF report available";

/// How many fresh ids `create_scan` tries before giving up.
const MAX_ID_ATTEMPTS: usize = 8;

/// A new random scan id, e.g. `scan_3f2a...` (128-bit UUID v4).
pub fn new_scan_id() -> ScanId {
    format!("scan_{}", Uuid::new_v4().simple())
}

/// Owns the job store and starts one progress driver per created job.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct ScanService {
    store: Arc<dyn JobStore>,
    driver: ProgressDriver,
    next_id: fn() -> ScanId,
}

impl ScanService {
    pub fn new(store: Arc<dyn JobStore>, engine: Arc<dyn ScanEngine>, config: DriverConfig) -> Self {
        let driver = ProgressDriver::new(Arc::clone(&store), engine, config);
        Self {
            store,
            driver,
            next_id: new_scan_id,
        }
    }

    /// In-memory store with the simulated engine.
    pub fn in_memory(config: DriverConfig) -> Self {
        Self::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(SimulatedEngine),
            config,
        )
    }

    #[cfg(test)]
    fn with_id_generator(mut self, next_id: fn() -> ScanId) -> Self {
        self.next_id = next_id;
        self
    }

    /// Create a `running` job at 0% and start its progress driver.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn create_scan(&self, target: Option<String>, options: ScanOptions) -> ServiceResult<ScanJob> {
        let target = match target {
            Some(t) if !t.trim().is_empty() => t,
            _ => return Err(ScanError::InvalidInput("Target is required".to_string())),
        };

        let mut job = ScanJob::new((self.next_id)(), target, options);
        let mut attempts = 1;
        let created = loop {
            let snapshot = job.clone();
            match self.store.insert_new(job) {
                Ok(()) => break snapshot,
                Err(mut rejected) => {
                    if attempts >= MAX_ID_ATTEMPTS {
                        tracing::error!(attempts, "Could not allocate a unique scan id");
                        return Err(ScanError::Internal(
                            "could not allocate a unique scan id".to_string(),
                        ));
                    }
                    tracing::warn!(scan_id = %rejected.id, "Scan id collision, regenerating");
                    rejected.id = (self.next_id)();
                    job = rejected;
                    attempts += 1;
                }
            }
        };

        self.driver
            .spawn(created.id.clone(), created.target.clone(), created.options.clone());
        tracing::info!(
            scan_id = %created.id,
            target = %created.target,
            active_scans = self.store.len(),
            "Scan started"
        );
        Ok(created)
    }

    /// Snapshot of the job.
    pub fn get_scan(&self, id: &str) -> ServiceResult<ScanJob> {
        self.store
            .get(id)
            .ok_or_else(|| ScanError::NotFound(id.to_string()))
    }

    /// All jobs, newest first.
    pub fn list_scans(&self) -> Vec<ScanJob> {
        self.store.list()
    }

    /// Remove the job. A driver still ticking for it stops on its next tick.
    pub fn delete_scan(&self, id: &str) -> ServiceResult<()> {
        if !self.store.delete(id) {
            return Err(ScanError::NotFound(id.to_string()));
        }
        tracing::info!(scan_id = %id, active_scans = self.store.len(), "Scan deleted");
        Ok(())
    }

    /// Results of a completed job.
    pub fn get_report(&self, id: &str) -> ServiceResult<ReportPayload> {
        let job = self.get_scan(id)?;
        match (job.status, job.results) {
            (ScanStatus::Completed, Some(results)) => Ok(ReportPayload {
                message: REPORT_MESSAGE.to_string(),
                scan_id: job.id,
                results,
            }),
            _ => Err(ScanError::NotReady(job.id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, ScanContext};
    use crate::types::ScanResults;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn service() -> ScanService {
        ScanService::in_memory(DriverConfig::default())
    }

    fn options(pairs: &[(&str, serde_json::Value)]) -> ScanOptions {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_new_scan_id_format() {
        let id = new_scan_id();
        assert!(id.starts_with("scan_"));
        assert_eq!(id.len(), "scan_".len() + 32);
        assert_ne!(id, new_scan_id());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_scan_returns_running_job() {
        let svc = service();
        let opts = options(&[("ports", serde_json::json!([80, 443]))]);

        let job = svc
            .create_scan(Some("example.com".to_string()), opts.clone())
            .unwrap();

        assert!(job.id.starts_with("scan_"));
        assert_eq!(job.target, "example.com");
        assert_eq!(job.options, opts);
        assert_eq!(job.status, ScanStatus::Running);
        assert_eq!(job.progress, 0);
        assert!(job.results.is_none());
        assert!(job.completed_at.is_none());
        assert_eq!(svc.get_scan(&job.id).unwrap(), job);
    }

    #[tokio::test]
    async fn test_create_scan_rejects_missing_or_empty_target() {
        let svc = service();
        for target in [None, Some(String::new()), Some("   ".to_string())] {
            let err = svc.create_scan(target, ScanOptions::new()).unwrap_err();
            assert_eq!(err, ScanError::InvalidInput("Target is required".to_string()));
        }
        assert!(svc.list_scans().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_scan_keeps_target_as_supplied() {
        let svc = service();
        let job = svc
            .create_scan(Some(" example.com ".to_string()), ScanOptions::new())
            .unwrap();

        assert_eq!(job.target, " example.com ");
        assert_eq!(svc.get_scan(&job.id).unwrap().target, " example.com ");

        tokio::time::sleep(Duration::from_millis(5100)).await;
        let report = svc.get_report(&job.id).unwrap();
        assert_eq!(report.results.summary.target, " example.com ");
    }

    static COLLIDING_CALLS: AtomicUsize = AtomicUsize::new(0);

    fn colliding_ids() -> ScanId {
        // First two calls collide with each other, then fresh ids follow.
        match COLLIDING_CALLS.fetch_add(1, Ordering::SeqCst) {
            0 | 1 => "scan_dup".to_string(),
            n => format!("scan_fresh_{n}"),
        }
    }

    #[tokio::test]
    async fn test_create_scan_regenerates_colliding_id() {
        let svc = service().with_id_generator(colliding_ids);

        let first = svc.create_scan(Some("a.com".to_string()), ScanOptions::new()).unwrap();
        let second = svc.create_scan(Some("b.com".to_string()), ScanOptions::new()).unwrap();

        assert_eq!(first.id, "scan_dup");
        assert_eq!(second.id, "scan_fresh_2");
        assert_eq!(svc.get_scan("scan_dup").unwrap().target, "a.com");
        assert_eq!(svc.list_scans().len(), 2);
    }

    #[tokio::test]
    async fn test_create_scan_gives_up_on_persistent_collisions() {
        let svc = service().with_id_generator(|| "scan_same".to_string());

        svc.create_scan(Some("a.com".to_string()), ScanOptions::new()).unwrap();
        let err = svc
            .create_scan(Some("b.com".to_string()), ScanOptions::new())
            .unwrap_err();

        assert!(matches!(err, ScanError::Internal(_)));
        assert_eq!(svc.get_scan("scan_same").unwrap().target, "a.com");
        assert_eq!(svc.list_scans().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_creates_yield_distinct_ids() {
        let svc = Arc::new(service());

        let handles: Vec<_> = (0..1000)
            .map(|i| {
                let svc = Arc::clone(&svc);
                tokio::spawn(async move {
                    svc.create_scan(Some(format!("host-{i}.example.com")), ScanOptions::new())
                        .unwrap()
                        .id
                })
            })
            .collect();

        let mut ids = HashSet::new();
        for h in handles {
            ids.insert(h.await.unwrap());
        }

        assert_eq!(ids.len(), 1000);
        assert_eq!(svc.list_scans().len(), 1000);
    }

    #[tokio::test]
    async fn test_get_scan_not_found() {
        let err = service().get_scan("nonexistent").unwrap_err();
        assert_eq!(err, ScanError::NotFound("nonexistent".to_string()));
    }

    #[tokio::test]
    async fn test_list_scans_newest_first() {
        let svc = service();
        let mut created = Vec::new();
        for i in 0..5 {
            created.push(
                svc.create_scan(Some(format!("t{i}.com")), ScanOptions::new())
                    .unwrap()
                    .id,
            );
        }

        let listed = svc.list_scans();
        assert_eq!(listed.len(), 5);
        for pair in listed.windows(2) {
            assert!(pair[0].created_at >= pair[1].created_at);
        }
        created.reverse();
        let listed_ids: Vec<_> = listed.into_iter().map(|j| j.id).collect();
        assert_eq!(listed_ids, created);
    }

    #[tokio::test]
    async fn test_list_scans_empty() {
        assert!(service().list_scans().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delete_scan_while_running() {
        let svc = service();
        let job = svc.create_scan(Some("example.com".to_string()), ScanOptions::new()).unwrap();

        tokio::time::sleep(Duration::from_millis(750)).await;
        svc.delete_scan(&job.id).unwrap();

        // Let the driver run past where it would have completed.
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(svc.get_scan(&job.id).unwrap_err(), ScanError::NotFound(job.id.clone()));
        assert!(svc.list_scans().is_empty());
        assert_eq!(svc.delete_scan(&job.id).unwrap_err(), ScanError::NotFound(job.id));
    }

    #[tokio::test(start_paused = true)]
    async fn test_report_not_ready_then_ready() {
        let svc = service();
        let job = svc.create_scan(Some("example.com".to_string()), ScanOptions::new()).unwrap();

        assert_eq!(svc.get_report(&job.id).unwrap_err(), ScanError::NotReady(job.id.clone()));

        tokio::time::sleep(Duration::from_millis(5100)).await;

        let report = svc.get_report(&job.id).unwrap();
        assert_eq!(report.message, REPORT_MESSAGE);
        assert_eq!(report.scan_id, job.id);
        let stored = svc.get_scan(&job.id).unwrap();
        assert_eq!(Some(report.results), stored.results);
    }

    #[tokio::test]
    async fn test_report_not_found() {
        let err = service().get_report("nonexistent").unwrap_err();
        assert_eq!(err, ScanError::NotFound("nonexistent".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_example_com() {
        let svc = service();
        let job = svc.create_scan(Some("example.com".to_string()), ScanOptions::new()).unwrap();
        assert_eq!(svc.get_scan(&job.id).unwrap().progress, 0);

        let mut last = 0;
        let mut completed = None;
        for _ in 0..12 {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let current = svc.get_scan(&job.id).unwrap();
            assert!(current.progress >= last);
            assert!(!(current.progress == 100 && current.status == ScanStatus::Running));
            last = current.progress;
            if current.status == ScanStatus::Completed {
                completed = Some(current);
                break;
            }
        }

        let done = completed.expect("scan should complete within ~5s");
        assert_eq!(done.progress, 100);
        assert_eq!(done.results.unwrap().summary.target, "example.com");
        assert!(done.completed_at.is_some());
    }

    struct PanickingEngine;

    impl ScanEngine for PanickingEngine {
        fn scan(&self, _ctx: &ScanContext<'_>) -> Result<ScanResults, EngineError> {
            panic!("engine bug")
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_engine_leaves_service_usable() {
        let svc = ScanService::new(
            Arc::new(InMemoryJobStore::new()),
            Arc::new(PanickingEngine),
            DriverConfig::default(),
        );
        let first = svc.create_scan(Some("a.com".to_string()), ScanOptions::new()).unwrap();
        let second = svc.create_scan(Some("b.com".to_string()), ScanOptions::new()).unwrap();

        tokio::time::sleep(Duration::from_millis(5100)).await;

        for id in [&first.id, &second.id] {
            let job = svc.get_scan(id).unwrap();
            assert_eq!(job.status, ScanStatus::Failed);
            assert_eq!(job.error.as_deref(), Some("scan engine failed: engine panicked"));
            assert_eq!(svc.get_report(id).unwrap_err(), ScanError::NotReady(id.clone()));
        }
        assert_eq!(svc.list_scans().len(), 2);

        let third = svc.create_scan(Some("c.com".to_string()), ScanOptions::new()).unwrap();
        assert_eq!(svc.get_scan(&third.id).unwrap().status, ScanStatus::Running);
        svc.delete_scan(&first.id).unwrap();
        assert_eq!(svc.list_scans().len(), 2);
    }
}
