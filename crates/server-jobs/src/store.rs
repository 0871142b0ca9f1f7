// crates/server-jobs/src/store.rs
//! Concurrency-safe keyed storage for scan jobs.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::types::{ScanId, ScanJob};

/// Storage for scan jobs, shared by the service and every progress driver.
///
/// Implementations must serialize mutations of a record and only ever hand
/// out whole snapshots, so a reader never sees a half-applied transition.
pub trait JobStore: Send + Sync + 'static {
    /// Insert or replace the record for `job.id`.
    fn put(&self, job: ScanJob);

    /// Insert only if no record with the same id exists.
    ///
    /// Gives the job back on collision so the caller can retry with a new id.
    fn insert_new(&self, job: ScanJob) -> Result<(), ScanJob>;

    /// Snapshot of the record, if present.
    fn get(&self, id: &str) -> Option<ScanJob>;

    /// Snapshot of every record, newest `created_at` first.
    fn list(&self) -> Vec<ScanJob>;

    /// Remove the record. Returns whether it existed.
    fn delete(&self, id: &str) -> bool;

    /// Apply `mutator` to the record atomically.
    ///
    /// Returns `false` without calling `mutator` when the id is absent
    /// (e.g. the job was deleted while its driver was still ticking).
    fn update(&self, id: &str, mutator: &mut dyn FnMut(&mut ScanJob)) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

struct Entry {
    /// Insertion sequence, used to order jobs created in the same instant.
    seq: u64,
    job: ScanJob,
}

/// In-process job store backed by a `RwLock<HashMap>`.
///
/// Uses `std::sync::RwLock` (not `tokio::sync::RwLock`): every critical
/// section is a short in-memory operation and the lock is never held across
/// an `.await`.
pub struct InMemoryJobStore {
    next_seq: AtomicU64,
    jobs: RwLock<HashMap<ScanId, Entry>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self {
            next_seq: AtomicU64::new(0),
            jobs: RwLock::new(HashMap::new()),
        }
    }

    fn seq(&self) -> u64 {
        self.next_seq.fetch_add(1, Ordering::Relaxed)
    }

    // Each mutation is a single assignment or map operation, so a poisoned map
    // is still consistent: recover it instead of treating it as empty.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<ScanId, Entry>> {
        self.jobs.read().unwrap_or_else(|e| {
            tracing::warn!("RwLock poisoned reading jobs map, recovering");
            self.jobs.clear_poison();
            e.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ScanId, Entry>> {
        self.jobs.write().unwrap_or_else(|e| {
            tracing::warn!("RwLock poisoned writing jobs map, recovering");
            self.jobs.clear_poison();
            e.into_inner()
        })
    }
}

impl Default for InMemoryJobStore {
    fn default() -> Self {
        Self::new()
    }
}

impl JobStore for InMemoryJobStore {
    fn put(&self, job: ScanJob) {
        let mut jobs = self.write();
        match jobs.get_mut(&job.id) {
            Some(entry) => entry.job = job,
            None => {
                let seq = self.seq();
                jobs.insert(job.id.clone(), Entry { seq, job });
            }
        }
    }

    fn insert_new(&self, job: ScanJob) -> Result<(), ScanJob> {
        let mut jobs = self.write();
        if jobs.contains_key(&job.id) {
            return Err(job);
        }
        let seq = self.seq();
        jobs.insert(job.id.clone(), Entry { seq, job });
        Ok(())
    }

    fn get(&self, id: &str) -> Option<ScanJob> {
        self.read().get(id).map(|e| e.job.clone())
    }

    fn list(&self) -> Vec<ScanJob> {
        let mut entries: Vec<(u64, ScanJob)> = self
            .read()
            .values()
            .map(|e| (e.seq, e.job.clone()))
            .collect();
        entries.sort_by(|(seq_a, a), (seq_b, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| seq_b.cmp(seq_a))
        });
        entries.into_iter().map(|(_, job)| job).collect()
    }

    fn delete(&self, id: &str) -> bool {
        self.write().remove(id).is_some()
    }

    fn update(&self, id: &str, mutator: &mut dyn FnMut(&mut ScanJob)) -> bool {
        match self.write().get_mut(id) {
            Some(entry) => {
                mutator(&mut entry.job);
                true
            }
            None => false,
        }
    }

    fn len(&self) -> usize {
        self.read().len()
    }
}
