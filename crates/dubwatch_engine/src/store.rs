use std::sync::Mutex;

use dubwatch_core::JobId;

/// Remembers the job being watched across restarts.
///
/// Holds at most one id. Implementations never fail: a storage fault is
/// logged and reads as "nothing persisted".
pub trait ResumeStore: Send + Sync {
    fn save(&self, job_id: &JobId);
    fn load(&self) -> Option<JobId>;
    fn clear(&self);
}

#[derive(Debug, Default)]
pub struct MemoryResumeStore {
    slot: Mutex<Option<JobId>>,
}

impl MemoryResumeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(job_id: impl Into<JobId>) -> Self {
        Self {
            slot: Mutex::new(Some(job_id.into())),
        }
    }
}

impl ResumeStore for MemoryResumeStore {
    fn save(&self, job_id: &JobId) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(job_id.clone());
        }
    }

    fn load(&self) -> Option<JobId> {
        self.slot.lock().ok().and_then(|slot| slot.clone())
    }

    fn clear(&self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}
