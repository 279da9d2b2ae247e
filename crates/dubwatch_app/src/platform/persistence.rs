use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use dubwatch_core::JobId;
use dubwatch_engine::{AtomicFileWriter, ResumeStore};
use serde::{Deserialize, Serialize};
use watch_logging::{watch_error, watch_info, watch_warn};

const RESUME_FILENAME: &str = ".dubwatch_resume.ron";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedJob {
    job_id: String,
    saved_at: String,
}

/// Resume store backed by a ron file in the state directory.
#[derive(Debug, Clone)]
pub struct FileResumeStore {
    writer: AtomicFileWriter,
}

impl FileResumeStore {
    pub fn new(state_dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(state_dir),
        }
    }

    pub fn path(&self) -> PathBuf {
        self.writer.dir().join(RESUME_FILENAME)
    }

    /// When the persisted job was saved, if there is one.
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        let persisted = read_persisted(&self.path())?;
        DateTime::parse_from_rfc3339(&persisted.saved_at)
            .map(|at| at.with_timezone(&Utc))
            .ok()
    }
}

impl ResumeStore for FileResumeStore {
    fn save(&self, job_id: &JobId) {
        let persisted = PersistedJob {
            job_id: job_id.as_str().to_string(),
            saved_at: Utc::now().to_rfc3339(),
        };
        let pretty = ron::ser::PrettyConfig::new();
        let content = match ron::ser::to_string_pretty(&persisted, pretty) {
            Ok(text) => text,
            Err(err) => {
                watch_error!("Failed to serialize resume state: {}", err);
                return;
            }
        };
        if let Err(err) = self.writer.write(RESUME_FILENAME, content.as_bytes()) {
            watch_error!(
                "Failed to write resume state to {:?}: {}",
                self.writer.dir(),
                err
            );
        }
    }

    fn load(&self) -> Option<JobId> {
        let persisted = read_persisted(&self.path())?;
        if persisted.job_id.trim().is_empty() {
            watch_warn!("Ignoring resume state with an empty job id");
            return None;
        }
        watch_info!(
            "Loaded job {} saved at {}",
            persisted.job_id,
            persisted.saved_at
        );
        Some(JobId::new(persisted.job_id))
    }

    fn clear(&self) {
        if let Err(err) = self.writer.remove(RESUME_FILENAME) {
            watch_error!("Failed to clear resume state: {}", err);
        }
    }
}

fn read_persisted(path: &Path) -> Option<PersistedJob> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
        Err(err) => {
            watch_warn!("Failed to read resume state from {:?}: {}", path, err);
            return None;
        }
    };
    match ron::from_str(&content) {
        Ok(persisted) => Some(persisted),
        Err(err) => {
            watch_warn!("Failed to parse resume state from {:?}: {}", path, err);
            None
        }
    }
}
