use crate::{Channel, JobId, JobRequest, SessionId, Stage};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Query the state of a resumed job once.
    FetchResumeState { session: SessionId, job_id: JobId },
    SubmitJob {
        session: SessionId,
        request: JobRequest,
    },
    PersistJob { job_id: JobId },
    ClearPersistedJob,
    /// Open both the push and the poll channel for the job.
    StartChannels { session: SessionId, job_id: JobId },
    /// Stop both channels of the session. Safe to repeat.
    StopChannels { session: SessionId },
    /// A snapshot older than what is already displayed was discarded.
    StaleSnapshotDropped {
        session: SessionId,
        source: Channel,
        stage: Option<Stage>,
        progress: i32,
    },
}
