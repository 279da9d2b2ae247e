use crate::{Channel, JobId, JobRequest, JobSnapshot, SessionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Process start: the job id found in the resume store, if any.
    ResumeRequested(Option<JobId>),
    /// The one-off state query for a resumed job finished.
    ResumeFetched {
        session: SessionId,
        result: ResumeResult,
    },
    /// User submitted the job form.
    SubmitRequested(JobRequest),
    /// The service answered a submission. `Err` carries the rejection text.
    SubmitCompleted {
        session: SessionId,
        result: Result<JobId, String>,
    },
    /// A channel delivered a snapshot.
    SnapshotReceived {
        session: SessionId,
        source: Channel,
        snapshot: JobSnapshot,
    },
    /// The push channel used up its reconnection budget.
    PushExhausted { session: SessionId },
    /// The service answered that it no longer knows the session's job.
    JobGone { session: SessionId },
    /// User discarded the current session.
    ResetRequested,
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeResult {
    Snapshot(JobSnapshot),
    NotFound,
    Unreachable(String),
}
