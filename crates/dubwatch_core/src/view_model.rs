use crate::{JobId, Stage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageDisplay {
    Pending,
    InProgress,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageRow {
    pub stage: Stage,
    pub display: StageDisplay,
}

/// Reference to the finished artifact of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRef {
    pub job_id: JobId,
}

impl DownloadRef {
    /// Service-relative path of the artifact.
    pub fn path(&self) -> String {
        format!("/api/download/{}", self.job_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { download: DownloadRef },
    Failure { error: String },
}

/// Display state computed from a single snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UiState {
    pub stages: Vec<StageRow>,
    /// Always within `0..=100`.
    pub progress: u8,
    pub message: Option<String>,
    pub outcome: Option<Outcome>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            stages: Stage::ALL
                .into_iter()
                .map(|stage| StageRow {
                    stage,
                    display: StageDisplay::Pending,
                })
                .collect(),
            progress: 0,
            message: None,
            outcome: None,
        }
    }
}

impl UiState {
    pub fn display_of(&self, stage: Stage) -> Option<StageDisplay> {
        self.stages
            .iter()
            .find(|row| row.stage == stage)
            .map(|row| row.display)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Idle,
    Running,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Submitting,
    Resuming,
    Watching,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub phase: Phase,
    pub job_id: Option<JobId>,
    pub ui: UiState,
    pub push: ChannelState,
    pub poll: ChannelState,
    /// Inline notice for rejected input or a failed submission.
    pub notice: Option<String>,
    pub dirty: bool,
}
