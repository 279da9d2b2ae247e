use std::fmt;

/// Opaque identifier the service assigns to a submitted job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(String);

impl JobId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for JobId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Queued,
    Running,
    Complete,
    Error,
}

impl JobStatus {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "complete" => Some(Self::Complete),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Error)
    }
}

/// Pipeline position. Ordering follows the pipeline, not wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Download,
    Transcribe,
    Chunk,
    Translate,
    Tts,
    Render,
    Done,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Download,
        Stage::Transcribe,
        Stage::Chunk,
        Stage::Translate,
        Stage::Tts,
        Stage::Render,
        Stage::Done,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Parses a wire stage name. Names outside the ordered sequence (the
    /// service also reports `init` and `queued`) yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.wire_name() == raw)
    }

    pub fn wire_name(self) -> &'static str {
        match self {
            Stage::Download => "download",
            Stage::Transcribe => "transcribe",
            Stage::Chunk => "chunk",
            Stage::Translate => "translate",
            Stage::Tts => "tts",
            Stage::Render => "render",
            Stage::Done => "done",
        }
    }
}

/// One point-in-time description of a job, identical in shape whichever
/// channel produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub status: JobStatus,
    pub stage: Option<Stage>,
    /// Raw percentage as reported; clamped only for display.
    pub progress: i32,
    pub message: Option<String>,
    pub error: Option<String>,
}

impl JobSnapshot {
    pub fn new(job_id: impl Into<JobId>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
            stage: None,
            progress: 0,
            message: None,
            error: None,
        }
    }

    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stage = Some(stage);
        self
    }

    pub fn with_progress(mut self, progress: i32) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_parse_skips_names_outside_the_pipeline() {
        assert_eq!(Stage::parse("tts"), Some(Stage::Tts));
        assert_eq!(Stage::parse("init"), None);
        assert_eq!(Stage::parse("queued"), None);
    }

    #[test]
    fn stage_index_follows_pipeline_order() {
        let indexes: Vec<_> = Stage::ALL.iter().map(|s| s.index()).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3, 4, 5, 6]);
    }
}
