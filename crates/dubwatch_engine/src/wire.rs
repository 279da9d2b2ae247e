use dubwatch_core::{JobId, JobSnapshot, JobStatus, Stage};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("service reported: {0}")]
    ServiceMessage(String),
    #[error("missing job status")]
    MissingStatus,
    #[error("unknown job status {0:?}")]
    UnknownStatus(String),
}

#[derive(Debug, Deserialize)]
struct WireJob {
    status: Option<String>,
    stage: Option<String>,
    progress: Option<f64>,
    message: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireSubmitted {
    pub job_id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireError {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireLanguages {
    pub languages: Vec<crate::Language>,
}

/// Decodes a job state document. The service does not echo the id, so the
/// caller supplies the one it asked about.
pub fn decode_snapshot(job_id: &JobId, body: &[u8]) -> Result<JobSnapshot, DecodeError> {
    let wire: WireJob = serde_json::from_slice(body)?;
    let raw_status = match wire.status {
        Some(status) => status,
        None => {
            return Err(match wire.error {
                Some(error) => DecodeError::ServiceMessage(error),
                None => DecodeError::MissingStatus,
            })
        }
    };
    let status =
        JobStatus::parse(&raw_status).ok_or(DecodeError::UnknownStatus(raw_status))?;

    Ok(JobSnapshot {
        job_id: job_id.clone(),
        status,
        stage: wire.stage.as_deref().and_then(Stage::parse),
        progress: wire.progress.map(|p| p.round() as i32).unwrap_or(0),
        message: wire.message,
        error: wire.error.filter(|_| status == JobStatus::Error),
    })
}
