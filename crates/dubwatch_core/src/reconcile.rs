use crate::{
    DownloadRef, JobSnapshot, JobStatus, Outcome, Stage, StageDisplay, StageRow, UiState,
};

const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    pub ui: UiState,
    pub terminal: bool,
}

/// Computes the display state for a snapshot.
///
/// Takes no notion of which channel produced the snapshot; the same input
/// always yields the same output.
pub fn reconcile(snapshot: &JobSnapshot) -> Reconciled {
    match snapshot.status {
        JobStatus::Complete => Reconciled {
            ui: UiState {
                stages: rows(|_| StageDisplay::Complete),
                progress: 100,
                message: snapshot.message.clone(),
                outcome: Some(Outcome::Success {
                    download: DownloadRef {
                        job_id: snapshot.job_id.clone(),
                    },
                }),
            },
            terminal: true,
        },
        JobStatus::Error => Reconciled {
            ui: UiState {
                stages: stage_rows(snapshot),
                progress: clamp_progress(snapshot.progress),
                message: snapshot.message.clone(),
                outcome: Some(Outcome::Failure {
                    error: snapshot
                        .error
                        .clone()
                        .unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
                }),
            },
            terminal: true,
        },
        JobStatus::Queued | JobStatus::Running => Reconciled {
            ui: UiState {
                stages: stage_rows(snapshot),
                progress: clamp_progress(snapshot.progress),
                message: snapshot.message.clone(),
                outcome: None,
            },
            terminal: false,
        },
    }
}

fn stage_rows(snapshot: &JobSnapshot) -> Vec<StageRow> {
    let Some(current) = snapshot.stage else {
        return rows(|_| StageDisplay::Pending);
    };
    let running = snapshot.status == JobStatus::Running;
    rows(|stage| {
        if stage.index() < current.index() {
            StageDisplay::Complete
        } else if stage == current && running {
            StageDisplay::InProgress
        } else {
            StageDisplay::Pending
        }
    })
}

fn rows(display: impl Fn(Stage) -> StageDisplay) -> Vec<StageRow> {
    Stage::ALL
        .into_iter()
        .map(|stage| StageRow {
            stage,
            display: display(stage),
        })
        .collect()
}

fn clamp_progress(progress: i32) -> u8 {
    progress.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_is_clamped_for_display() {
        let over = JobSnapshot::new("a", JobStatus::Running).with_progress(140);
        let under = JobSnapshot::new("a", JobStatus::Running).with_progress(-3);
        assert_eq!(reconcile(&over).ui.progress, 100);
        assert_eq!(reconcile(&under).ui.progress, 0);
    }

    #[test]
    fn failure_without_text_gets_placeholder() {
        let snapshot = JobSnapshot::new("a", JobStatus::Error);
        assert_eq!(
            reconcile(&snapshot).ui.outcome,
            Some(Outcome::Failure {
                error: UNKNOWN_ERROR.to_string()
            })
        );
    }
}
