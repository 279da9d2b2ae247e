use crate::guard::Admission;
use crate::state::{Pending, Session};
use crate::view_model::{ChannelState, Phase, UiState};
use crate::{
    reconcile, validate_request, AppState, Channel, Effect, JobId, JobSnapshot, Msg,
    ResumeResult, SessionId,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::ResumeRequested(None) => Vec::new(),
        Msg::ResumeRequested(Some(job_id)) => {
            let mut effects = discard_current(&mut state);
            let id = state.allocate_session();
            state.pending = Some(Pending::Resume {
                id,
                job_id: job_id.clone(),
            });
            state.phase = Phase::Resuming;
            state.mark_dirty();
            effects.push(Effect::FetchResumeState {
                session: id,
                job_id,
            });
            effects
        }
        Msg::ResumeFetched { session, result } => {
            let job_id = match state.pending.take() {
                Some(Pending::Resume { id, job_id }) if id == session => job_id,
                other => {
                    state.pending = other;
                    return (state, Vec::new());
                }
            };
            match result {
                ResumeResult::Snapshot(snapshot) if snapshot.is_terminal() => {
                    state.session = Some(Session::finished_without_channels(session, job_id));
                    state.ui = reconcile(&snapshot).ui;
                    state.phase = Phase::Finished;
                    state.mark_dirty();
                    vec![Effect::ClearPersistedJob]
                }
                ResumeResult::Snapshot(snapshot) => {
                    let mut effects = begin_watching(&mut state, session, job_id);
                    apply_snapshot(&mut state, Channel::Poll, snapshot, &mut effects);
                    effects
                }
                ResumeResult::NotFound => {
                    state.phase = Phase::Idle;
                    state.mark_dirty();
                    vec![Effect::ClearPersistedJob]
                }
                ResumeResult::Unreachable(reason) => {
                    state.phase = Phase::Idle;
                    state.notice = Some(format!(
                        "Could not reach the service to resume job {job_id}: {reason}"
                    ));
                    state.mark_dirty();
                    vec![Effect::ClearPersistedJob]
                }
            }
        }
        Msg::SubmitRequested(request) => {
            if state.phase == Phase::Submitting {
                return (state, Vec::new());
            }
            match validate_request(&request) {
                Err(err) => {
                    state.notice = Some(err.to_string());
                    state.mark_dirty();
                    Vec::new()
                }
                Ok(url) => {
                    let mut effects = discard_current(&mut state);
                    if !effects.is_empty() {
                        effects.push(Effect::ClearPersistedJob);
                    }
                    let id = state.allocate_session();
                    state.pending = Some(Pending::Submit { id });
                    state.notice = None;
                    state.phase = Phase::Submitting;
                    state.mark_dirty();
                    effects.push(Effect::SubmitJob {
                        session: id,
                        request: crate::JobRequest { url, ..request },
                    });
                    effects
                }
            }
        }
        Msg::SubmitCompleted { session, result } => {
            match state.pending.take() {
                Some(Pending::Submit { id }) if id == session => {}
                other => {
                    state.pending = other;
                    return (state, Vec::new());
                }
            }
            match result {
                Ok(job_id) => begin_watching(&mut state, session, job_id),
                Err(reason) => {
                    state.phase = Phase::Idle;
                    state.notice = Some(format!("Submission failed: {reason}"));
                    state.mark_dirty();
                    Vec::new()
                }
            }
        }
        Msg::SnapshotReceived {
            session,
            source,
            snapshot,
        } => {
            if state.live_session_id() != Some(session) {
                return (state, Vec::new());
            }
            let mut effects = Vec::new();
            apply_snapshot(&mut state, source, snapshot, &mut effects);
            effects
        }
        Msg::PushExhausted { session } => {
            if let Some(current) = state.session.as_mut().filter(|s| s.id == session) {
                if current.push != ChannelState::Stopped {
                    current.push = ChannelState::Stopped;
                    state.mark_dirty();
                }
            }
            Vec::new()
        }
        Msg::JobGone { session } => {
            let Some(current) = state.session.as_mut().filter(|s| s.id == session && s.is_live())
            else {
                return (state, Vec::new());
            };
            current.finished = true;
            current.push = ChannelState::Stopped;
            current.poll = ChannelState::Stopped;
            state.notice = Some(format!(
                "Job {} is no longer known to the service",
                current.job_id
            ));
            state.phase = Phase::Finished;
            state.mark_dirty();
            vec![Effect::StopChannels { session }, Effect::ClearPersistedJob]
        }
        Msg::ResetRequested => {
            let mut effects = discard_current(&mut state);
            effects.push(Effect::ClearPersistedJob);
            state.phase = Phase::Idle;
            state.ui = UiState::default();
            state.notice = None;
            state.mark_dirty();
            effects
        }
        Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

/// Tears down whatever session or request is in flight. Returns the stop
/// effect for a session whose channels are still open.
fn discard_current(state: &mut AppState) -> Vec<Effect> {
    state.pending = None;
    match state.session.take() {
        Some(session) if session.is_live() => vec![Effect::StopChannels {
            session: session.id,
        }],
        _ => Vec::new(),
    }
}

fn begin_watching(state: &mut AppState, id: SessionId, job_id: JobId) -> Vec<Effect> {
    state.session = Some(Session::watching(id, job_id.clone()));
    state.ui = UiState::default();
    state.phase = Phase::Watching;
    state.mark_dirty();
    vec![
        Effect::PersistJob {
            job_id: job_id.clone(),
        },
        Effect::StartChannels {
            session: id,
            job_id,
        },
    ]
}

fn apply_snapshot(
    state: &mut AppState,
    source: Channel,
    snapshot: JobSnapshot,
    effects: &mut Vec<Effect>,
) {
    let Some(session) = state.session.as_mut().filter(|s| s.is_live()) else {
        return;
    };
    if snapshot.job_id != session.job_id {
        return;
    }

    if session.guard.admit(&snapshot) == Admission::Regressed {
        effects.push(Effect::StaleSnapshotDropped {
            session: session.id,
            source,
            stage: snapshot.stage,
            progress: snapshot.progress,
        });
        return;
    }

    let reconciled = reconcile(&snapshot);
    if reconciled.terminal {
        session.finished = true;
        session.push = ChannelState::Stopped;
        session.poll = ChannelState::Stopped;
        effects.push(Effect::StopChannels {
            session: session.id,
        });
        effects.push(Effect::ClearPersistedJob);
        state.phase = Phase::Finished;
    }
    state.ui = reconciled.ui;
    state.mark_dirty();
}
