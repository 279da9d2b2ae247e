use std::fmt;

use crate::guard::ProgressGuard;
use crate::view_model::{AppViewModel, ChannelState, Phase, UiState};
use crate::JobId;

/// Tags every asynchronous result with the session that asked for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// Which update channel produced a snapshot. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Push,
    Poll,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Push => f.write_str("push"),
            Channel::Poll => f.write_str("poll"),
        }
    }
}

/// The job currently being watched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub job_id: JobId,
    pub push: ChannelState,
    pub poll: ChannelState,
    pub(crate) guard: ProgressGuard,
    pub finished: bool,
}

impl Session {
    pub(crate) fn watching(id: SessionId, job_id: JobId) -> Self {
        Self {
            id,
            job_id,
            push: ChannelState::Running,
            poll: ChannelState::Running,
            guard: ProgressGuard::new(),
            finished: false,
        }
    }

    pub(crate) fn finished_without_channels(id: SessionId, job_id: JobId) -> Self {
        Self {
            id,
            job_id,
            push: ChannelState::Idle,
            poll: ChannelState::Idle,
            guard: ProgressGuard::new(),
            finished: true,
        }
    }

    pub fn is_live(&self) -> bool {
        !self.finished
    }
}

/// A session that has been requested but has no confirmed job yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Pending {
    Submit { id: SessionId },
    Resume { id: SessionId, job_id: JobId },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    next_session: u64,
    pub(crate) pending: Option<Pending>,
    pub(crate) session: Option<Session>,
    pub(crate) phase: Phase,
    pub(crate) ui: UiState,
    pub(crate) notice: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        let (push, poll) = self
            .session
            .as_ref()
            .map(|session| (session.push, session.poll))
            .unwrap_or_default();
        AppViewModel {
            phase: self.phase,
            job_id: self.session.as_ref().map(|session| session.job_id.clone()),
            ui: self.ui.clone(),
            push,
            poll,
            notice: self.notice.clone(),
            dirty: self.dirty,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Returns whether the view changed since the last call and resets the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn allocate_session(&mut self) -> SessionId {
        self.next_session += 1;
        SessionId(self.next_session)
    }

    pub(crate) fn live_session_id(&self) -> Option<SessionId> {
        self.session
            .as_ref()
            .filter(|session| session.is_live())
            .map(|session| session.id)
    }
}
