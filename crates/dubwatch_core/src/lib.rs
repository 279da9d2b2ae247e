//! Dubwatch core: job snapshots, the progress reconciler and the pure session
//! state machine. Nothing in here performs IO.
mod effect;
mod guard;
mod msg;
mod reconcile;
mod request;
mod snapshot;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use guard::{Admission, ProgressGuard};
pub use msg::{Msg, ResumeResult};
pub use reconcile::{reconcile, Reconciled};
pub use request::{validate_request, JobRequest, ValidationError, VoiceGender};
pub use snapshot::{JobId, JobSnapshot, JobStatus, Stage};
pub use state::{AppState, Channel, Session, SessionId};
pub use update::update;
pub use view_model::{
    AppViewModel, ChannelState, DownloadRef, Outcome, Phase, StageDisplay, StageRow, UiState,
};
