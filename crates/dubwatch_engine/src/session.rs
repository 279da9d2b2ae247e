use std::sync::Arc;
use std::time::Duration;

use dubwatch_core::{
    update, AppState, AppViewModel, ChannelState, Effect, JobRequest, Msg, ResumeResult,
    SessionId,
};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use watch_logging::{watch_debug, watch_info, watch_warn};

use crate::poll::{PollChannel, DEFAULT_POLL_INTERVAL};
use crate::push::{PushChannel, PushState, ReconnectPolicy};
use crate::{ChannelEvent, EventSink, JobService, ResumeStore, ServiceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSettings {
    pub poll_interval: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

struct ActiveChannels {
    session: SessionId,
    push: PushChannel,
    poll: PollChannel,
}

impl ActiveChannels {
    fn stop(&mut self) {
        self.push.stop();
        self.poll.stop();
    }
}

/// Routes channel events into the runner's inbox, tagged with the session.
struct SessionSink {
    session: SessionId,
    tx: mpsc::UnboundedSender<Msg>,
}

impl EventSink for SessionSink {
    fn emit(&self, event: ChannelEvent) {
        let msg = match event {
            ChannelEvent::Snapshot { source, snapshot } => Msg::SnapshotReceived {
                session: self.session,
                source,
                snapshot,
            },
            ChannelEvent::PushExhausted { .. } => Msg::PushExhausted {
                session: self.session,
            },
            ChannelEvent::JobGone => Msg::JobGone {
                session: self.session,
            },
        };
        let _ = self.tx.send(msg);
    }
}

/// Cloneable front door for a runner that lives on another task.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Msg>,
    views: watch::Receiver<AppViewModel>,
}

impl SessionHandle {
    pub fn submit(&self, request: JobRequest) {
        let _ = self.tx.send(Msg::SubmitRequested(request));
    }

    pub fn reset(&self) {
        let _ = self.tx.send(Msg::ResetRequested);
    }

    pub fn views(&self) -> watch::Receiver<AppViewModel> {
        self.views.clone()
    }
}

/// Executes the effects of the core state machine.
///
/// All messages, whether from the user, a finished request or either channel,
/// go through one inbox and are applied one at a time.
pub struct SessionRunner {
    service: Arc<dyn JobService>,
    store: Arc<dyn ResumeStore>,
    settings: ChannelSettings,
    state: AppState,
    channels: Option<ActiveChannels>,
    inbox_tx: mpsc::UnboundedSender<Msg>,
    inbox_rx: mpsc::UnboundedReceiver<Msg>,
    view_tx: watch::Sender<AppViewModel>,
}

impl SessionRunner {
    pub fn new(
        service: Arc<dyn JobService>,
        store: Arc<dyn ResumeStore>,
        settings: ChannelSettings,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let state = AppState::new();
        let (view_tx, _) = watch::channel(state.view());
        Self {
            service,
            store,
            settings,
            state,
            channels: None,
            inbox_tx,
            inbox_rx,
            view_tx,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            tx: self.inbox_tx.clone(),
            views: self.view_tx.subscribe(),
        }
    }

    pub fn view(&self) -> AppViewModel {
        self.state.view()
    }

    /// Push channel state and poll channel state of the most recent session.
    pub fn channel_states(&self) -> Option<(PushState, ChannelState)> {
        self.channels
            .as_ref()
            .map(|channels| (channels.push.state(), channels.poll.state()))
    }

    /// Picks up the job left in the resume store, if any.
    pub fn resume(&mut self) {
        let stored = self.store.load();
        match &stored {
            Some(job_id) => watch_info!("Resuming job {}", job_id),
            None => watch_debug!("No job to resume"),
        }
        self.dispatch(Msg::ResumeRequested(stored));
    }

    pub fn submit(&mut self, request: JobRequest) {
        self.dispatch(Msg::SubmitRequested(request));
    }

    pub fn reset(&mut self) {
        self.dispatch(Msg::ResetRequested);
    }

    pub fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            self.view_tx.send_replace(state.view());
        }
        self.state = state;
        for effect in effects {
            self.execute(effect);
        }
    }

    /// Processes inbox messages until `done` holds for the current view.
    pub async fn run_until<F>(&mut self, mut done: F)
    where
        F: FnMut(&AppViewModel) -> bool,
    {
        while !done(&self.state.view()) {
            match self.inbox_rx.recv().await {
                Some(msg) => self.dispatch(msg),
                None => break,
            }
        }
    }

    /// Processes inbox messages until `shutdown` fires, then closes channels.
    pub async fn run(mut self, shutdown: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                msg = self.inbox_rx.recv() => match msg {
                    Some(msg) => self.dispatch(msg),
                    None => break,
                },
            }
        }
        if let Some(channels) = self.channels.as_mut() {
            channels.stop();
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::FetchResumeState { session, job_id } => {
                let service = self.service.clone();
                let tx = self.inbox_tx.clone();
                tokio::spawn(async move {
                    let result = match service.fetch_state(&job_id).await {
                        Ok(snapshot) => ResumeResult::Snapshot(snapshot),
                        Err(ServiceError::NotFound(_)) => {
                            watch_info!("Job {} is unknown to the service; forgetting it", job_id);
                            ResumeResult::NotFound
                        }
                        Err(err) => {
                            watch_warn!("Could not query resumed job {}: {}", job_id, err);
                            ResumeResult::Unreachable(err.to_string())
                        }
                    };
                    let _ = tx.send(Msg::ResumeFetched { session, result });
                });
            }
            Effect::SubmitJob { session, request } => {
                let service = self.service.clone();
                let tx = self.inbox_tx.clone();
                tokio::spawn(async move {
                    let result = match service.submit(&request).await {
                        Ok(job_id) => {
                            watch_info!("Submitted {} as job {}", request.url, job_id);
                            Ok(job_id)
                        }
                        Err(err) => {
                            watch_warn!("Submission of {} failed: {}", request.url, err);
                            Err(err.to_string())
                        }
                    };
                    let _ = tx.send(Msg::SubmitCompleted { session, result });
                });
            }
            Effect::PersistJob { job_id } => self.store.save(&job_id),
            Effect::ClearPersistedJob => self.store.clear(),
            Effect::StartChannels { session, job_id } => {
                if let Some(previous) = self.channels.as_mut() {
                    previous.stop();
                }
                let sink: Arc<dyn EventSink> = Arc::new(SessionSink {
                    session,
                    tx: self.inbox_tx.clone(),
                });
                let mut push = PushChannel::new(self.service.clone(), self.settings.reconnect);
                let mut poll = PollChannel::new(self.service.clone(), self.settings.poll_interval);
                push.start(job_id.clone(), sink.clone());
                poll.start(job_id.clone(), sink);
                watch_info!("Watching job {} ({})", job_id, session);
                self.channels = Some(ActiveChannels {
                    session,
                    push,
                    poll,
                });
            }
            Effect::StopChannels { session } => {
                if let Some(channels) = self
                    .channels
                    .as_mut()
                    .filter(|channels| channels.session == session)
                {
                    channels.stop();
                    watch_debug!("Stopped channels of {}", session);
                }
            }
            Effect::StaleSnapshotDropped {
                session,
                source,
                stage,
                progress,
            } => {
                watch_debug!(
                    "Dropped stale {} snapshot for {} (stage {:?}, progress {})",
                    source,
                    session,
                    stage,
                    progress
                );
            }
        }
    }
}
