use std::sync::Arc;
use std::time::Duration;

use dubwatch_core::{Channel, JobId};
use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use watch_logging::{watch_debug, watch_error, watch_info, watch_warn};

use crate::{ChannelEvent, EventSink, JobService, PushFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    Exhausted,
}

/// `Idle -> Connecting -> Open -> [Backoff -> Connecting]* -> Stopped`.
/// Nothing leaves `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushState {
    Idle,
    Connecting { attempt: u32 },
    Open,
    Backoff { failures: u32 },
    Stopped(StopReason),
}

impl PushState {
    pub fn is_stopped(self) -> bool {
        matches!(self, PushState::Stopped(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    /// Consecutive failures after which the channel gives up.
    pub max_failures: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
            max_failures: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconnect {
    After(Duration),
    GiveUp,
}

/// Counts consecutive transport failures against a [`ReconnectPolicy`].
#[derive(Debug, Clone)]
pub struct ReconnectBudget {
    policy: ReconnectPolicy,
    failures: u32,
}

impl ReconnectBudget {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            failures: 0,
        }
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn record_failure(&mut self) -> Reconnect {
        self.failures = self.failures.saturating_add(1);
        if self.failures >= self.policy.max_failures {
            Reconnect::GiveUp
        } else {
            Reconnect::After(self.policy.delay)
        }
    }

    pub fn record_delivery(&mut self) {
        self.failures = 0;
    }
}

/// Supervises the server-pushed status stream of one job.
pub struct PushChannel {
    service: Arc<dyn JobService>,
    policy: ReconnectPolicy,
    state: Arc<watch::Sender<PushState>>,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl PushChannel {
    pub fn new(service: Arc<dyn JobService>, policy: ReconnectPolicy) -> Self {
        let (state, _) = watch::channel(PushState::Idle);
        Self {
            service,
            policy,
            state: Arc::new(state),
            cancel: None,
            task: None,
        }
    }

    pub fn state(&self) -> PushState {
        *self.state.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<PushState> {
        self.state.subscribe()
    }

    /// Must be called from within a tokio runtime. A channel starts once.
    pub fn start(&mut self, job_id: JobId, sink: Arc<dyn EventSink>) {
        if self.state() != PushState::Idle {
            watch_warn!("Push channel for job {} already used; ignoring start", job_id);
            return;
        }
        let cancel = CancellationToken::new();
        transition(&self.state, PushState::Connecting { attempt: 1 });
        self.task = Some(tokio::spawn(supervise(
            self.service.clone(),
            job_id,
            self.policy,
            self.state.clone(),
            sink,
            cancel.clone(),
        )));
        self.cancel = Some(cancel);
    }

    /// Closes the subscription and cancels any pending reconnect. Idempotent.
    pub fn stop(&mut self) {
        transition(&self.state, PushState::Stopped(StopReason::Requested));
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }

    /// Waits for the supervisor task to finish.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PushChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Applies a state change unless the channel has already stopped.
fn transition(state: &watch::Sender<PushState>, next: PushState) -> bool {
    state.send_if_modified(|current| {
        if current.is_stopped() || *current == next {
            return false;
        }
        *current = next;
        true
    })
}

async fn supervise(
    service: Arc<dyn JobService>,
    job_id: JobId,
    policy: ReconnectPolicy,
    state: Arc<watch::Sender<PushState>>,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
) {
    let mut budget = ReconnectBudget::new(policy);

    loop {
        let attempt = budget.failures() + 1;
        if !transition(&state, PushState::Connecting { attempt }) && state.borrow().is_stopped()
        {
            return;
        }

        let subscribed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            subscribed = service.subscribe(&job_id) => subscribed,
        };

        let failure = match subscribed {
            Ok(mut frames) => {
                if !transition(&state, PushState::Open) {
                    return;
                }
                watch_info!("Push channel open for job {}", job_id);
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return,
                        next = frames.next() => next,
                    };
                    match next {
                        Some(Ok(PushFrame::Snapshot(snapshot))) => {
                            budget.record_delivery();
                            sink.emit(ChannelEvent::Snapshot {
                                source: Channel::Push,
                                snapshot,
                            });
                        }
                        Some(Ok(PushFrame::Malformed(reason))) => {
                            watch_warn!("Dropping malformed push frame for job {}: {}", job_id, reason);
                        }
                        Some(Err(err)) => break err.to_string(),
                        None => break "stream closed by service".to_string(),
                    }
                }
            }
            Err(err) => err.to_string(),
        };

        match budget.record_failure() {
            Reconnect::After(delay) => {
                watch_warn!(
                    "Push channel for job {} failed ({}/{}): {}; reconnecting in {:?}",
                    job_id,
                    budget.failures(),
                    policy.max_failures,
                    failure,
                    delay
                );
                if !transition(
                    &state,
                    PushState::Backoff {
                        failures: budget.failures(),
                    },
                ) {
                    return;
                }
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Reconnect::GiveUp => {
                watch_error!(
                    "Push channel for job {} gave up after {} failures: {}",
                    job_id,
                    budget.failures(),
                    failure
                );
                if transition(&state, PushState::Stopped(StopReason::Exhausted)) {
                    sink.emit(ChannelEvent::PushExhausted {
                        failures: budget.failures(),
                    });
                }
                watch_debug!("Push channel for job {} stopped", job_id);
                return;
            }
        }
    }
}
