use std::sync::Arc;
use std::time::Duration;

use dubwatch_core::{Channel, ChannelState, JobId};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use watch_logging::{watch_debug, watch_warn};

use crate::{ChannelEvent, EventSink, JobService, ServiceError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1500);

/// Periodic pull of the job state, running alongside the push channel.
///
/// Transport failures are logged and the loop keeps going. It ends on `stop`
/// or when the service reports the job as unknown.
pub struct PollChannel {
    service: Arc<dyn JobService>,
    interval: Duration,
    state: ChannelState,
    cancel: Option<CancellationToken>,
    task: Option<JoinHandle<()>>,
}

impl PollChannel {
    pub fn new(service: Arc<dyn JobService>, interval: Duration) -> Self {
        Self {
            service,
            interval,
            state: ChannelState::Idle,
            cancel: None,
            task: None,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// Must be called from within a tokio runtime. A channel starts once.
    pub fn start(&mut self, job_id: JobId, sink: Arc<dyn EventSink>) {
        if self.state != ChannelState::Idle {
            watch_warn!("Poll channel for job {} already used; ignoring start", job_id);
            return;
        }
        let cancel = CancellationToken::new();
        self.task = Some(tokio::spawn(poll_loop(
            self.service.clone(),
            job_id,
            self.interval,
            sink,
            cancel.clone(),
        )));
        self.cancel = Some(cancel);
        self.state = ChannelState::Running;
    }

    pub fn stop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
        if self.state == ChannelState::Running {
            self.state = ChannelState::Stopped;
        }
    }

    /// Waits for the loop task to wind down after `stop`.
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollChannel {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    service: Arc<dyn JobService>,
    job_id: JobId,
    interval: Duration,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = service.fetch_state(&job_id) => result,
        };
        match result {
            Ok(snapshot) => sink.emit(ChannelEvent::Snapshot {
                source: Channel::Poll,
                snapshot,
            }),
            Err(ServiceError::NotFound(_)) => {
                watch_warn!("Service no longer knows job {}; polling ends", job_id);
                sink.emit(ChannelEvent::JobGone);
                break;
            }
            Err(err) => watch_warn!("Poll for job {} failed: {}", job_id, err),
        }
    }
    watch_debug!("Poll channel for job {} stopped", job_id);
}
