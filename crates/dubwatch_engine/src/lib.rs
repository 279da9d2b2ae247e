//! Dubwatch engine: service client, update channels and effect execution.
mod persist;
mod poll;
mod push;
mod service;
mod session;
mod sse;
mod store;
mod types;
mod wire;

pub use persist::{ensure_dir, AtomicFileWriter, PersistError, StagedFile};
pub use poll::{PollChannel, DEFAULT_POLL_INTERVAL};
pub use push::{PushChannel, PushState, Reconnect, ReconnectBudget, ReconnectPolicy, StopReason};
pub use service::{JobService, PushStream, ReqwestJobService, ServiceSettings};
pub use session::{ChannelSettings, SessionHandle, SessionRunner};
pub use sse::{SseDecoder, SseEvent, MAX_LINE_BYTES};
pub use store::{MemoryResumeStore, ResumeStore};
pub use types::{ChannelEvent, EventSink, HealthReport, Language, PushFrame, ServiceError};
pub use wire::{decode_snapshot, DecodeError};
