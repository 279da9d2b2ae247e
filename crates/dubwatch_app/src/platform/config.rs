//! `dubwatch.ron` settings.
//!
//! Every field has a default, so a missing file or a file naming only a few
//! fields is fine. A file that exists but does not parse is an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use dubwatch_engine::{ChannelSettings, ReconnectPolicy, ServiceSettings};
use serde::{Deserialize, Serialize};
use watch_logging::watch_debug;

pub const CONFIG_FILENAME: &str = "dubwatch.ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub base_url: String,
    pub poll_interval_ms: u64,
    pub reconnect_delay_ms: u64,
    pub max_reconnect_failures: u32,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
    /// Directory holding the resume file.
    pub state_dir: PathBuf,
    /// Directory receiving downloaded artifacts.
    pub output_dir: PathBuf,
    pub log_file: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            poll_interval_ms: 1_500,
            reconnect_delay_ms: 2_000,
            max_reconnect_failures: 5,
            connect_timeout_ms: 10_000,
            request_timeout_ms: 30_000,
            state_dir: PathBuf::from("."),
            output_dir: PathBuf::from("output"),
            log_file: PathBuf::from("dubwatch.log"),
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                watch_debug!("No config at {:?}; using defaults", path);
                return Ok(Self::default());
            }
            Err(err) => {
                return Err(err).with_context(|| format!("reading config {}", path.display()))
            }
        };
        ron::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn service_settings(&self) -> Result<ServiceSettings> {
        let base_url = self
            .base_url
            .parse()
            .with_context(|| format!("invalid base url {:?}", self.base_url))?;
        Ok(ServiceSettings {
            base_url,
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
        })
    }

    pub fn channel_settings(&self) -> ChannelSettings {
        ChannelSettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            reconnect: ReconnectPolicy {
                delay: Duration::from_millis(self.reconnect_delay_ms),
                max_failures: self.max_reconnect_failures.max(1),
            },
        }
    }
}
