use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dubwatch_core::{JobId, JobRequest, JobSnapshot};
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use url::Url;
use watch_logging::watch_debug;

use crate::persist::AtomicFileWriter;
use crate::sse::{SseDecoder, SseEvent, MAX_LINE_BYTES};
use crate::wire::{decode_snapshot, WireError, WireLanguages, WireSubmitted};
use crate::{HealthReport, Language, PushFrame, ServiceError};

pub type PushStream = BoxStream<'static, Result<PushFrame, ServiceError>>;

/// The remote dubbing service as the session needs it.
#[async_trait::async_trait]
pub trait JobService: Send + Sync {
    /// Creates a job and returns its id.
    async fn submit(&self, request: &JobRequest) -> Result<JobId, ServiceError>;

    /// Single point-in-time query of a job.
    async fn fetch_state(&self, job_id: &JobId) -> Result<JobSnapshot, ServiceError>;

    /// Opens a push subscription. The stream ends when the service closes it.
    async fn subscribe(&self, job_id: &JobId) -> Result<PushStream, ServiceError>;
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub base_url: Url,
    pub connect_timeout: Duration,
    /// Applies to one-shot requests only, never to the push stream.
    pub request_timeout: Duration,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: Url::parse("http://127.0.0.1:5000/").expect("static url"),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReqwestJobService {
    settings: ServiceSettings,
    client: reqwest::Client,
    stream_client: reqwest::Client,
}

impl ReqwestJobService {
    pub fn new(settings: ServiceSettings) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(map_reqwest_error)?;
        let stream_client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(map_reqwest_error)?;
        Ok(Self {
            settings,
            client,
            stream_client,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ServiceError> {
        let mut url = self.settings.base_url.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                ServiceError::Transport(format!(
                    "base url {} cannot carry a path",
                    self.settings.base_url
                ))
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    /// Absolute URL of a finished job's artifact.
    pub fn download_url(&self, job_id: &JobId) -> Result<Url, ServiceError> {
        self.endpoint(&["api", "download", job_id.as_str()])
    }

    pub async fn languages(&self) -> Result<Vec<Language>, ServiceError> {
        let url = self.endpoint(&["api", "languages"])?;
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        let body = success_body(response).await?;
        let wire: WireLanguages = serde_json::from_slice(&body)
            .map_err(|err| ServiceError::Transport(format!("invalid language list: {err}")))?;
        let mut languages = wire.languages;
        languages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(languages)
    }

    pub async fn health(&self) -> Result<HealthReport, ServiceError> {
        let url = self.endpoint(&["api", "check"])?;
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        let body = success_body(response).await?;
        serde_json::from_slice(&body)
            .map_err(|err| ServiceError::Transport(format!("invalid health report: {err}")))
    }

    /// Downloads a finished artifact into `dir` and returns the written path.
    pub async fn download_artifact(
        &self,
        job_id: &JobId,
        dir: &Path,
    ) -> Result<PathBuf, ServiceError> {
        let url = self.download_url(job_id)?;
        let response = self
            .stream_client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(ServiceError::NotFound(job_id.clone())),
            status if status.is_client_error() => {
                let body = response.bytes().await.map_err(map_reqwest_error)?;
                return Err(ServiceError::Rejected(rejection_text(status, &body)));
            }
            status if !status.is_success() => {
                return Err(ServiceError::Transport(format!("http status {status}")));
            }
            _ => {}
        }

        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(attachment_filename)
            .unwrap_or_else(|| format!("dubbed_{job_id}.mp4"));

        let writer = AtomicFileWriter::new(dir.to_path_buf());
        let mut staged = writer.stage(&filename)?;
        let mut body = response.bytes_stream();
        while let Some(chunk) = body.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            staged.write_chunk(&chunk)?;
        }
        watch_debug!("Downloaded {} bytes for job {}", staged.written(), job_id);
        Ok(staged.commit()?)
    }
}

#[async_trait::async_trait]
impl JobService for ReqwestJobService {
    async fn submit(&self, request: &JobRequest) -> Result<JobId, ServiceError> {
        let url = self.endpoint(&["api", "dub"])?;
        let payload = serde_json::json!({
            "url": request.url,
            "lang": request.target_lang,
            "gender": request.voice_gender.wire_name(),
            "gpu": request.use_gpu,
            "subtitle": request.want_subtitles,
        });
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload.to_string())
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_reqwest_error)?;
        if status.is_client_error() {
            return Err(ServiceError::Rejected(rejection_text(status, &body)));
        }
        if !status.is_success() {
            return Err(ServiceError::Transport(format!("http status {status}")));
        }
        let submitted: WireSubmitted = serde_json::from_slice(&body)
            .map_err(|err| ServiceError::Transport(format!("invalid submit response: {err}")))?;
        Ok(JobId::new(submitted.job_id))
    }

    async fn fetch_state(&self, job_id: &JobId) -> Result<JobSnapshot, ServiceError> {
        let url = self.endpoint(&["api", "job", job_id.as_str()])?;
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(job_id.clone()));
        }
        let body = success_body(response).await?;
        decode_snapshot(job_id, &body)
            .map_err(|err| ServiceError::Transport(format!("invalid job state: {err}")))
    }

    async fn subscribe(&self, job_id: &JobId) -> Result<PushStream, ServiceError> {
        let url = self.endpoint(&["api", "status", job_id.as_str()])?;
        let response = self
            .stream_client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(map_reqwest_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(job_id.clone()));
        }
        if !response.status().is_success() {
            return Err(ServiceError::Transport(format!(
                "http status {}",
                response.status()
            )));
        }

        let job_id = job_id.clone();
        let chunks = response.bytes_stream().boxed();
        let frames = stream::unfold(
            (chunks, SseDecoder::new(), VecDeque::<SseEvent>::new(), job_id),
            |(mut chunks, mut decoder, mut ready, job_id)| async move {
                loop {
                    if let Some(event) = ready.pop_front() {
                        let frame = match event {
                            SseEvent::Data(data) => decode_frame(&job_id, &data),
                            SseEvent::Overflow => PushFrame::Malformed(format!(
                                "event line longer than {MAX_LINE_BYTES} bytes"
                            )),
                        };
                        return Some((Ok(frame), (chunks, decoder, ready, job_id)));
                    }
                    match chunks.next().await {
                        Some(Ok(chunk)) => ready.extend(decoder.push(&chunk)),
                        Some(Err(err)) => {
                            return Some((
                                Err(map_reqwest_error(err)),
                                (chunks, decoder, ready, job_id),
                            ))
                        }
                        None => return None,
                    }
                }
            },
        );
        Ok(frames.boxed())
    }
}

fn decode_frame(job_id: &JobId, data: &str) -> PushFrame {
    match decode_snapshot(job_id, data.as_bytes()) {
        Ok(snapshot) => PushFrame::Snapshot(snapshot),
        Err(err) => PushFrame::Malformed(err.to_string()),
    }
}

async fn success_body(response: Response) -> Result<bytes::Bytes, ServiceError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ServiceError::Transport(format!("http status {status}")));
    }
    response.bytes().await.map_err(map_reqwest_error)
}

fn rejection_text(status: StatusCode, body: &[u8]) -> String {
    serde_json::from_slice::<WireError>(body)
        .map(|wire| wire.error)
        .unwrap_or_else(|_| status.to_string())
}

fn attachment_filename(disposition: &str) -> Option<String> {
    let raw = disposition
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))?
        .trim_matches('"');
    Path::new(raw)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
}

fn map_reqwest_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        return ServiceError::Transport(format!("timeout: {err}"));
    }
    ServiceError::Transport(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_escapes_job_id_and_keeps_base_path() {
        let settings = ServiceSettings {
            base_url: Url::parse("http://host:5000/dub/").unwrap(),
            ..ServiceSettings::default()
        };
        let service = ReqwestJobService::new(settings).unwrap();
        let url = service.endpoint(&["api", "job", "a b"]).unwrap();
        assert_eq!(url.as_str(), "http://host:5000/dub/api/job/a%20b");
    }

    #[test]
    fn attachment_filename_strips_directories() {
        assert_eq!(
            attachment_filename("attachment; filename=\"../out/final.mp4\""),
            Some("final.mp4".to_string())
        );
        assert_eq!(attachment_filename("inline"), None);
    }
}
