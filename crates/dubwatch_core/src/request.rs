use std::fmt;

use thiserror::Error;
use url::Url;

const ACCEPTED_HOSTS: [&str; 2] = ["youtube.com", "youtu.be"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoiceGender {
    #[default]
    Female,
    Male,
}

impl VoiceGender {
    pub fn wire_name(self) -> &'static str {
        match self {
            VoiceGender::Female => "female",
            VoiceGender::Male => "male",
        }
    }
}

impl fmt::Display for VoiceGender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Parameters of a dubbing job submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    pub url: String,
    pub target_lang: String,
    pub voice_gender: VoiceGender,
    pub use_gpu: bool,
    pub want_subtitles: bool,
}

impl JobRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            target_lang: "es".to_string(),
            voice_gender: VoiceGender::default(),
            use_gpu: false,
            want_subtitles: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please enter a video URL")]
    EmptyUrl,
    #[error("not a valid URL: {0}")]
    Malformed(String),
    #[error("not a YouTube URL: {0}")]
    UnsupportedHost(String),
    #[error("please choose a target language")]
    MissingLanguage,
}

/// Shape check run before anything is submitted. Returns the trimmed URL.
pub fn validate_request(request: &JobRequest) -> Result<String, ValidationError> {
    let raw = request.url.trim();
    if raw.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }
    if request.target_lang.trim().is_empty() {
        return Err(ValidationError::MissingLanguage);
    }
    let parsed = Url::parse(raw).map_err(|err| ValidationError::Malformed(err.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ValidationError::Malformed(format!(
            "unsupported scheme {}",
            parsed.scheme()
        )));
    }
    let host = parsed
        .host_str()
        .map(|host| host.to_ascii_lowercase())
        .unwrap_or_default();
    let accepted = ACCEPTED_HOSTS
        .iter()
        .any(|accepted| host == *accepted || host.ends_with(&format!(".{accepted}")));
    if !accepted {
        return Err(ValidationError::UnsupportedHost(host));
    }
    Ok(raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_watch_and_short_links() {
        for url in [
            "https://www.youtube.com/watch?v=abc",
            "https://youtu.be/abc",
            "  http://m.youtube.com/watch?v=abc  ",
        ] {
            assert!(validate_request(&JobRequest::new(url)).is_ok(), "{url}");
        }
    }

    #[test]
    fn rejects_other_hosts_and_garbage() {
        assert_eq!(
            validate_request(&JobRequest::new("")),
            Err(ValidationError::EmptyUrl)
        );
        assert!(matches!(
            validate_request(&JobRequest::new("youtube")),
            Err(ValidationError::Malformed(_))
        ));
        assert_eq!(
            validate_request(&JobRequest::new("https://notyoutube.com/x")),
            Err(ValidationError::UnsupportedHost("notyoutube.com".to_string()))
        );
    }
}
