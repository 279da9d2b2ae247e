use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use dubwatch_core::{JobRequest, VoiceGender};

use super::config::{AppConfig, CONFIG_FILENAME};

#[derive(Parser, Debug)]
#[command(
    name = "dubwatch",
    author,
    version,
    about = "Submit a YouTube video for dubbing and follow it to completion"
)]
pub struct Args {
    /// Video to dub. Without it the job left by a previous run is resumed.
    pub url: Option<String>,

    /// Target language code
    #[arg(short, long, default_value = "es")]
    pub lang: String,

    /// Voice used for the dubbed track
    #[arg(long, value_enum, default_value_t = Gender::Female)]
    pub gender: Gender,

    /// Ask the service to run on the GPU
    #[arg(long)]
    pub gpu: bool,

    /// Burn subtitles into the artifact
    #[arg(long)]
    pub subtitles: bool,

    /// Service base URL (overrides the config file)
    #[arg(long)]
    pub server: Option<String>,

    /// Where downloaded artifacts go (overrides the config file)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Config file
    #[arg(long, default_value = CONFIG_FILENAME)]
    pub config: PathBuf,

    /// Forget the persisted job and exit
    #[arg(long, conflicts_with = "url")]
    pub reset: bool,

    /// Print the languages the service supports and exit
    #[arg(long)]
    pub list_languages: bool,

    /// Print the service health report and exit
    #[arg(long)]
    pub check: bool,

    /// Leave the finished artifact on the service
    #[arg(long)]
    pub no_download: bool,

    /// Also log to the terminal, at debug level
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Gender {
    Female,
    Male,
}

impl From<Gender> for VoiceGender {
    fn from(gender: Gender) -> Self {
        match gender {
            Gender::Female => VoiceGender::Female,
            Gender::Male => VoiceGender::Male,
        }
    }
}

impl Args {
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(server) = &self.server {
            config.base_url = server.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
    }

    pub fn job_request(&self) -> Option<JobRequest> {
        let url = self.url.as_ref()?;
        Some(JobRequest {
            target_lang: self.lang.clone(),
            voice_gender: self.gender.into(),
            use_gpu: self.gpu,
            want_subtitles: self.subtitles,
            ..JobRequest::new(url.as_str())
        })
    }
}
