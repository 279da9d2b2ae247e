use std::sync::Arc;

use anyhow::{bail, Result};
use clap::Parser;
use dubwatch_core::{AppViewModel, Outcome, Phase};
use dubwatch_engine::{ReqwestJobService, SessionRunner};
use log::LevelFilter;
use tokio_util::sync::CancellationToken;
use watch_logging::{watch_info, watch_warn, LogDestination};

use super::cli::Args;
use super::config::AppConfig;
use super::persistence::FileResumeStore;
use super::ui::render::render;

pub async fn run_app() -> Result<()> {
    let args = Args::parse();
    let mut config = AppConfig::load(&args.config)?;
    args.apply_overrides(&mut config);

    let (destination, level) = if args.verbose {
        (LogDestination::Both, LevelFilter::Debug)
    } else {
        (LogDestination::File, LevelFilter::Info)
    };
    watch_logging::initialize(destination, level, &config.log_file);
    watch_info!("dubwatch starting against {}", config.base_url);

    let service = Arc::new(ReqwestJobService::new(config.service_settings()?)?);
    if args.check {
        return print_health(&service).await;
    }
    if args.list_languages {
        return print_languages(&service).await;
    }

    let store = Arc::new(FileResumeStore::new(config.state_dir.clone()));
    let mut runner = SessionRunner::new(service.clone(), store.clone(), config.channel_settings());

    if args.reset {
        runner.reset();
        println!("Forgot the persisted job ({}).", store.path().display());
        return Ok(());
    }

    let handle = runner.handle();
    let mut views = handle.views();
    let request = args.job_request();
    if request.is_none() {
        if let Some(saved_at) = store.saved_at() {
            watch_info!("Persisted job was saved at {}", saved_at.to_rfc3339());
        }
        runner.resume();
        if runner.view().phase == Phase::Idle {
            println!("Nothing to resume. Pass a video URL to start a job.");
            return Ok(());
        }
    }

    let shutdown = CancellationToken::new();
    let worker = tokio::spawn(runner.run(shutdown.clone()));
    if let Some(request) = request {
        handle.submit(request);
    }

    let mut printer = TerminalPrinter::default();
    let mut seen_active = false;
    let last_view = loop {
        let view = views.borrow_and_update().clone();
        printer.show(&view);
        seen_active |= view.phase != Phase::Idle;
        if is_settled(&view, seen_active) {
            break Some(view);
        }
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break None;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Detached. Run dubwatch without a URL to resume.");
                break None;
            }
        }
    };

    shutdown.cancel();
    if let Err(err) = worker.await {
        watch_warn!("Session runner ended abnormally: {}", err);
    }

    match last_view {
        Some(view) => finish(&service, &config, &args, view).await,
        None => Ok(()),
    }
}

/// Finished, or back to idle after having started (or after a rejected request).
fn is_settled(view: &AppViewModel, seen_active: bool) -> bool {
    match view.phase {
        Phase::Finished => true,
        Phase::Idle => seen_active || view.notice.is_some(),
        _ => false,
    }
}

async fn finish(
    service: &ReqwestJobService,
    config: &AppConfig,
    args: &Args,
    view: AppViewModel,
) -> Result<()> {
    match view.ui.outcome {
        Some(Outcome::Success { download }) => {
            if args.no_download {
                println!("Download: {}", service.download_url(&download.job_id)?);
            } else {
                let path = service
                    .download_artifact(&download.job_id, &config.output_dir)
                    .await?;
                watch_info!("Artifact for {} saved to {:?}", download.job_id, path);
                println!("Saved {}", path.display());
            }
            Ok(())
        }
        Some(Outcome::Failure { error }) => bail!("dubbing failed: {error}"),
        None => match view.notice {
            Some(notice) => bail!(notice),
            None => {
                println!("The persisted job is no longer known to the service.");
                Ok(())
            }
        },
    }
}

async fn print_health(service: &ReqwestJobService) -> Result<()> {
    let report = service.health().await?;
    println!(
        "Service: {}",
        if report.healthy { "healthy" } else { "unhealthy" }
    );
    if !report.details.is_empty() {
        println!("Details: {}", report.details);
    }
    match (report.cuda_available, report.gpu_name) {
        (true, Some(name)) => println!("GPU: {name}"),
        (true, None) => println!("GPU: available"),
        (false, _) => println!("GPU: not available"),
    }
    if !report.healthy {
        bail!("service reports missing dependencies");
    }
    Ok(())
}

async fn print_languages(service: &ReqwestJobService) -> Result<()> {
    let languages = service.languages().await?;
    for language in &languages {
        println!(
            "{:<6} {:<20} {}",
            language.code, language.name, language.native_name
        );
    }
    println!("{} languages", languages.len());
    Ok(())
}

/// Prints only the lines that changed since the previous frame.
#[derive(Default)]
struct TerminalPrinter {
    last: Vec<String>,
}

impl TerminalPrinter {
    fn show(&mut self, view: &AppViewModel) {
        let lines = render(view);
        if lines == self.last {
            return;
        }
        for line in lines.iter().filter(|line| !self.last.contains(line)) {
            println!("{line}");
        }
        self.last = lines;
    }
}
