use dubwatch_core::{AppViewModel, ChannelState, Outcome, Phase, Stage, StageDisplay, StageRow};

const BAR_WIDTH: usize = 30;

/// Renders the view as terminal lines, top to bottom.
pub fn render(view: &AppViewModel) -> Vec<String> {
    let mut lines = vec![status_line(view)];

    if view.phase != Phase::Idle || view.ui.outcome.is_some() {
        lines.extend(view.ui.stages.iter().map(format_stage_row));
        lines.push(progress_line(view.ui.progress, view.ui.message.as_deref()));
    }

    match &view.ui.outcome {
        Some(Outcome::Success { download }) => {
            lines.push(format!("Dubbing complete. Artifact: {}", download.path()));
        }
        Some(Outcome::Failure { error }) => lines.push(format!("Dubbing failed: {error}")),
        None => {}
    }

    if let Some(notice) = &view.notice {
        lines.push(format!("! {notice}"));
    }
    lines
}

fn status_line(view: &AppViewModel) -> String {
    let phase = match view.phase {
        Phase::Idle => "Idle",
        Phase::Submitting => "Submitting",
        Phase::Resuming => "Resuming",
        Phase::Watching => "Watching",
        Phase::Finished => "Finished",
    };
    match &view.job_id {
        Some(job_id) => format!(
            "Job {job_id} | {phase} | push: {}, poll: {}",
            channel_label(view.push),
            channel_label(view.poll)
        ),
        None => format!("No job | {phase}"),
    }
}

fn channel_label(state: ChannelState) -> &'static str {
    match state {
        ChannelState::Idle => "idle",
        ChannelState::Running => "live",
        ChannelState::Stopped => "off",
    }
}

fn format_stage_row(row: &StageRow) -> String {
    let marker = match row.display {
        StageDisplay::Pending => "[ ]",
        StageDisplay::InProgress => "[>]",
        StageDisplay::Complete => "[x]",
    };
    format!("{marker} {}", stage_label(row.stage))
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Download => "Download",
        Stage::Transcribe => "Transcribe",
        Stage::Chunk => "Optimize chunks",
        Stage::Translate => "Translate",
        Stage::Tts => "Voice synthesis",
        Stage::Render => "Render",
        Stage::Done => "Done",
    }
}

fn progress_line(progress: u8, message: Option<&str>) -> String {
    let filled = usize::from(progress.min(100)) * BAR_WIDTH / 100;
    let bar = format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled));
    match message {
        Some(message) if !message.is_empty() => format!("[{bar}] {progress:>3}%  {message}"),
        _ => format!("[{bar}] {progress:>3}%"),
    }
}
