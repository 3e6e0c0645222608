use loader::{LoadOutcome, LoadPhase, LoadState};

/// One-line text rendering of the load indicator.
pub fn progress_bar(state: &LoadState, width: usize) -> String {
    let filled = ((state.progress.clamp(0.0, 1.0) * width as f64).round() as usize).min(width);
    let label = match state.phase {
        LoadPhase::Idle => "idle",
        LoadPhase::Ramping => "loading",
        LoadPhase::CatchingUp => "finishing",
        LoadPhase::Settled(LoadOutcome::Success) => "done",
        LoadPhase::Settled(LoadOutcome::Failure) => "failed",
    };
    format!(
        "[{}{}] {:>3}% {label}",
        "#".repeat(filled),
        "-".repeat(width - filled),
        state.percent()
    )
}
