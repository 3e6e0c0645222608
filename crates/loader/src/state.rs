#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Success,
    Failure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    /// Request outstanding; progress creeps towards the ramp ceiling.
    Ramping,
    /// Request settled; progress heading to 1.0.
    CatchingUp,
    /// Indicator hidden at 1.0, reset to 0 pending.
    Settled(LoadOutcome),
}

/// Renderable state of a load cycle.
///
/// Only the owning controller mutates it; views read snapshots.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadState {
    pub is_loading: bool,
    pub error_message: Option<String>,
    /// Always within `[0.0, 1.0]`.
    pub progress: f64,
    pub phase: LoadPhase,
}

impl Default for LoadState {
    fn default() -> Self {
        Self {
            is_loading: false,
            error_message: None,
            progress: 0.0,
            phase: LoadPhase::Idle,
        }
    }
}

impl LoadState {
    pub(crate) fn preflight(&mut self) {
        self.is_loading = true;
        self.error_message = None;
        self.progress = 0.0;
        self.phase = LoadPhase::Ramping;
    }

    pub(crate) fn advance_ramp(&mut self, step: f64, ceiling: f64) {
        if self.progress < ceiling {
            self.progress = (self.progress + step).min(ceiling);
        }
    }

    /// Advances catch-up progress and reports whether it reached 1.0.
    pub(crate) fn advance_catch_up(&mut self, step: f64) -> bool {
        self.progress = (self.progress + step).min(1.0);
        self.progress >= 1.0
    }

    pub fn percent(&self) -> u8 {
        (self.progress.clamp(0.0, 1.0) * 100.0).round() as u8
    }

    pub fn has_error(&self) -> bool {
        self.error_message.is_some()
    }
}
