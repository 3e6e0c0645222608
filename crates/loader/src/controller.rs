use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use shared::error::FetchFailure;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, warn};

use crate::{
    state::{LoadOutcome, LoadPhase, LoadState},
    timings::{LoaderConfigError, LoaderTimings},
};

/// Generation tag of one load cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CycleId(pub u64);

struct CycleSlot {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

struct SharedState {
    state: watch::Sender<LoadState>,
    slot: Mutex<CycleSlot>,
}

impl SharedState {
    fn lock_slot(&self) -> MutexGuard<'_, CycleSlot> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_current(&self, cycle: CycleId) -> bool {
        self.lock_slot().generation == cycle.0
    }

    /// Applies `update` only while `cycle` is still the current generation.
    /// The check and the write happen under the lock `cancel` bumps the
    /// generation with, so a superseded cycle can never write.
    fn update(&self, cycle: CycleId, update: impl FnOnce(&mut LoadState)) -> bool {
        let slot = self.lock_slot();
        if slot.generation != cycle.0 {
            return false;
        }
        self.state.send_modify(update);
        true
    }

    fn finish(&self, cycle: CycleId) {
        let mut slot = self.lock_slot();
        if slot.generation == cycle.0 {
            slot.task = None;
        }
    }
}

/// Drives one "load a remote resource and report progress" operation at a
/// time. Dropping the controller cancels whatever cycle is pending.
pub struct LoadController {
    shared: Arc<SharedState>,
    timings: LoaderTimings,
}

impl Default for LoadController {
    fn default() -> Self {
        Self::build(LoaderTimings::default())
    }
}

impl LoadController {
    pub fn new(timings: LoaderTimings) -> Result<Self, LoaderConfigError> {
        timings.validate()?;
        Ok(Self::build(timings))
    }

    fn build(timings: LoaderTimings) -> Self {
        let (state, _) = watch::channel(LoadState::default());
        Self {
            shared: Arc::new(SharedState {
                state,
                slot: Mutex::new(CycleSlot {
                    generation: 0,
                    task: None,
                }),
            }),
            timings,
        }
    }

    pub fn timings(&self) -> &LoaderTimings {
        &self.timings
    }

    pub fn state(&self) -> LoadState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.shared.state.subscribe()
    }

    pub fn current_cycle(&self) -> Option<CycleId> {
        let slot = self.shared.lock_slot();
        slot.task.as_ref().map(|_| CycleId(slot.generation))
    }

    pub fn is_active(&self) -> bool {
        self.shared
            .lock_slot()
            .task
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    /// Starts a new load cycle, cancelling any previous one first.
    ///
    /// Exactly one of `on_success` / `on_error` runs, once, unless the cycle
    /// is cancelled before the request settles. Must be called from within a
    /// tokio runtime.
    pub fn start<T, Fut, S, E>(&self, request: Fut, on_success: S, on_error: E) -> CycleId
    where
        T: Send + 'static,
        Fut: Future<Output = Result<T, FetchFailure>> + Send + 'static,
        S: FnOnce(T) + Send + 'static,
        E: FnOnce(String) + Send + 'static,
    {
        let mut slot = self.shared.lock_slot();
        if let Some(previous) = slot.task.take() {
            previous.abort();
        }
        slot.generation += 1;
        let cycle = CycleId(slot.generation);

        self.shared.state.send_modify(LoadState::preflight);

        let task = tokio::spawn(run_cycle(
            Arc::clone(&self.shared),
            self.timings.clone(),
            cycle,
            request,
            on_success,
            on_error,
        ));
        slot.task = Some(task);
        debug!(cycle = cycle.0, "load: cycle started");
        cycle
    }

    /// Stops any pending timer or request. State is left as it is and no
    /// callback runs. Safe to call when nothing is pending.
    pub fn cancel(&self) {
        let mut slot = self.shared.lock_slot();
        let Some(task) = slot.task.take() else {
            return;
        };
        let cancelled = slot.generation;
        slot.generation += 1;
        task.abort();
        debug!(cycle = cancelled, "load: cycle cancelled");
    }
}

impl Drop for LoadController {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_cycle<T, Fut, S, E>(
    shared: Arc<SharedState>,
    timings: LoaderTimings,
    cycle: CycleId,
    request: Fut,
    on_success: S,
    on_error: E,
) where
    Fut: Future<Output = Result<T, FetchFailure>>,
    S: FnOnce(T),
    E: FnOnce(String),
{
    let Some(result) = ramp_until_settled(&shared, &timings, cycle, request).await else {
        return;
    };

    let outcome = match result {
        Ok(data) => {
            if !shared.is_current(cycle) {
                return;
            }
            on_success(data);
            LoadOutcome::Success
        }
        Err(failure) => {
            let message = failure.user_message();
            warn!(
                cycle = cycle.0,
                status = ?failure.status(),
                error = %message,
                "load: request failed"
            );
            let recorded = message.clone();
            if !shared.update(cycle, move |state| state.error_message = Some(recorded)) {
                return;
            }
            on_error(message);
            LoadOutcome::Failure
        }
    };

    if !drive_to_completion(&shared, &timings, cycle).await {
        return;
    }

    time::sleep(timings.settle_delay).await;
    if !shared.update(cycle, |state| {
        state.is_loading = false;
        state.phase = LoadPhase::Settled(outcome);
    }) {
        return;
    }
    debug!(cycle = cycle.0, outcome = ?outcome, "load: cycle settled");

    time::sleep(timings.reset_delay).await;
    if shared.update(cycle, |state| {
        state.progress = 0.0;
        state.phase = LoadPhase::Idle;
    }) {
        shared.finish(cycle);
    }
}

/// Races the request against the ramp ticker. The ticker is dropped as soon
/// as the request settles. `None` means the cycle was superseded.
async fn ramp_until_settled<T, Fut>(
    shared: &SharedState,
    timings: &LoaderTimings,
    cycle: CycleId,
    request: Fut,
) -> Option<Result<T, FetchFailure>>
where
    Fut: Future<Output = Result<T, FetchFailure>>,
{
    let request = with_timeout(request, timings.request_timeout);
    tokio::pin!(request);

    let mut ramp = time::interval_at(Instant::now() + timings.ramp_tick, timings.ramp_tick);
    ramp.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            result = &mut request => return Some(result),
            _ = ramp.tick() => {
                let advanced = shared.update(cycle, |state| {
                    state.advance_ramp(timings.ramp_step, timings.ramp_ceiling)
                });
                if !advanced {
                    return None;
                }
            }
        }
    }
}

async fn with_timeout<T, Fut>(request: Fut, limit: Option<Duration>) -> Result<T, FetchFailure>
where
    Fut: Future<Output = Result<T, FetchFailure>>,
{
    let Some(limit) = limit else {
        return request.await;
    };
    match time::timeout(limit, request).await {
        Ok(result) => result,
        Err(_) => Err(FetchFailure::from_message(format!(
            "request timed out after {} ms",
            limit.as_millis()
        ))),
    }
}

/// Takes progress to exactly 1.0: a snap and hold when the ramp had reached
/// its ceiling, a fast catch-up bounded by the deadline otherwise.
async fn drive_to_completion(shared: &SharedState, timings: &LoaderTimings, cycle: CycleId) -> bool {
    let reached_ceiling = shared.state.borrow().progress >= timings.ramp_ceiling;
    if !shared.update(cycle, |state| state.phase = LoadPhase::CatchingUp) {
        return false;
    }

    if reached_ceiling {
        if !shared.update(cycle, |state| state.progress = 1.0) {
            return false;
        }
        time::sleep(timings.complete_hold).await;
        return true;
    }

    let catch_up = async {
        let mut ticker = time::interval_at(
            Instant::now() + timings.catch_up_tick,
            timings.catch_up_tick,
        );
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let mut complete = false;
            if !shared.update(cycle, |state| {
                complete = state.advance_catch_up(timings.catch_up_step)
            }) {
                return false;
            }
            if complete {
                return true;
            }
        }
    };

    match time::timeout(timings.catch_up_deadline, catch_up).await {
        Ok(current) => current,
        Err(_) => {
            debug!(cycle = cycle.0, "load: catch-up deadline reached, forcing completion");
            shared.update(cycle, |state| state.progress = 1.0)
        }
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
