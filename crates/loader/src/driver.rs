//! Restarts a [`LoadController`] whenever the owning view's trigger key
//! changes (page, search text, filters).

use std::sync::Arc;

use async_trait::async_trait;
use shared::error::FetchFailure;
use tokio::{
    sync::{watch, Notify},
    task::JoinHandle,
};
use tracing::debug;

use crate::{
    controller::{CycleId, LoadController},
    state::LoadState,
};

/// Fetches the resource a view shows for one trigger key.
#[async_trait]
pub trait LoadSource<K>: Send + Sync {
    type Output: Send + 'static;

    async fn fetch(&self, key: &K) -> Result<Self::Output, FetchFailure>;
}

/// Receives the outcome of each completed cycle.
pub trait LoadSink<T>: Send + Sync {
    fn on_success(&self, data: T);
    fn on_error(&self, message: String);
}

pub struct LoadDriver {
    task: JoinHandle<()>,
    retry: Arc<Notify>,
    state: watch::Receiver<LoadState>,
}

impl LoadDriver {
    /// Loads the current key immediately, then reloads on every key change
    /// that differs by value from the last loaded key.
    pub fn spawn<K, S>(
        controller: LoadController,
        keys: watch::Receiver<K>,
        source: Arc<S>,
        sink: Arc<dyn LoadSink<S::Output>>,
    ) -> Self
    where
        K: Clone + PartialEq + Send + Sync + 'static,
        S: LoadSource<K> + 'static,
    {
        let retry = Arc::new(Notify::new());
        let state = controller.subscribe();
        let task = tokio::spawn(watch_keys(
            controller,
            keys,
            source,
            sink,
            Arc::clone(&retry),
        ));
        Self { task, retry, state }
    }

    /// Reloads the current key, e.g. from an explicit "retry" action.
    pub fn retry(&self) {
        self.retry.notify_one();
    }

    pub fn state(&self) -> LoadState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoadState> {
        self.state.clone()
    }
}

impl Drop for LoadDriver {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn watch_keys<K, S>(
    controller: LoadController,
    mut keys: watch::Receiver<K>,
    source: Arc<S>,
    sink: Arc<dyn LoadSink<S::Output>>,
    retry: Arc<Notify>,
) where
    K: Clone + PartialEq + Send + Sync + 'static,
    S: LoadSource<K> + 'static,
{
    let mut current = keys.borrow_and_update().clone();
    begin(&controller, &source, &sink, &current);

    let mut keys_open = true;
    loop {
        tokio::select! {
            changed = keys.changed(), if keys_open => {
                if changed.is_err() {
                    debug!("load: trigger source closed, only retries remain");
                    keys_open = false;
                    continue;
                }
                let next = keys.borrow_and_update().clone();
                if next == current {
                    continue;
                }
                current = next;
                controller.cancel();
                begin(&controller, &source, &sink, &current);
            }
            _ = retry.notified() => {
                begin(&controller, &source, &sink, &current);
            }
        }
    }
}

fn begin<K, S>(
    controller: &LoadController,
    source: &Arc<S>,
    sink: &Arc<dyn LoadSink<S::Output>>,
    key: &K,
) -> CycleId
where
    K: Clone + Send + Sync + 'static,
    S: LoadSource<K> + 'static,
{
    let source = Arc::clone(source);
    let key = key.clone();
    let success_sink = Arc::clone(sink);
    let error_sink = Arc::clone(sink);
    controller.start(
        async move { source.fetch(&key).await },
        move |data| success_sink.on_success(data),
        move |message| error_sink.on_error(message),
    )
}

#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod tests;
