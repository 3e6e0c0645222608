//! Observation of an injected wallet provider (account and chain changes).
//!
//! The provider is an external capability: the dashboard never owns it, it
//! only subscribes to its events and must release the subscription on
//! teardown.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::{
    sync::{broadcast, broadcast::error::RecvError, watch},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(String),
    Disconnected,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalletState {
    pub account: Option<String>,
    pub chain_id: Option<String>,
}

impl WalletState {
    pub fn is_connected(&self) -> bool {
        self.account.is_some()
    }
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("wallet request rejected by user")]
    Rejected,
    #[error("wallet provider unavailable: {0}")]
    Unavailable(String),
    #[error("wallet returned no accounts")]
    NoAccounts,
}

#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;
    async fn chain_id(&self) -> Result<String, WalletError>;
    fn subscribe_events(&self) -> broadcast::Receiver<WalletEvent>;
}

/// Live view of a connected wallet. Dropping it unsubscribes.
pub struct WalletConnection {
    state: watch::Receiver<WalletState>,
    listener: Option<JoinHandle<()>>,
}

impl WalletConnection {
    pub async fn connect(provider: Arc<dyn WalletProvider>) -> Result<Self, WalletError> {
        // subscribe first so a change during the handshake is not lost
        let events = provider.subscribe_events();
        let account = provider
            .request_accounts()
            .await?
            .into_iter()
            .next()
            .ok_or(WalletError::NoAccounts)?;
        let chain_id = provider.chain_id().await?;
        info!(account = %account, chain_id = %chain_id, "wallet: connected");

        let (state_tx, state) = watch::channel(WalletState {
            account: Some(account),
            chain_id: Some(chain_id),
        });
        let listener = tokio::spawn(listen(events, state_tx));
        Ok(Self {
            state,
            listener: Some(listener),
        })
    }

    pub fn state(&self) -> WalletState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<WalletState> {
        self.state.clone()
    }

    pub fn is_subscribed(&self) -> bool {
        self.listener
            .as_ref()
            .is_some_and(|listener| !listener.is_finished())
    }

    /// Stops listening to provider events. Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
            debug!("wallet: unsubscribed from provider events");
        }
    }
}

impl Drop for WalletConnection {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

async fn listen(mut events: broadcast::Receiver<WalletEvent>, state: watch::Sender<WalletState>) {
    loop {
        match events.recv().await {
            Ok(WalletEvent::AccountsChanged(accounts)) => {
                let account = accounts.into_iter().next();
                if account.is_none() {
                    info!("wallet: no accounts left, treating as disconnected");
                }
                state.send_modify(|current| current.account = account);
            }
            Ok(WalletEvent::ChainChanged(chain_id)) => {
                debug!(chain_id = %chain_id, "wallet: chain changed");
                state.send_modify(|current| current.chain_id = Some(chain_id));
            }
            Ok(WalletEvent::Disconnected) => {
                info!("wallet: provider disconnected");
                state.send_replace(WalletState::default());
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "wallet: event listener lagged behind provider");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
