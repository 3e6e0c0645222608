//! Process-wide API client shared by every view.
//!
//! Initialised once at startup; `teardown` releases it so tests can install
//! a fresh client per run.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use crate::{api::ApiClient, error::ClientError};

static QUERY_CLIENT: RwLock<Option<Arc<ApiClient>>> = RwLock::new(None);

pub fn init(client: ApiClient) -> Result<Arc<ApiClient>, ClientError> {
    let mut slot = QUERY_CLIENT.write().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        return Err(ClientError::AlreadyInitialized);
    }
    let client = Arc::new(client);
    *slot = Some(Arc::clone(&client));
    info!(base_url = %client.base_url(), "query client initialized");
    Ok(client)
}

pub fn global() -> Option<Arc<ApiClient>> {
    QUERY_CLIENT
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

pub fn require() -> Result<Arc<ApiClient>, ClientError> {
    global().ok_or(ClientError::NotInitialized)
}

/// Releases the global client. Returns whether one was installed.
pub fn teardown() -> bool {
    QUERY_CLIENT
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .take()
        .is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    // single test: the slot is process-wide and tests run concurrently
    #[test]
    fn init_once_then_teardown_allows_reinit() {
        teardown();
        assert!(matches!(require(), Err(ClientError::NotInitialized)));

        let first = init(ApiClient::new("http://127.0.0.1:9/api").expect("client")).expect("init");
        assert!(matches!(
            init(ApiClient::new("http://127.0.0.1:9/other").expect("client")),
            Err(ClientError::AlreadyInitialized)
        ));
        let current = global().expect("installed");
        assert!(Arc::ptr_eq(&first, &current));

        assert!(teardown());
        assert!(!teardown());
        assert!(global().is_none());

        let second = init(ApiClient::new("http://127.0.0.1:9/v2").expect("client")).expect("reinit");
        assert_eq!(second.base_url().path(), "/v2/");
        assert!(teardown());
    }
}
