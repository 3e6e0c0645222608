use super::*;
use std::time::Duration;
use tokio::{sync::Mutex, time};

struct FakeWallet {
    accounts: Mutex<Result<Vec<String>, ()>>,
    chain_id: String,
    events: broadcast::Sender<WalletEvent>,
}

impl FakeWallet {
    fn with_accounts(accounts: &[&str]) -> Arc<Self> {
        let (events, _) = broadcast::channel(16);
        Arc::new(Self {
            accounts: Mutex::new(Ok(accounts.iter().map(|a| a.to_string()).collect())),
            chain_id: "0xaa36a7".into(),
            events,
        })
    }

    fn rejecting() -> Arc<Self> {
        let wallet = Self::with_accounts(&[]);
        if let Ok(mut accounts) = wallet.accounts.try_lock() {
            *accounts = Err(());
        }
        wallet
    }

    fn emit(&self, event: WalletEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl WalletProvider for FakeWallet {
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError> {
        self.accounts
            .lock()
            .await
            .clone()
            .map_err(|_| WalletError::Rejected)
    }

    async fn chain_id(&self) -> Result<String, WalletError> {
        Ok(self.chain_id.clone())
    }

    fn subscribe_events(&self) -> broadcast::Receiver<WalletEvent> {
        self.events.subscribe()
    }
}

async fn next_state(rx: &mut watch::Receiver<WalletState>) -> WalletState {
    time::timeout(Duration::from_secs(1), rx.changed())
        .await
        .expect("state change in time")
        .expect("listener alive");
    rx.borrow_and_update().clone()
}

#[tokio::test]
async fn connect_reads_first_account_and_chain() {
    let wallet = FakeWallet::with_accounts(&["0xabc", "0xdef"]);
    let connection = WalletConnection::connect(wallet).await.expect("connect");

    assert_eq!(
        connection.state(),
        WalletState {
            account: Some("0xabc".into()),
            chain_id: Some("0xaa36a7".into()),
        }
    );
    assert!(connection.state().is_connected());
    assert!(connection.is_subscribed());
}

#[tokio::test]
async fn follows_account_and_chain_changes() {
    let wallet = FakeWallet::with_accounts(&["0xabc"]);
    let connection = WalletConnection::connect(wallet.clone()).await.expect("connect");
    let mut state = connection.subscribe();

    wallet.emit(WalletEvent::AccountsChanged(vec!["0x999".into()]));
    assert_eq!(next_state(&mut state).await.account.as_deref(), Some("0x999"));

    wallet.emit(WalletEvent::ChainChanged("0x1".into()));
    assert_eq!(next_state(&mut state).await.chain_id.as_deref(), Some("0x1"));

    wallet.emit(WalletEvent::AccountsChanged(Vec::new()));
    assert!(!next_state(&mut state).await.is_connected());
}

#[tokio::test]
async fn provider_disconnect_clears_state() {
    let wallet = FakeWallet::with_accounts(&["0xabc"]);
    let connection = WalletConnection::connect(wallet.clone()).await.expect("connect");
    let mut state = connection.subscribe();

    wallet.emit(WalletEvent::Disconnected);
    assert_eq!(next_state(&mut state).await, WalletState::default());
}

#[tokio::test]
async fn unsubscribe_stops_listening() {
    let wallet = FakeWallet::with_accounts(&["0xabc"]);
    let mut connection = WalletConnection::connect(wallet.clone()).await.expect("connect");

    connection.unsubscribe();
    connection.unsubscribe();
    assert!(!connection.is_subscribed());

    time::sleep(Duration::from_millis(20)).await;
    wallet.emit(WalletEvent::AccountsChanged(vec!["0x999".into()]));
    time::sleep(Duration::from_millis(20)).await;

    assert_eq!(connection.state().account.as_deref(), Some("0xabc"));
    assert_eq!(wallet.events.receiver_count(), 0);
}

#[tokio::test]
async fn connect_fails_without_accounts_or_on_rejection() {
    let empty = WalletConnection::connect(FakeWallet::with_accounts(&[])).await;
    assert!(matches!(empty, Err(WalletError::NoAccounts)));

    let rejected = WalletConnection::connect(FakeWallet::rejecting()).await;
    assert!(matches!(rejected, Err(WalletError::Rejected)));
}
