//! Withdraw-all orchestration.
//!
//! Validates the wallet, fetches preparation data from the backend, submits
//! the transaction and reports the outcome through a notifier. The action
//! behaves as a mutation: one in-flight run at a time, with its
//! pending/success/error state observable through a watch channel.

pub mod config;

use std::sync::Arc;
use tokio::sync::watch;
use vault_api::{BackendClient, PreparationSource};
use vault_notify::{Notifier, Severity};
use vault_tx::{RelayerClient, TransactionResult, TransactionSubmitter};
use vault_types::{Result, VaultError, WalletId};

pub use config::WithdrawConfig;

pub const SUCCESS_MESSAGE: &str = "Withdraw all successful";
pub const FALLBACK_ERROR_MESSAGE: &str = "Withdraw all failed";

/// Lifecycle of the withdraw-all mutation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MutationStatus {
    #[default]
    Idle,
    Pending,
    Success(TransactionResult),
    Error(String),
}

impl MutationStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, MutationStatus::Pending)
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, MutationStatus::Success(_) | MutationStatus::Error(_))
    }
}

/// Callback run with the submitted transaction once a withdrawal succeeds.
pub type TxHashHandler = Box<dyn Fn(&TransactionResult) + Send + Sync>;

/// The withdraw-all action.
pub struct WithdrawAll {
    source: Arc<dyn PreparationSource>,
    submitter: Arc<dyn TransactionSubmitter>,
    notifier: Arc<dyn Notifier>,
    on_tx_hash: Option<TxHashHandler>,
    status: watch::Sender<MutationStatus>,
}

impl WithdrawAll {
    pub fn new(
        source: Arc<dyn PreparationSource>,
        submitter: Arc<dyn TransactionSubmitter>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (status, _) = watch::channel(MutationStatus::Idle);
        Self {
            source,
            submitter,
            notifier,
            on_tx_hash: None,
            status,
        }
    }

    /// Build the action over the HTTP backend and relayer named in `config`.
    pub fn from_config(config: &WithdrawConfig, notifier: Arc<dyn Notifier>) -> Result<Self> {
        config.validate()?;
        let source = BackendClient::new(&config.backend_url, Some(config.request_timeout_ms));
        let submitter = RelayerClient::new(&config.relayer_url, Some(config.submit_timeout_ms));
        Ok(Self::new(Arc::new(source), Arc::new(submitter), notifier))
    }

    pub fn with_tx_hash_handler(mut self, handler: TxHashHandler) -> Self {
        self.on_tx_hash = Some(handler);
        self
    }

    pub fn status(&self) -> MutationStatus {
        self.status.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.status.borrow().is_pending()
    }

    /// Watch status transitions, e.g. to disable a button while pending.
    pub fn subscribe(&self) -> watch::Receiver<MutationStatus> {
        self.status.subscribe()
    }

    /// Return a settled mutation to `Idle`. Has no effect while pending.
    pub fn reset(&self) -> bool {
        self.status.send_if_modified(|status| {
            if status.is_settled() {
                *status = MutationStatus::Idle;
                true
            } else {
                false
            }
        })
    }

    /// Trigger the action and discard the outcome; the notifier reports it.
    pub async fn trigger(&self, wallet_id: Option<&str>) {
        let _ = self.run(wallet_id).await;
    }

    /// Run the withdraw-all flow for a wallet.
    ///
    /// Exactly one notification is emitted per run, except when the call is
    /// rejected with `VaultError::Busy` because another run is pending.
    pub async fn run(&self, wallet_id: Option<&str>) -> Result<TransactionResult> {
        let guard = self.begin()?;
        tracing::info!(wallet_id = wallet_id.unwrap_or_default(), "withdraw-all started");

        match self.execute(wallet_id).await {
            Ok(result) => {
                tracing::info!(transaction_hash = %result.transaction_hash, "withdraw-all succeeded");
                self.notifier.notify(SUCCESS_MESSAGE, Severity::Success);
                if let Some(ref handler) = self.on_tx_hash {
                    handler(&result);
                }
                guard.settle(MutationStatus::Success(result.clone()));
                Ok(result)
            }
            Err(err) => {
                let message = err
                    .message()
                    .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string());
                tracing::error!(error = %message, "withdraw-all failed");
                self.notifier.notify(&message, Severity::Error);
                guard.settle(MutationStatus::Error(message));
                Err(err)
            }
        }
    }

    async fn execute(&self, wallet_id: Option<&str>) -> Result<TransactionResult> {
        let wallet_id = WalletId::parse(wallet_id)?;
        let data = self.source.fetch_withdraw_all_data(&wallet_id).await?;
        self.submitter
            .submit_withdraw_all(&data, &data.contract_address)
            .await
    }

    fn begin(&self) -> Result<PendingGuard<'_>> {
        let entered = self.status.send_if_modified(|status| {
            if status.is_pending() {
                false
            } else {
                *status = MutationStatus::Pending;
                true
            }
        });
        if !entered {
            tracing::warn!("withdraw-all already in progress");
            return Err(VaultError::Busy);
        }
        Ok(PendingGuard {
            status: &self.status,
            settled: false,
        })
    }
}

/// Holds the `Pending` state; falls back to `Idle` if the run is dropped.
struct PendingGuard<'a> {
    status: &'a watch::Sender<MutationStatus>,
    settled: bool,
}

impl PendingGuard<'_> {
    fn settle(mut self, outcome: MutationStatus) {
        self.status.send_replace(outcome);
        self.settled = true;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.status.send_replace(MutationStatus::Idle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::Notify;
    use vault_api::PreparationData;
    use vault_notify::MemoryNotifier;

    fn sample_data() -> PreparationData {
        serde_json::from_value(serde_json::json!({
            "contract_address": "0x07aa",
            "repay_data": { "supply_token": "ETH", "debt_token": "USDC" }
        }))
        .unwrap()
    }

    #[derive(Default)]
    struct FakeSource {
        calls: AtomicUsize,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl PreparationSource for FakeSource {
        async fn fetch_withdraw_all_data(&self, _wallet_id: &WalletId) -> Result<PreparationData> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.fail_with {
                Some(ref msg) => Err(VaultError::Other(msg.clone())),
                None => Ok(sample_data()),
            }
        }
    }

    #[derive(Default)]
    struct FakeSubmitter {
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl TransactionSubmitter for FakeSubmitter {
        async fn submit_withdraw_all(
            &self,
            _data: &PreparationData,
            contract_address: &str,
        ) -> Result<TransactionResult> {
            self.seen.lock().unwrap().push(contract_address.to_string());
            if self.fail {
                return Err(VaultError::Submission("nonce too low".into()));
            }
            Ok(TransactionResult {
                transaction_hash: "0xbeef".into(),
            })
        }
    }

    /// Blocks inside the fetch until released.
    #[derive(Default)]
    struct GatedSource {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl PreparationSource for GatedSource {
        async fn fetch_withdraw_all_data(&self, _wallet_id: &WalletId) -> Result<PreparationData> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(sample_data())
        }
    }

    fn action(
        source: Arc<dyn PreparationSource>,
        submitter: Arc<FakeSubmitter>,
        notifier: Arc<MemoryNotifier>,
    ) -> WithdrawAll {
        WithdrawAll::new(source, submitter, notifier)
    }

    #[tokio::test]
    async fn test_missing_wallet_skips_network() {
        for wallet_id in [None, Some(""), Some("  ")] {
            let source = Arc::new(FakeSource::default());
            let submitter = Arc::new(FakeSubmitter::default());
            let notifier = Arc::new(MemoryNotifier::new());
            let withdraw = action(source.clone(), submitter.clone(), notifier.clone());

            let err = withdraw.run(wallet_id).await.unwrap_err();

            assert!(matches!(err, VaultError::InvalidInput(_)));
            assert_eq!(source.calls.load(Ordering::SeqCst), 0);
            assert!(submitter.seen.lock().unwrap().is_empty());
            assert_eq!(notifier.count(Severity::Error), 1);
            assert_eq!(notifier.count(Severity::Success), 0);
            assert!(matches!(withdraw.status(), MutationStatus::Error(_)));
        }
    }

    #[tokio::test]
    async fn test_success_notifies_once_and_hands_off_hash() {
        let source = Arc::new(FakeSource::default());
        let submitter = Arc::new(FakeSubmitter::default());
        let notifier = Arc::new(MemoryNotifier::new());
        let handed_off = Arc::new(Mutex::new(Vec::new()));
        let sink = handed_off.clone();
        let withdraw = action(source.clone(), submitter.clone(), notifier.clone())
            .with_tx_hash_handler(Box::new(move |result| {
                sink.lock().unwrap().push(result.transaction_hash.clone());
            }));

        let result = withdraw.run(Some("wallet-1")).await.unwrap();

        assert_eq!(result.transaction_hash, "0xbeef");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*submitter.seen.lock().unwrap(), vec!["0x07aa".to_string()]);
        assert_eq!(
            notifier.notifications(),
            vec![vault_notify::Notification {
                message: SUCCESS_MESSAGE.into(),
                severity: Severity::Success,
            }]
        );
        assert_eq!(*handed_off.lock().unwrap(), vec!["0xbeef".to_string()]);
        assert_eq!(withdraw.status(), MutationStatus::Success(result));
        assert!(!withdraw.is_pending());
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_submission() {
        let source = Arc::new(FakeSource {
            fail_with: Some("Contract not found".into()),
            ..Default::default()
        });
        let submitter = Arc::new(FakeSubmitter::default());
        let notifier = Arc::new(MemoryNotifier::new());
        let withdraw = action(source, submitter.clone(), notifier.clone());

        withdraw.trigger(Some("wallet-1")).await;

        assert!(submitter.seen.lock().unwrap().is_empty());
        let seen = notifier.notifications();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].severity, Severity::Error);
        assert_eq!(seen[0].message, "Contract not found");
        assert_eq!(withdraw.status(), MutationStatus::Error("Contract not found".into()));
    }

    #[tokio::test]
    async fn test_blank_error_uses_fallback() {
        let source = Arc::new(FakeSource {
            fail_with: Some(String::new()),
            ..Default::default()
        });
        let notifier = Arc::new(MemoryNotifier::new());
        let withdraw = action(source, Arc::new(FakeSubmitter::default()), notifier.clone());

        withdraw.trigger(Some("wallet-1")).await;

        let seen = notifier.notifications();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message, FALLBACK_ERROR_MESSAGE);
    }

    #[tokio::test]
    async fn test_blank_submission_reason_uses_fallback() {
        struct SilentSubmitter;

        #[async_trait]
        impl TransactionSubmitter for SilentSubmitter {
            async fn submit_withdraw_all(
                &self,
                _data: &PreparationData,
                _contract_address: &str,
            ) -> Result<TransactionResult> {
                Err(VaultError::Submission(" ".into()))
            }
        }

        let notifier = Arc::new(MemoryNotifier::new());
        let withdraw = WithdrawAll::new(
            Arc::new(FakeSource::default()),
            Arc::new(SilentSubmitter),
            notifier.clone(),
        );

        withdraw.trigger(Some("wallet-1")).await;

        let seen = notifier.notifications();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].severity, Severity::Error);
        assert_eq!(seen[0].message, FALLBACK_ERROR_MESSAGE);
        assert_eq!(withdraw.status(), MutationStatus::Error(FALLBACK_ERROR_MESSAGE.into()));
    }

    #[tokio::test]
    async fn test_submission_failure_notifies_error_only() {
        let submitter = Arc::new(FakeSubmitter {
            fail: true,
            ..Default::default()
        });
        let notifier = Arc::new(MemoryNotifier::new());
        let called = Arc::new(AtomicUsize::new(0));
        let counter = called.clone();
        let withdraw = action(Arc::new(FakeSource::default()), submitter, notifier.clone())
            .with_tx_hash_handler(Box::new(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            }));

        let err = withdraw.run(Some("wallet-1")).await.unwrap_err();

        assert!(matches!(err, VaultError::Submission(_)));
        assert_eq!(notifier.count(Severity::Error), 1);
        assert_eq!(notifier.count(Severity::Success), 0);
        assert_eq!(called.load(Ordering::SeqCst), 0);
        assert_eq!(
            notifier.notifications()[0].message,
            "transaction submission failed: nonce too low"
        );
    }

    #[tokio::test]
    async fn test_pending_only_while_in_flight() {
        let source = Arc::new(GatedSource::default());
        let notifier = Arc::new(MemoryNotifier::new());
        let withdraw = action(source.clone(), Arc::new(FakeSubmitter::default()), notifier.clone());
        let mut updates = withdraw.subscribe();
        assert!(!withdraw.is_pending());

        let observe = async {
            source.entered.notified().await;
            assert!(withdraw.is_pending());
            assert!(updates.has_changed().unwrap());
            assert!(updates.borrow_and_update().is_pending());

            // A second trigger while pending is turned away quietly.
            let err = withdraw.run(Some("wallet-1")).await.unwrap_err();
            assert!(matches!(err, VaultError::Busy));
            assert!(notifier.notifications().is_empty());
            assert!(!withdraw.reset());

            source.release.notify_one();
        };

        let (result, ()) = tokio::join!(withdraw.run(Some("wallet-1")), observe);

        assert!(result.is_ok());
        assert!(!withdraw.is_pending());
        assert_eq!(notifier.count(Severity::Success), 1);
        assert!(withdraw.reset());
        assert_eq!(withdraw.status(), MutationStatus::Idle);
    }

    #[tokio::test]
    async fn test_dropped_run_returns_to_idle() {
        let source = Arc::new(GatedSource::default());
        let notifier = Arc::new(MemoryNotifier::new());
        let withdraw = action(source.clone(), Arc::new(FakeSubmitter::default()), notifier.clone());

        tokio::select! {
            _ = withdraw.run(Some("wallet-1")) => panic!("run should still be blocked"),
            _ = source.entered.notified() => {}
        }

        assert_eq!(withdraw.status(), MutationStatus::Idle);
        assert!(notifier.notifications().is_empty());
    }

    #[test]
    fn test_from_config_validates() {
        let notifier: Arc<dyn Notifier> = Arc::new(MemoryNotifier::new());
        assert!(WithdrawAll::from_config(&WithdrawConfig::default(), notifier.clone()).is_ok());

        let bad = WithdrawConfig {
            backend_url: "nope".into(),
            ..Default::default()
        };
        assert!(matches!(
            WithdrawAll::from_config(&bad, notifier),
            Err(VaultError::Config(_))
        ));
    }
}
