//! Fixed-interval driver for [`PositionAggregator::get_position`].
//!
//! The poller owns a background task that ticks every `period`, fetches a fresh
//! [`Position`] and publishes it on a `watch` channel. Stopping the poller, by
//! [`PositionPoller::stop`], by cancelling the parent token, or by dropping it,
//! drops any read that is still in flight; its result is never published.

use alloy::primitives::Address;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::position::{Position, PositionAggregator};

/// Latest polling outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollState {
    /// Last successfully fetched position. Kept across failed polls.
    pub position: Option<Position>,
    /// Message of the most recent failed poll, cleared by the next success.
    pub last_error: Option<String>,
    /// Number of completed polls, successful or not.
    pub polls: u64,
}

pub struct PositionPoller {
    state: watch::Receiver<PollState>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PositionPoller {
    /// Start polling `user`'s position every `period`. The first poll runs immediately.
    ///
    /// The poller stops when `parent` is cancelled.
    pub fn spawn(
        aggregator: Arc<PositionAggregator>,
        user: Address,
        period: Duration,
        parent: &CancellationToken,
    ) -> Self {
        let cancel = parent.child_token();
        let (tx, state) = watch::channel(PollState::default());
        let task = tokio::spawn(poll_loop(aggregator, user, period, tx, cancel.clone()));
        Self {
            state,
            cancel,
            task: Some(task),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PollState> {
        self.state.clone()
    }

    pub fn latest(&self) -> PollState {
        self.state.borrow().clone()
    }

    /// Stop polling. An in-flight read is abandoned.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the polling task to exit after [`Self::stop`] or parent cancellation.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "position poller task failed");
            }
        }
    }
}

impl Drop for PositionPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll_loop(
    aggregator: Arc<PositionAggregator>,
    user: Address,
    period: Duration,
    tx: watch::Sender<PollState>,
    cancel: CancellationToken,
) {
    tracing::debug!(%user, period_secs = period.as_secs(), "position poller started");
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(%user, "abandoning in-flight position read");
                break;
            }
            result = aggregator.get_position(user) => result,
        };

        tx.send_modify(|state| {
            state.polls += 1;
            match result {
                Ok(position) => {
                    state.position = Some(position);
                    state.last_error = None;
                }
                Err(e) => {
                    tracing::warn!(%user, error = %e, "position poll failed");
                    state.last_error = Some(e.to_string());
                }
            }
        });
    }

    tracing::debug!(%user, "position poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StakingError;
    use crate::gateway::ContractGateway;
    use crate::network::NetworkRegistry;
    use crate::testing::{ALICE, BOB_SEPOLIA, Call, MockChain, MockWallet};
    use crate::wallet::WalletProvider;
    use alloy::primitives::U256;
    use tokio::time::Instant;

    const PERIOD: Duration = Duration::from_secs(15);

    fn aggregator(chain: &Arc<MockChain>) -> Arc<PositionAggregator> {
        let wallet = MockWallet::new(Arc::clone(chain), BOB_SEPOLIA, ALICE);
        let gateway = ContractGateway::new(
            Some(wallet as Arc<dyn WalletProvider>),
            Arc::new(NetworkRegistry::default()),
        );
        Arc::new(PositionAggregator::new(Arc::new(gateway)))
    }

    fn reads(chain: &MockChain) -> usize {
        chain.count(|c| matches!(c, Call::GetPosition(_)))
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_on_interval() {
        let chain = MockChain::new();
        chain.set_gm_balance(U256::from(2_000_000_000_000_000_000u128));
        let started = Instant::now();
        let poller = PositionPoller::spawn(aggregator(&chain), ALICE, PERIOD, &CancellationToken::new());

        let mut rx = poller.subscribe();
        let state = rx.wait_for(|s| s.polls >= 3).await.unwrap().clone();

        assert_eq!(state.position.unwrap().derivative_token_balance, "2.0");
        assert_eq!(state.last_error, None);
        assert!(started.elapsed() >= PERIOD * 2);
        assert_eq!(reads(&chain), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_keeps_last_position() {
        let chain = MockChain::new();
        let poller = PositionPoller::spawn(aggregator(&chain), ALICE, PERIOD, &CancellationToken::new());
        let mut rx = poller.subscribe();
        rx.wait_for(|s| s.position.is_some()).await.unwrap();

        chain.fail("balance_of", StakingError::RpcFailure("connection refused".into()));
        let state = rx.wait_for(|s| s.last_error.is_some()).await.unwrap().clone();
        assert_eq!(state.last_error.as_deref(), Some("connection refused"));
        assert!(state.position.is_some());

        chain.clear_failure("balance_of");
        let state = rx.wait_for(|s| s.last_error.is_none()).await.unwrap().clone();
        assert!(state.position.is_some());
    }

    #[tokio::test]
    async fn test_stop_abandons_in_flight_read() {
        let chain = MockChain::new();
        let gate = chain.gate_reads();
        let poller = PositionPoller::spawn(aggregator(&chain), ALICE, PERIOD, &CancellationToken::new());

        while reads(&chain) == 0 {
            tokio::task::yield_now().await;
        }
        let rx = poller.subscribe();
        poller.stop();
        gate.notify_one();
        poller.join().await;

        assert_eq!(*rx.borrow(), PollState::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_parent_cancellation_stops_poller() {
        let chain = MockChain::new();
        let parent = CancellationToken::new();
        let poller = PositionPoller::spawn(aggregator(&chain), ALICE, PERIOD, &parent);
        let mut rx = poller.subscribe();
        rx.wait_for(|s| s.polls >= 1).await.unwrap();

        parent.cancel();
        assert!(poller.is_stopped());
        poller.join().await;
        assert_eq!(reads(&chain), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_task() {
        let chain = MockChain::new();
        let poller = PositionPoller::spawn(aggregator(&chain), ALICE, PERIOD, &CancellationToken::new());
        let mut rx = poller.subscribe();
        rx.wait_for(|s| s.polls >= 1).await.unwrap();

        drop(poller);
        // The sender goes away once the task exits.
        while rx.changed().await.is_ok() {}
        assert_eq!(reads(&chain), 1);
    }
}
