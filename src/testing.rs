//! In-memory wallet and contract doubles that record every call in order.

use alloy::primitives::{Address, B256, TxHash, U256, address};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, broadcast};

use crate::chain::ChainId;
use crate::contracts::{
    DerivativeToken, Pending, PendingTransaction, RawPosition, StakingContract, TransactionResult,
};
use crate::error::StakingError;
use crate::wallet::{WalletChange, WalletProvider, WalletSigner};

pub const ALICE: Address = address!("0x00000000000000000000000000000000000a11ce");
pub const BOB_USER: Address = address!("0x0000000000000000000000000000000000000b0b");
pub const BOB_SEPOLIA: u64 = 808813;
pub const RSK_TESTNET: u64 = 31;

/// One observed interaction, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Authorize,
    Stake { value: U256, gas_limit: u64 },
    Restake { amount: U256, gas_limit: u64 },
    GetPosition(Address),
    Approve { spender: Address, value: U256 },
    BalanceOf(Address),
    Allowance { owner: Address, spender: Address },
    NativeBalance(Address),
    /// Confirmation of the named transaction completed.
    Confirmed(&'static str),
}

#[derive(Default)]
struct ChainState {
    calls: Vec<Call>,
    allowance: U256,
    position: RawPosition,
    gm_balance: U256,
    native_balance: U256,
    failures: HashMap<&'static str, StakingError>,
}

/// Shared fake chain behind the mock wallet, signer and contracts.
pub struct MockChain {
    state: Mutex<ChainState>,
    binds: AtomicUsize,
    tx_counter: AtomicU64,
    /// When set, confirmations wait for a permit before completing.
    gate: Mutex<Option<Arc<Notify>>>,
    /// When set, position reads wait for a permit before returning.
    read_gate: Mutex<Option<Arc<Notify>>>,
}

impl MockChain {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ChainState::default()),
            binds: AtomicUsize::new(0),
            tx_counter: AtomicU64::new(0),
            gate: Mutex::new(None),
            read_gate: Mutex::new(None),
        })
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn binds(&self) -> usize {
        self.binds.load(Ordering::SeqCst)
    }

    pub fn set_allowance(&self, allowance: U256) {
        self.state.lock().unwrap().allowance = allowance;
    }

    pub fn set_position(&self, position: RawPosition) {
        self.state.lock().unwrap().position = position;
    }

    pub fn set_gm_balance(&self, balance: U256) {
        self.state.lock().unwrap().gm_balance = balance;
    }

    pub fn set_native_balance(&self, balance: U256) {
        self.state.lock().unwrap().native_balance = balance;
    }

    /// Make `op` fail with `err` from now on.
    pub fn fail(&self, op: &'static str, err: StakingError) {
        self.state.lock().unwrap().failures.insert(op, err);
    }

    pub fn clear_failure(&self, op: &'static str) {
        self.state.lock().unwrap().failures.remove(op);
    }

    /// Hold every confirmation until the returned [`Notify`] hands out a permit.
    pub fn gate_confirmations(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    /// Hold every `getPosition` read until the returned [`Notify`] hands out a permit.
    pub fn gate_reads(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.read_gate.lock().unwrap() = Some(Arc::clone(&gate));
        gate
    }

    fn record(&self, call: Call, op: &'static str) -> Result<(), StakingError> {
        let mut state = self.state.lock().unwrap();
        if let Some(err) = state.failures.get(op) {
            return Err(err.clone());
        }
        state.calls.push(call);
        Ok(())
    }

    fn pending(self: &Arc<Self>, kind: &'static str) -> Pending {
        let n = self.tx_counter.fetch_add(1, Ordering::SeqCst) + 1;
        Box::new(MockPending {
            hash: B256::from(U256::from(n)),
            kind,
            chain: Arc::clone(self),
        })
    }
}

struct MockPending {
    hash: TxHash,
    kind: &'static str,
    chain: Arc<MockChain>,
}

#[async_trait]
impl PendingTransaction for MockPending {
    fn tx_hash(&self) -> TxHash {
        self.hash
    }

    async fn confirm(self: Box<Self>) -> Result<TransactionResult, StakingError> {
        let gate = self.chain.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let op = match self.kind {
            "approve" => "confirm:approve",
            "stake" => "confirm:stake",
            _ => "confirm:restake",
        };
        self.chain.record(Call::Confirmed(self.kind), op)?;
        Ok(TransactionResult {
            transaction_hash: self.hash,
            block_number: Some(1),
            gas_used: 21_000,
        })
    }
}

pub struct MockStaking {
    address: Address,
    chain: Arc<MockChain>,
}

#[async_trait]
impl StakingContract for MockStaking {
    fn address(&self) -> Address {
        self.address
    }

    async fn stake(&self, value: U256, gas_limit: u64) -> Result<Pending, StakingError> {
        self.chain.record(Call::Stake { value, gas_limit }, "stake")?;
        Ok(self.chain.pending("stake"))
    }

    async fn restake(&self, amount: U256, gas_limit: u64) -> Result<Pending, StakingError> {
        self.chain.record(Call::Restake { amount, gas_limit }, "restake")?;
        Ok(self.chain.pending("restake"))
    }

    async fn get_position(&self, user: Address) -> Result<RawPosition, StakingError> {
        self.chain.record(Call::GetPosition(user), "get_position")?;
        let gate = self.chain.read_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self.chain.state.lock().unwrap().position)
    }
}

pub struct MockToken {
    address: Address,
    chain: Arc<MockChain>,
}

#[async_trait]
impl DerivativeToken for MockToken {
    fn address(&self) -> Address {
        self.address
    }

    async fn approve(&self, spender: Address, value: U256) -> Result<Pending, StakingError> {
        self.chain.record(Call::Approve { spender, value }, "approve")?;
        Ok(self.chain.pending("approve"))
    }

    async fn balance_of(&self, account: Address) -> Result<U256, StakingError> {
        self.chain.record(Call::BalanceOf(account), "balance_of")?;
        Ok(self.chain.state.lock().unwrap().gm_balance)
    }

    async fn allowance(&self, owner: Address, spender: Address) -> Result<U256, StakingError> {
        self.chain.record(Call::Allowance { owner, spender }, "allowance")?;
        Ok(self.chain.state.lock().unwrap().allowance)
    }
}

pub struct MockSigner {
    address: Address,
    chain: Arc<MockChain>,
}

#[async_trait]
impl WalletSigner for MockSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn bind_staking(&self, address: Address) -> Arc<dyn StakingContract> {
        self.chain.binds.fetch_add(1, Ordering::SeqCst);
        Arc::new(MockStaking {
            address,
            chain: Arc::clone(&self.chain),
        })
    }

    fn bind_derivative_token(&self, address: Address) -> Arc<dyn DerivativeToken> {
        Arc::new(MockToken {
            address,
            chain: Arc::clone(&self.chain),
        })
    }

    async fn native_balance(&self, account: Address) -> Result<U256, StakingError> {
        self.chain.record(Call::NativeBalance(account), "native_balance")?;
        Ok(self.chain.state.lock().unwrap().native_balance)
    }
}

/// Wallet whose chain and account can be switched by the test.
pub struct MockWallet {
    chain: Arc<MockChain>,
    /// Chain id and account, switched together by [`MockWallet::switch`].
    selected: Mutex<(u64, Address)>,
    connections: AtomicUsize,
    changes: broadcast::Sender<WalletChange>,
}

impl MockWallet {
    pub fn new(chain: Arc<MockChain>, chain_id: u64, account: Address) -> Arc<Self> {
        let (changes, _) = broadcast::channel(8);
        Arc::new(Self {
            chain,
            selected: Mutex::new((chain_id, account)),
            connections: AtomicUsize::new(0),
            changes,
        })
    }

    /// Switch chains without emitting a notification.
    pub fn set_chain_id(&self, chain_id: u64) {
        self.selected.lock().unwrap().0 = chain_id;
    }

    /// Switch accounts without emitting a notification.
    pub fn set_account(&self, account: Address) {
        self.selected.lock().unwrap().1 = account;
    }

    /// Switch chain and account at once, without emitting a notification.
    pub fn switch(&self, chain_id: u64, account: Address) {
        *self.selected.lock().unwrap() = (chain_id, account);
    }

    /// Number of combined signer + chain id reads.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    fn signer_for(&self, address: Address) -> Arc<dyn WalletSigner> {
        Arc::new(MockSigner {
            address,
            chain: Arc::clone(&self.chain),
        })
    }

    pub fn notify(&self, change: WalletChange) {
        let _ = self.changes.send(change);
    }
}

#[async_trait]
impl WalletProvider for MockWallet {
    async fn request_authorization(&self) -> Result<(), StakingError> {
        self.chain.record(Call::Authorize, "authorize")
    }

    async fn signer(&self) -> Result<Arc<dyn WalletSigner>, StakingError> {
        let account = self.selected.lock().unwrap().1;
        Ok(self.signer_for(account))
    }

    async fn chain_id(&self) -> Result<ChainId, StakingError> {
        Ok(ChainId::new(self.selected.lock().unwrap().0))
    }

    async fn connection(&self) -> Result<(Arc<dyn WalletSigner>, ChainId), StakingError> {
        self.connections.fetch_add(1, Ordering::SeqCst);
        let (chain_id, account) = *self.selected.lock().unwrap();
        Ok((self.signer_for(account), ChainId::new(chain_id)))
    }

    fn subscribe(&self) -> broadcast::Receiver<WalletChange> {
        self.changes.subscribe()
    }
}
