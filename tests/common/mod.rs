//! In-memory chain used by the integration tests
#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::Mutex,
    time::Duration,
};

use alloy::{
    primitives::{Address, Bytes, Log, TxHash, B256, U256},
    sol_types::{SolCall, SolValue},
};
use token_splitter::{
    config::{ResolverConfig, ScanConfig},
    discovery::{LogScanner, TokenDiscovery, TokenResolver},
    distribution::{orchestrator::custodial, Distributor, ShareTable},
    errors::ChainError,
    traits::TokenChain,
    types::{Confirmation, LogQuery, RecipientShare, TokenInfo},
    utils::erc20_utils::TRANSFER_EVENT_SIGNATURE,
};

pub const CUSTODIAL: Address = Address::new([0xcc; 20]);
pub const ACCOUNT: Address = Address::new([0xaa; 20]);
pub const SENDER: Address = Address::new([0x55; 20]);

const SYMBOL_SELECTOR: [u8; 4] = [0x95, 0xd8, 0x9b, 0x41];
const DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];
const NAME_SELECTOR: [u8; 4] = [0x06, 0xfd, 0xde, 0x03];
const BALANCE_OF_SELECTOR: [u8; 4] = [0x70, 0xa0, 0x82, 0x31];

pub fn token_address(last_byte: u8) -> Address {
    Address::with_last_byte(last_byte)
}

pub fn reverted() -> ChainError {
    ChainError::Reverted {
        data: None,
        message: "execution reverted".to_string(),
    }
}

pub fn transport_down() -> ChainError {
    ChainError::Transport("connection refused".to_string())
}

/// ERC20 `Transfer(from, to, amount)` emitted by `token`
pub fn transfer_log(token: Address, from: Address, to: Address, amount: u64) -> Log {
    Log::new_unchecked(
        token,
        vec![*TRANSFER_EVENT_SIGNATURE, from.into_word(), to.into_word()],
        Bytes::from(U256::from(amount).to_be_bytes::<32>().to_vec()),
    )
}

/// Scripted replies for one token contract
#[derive(Debug, Clone)]
pub struct MockToken {
    pub symbol: Result<Bytes, ChainError>,
    pub decimals: Result<Bytes, ChainError>,
    pub name: Result<Bytes, ChainError>,
    pub balance: Result<U256, ChainError>,
}

impl MockToken {
    pub fn erc20(symbol: &str, decimals: u8, balance: u64) -> Self {
        Self {
            symbol: Ok(symbol.to_string().abi_encode().into()),
            decimals: Ok(U256::from(decimals).abi_encode().into()),
            name: Ok(format!("{} Token", symbol).abi_encode().into()),
            balance: Ok(U256::from(balance)),
        }
    }

    pub fn with_symbol_bytes32(mut self, symbol: &str) -> Self {
        let mut word = [0u8; 32];
        word[..symbol.len()].copy_from_slice(symbol.as_bytes());
        self.symbol = Ok(Bytes::from(word.to_vec()));
        self
    }

    pub fn with_decimals_reverting(mut self) -> Self {
        self.decimals = Err(reverted());
        self
    }

    pub fn with_raw_decimals(mut self, value: U256) -> Self {
        self.decimals = Ok(value.abi_encode().into());
        self
    }

    pub fn without_name(mut self) -> Self {
        self.name = Err(reverted());
        self
    }

    pub fn with_balance_error(mut self, err: ChainError) -> Self {
        self.balance = Err(err);
        self
    }
}

#[derive(Debug, Clone)]
pub struct Submission {
    pub to: Address,
    pub input: Bytes,
    /// Tokens the call distributes
    pub tokens: Vec<Address>,
}

#[derive(Debug, Default)]
struct MockState {
    head: u64,
    finalized_error: Option<ChainError>,
    logs: Vec<(u64, Log)>,
    max_block_range: Option<u64>,
    log_error: Option<ChainError>,
    log_queries: Vec<LogQuery>,
    tokens: HashMap<Address, MockToken>,
    submissions: Vec<Submission>,
    pending: HashMap<TxHash, Vec<Address>>,
    send_failures: HashMap<Address, ChainError>,
    receipts: HashMap<Address, Confirmation>,
    receipt_errors: HashMap<Address, ChainError>,
    contract_receipt: Option<Confirmation>,
    transport_down_after: Option<usize>,
}

/// Scriptable [`TokenChain`]
///
/// Successful distributions zero the distributed balances, like the real
/// contract does.
#[derive(Debug)]
pub struct MockChain {
    state: Mutex<MockState>,
}

impl Default for MockChain {
    fn default() -> Self {
        Self::new(1_000)
    }
}

impl MockChain {
    pub fn new(head: u64) -> Self {
        Self {
            state: Mutex::new(MockState {
                head,
                ..MockState::default()
            }),
        }
    }

    /// Register a token and a transfer into the custodial contract at `block`
    pub fn with_token(self, address: Address, token: MockToken, block: u64) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.tokens.insert(address, token);
            state
                .logs
                .push((block, transfer_log(address, SENDER, CUSTODIAL, 1_000)));
        }
        self
    }

    pub fn with_log(self, block: u64, log: Log) -> Self {
        self.state.lock().unwrap().logs.push((block, log));
        self
    }

    pub fn with_max_block_range(self, range: u64) -> Self {
        self.state.lock().unwrap().max_block_range = Some(range);
        self
    }

    pub fn with_log_error(self, err: ChainError) -> Self {
        self.state.lock().unwrap().log_error = Some(err);
        self
    }

    pub fn with_finalized_error(self, err: ChainError) -> Self {
        self.state.lock().unwrap().finalized_error = Some(err);
        self
    }

    pub fn fail_submission(self, token: Address, err: ChainError) -> Self {
        self.state.lock().unwrap().send_failures.insert(token, err);
        self
    }

    pub fn with_receipt(self, token: Address, confirmation: Confirmation) -> Self {
        self.state.lock().unwrap().receipts.insert(token, confirmation);
        self
    }

    /// Receipt tracking for `token`'s distribution fails with `err`
    pub fn with_receipt_error(self, token: Address, err: ChainError) -> Self {
        self.state.lock().unwrap().receipt_errors.insert(token, err);
        self
    }

    pub fn with_contract_receipt(self, confirmation: Confirmation) -> Self {
        self.state.lock().unwrap().contract_receipt = Some(confirmation);
        self
    }

    /// Every call fails with a transport error once `n` transactions went out
    pub fn drop_connection_after(self, n: usize) -> Self {
        self.state.lock().unwrap().transport_down_after = Some(n);
        self
    }

    pub fn set_balance(&self, token: Address, balance: u64) {
        if let Some(t) = self.state.lock().unwrap().tokens.get_mut(&token) {
            t.balance = Ok(U256::from(balance));
        }
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.state.lock().unwrap().submissions.clone()
    }

    pub fn log_queries(&self) -> Vec<LogQuery> {
        self.state.lock().unwrap().log_queries.clone()
    }

    fn is_down(state: &MockState) -> bool {
        state
            .transport_down_after
            .is_some_and(|n| state.submissions.len() >= n)
    }
}

impl TokenChain for MockChain {
    async fn account(&self) -> Result<Address, ChainError> {
        Ok(ACCOUNT)
    }

    async fn chain_id(&self) -> Result<u64, ChainError> {
        Ok(8453)
    }

    async fn head_block(&self) -> Result<u64, ChainError> {
        let state = self.state.lock().unwrap();
        if Self::is_down(&state) {
            return Err(transport_down());
        }
        match &state.finalized_error {
            Some(err) => Err(err.clone()),
            None => Ok(state.head),
        }
    }

    async fn get_logs(&self, query: &LogQuery) -> Result<Vec<Log>, ChainError> {
        let mut state = self.state.lock().unwrap();
        state.log_queries.push(*query);
        if Self::is_down(&state) {
            return Err(transport_down());
        }
        if let Some(err) = &state.log_error {
            return Err(err.clone());
        }
        if let Some(range) = state.max_block_range {
            if query.to_block - query.from_block + 1 > range {
                return Err(ChainError::Rejected {
                    code: -32005,
                    message: format!("block range exceeds {}", range),
                });
            }
        }
        Ok(state
            .logs
            .iter()
            .filter(|(block, _)| (query.from_block..=query.to_block).contains(block))
            .map(|(_, log)| log)
            .filter(|log| {
                let topics = log.topics();
                topics.first() == Some(&query.event_topic)
                    && topics.get(2) == Some(&query.recipient_topic)
            })
            .cloned()
            .collect())
    }

    async fn call(&self, to: Address, input: Bytes) -> Result<Bytes, ChainError> {
        let state = self.state.lock().unwrap();
        if Self::is_down(&state) {
            return Err(transport_down());
        }
        let Some(token) = state.tokens.get(&to) else {
            return Ok(Bytes::new());
        };
        match input.get(..4) {
            Some(s) if s == SYMBOL_SELECTOR => token.symbol.clone(),
            Some(s) if s == DECIMALS_SELECTOR => token.decimals.clone(),
            Some(s) if s == NAME_SELECTOR => token.name.clone(),
            Some(s) if s == BALANCE_OF_SELECTOR => {
                token.balance.clone().map(|b| b.abi_encode().into())
            }
            _ => Err(reverted()),
        }
    }

    async fn send_transaction(&self, to: Address, input: Bytes) -> Result<TxHash, ChainError> {
        let mut state = self.state.lock().unwrap();
        if Self::is_down(&state) {
            return Err(transport_down());
        }

        let tokens = if let Ok(call) = custodial::distributeCall::abi_decode(&input) {
            if let Some(err) = state.send_failures.get(&call.token) {
                return Err(err.clone());
            }
            vec![call.token]
        } else if custodial::distributeAllCall::abi_decode(&input).is_ok() {
            state.tokens.keys().copied().collect()
        } else {
            return Err(reverted());
        };

        state.submissions.push(Submission {
            to,
            input,
            tokens: tokens.clone(),
        });
        let hash = TxHash::from(B256::with_last_byte(state.submissions.len() as u8));
        state.pending.insert(hash, tokens);
        Ok(hash)
    }

    async fn wait_for_receipt(
        &self,
        tx_hash: TxHash,
        _timeout: Duration,
    ) -> Result<Confirmation, ChainError> {
        let mut state = self.state.lock().unwrap();
        let tokens = state.pending.remove(&tx_hash).unwrap_or_default();
        let block_number = Some(state.head);

        if let [token] = tokens.as_slice() {
            if let Some(err) = state.receipt_errors.get(token) {
                return Err(err.clone());
            }
        }

        let confirmation = if tokens.len() == 1 && state.contract_receipt.is_none() {
            state
                .receipts
                .get(&tokens[0])
                .copied()
                .unwrap_or(Confirmation::Success { block_number })
        } else {
            state
                .contract_receipt
                .unwrap_or(Confirmation::Success { block_number })
        };

        if matches!(confirmation, Confirmation::Success { .. }) {
            for token in tokens {
                if let Some(t) = state.tokens.get_mut(&token) {
                    t.balance = Ok(U256::ZERO);
                }
            }
        }
        Ok(confirmation)
    }
}

pub fn share(label: &str, last_byte: u8, basis_points: u16) -> RecipientShare {
    RecipientShare {
        label: label.to_string(),
        address: Address::new([last_byte; 20]),
        basis_points,
    }
}

/// 50% / 30% / 20%
pub fn observed_table() -> ShareTable {
    ShareTable::new(vec![
        share("A", 0x01, 5000),
        share("B", 0x02, 3000),
        share("C", 0x03, 2000),
    ])
    .unwrap()
}

pub fn discovery(scan: ScanConfig) -> TokenDiscovery {
    TokenDiscovery::new(
        CUSTODIAL,
        LogScanner::new(scan),
        TokenResolver::new(ResolverConfig::default()),
    )
}

pub fn distributor(refresh_after_success: bool) -> Distributor {
    Distributor::new(
        discovery(ScanConfig::default()),
        observed_table(),
        Duration::from_secs(120),
        refresh_after_success,
    )
}

pub fn token_info(address: Address, symbol: &str, decimals: u8, balance: u64) -> TokenInfo {
    TokenInfo {
        address,
        symbol: symbol.to_string(),
        name: Some(format!("{} Token", symbol)),
        decimals,
        raw_balance: U256::from(balance),
    }
}
