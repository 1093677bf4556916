// In-memory constant-product pool and wallet for paper trading and tests

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

use crate::clients::{PoolRegistry, ReserveOracle, SwapGateway, TokenLedger};
use crate::config::{Config, SimulationConfig};
use crate::core::amounts::constant_product_out;
use crate::core::types::{
    Instruction, PoolKeys, ReserveSnapshot, TransactionBundle, TxId, TxStatus, WrappedAccount, LAMPORTS_PER_SOL,
    RAYDIUM_AMM_V4, RAYDIUM_AUTHORITY_V4, WSOL_MINT,
};
use crate::error::{TradingError, TradingResult};

/// Rent-exempt minimum for a 165-byte token account
pub const RENT_EXEMPT_LAMPORTS: u64 = 2_039_280;

/// Signature fee per transaction
pub const BASE_FEE_LAMPORTS: u64 = 5_000;

/// Raydium v4 swap fee, 25 bps
pub const SWAP_FEE_RATE: f64 = 0.0025;

pub const SIM_WALLET: &str = "SimWa11et1111111111111111111111111111111111";
pub const SIM_PAIR: &str = "SimPair11111111111111111111111111111111111";

/// How submitted bundles behave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationMode {
    /// Applied and confirmed after `confirm_after` status checks.
    Lands,
    /// Refused at submission.
    Rejected,
    /// Accepted, then reported failed with nothing applied.
    FailsOnChain,
    /// Accepted and pending forever.
    NeverConfirms,
}

#[derive(Debug, Clone)]
struct Ledger {
    base_reserve: f64,
    quote_reserve: f64,
    sol_lamports: u64,
    token_account: Option<String>,
    token_units: u64,
    scratch: HashMap<String, u64>,
}

#[derive(Debug, Clone)]
struct SimTx {
    status: TxStatus,
    checks_left: u32,
}

#[derive(Debug)]
struct ChainState {
    ledger: Ledger,
    mode: ConfirmationMode,
    confirm_after: u32,
    volatility: f64,
    transactions: HashMap<TxId, SimTx>,
    submitted: Vec<TransactionBundle>,
}

pub struct SimulatedChain {
    mint: String,
    token_decimals: u8,
    state: Mutex<ChainState>,
}

impl SimulatedChain {
    pub fn new(mint: impl Into<String>, reserves: ReserveSnapshot) -> Self {
        Self {
            mint: mint.into(),
            token_decimals: reserves.token_decimals,
            state: Mutex::new(ChainState {
                ledger: Ledger {
                    base_reserve: reserves.base_reserve,
                    quote_reserve: reserves.quote_reserve,
                    sol_lamports: 0,
                    token_account: None,
                    token_units: 0,
                    scratch: HashMap::new(),
                },
                mode: ConfirmationMode::Lands,
                confirm_after: 1,
                volatility: 0.0,
                transactions: HashMap::new(),
                submitted: Vec::new(),
            }),
        }
    }

    /// Pool, wallet and drift from the `[simulation]` section
    pub fn from_config(config: &Config) -> Self {
        let sim: &SimulationConfig = &config.simulation;
        let chain = Self::new(
            &config.trade.token_address,
            ReserveSnapshot {
                base_reserve: sim.base_reserve,
                quote_reserve: sim.quote_reserve,
                token_decimals: sim.token_decimals,
            },
        )
        .with_sol_balance((sim.initial_sol * LAMPORTS_PER_SOL).floor() as u64)
        .with_volatility(sim.volatility);

        if sim.initial_tokens > 0.0 {
            chain.with_token_account(sim.initial_tokens)
        } else {
            chain
        }
    }

    pub fn with_sol_balance(self, lamports: u64) -> Self {
        self.lock().ledger.sol_lamports = lamports;
        self
    }

    /// Start with an existing token account holding `tokens`
    pub fn with_token_account(self, tokens: f64) -> Self {
        let units = self.to_units(tokens);
        let address = self.associated_token_address(&self.mint);
        {
            let mut state = self.lock();
            state.ledger.token_account = Some(address);
            state.ledger.token_units = units;
        }
        self
    }

    pub fn with_volatility(self, volatility: f64) -> Self {
        self.lock().volatility = volatility;
        self
    }

    pub fn with_mode(self, mode: ConfirmationMode) -> Self {
        self.set_mode(mode);
        self
    }

    /// Number of status checks that report pending before a landed bundle confirms
    pub fn with_confirm_after(self, checks: u32) -> Self {
        self.lock().confirm_after = checks.max(1);
        self
    }

    pub fn set_mode(&self, mode: ConfirmationMode) {
        self.lock().mode = mode;
    }

    /// Move the quote reserve so the pool quotes `price` at `reference_price`
    pub fn set_price(&self, price: f64, reference_price: f64) {
        let mut state = self.lock();
        state.ledger.quote_reserve = price * state.ledger.base_reserve / reference_price;
    }

    pub fn set_reserves(&self, base_reserve: f64, quote_reserve: f64) {
        let mut state = self.lock();
        state.ledger.base_reserve = base_reserve;
        state.ledger.quote_reserve = quote_reserve;
    }

    pub fn reserves(&self) -> ReserveSnapshot {
        let state = self.lock();
        ReserveSnapshot {
            base_reserve: state.ledger.base_reserve,
            quote_reserve: state.ledger.quote_reserve,
            token_decimals: self.token_decimals,
        }
    }

    pub fn sol_balance(&self) -> u64 {
        self.lock().ledger.sol_lamports
    }

    pub fn token_balance(&self) -> f64 {
        self.from_units(self.lock().ledger.token_units)
    }

    pub fn token_account(&self) -> Option<String> {
        self.lock().ledger.token_account.clone()
    }

    pub fn submitted_bundles(&self) -> Vec<TransactionBundle> {
        self.lock().submitted.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ChainState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn token_factor(&self) -> f64 {
        10f64.powi(self.token_decimals as i32)
    }

    fn to_units(&self, tokens: f64) -> u64 {
        (tokens * self.token_factor()).floor() as u64
    }

    fn from_units(&self, units: u64) -> f64 {
        units as f64 / self.token_factor()
    }

    fn pool_keys(&self) -> PoolKeys {
        PoolKeys {
            amm_id: SIM_PAIR.to_string(),
            program_id: RAYDIUM_AMM_V4.to_string(),
            authority: RAYDIUM_AUTHORITY_V4.to_string(),
            base_mint: self.mint.clone(),
            quote_mint: WSOL_MINT.to_string(),
            base_vault: format!("{}-base-vault", SIM_PAIR),
            quote_vault: format!("{}-quote-vault", SIM_PAIR),
            open_orders: format!("{}-open-orders", SIM_PAIR),
            market_id: format!("{}-market", SIM_PAIR),
            base_decimals: self.token_decimals,
            quote_decimals: 9,
        }
    }

    /// Random external flow against the pool, keeping `x * y` constant
    fn drift(ledger: &mut Ledger, volatility: f64) {
        if volatility <= 0.0 {
            return;
        }
        let shock: f64 = thread_rng().gen_range(-volatility..=volatility);
        let k = ledger.base_reserve * ledger.quote_reserve;
        if shock >= 0.0 {
            ledger.quote_reserve *= 1.0 + shock;
            ledger.base_reserve = k / ledger.quote_reserve;
        } else {
            ledger.base_reserve *= 1.0 - shock;
            ledger.quote_reserve = k / ledger.base_reserve;
        }
    }

    /// Apply every instruction to a copy; the copy replaces the ledger only if all succeed.
    fn apply(&self, ledger: &Ledger, bundle: &TransactionBundle) -> Result<Ledger, String> {
        let mut next = ledger.clone();
        let mut unit_limit: u64 = 0;
        let mut unit_price: u64 = 0;

        for ix in &bundle.instructions {
            match ix {
                Instruction::SetComputeUnitLimit(limit) => unit_limit = *limit as u64,
                Instruction::SetComputeUnitPrice(price) => unit_price = *price,
                Instruction::CreateAssociatedTokenAccount { address, mint, .. } => {
                    if *mint != self.mint {
                        return Err(format!("unknown mint {}", mint));
                    }
                    if next.token_account.is_some() {
                        return Err("token account already in use".to_string());
                    }
                    next.sol_lamports = next
                        .sol_lamports
                        .checked_sub(RENT_EXEMPT_LAMPORTS)
                        .ok_or("insufficient lamports for token account rent")?;
                    next.token_account = Some(address.clone());
                    next.token_units = 0;
                }
                Instruction::CreateAccountWithSeed { address, lamports, .. } => {
                    if next.scratch.contains_key(address) {
                        return Err(format!("account {} already in use", address));
                    }
                    if *lamports < RENT_EXEMPT_LAMPORTS {
                        return Err("scratch account not rent exempt".to_string());
                    }
                    next.sol_lamports = next
                        .sol_lamports
                        .checked_sub(*lamports)
                        .ok_or("insufficient lamports to fund scratch account")?;
                    next.scratch.insert(address.clone(), *lamports);
                }
                Instruction::InitializeAccount { account, mint, .. } => {
                    if mint != WSOL_MINT || !next.scratch.contains_key(account) {
                        return Err(format!("cannot initialize {}", account));
                    }
                }
                Instruction::Swap { amm_id, amount_in, minimum_amount_out, source, destination, .. } => {
                    if amm_id != SIM_PAIR {
                        return Err(format!("unknown pool {}", amm_id));
                    }
                    self.swap(&mut next, *amount_in, *minimum_amount_out, source, destination)?;
                }
                Instruction::CloseAccount { account, .. } => {
                    let lamports = next
                        .scratch
                        .remove(account)
                        .ok_or_else(|| format!("cannot close unknown account {}", account))?;
                    next.sol_lamports += lamports;
                }
            }
        }

        let priority_fee = unit_limit * unit_price / 1_000_000;
        next.sol_lamports = next
            .sol_lamports
            .checked_sub(BASE_FEE_LAMPORTS + priority_fee)
            .ok_or("insufficient lamports for fees")?;

        Ok(next)
    }

    fn swap(
        &self,
        ledger: &mut Ledger,
        amount_in: u64,
        minimum_amount_out: u64,
        source: &str,
        destination: &str,
    ) -> Result<(), String> {
        let token_account = ledger
            .token_account
            .clone()
            .ok_or("token account does not exist")?;

        if amount_in == 0 {
            return if minimum_amount_out == 0 {
                Ok(())
            } else {
                Err("slippage tolerance exceeded".to_string())
            };
        }

        if destination == token_account {
            // SOL in, tokens out
            let wrapped = ledger.scratch.get_mut(source).ok_or("unknown swap source")?;
            let available = wrapped.saturating_sub(RENT_EXEMPT_LAMPORTS);
            if available < amount_in {
                return Err("insufficient wrapped SOL".to_string());
            }

            let sol_in = amount_in as f64 / LAMPORTS_PER_SOL;
            let out = constant_product_out(sol_in * (1.0 - SWAP_FEE_RATE), ledger.quote_reserve, ledger.base_reserve)
                .ok_or("pool has no liquidity")?;
            let out_units = self.to_units(out);
            if out_units < minimum_amount_out {
                return Err(format!("slippage tolerance exceeded: {} < {}", out_units, minimum_amount_out));
            }

            *wrapped -= amount_in;
            ledger.quote_reserve += sol_in;
            ledger.base_reserve -= self.from_units(out_units);
            ledger.token_units += out_units;
            Ok(())
        } else if source == token_account {
            // tokens in, SOL out
            if ledger.token_units < amount_in {
                return Err("insufficient token balance".to_string());
            }

            let tokens_in = self.from_units(amount_in);
            let out = constant_product_out(tokens_in * (1.0 - SWAP_FEE_RATE), ledger.base_reserve, ledger.quote_reserve)
                .ok_or("pool has no liquidity")?;
            let out_lamports = (out * LAMPORTS_PER_SOL).floor() as u64;
            if out_lamports < minimum_amount_out {
                return Err(format!("slippage tolerance exceeded: {} < {}", out_lamports, minimum_amount_out));
            }

            let wrapped = ledger.scratch.get_mut(destination).ok_or("unknown swap destination")?;
            *wrapped += out_lamports;
            ledger.token_units -= amount_in;
            ledger.base_reserve += tokens_in;
            ledger.quote_reserve -= out_lamports as f64 / LAMPORTS_PER_SOL;
            Ok(())
        } else {
            Err("swap does not touch the wallet token account".to_string())
        }
    }
}

#[async_trait]
impl PoolRegistry for SimulatedChain {
    async fn resolve_pair_address(&self, token_address: &str) -> TradingResult<String> {
        if token_address == self.mint {
            Ok(SIM_PAIR.to_string())
        } else {
            Err(TradingError::PoolResolution(format!("no simulated pool for {}", token_address)))
        }
    }

    async fn resolve_pool_keys(&self, pair_address: &str) -> TradingResult<PoolKeys> {
        if pair_address == SIM_PAIR {
            Ok(self.pool_keys())
        } else {
            Err(TradingError::PoolResolution(format!("unknown pair {}", pair_address)))
        }
    }
}

#[async_trait]
impl ReserveOracle for SimulatedChain {
    async fn fetch_reserves(&self, pool: &PoolKeys) -> TradingResult<ReserveSnapshot> {
        if pool.amm_id != SIM_PAIR {
            return Err(TradingError::PriceFeedUnavailable(format!("unknown pool {}", pool.amm_id)));
        }

        let mut state = self.lock();
        let volatility = state.volatility;
        Self::drift(&mut state.ledger, volatility);

        Ok(ReserveSnapshot {
            base_reserve: state.ledger.base_reserve,
            quote_reserve: state.ledger.quote_reserve,
            token_decimals: self.token_decimals,
        })
    }
}

#[async_trait]
impl TokenLedger for SimulatedChain {
    fn owner(&self) -> String {
        SIM_WALLET.to_string()
    }

    fn associated_token_address(&self, mint: &str) -> String {
        let prefix: String = mint.chars().take(8).collect();
        format!("{}-ata-{}", SIM_WALLET, prefix)
    }

    async fn find_token_account(&self, mint: &str) -> TradingResult<Option<String>> {
        if mint != self.mint {
            return Ok(None);
        }
        Ok(self.lock().ledger.token_account.clone())
    }

    async fn fetch_token_balance(&self, mint: &str) -> TradingResult<f64> {
        if mint != self.mint {
            return Ok(0.0);
        }
        Ok(self.token_balance())
    }

    async fn fetch_sol_balance(&self) -> TradingResult<u64> {
        Ok(self.sol_balance())
    }
}

#[async_trait]
impl SwapGateway for SimulatedChain {
    async fn rent_exempt_minimum(&self) -> TradingResult<u64> {
        Ok(RENT_EXEMPT_LAMPORTS)
    }

    async fn create_wrapped_account(&self) -> TradingResult<WrappedAccount> {
        let seed: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        Ok(WrappedAccount {
            address: format!("{}-wsol-{}", SIM_WALLET, seed),
            seed,
        })
    }

    async fn submit(&self, bundle: &TransactionBundle) -> TradingResult<TxId> {
        let mut state = self.lock();
        if state.mode == ConfirmationMode::Rejected {
            return Err(TradingError::TradeSubmissionFailed("simulated node rejected the transaction".into()));
        }
        if bundle.payer != SIM_WALLET {
            return Err(TradingError::TradeSubmissionFailed(format!("unknown payer {}", bundle.payer)));
        }

        let tx_id = TxId(Uuid::new_v4().simple().to_string());
        state.submitted.push(bundle.clone());

        let status = match state.mode {
            ConfirmationMode::Lands => match self.apply(&state.ledger, bundle) {
                Ok(next) => {
                    state.ledger = next;
                    TxStatus::Confirmed
                }
                Err(reason) => TxStatus::Failed(reason),
            },
            ConfirmationMode::FailsOnChain => TxStatus::Failed("simulated program error".to_string()),
            ConfirmationMode::NeverConfirms | ConfirmationMode::Rejected => TxStatus::Pending,
        };
        debug!("Simulated {} -> {:?}", tx_id, status);

        let checks_left = state.confirm_after;
        state.transactions.insert(tx_id.clone(), SimTx { status, checks_left });
        Ok(tx_id)
    }

    async fn signature_status(&self, tx_id: &TxId) -> TradingResult<TxStatus> {
        let mut state = self.lock();
        let tx = state
            .transactions
            .get_mut(tx_id)
            .ok_or_else(|| TradingError::Internal(format!("unknown signature {}", tx_id)))?;

        if tx.status == TxStatus::Pending {
            return Ok(TxStatus::Pending);
        }

        tx.checks_left = tx.checks_left.saturating_sub(1);
        if tx.checks_left > 0 {
            Ok(TxStatus::Pending)
        } else {
            Ok(tx.status.clone())
        }
    }
}
