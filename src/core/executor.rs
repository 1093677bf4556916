// Swap execution: bundle assembly, submission and bounded confirmation

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::clients::SwapGateway;
use crate::config::{PollingConfig, TradeConfig};
use crate::core::types::{
    Confirmation, Instruction, PoolKeys, TradeAction, TradeIntent, TradeMemory, TransactionBundle, TxId,
    TxStatus, WrappedAccount, TOKEN_ACCOUNT_SIZE, TOKEN_PROGRAM_ID, WSOL_MINT,
};
use crate::error::{TradingError, TradingResult};

/// Bounded polling for a transaction to land
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfirmPolicy {
    pub attempts: u32,
    pub delay: Duration,
    /// Hard ceiling regardless of attempts left
    pub timeout: Duration,
}

impl ConfirmPolicy {
    pub fn new(attempts: u32, delay: Duration, timeout: Duration) -> Self {
        Self { attempts, delay, timeout }
    }
}

impl From<&PollingConfig> for ConfirmPolicy {
    fn from(polling: &PollingConfig) -> Self {
        Self::new(
            polling.confirm_attempts,
            Duration::from_millis(polling.confirm_delay_ms),
            Duration::from_secs(polling.confirm_timeout_seconds),
        )
    }
}

impl Default for ConfirmPolicy {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeBudget {
    pub unit_limit: u32,
    pub unit_price: u64,
}

impl From<&TradeConfig> for ComputeBudget {
    fn from(trade: &TradeConfig) -> Self {
        Self {
            unit_limit: trade.compute_unit_limit,
            unit_price: trade.compute_unit_price,
        }
    }
}

pub struct TradeExecutor {
    gateway: Arc<dyn SwapGateway>,
    owner: String,
    pool: PoolKeys,
    token_account: String,
    compute: ComputeBudget,
    policy: ConfirmPolicy,
}

impl TradeExecutor {
    pub fn new(
        gateway: Arc<dyn SwapGateway>,
        owner: impl Into<String>,
        pool: PoolKeys,
        token_account: impl Into<String>,
        compute: ComputeBudget,
        policy: ConfirmPolicy,
    ) -> Self {
        Self {
            gateway,
            owner: owner.into(),
            pool,
            token_account: token_account.into(),
            compute,
            policy,
        }
    }

    pub fn token_account(&self) -> &str {
        &self.token_account
    }

    pub fn policy(&self) -> ConfirmPolicy {
        self.policy
    }

    /// Submit `intent` and, once it confirms, record it in `memory`.
    ///
    /// `decision_price` is the price the decision was made on; it is what the
    /// next cycle's repeat filter compares against. Any failure leaves
    /// `memory` as it was.
    pub async fn execute(
        &self,
        intent: &TradeIntent,
        decision_price: f64,
        memory: &mut TradeMemory,
    ) -> TradingResult<Confirmation> {
        info!(
            "📝 Executing {}: amount_in={} minimum_out={}",
            intent.action, intent.amount_in, intent.minimum_amount_out
        );

        let bundle = self.build_bundle(intent, None).await?;
        let (tx_id, attempts) = self.submit_and_confirm(&bundle).await?;

        memory.record(decision_price, intent.action);

        Ok(Confirmation {
            tx_id,
            intent: *intent,
            price: decision_price,
            attempts,
            confirmed_at: Utc::now(),
        })
    }

    /// Create the token account with a zero-amount swap.
    ///
    /// Runs once before the grid loop when the wallet has no account for the
    /// traded mint. Trade memory is not involved.
    pub async fn initialize_token_account(&self, mint: &str) -> TradingResult<Confirmation> {
        info!("🔧 Creating token account {} for {}", self.token_account, mint);

        let intent = TradeIntent::initialize();
        let create = Instruction::CreateAssociatedTokenAccount {
            owner: self.owner.clone(),
            mint: mint.to_string(),
            address: self.token_account.clone(),
        };

        let bundle = self.build_bundle(&intent, Some(create)).await?;
        let (tx_id, attempts) = self.submit_and_confirm(&bundle).await?;

        Ok(Confirmation {
            tx_id,
            intent,
            price: 0.0,
            attempts,
            confirmed_at: Utc::now(),
        })
    }

    /// Compute budget, scratch wrapped-SOL account, optional setup, swap, close.
    pub async fn build_bundle(
        &self,
        intent: &TradeIntent,
        setup: Option<Instruction>,
    ) -> TradingResult<TransactionBundle> {
        let rent = self
            .gateway
            .rent_exempt_minimum()
            .await
            .map_err(|e| TradingError::TradeSubmissionFailed(format!("rent lookup failed: {}", e)))?;
        let wrapped = self
            .gateway
            .create_wrapped_account()
            .await
            .map_err(|e| TradingError::TradeSubmissionFailed(format!("scratch account unavailable: {}", e)))?;

        let funding = match intent.action {
            TradeAction::Buy => rent.checked_add(intent.amount_in).ok_or_else(|| {
                TradingError::TradeSubmissionFailed(format!(
                    "funding of {} + {} lamports overflows",
                    rent, intent.amount_in
                ))
            })?,
            TradeAction::Sell => rent,
        };
        let swap_amount = self.swap_amount_in(intent)?;

        let bundle = self.assemble(intent, swap_amount, &wrapped, funding, setup);
        debug!("Bundle with {} instructions, scratch account {} funded with {} lamports",
               bundle.instructions.len(), wrapped.address, funding);
        Ok(bundle)
    }

    /// Amount the swap instruction spends, in the input mint's base units.
    ///
    /// Buy intents are already in lamports. Sell intents count whole tokens
    /// and are scaled by the pool's base decimals.
    pub fn swap_amount_in(&self, intent: &TradeIntent) -> TradingResult<u64> {
        match intent.action {
            TradeAction::Buy => Ok(intent.amount_in),
            TradeAction::Sell => 10u64
                .checked_pow(self.pool.base_decimals as u32)
                .and_then(|factor| intent.amount_in.checked_mul(factor))
                .ok_or_else(|| {
                    TradingError::TradeSubmissionFailed(format!(
                        "{} tokens at {} decimals overflow the swap amount",
                        intent.amount_in, self.pool.base_decimals
                    ))
                }),
        }
    }

    fn assemble(
        &self,
        intent: &TradeIntent,
        swap_amount: u64,
        wrapped: &WrappedAccount,
        funding: u64,
        setup: Option<Instruction>,
    ) -> TransactionBundle {
        let (source, destination) = match intent.action {
            TradeAction::Buy => (wrapped.address.clone(), self.token_account.clone()),
            TradeAction::Sell => (self.token_account.clone(), wrapped.address.clone()),
        };

        let mut instructions = vec![
            Instruction::SetComputeUnitLimit(self.compute.unit_limit),
            Instruction::SetComputeUnitPrice(self.compute.unit_price),
        ];
        instructions.extend(setup);
        instructions.push(Instruction::CreateAccountWithSeed {
            base: self.owner.clone(),
            seed: wrapped.seed.clone(),
            address: wrapped.address.clone(),
            lamports: funding,
            space: TOKEN_ACCOUNT_SIZE,
            program_id: TOKEN_PROGRAM_ID.to_string(),
        });
        instructions.push(Instruction::InitializeAccount {
            account: wrapped.address.clone(),
            mint: WSOL_MINT.to_string(),
            owner: self.owner.clone(),
        });
        instructions.push(Instruction::Swap {
            amm_id: self.pool.amm_id.clone(),
            amount_in: swap_amount,
            minimum_amount_out: intent.minimum_amount_out,
            source,
            destination,
            owner: self.owner.clone(),
        });
        instructions.push(Instruction::CloseAccount {
            account: wrapped.address.clone(),
            destination: self.owner.clone(),
            owner: self.owner.clone(),
        });

        TransactionBundle {
            payer: self.owner.clone(),
            instructions,
        }
    }

    async fn submit_and_confirm(&self, bundle: &TransactionBundle) -> TradingResult<(TxId, u32)> {
        let tx_id = self
            .gateway
            .submit(bundle)
            .await
            .map_err(|e| TradingError::TradeSubmissionFailed(format!("submit rejected: {}", e)))?;

        info!("📤 Sent transaction {}", tx_id);
        let attempts = self.await_confirmation(&tx_id).await?;
        info!("✅ Transaction {} confirmed after {} check(s)", tx_id, attempts);

        Ok((tx_id, attempts))
    }

    /// Poll the status up to `attempts` times, inside a hard timeout.
    pub async fn await_confirmation(&self, tx_id: &TxId) -> TradingResult<u32> {
        let policy = self.policy;

        let polling = async {
            for attempt in 1..=policy.attempts {
                match self.gateway.signature_status(tx_id).await {
                    Ok(TxStatus::Confirmed) => return Ok(attempt),
                    Ok(TxStatus::Failed(reason)) => {
                        return Err(TradingError::TradeSubmissionFailed(format!(
                            "transaction {} failed: {}",
                            tx_id, reason
                        )));
                    }
                    Ok(TxStatus::Pending) => {
                        debug!("Transaction {} pending (check {}/{})", tx_id, attempt, policy.attempts);
                    }
                    Err(e) => {
                        warn!("Status check {}/{} for {} failed: {}", attempt, policy.attempts, tx_id, e);
                    }
                }

                if attempt < policy.attempts {
                    sleep(policy.delay).await;
                }
            }

            Err(TradingError::TradeSubmissionFailed(format!(
                "transaction {} not confirmed after {} checks",
                tx_id, policy.attempts
            )))
        };

        match timeout(policy.timeout, polling).await {
            Ok(result) => result,
            Err(_) => Err(TradingError::TradeSubmissionFailed(format!(
                "transaction {} confirmation timed out after {:?}",
                tx_id, policy.timeout
            ))),
        }
    }
}
