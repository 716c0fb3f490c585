use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::events::OperationEventPublisher;
use crate::models::transfer::messages;
use crate::models::{Account, Money, Transfer, TransferStatus};
use crate::repositories::{AccountRepository, TransferRepository};

/// Command to move money between two wallet accounts.
#[derive(Debug, Clone)]
pub struct TransferCommand {
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub amount: Money,
    pub idempotency_key: String,
}

impl TransferCommand {
    /// Input validation; runs before any I/O.
    fn validate(&self) -> Result<()> {
        if self.sender_id == self.recipient_id {
            return Err(AppError::invalid_argument(
                "sender and recipient must differ",
            ));
        }
        if self.idempotency_key.trim().is_empty() {
            return Err(AppError::invalid_argument("idempotency key is required"));
        }
        Ok(())
    }
}

/// Command to credit an account from an external funding source.
#[derive(Debug, Clone)]
pub struct DepositCommand {
    pub account_id: Uuid,
    pub amount: Money,
    pub idempotency_key: String,
}

impl DepositCommand {
    fn validate(&self) -> Result<()> {
        if self.idempotency_key.trim().is_empty() {
            return Err(AppError::invalid_argument("idempotency key is required"));
        }
        Ok(())
    }
}

/// The ledger domain service: owns accounts and transfers, executes the
/// transactional transfer algorithm, and hands committed Success transfers
/// to the event publisher.
pub struct LedgerService {
    pool: PgPool,
    account_repo: AccountRepository,
    transfer_repo: TransferRepository,
    publisher: Option<Arc<OperationEventPublisher>>,
}

impl LedgerService {
    pub fn new(pool: PgPool, publisher: Option<Arc<OperationEventPublisher>>) -> Self {
        Self {
            account_repo: AccountRepository::new(pool.clone()),
            transfer_repo: TransferRepository::new(pool.clone()),
            pool,
            publisher,
        }
    }

    /// Executes a money transfer.
    ///
    /// The algorithm: validate without I/O, answer replays from the
    /// idempotency index, then inside one transaction lock both accounts in
    /// ascending id order, check existence/currency/funds, move the money
    /// and persist the transfer row, commit, and only then publish the
    /// event. An insufficient balance persists a Failed row before the
    /// error surfaces, which makes the failure replayable like a success.
    #[instrument(skip(self, command), fields(idempotency_key = %command.idempotency_key))]
    pub async fn execute_transfer(&self, command: TransferCommand) -> Result<Transfer> {
        command.validate()?;

        // Replays answer from the persisted row without executing.
        if let Some(existing) = self
            .transfer_repo
            .find_by_idempotency_key(&command.idempotency_key)
            .await?
        {
            return self.replay(existing);
        }

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // Deterministic lock order by account id: two transfers racing in
        // opposite directions between the same pair cannot deadlock.
        let (first_id, second_id) = if command.sender_id < command.recipient_id {
            (command.sender_id, command.recipient_id)
        } else {
            (command.recipient_id, command.sender_id)
        };

        let first = Self::lock_account(&mut tx, first_id).await?;
        let second = Self::lock_account(&mut tx, second_id).await?;

        let (sender, recipient) = if first.id == command.sender_id {
            (first, second)
        } else {
            (second, first)
        };

        Self::check_currency(&sender, &command.amount)?;
        Self::check_currency(&recipient, &command.amount)?;

        if !sender.can_cover(command.amount.value) {
            warn!(
                sender = %sender.id,
                available = %sender.balance,
                requested = %command.amount.value,
                "transfer rejected: insufficient funds"
            );
            let failed = Transfer::transfer(
                command.sender_id,
                command.recipient_id,
                command.amount.value,
                command.amount.currency.clone(),
                command.idempotency_key.clone(),
            )
            .fail(messages::INSUFFICIENT_FUNDS);

            match TransferRepository::create(&mut tx, &failed).await {
                Ok(_) => {
                    tx.commit()
                        .await
                        .map_err(|e| AppError::Internal(e.into()))?;
                    metrics::counter!("wallet_transfers_failed_total").increment(1);
                    return Err(AppError::InsufficientFunds);
                }
                Err(AppError::DuplicateKey) => {
                    drop(tx);
                    return self.reread_after_duplicate(&command.idempotency_key).await;
                }
                Err(e) => return Err(e),
            }
        }

        let debited = sender.balance - command.amount.value;
        let credited = recipient.balance + command.amount.value;
        Self::persist_balance(&mut tx, sender.id, debited).await?;
        Self::persist_balance(&mut tx, recipient.id, credited).await?;

        let transfer = Transfer::transfer(
            command.sender_id,
            command.recipient_id,
            command.amount.value,
            command.amount.currency.clone(),
            command.idempotency_key.clone(),
        )
        .succeed(messages::COMPLETED);

        let transfer = match TransferRepository::create(&mut tx, &transfer).await {
            Ok(row) => row,
            Err(AppError::DuplicateKey) => {
                // Lost the race on the idempotency index: abandon this
                // transaction and answer with the winner's row.
                drop(tx);
                return self.reread_after_duplicate(&command.idempotency_key).await;
            }
            Err(e) => return Err(e),
        };

        tx.commit()
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        metrics::counter!("wallet_transfers_succeeded_total").increment(1);
        info!(
            operation_id = %transfer.id,
            sender = %command.sender_id,
            recipient = %command.recipient_id,
            "transfer committed"
        );

        self.publish_after_commit(&transfer);
        Ok(transfer)
    }

    /// Credits an account from the card top-up flow: the transfer algorithm
    /// with a single locked account and no debit leg.
    #[instrument(skip(self, command), fields(idempotency_key = %command.idempotency_key))]
    pub async fn deposit(&self, command: DepositCommand) -> Result<Transfer> {
        command.validate()?;

        if let Some(existing) = self
            .transfer_repo
            .find_by_idempotency_key(&command.idempotency_key)
            .await?
        {
            return self.replay(existing);
        }

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let account = Self::lock_account(&mut tx, command.account_id).await?;
        Self::check_currency(&account, &command.amount)?;

        let credited = account.balance + command.amount.value;
        Self::persist_balance(&mut tx, account.id, credited).await?;

        let transfer = Transfer::topup(
            command.account_id,
            command.amount.value,
            command.amount.currency.clone(),
            command.idempotency_key.clone(),
        )
        .succeed(messages::TOPUP_COMPLETED);

        let transfer = match TransferRepository::create(&mut tx, &transfer).await {
            Ok(row) => row,
            Err(AppError::DuplicateKey) => {
                drop(tx);
                return self.reread_after_duplicate(&command.idempotency_key).await;
            }
            Err(e) => return Err(e),
        };

        tx.commit()
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        metrics::counter!("wallet_topups_succeeded_total").increment(1);
        info!(operation_id = %transfer.id, account = %command.account_id, "top-up committed");

        self.publish_after_commit(&transfer);
        Ok(transfer)
    }

    /// Lock-free balance lookup for the query path.
    pub async fn get_balance(&self, account_id: Uuid) -> Result<Account> {
        self.account_repo
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Account '{account_id}' not found")))
    }

    /// Fetches an account by id.
    pub async fn get_account(&self, account_id: Uuid) -> Result<Account> {
        self.get_balance(account_id).await
    }

    /// Provisions a new account with an opening balance.
    pub async fn create_account(&self, balance: Decimal, currency: String) -> Result<Account> {
        crate::models::validate_currency(&currency)?;
        if balance < Decimal::ZERO {
            return Err(AppError::invalid_argument(
                "opening balance cannot be negative",
            ));
        }
        if balance.scale() > crate::models::MONEY_SCALE {
            return Err(AppError::invalid_argument(
                "opening balance must have at most two fractional digits",
            ));
        }
        let mut balance = balance;
        balance.rescale(crate::models::MONEY_SCALE);

        self.account_repo
            .create(&Account::new(Uuid::new_v4(), balance, currency))
            .await
    }

    /// Fetches a transfer by id.
    pub async fn get_transfer(&self, id: Uuid) -> Result<Transfer> {
        self.transfer_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Transfer '{id}' not found")))
    }

    /// Answers a replayed idempotency key verbatim from the persisted row.
    /// A Failed row re-surfaces the original failure; nothing executes
    /// again and no event is emitted.
    fn replay(&self, existing: Transfer) -> Result<Transfer> {
        metrics::counter!("wallet_transfers_replayed_total").increment(1);
        info!(operation_id = %existing.id, "idempotent replay answered from existing transfer");
        match existing.status {
            TransferStatus::Failed => Err(AppError::InsufficientFunds),
            _ => Ok(existing),
        }
    }

    /// Recovery path for the idempotency race: the loser re-reads the
    /// winner's row. The key must exist once the unique index rejected us.
    async fn reread_after_duplicate(&self, idempotency_key: &str) -> Result<Transfer> {
        match self
            .transfer_repo
            .find_by_idempotency_key(idempotency_key)
            .await?
        {
            Some(existing) => self.replay(existing),
            None => Err(AppError::Internal(anyhow::anyhow!(
                "idempotency key vanished after duplicate-key violation"
            ))),
        }
    }

    async fn lock_account(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: Uuid,
    ) -> Result<Account> {
        AccountRepository::lock(tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Account '{id}' not found")))
    }

    fn check_currency(account: &Account, amount: &Money) -> Result<()> {
        if account.currency != amount.currency {
            return Err(AppError::CurrencyMismatch {
                held: account.currency.clone(),
                requested: amount.currency.clone(),
            });
        }
        Ok(())
    }

    async fn persist_balance(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: Uuid,
        balance: Decimal,
    ) -> Result<()> {
        if !AccountRepository::update_balance(tx, id, balance).await? {
            // The row is locked by this transaction, so it cannot vanish.
            return Err(AppError::Internal(anyhow::anyhow!(
                "locked account {id} missing during balance update"
            )));
        }
        Ok(())
    }

    /// Post-commit publish: scheduled on its own task, outcome decoupled
    /// from the already-returned result.
    fn publish_after_commit(&self, transfer: &Transfer) {
        if let Some(publisher) = &self.publisher {
            publisher.spawn_publish(transfer.clone());
        }
    }
}
