//! The generic double-entry engine (spec §4.3). Carries zero
//! instrument-specific code: a unit is an opaque string, an account is an
//! opaque id. The engine's sole mutable state is four tables (accounts,
//! balances, transaction log, applied-id set); nothing outside this module
//! ever holds a reference into them (spec §3 "Ownership").
//!
//! Grounded on the approval prototype's validate-then-mutate idiom
//! (`TradeDetails::validate_and_finalise` checks everything before a value
//! escapes) generalized to execute's snapshot-verify-commit-or-rollback
//! protocol — the prototype has no double-entry conservation law of its
//! own, so this is new domain logic built in the teacher's defensive
//! style.

use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;

use crate::account::{Account, AccountId, AccountType, Position};
use crate::error::Error;
use crate::ledger::transaction::{Transaction, TransactionId};

/// The outcome of [`LedgerEngine::execute`]. `AlreadyApplied` is not an
/// error: re-submitting a transaction whose id has already been applied
/// is the idempotent no-op the spec requires (INV-X03).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteOutcome {
    Applied,
    AlreadyApplied,
}

/// A generic, instrument-agnostic double-entry ledger.
///
/// The engine owns its state exclusively: [`LedgerEngine::register_account`]
/// and [`LedgerEngine::execute`] are the only ways to mutate it, and no
/// query method returns anything but an owned copy of a value.
#[derive(Debug, Clone, Default)]
pub struct LedgerEngine {
    accounts: HashMap<AccountId, Account>,
    balances: HashMap<(AccountId, String), Decimal>,
    log: Vec<Transaction>,
    applied_ids: HashSet<TransactionId>,
}

impl LedgerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent registration: re-registering the same id with the same
    /// type is a no-op; a conflicting re-registration (same id, different
    /// type) is an error (spec §4.3 "Register account").
    pub fn register_account(&mut self, id: AccountId, account_type: AccountType) -> Result<(), Error> {
        match self.accounts.get(&id) {
            None => {
                self.accounts.insert(id.clone(), Account::new(id, account_type));
                Ok(())
            }
            Some(existing) if existing.account_type() == account_type => Ok(()),
            Some(existing) => Err(Error::single_violation(
                "account",
                format!(
                    "account {id} already registered as {}, cannot re-register as {}",
                    existing.account_type().tag(),
                    account_type.tag()
                ),
            )),
        }
    }

    pub fn has_account(&self, id: &AccountId) -> bool {
        self.accounts.contains_key(id)
    }

    /// Balance lookup by (account, unit). Unknown pairs return zero, never
    /// an error — a zero balance is the semantically correct answer for an
    /// uncontaminated position (spec §4.3 "Failure semantics").
    pub fn balance(&self, account: &AccountId, unit: &str) -> Decimal {
        self.balances
            .get(&(account.clone(), unit.to_string()))
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// All non-zero positions, in unspecified order unless the caller sorts
    /// (spec §4.3 "Query operations").
    pub fn positions(&self) -> Vec<Position> {
        self.balances
            .iter()
            .filter(|(_, balance)| !balance.is_zero())
            .map(|((account_id, unit), balance)| Position {
                account_id: account_id.clone(),
                unit: unit.clone(),
                balance: *balance,
            })
            .collect()
    }

    /// `sigma(unit)`: the total signed supply of `unit` across all
    /// accounts. A running sum over the balances table; callers needing a
    /// constant-time answer in a hot path should maintain their own
    /// per-unit aggregate alongside this engine.
    pub fn total_supply(&self, unit: &str) -> Decimal {
        self.balances
            .iter()
            .filter(|((_, u), _)| u == unit)
            .map(|(_, balance)| *balance)
            .sum()
    }

    pub fn transaction_count(&self) -> usize {
        self.log.len()
    }

    pub fn log(&self) -> &[Transaction] {
        &self.log
    }

    pub fn is_applied(&self, id: &TransactionId) -> bool {
        self.applied_ids.contains(id)
    }

    /// The execute protocol (spec §4.3 "Execute protocol"), the single
    /// point of mutation in the engine:
    ///
    /// 1. idempotency short-circuit on a previously-applied id;
    /// 2. every move's source and destination must be registered accounts;
    /// 3. snapshot every (account, unit) pair the transaction touches;
    /// 4. apply every move;
    /// 5. recompute `sigma(unit)` for every affected unit and compare
    ///    against the pre-apply sum, restoring the snapshot and failing if
    ///    any unit's total changed;
    /// 6. on success, append to the log and record the id as applied.
    pub fn execute(&mut self, transaction: Transaction) -> Result<ExecuteOutcome, Error> {
        if self.applied_ids.contains(&transaction.id) {
            tracing::debug!(transaction_id = %transaction.id, "transaction already applied, skipping");
            return Ok(ExecuteOutcome::AlreadyApplied);
        }

        for mv in &transaction.moves {
            if !self.accounts.contains_key(&mv.source) {
                return Err(Error::single_violation(
                    "move.source",
                    format!("account {} is not registered", mv.source),
                ));
            }
            if !self.accounts.contains_key(&mv.destination) {
                return Err(Error::single_violation(
                    "move.destination",
                    format!("account {} is not registered", mv.destination),
                ));
            }
        }

        let affected_units = transaction.affected_units();
        let pre_sigma: HashMap<&str, Decimal> = affected_units
            .iter()
            .map(|unit| (*unit, self.total_supply(unit)))
            .collect();

        let mut touched_keys: Vec<(AccountId, String)> = Vec::new();
        for mv in &transaction.moves {
            let src_key = (mv.source.clone(), mv.unit.clone());
            let dst_key = (mv.destination.clone(), mv.unit.clone());
            if !touched_keys.contains(&src_key) {
                touched_keys.push(src_key);
            }
            if !touched_keys.contains(&dst_key) {
                touched_keys.push(dst_key);
            }
        }
        let snapshot: Vec<((AccountId, String), Decimal)> = touched_keys
            .iter()
            .map(|key| (key.clone(), self.balances.get(key).copied().unwrap_or(Decimal::ZERO)))
            .collect();

        for mv in &transaction.moves {
            let src_key = (mv.source.clone(), mv.unit.clone());
            let dst_key = (mv.destination.clone(), mv.unit.clone());
            let src_balance = self.balances.entry(src_key).or_insert(Decimal::ZERO);
            *src_balance -= mv.quantity;
            let dst_balance = self.balances.entry(dst_key).or_insert(Decimal::ZERO);
            *dst_balance += mv.quantity;
        }

        for unit in &affected_units {
            let expected = pre_sigma[unit];
            let actual = self.total_supply(unit);
            if expected != actual {
                for (key, value) in &snapshot {
                    self.balances.insert(key.clone(), *value);
                }
                tracing::error!(
                    transaction_id = %transaction.id,
                    unit = %unit,
                    %expected,
                    %actual,
                    "conservation violation, rolled back"
                );
                return Err(Error::ConservationViolation {
                    law: "INV-L01",
                    unit: unit.to_string(),
                    expected,
                    actual,
                });
            }
        }

        tracing::debug!(transaction_id = %transaction.id, moves = transaction.moves.len(), "transaction applied");
        self.applied_ids.insert(transaction.id.clone());
        self.log.push(transaction);
        Ok(ExecuteOutcome::Applied)
    }

    /// Replay the transaction log of another engine from an empty state,
    /// reproducing its balances byte-exact (spec §4.3 INV-R04, §8 scenario
    /// 6 "Replay determinism"). Used by callers that want a fresh engine
    /// sharing no state with the source (see also `Clone`, INV-L09).
    pub fn replay_from(log: &[Transaction], accounts: impl IntoIterator<Item = (AccountId, AccountType)>) -> Result<Self, Error> {
        let mut engine = Self::new();
        for (id, account_type) in accounts {
            engine.register_account(id, account_type)?;
        }
        for transaction in log {
            engine.execute(transaction.clone())?;
        }
        Ok(engine)
    }
}
