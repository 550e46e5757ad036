//! Accounts and positions (spec §3 "Account and position"). An account is
//! an identifier plus a type tag drawn from a closed set; a position is
//! the balance of a single (account, unit) pair. These are the nouns the
//! [`crate::ledger`] engine moves balances between — they carry no
//! instrument-specific behavior themselves.

use rust_decimal::Decimal;

use crate::value::NonEmptyString;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccountType {
    Cash,
    Securities,
    Derivatives,
    Collateral,
    Margin,
    Accruals,
    ProfitAndLoss,
    Netting,
}

impl AccountType {
    pub fn tag(&self) -> &'static str {
        match self {
            AccountType::Cash => "cash",
            AccountType::Securities => "securities",
            AccountType::Derivatives => "derivatives",
            AccountType::Collateral => "collateral",
            AccountType::Margin => "margin",
            AccountType::Accruals => "accruals",
            AccountType::ProfitAndLoss => "pnl",
            AccountType::Netting => "netting",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Result<Self, crate::error::Error> {
        let id = NonEmptyString::new(id)?;
        Ok(Self(id.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Account {
    id: AccountId,
    account_type: AccountType,
}

impl Account {
    pub fn new(id: AccountId, account_type: AccountType) -> Self {
        Self { id, account_type }
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }
}

/// The balance of a single (account, unit) pair. Instruments and
/// currencies are both "units" from the engine's perspective — it carries
/// no notion of which is which (spec §4.3 "Purpose and polymorphism").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Position {
    pub account_id: AccountId,
    pub unit: String,
    pub balance: Decimal,
}
