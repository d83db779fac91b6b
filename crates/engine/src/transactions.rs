//! Journal primitives.
//!
//! A `Transaction` is an append-only journal entry describing a
//! balance-affecting event: a dues entry for a session, or a deposit.
//! Entries are never edited, with one exception: an unpaid dues entry flips
//! to paid when a later deposit covers it.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveValue, entity::prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Dues,
    BalanceDeposit,
    DebtSettlement,
    DebtPayment,
    DebtSettlementPlusDeposit,
}

impl TransactionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dues => "dues",
            Self::BalanceDeposit => "balance_deposit",
            Self::DebtSettlement => "debt_settlement",
            Self::DebtPayment => "debt_payment",
            Self::DebtSettlementPlusDeposit => "debt_settlement_plus_deposit",
        }
    }

    /// `true` for every kind written by a deposit.
    pub fn is_deposit(self) -> bool {
        !matches!(self, Self::Dues)
    }
}

impl TryFrom<&str> for TransactionKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "dues" => Ok(Self::Dues),
            "balance_deposit" => Ok(Self::BalanceDeposit),
            "debt_settlement" => Ok(Self::DebtSettlement),
            "debt_payment" => Ok(Self::DebtPayment),
            "debt_settlement_plus_deposit" => Ok(Self::DebtSettlementPlusDeposit),
            other => Err(EngineError::InvalidInput(format!(
                "invalid transaction kind: {other}"
            ))),
        }
    }
}

impl FromStr for TransactionKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.trim().replace('-', "_").to_lowercase().as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuesStatus {
    Paid,
    Unpaid,
}

impl DuesStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Paid => "paid",
            Self::Unpaid => "unpaid",
        }
    }
}

impl TryFrom<&str> for DuesStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "paid" => Ok(Self::Paid),
            "unpaid" => Ok(Self::Unpaid),
            other => Err(EngineError::InvalidInput(format!(
                "invalid dues status: {other}"
            ))),
        }
    }
}

impl FromStr for DuesStatus {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.trim().to_lowercase().as_str())
    }
}

/// Where the money of a paid entry came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Drawn from the member's existing balance.
    Balance,
    /// New cash handed to the club.
    Cash,
    /// Nothing was paid yet.
    None,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Balance => "balance",
            Self::Cash => "cash",
            Self::None => "none",
        }
    }
}

impl TryFrom<&str> for PaymentMethod {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "balance" => Ok(Self::Balance),
            "cash" => Ok(Self::Cash),
            "none" => Ok(Self::None),
            other => Err(EngineError::InvalidInput(format!(
                "invalid payment method: {other}"
            ))),
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.trim().to_lowercase().as_str())
    }
}

/// Pick the journal kind of a deposit from the balance it lands on.
///
/// The kind is informational: the balance arithmetic is the same for every
/// kind. Deposits to the cash fund are always plain deposits.
pub fn classify_deposit(pre_balance: i64, amount: i64, to_cash_fund: bool) -> TransactionKind {
    if to_cash_fund || pre_balance >= 0 {
        return TransactionKind::BalanceDeposit;
    }
    match amount.unsigned_abs().cmp(&pre_balance.unsigned_abs()) {
        std::cmp::Ordering::Equal => TransactionKind::DebtSettlement,
        std::cmp::Ordering::Greater => TransactionKind::DebtSettlementPlusDeposit,
        std::cmp::Ordering::Less => TransactionKind::DebtPayment,
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub date: NaiveDate,
    pub member_id: String,
    /// Name of the member when the entry was written; renames do not touch it.
    pub member_name: String,
    pub games_played: i64,
    pub amount: i64,
    pub kind: TransactionKind,
    pub dues_status: Option<DuesStatus>,
    pub payment_method: PaymentMethod,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Journal entry for a dues session.
    pub fn dues(
        date: NaiveDate,
        member_id: String,
        member_name: String,
        games_played: i64,
        amount: i64,
        dues_status: DuesStatus,
        payment_method: PaymentMethod,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            member_id,
            member_name,
            games_played,
            amount,
            kind: TransactionKind::Dues,
            dues_status: Some(dues_status),
            payment_method,
            timestamp,
        }
    }

    /// Journal entry for a deposit. Deposits are cash and always paid.
    pub fn deposit(
        date: NaiveDate,
        member_id: String,
        member_name: String,
        amount: i64,
        kind: TransactionKind,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            member_id,
            member_name,
            games_played: 0,
            amount,
            kind,
            dues_status: Some(DuesStatus::Paid),
            payment_method: PaymentMethod::Cash,
            timestamp,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub date: Date,
    pub member_id: String,
    pub member_name: String,
    pub games_played: i64,
    pub amount: i64,
    pub kind: String,
    pub dues_status: Option<String>,
    pub payment_method: String,
    pub timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Transaction> for ActiveModel {
    fn from(tx: &Transaction) -> Self {
        Self {
            id: ActiveValue::Set(tx.id.to_string()),
            date: ActiveValue::Set(tx.date),
            member_id: ActiveValue::Set(tx.member_id.clone()),
            member_name: ActiveValue::Set(tx.member_name.clone()),
            games_played: ActiveValue::Set(tx.games_played),
            amount: ActiveValue::Set(tx.amount),
            kind: ActiveValue::Set(tx.kind.as_str().to_string()),
            dues_status: ActiveValue::Set(tx.dues_status.map(|s| s.as_str().to_string())),
            payment_method: ActiveValue::Set(tx.payment_method.as_str().to_string()),
            timestamp: ActiveValue::Set(tx.timestamp),
        }
    }
}

impl TryFrom<Model> for Transaction {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidInput("invalid transaction id".to_string()))?,
            date: model.date,
            member_id: model.member_id,
            member_name: model.member_name,
            games_played: model.games_played,
            amount: model.amount,
            kind: TransactionKind::try_from(model.kind.as_str())?,
            dues_status: model
                .dues_status
                .as_deref()
                .map(DuesStatus::try_from)
                .transpose()?,
            payment_method: PaymentMethod::try_from(model.payment_method.as_str())?,
            timestamp: model.timestamp,
        })
    }
}
