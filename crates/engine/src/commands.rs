//! Command structs for engine operations.
//!
//! These types group parameters for dues recording, resets and journal
//! queries, keeping call sites readable and avoiding long argument lists.

use chrono::NaiveDate;

use crate::{DuesStatus, EngineError, PaymentMethod, ResultEngine, TransactionKind};

/// Record the dues of one member for one session.
#[derive(Clone, Debug)]
pub struct RecordDuesCmd {
    pub member_id: String,
    pub games_played: i64,
    pub status: DuesStatus,
    /// Tariff in force when the session was entered.
    pub tariff: i64,
    pub date: NaiveDate,
    /// Only meaningful for paid dues.
    pub method: PaymentMethod,
}

impl RecordDuesCmd {
    /// Dues the member still owes: the member's balance goes down.
    #[must_use]
    pub fn unpaid(
        member_id: impl Into<String>,
        games_played: i64,
        tariff: i64,
        date: NaiveDate,
    ) -> Self {
        Self {
            member_id: member_id.into(),
            games_played,
            status: DuesStatus::Unpaid,
            tariff,
            date,
            method: PaymentMethod::None,
        }
    }

    /// Dues settled on the spot, either from the member's balance or in cash.
    #[must_use]
    pub fn paid(
        member_id: impl Into<String>,
        games_played: i64,
        tariff: i64,
        date: NaiveDate,
        method: PaymentMethod,
    ) -> Self {
        Self {
            member_id: member_id.into(),
            games_played,
            status: DuesStatus::Paid,
            tariff,
            date,
            method,
        }
    }
}

/// One row of a collective session settlement.
///
/// Paid rows are always treated as cash handed to the club.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchDuesEntry {
    pub member_id: String,
    pub games_played: i64,
    pub status: DuesStatus,
    pub tariff: i64,
    pub date: NaiveDate,
}

impl BatchDuesEntry {
    #[must_use]
    pub fn new(
        member_id: impl Into<String>,
        games_played: i64,
        status: DuesStatus,
        tariff: i64,
        date: NaiveDate,
    ) -> Self {
        Self {
            member_id: member_id.into(),
            games_played,
            status,
            tariff,
            date,
        }
    }
}

/// Which part of the history a reset wipes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResetMode {
    /// Everything: members (but the cash fund), journals and the tariff.
    All,
    /// Journals since the first day of the previous month; balances go to 0.
    MonthAgo,
    /// Journals between two days, both included; balances go to 0.
    DateRange { start: NaiveDate, end: NaiveDate },
}

impl ResetMode {
    /// Build a mode from its textual name.
    ///
    /// `date-range` needs both dates, in order.
    pub fn parse(
        mode: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> ResultEngine<Self> {
        match mode.trim() {
            "all" => Ok(Self::All),
            "month-ago" | "monthAgo" => Ok(Self::MonthAgo),
            "date-range" | "dateRange" => match (start, end) {
                (Some(start), Some(end)) => Self::date_range(start, end),
                _ => Err(EngineError::InvalidInput(
                    "date range reset needs both a start and an end date".to_string(),
                )),
            },
            other => Err(EngineError::InvalidInput(format!(
                "invalid reset mode: {other}"
            ))),
        }
    }

    pub fn date_range(start: NaiveDate, end: NaiveDate) -> ResultEngine<Self> {
        if start > end {
            return Err(EngineError::InvalidInput(format!(
                "invalid date range: {start} is after {end}"
            )));
        }
        Ok(Self::DateRange { start, end })
    }
}

/// Filters for [`Engine::transactions`](crate::Engine::transactions).
#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub member_id: Option<String>,
    pub kind: Option<TransactionKind>,
    pub dues_status: Option<DuesStatus>,
}

impl TransactionFilter {
    #[must_use]
    pub fn member(mut self, member_id: impl Into<String>) -> Self {
        self.member_id = Some(member_id.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    #[must_use]
    pub fn dues_status(mut self, status: DuesStatus) -> Self {
        self.dues_status = Some(status);
        self
    }
}
