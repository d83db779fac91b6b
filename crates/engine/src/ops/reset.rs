use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use sea_orm::{DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr};

use crate::{
    Member, ResetMode, ResultEngine, Tariff,
    events::Collection,
    expenses,
    members::{self, CASH_FUND_ID},
    transactions,
};

use super::{Engine, tariff::write_tariff, with_tx};

/// First instant of the calendar month before `now`.
pub(crate) fn previous_month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let today = now.date_naive();
    let (year, month) = if today.month() == 1 {
        (today.year() - 1, 12)
    } else {
        (today.year(), today.month() - 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .unwrap_or(today)
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Inclusive timestamp window of a partial reset. `None` for a full reset.
pub(crate) fn reset_window(
    mode: ResetMode,
    now: DateTime<Utc>,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    match mode {
        ResetMode::All => None,
        ResetMode::MonthAgo => Some((previous_month_start(now), now)),
        ResetMode::DateRange { start, end } => {
            let end_of_day =
                NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).unwrap_or(NaiveTime::MIN);
            Some((
                start.and_time(NaiveTime::MIN).and_utc(),
                end.and_time(end_of_day).and_utc(),
            ))
        }
    }
}

impl Engine {
    /// Wipe (part of) the history.
    ///
    /// - [`ResetMode::All`] removes every member but the cash fund, every
    ///   journal entry and expense, and sets the tariff and the cash fund
    ///   balance to 0. A missing cash fund is recreated.
    /// - [`ResetMode::MonthAgo`] and [`ResetMode::DateRange`] remove journal
    ///   entries and expenses inside the window and set every balance,
    ///   cash fund included, to 0. Balances are not rebuilt from the entries
    ///   that survive.
    ///
    /// Everything commits as one transaction.
    pub async fn reset_data(&self, mode: ResetMode) -> ResultEngine<()> {
        self.require_identity()?;
        if let ResetMode::DateRange { start, end } = mode {
            // Re-validate: the variant can be built without `date_range`.
            ResetMode::date_range(start, end)?;
        }
        let now = self.clock.now();

        match reset_window(mode, now) {
            None => {
                with_tx!(
                    self,
                    &[
                        Collection::Members,
                        Collection::Transactions,
                        Collection::Expenses,
                        Collection::Tariff,
                    ],
                    |db_tx| {
                        self.reset_everything(&db_tx, now).await?;
                        Ok(())
                    }
                )?;
                tracing::info!("ledger reset: everything");
            }
            Some((from, to)) => {
                let (journal, spent) = with_tx!(
                    self,
                    &[
                        Collection::Members,
                        Collection::Transactions,
                        Collection::Expenses,
                    ],
                    |db_tx| {
                        let journal = transactions::Entity::delete_many()
                            .filter(transactions::Column::Timestamp.between(from, to))
                            .exec(&db_tx)
                            .await?;
                        let spent = expenses::Entity::delete_many()
                            .filter(expenses::Column::Timestamp.between(from, to))
                            .exec(&db_tx)
                            .await?;
                        members::Entity::update_many()
                            .col_expr(members::Column::Balance, Expr::value(0i64))
                            .exec(&db_tx)
                            .await?;
                        Ok((journal.rows_affected, spent.rows_affected))
                    }
                )?;
                tracing::info!(
                    "ledger reset from {from} to {to}: {journal} journal entries, {spent} expenses removed"
                );
            }
        }
        Ok(())
    }

    async fn reset_everything(&self, db_tx: &DatabaseTransaction, now: DateTime<Utc>) -> ResultEngine<()> {
        members::Entity::delete_many()
            .filter(members::Column::Id.ne(CASH_FUND_ID))
            .exec(db_tx)
            .await?;
        transactions::Entity::delete_many().exec(db_tx).await?;
        expenses::Entity::delete_many().exec(db_tx).await?;
        write_tariff(db_tx, &Tariff::new(0, now)).await?;

        let fund = members::Entity::find_by_id(CASH_FUND_ID.to_string())
            .one(db_tx)
            .await?;
        match fund {
            Some(_) => {
                members::balance_update(CASH_FUND_ID, 0).update(db_tx).await?;
            }
            None => {
                members::ActiveModel::from(&Member::cash_fund(now))
                    .insert(db_tx)
                    .await?;
            }
        }
        Ok(())
    }
}
