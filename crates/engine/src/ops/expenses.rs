use chrono::NaiveDate;
use sea_orm::{QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Expense, ResultEngine,
    events::Collection,
    expenses, members,
    util::{checked_balance, ensure_positive, normalize_required_name},
};

use super::{Engine, with_tx};

impl Engine {
    /// Pay an expense out of the cash fund.
    ///
    /// The cash fund may end up negative; the engine records what happened.
    pub async fn record_expense(
        &self,
        description: &str,
        amount: i64,
        date: NaiveDate,
    ) -> ResultEngine<Uuid> {
        self.require_identity()?;
        let description = normalize_required_name(description, "expense description")?;
        ensure_positive(amount, "expense amount")?;

        with_tx!(
            self,
            &[Collection::Members, Collection::Expenses],
            |db_tx| {
                let fund = self.require_cash_fund(&db_tx).await?;
                let fund_balance = checked_balance(fund.balance, -amount)?;
                if fund_balance < 0 {
                    tracing::warn!("cash fund goes negative after expense: {fund_balance}");
                }

                let expense = Expense::new(description, amount, date, self.clock.now());
                expenses::ActiveModel::from(&expense).insert(&db_tx).await?;
                members::balance_update(&fund.id, fund_balance)
                    .update(&db_tx)
                    .await?;
                Ok(expense.id)
            }
        )
    }

    /// Every expense, latest first.
    pub async fn expenses(&self) -> ResultEngine<Vec<Expense>> {
        expenses::Entity::find()
            .order_by_desc(expenses::Column::Timestamp)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Expense::try_from)
            .collect()
    }
}
