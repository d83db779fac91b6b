use sea_orm::{TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    BatchDuesEntry, DuesStatus, EngineError, PaymentMethod, RecordDuesCmd, ResultEngine,
    Transaction,
    events::Collection,
    members::{self, is_cash_fund_id},
    transactions,
    util::{checked_balance, dues_amount},
};

use super::{Engine, with_tx};

/// Balance deltas of a single dues entry: `(member, cash fund)`.
///
/// Unpaid dues and dues paid from the member's balance both lower the member
/// balance. Cash payments only raise the cash fund.
fn dues_deltas(amount: i64, status: DuesStatus, method: PaymentMethod) -> (i64, i64) {
    match (status, method) {
        (DuesStatus::Unpaid, _) => (-amount, 0),
        (DuesStatus::Paid, PaymentMethod::Cash) => (0, amount),
        (DuesStatus::Paid, _) => (-amount, 0),
    }
}

impl Engine {
    /// Record the dues of one member for one session.
    ///
    /// The member, the cash fund and the new journal entry are written in the
    /// same transaction. The caller picks the payment method; paid dues with
    /// [`PaymentMethod::None`] are rejected.
    pub async fn record_dues(&self, cmd: RecordDuesCmd) -> ResultEngine<Uuid> {
        self.require_identity()?;
        let amount = dues_amount(cmd.games_played, cmd.tariff)?;
        if is_cash_fund_id(&cmd.member_id) {
            return Err(EngineError::InvalidInput(
                "dues are recorded for members, not for the cash fund".to_string(),
            ));
        }
        let method = match cmd.status {
            DuesStatus::Unpaid => PaymentMethod::None,
            DuesStatus::Paid if cmd.method == PaymentMethod::None => {
                return Err(EngineError::InvalidInput(
                    "paid dues need a payment method (balance or cash)".to_string(),
                ));
            }
            DuesStatus::Paid => cmd.method,
        };

        with_tx!(
            self,
            &[Collection::Members, Collection::Transactions],
            |db_tx| {
                let member = self.require_member(&db_tx, &cmd.member_id).await?;
                let fund = self.require_cash_fund(&db_tx).await?;

                let (member_delta, fund_delta) = dues_deltas(amount, cmd.status, method);
                let member_balance = checked_balance(member.balance, member_delta)?;
                let fund_balance = checked_balance(fund.balance, fund_delta)?;

                members::balance_update(&member.id, member_balance)
                    .update(&db_tx)
                    .await?;
                members::balance_update(&fund.id, fund_balance)
                    .update(&db_tx)
                    .await?;

                let entry = Transaction::dues(
                    cmd.date,
                    member.id.clone(),
                    member.name.clone(),
                    cmd.games_played,
                    amount,
                    cmd.status,
                    method,
                    self.clock.now(),
                );
                transactions::ActiveModel::from(&entry).insert(&db_tx).await?;
                Ok(entry.id)
            }
        )
    }

    /// Record a collective session settlement and return how many entries
    /// were written.
    ///
    /// Paid rows are treated as cash. Rows pointing at a member that does not
    /// exist are skipped with a warning instead of failing the batch; every
    /// other row, and the cash fund total, commit together. The cash fund is
    /// read once and written once.
    pub async fn record_batch_dues(&self, entries: Vec<BatchDuesEntry>) -> ResultEngine<usize> {
        self.require_identity()?;
        let amounts = entries
            .iter()
            .map(|entry| dues_amount(entry.games_played, entry.tariff))
            .collect::<ResultEngine<Vec<i64>>>()?;

        let recorded = with_tx!(
            self,
            &[Collection::Members, Collection::Transactions],
            |db_tx| {
                let fund = self.require_cash_fund(&db_tx).await?;
                let mut fund_balance = fund.balance;
                let mut recorded = 0usize;

                for (entry, amount) in entries.iter().zip(amounts) {
                    if is_cash_fund_id(&entry.member_id) {
                        tracing::warn!("batch dues entry for the cash fund skipped");
                        continue;
                    }
                    let Some(member) = members::Entity::find_by_id(entry.member_id.clone())
                        .one(&db_tx)
                        .await?
                    else {
                        tracing::warn!(
                            "member {} not found for batch dues, skipping",
                            entry.member_id
                        );
                        continue;
                    };

                    let method = match entry.status {
                        DuesStatus::Paid => PaymentMethod::Cash,
                        DuesStatus::Unpaid => PaymentMethod::None,
                    };
                    let (member_delta, fund_delta) = dues_deltas(amount, entry.status, method);
                    fund_balance = checked_balance(fund_balance, fund_delta)?;
                    if member_delta != 0 {
                        let member_balance = checked_balance(member.balance, member_delta)?;
                        members::balance_update(&member.id, member_balance)
                            .update(&db_tx)
                            .await?;
                    }

                    let journal_entry = Transaction::dues(
                        entry.date,
                        member.id.clone(),
                        member.name.clone(),
                        entry.games_played,
                        amount,
                        entry.status,
                        method,
                        self.clock.now(),
                    );
                    transactions::ActiveModel::from(&journal_entry)
                        .insert(&db_tx)
                        .await?;
                    recorded += 1;
                }

                members::balance_update(&fund.id, fund_balance)
                    .update(&db_tx)
                    .await?;
                Ok(recorded)
            }
        )?;

        tracing::info!("batch dues: {recorded} entries recorded");
        Ok(recorded)
    }
}
