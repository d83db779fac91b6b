use sea_orm::{QueryFilter, QueryOrder, TransactionTrait, prelude::*, sea_query::Expr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    DuesStatus, ResultEngine, Transaction, TransactionKind,
    events::Collection,
    members::{self, is_cash_fund_id},
    transactions::{self, classify_deposit},
    util::{checked_balance, ensure_positive},
};

use super::{Engine, with_tx};

/// What a deposit did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositReceipt {
    /// Id of the journal entry written for the deposit.
    pub transaction_id: Uuid,
    pub kind: TransactionKind,
    /// Balance of the target after the deposit.
    pub balance: i64,
    /// Unpaid dues entries flipped to paid, oldest first.
    pub settled: Vec<Uuid>,
}

/// Walk unpaid dues oldest-first and pick the ones the deposit covers in full.
///
/// The walk stops at the first entry larger than what is left: that entry
/// and every later one stay unpaid. No entry is ever split.
pub(crate) fn settle_oldest_first(unpaid: &[Transaction], deposit: i64) -> Vec<Uuid> {
    let mut remaining = deposit;
    let mut settled = Vec::new();
    for entry in unpaid {
        if remaining <= 0 || entry.amount > remaining {
            break;
        }
        remaining -= entry.amount;
        settled.push(entry.id);
    }
    settled
}

impl Engine {
    /// Deposit money for a member, or straight into the cash fund.
    ///
    /// A deposit for a member is cash entering the club, so the cash fund
    /// grows by the same amount. Deposits for the cash fund count once. The
    /// member's unpaid dues are then settled oldest first, whole entries
    /// only.
    pub async fn deposit_balance(&self, target_id: &str, amount: i64) -> ResultEngine<DepositReceipt> {
        self.require_identity()?;
        ensure_positive(amount, "deposit amount")?;
        let to_cash_fund = is_cash_fund_id(target_id);

        with_tx!(
            self,
            &[Collection::Members, Collection::Transactions],
            |db_tx| {
                let (target, fund) = if to_cash_fund {
                    (self.require_cash_fund(&db_tx).await?, None)
                } else {
                    let target = self.require_member(&db_tx, target_id).await?;
                    (target, Some(self.require_cash_fund(&db_tx).await?))
                };

                let unpaid = if to_cash_fund {
                    Vec::new()
                } else {
                    transactions::Entity::find()
                        .filter(transactions::Column::MemberId.eq(target.id.as_str()))
                        .filter(transactions::Column::Kind.eq(TransactionKind::Dues.as_str()))
                        .filter(transactions::Column::DuesStatus.eq(DuesStatus::Unpaid.as_str()))
                        .order_by_asc(transactions::Column::Timestamp)
                        .all(&db_tx)
                        .await?
                        .into_iter()
                        .map(Transaction::try_from)
                        .collect::<ResultEngine<Vec<_>>>()?
                };

                let target_balance = checked_balance(target.balance, amount)?;
                members::balance_update(&target.id, target_balance)
                    .update(&db_tx)
                    .await?;
                if let Some(fund) = &fund {
                    let fund_balance = checked_balance(fund.balance, amount)?;
                    members::balance_update(&fund.id, fund_balance)
                        .update(&db_tx)
                        .await?;
                }

                let kind = classify_deposit(target.balance, amount, to_cash_fund);
                let now = self.clock.now();
                let entry = Transaction::deposit(
                    now.date_naive(),
                    target.id.clone(),
                    target.name.clone(),
                    amount,
                    kind,
                    now,
                );
                transactions::ActiveModel::from(&entry).insert(&db_tx).await?;

                let settled = settle_oldest_first(&unpaid, amount);
                if !settled.is_empty() {
                    let ids: Vec<String> = settled.iter().map(Uuid::to_string).collect();
                    transactions::Entity::update_many()
                        .col_expr(
                            transactions::Column::DuesStatus,
                            Expr::value(DuesStatus::Paid.as_str()),
                        )
                        .filter(transactions::Column::Id.is_in(ids))
                        .exec(&db_tx)
                        .await?;
                }
                tracing::debug!(
                    "deposit of {amount} for {}: {} of {} unpaid dues settled",
                    target.id,
                    settled.len(),
                    unpaid.len()
                );

                Ok(DepositReceipt {
                    transaction_id: entry.id,
                    kind,
                    balance: target_balance,
                    settled,
                })
            }
        )
    }
}
