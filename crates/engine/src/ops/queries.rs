use sea_orm::{QueryFilter, QueryOrder, prelude::*};
use serde::{Deserialize, Serialize};

use crate::{
    DuesStatus, EngineError, Member, ResultEngine, Transaction, TransactionFilter,
    TransactionKind,
    members::{self, CASH_FUND_ID},
    transactions,
};

use super::Engine;

/// A member who owes the club.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debtor {
    pub member_id: String,
    pub name: String,
    /// Positive amount owed.
    pub amount: i64,
}

/// Dashboard figures.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerSummary {
    pub cash_fund_balance: i64,
    /// Sum of every member's debt.
    pub total_outstanding: i64,
    /// Largest debt first.
    pub debtors: Vec<Debtor>,
}

impl Engine {
    pub async fn member(&self, member_id: &str) -> ResultEngine<Member> {
        members::Entity::find_by_id(member_id.to_string())
            .one(&self.database)
            .await?
            .map(Member::from)
            .ok_or_else(|| EngineError::NotFound(format!("member \"{member_id}\"")))
    }

    /// Regular members sorted by name. The cash fund is left out.
    pub async fn members(&self) -> ResultEngine<Vec<Member>> {
        Ok(members::Entity::find()
            .filter(members::Column::Id.ne(CASH_FUND_ID))
            .order_by_asc(members::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Member::from)
            .collect())
    }

    pub async fn cash_fund(&self) -> ResultEngine<Member> {
        members::Entity::find_by_id(CASH_FUND_ID.to_string())
            .one(&self.database)
            .await?
            .map(Member::from)
            .ok_or_else(|| EngineError::NotFound("cash fund".to_string()))
    }

    /// Journal entries matching `filter`, latest first.
    pub async fn transactions(&self, filter: TransactionFilter) -> ResultEngine<Vec<Transaction>> {
        let mut query = transactions::Entity::find();
        if let Some(member_id) = filter.member_id {
            query = query.filter(transactions::Column::MemberId.eq(member_id));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(transactions::Column::Kind.eq(kind.as_str()));
        }
        if let Some(status) = filter.dues_status {
            query = query.filter(transactions::Column::DuesStatus.eq(status.as_str()));
        }
        query
            .order_by_desc(transactions::Column::Timestamp)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Transaction::try_from)
            .collect()
    }

    /// Unpaid dues of a member, oldest first: the order deposits settle them.
    pub async fn unpaid_dues(&self, member_id: &str) -> ResultEngine<Vec<Transaction>> {
        let mut unpaid = self
            .transactions(
                TransactionFilter::default()
                    .member(member_id)
                    .kind(TransactionKind::Dues)
                    .dues_status(DuesStatus::Unpaid),
            )
            .await?;
        unpaid.reverse();
        Ok(unpaid)
    }

    pub async fn summary(&self) -> ResultEngine<LedgerSummary> {
        let fund = self.cash_fund().await?;
        let debtors: Vec<Debtor> = members::Entity::find()
            .filter(members::Column::Id.ne(CASH_FUND_ID))
            .filter(members::Column::Balance.lt(0))
            .order_by_asc(members::Column::Balance)
            .order_by_asc(members::Column::Name)
            .all(&self.database)
            .await?
            .into_iter()
            .map(|model| {
                let member = Member::from(model);
                Debtor {
                    amount: member.debt(),
                    member_id: member.id,
                    name: member.name,
                }
            })
            .collect();
        let total_outstanding = debtors
            .iter()
            .try_fold(0i64, |total, debtor| total.checked_add(debtor.amount))
            .ok_or_else(|| EngineError::InvalidInput("outstanding total overflows".to_string()))?;

        Ok(LedgerSummary {
            cash_fund_balance: fund.balance,
            total_outstanding,
            debtors,
        })
    }
}
