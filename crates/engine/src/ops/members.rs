use std::collections::HashSet;

use sea_orm::{
    QueryFilter, TransactionTrait,
    prelude::*,
    sea_query::{Expr, OnConflict},
};
use serde::{Deserialize, Serialize};

use crate::{
    EngineError, Member, ResultEngine,
    events::Collection,
    members::{self, CASH_FUND_ID, is_cash_fund_id},
    transactions,
    util::normalize_required_name,
};

use super::{Engine, with_tx};

/// Outcome of [`Engine::create_members`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembersAdded {
    /// Ids of the new members, in input order.
    pub created: Vec<String>,
    /// Names left out because a member with the same name already exists.
    pub skipped: Vec<String>,
}

impl Engine {
    /// Make sure the cash fund row exists, creating it with a zero balance.
    ///
    /// Returns `true` when this call created it. Calling it again never
    /// touches an existing balance, and two concurrent bootstraps end with a
    /// single row.
    pub async fn ensure_cash_fund(&self) -> ResultEngine<bool> {
        self.require_identity()?;
        let existing = members::Entity::find_by_id(CASH_FUND_ID.to_string())
            .one(&self.database)
            .await?;
        if existing.is_some() {
            return Ok(false);
        }

        let fund = Member::cash_fund(self.clock.now());
        let inserted = members::Entity::insert(members::ActiveModel::from(&fund))
            .on_conflict(
                OnConflict::column(members::Column::Id)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await?;
        if inserted > 0 {
            tracing::info!("cash fund created");
            self.publish(&[Collection::Members]);
        }
        Ok(inserted > 0)
    }

    /// Add a member with a zero balance and return its id.
    pub async fn create_member(&self, name: &str) -> ResultEngine<String> {
        self.require_identity()?;
        let name = normalize_required_name(name, "member name")?;

        let member = Member::new(name, self.clock.now());
        members::ActiveModel::from(&member)
            .insert(&self.database)
            .await?;
        self.publish(&[Collection::Members]);
        Ok(member.id)
    }

    /// Add several members at once.
    ///
    /// Blank names are ignored. A name matching an existing member (or an
    /// earlier name of the same call), ignoring case, is skipped instead of
    /// creating a duplicate. All inserts commit together.
    pub async fn create_members<S: AsRef<str>>(&self, names: &[S]) -> ResultEngine<MembersAdded> {
        self.require_identity()?;
        with_tx!(self, &[Collection::Members], |db_tx| {
            let mut taken: HashSet<String> = members::Entity::find()
                .all(&db_tx)
                .await?
                .into_iter()
                .map(|m| m.name.to_lowercase())
                .collect();

            let mut added = MembersAdded::default();
            for raw in names {
                let Ok(name) = normalize_required_name(raw.as_ref(), "member name") else {
                    continue;
                };
                if !taken.insert(name.to_lowercase()) {
                    added.skipped.push(name);
                    continue;
                }
                let member = Member::new(name, self.clock.now());
                members::ActiveModel::from(&member).insert(&db_tx).await?;
                added.created.push(member.id);
            }
            Ok(added)
        })
    }

    /// Rename a member.
    ///
    /// Journal entries keep the name they were written with.
    pub async fn rename_member(&self, member_id: &str, new_name: &str) -> ResultEngine<()> {
        self.require_identity()?;
        if is_cash_fund_id(member_id) {
            return Err(EngineError::InvalidInput(
                "the cash fund cannot be renamed".to_string(),
            ));
        }
        let new_name = normalize_required_name(new_name, "member name")?;

        let result = members::Entity::update_many()
            .col_expr(members::Column::Name, Expr::value(new_name))
            .filter(members::Column::Id.eq(member_id))
            .exec(&self.database)
            .await?;
        if result.rows_affected == 0 {
            return Err(EngineError::NotFound(format!("member \"{member_id}\"")));
        }
        self.publish(&[Collection::Members]);
        Ok(())
    }

    /// Delete a member together with every journal entry that references it.
    ///
    /// Returns how many journal entries were removed.
    pub async fn delete_member(&self, member_id: &str) -> ResultEngine<u64> {
        self.require_identity()?;
        if is_cash_fund_id(member_id) {
            return Err(EngineError::InvalidInput(
                "the cash fund cannot be deleted".to_string(),
            ));
        }

        let removed = with_tx!(
            self,
            &[Collection::Members, Collection::Transactions],
            |db_tx| {
                let member = self.require_member(&db_tx, member_id).await?;
                members::Entity::delete_by_id(member.id.clone())
                    .exec(&db_tx)
                    .await?;
                let journal = transactions::Entity::delete_many()
                    .filter(transactions::Column::MemberId.eq(member.id.as_str()))
                    .exec(&db_tx)
                    .await?;
                Ok(journal.rows_affected)
            }
        )?;

        tracing::info!("member {member_id} deleted with {removed} journal entries");
        Ok(removed)
    }
}
