//! The module contains `Member` struct and its persistence model.

use chrono::{DateTime, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reserved id of the member row that holds the club's cash fund.
pub const CASH_FUND_ID: &str = "kas_klub";

/// Display name given to the cash fund when it is created.
pub const CASH_FUND_NAME: &str = "Kas Klub";

/// A club member.
///
/// `balance` is signed: a negative value is a debt towards the club, a
/// positive value is credit the member can spend on future dues.
///
/// The cash fund is a `Member` too, identified by [`CASH_FUND_ID`]. It takes
/// part in the same balance arithmetic as everybody else.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    pub balance: i64,
    pub created_at: DateTime<Utc>,
}

impl Member {
    /// New regular member with a fresh UUID and a zero balance.
    pub fn new(name: String, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            balance: 0,
            created_at,
        }
    }

    pub(crate) fn cash_fund(created_at: DateTime<Utc>) -> Self {
        Self {
            id: CASH_FUND_ID.to_string(),
            name: CASH_FUND_NAME.to_string(),
            balance: 0,
            created_at,
        }
    }

    pub fn is_cash_fund(&self) -> bool {
        is_cash_fund_id(&self.id)
    }

    /// Outstanding debt, `0` when the balance is not negative.
    pub fn debt(&self) -> i64 {
        self.balance.min(0).saturating_neg()
    }
}

pub fn is_cash_fund_id(id: &str) -> bool {
    id == CASH_FUND_ID
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "members")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub name: String,
    pub balance: i64,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Member> for ActiveModel {
    fn from(value: &Member) -> Self {
        Self {
            id: ActiveValue::Set(value.id.clone()),
            name: ActiveValue::Set(value.name.clone()),
            balance: ActiveValue::Set(value.balance),
            created_at: ActiveValue::Set(value.created_at),
        }
    }
}

impl From<Model> for Member {
    fn from(model: Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            balance: model.balance,
            created_at: model.created_at,
        }
    }
}

/// Active model that only touches the balance column.
pub(crate) fn balance_update(id: &str, balance: i64) -> ActiveModel {
    ActiveModel {
        id: ActiveValue::Set(id.to_string()),
        balance: ActiveValue::Set(balance),
        ..Default::default()
    }
}
