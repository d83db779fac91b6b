//! The per-game tariff, a singleton setting.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};

/// Id of the only row in the `tariff` table.
pub(crate) const TARIFF_ID: &str = "tariff";

/// Current price of one game.
///
/// The tariff is overwritten on every update; older values are not kept.
/// Dues entries carry the tariff they were computed with in their amount.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tariff {
    pub value: i64,
    pub effective_date: NaiveDate,
    pub updated_at: DateTime<Utc>,
}

impl Tariff {
    pub fn new(value: i64, updated_at: DateTime<Utc>) -> Self {
        Self {
            value,
            effective_date: updated_at.date_naive(),
            updated_at,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tariff")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub value: i64,
    pub effective_date: Date,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Tariff> for ActiveModel {
    fn from(value: &Tariff) -> Self {
        Self {
            id: ActiveValue::Set(TARIFF_ID.to_string()),
            value: ActiveValue::Set(value.value),
            effective_date: ActiveValue::Set(value.effective_date),
            updated_at: ActiveValue::Set(value.updated_at),
        }
    }
}

impl From<Model> for Tariff {
    fn from(model: Model) -> Self {
        Self {
            value: model.value,
            effective_date: model.effective_date,
            updated_at: model.updated_at,
        }
    }
}
