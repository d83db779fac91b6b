//! The module contains `Expense`, money leaving the cash fund.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::{ActiveValue, prelude::*};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: Uuid,
    pub description: String,
    pub amount: i64,
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
}

impl Expense {
    pub fn new(
        description: String,
        amount: i64,
        date: NaiveDate,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            description,
            amount,
            date,
            timestamp,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub description: String,
    pub amount: i64,
    pub date: Date,
    pub timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<&Expense> for ActiveModel {
    fn from(value: &Expense) -> Self {
        Self {
            id: ActiveValue::Set(value.id.to_string()),
            description: ActiveValue::Set(value.description.clone()),
            amount: ActiveValue::Set(value.amount),
            date: ActiveValue::Set(value.date),
            timestamp: ActiveValue::Set(value.timestamp),
        }
    }
}

impl TryFrom<Model> for Expense {
    type Error = EngineError;

    fn try_from(model: Model) -> ResultEngine<Self> {
        Ok(Self {
            id: Uuid::parse_str(&model.id)
                .map_err(|_| EngineError::InvalidInput("invalid expense id".to_string()))?,
            description: model.description,
            amount: model.amount,
            date: model.date,
            timestamp: model.timestamp,
        })
    }
}
