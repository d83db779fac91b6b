use sea_orm::{ConnectionTrait, prelude::*, sea_query::OnConflict};

use crate::{
    ResultEngine, Tariff,
    events::Collection,
    tariff::{self, TARIFF_ID},
    util::ensure_non_negative,
};

use super::Engine;

/// Overwrite the tariff row, inserting it the first time.
pub(super) async fn write_tariff<C: ConnectionTrait>(db: &C, value: &Tariff) -> ResultEngine<()> {
    tariff::Entity::insert(tariff::ActiveModel::from(value))
        .on_conflict(
            OnConflict::column(tariff::Column::Id)
                .update_columns([
                    tariff::Column::Value,
                    tariff::Column::EffectiveDate,
                    tariff::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;
    Ok(())
}

impl Engine {
    /// Set the price of one game, effective today.
    ///
    /// Only the current tariff is kept. Already recorded dues are not
    /// affected.
    pub async fn set_tariff(&self, value: i64) -> ResultEngine<Tariff> {
        self.require_identity()?;
        ensure_non_negative(value, "tariff")?;

        let tariff = Tariff::new(value, self.clock.now());
        write_tariff(&self.database, &tariff).await?;
        self.publish(&[Collection::Tariff]);
        Ok(tariff)
    }

    /// The current tariff; `0` effective today when none was ever set.
    pub async fn tariff(&self) -> ResultEngine<Tariff> {
        let model = tariff::Entity::find_by_id(TARIFF_ID.to_string())
            .one(&self.database)
            .await?;
        Ok(match model {
            Some(model) => Tariff::from(model),
            None => Tariff::new(0, self.clock.now()),
        })
    }
}
