use sea_orm::{DatabaseConnection, DatabaseTransaction, prelude::*};
use tokio::sync::broadcast;

use crate::{
    EngineError, ResultEngine,
    events::{self, Collection, LedgerChange},
    members::{self as member_rows, CASH_FUND_ID},
    util::MonotonicClock,
};

mod deposits;
mod dues;
mod expenses;
mod members;
mod queries;
mod reset;
mod tariff;

pub use deposits::DepositReceipt;
pub use members::MembersAdded;
pub use queries::{Debtor, LedgerSummary};

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// With a list of collections, a [`LedgerChange`] naming them is published
/// once the commit went through.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result: $crate::ResultEngine<_> = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
    ($self:expr, $changes:expr, |$tx:ident| $body:expr) => {{
        let result = with_tx!($self, |$tx| $body);
        if result.is_ok() {
            $self.publish($changes);
        }
        result
    }};
}

pub(crate) use with_tx;

/// The ledger engine.
///
/// Every write runs inside one database transaction: balances, journal
/// entries and status flips commit together or not at all. Balances are
/// never cached; each operation re-reads what it needs inside its
/// transaction.
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    identity: Option<String>,
    clock: MonotonicClock,
    changes: broadcast::Sender<LedgerChange>,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Identity the engine writes on behalf of, if any.
    pub fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    /// Subscribe to the change feed.
    ///
    /// A change is delivered after each committed write.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerChange> {
        self.changes.subscribe()
    }

    fn publish(&self, collections: &[Collection]) {
        // No subscriber is not an error.
        let _ = self.changes.send(LedgerChange::new(collections));
    }

    fn require_identity(&self) -> ResultEngine<&str> {
        self.identity.as_deref().ok_or(EngineError::NotAuthenticated)
    }

    /// Read a member inside `db_tx`, failing with `NotFound` when absent.
    async fn require_member(
        &self,
        db_tx: &DatabaseTransaction,
        member_id: &str,
    ) -> ResultEngine<member_rows::Model> {
        member_rows::Entity::find_by_id(member_id.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound(format!("member \"{member_id}\"")))
    }

    async fn require_cash_fund(
        &self,
        db_tx: &DatabaseTransaction,
    ) -> ResultEngine<member_rows::Model> {
        member_rows::Entity::find_by_id(CASH_FUND_ID.to_string())
            .one(db_tx)
            .await?
            .ok_or_else(|| EngineError::NotFound("cash fund".to_string()))
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    identity: Option<String>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Bind the identity writes are made on behalf of.
    ///
    /// Without one every write fails with `NotAuthenticated`.
    pub fn identity(mut self, identity: impl Into<String>) -> EngineBuilder {
        let identity = identity.into();
        let trimmed = identity.trim();
        self.identity = (!trimmed.is_empty()).then(|| trimmed.to_string());
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
            identity: self.identity,
            clock: MonotonicClock::default(),
            changes: events::channel(),
        })
    }
}
