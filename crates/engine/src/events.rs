//! Change feed.
//!
//! After every committed write the engine publishes a [`LedgerChange`] naming
//! the collections it touched. Views subscribe and re-read what they show;
//! the engine itself never calls into them.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Buffered changes per subscriber before it starts lagging.
pub(crate) const CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Collection {
    Members,
    Transactions,
    Expenses,
    Tariff,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerChange {
    pub collections: Vec<Collection>,
}

impl LedgerChange {
    pub fn new(collections: &[Collection]) -> Self {
        Self {
            collections: collections.to_vec(),
        }
    }

    pub fn touches(&self, collection: Collection) -> bool {
        self.collections.contains(&collection)
    }
}

pub(crate) fn channel() -> broadcast::Sender<LedgerChange> {
    let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
    sender
}
