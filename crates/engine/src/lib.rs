//! Ledger engine of a club-dues book.
//!
//! The engine keeps member balances, the club's cash fund, the journal of
//! dues and deposits, expenses and the per-game tariff in a SQL database
//! reached through `sea-orm`. Every write is one database transaction, so
//! the books never show half an operation.
//!
//! The cash fund is stored as a member with the reserved id
//! [`CASH_FUND_ID`]: it shares the balance arithmetic of everybody else.

pub use commands::{BatchDuesEntry, RecordDuesCmd, ResetMode, TransactionFilter};
pub use error::EngineError;
pub use events::{Collection, LedgerChange};
pub use expenses::Expense;
pub use members::{CASH_FUND_ID, CASH_FUND_NAME, Member};
pub use ops::{Debtor, DepositReceipt, Engine, EngineBuilder, LedgerSummary, MembersAdded};
pub use tariff::Tariff;
pub use transactions::{DuesStatus, PaymentMethod, Transaction, TransactionKind};

mod commands;
mod error;
mod events;
mod expenses;
mod members;
mod ops;
mod tariff;
mod transactions;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
