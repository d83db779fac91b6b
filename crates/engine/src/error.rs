//! The module contains the error the engine can throw.
//!
//! The errors are:
//!
//! - [`NotFound`] thrown when a member (or the cash fund) does not exist.
//! - [`InvalidInput`] thrown when an argument is rejected before touching the
//!   store.
//! - [`NotAuthenticated`] thrown by writes when no identity is bound.
//! - [`Store`] thrown when the underlying database fails; the transaction in
//!   flight is rolled back.
//!
//!  [`NotFound`]: EngineError::NotFound
//!  [`InvalidInput`]: EngineError::InvalidInput
//!  [`NotAuthenticated`]: EngineError::NotAuthenticated
//!  [`Store`]: EngineError::Store
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
///
/// The `Display` output is meant to be shown to an end user as is.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("No identity bound: sign in before changing the ledger")]
    NotAuthenticated,
    #[error("Store error: {0}")]
    Store(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::InvalidInput(a), Self::InvalidInput(b)) => a == b,
            (Self::NotAuthenticated, Self::NotAuthenticated) => true,
            (Self::Store(a), Self::Store(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
