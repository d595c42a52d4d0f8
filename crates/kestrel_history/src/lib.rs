#![deny(missing_docs)]

//! `kestrel_history` persists the transaction history of a system: every
//! install, upgrade, downgrade, reinstall and removal, the reason a package is
//! on the system, captured console output, comps group and environment
//! membership, and which software performed a transaction.
//!
//! The store is a small SQLite database. Writes happen inside database
//! transactions: a history transaction interrupted before [`ActiveTransaction::finish`]
//! leaves no trace. Reads serialise through the owning [`History`] connection.

mod db;
mod item;
mod merged;
mod transaction;

pub use db::History;
pub use item::{
    CompsEnvironmentGroup, CompsEnvironmentItem, CompsGroupItem, CompsGroupPackage, ItemPayload,
    ItemState, TransactionItem,
};
pub use merged::{MergedItem, MergedTransaction};
pub use transaction::{ActiveTransaction, TransactionRecord};

/// Errors of the history store.
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// The underlying database failed.
    #[error("history database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// The database directory could not be created.
    #[error("cannot prepare history database location: {0}")]
    Io(#[from] std::io::Error),
    /// `finish` was called with a state other than `Done` or `Error`.
    #[error("a transaction can only finish as Done or Error, not {0:?}")]
    InvalidFinishState(kestrel_rpm_types::TransactionState),
    /// `set_item_done` named an item the transaction does not carry.
    #[error("transaction has no item for nevra '{0}'")]
    ItemNotFound(String),
    /// A stored integer did not decode to a known enum value.
    #[error("corrupted history row: unknown {what} code {code}")]
    UnknownCode {
        /// Which enum failed to decode.
        what: &'static str,
        /// The offending stored value.
        code: i64,
    },
}

/// Shorthand result type of this crate.
pub type Result<T, E = HistoryError> = std::result::Result<T, E>;
