//! Core ledger for a digital-wallet application.
//!
//! The [`LedgerEngine`] implements the two money-movement operations, top-up
//! and peer transfer, as double-entry writes against a [`LedgerStore`]. The
//! store owns all durable state (users, wallets, transactions) and provides
//! the atomicity: wallet-per-user uniqueness, and a balance-guarded
//! two-row insert for transfers so money is conserved even under concurrent
//! calls. [`MemoryStore`] is the bundled reference store; a real deployment
//! would implement [`LedgerStore`] over its database.

pub mod dlq;
pub mod domain;
pub mod engine;
pub mod ingestion;
pub mod store;

pub use dlq::StdErrDLQ;
pub use domain::{
    Amount, Error, Identity, LedgerStore, Operation, OperationKind, OperationResult, Receipt,
    TransactionKind, TransactionRecord, User, Wallet,
};
pub use engine::LedgerEngine;
pub use ingestion::CsvReader;
pub use store::MemoryStore;
