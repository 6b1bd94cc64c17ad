use futures::Stream;
use uuid::Uuid;

use crate::domain::{Error, Operation, TransactionRecord, User, Wallet};

/// Source of driver operations (the CLI's stand-in for form submissions).
pub trait OperationStream {
    type OpStream: Stream<Item = Result<Operation, Error>> + Send + Unpin + 'static;
    fn stream(&mut self) -> Self::OpStream;
}

/// Sink for operations that failed; the presentation layer would surface these
/// as notifications.
pub trait DeadLetterQueue {
    fn report(&self, user_id: &str, error: &Error);
}

/// The transactional store holding users, wallets, and transactions.
///
/// The engine is stateless between calls; this is the only shared mutable
/// resource, so the atomicity guarantees live here:
/// - `create_wallet` enforces at most one wallet per user id and fails with
///   [`Error::WalletExists`] on a duplicate, letting the caller re-fetch.
/// - `record_credit` inserts the row and applies the balance increment as one
///   unit.
/// - `record_transfer` re-checks the sender's balance under the store's own
///   isolation, then writes both legs and both balance updates, all or
///   nothing. A concurrent transfer can therefore never overdraw, and a debit
///   row can never exist without its matching credit row.
pub trait LedgerStore {
    fn insert_user(&self, user: User) -> Result<(), Error>;
    fn find_user(&self, user_id: &str) -> Result<Option<User>, Error>;
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error>;

    fn find_wallet(&self, user_id: &str) -> Result<Option<Wallet>, Error>;
    fn create_wallet(&self, user_id: &str) -> Result<Wallet, Error>;

    fn record_credit(&self, record: TransactionRecord) -> Result<(), Error>;
    fn record_transfer(
        &self,
        debit: TransactionRecord,
        credit: TransactionRecord,
    ) -> Result<(), Error>;

    fn wallet_history(&self, wallet_id: Uuid) -> Result<Vec<TransactionRecord>, Error>;
    fn wallets(&self) -> Result<Vec<Wallet>, Error>;
}
