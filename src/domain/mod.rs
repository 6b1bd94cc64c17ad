pub mod error;
pub mod money;
pub mod operation;
pub mod record;
pub mod traits;
pub mod wallet;

pub use error::Error;
pub use money::Amount;
pub use operation::{Operation, OperationKind, OperationResult, Receipt};
pub use record::{TransactionKind, TransactionRecord, TransactionStatus};
pub use traits::{DeadLetterQueue, LedgerStore};
pub use wallet::{DEFAULT_CURRENCY, Identity, User, Wallet};
