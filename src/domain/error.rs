/// Crate-wide error type. Operation failures the caller is expected to branch
/// on and infrastructure failures share one enum so the engine can return a
/// single `Result` shape at the operation boundary.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error("Ingestion failed with: {0}")]
    Ingestion(String),

    #[error("User not authenticated")]
    Unauthenticated,

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Wallet not found for user {0}")]
    WalletNotFound(String),

    #[error("Recipient not found: {0}")]
    RecipientNotFound(String),

    #[error("Recipient wallet not found")]
    RecipientWalletNotFound,

    #[error("Insufficient balance")]
    InsufficientFunds,

    #[error("Cannot transfer to your own wallet")]
    SelfTransfer,

    /// Uniqueness violation on the wallet-per-user constraint. Consumed by the
    /// wallet resolution retry; only surfaces if the re-fetch also fails.
    #[error("Wallet already exists for user {0}")]
    WalletExists(String),

    #[error("Ledger store failed with: {0}")]
    Store(String),
}
