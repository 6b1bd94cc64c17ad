use crate::domain::{Amount, Error};

/// One row of driver input: an actor plus the action they are taking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    pub user_id: String,
    pub kind: OperationKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    /// Mirror a sign-up: insert the user row the ledger will reference.
    /// Wallets stay lazy until the first top-up.
    Register { email: String, name: String },
    TopUp { amount: Amount, description: String },
    Transfer {
        recipient_email: String,
        amount: Amount,
        description: String,
    },
}

/// Successful outcome of a ledger operation, carrying the human-readable
/// confirmation the presentation layer shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub message: String,
}

impl Receipt {
    pub fn new(message: String) -> Self {
        Self { message }
    }
}

/// What every engine operation returns: a confirmation or a categorized error,
/// never a panic across the boundary.
pub type OperationResult = Result<Receipt, Error>;
