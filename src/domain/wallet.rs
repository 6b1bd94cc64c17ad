use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

pub const DEFAULT_CURRENCY: &str = "USD";

/// A registered user, as mirrored from the identity provider at sign-up.
/// The ledger only ever references it by id and email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// The authenticated caller of a ledger operation. The engine trusts this
/// unconditionally; producing it from a session is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

impl Identity {
    pub fn of(user: &User) -> Self {
        Self {
            user_id: user.id.clone(),
            email: user.email.clone(),
        }
    }
}

/// Per-user balance-holding record. At most one exists per user id.
///
/// `balance` is a materialized running total: the store updates it in the same
/// atomic unit as each transaction insert, so it always equals the signed sum
/// of the wallet's transaction history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wallet {
    pub id: Uuid,
    pub user_id: String,
    pub balance: Decimal,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

impl Wallet {
    /// A fresh wallet as created lazily on first top-up: zero balance, default
    /// currency.
    pub fn new(user_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_owned(),
            balance: Decimal::ZERO,
            currency: DEFAULT_CURRENCY.to_owned(),
            created_at: Utc::now(),
        }
    }
}
