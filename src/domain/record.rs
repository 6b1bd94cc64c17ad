use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{Amount, Identity, Wallet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    TopUp,
    TransferOut,
    TransferIn,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::TopUp => "top_up",
            TransactionKind::TransferOut => "transfer_out",
            TransactionKind::TransferIn => "transfer_in",
        }
    }
}

/// Every record the engine produces is final; there is no pending or failed
/// row, a failed operation simply writes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Completed,
}

/// One immutable ledger entry. Never mutated or deleted once written.
///
/// For a transfer, exactly two records exist sharing one `reference_id`: a
/// `TransferOut` on the sender's wallet and a `TransferIn` on the recipient's,
/// both for the same amount, each naming the other party in `counterpart`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub wallet_id: Uuid,
    pub user_id: String,
    pub kind: TransactionKind,
    pub amount: Decimal,
    pub currency: String,
    pub description: String,
    pub status: TransactionStatus,
    pub counterpart: Option<String>,
    pub reference_id: String,
    pub created_at: DateTime<Utc>,
}

impl TransactionRecord {
    pub fn top_up(wallet: &Wallet, actor: &Identity, amount: Amount, description: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_id: wallet.id,
            user_id: actor.user_id.clone(),
            kind: TransactionKind::TopUp,
            amount: amount.get(),
            currency: wallet.currency.clone(),
            description: description.to_owned(),
            status: TransactionStatus::Completed,
            counterpart: None,
            reference_id: format!("topup_{}", Uuid::new_v4()),
            created_at: Utc::now(),
        }
    }

    /// The sender-side leg of a transfer.
    pub fn transfer_out(
        wallet: &Wallet,
        sender: &Identity,
        recipient_id: &str,
        amount: Amount,
        description: &str,
        reference_id: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_id: wallet.id,
            user_id: sender.user_id.clone(),
            kind: TransactionKind::TransferOut,
            amount: amount.get(),
            currency: wallet.currency.clone(),
            description: description.to_owned(),
            status: TransactionStatus::Completed,
            counterpart: Some(recipient_id.to_owned()),
            reference_id: reference_id.to_owned(),
            created_at: Utc::now(),
        }
    }

    /// The recipient-side leg; shares the sender leg's `reference_id`.
    pub fn transfer_in(
        wallet: &Wallet,
        recipient_id: &str,
        sender: &Identity,
        amount: Amount,
        reference_id: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            wallet_id: wallet.id,
            user_id: recipient_id.to_owned(),
            kind: TransactionKind::TransferIn,
            amount: amount.get(),
            currency: wallet.currency.clone(),
            description: format!("Transfer from {}", sender.email),
            status: TransactionStatus::Completed,
            counterpart: Some(sender.user_id.clone()),
            reference_id: reference_id.to_owned(),
            created_at: Utc::now(),
        }
    }

    /// Signed contribution of this record to its wallet's balance.
    pub fn signed_amount(&self) -> Decimal {
        match self.kind {
            TransactionKind::TopUp | TransactionKind::TransferIn => self.amount,
            TransactionKind::TransferOut => -self.amount,
        }
    }
}

impl core::fmt::Display for TransactionRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{},user={},amount={} {},ref={}",
            self.kind.as_str(),
            self.user_id,
            self.amount,
            self.currency,
            self.reference_id
        )
    }
}
