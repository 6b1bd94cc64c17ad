use chrono::Utc;
use futures::StreamExt;
use uuid::Uuid;

use crate::domain::{
    Amount, Error, Identity, Operation, OperationKind, OperationResult, Receipt,
    TransactionRecord, User, Wallet,
    traits::{DeadLetterQueue, LedgerStore, OperationStream},
};

/// The ledger operation engine. Stateless between calls; every invocation is a
/// single request-scoped unit of work against the store.
#[derive(Debug)]
pub struct LedgerEngine<S>
where
    S: LedgerStore,
{
    store: S,
}

impl<S> LedgerEngine<S>
where
    S: LedgerStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Drive a stream of operations to completion, routing failures to the
    /// dead-letter queue instead of aborting the stream.
    pub async fn process<I, D>(&self, ingestion: &mut I, dlq: &D) -> Result<(), Error>
    where
        I: OperationStream,
        D: DeadLetterQueue,
    {
        let mut ops = ingestion.stream();

        while let Some(op) = ops.next().await {
            match op {
                Ok(op) => match self.apply(&op) {
                    Ok(receipt) => {
                        tracing::info!(user = %op.user_id, "{}", receipt.message);
                    }
                    Err(e) => dlq.report(&op.user_id, &e),
                },
                Err(e) => dlq.report("<unparsed>", &e),
            }
        }

        Ok(())
    }

    pub fn apply(&self, op: &Operation) -> OperationResult {
        match &op.kind {
            OperationKind::Register { email, name } => self.register(&op.user_id, email, name),
            OperationKind::TopUp {
                amount,
                description,
            } => {
                let actor = self.authenticate(&op.user_id)?;
                self.credit(&actor, *amount, description)
            }
            OperationKind::Transfer {
                recipient_email,
                amount,
                description,
            } => {
                let sender = self.authenticate(&op.user_id)?;
                self.transfer(&sender, recipient_email, *amount, description)
            }
        }
    }

    /// Mirror a sign-up: insert the user row the ledger will reference. No
    /// wallet is created here; that stays lazy until the first top-up.
    pub fn register(&self, user_id: &str, email: &str, name: &str) -> OperationResult {
        let email = email.trim();
        if email.is_empty() {
            return Err(Error::Ingestion("email is required".to_owned()));
        }
        self.store.insert_user(User {
            id: user_id.to_owned(),
            email: email.to_owned(),
            name: name.to_owned(),
            created_at: Utc::now(),
        })?;
        Ok(Receipt::new(format!("Registered {}", email)))
    }

    /// Find the user's wallet, creating it on first use. Losing a concurrent
    /// creation race is not an error: the store reports the uniqueness
    /// violation and the winner's wallet is re-fetched.
    pub fn resolve_wallet(&self, user_id: &str) -> Result<Wallet, Error> {
        if let Some(wallet) = self.store.find_wallet(user_id)? {
            return Ok(wallet);
        }
        match self.store.create_wallet(user_id) {
            Ok(wallet) => Ok(wallet),
            Err(Error::WalletExists(_)) => self.store.find_wallet(user_id)?.ok_or_else(|| {
                Error::Store(format!("wallet for {} missing after creation race", user_id))
            }),
            Err(e) => Err(e),
        }
    }

    /// Top up the caller's wallet: one new `top_up` row, balance increment in
    /// the same store unit. Deliberately not idempotent; repeating a call
    /// writes an independent row.
    pub fn credit(&self, actor: &Identity, amount: Amount, description: &str) -> OperationResult {
        let wallet = self.resolve_wallet(&actor.user_id)?;
        let record = TransactionRecord::top_up(&wallet, actor, amount, description);
        tracing::debug!(%record, "recording top-up");
        self.store.record_credit(record)?;
        Ok(Receipt::new(format!("Successfully topped up {}", amount)))
    }

    /// Move `amount` from the caller's wallet to the wallet of the user
    /// registered under `recipient_email`. Writes the two linked legs as one
    /// atomic store operation; on any failure no row exists.
    pub fn transfer(
        &self,
        sender: &Identity,
        recipient_email: &str,
        amount: Amount,
        description: &str,
    ) -> OperationResult {
        let recipient_email = recipient_email.trim();
        if recipient_email.is_empty() {
            return Err(Error::RecipientNotFound("<empty email>".to_owned()));
        }
        if sender.email == recipient_email {
            return Err(Error::SelfTransfer);
        }

        // No lazy creation on either side of a transfer.
        let sender_wallet = self
            .store
            .find_wallet(&sender.user_id)?
            .ok_or_else(|| Error::WalletNotFound(sender.user_id.clone()))?;

        // Fast-fail check; only the re-check inside record_transfer is
        // race-free.
        if sender_wallet.balance < amount.get() {
            return Err(Error::InsufficientFunds);
        }

        let recipient = self
            .store
            .find_user_by_email(recipient_email)?
            .ok_or_else(|| Error::RecipientNotFound(recipient_email.to_owned()))?;
        if recipient.id == sender.user_id {
            return Err(Error::SelfTransfer);
        }
        let recipient_wallet = self
            .store
            .find_wallet(&recipient.id)?
            .ok_or(Error::RecipientWalletNotFound)?;

        // One reference id shared by both legs.
        let reference_id = format!("transfer_{}", Uuid::new_v4());
        let debit = TransactionRecord::transfer_out(
            &sender_wallet,
            sender,
            &recipient.id,
            amount,
            description,
            &reference_id,
        );
        let credit =
            TransactionRecord::transfer_in(&recipient_wallet, &recipient.id, sender, amount, &reference_id);

        tracing::debug!(%debit, "recording transfer");
        self.store.record_transfer(debit, credit)?;

        Ok(Receipt::new(format!(
            "Successfully transferred {} to {}",
            amount, recipient_email
        )))
    }

    fn authenticate(&self, user_id: &str) -> Result<Identity, Error> {
        self.store
            .find_user(user_id)?
            .map(|u| Identity::of(&u))
            .ok_or(Error::Unauthenticated)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use super::LedgerEngine;
    use crate::domain::{
        Amount, Error, Identity, LedgerStore, TransactionKind, TransactionRecord, User, Wallet,
    };
    use crate::store::MemoryStore;

    fn engine() -> LedgerEngine<MemoryStore> {
        LedgerEngine::new(MemoryStore::new())
    }

    fn signed_up(engine: &LedgerEngine<MemoryStore>, id: &str, email: &str) -> Identity {
        engine.register(id, email, id).unwrap();
        Identity {
            user_id: id.to_owned(),
            email: email.to_owned(),
        }
    }

    fn amount(s: &str) -> Amount {
        Amount::parse(s).unwrap()
    }

    fn balance(engine: &LedgerEngine<MemoryStore>, user_id: &str) -> Decimal {
        engine
            .store()
            .find_wallet(user_id)
            .unwrap()
            .unwrap()
            .balance
    }

    fn history(engine: &LedgerEngine<MemoryStore>, user_id: &str) -> Vec<TransactionRecord> {
        let wallet = engine.store().find_wallet(user_id).unwrap().unwrap();
        engine.store().wallet_history(wallet.id).unwrap()
    }

    #[test]
    fn credit_seeds_wallet_and_writes_one_row() {
        let engine = engine();
        let u = signed_up(&engine, "u1", "u1@example.com");
        assert!(engine.store().find_wallet("u1").unwrap().is_none());

        let receipt = engine.credit(&u, amount("100.00"), "seed").unwrap();
        assert_eq!(receipt.message, "Successfully topped up 100.00");

        assert_eq!(balance(&engine, "u1"), dec!(100.00));
        let rows = history(&engine, "u1");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].kind, TransactionKind::TopUp);
        assert_eq!(rows[0].amount, dec!(100.00));
        assert!(rows[0].reference_id.starts_with("topup_"));
    }

    #[test]
    fn credit_is_not_idempotent() {
        // Two identical calls are two independent top-ups; nothing dedupes
        // them.
        let engine = engine();
        let u = signed_up(&engine, "u1", "u1@example.com");
        engine.credit(&u, amount("10.00"), "same").unwrap();
        engine.credit(&u, amount("10.00"), "same").unwrap();

        let rows = history(&engine, "u1");
        assert_eq!(rows.len(), 2);
        assert_ne!(rows[0].reference_id, rows[1].reference_id);
        assert_eq!(balance(&engine, "u1"), dec!(20.00));
    }

    #[test]
    fn transfer_writes_two_legs_sharing_one_reference() {
        let engine = engine();
        let u = signed_up(&engine, "u1", "u@example.com");
        let v = signed_up(&engine, "v1", "v@example.com");
        engine.credit(&u, amount("100.00"), "seed").unwrap();
        engine.credit(&v, amount("10.00"), "seed").unwrap();

        let receipt = engine
            .transfer(&u, "v@example.com", amount("40.00"), "rent")
            .unwrap();
        assert_eq!(
            receipt.message,
            "Successfully transferred 40.00 to v@example.com"
        );

        assert_eq!(balance(&engine, "u1"), dec!(60.00));
        assert_eq!(balance(&engine, "v1"), dec!(50.00));

        let out: Vec<_> = history(&engine, "u1")
            .into_iter()
            .filter(|t| t.kind == TransactionKind::TransferOut)
            .collect();
        let incoming: Vec<_> = history(&engine, "v1")
            .into_iter()
            .filter(|t| t.kind == TransactionKind::TransferIn)
            .collect();
        assert_eq!(out.len(), 1);
        assert_eq!(incoming.len(), 1);
        assert_eq!(out[0].reference_id, incoming[0].reference_id);
        assert_eq!(out[0].amount, incoming[0].amount);
        assert_eq!(out[0].counterpart.as_deref(), Some("v1"));
        assert_eq!(incoming[0].counterpart.as_deref(), Some("u1"));
        assert_eq!(incoming[0].description, "Transfer from u@example.com");
    }

    #[test]
    fn insufficient_funds_leaves_everything_unchanged() {
        let engine = engine();
        let u = signed_up(&engine, "u1", "u@example.com");
        let v = signed_up(&engine, "v1", "v@example.com");
        engine.credit(&u, amount("10.00"), "seed").unwrap();
        engine.credit(&v, amount("5.00"), "seed").unwrap();

        let err = engine
            .transfer(&u, "v@example.com", amount("40.00"), "rent")
            .unwrap_err();
        assert!(matches!(err, Error::InsufficientFunds));

        assert_eq!(balance(&engine, "u1"), dec!(10.00));
        assert_eq!(balance(&engine, "v1"), dec!(5.00));
        assert_eq!(history(&engine, "u1").len(), 1);
        assert_eq!(history(&engine, "v1").len(), 1);
    }

    #[test]
    fn unknown_recipient_writes_nothing() {
        let engine = engine();
        let u = signed_up(&engine, "u1", "u@example.com");
        engine.credit(&u, amount("10.00"), "seed").unwrap();

        let err = engine
            .transfer(&u, "nobody@example.com", amount("5.00"), "x")
            .unwrap_err();
        assert!(matches!(err, Error::RecipientNotFound(_)));
        assert_eq!(history(&engine, "u1").len(), 1);
        assert_eq!(balance(&engine, "u1"), dec!(10.00));
    }

    #[test]
    fn transfer_does_not_create_wallets() {
        let engine = engine();
        let u = signed_up(&engine, "u1", "u@example.com");
        let _v = signed_up(&engine, "v1", "v@example.com");

        // Sender never topped up, so no sender wallet exists.
        let err = engine
            .transfer(&u, "v@example.com", amount("5.00"), "x")
            .unwrap_err();
        assert!(matches!(err, Error::WalletNotFound(_)));

        // Sender funded, recipient wallet still absent.
        engine.credit(&u, amount("10.00"), "seed").unwrap();
        let err = engine
            .transfer(&u, "v@example.com", amount("5.00"), "x")
            .unwrap_err();
        assert!(matches!(err, Error::RecipientWalletNotFound));
        assert!(engine.store().find_wallet("v1").unwrap().is_none());
    }

    #[test]
    fn self_transfer_is_rejected() {
        let engine = engine();
        let u = signed_up(&engine, "u1", "u@example.com");
        engine.credit(&u, amount("10.00"), "seed").unwrap();

        let err = engine
            .transfer(&u, "u@example.com", amount("5.00"), "x")
            .unwrap_err();
        assert!(matches!(err, Error::SelfTransfer));
        assert_eq!(history(&engine, "u1").len(), 1);
    }

    #[test]
    fn empty_recipient_email_is_rejected() {
        let engine = engine();
        let u = signed_up(&engine, "u1", "u@example.com");
        engine.credit(&u, amount("10.00"), "seed").unwrap();

        let err = engine.transfer(&u, "  ", amount("5.00"), "x").unwrap_err();
        assert!(matches!(err, Error::RecipientNotFound(_)));
    }

    #[test]
    fn unauthenticated_actor_is_rejected_before_any_write() {
        use crate::domain::{Operation, OperationKind};

        let engine = engine();
        let op = Operation {
            user_id: "ghost".to_owned(),
            kind: OperationKind::TopUp {
                amount: amount("5.00"),
                description: "x".to_owned(),
            },
        };
        assert!(matches!(engine.apply(&op), Err(Error::Unauthenticated)));
        assert!(engine.store().find_wallet("ghost").unwrap().is_none());
    }

    #[test]
    fn money_is_conserved_across_transfers() {
        let engine = engine();
        let u = signed_up(&engine, "u1", "u@example.com");
        let v = signed_up(&engine, "v1", "v@example.com");
        let w = signed_up(&engine, "w1", "w@example.com");
        engine.credit(&u, amount("100.00"), "seed").unwrap();
        engine.credit(&v, amount("20.00"), "seed").unwrap();
        engine.credit(&w, amount("0.50"), "seed").unwrap();

        engine.transfer(&u, "v@example.com", amount("33.25"), "a").unwrap();
        engine.transfer(&v, "w@example.com", amount("50.00"), "b").unwrap();
        engine.transfer(&w, "u@example.com", amount("1.75"), "c").unwrap();

        let wallets = engine.store().wallets().unwrap();
        let mut materialized = Decimal::ZERO;
        let mut derived = Decimal::ZERO;
        for wallet in &wallets {
            materialized += wallet.balance;
            derived += engine
                .store()
                .wallet_history(wallet.id)
                .unwrap()
                .iter()
                .map(|t| t.signed_amount())
                .sum::<Decimal>();
            assert!(wallet.balance >= Decimal::ZERO);
        }
        // Transfers net to zero; only the top-ups remain.
        assert_eq!(materialized, dec!(120.50));
        assert_eq!(derived, materialized);
    }

    #[test]
    fn concurrent_full_balance_transfers_cannot_overdraw() {
        let engine = Arc::new(engine());
        let u = signed_up(&engine, "u1", "u@example.com");
        let v = signed_up(&engine, "v1", "v@example.com");
        let w = signed_up(&engine, "w1", "w@example.com");
        engine.credit(&u, amount("100.00"), "seed").unwrap();
        engine.credit(&v, amount("1.00"), "seed").unwrap();
        engine.credit(&w, amount("1.00"), "seed").unwrap();

        let handles: Vec<_> = ["v@example.com", "w@example.com"]
            .into_iter()
            .map(|recipient| {
                let engine = Arc::clone(&engine);
                let sender = u.clone();
                thread::spawn(move || {
                    engine.transfer(&sender, recipient, Amount::parse("100.00").unwrap(), "race")
                })
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);
        assert!(
            results
                .iter()
                .any(|r| matches!(r, Err(Error::InsufficientFunds)))
        );
        assert_eq!(balance(&engine, "u1"), dec!(0.00));
    }

    /// Store wrapper that hides the wallet from the first lookup, modelling a
    /// concurrent first-credit that wins the creation race between our find
    /// and create calls.
    struct RacingStore {
        inner: MemoryStore,
        hidden_lookups: std::sync::atomic::AtomicUsize,
    }

    impl LedgerStore for RacingStore {
        fn insert_user(&self, user: User) -> Result<(), Error> {
            self.inner.insert_user(user)
        }
        fn find_user(&self, user_id: &str) -> Result<Option<User>, Error> {
            self.inner.find_user(user_id)
        }
        fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
            self.inner.find_user_by_email(email)
        }
        fn find_wallet(&self, user_id: &str) -> Result<Option<Wallet>, Error> {
            use std::sync::atomic::Ordering;
            if self
                .hidden_lookups
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                    (n > 0).then(|| n - 1)
                })
                .is_ok()
            {
                return Ok(None);
            }
            self.inner.find_wallet(user_id)
        }
        fn create_wallet(&self, user_id: &str) -> Result<Wallet, Error> {
            self.inner.create_wallet(user_id)
        }
        fn record_credit(&self, record: TransactionRecord) -> Result<(), Error> {
            self.inner.record_credit(record)
        }
        fn record_transfer(
            &self,
            debit: TransactionRecord,
            credit: TransactionRecord,
        ) -> Result<(), Error> {
            self.inner.record_transfer(debit, credit)
        }
        fn wallet_history(&self, wallet_id: Uuid) -> Result<Vec<TransactionRecord>, Error> {
            self.inner.wallet_history(wallet_id)
        }
        fn wallets(&self) -> Result<Vec<Wallet>, Error> {
            self.inner.wallets()
        }
    }

    #[test]
    fn lost_wallet_creation_race_refetches_instead_of_failing() {
        let inner = MemoryStore::new();
        let existing = inner.create_wallet("u1").unwrap();
        let engine = LedgerEngine::new(RacingStore {
            inner,
            hidden_lookups: std::sync::atomic::AtomicUsize::new(1),
        });

        // First lookup misses, create hits the uniqueness constraint, the
        // re-fetch returns the winner's wallet.
        let wallet = engine.resolve_wallet("u1").unwrap();
        assert_eq!(wallet.id, existing.id);
        assert_eq!(engine.store().wallets().unwrap().len(), 1);
    }
}
