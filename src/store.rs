use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use crate::domain::{Error, LedgerStore, TransactionRecord, User, Wallet};

#[derive(Default, Debug)]
struct Inner {
    users: HashMap<String, User>,
    wallets: HashMap<Uuid, Wallet>,
    // Uniqueness constraint: at most one wallet per user id.
    wallet_by_user: HashMap<String, Uuid>,
    // Append-only; records are never mutated or deleted.
    transactions: Vec<TransactionRecord>,
}

/// In-memory [`LedgerStore`]. One mutex guards all tables, so each store call
/// is a serialized critical section, which is what gives `record_transfer` its
/// check-then-write atomicity.
#[derive(Default, Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, Error> {
        self.inner
            .lock()
            .map_err(|_| Error::Store("store lock poisoned".to_owned()))
    }
}

impl LedgerStore for MemoryStore {
    fn insert_user(&self, user: User) -> Result<(), Error> {
        let mut inner = self.lock()?;
        if inner.users.values().any(|u| u.email == user.email) {
            return Err(Error::Store(format!(
                "email {} already registered",
                user.email
            )));
        }
        match inner.users.entry(user.id.clone()) {
            Entry::Vacant(e) => {
                e.insert(user);
                Ok(())
            }
            Entry::Occupied(_) => Err(Error::Store(format!(
                "user id {} already registered",
                user.id
            ))),
        }
    }

    fn find_user(&self, user_id: &str) -> Result<Option<User>, Error> {
        Ok(self.lock()?.users.get(user_id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        Ok(self
            .lock()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    fn find_wallet(&self, user_id: &str) -> Result<Option<Wallet>, Error> {
        let inner = self.lock()?;
        Ok(inner
            .wallet_by_user
            .get(user_id)
            .and_then(|id| inner.wallets.get(id))
            .cloned())
    }

    fn create_wallet(&self, user_id: &str) -> Result<Wallet, Error> {
        let mut inner = self.lock()?;
        if inner.wallet_by_user.contains_key(user_id) {
            return Err(Error::WalletExists(user_id.to_owned()));
        }
        let wallet = Wallet::new(user_id);
        inner.wallet_by_user.insert(user_id.to_owned(), wallet.id);
        inner.wallets.insert(wallet.id, wallet.clone());
        Ok(wallet)
    }

    fn record_credit(&self, record: TransactionRecord) -> Result<(), Error> {
        let mut inner = self.lock()?;
        let wallet = inner
            .wallets
            .get_mut(&record.wallet_id)
            .ok_or_else(|| Error::Store(format!("no wallet {}", record.wallet_id)))?;
        wallet.balance += record.amount;
        inner.transactions.push(record);
        Ok(())
    }

    fn record_transfer(
        &self,
        debit: TransactionRecord,
        credit: TransactionRecord,
    ) -> Result<(), Error> {
        let mut inner = self.lock()?;

        // Balance guard under the lock. The engine pre-checks too, but only
        // this check is race-free.
        let sender = inner
            .wallets
            .get(&debit.wallet_id)
            .ok_or_else(|| Error::Store(format!("no wallet {}", debit.wallet_id)))?;
        if sender.balance < debit.amount {
            return Err(Error::InsufficientFunds);
        }
        if !inner.wallets.contains_key(&credit.wallet_id) {
            return Err(Error::Store(format!("no wallet {}", credit.wallet_id)));
        }

        // Both guards passed; nothing below can fail, so the write is
        // all-or-nothing.
        if let Some(w) = inner.wallets.get_mut(&debit.wallet_id) {
            w.balance -= debit.amount;
        }
        if let Some(w) = inner.wallets.get_mut(&credit.wallet_id) {
            w.balance += credit.amount;
        }
        inner.transactions.push(debit);
        inner.transactions.push(credit);
        Ok(())
    }

    fn wallet_history(&self, wallet_id: Uuid) -> Result<Vec<TransactionRecord>, Error> {
        Ok(self
            .lock()?
            .transactions
            .iter()
            .filter(|t| t.wallet_id == wallet_id)
            .cloned()
            .collect())
    }

    fn wallets(&self) -> Result<Vec<Wallet>, Error> {
        Ok(self.lock()?.wallets.values().cloned().collect())
    }
}
