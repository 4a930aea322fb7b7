use ci_api_types::{Address, Invoice, TokenAmount};
use std::cell::{Cell, RefCell};

use crate::config::InvoiceConfig;

/// Owned invoices followed by received invoices for one account.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceCollection {
    invoices: Vec<Invoice>,
}

impl InvoiceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one role's batch; empty batches leave the collection untouched.
    pub fn append_batch(&mut self, batch: Vec<Invoice>) {
        if batch.is_empty() {
            return;
        }
        self.invoices.extend(batch);
    }

    pub fn clear(&mut self) {
        self.invoices.clear();
    }

    pub fn get(&self, position: usize) -> Option<&Invoice> {
        self.invoices.get(position)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Invoice> {
        self.invoices.iter()
    }

    pub fn len(&self) -> usize {
        self.invoices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.invoices.is_empty()
    }
}

/// Everything bound at connect time: the account, its contract and token
/// clients, and the invoices last read for it.
///
/// A session is created by [`crate::wallet::connect`] and replaced wholesale
/// on reconnect. The collection uses interior mutability so flows can share
/// `&Session`; no borrow is held across an await.
pub struct Session<C, T> {
    config: InvoiceConfig,
    account: Address,
    contract: C,
    token: T,
    invoices: RefCell<InvoiceCollection>,
    balance: Cell<Option<TokenAmount>>,
}

impl<C, T> Session<C, T> {
    pub fn new(config: InvoiceConfig, account: Address, contract: C, token: T) -> Self {
        Self {
            config,
            account,
            contract,
            token,
            invoices: RefCell::new(InvoiceCollection::new()),
            balance: Cell::new(None),
        }
    }

    pub fn config(&self) -> &InvoiceConfig {
        &self.config
    }

    pub fn account(&self) -> &Address {
        &self.account
    }

    pub fn contract(&self) -> &C {
        &self.contract
    }

    pub fn token(&self) -> &T {
        &self.token
    }

    /// Copy of the current collection.
    pub fn invoices(&self) -> InvoiceCollection {
        self.invoices.borrow().clone()
    }

    pub fn invoice_at(&self, position: usize) -> Option<Invoice> {
        self.invoices.borrow().get(position).cloned()
    }

    pub fn replace_invoices(&self, collection: InvoiceCollection) {
        *self.invoices.borrow_mut() = collection;
    }

    pub fn clear_invoices(&self) {
        self.invoices.borrow_mut().clear();
    }

    pub fn balance(&self) -> Option<TokenAmount> {
        self.balance.get()
    }

    pub fn set_balance(&self, balance: TokenAmount) {
        self.balance.set(Some(balance));
    }
}
