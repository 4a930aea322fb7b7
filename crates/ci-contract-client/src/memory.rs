use async_trait::async_trait;
use ci_api_types::{
    Address, InvoiceItem, InvoiceStatus, NewInvoice, OwnedInvoiceRecord, ReceivedInvoiceRecord,
    TokenAmount, TxReceipt,
};
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::debug;

use crate::{ContractError, ContractResult, InvoiceContract, TokenLedger};

/// Contract and token methods, for call logs and injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LedgerCall {
    OwnedCount,
    ReceivedCount,
    OwnedInvoice,
    ReceivedInvoice,
    GenerateInvoice,
    MakePayment,
    BalanceOf,
    Approve,
}

#[derive(Debug, Clone)]
struct StoredInvoice {
    id: u64,
    number: String,
    name: String,
    description: String,
    total: TokenAmount,
    items: Vec<InvoiceItem>,
    owner: Address,
    payer: Address,
    status: InvoiceStatus,
    date_due: i64,
}

#[derive(Default)]
struct LedgerState {
    invoices: Vec<StoredInvoice>,
    owned: HashMap<String, Vec<usize>>,
    received: HashMap<String, Vec<usize>>,
    balances: HashMap<String, TokenAmount>,
    allowances: HashMap<(String, String), TokenAmount>,
    failures: HashMap<LedgerCall, String>,
    calls: Vec<LedgerCall>,
    tx_counter: u64,
}

impl LedgerState {
    /// Log the call and consume an injected failure for it, if any.
    fn enter(&mut self, call: LedgerCall) -> ContractResult<()> {
        self.calls.push(call);
        match self.failures.remove(&call) {
            Some(message) => Err(ContractError::Rejected(message)),
            None => Ok(()),
        }
    }

    fn next_receipt(&mut self) -> TxReceipt {
        self.tx_counter += 1;
        TxReceipt {
            tx_hash: format!("0x{:064x}", self.tx_counter),
        }
    }

    fn balance(&self, account: &str) -> TokenAmount {
        self.balances.get(account).copied().unwrap_or_default()
    }

    fn slot(list: &HashMap<String, Vec<usize>>, account: &str, index: u64) -> ContractResult<usize> {
        usize::try_from(index)
            .ok()
            .and_then(|i| list.get(account)?.get(i).copied())
            .ok_or_else(|| ContractError::Rejected("invoice index out of range".to_owned()))
    }
}

fn key(address: &Address) -> String {
    address.as_str().trim().to_ascii_lowercase()
}

/// In-process stand-in for the deployed invoice contract and its cUSD token.
///
/// Mirrors the contract rules the front end relies on: per-owner and
/// per-payer lists addressed by position, no self-invoicing, payment pulls
/// the approved allowance from payer to owner and flips the status to PAID.
pub struct InMemoryInvoiceLedger {
    address: Address,
    token: Address,
    symbol: String,
    state: RefCell<LedgerState>,
}

impl InMemoryInvoiceLedger {
    pub fn new(address: Address, token: Address) -> Self {
        Self {
            address,
            token,
            symbol: "cUSD".to_owned(),
            state: RefCell::new(LedgerState::default()),
        }
    }

    pub fn mint(&self, account: &Address, amount: TokenAmount) {
        let mut state = self.state.borrow_mut();
        let entry = state.balances.entry(key(account)).or_default();
        *entry = entry.checked_add(amount).unwrap_or(TokenAmount(u128::MAX));
    }

    pub fn balance(&self, account: &Address) -> TokenAmount {
        self.state.borrow().balance(&key(account))
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> TokenAmount {
        self.state
            .borrow()
            .allowances
            .get(&(key(owner), key(spender)))
            .copied()
            .unwrap_or_default()
    }

    /// Make the next call of `call` fail with `message`.
    pub fn fail_next(&self, call: LedgerCall, message: impl Into<String>) {
        self.state.borrow_mut().failures.insert(call, message.into());
    }

    pub fn calls(&self) -> Vec<LedgerCall> {
        self.state.borrow().calls.clone()
    }

    pub fn call_count(&self, call: LedgerCall) -> usize {
        self.state.borrow().calls.iter().filter(|c| **c == call).count()
    }

    pub fn invoice_status(&self, id: u64) -> Option<InvoiceStatus> {
        self.state
            .borrow()
            .invoices
            .iter()
            .find(|invoice| invoice.id == id)
            .map(|invoice| invoice.status)
    }

    /// Move an invoice to `status` outside the payment path, e.g. DECLINED.
    pub fn set_status(&self, id: u64, status: InvoiceStatus) {
        let mut state = self.state.borrow_mut();
        if let Some(invoice) = state.invoices.iter_mut().find(|invoice| invoice.id == id) {
            invoice.status = status;
        }
    }
}

#[async_trait(?Send)]
impl InvoiceContract for InMemoryInvoiceLedger {
    fn address(&self) -> &Address {
        &self.address
    }

    async fn owned_invoice_count(&self, owner: &Address) -> ContractResult<u64> {
        let mut state = self.state.borrow_mut();
        state.enter(LedgerCall::OwnedCount)?;
        Ok(state.owned.get(&key(owner)).map_or(0, |list| list.len() as u64))
    }

    async fn received_invoice_count(&self, payer: &Address) -> ContractResult<u64> {
        let mut state = self.state.borrow_mut();
        state.enter(LedgerCall::ReceivedCount)?;
        Ok(state.received.get(&key(payer)).map_or(0, |list| list.len() as u64))
    }

    async fn owned_invoice(
        &self,
        caller: &Address,
        index: u64,
    ) -> ContractResult<OwnedInvoiceRecord> {
        let mut state = self.state.borrow_mut();
        state.enter(LedgerCall::OwnedInvoice)?;
        let slot = LedgerState::slot(&state.owned, &key(caller), index)?;
        let invoice = &state.invoices[slot];
        Ok(OwnedInvoiceRecord {
            id: invoice.id.to_string(),
            number: invoice.number.clone(),
            name: invoice.name.clone(),
            description: invoice.description.clone(),
            total: invoice.total,
            items: invoice.items.clone(),
            payer: invoice.payer.clone(),
            status: invoice.status.code(),
            date_due: invoice.date_due,
        })
    }

    async fn received_invoice(
        &self,
        caller: &Address,
        index: u64,
    ) -> ContractResult<ReceivedInvoiceRecord> {
        let mut state = self.state.borrow_mut();
        state.enter(LedgerCall::ReceivedInvoice)?;
        let slot = LedgerState::slot(&state.received, &key(caller), index)?;
        let invoice = &state.invoices[slot];
        Ok(ReceivedInvoiceRecord {
            id: invoice.id.to_string(),
            number: invoice.number.clone(),
            name: invoice.name.clone(),
            description: invoice.description.clone(),
            total: invoice.total,
            items: invoice.items.clone(),
            owner: invoice.owner.clone(),
            payer: invoice.payer.clone(),
            status: invoice.status.code(),
            date_due: invoice.date_due,
        })
    }

    async fn generate_invoice(
        &self,
        sender: &Address,
        invoice: &NewInvoice,
    ) -> ContractResult<TxReceipt> {
        let mut state = self.state.borrow_mut();
        state.enter(LedgerCall::GenerateInvoice)?;
        if sender.same_as(&invoice.payer) {
            return Err(ContractError::Rejected(
                "execution reverted: cannot invoice yourself".to_owned(),
            ));
        }

        let id = state.invoices.len() as u64;
        let slot = state.invoices.len();
        state.invoices.push(StoredInvoice {
            id,
            number: invoice.number.clone(),
            name: invoice.name.clone(),
            description: invoice.description.clone(),
            total: invoice.total,
            items: invoice.items.clone(),
            owner: sender.clone(),
            payer: invoice.payer.clone(),
            status: InvoiceStatus::Pending,
            date_due: invoice.date_due,
        });
        state.owned.entry(key(sender)).or_default().push(slot);
        state.received.entry(key(&invoice.payer)).or_default().push(slot);

        debug!(id, owner = %sender, payer = %invoice.payer, "ledger stored invoice");
        Ok(state.next_receipt())
    }

    async fn make_invoice_payment(&self, sender: &Address, index: u64) -> ContractResult<TxReceipt> {
        let mut state = self.state.borrow_mut();
        state.enter(LedgerCall::MakePayment)?;
        let payer = key(sender);
        let slot = LedgerState::slot(&state.received, &payer, index)?;
        let (total, owner) = {
            let invoice = &state.invoices[slot];
            if invoice.status != InvoiceStatus::Pending {
                return Err(ContractError::Rejected(
                    "execution reverted: invoice is not pending".to_owned(),
                ));
            }
            (invoice.total, key(&invoice.owner))
        };

        let allowance_key = (payer.clone(), key(&self.address));
        let allowance = state.allowances.get(&allowance_key).copied().unwrap_or_default();
        let remaining_allowance = allowance.checked_sub(total).ok_or_else(|| {
            ContractError::Rejected("execution reverted: insufficient allowance".to_owned())
        })?;
        let payer_balance = state.balance(&payer).checked_sub(total).ok_or_else(|| {
            ContractError::Rejected("execution reverted: transfer value exceeded balance".to_owned())
        })?;
        let owner_balance = state
            .balance(&owner)
            .checked_add(total)
            .unwrap_or(TokenAmount(u128::MAX));

        state.allowances.insert(allowance_key, remaining_allowance);
        state.balances.insert(payer, payer_balance);
        state.balances.insert(owner, owner_balance);
        state.invoices[slot].status = InvoiceStatus::Paid;

        debug!(slot, index, payer = %sender, "ledger settled invoice");
        Ok(state.next_receipt())
    }
}

#[async_trait(?Send)]
impl TokenLedger for InMemoryInvoiceLedger {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    async fn balance_of(&self, account: &Address) -> ContractResult<TokenAmount> {
        let mut state = self.state.borrow_mut();
        state.enter(LedgerCall::BalanceOf)?;
        Ok(state.balance(&key(account)))
    }

    async fn approve(
        &self,
        owner: &Address,
        spender: &Address,
        amount: TokenAmount,
    ) -> ContractResult<TxReceipt> {
        let mut state = self.state.borrow_mut();
        state.enter(LedgerCall::Approve)?;
        state.allowances.insert((key(owner), key(spender)), amount);
        debug!(token = %self.token, %owner, %spender, %amount, "allowance set");
        Ok(state.next_receipt())
    }
}
