use async_trait::async_trait;
use ci_api_types::{
    Address, NewInvoice, OwnedInvoiceRecord, ReceivedInvoiceRecord, TokenAmount, TxReceipt,
};
use std::rc::Rc;
use thiserror::Error;

mod memory;

pub use memory::{InMemoryInvoiceLedger, LedgerCall};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContractError {
    /// Raw error text from the wallet, provider or a contract revert.
    #[error("{0}")]
    Rejected(String),
    #[error("cannot decode {method} result: {reason}")]
    Decode { method: &'static str, reason: String },
}

pub type ContractResult<T> = Result<T, ContractError>;

/// Read and write methods of the deployed invoice contract.
///
/// Reads that take a `caller` are answered relative to `msg.sender`, so the
/// caller must be the connected account.
#[async_trait(?Send)]
pub trait InvoiceContract {
    fn address(&self) -> &Address;
    async fn owned_invoice_count(&self, owner: &Address) -> ContractResult<u64>;
    async fn received_invoice_count(&self, payer: &Address) -> ContractResult<u64>;
    async fn owned_invoice(&self, caller: &Address, index: u64)
    -> ContractResult<OwnedInvoiceRecord>;
    async fn received_invoice(
        &self,
        caller: &Address,
        index: u64,
    ) -> ContractResult<ReceivedInvoiceRecord>;
    async fn generate_invoice(&self, sender: &Address, invoice: &NewInvoice)
    -> ContractResult<TxReceipt>;
    async fn make_invoice_payment(&self, sender: &Address, index: u64) -> ContractResult<TxReceipt>;
}

/// The stable token invoices are settled in.
#[async_trait(?Send)]
pub trait TokenLedger {
    fn symbol(&self) -> &str;
    async fn balance_of(&self, account: &Address) -> ContractResult<TokenAmount>;
    async fn approve(
        &self,
        owner: &Address,
        spender: &Address,
        amount: TokenAmount,
    ) -> ContractResult<TxReceipt>;
}

#[async_trait(?Send)]
impl<T: InvoiceContract + ?Sized> InvoiceContract for Rc<T> {
    fn address(&self) -> &Address {
        (**self).address()
    }

    async fn owned_invoice_count(&self, owner: &Address) -> ContractResult<u64> {
        (**self).owned_invoice_count(owner).await
    }

    async fn received_invoice_count(&self, payer: &Address) -> ContractResult<u64> {
        (**self).received_invoice_count(payer).await
    }

    async fn owned_invoice(
        &self,
        caller: &Address,
        index: u64,
    ) -> ContractResult<OwnedInvoiceRecord> {
        (**self).owned_invoice(caller, index).await
    }

    async fn received_invoice(
        &self,
        caller: &Address,
        index: u64,
    ) -> ContractResult<ReceivedInvoiceRecord> {
        (**self).received_invoice(caller, index).await
    }

    async fn generate_invoice(
        &self,
        sender: &Address,
        invoice: &NewInvoice,
    ) -> ContractResult<TxReceipt> {
        (**self).generate_invoice(sender, invoice).await
    }

    async fn make_invoice_payment(&self, sender: &Address, index: u64) -> ContractResult<TxReceipt> {
        (**self).make_invoice_payment(sender, index).await
    }
}

#[async_trait(?Send)]
impl<T: TokenLedger + ?Sized> TokenLedger for Rc<T> {
    fn symbol(&self) -> &str {
        (**self).symbol()
    }

    async fn balance_of(&self, account: &Address) -> ContractResult<TokenAmount> {
        (**self).balance_of(account).await
    }

    async fn approve(
        &self,
        owner: &Address,
        spender: &Address,
        amount: TokenAmount,
    ) -> ContractResult<TxReceipt> {
        (**self).approve(owner, spender, amount).await
    }
}
