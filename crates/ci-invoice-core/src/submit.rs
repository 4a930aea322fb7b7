//! Write flows: create an invoice, approve and pay one.
//!
//! Both flows end with a full refresh whatever the outcome of the
//! transaction.

use ci_api_types::{Invoice, InvoiceRole, TxReceipt};
use ci_contract_client::{InvoiceContract, TokenLedger};
use std::cell::{Cell, RefCell};
use tracing::{debug, error, info, warn};

use crate::error::{InvoiceError, failure_message};
use crate::form::InvoiceForm;
use crate::load::refresh_all;
use crate::session::Session;
use crate::view::{AWAITING_APPROVAL, InvoiceView};

/// The control that started a payment; disabled while the payment runs.
pub trait ActionGuard {
    fn disable(&self);
    fn enable(&self);
    fn is_disabled(&self) -> bool;
}

/// Guard backed by a flag, recording every transition.
#[derive(Default)]
pub struct FlagGuard {
    disabled: Cell<bool>,
    transitions: RefCell<Vec<bool>>,
}

impl FlagGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` for each disable, `false` for each enable.
    pub fn transitions(&self) -> Vec<bool> {
        self.transitions.borrow().clone()
    }
}

impl ActionGuard for FlagGuard {
    fn disable(&self) {
        self.disabled.set(true);
        self.transitions.borrow_mut().push(true);
    }

    fn enable(&self) {
        self.disabled.set(false);
        self.transitions.borrow_mut().push(false);
    }

    fn is_disabled(&self) -> bool {
        self.disabled.get()
    }
}

pub async fn create_invoice<C, T>(
    session: &Session<C, T>,
    form: &InvoiceForm,
    view: &dyn InvoiceView,
) -> Result<TxReceipt, InvoiceError>
where
    C: InvoiceContract,
    T: TokenLedger,
{
    let name = form.name().to_owned();
    view.notify(&format!("⌛ Adding \"{name}\"..."));

    let outcome = submit_new_invoice(session, form).await;
    match &outcome {
        Ok(receipt) => {
            info!(tx = %receipt.tx_hash, name = %name, "invoice created");
            view.notify(&format!("🎉 You successfully added \"{name}\"."));
        }
        Err(err) => {
            warn!(error = %err, name = %name, "invoice creation failed");
            view.notify(&failure_message(err));
        }
    }

    let refreshed = refresh_all(session, view).await;
    settle(outcome, refreshed, view)
}

async fn submit_new_invoice<C, T>(
    session: &Session<C, T>,
    form: &InvoiceForm,
) -> Result<TxReceipt, InvoiceError>
where
    C: InvoiceContract,
{
    let invoice = form.to_new_invoice(session.config().token_decimals)?;
    session
        .contract()
        .generate_invoice(session.account(), &invoice)
        .await
        .map_err(InvoiceError::Write)
}

/// Approve exactly the invoice total, then pay it.
///
/// `position` is the card's position in the session collection; the contract
/// is sent the invoice's own index in the payer's list.
pub async fn pay_invoice<C, T>(
    session: &Session<C, T>,
    position: usize,
    guard: &dyn ActionGuard,
    view: &dyn InvoiceView,
) -> Result<TxReceipt, InvoiceError>
where
    C: InvoiceContract,
    T: TokenLedger,
{
    if guard.is_disabled() {
        debug!(position, "payment already running");
        return Err(InvoiceError::PaymentInProgress);
    }

    let invoice = match payable_invoice(session, position) {
        Ok(invoice) => invoice,
        Err(err) => {
            view.notify(&failure_message(&err));
            return Err(err);
        }
    };

    view.notify(AWAITING_APPROVAL);
    guard.disable();
    let outcome = approve_and_pay(session, &invoice, view).await;
    guard.enable();

    match &outcome {
        Ok(receipt) => {
            info!(tx = %receipt.tx_hash, index = invoice.index, "invoice paid");
            view.notify(&format!("🎉 You successfully paid \"{}\".", invoice.name));
        }
        Err(err) => {
            warn!(error = %err, index = invoice.index, "invoice payment failed");
            view.notify(&failure_message(err));
        }
    }

    let refreshed = refresh_all(session, view).await;
    settle(outcome, refreshed, view)
}

fn payable_invoice<C, T>(session: &Session<C, T>, position: usize) -> Result<Invoice, InvoiceError> {
    let invoice = session
        .invoice_at(position)
        .ok_or(InvoiceError::UnknownInvoice(position))?;
    if invoice.role != InvoiceRole::Received || !invoice.payer.same_as(session.account()) {
        return Err(InvoiceError::NotPayer);
    }
    if invoice.is_paid() {
        return Err(InvoiceError::AlreadyPaid);
    }
    Ok(invoice)
}

async fn approve_and_pay<C, T>(
    session: &Session<C, T>,
    invoice: &Invoice,
    view: &dyn InvoiceView,
) -> Result<TxReceipt, InvoiceError>
where
    C: InvoiceContract,
    T: TokenLedger,
{
    let approval = session
        .token()
        .approve(session.account(), session.contract().address(), invoice.total)
        .await
        .map_err(InvoiceError::Write)?;
    debug!(tx = %approval.tx_hash, amount = %invoice.total, "allowance approved");

    view.notify(&format!("⌛ Awaiting payment for \"{}\"...", invoice.name));
    session
        .contract()
        .make_invoice_payment(session.account(), invoice.index)
        .await
        .map_err(InvoiceError::Write)
}

/// The transaction's error wins; a refresh failure after a successful
/// transaction is shown and returned.
fn settle<R>(
    outcome: Result<R, InvoiceError>,
    refreshed: Result<(), InvoiceError>,
    view: &dyn InvoiceView,
) -> Result<R, InvoiceError> {
    match (outcome, refreshed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(refresh_err)) => {
            error!(error = %refresh_err, "refresh after transaction failed");
            view.notify(&failure_message(&refresh_err));
            Err(refresh_err)
        }
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(refresh_err)) => {
            error!(error = %refresh_err, "refresh after failed transaction failed");
            Err(err)
        }
    }
}
