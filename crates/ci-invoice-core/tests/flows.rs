use async_trait::async_trait;
use ci_api_types::{
    Address, InvoiceItem, InvoiceRole, InvoiceStatus, NewInvoice, OwnedInvoiceRecord,
    ReceivedInvoiceRecord, TokenAmount, TxReceipt,
};
use ci_contract_client::{
    ContractError, ContractResult, InMemoryInvoiceLedger, InvoiceContract, LedgerCall, TokenLedger,
};
use ci_invoice_core::render::NO_INVOICES;
use ci_invoice_core::view::{APPROVE_DAPP, AWAITING_APPROVAL};
use ci_invoice_core::{
    ActionGuard, FlagGuard, InvoiceConfig, InvoiceError, InvoiceForm, MemoryView, Rendered,
    Session, Wallet, connect, create_invoice, fetch_role, load, pay_invoice, refresh_invoices,
};
use std::cell::Cell;
use std::rc::Rc;

const ONE: u128 = 1_000_000_000_000_000_000;

type LedgerSession = Session<Rc<InMemoryInvoiceLedger>, Rc<InMemoryInvoiceLedger>>;

struct LedgerWallet {
    ledger: Rc<InMemoryInvoiceLedger>,
    account: Address,
    denial: Option<String>,
}

#[async_trait(?Send)]
impl Wallet for LedgerWallet {
    type Contract = Rc<InMemoryInvoiceLedger>;
    type Token = Rc<InMemoryInvoiceLedger>;

    async fn enable(&self) -> ContractResult<()> {
        match &self.denial {
            Some(message) => Err(ContractError::Rejected(message.clone())),
            None => Ok(()),
        }
    }

    async fn default_account(&self) -> ContractResult<Address> {
        Ok(self.account.clone())
    }

    fn invoice_contract(&self, _config: &InvoiceConfig) -> ContractResult<Self::Contract> {
        Ok(Rc::clone(&self.ledger))
    }

    fn token_ledger(&self, _config: &InvoiceConfig) -> ContractResult<Self::Token> {
        Ok(Rc::clone(&self.ledger))
    }
}

fn me() -> Address {
    Address::new("0x1111111111111111111111111111111111111111")
}

fn vendor() -> Address {
    Address::new("0x2222222222222222222222222222222222222222")
}

fn ledger() -> Rc<InMemoryInvoiceLedger> {
    let config = InvoiceConfig::default();
    Rc::new(InMemoryInvoiceLedger::new(
        config.invoice_contract,
        config.stable_token,
    ))
}

fn wallet_for(ledger: &Rc<InMemoryInvoiceLedger>, account: Address) -> LedgerWallet {
    LedgerWallet {
        ledger: Rc::clone(ledger),
        account,
        denial: None,
    }
}

fn invoice_to(payer: &Address, name: &str, total: u128) -> NewInvoice {
    NewInvoice {
        number: name.to_uppercase(),
        name: name.to_owned(),
        description: format!("{name} services"),
        items: vec![InvoiceItem {
            name: name.to_owned(),
            price: TokenAmount(total),
        }],
        total: TokenAmount(total),
        payer: payer.clone(),
        date_due: 1_704_067_200,
    }
}

async fn connected(ledger: &Rc<InMemoryInvoiceLedger>, view: &MemoryView) -> LedgerSession {
    let wallet = wallet_for(ledger, me());
    connect(Some(&wallet), InvoiceConfig::default(), view)
        .await
        .expect("wallet connects")
}

#[tokio::test]
async fn missing_wallet_blocks_the_session() {
    let view = MemoryView::new();
    let result = connect::<LedgerWallet>(None, InvoiceConfig::default(), &view).await;

    assert!(matches!(result, Err(InvoiceError::WalletAbsent)));
    assert_eq!(
        view.notices(),
        vec!["⚠️ Please install the CeloExtensionWallet.".to_owned()]
    );
    assert!(view.banner_visible());
}

#[tokio::test]
async fn denied_authorization_surfaces_raw_error() {
    let ledger = ledger();
    let wallet = LedgerWallet {
        denial: Some("User rejected the request".to_owned()),
        ..wallet_for(&ledger, me())
    };
    let view = MemoryView::new();

    let result = connect(Some(&wallet), InvoiceConfig::default(), &view).await;

    assert!(matches!(
        result,
        Err(InvoiceError::WalletAuthorization(ref message)) if message == "User rejected the request"
    ));
    assert_eq!(
        view.notices(),
        vec![
            APPROVE_DAPP.to_owned(),
            "⚠️ User rejected the request.".to_owned()
        ]
    );
    assert!(ledger.calls().is_empty());
}

#[tokio::test]
async fn empty_account_loads_to_placeholder() -> anyhow::Result<()> {
    let ledger = ledger();
    ledger.mint(&me(), TokenAmount(12 * ONE + ONE / 2));
    let view = MemoryView::new();
    let session = connected(&ledger, &view).await;

    load(&session, &view).await?;

    assert!(session.invoices().is_empty());
    assert_eq!(view.last_render(), Some(Rendered::Empty(NO_INVOICES)));
    assert_eq!(view.balances(), vec!["12.50".to_owned()]);
    assert_eq!(session.balance(), Some(TokenAmount(12 * ONE + ONE / 2)));
    assert!(!view.banner_visible());
    Ok(())
}

#[tokio::test]
async fn owned_invoices_come_before_received() -> anyhow::Result<()> {
    let ledger = ledger();
    ledger.generate_invoice(&me(), &invoice_to(&vendor(), "first", ONE)).await?;
    ledger.generate_invoice(&vendor(), &invoice_to(&me(), "incoming", 2 * ONE)).await?;
    ledger.generate_invoice(&me(), &invoice_to(&vendor(), "second", 3 * ONE)).await?;

    let view = MemoryView::new();
    let session = connected(&ledger, &view).await;
    load(&session, &view).await?;

    let invoices: Vec<_> = session
        .invoices()
        .iter()
        .map(|invoice| (invoice.role, invoice.index, invoice.name.clone()))
        .collect();
    assert_eq!(
        invoices,
        vec![
            (InvoiceRole::Owned, 0, "first".to_owned()),
            (InvoiceRole::Owned, 1, "second".to_owned()),
            (InvoiceRole::Received, 0, "incoming".to_owned()),
        ]
    );

    let Some(Rendered::Cards(cards)) = view.last_render() else {
        panic!("expected cards");
    };
    assert_eq!(cards.len(), 3);
    assert!(cards[0].pay.is_none());
    assert_eq!(cards[2].pay.as_ref().map(|pay| pay.position), Some(2));
    Ok(())
}

#[tokio::test]
async fn read_failure_during_load_is_reported() {
    let ledger = ledger();
    let view = MemoryView::new();
    let session = connected(&ledger, &view).await;
    ledger.fail_next(LedgerCall::OwnedCount, "Invalid JSON RPC response");

    let err = load(&session, &view).await.unwrap_err();

    assert_eq!(
        err,
        InvoiceError::Read(ContractError::Rejected("Invalid JSON RPC response".to_owned()))
    );
    assert_eq!(
        view.last_notice().as_deref(),
        Some("⚠️ Invalid JSON RPC response.")
    );
    assert!(view.renders().is_empty());
}

fn catering_form(payer: &Address) -> InvoiceForm {
    InvoiceForm::from_entries([
        ("number", "INV-7"),
        ("name", "Catering"),
        ("description", "Team lunch"),
        ("itemNames[]", "Soup"),
        ("itemPrices[]", "1.50"),
        ("itemNames[]", "Bread"),
        ("itemPrices[]", "2.25"),
        ("total", "3.75"),
        ("payer", payer.as_str()),
        ("dueDate", "2024-01-01"),
    ])
}

#[tokio::test]
async fn created_invoice_is_submitted_in_smallest_units() -> anyhow::Result<()> {
    let ledger = ledger();
    let view = MemoryView::new();
    let session = connected(&ledger, &view).await;

    create_invoice(&session, &catering_form(&vendor()), &view).await?;

    let stored = ledger.owned_invoice(&me(), 0).await?;
    assert_eq!(stored.items[0].price, TokenAmount(ONE + ONE / 2));
    assert_eq!(stored.items[1].price, TokenAmount(2 * ONE + ONE / 4));
    assert_eq!(stored.total, TokenAmount(3 * ONE + 3 * ONE / 4));
    assert_eq!(stored.date_due, 1_704_067_200);

    let notices = view.notices();
    assert!(notices.contains(&"⌛ Adding \"Catering\"...".to_owned()));
    assert!(notices.contains(&"🎉 You successfully added \"Catering\".".to_owned()));

    assert_eq!(session.invoices().len(), 1);
    let Some(Rendered::Cards(cards)) = view.last_render() else {
        panic!("expected cards");
    };
    assert_eq!(cards[0].status_label, "PENDING");
    assert_eq!(cards[0].total, "3.75");
    assert_eq!(view.balances().len(), 1);
    Ok(())
}

#[tokio::test]
async fn failed_creation_still_refreshes() {
    let ledger = ledger();
    let view = MemoryView::new();
    let session = connected(&ledger, &view).await;

    let err = create_invoice(&session, &catering_form(&me()), &view)
        .await
        .unwrap_err();

    assert!(matches!(err, InvoiceError::Write(_)));
    assert!(
        view.notices()
            .contains(&"⚠️ execution reverted: cannot invoice yourself.".to_owned())
    );
    assert_eq!(ledger.call_count(LedgerCall::OwnedCount), 1);
    assert_eq!(ledger.call_count(LedgerCall::ReceivedCount), 1);
    assert_eq!(ledger.call_count(LedgerCall::BalanceOf), 1);
    assert_eq!(view.last_render(), Some(Rendered::Empty(NO_INVOICES)));
}

#[tokio::test]
async fn invalid_form_never_reaches_the_contract() {
    let ledger = ledger();
    let view = MemoryView::new();
    let session = connected(&ledger, &view).await;
    let form = InvoiceForm::from_entries([("name", "Broken"), ("total", "abc")]);

    let err = create_invoice(&session, &form, &view).await.unwrap_err();

    assert!(matches!(err, InvoiceError::Amount(_)));
    assert_eq!(ledger.call_count(LedgerCall::GenerateInvoice), 0);
    assert_eq!(ledger.call_count(LedgerCall::OwnedCount), 1);
}

async fn session_owing_vendor(
    ledger: &Rc<InMemoryInvoiceLedger>,
    view: &MemoryView,
) -> anyhow::Result<LedgerSession> {
    ledger.mint(&me(), TokenAmount(10 * ONE));
    ledger.generate_invoice(&me(), &invoice_to(&vendor(), "outgoing", ONE)).await?;
    ledger.generate_invoice(&vendor(), &invoice_to(&me(), "hosting", 2 * ONE)).await?;
    ledger.generate_invoice(&vendor(), &invoice_to(&me(), "support", 3 * ONE)).await?;

    let session = connected(ledger, view).await;
    load(&session, view).await?;
    Ok(session)
}

#[tokio::test]
async fn payment_approves_then_pays_the_per_role_index() -> anyhow::Result<()> {
    let ledger = ledger();
    let view = MemoryView::new();
    let session = session_owing_vendor(&ledger, &view).await?;
    let guard = FlagGuard::new();

    // Position 2 is the payer's second received invoice ("support", id 2).
    pay_invoice(&session, 2, &guard, &view).await?;

    assert_eq!(ledger.invoice_status(2), Some(InvoiceStatus::Paid));
    assert_eq!(ledger.invoice_status(1), Some(InvoiceStatus::Pending));
    assert_eq!(ledger.balance(&me()), TokenAmount(7 * ONE));
    assert_eq!(ledger.balance(&vendor()), TokenAmount(3 * ONE));
    assert_eq!(guard.transitions(), vec![true, false]);

    let notices = view.notices();
    let approval = notices.iter().position(|n| n == AWAITING_APPROVAL);
    let awaiting = notices
        .iter()
        .position(|n| n == "⌛ Awaiting payment for \"support\"...");
    assert!(approval.is_some() && approval < awaiting);
    assert_eq!(
        view.last_notice().as_deref(),
        Some("🎉 You successfully paid \"support\".")
    );

    let Some(Rendered::Cards(cards)) = view.last_render() else {
        panic!("expected cards");
    };
    assert_eq!(cards[2].status_label, "PAID");
    assert_eq!(cards[2].pay.as_ref().map(|pay| pay.enabled), Some(false));
    assert_eq!(view.balances().last().map(String::as_str), Some("7.00"));
    Ok(())
}

#[tokio::test]
async fn failed_approval_skips_payment_and_restores_the_control() -> anyhow::Result<()> {
    let ledger = ledger();
    let view = MemoryView::new();
    let session = session_owing_vendor(&ledger, &view).await?;
    let guard = FlagGuard::new();
    let counts_before = ledger.call_count(LedgerCall::OwnedCount);
    ledger.fail_next(LedgerCall::Approve, "User denied transaction signature");

    let err = pay_invoice(&session, 1, &guard, &view).await.unwrap_err();

    assert_eq!(
        err,
        InvoiceError::Write(ContractError::Rejected(
            "User denied transaction signature".to_owned()
        ))
    );
    assert_eq!(ledger.call_count(LedgerCall::MakePayment), 0);
    assert_eq!(guard.transitions(), vec![true, false]);
    assert!(!guard.is_disabled());
    assert_eq!(ledger.call_count(LedgerCall::OwnedCount), counts_before + 1);
    assert!(
        view.notices()
            .contains(&"⚠️ User denied transaction signature.".to_owned())
    );
    Ok(())
}

#[tokio::test]
async fn failed_payment_after_approval_still_refreshes() -> anyhow::Result<()> {
    let ledger = ledger();
    let view = MemoryView::new();
    let session = session_owing_vendor(&ledger, &view).await?;
    let guard = FlagGuard::new();
    let renders_before = view.renders().len();
    ledger.fail_next(LedgerCall::MakePayment, "execution reverted");

    let err = pay_invoice(&session, 1, &guard, &view).await.unwrap_err();

    assert!(matches!(err, InvoiceError::Write(_)));
    assert_eq!(ledger.call_count(LedgerCall::Approve), 1);
    assert_eq!(ledger.invoice_status(1), Some(InvoiceStatus::Pending));
    assert_eq!(guard.transitions(), vec![true, false]);
    assert_eq!(view.renders().len(), renders_before + 1);
    Ok(())
}

#[tokio::test]
async fn payments_are_refused_before_any_transaction() -> anyhow::Result<()> {
    let ledger = ledger();
    let view = MemoryView::new();
    let session = session_owing_vendor(&ledger, &view).await?;
    let guard = FlagGuard::new();

    assert_eq!(
        pay_invoice(&session, 0, &guard, &view).await,
        Err(InvoiceError::NotPayer)
    );
    assert_eq!(
        pay_invoice(&session, 9, &guard, &view).await,
        Err(InvoiceError::UnknownInvoice(9))
    );

    guard.disable();
    assert_eq!(
        pay_invoice(&session, 1, &guard, &view).await,
        Err(InvoiceError::PaymentInProgress)
    );

    assert_eq!(ledger.call_count(LedgerCall::Approve), 0);
    assert_eq!(ledger.call_count(LedgerCall::MakePayment), 0);
    Ok(())
}

#[tokio::test]
async fn paid_invoices_cannot_be_paid_again() -> anyhow::Result<()> {
    let ledger = ledger();
    let view = MemoryView::new();
    let session = session_owing_vendor(&ledger, &view).await?;
    let guard = FlagGuard::new();

    pay_invoice(&session, 1, &guard, &view).await?;
    assert_eq!(
        pay_invoice(&session, 1, &guard, &view).await,
        Err(InvoiceError::AlreadyPaid)
    );
    assert_eq!(ledger.call_count(LedgerCall::MakePayment), 1);
    Ok(())
}

/// Counts reads in flight around an await point.
struct InFlightCounter {
    inner: InMemoryInvoiceLedger,
    in_flight: Cell<usize>,
    peak: Cell<usize>,
}

impl InFlightCounter {
    async fn track<R>(&self, read: impl std::future::Future<Output = R>) -> R {
        self.in_flight.set(self.in_flight.get() + 1);
        self.peak.set(self.peak.get().max(self.in_flight.get()));
        tokio::task::yield_now().await;
        let result = read.await;
        self.in_flight.set(self.in_flight.get() - 1);
        result
    }
}

#[async_trait(?Send)]
impl InvoiceContract for InFlightCounter {
    fn address(&self) -> &Address {
        self.inner.address()
    }

    async fn owned_invoice_count(&self, owner: &Address) -> ContractResult<u64> {
        self.inner.owned_invoice_count(owner).await
    }

    async fn received_invoice_count(&self, payer: &Address) -> ContractResult<u64> {
        self.inner.received_invoice_count(payer).await
    }

    async fn owned_invoice(
        &self,
        caller: &Address,
        index: u64,
    ) -> ContractResult<OwnedInvoiceRecord> {
        self.track(self.inner.owned_invoice(caller, index)).await
    }

    async fn received_invoice(
        &self,
        caller: &Address,
        index: u64,
    ) -> ContractResult<ReceivedInvoiceRecord> {
        self.track(self.inner.received_invoice(caller, index)).await
    }

    async fn generate_invoice(
        &self,
        sender: &Address,
        invoice: &NewInvoice,
    ) -> ContractResult<TxReceipt> {
        self.inner.generate_invoice(sender, invoice).await
    }

    async fn make_invoice_payment(&self, sender: &Address, index: u64) -> ContractResult<TxReceipt> {
        self.inner.make_invoice_payment(sender, index).await
    }
}

#[tokio::test]
async fn concurrent_reads_stay_within_the_limit() -> anyhow::Result<()> {
    let counter = InFlightCounter {
        inner: InMemoryInvoiceLedger::new(Address::new("0xc"), Address::new("0xt")),
        in_flight: Cell::new(0),
        peak: Cell::new(0),
    };
    for n in 0..10 {
        counter
            .generate_invoice(&me(), &invoice_to(&vendor(), &format!("bulk-{n}"), ONE))
            .await?;
    }

    let batch = fetch_role(&counter, &me(), InvoiceRole::Owned, 3).await?;

    assert_eq!(batch.len(), 10);
    assert!(batch.iter().enumerate().all(|(i, invoice)| invoice.index == i as u64));
    assert_eq!(counter.peak.get(), 3);
    assert_eq!(counter.in_flight.get(), 0);
    Ok(())
}

#[tokio::test]
async fn token_symbol_comes_from_the_ledger() {
    let ledger = ledger();
    assert_eq!(TokenLedger::symbol(&ledger), "cUSD");
}

#[tokio::test]
async fn declined_invoices_keep_their_status_name() -> anyhow::Result<()> {
    let ledger = ledger();
    ledger.generate_invoice(&vendor(), &invoice_to(&me(), "refused", ONE)).await?;
    ledger.set_status(0, InvoiceStatus::Declined);

    let view = MemoryView::new();
    let session = connected(&ledger, &view).await;
    load(&session, &view).await?;

    let Some(Rendered::Cards(cards)) = view.last_render() else {
        panic!("expected cards");
    };
    assert_eq!(cards[0].status_label, "DECLINED");
    Ok(())
}

#[tokio::test]
async fn failed_refresh_draws_the_empty_message() -> anyhow::Result<()> {
    let ledger = ledger();
    let view = MemoryView::new();
    let session = session_owing_vendor(&ledger, &view).await?;
    ledger.fail_next(LedgerCall::ReceivedCount, "connection reset");

    let err = create_invoice(&session, &catering_form(&vendor()), &view)
        .await
        .unwrap_err();

    assert_eq!(
        err,
        InvoiceError::Read(ContractError::Rejected("connection reset".to_owned()))
    );
    assert!(session.invoices().is_empty());
    assert_eq!(view.last_render(), Some(Rendered::Empty(NO_INVOICES)));
    assert_eq!(
        view.last_notice().as_deref(),
        Some("⚠️ connection reset.")
    );
    Ok(())
}

/// Returns an out-of-range status code at one owned index.
struct CorruptStatus {
    inner: InMemoryInvoiceLedger,
    corrupt_index: Cell<Option<u64>>,
}

#[async_trait(?Send)]
impl InvoiceContract for CorruptStatus {
    fn address(&self) -> &Address {
        self.inner.address()
    }

    async fn owned_invoice_count(&self, owner: &Address) -> ContractResult<u64> {
        self.inner.owned_invoice_count(owner).await
    }

    async fn received_invoice_count(&self, payer: &Address) -> ContractResult<u64> {
        self.inner.received_invoice_count(payer).await
    }

    async fn owned_invoice(
        &self,
        caller: &Address,
        index: u64,
    ) -> ContractResult<OwnedInvoiceRecord> {
        let mut record = self.inner.owned_invoice(caller, index).await?;
        if self.corrupt_index.get() == Some(index) {
            record.status = 9;
        }
        Ok(record)
    }

    async fn received_invoice(
        &self,
        caller: &Address,
        index: u64,
    ) -> ContractResult<ReceivedInvoiceRecord> {
        self.inner.received_invoice(caller, index).await
    }

    async fn generate_invoice(
        &self,
        sender: &Address,
        invoice: &NewInvoice,
    ) -> ContractResult<TxReceipt> {
        self.inner.generate_invoice(sender, invoice).await
    }

    async fn make_invoice_payment(&self, sender: &Address, index: u64) -> ContractResult<TxReceipt> {
        self.inner.make_invoice_payment(sender, index).await
    }
}

#[tokio::test]
async fn unknown_status_rejects_the_whole_batch() -> anyhow::Result<()> {
    let contract = CorruptStatus {
        inner: InMemoryInvoiceLedger::new(Address::new("0xc"), Address::new("0xt")),
        corrupt_index: Cell::new(None),
    };
    for n in 0..3 {
        contract
            .generate_invoice(&me(), &invoice_to(&vendor(), &format!("batch-{n}"), ONE))
            .await?;
    }
    let session = Session::new(InvoiceConfig::default(), me(), contract, ());
    refresh_invoices(&session).await?;
    assert_eq!(session.invoices().len(), 3);

    session.contract().corrupt_index.set(Some(1));

    let err = fetch_role(session.contract(), &me(), InvoiceRole::Owned, 2)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        InvoiceError::Read(ContractError::Decode { method: "getOwnedInvoices", ref reason })
            if reason.contains('9')
    ));

    assert!(refresh_invoices(&session).await.is_err());
    assert!(session.invoices().is_empty());
    Ok(())
}
