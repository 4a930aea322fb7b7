//! Pure rendering of the invoice collection into card fragments.

use chrono::DateTime;
use ci_api_types::{Address, Invoice, InvoiceStatus};
use std::fmt::Write as _;

use crate::config::InvoiceConfig;
use crate::session::InvoiceCollection;

pub const NO_INVOICES: &str = "No invoice created yet";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemLine {
    pub name: String,
    pub price: String,
}

/// The pay control; only present on cards the viewer has to pay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayAction {
    /// Collection position of the invoice, carried back by the click handler.
    pub position: usize,
    pub label: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceCard {
    pub position: usize,
    pub number: String,
    pub name: String,
    pub description: String,
    pub total: String,
    pub symbol: String,
    pub items: Vec<ItemLine>,
    pub status_label: &'static str,
    pub issuer: Address,
    pub payer: Address,
    pub viewer: Address,
    pub due: String,
    pub pay: Option<PayAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    Empty(&'static str),
    Cards(Vec<InvoiceCard>),
}

/// Status text as the viewer should read it.
///
/// A paid invoice reads "RECEIVED" to its issuer and "PAID" to anyone else.
pub fn status_label(invoice: &Invoice, viewer: &Address) -> &'static str {
    match invoice.status {
        InvoiceStatus::Paid if invoice.owner.same_as(viewer) => "RECEIVED",
        status => status.name(),
    }
}

pub fn render_invoices(
    collection: &InvoiceCollection,
    viewer: &Address,
    config: &InvoiceConfig,
) -> Rendered {
    if collection.is_empty() {
        return Rendered::Empty(NO_INVOICES);
    }

    Rendered::Cards(
        collection
            .iter()
            .enumerate()
            .map(|(position, invoice)| render_card(position, invoice, viewer, config))
            .collect(),
    )
}

pub fn render_card(
    position: usize,
    invoice: &Invoice,
    viewer: &Address,
    config: &InvoiceConfig,
) -> InvoiceCard {
    let decimals = config.token_decimals;
    let total = invoice.total.to_display(decimals);

    let pay = invoice.payer.same_as(viewer).then(|| {
        let paid = invoice.is_paid();
        PayAction {
            position,
            label: format!(
                "{} {} {}",
                if paid { "PAID" } else { "PAY" },
                total,
                config.token_symbol
            ),
            enabled: !paid,
        }
    });

    InvoiceCard {
        position,
        number: invoice.number.clone(),
        name: invoice.name.clone(),
        description: invoice.description.clone(),
        total,
        symbol: config.token_symbol.clone(),
        items: invoice
            .items
            .iter()
            .map(|item| ItemLine {
                name: item.name.clone(),
                price: item.price.to_display(decimals),
            })
            .collect(),
        status_label: status_label(invoice, viewer),
        issuer: invoice.owner.clone(),
        payer: invoice.payer.clone(),
        viewer: viewer.clone(),
        due: format_due(invoice.date_due),
        pay,
    }
}

fn format_due(timestamp: i64) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|due| due.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn items_html(card: &InvoiceCard) -> String {
    let mut list = String::from(r#"<li><h6 class="dropdown-header">Items list</h6></li>"#);
    for item in &card.items {
        let _ = write!(
            list,
            r#"<li class="d-flex justify-content-between align-items-center"><a class="dropdown-item">{} <span class="text-muted">({} {})</span></a></li>"#,
            escape_html(&item.name),
            item.price,
            escape_html(&card.symbol),
        );
    }
    format!(r#"<ul class="dropdown-menu dropend">{list}</ul>"#)
}

/// HTML for one card; contract-supplied text is escaped.
pub fn card_html(card: &InvoiceCard, config: &InvoiceConfig) -> String {
    let symbol = escape_html(&card.symbol);
    let footer = match &card.pay {
        Some(pay) => format!(
            r#"<div class="d-grid gap-2">
          <a class="btn btn-lg btn-outline-dark payBtn fs-6 p-3{}" data-position="{}">{}</a>
        </div>"#,
            if pay.enabled { "" } else { " disabled" },
            pay.position,
            escape_html(&pay.label),
        ),
        None => format!("<p>Payer: {}</p>", escape_html(card.payer.as_str())),
    };

    format!(
        r#"
    <div class="card mb-4">
      <div class="position-absolute top-0 start-2 bg-warning mt-4 px-2 py-1 rounded-end">
        <button type="button" class="btn btn-ghost dropdown-toggle" data-bs-toggle="dropdown">{item_count} Item(s)</button>
        {items}
      </div>
      <div class="position-absolute top-0 end-0 bg-warning mt-4 px-2 py-1 rounded-start">
        {total} {symbol}
      </div>
      <div class="card-body text-left p-4 position-relative">
        <a class="small text-muted" href="{explorer}" target="_blank">{viewer}</a>
        <h2 class="card-title fs-4 fw-bold mt-2">{name}</h2>
        <p class="card-text mb-4" style="min-height: 82px">{description}</p>
        <p class="card-text mt-4">
          <i class="bi bi-geo-alt-fill"></i>
          <span>{status}</span>
        </p>
        <p>#{number} &middot; Due: {due}</p>
        <p>Issuer: {issuer}</p>
        {footer}
      </div>
    </div>
  "#,
        item_count = card.items.len(),
        items = items_html(card),
        total = card.total,
        symbol = symbol,
        explorer = escape_html(&config.explorer_address_url(&card.viewer)),
        viewer = escape_html(card.viewer.as_str()),
        name = escape_html(&card.name),
        description = escape_html(&card.description),
        status = card.status_label,
        number = escape_html(&card.number),
        due = card.due,
        issuer = escape_html(card.issuer.as_str()),
        footer = footer,
    )
}
