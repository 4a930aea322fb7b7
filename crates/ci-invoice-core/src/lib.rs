//! Orchestration for the Celo invoice front end.
//!
//! Connect a wallet into a [`Session`], aggregate the account's owned and
//! received invoices, render them into cards and run the create / pay flows.
//! Nothing here touches the DOM: output goes through [`InvoiceView`] and the
//! chain through the `ci-contract-client` traits.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod form;
pub mod load;
pub mod render;
pub mod session;
pub mod submit;
pub mod view;
pub mod wallet;

pub use aggregate::{fetch_collection, fetch_role, read_balance, refresh_invoices};
pub use config::InvoiceConfig;
pub use error::{InvoiceError, failure_message};
pub use form::{InvoiceForm, parse_due_date};
pub use load::{load, redraw, refresh_all};
pub use render::{InvoiceCard, PayAction, Rendered, card_html, render_invoices, status_label};
pub use session::{InvoiceCollection, Session};
pub use submit::{ActionGuard, FlagGuard, create_invoice, pay_invoice};
pub use view::{InvoiceView, MemoryView};
pub use wallet::{Wallet, connect};
