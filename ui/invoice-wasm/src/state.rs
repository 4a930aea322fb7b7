//! Global application state.
//!
//! Uses `RefCell`-wrapped `thread_local!` storage (WASM is single-threaded).
//! Handlers clone the `Rc`s out before awaiting, so no borrow spans a
//! suspension point.

use ci_invoice_core::Session;
use std::cell::RefCell;
use std::rc::Rc;

use crate::celo::{KitTokenLedger, Web3InvoiceContract};
use crate::dom::DomView;

pub type AppSession = Session<Web3InvoiceContract, KitTokenLedger>;

#[derive(Default)]
pub struct AppState {
    pub view: Option<Rc<DomView>>,
    /// Set once the wallet connected; replaced wholesale on reconnect.
    pub session: Option<Rc<AppSession>>,
}

thread_local! {
    static STATE: RefCell<AppState> = RefCell::new(AppState::default());
}

pub fn with<F, R>(f: F) -> R
where
    F: FnOnce(&AppState) -> R,
{
    STATE.with(|s| f(&s.borrow()))
}

pub fn with_mut<F, R>(f: F) -> R
where
    F: FnOnce(&mut AppState) -> R,
{
    STATE.with(|s| f(&mut s.borrow_mut()))
}

pub fn view() -> Option<Rc<DomView>> {
    with(|s| s.view.clone())
}

pub fn set_view(view: Rc<DomView>) {
    with_mut(|s| s.view = Some(view));
}

pub fn session() -> Option<Rc<AppSession>> {
    with(|s| s.session.clone())
}

pub fn set_session(session: Rc<AppSession>) {
    with_mut(|s| s.session = Some(session));
}
