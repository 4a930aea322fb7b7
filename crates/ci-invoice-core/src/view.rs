//! Output seam between the flows and whatever draws them.
//!
//! The browser front end implements [`InvoiceView`] over the DOM;
//! [`MemoryView`] records everything for tests.

use std::cell::{Cell, RefCell};

use crate::render::Rendered;

pub const LOADING: &str = "⌛ Loading...";
pub const APPROVE_DAPP: &str = "⚠️ Please approve this DApp to use it.";
pub const AWAITING_APPROVAL: &str = "⌛ Waiting for payment approval...";

pub trait InvoiceView {
    /// Show the notification banner with `text`.
    fn notify(&self, text: &str);
    /// Hide the notification banner.
    fn notification_off(&self);
    fn show_invoices(&self, rendered: &Rendered);
    fn show_balance(&self, balance: &str);
}

#[derive(Default)]
pub struct MemoryView {
    notices: RefCell<Vec<String>>,
    banner: Cell<bool>,
    renders: RefCell<Vec<Rendered>>,
    balances: RefCell<Vec<String>>,
}

impl MemoryView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.borrow().clone()
    }

    pub fn last_notice(&self) -> Option<String> {
        self.notices.borrow().last().cloned()
    }

    pub fn banner_visible(&self) -> bool {
        self.banner.get()
    }

    pub fn renders(&self) -> Vec<Rendered> {
        self.renders.borrow().clone()
    }

    pub fn last_render(&self) -> Option<Rendered> {
        self.renders.borrow().last().cloned()
    }

    pub fn balances(&self) -> Vec<String> {
        self.balances.borrow().clone()
    }
}

impl InvoiceView for MemoryView {
    fn notify(&self, text: &str) {
        self.banner.set(true);
        self.notices.borrow_mut().push(text.to_owned());
    }

    fn notification_off(&self) {
        self.banner.set(false);
    }

    fn show_invoices(&self, rendered: &Rendered) {
        self.renders.borrow_mut().push(rendered.clone());
    }

    fn show_balance(&self, balance: &str) {
        self.balances.borrow_mut().push(balance.to_owned());
    }
}
