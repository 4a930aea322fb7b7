//! Event binding.
//!
//! Form submission and pay clicks spawn their flow with
//! `wasm_bindgen_futures::spawn_local`; item-row edits are synchronous.

use ci_invoice_core::{InvoiceForm, create_invoice, pay_invoice};
use tracing::{debug, warn};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, Event};

use crate::dom::{self, ButtonGuard, Elements};
use crate::state;

/// Attach a handler for `$event` on `$el`, leaking the closure for the page's
/// lifetime.
macro_rules! listen {
    ($el:expr, $event:expr, $cb:expr) => {{
        let cb = Closure::wrap(Box::new($cb) as Box<dyn FnMut(Event)>);
        $el.add_event_listener_with_callback($event, cb.as_ref().unchecked_ref())?;
        cb.forget();
    }};
}

fn target_element(event: &Event) -> Option<Element> {
    event.target()?.dyn_into::<Element>().ok()
}

/// Bind all UI event listeners. Call once after init.
pub fn bind_events(els: &Elements) -> Result<(), JsValue> {
    // ── New invoice form ──
    {
        let form = els.invoice_form.clone();
        listen!(els.invoice_form, "submit", move |e: Event| {
            e.prevent_default();
            e.stop_propagation();
            let entries = match dom::form_entries(&form) {
                Ok(entries) => entries,
                Err(err) => {
                    warn!(error = ?err, "cannot read invoice form");
                    return;
                }
            };
            wasm_bindgen_futures::spawn_local(on_submit_invoice(InvoiceForm::from_entries(entries)));
        });
    }

    // ── Pay buttons (delegated: cards are re-rendered on every refresh) ──
    listen!(els.invoice_container, "click", move |e: Event| {
        let Some(target) = target_element(&e) else {
            return;
        };
        if !dom::has_class(&target, "payBtn") {
            return;
        }
        e.prevent_default();
        let position = target
            .get_attribute("data-position")
            .and_then(|p| p.parse::<usize>().ok());
        match position {
            Some(position) => {
                wasm_bindgen_futures::spawn_local(on_pay(position, ButtonGuard(target)));
            }
            None => warn!("pay button without a position"),
        }
    });

    // ── Item rows ──
    {
        let els2 = els.clone();
        listen!(els.add_item_btn, "click", move |e: Event| {
            e.stop_propagation();
            if let Err(err) = dom::add_item_row(&els2) {
                warn!(error = ?err, "cannot add item row");
            }
        });
    }
    listen!(els.item_wrapper, "click", move |e: Event| {
        if let Some(target) = target_element(&e).filter(|t| dom::has_class(t, "btn-close")) {
            e.prevent_default();
            dom::remove_item_row(&target);
        }
    });

    Ok(())
}

async fn on_submit_invoice(form: InvoiceForm) {
    let (Some(session), Some(view)) = (state::session(), state::view()) else {
        warn!("invoice submitted without a connected wallet");
        return;
    };
    if let Err(err) = create_invoice(&session, &form, &*view).await {
        debug!(error = %err, "create flow ended with an error");
    }
}

async fn on_pay(position: usize, guard: ButtonGuard) {
    let (Some(session), Some(view)) = (state::session(), state::view()) else {
        warn!(position, "pay clicked without a connected wallet");
        return;
    };
    if let Err(err) = pay_invoice(&session, position, &guard, &*view).await {
        debug!(error = %err, position, "pay flow ended with an error");
    }
}
