//! DOM element bindings.
//!
//! All fields are resolved once at startup. The notification banner, balance
//! and card container are driven through [`DomView`].

use ci_invoice_core::{ActionGuard, InvoiceConfig, InvoiceView, Rendered, card_html};
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, FormData, HtmlElement, HtmlFormElement};

// ── Helpers ──

fn doc() -> Result<Document, JsValue> {
    web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))
}

pub fn by_id(id: &str) -> Option<Element> {
    doc().ok()?.get_element_by_id(id)
}

pub fn query(selector: &str) -> Option<Element> {
    doc().ok()?.query_selector(selector).ok()?
}

pub fn set_text(el: &Element, text: &str) {
    el.set_text_content(Some(text));
}

pub fn add_class(el: &Element, cls: &str) {
    let _ = el.class_list().add_1(cls);
}

pub fn remove_class(el: &Element, cls: &str) {
    let _ = el.class_list().remove_1(cls);
}

pub fn has_class(el: &Element, cls: &str) -> bool {
    el.class_list().contains(cls)
}

pub fn create_element(tag: &str) -> Result<Element, JsValue> {
    doc()?.create_element(tag)
}

fn set_display(el: &HtmlElement, value: &str) {
    let _ = el.style().set_property("display", value);
}

/// Every `name`/`value` pair of the form, in document order.
pub fn form_entries(form: &HtmlFormElement) -> Result<Vec<(String, String)>, JsValue> {
    let data = FormData::new_with_form(form)?;
    let mut entries = Vec::new();
    let Some(iter) = js_sys::try_iter(&data)? else {
        return Ok(entries);
    };
    for entry in iter {
        let pair = js_sys::Array::from(&entry?);
        let key = pair.get(0).as_string().unwrap_or_default();
        let value = pair.get(1).as_string().unwrap_or_default();
        entries.push((key, value));
    }
    Ok(entries)
}

// ── Elements struct ──

#[derive(Clone)]
pub struct Elements {
    pub alert: HtmlElement,
    pub notification: Element,
    pub balance: Element,
    pub invoice_form: HtmlFormElement,
    pub invoice_container: Element,
    pub add_item_btn: Element,
    pub item_wrapper: Element,
}

macro_rules! get_el {
    ($id:expr) => {
        by_id($id).ok_or_else(|| JsValue::from_str(&format!("missing element #{}", $id)))?
    };
}

macro_rules! get_typed {
    ($ty:ty, $lookup:expr, $what:expr) => {
        $lookup
            .and_then(|e| e.dyn_into::<$ty>().ok())
            .ok_or_else(|| JsValue::from_str(&format!("missing {}", $what)))?
    };
}

impl Elements {
    pub fn bind() -> Result<Self, JsValue> {
        Ok(Self {
            alert: get_typed!(HtmlElement, query(".alert"), ".alert banner"),
            notification: get_el!("notification"),
            balance: get_el!("balance"),
            invoice_form: get_typed!(
                HtmlFormElement,
                query("form[name=newInvoiceForm]"),
                "form newInvoiceForm"
            ),
            invoice_container: get_el!("invoiceContainer"),
            add_item_btn: get_el!("addItemBtn"),
            item_wrapper: get_el!("itemWrapper"),
        })
    }
}

// ── View ──

/// [`InvoiceView`] over the page's banner, balance and card container.
pub struct DomView {
    els: Elements,
    config: InvoiceConfig,
}

impl DomView {
    pub fn new(els: Elements, config: InvoiceConfig) -> Self {
        Self { els, config }
    }

    pub fn set_config(&mut self, config: InvoiceConfig) {
        self.config = config;
    }
}

impl InvoiceView for DomView {
    fn notify(&self, text: &str) {
        set_display(&self.els.alert, "block");
        set_text(&self.els.notification, text);
    }

    fn notification_off(&self) {
        set_display(&self.els.alert, "none");
    }

    fn show_invoices(&self, rendered: &Rendered) {
        let html = match rendered {
            Rendered::Empty(message) => format!("<h4>{message}</h4>"),
            Rendered::Cards(cards) => cards
                .iter()
                .map(|card| format!(r#"<div class="col-md-3">{}</div>"#, card_html(card, &self.config)))
                .collect(),
        };
        self.els.invoice_container.set_inner_html(&html);
    }

    fn show_balance(&self, balance: &str) {
        set_text(&self.els.balance, balance);
    }
}

// ── Controls ──

/// A `.payBtn` anchor, disabled through Bootstrap's `disabled` class.
pub struct ButtonGuard(pub Element);

impl ActionGuard for ButtonGuard {
    fn disable(&self) {
        add_class(&self.0, "disabled");
    }

    fn enable(&self) {
        remove_class(&self.0, "disabled");
    }

    fn is_disabled(&self) -> bool {
        has_class(&self.0, "disabled")
    }
}

const ITEM_ROW: &str = r#"<div class="row g-2">
  <div class="col">
    <input type="text" class="invoiceItems form-control mb-2" placeholder="Enter item name *" name="itemNames[]" required="true" />
  </div>
  <div class="col">
    <input type="number" class="invoiceItemPrices form-control mb-2" placeholder="Enter item price *" name="itemPrices[]" required="true" min="0.01" step="0.01" />
  </div>
  <div class="col-auto">
    <button type="button" class="btn-light rounded-pill btn-close"></button>
  </div>
</div>"#;

/// Append an empty name/price row to the new-invoice form.
pub fn add_item_row(els: &Elements) -> Result<(), JsValue> {
    let row = create_element("div")?;
    row.set_class_name("itemWrapper col-12");
    row.set_inner_html(ITEM_ROW);
    els.item_wrapper.append_child(&row)?;
    Ok(())
}

/// Remove the item row owning a clicked close button.
pub fn remove_item_row(close_btn: &Element) {
    let Some(grid) = close_btn.parent_element().and_then(|col| col.parent_element()) else {
        return;
    };
    match grid.parent_element() {
        Some(wrapper) if has_class(&wrapper, "itemWrapper") => wrapper.remove(),
        _ => grid.remove(),
    }
}
