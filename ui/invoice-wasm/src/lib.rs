//! Celo invoice DApp front end (wasm).
//!
//! Binds the page, connects the injected Celo wallet, then hands the session
//! to the `ci-invoice-core` flows. Each concern lives in its own module.

pub mod celo;
pub mod config;
pub mod dom;
pub mod events;
pub mod js;
pub mod logging;
pub mod state;

use ci_invoice_core::view::LOADING;
use ci_invoice_core::{InvoiceView, connect, load};
use std::rc::Rc;
use tracing::{debug, info};
use wasm_bindgen::prelude::*;

/// WASM entry point – called automatically when the module is instantiated.
#[wasm_bindgen(start)]
pub async fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();
    logging::init(log_directive().as_deref());

    init().await
}

/// `?log=<directive>` on the page URL, e.g. `?log=debug`.
fn log_directive() -> Option<String> {
    let search = web_sys::window()?.location().search().ok()?;
    parse_log_directive(&search)
}

fn parse_log_directive(search: &str) -> Option<String> {
    search
        .trim_start_matches('?')
        .split('&')
        .find_map(|pair| pair.strip_prefix("log="))
        .filter(|directive| !directive.is_empty())
        .map(str::to_owned)
}

async fn init() -> Result<(), JsValue> {
    let els = dom::Elements::bind()?;
    let mut view = dom::DomView::new(els.clone(), Default::default());
    view.notify(LOADING);

    let config = config::load_config().await;
    view.set_config(config.clone());
    let view = Rc::new(view);
    state::set_view(Rc::clone(&view));

    events::bind_events(&els)?;

    let wallet = celo::CeloWallet::detect();
    let session = match connect(wallet.as_ref(), config, &*view).await {
        Ok(session) => Rc::new(session),
        Err(err) => {
            info!(error = %err, "wallet unavailable");
            return Ok(());
        }
    };
    state::set_session(Rc::clone(&session));

    if let Err(err) = load(&session, &*view).await {
        debug!(error = %err, "initial load ended with an error");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_directive_comes_from_the_query_string() {
        assert_eq!(parse_log_directive("?log=debug").as_deref(), Some("debug"));
        assert_eq!(
            parse_log_directive("?tab=1&log=ci_invoice_core=trace").as_deref(),
            Some("ci_invoice_core=trace")
        );
        assert_eq!(parse_log_directive("?log="), None);
        assert_eq!(parse_log_directive(""), None);
    }
}
