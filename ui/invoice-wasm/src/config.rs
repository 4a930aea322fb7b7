//! Deployment settings fetched next to the page.

use anyhow::{Context, bail};
use ci_invoice_core::InvoiceConfig;
use gloo_net::http::Request;
use tracing::{info, warn};

pub const CONFIG_PATH: &str = "invoice-config.json";

/// Load `invoice-config.json`, or the built-in Alfajores settings when it is
/// missing or invalid.
pub async fn load_config() -> InvoiceConfig {
    match fetch_config(CONFIG_PATH).await {
        Ok(config) => {
            info!(contract = %config.invoice_contract, path = CONFIG_PATH, "config loaded");
            config
        }
        Err(err) => {
            warn!(error = %format!("{err:#}"), "using default config");
            InvoiceConfig::default()
        }
    }
}

async fn fetch_config(path: &str) -> anyhow::Result<InvoiceConfig> {
    let resp = Request::get(path)
        .send()
        .await
        .with_context(|| format!("fetch {path}"))?;
    if !resp.ok() {
        bail!("fetch {path}: HTTP {}", resp.status());
    }
    let body = resp.text().await.context("read config body")?;
    InvoiceConfig::from_json(&body).with_context(|| format!("parse {path}"))
}
