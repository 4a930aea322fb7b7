use ci_api_types::{Address, MAX_TOKEN_DECIMALS, TOKEN_DECIMALS};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_INVOICE_CONTRACT: &str = "0x03b03D867688a8b2388397F54aEbdE6D75a05878";
pub const DEFAULT_STABLE_TOKEN: &str = "0x874069Fa1Eb16D44d622F2e0Ca25eeA172369bC1";
pub const DEFAULT_EXPLORER_URL: &str = "https://alfajores-blockscout.celo-testnet.org";
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

/// Deployment settings for the front end (Alfajores testnet by default).
///
/// Every field has a default, so an override document only needs the keys it
/// changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InvoiceConfig {
    pub invoice_contract: Address,
    pub stable_token: Address,
    pub token_symbol: String,
    /// At most [`MAX_TOKEN_DECIMALS`]; larger values are rejected on load.
    #[serde(deserialize_with = "bounded_decimals")]
    pub token_decimals: u32,
    pub explorer_url: String,
    /// Upper bound on invoice reads in flight during a refresh.
    pub fetch_concurrency: usize,
}

impl Default for InvoiceConfig {
    fn default() -> Self {
        Self {
            invoice_contract: Address::new(DEFAULT_INVOICE_CONTRACT),
            stable_token: Address::new(DEFAULT_STABLE_TOKEN),
            token_symbol: "cUSD".to_owned(),
            token_decimals: TOKEN_DECIMALS,
            explorer_url: DEFAULT_EXPLORER_URL.to_owned(),
            fetch_concurrency: DEFAULT_FETCH_CONCURRENCY,
        }
    }
}

fn bounded_decimals<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let decimals = u32::deserialize(deserializer)?;
    if decimals > MAX_TOKEN_DECIMALS {
        return Err(D::Error::custom(format!(
            "token_decimals {decimals} exceeds {MAX_TOKEN_DECIMALS}"
        )));
    }
    Ok(decimals)
}

impl InvoiceConfig {
    pub fn from_json(input: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(input)
    }

    pub fn explorer_address_url(&self, address: &Address) -> String {
        format!(
            "{}/address/{}/transactions",
            self.explorer_url.trim_end_matches('/'),
            address
        )
    }
}
