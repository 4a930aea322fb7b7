//! Celo extension wallet, invoice contract and cUSD bindings over web3.
//!
//! The page loads `Web3` and `ContractKit` as globals; `window.celo` is
//! injected by the extension.

use async_trait::async_trait;
use ci_api_types::{
    Address, InvoiceItem, NewInvoice, OwnedInvoiceRecord, ReceivedInvoiceRecord, TokenAmount,
    TxReceipt,
};
use ci_contract_client::{ContractError, ContractResult, InvoiceContract, TokenLedger};
use ci_invoice_core::{InvoiceConfig, Wallet};
use js_sys::Array;
use std::cell::RefCell;
use std::str::FromStr;
use tracing::debug;
use wasm_bindgen::prelude::*;

use crate::js::{self, rejected};

const INVOICE_ABI: &str = include_str!("../contract/celoinvoice.abi.json");
const ERC20_ABI: &str = include_str!("../contract/erc20.abi.json");

/// The injected `window.celo` provider and the kit built on top of it.
pub struct CeloWallet {
    provider: JsValue,
    kit: RefCell<Option<JsValue>>,
}

impl CeloWallet {
    /// `None` when no extension injected a provider into the page.
    pub fn detect() -> Option<Self> {
        let provider = js::get(&js_sys::global(), "celo").ok()?;
        js::is_present(&provider).then(|| Self {
            provider,
            kit: RefCell::new(None),
        })
    }

    fn kit(&self) -> ContractResult<JsValue> {
        self.kit
            .borrow()
            .clone()
            .ok_or_else(|| ContractError::Rejected("wallet is not enabled".to_owned()))
    }

    fn new_contract(&self, abi: &str, address: &Address) -> ContractResult<JsValue> {
        let kit = self.kit()?;
        let ctor = js::get_path(&kit, "web3.eth.Contract").map_err(rejected)?;
        let abi = js_sys::JSON::parse(abi).map_err(rejected)?;
        js::construct(&ctor, &[abi, JsValue::from_str(address.as_str())]).map_err(rejected)
    }
}

fn new_kit(provider: &JsValue) -> Result<JsValue, JsValue> {
    let global = js_sys::global();
    let web3 = js::construct(&js::get(&global, "Web3")?, &[provider.clone()])?;
    js::call(&js::get(&global, "ContractKit")?, "newKitFromWeb3", &[web3])
}

#[async_trait(?Send)]
impl Wallet for CeloWallet {
    type Contract = Web3InvoiceContract;
    type Token = KitTokenLedger;

    async fn enable(&self) -> ContractResult<()> {
        js::call_async(&self.provider, "enable", &[])
            .await
            .map_err(rejected)?;
        let kit = new_kit(&self.provider).map_err(rejected)?;
        *self.kit.borrow_mut() = Some(kit);
        Ok(())
    }

    async fn default_account(&self) -> ContractResult<Address> {
        let kit = self.kit()?;
        let eth = js::get_path(&kit, "web3.eth").map_err(rejected)?;
        let accounts = js::call_async(&eth, "getAccounts", &[])
            .await
            .map_err(rejected)?;
        let account = Array::from(&accounts)
            .get(0)
            .as_string()
            .ok_or_else(|| ContractError::Rejected("no account available".to_owned()))?;
        js::set(&kit, "defaultAccount", &JsValue::from_str(&account)).map_err(rejected)?;
        Ok(Address::new(account))
    }

    fn invoice_contract(&self, config: &InvoiceConfig) -> ContractResult<Self::Contract> {
        Ok(Web3InvoiceContract {
            contract: self.new_contract(INVOICE_ABI, &config.invoice_contract)?,
            address: config.invoice_contract.clone(),
        })
    }

    fn token_ledger(&self, config: &InvoiceConfig) -> ContractResult<Self::Token> {
        Ok(KitTokenLedger {
            kit: self.kit()?,
            erc20: self.new_contract(ERC20_ABI, &config.stable_token)?,
            symbol: config.token_symbol.clone(),
        })
    }
}

/// `kit.web3.eth.Contract` bound to the invoice contract.
pub struct Web3InvoiceContract {
    contract: JsValue,
    address: Address,
}

impl Web3InvoiceContract {
    fn method(&self, name: &str, args: &[JsValue]) -> ContractResult<JsValue> {
        let methods = js::get(&self.contract, "methods").map_err(rejected)?;
        js::call(&methods, name, args).map_err(rejected)
    }

    async fn read(&self, name: &str, args: &[JsValue], caller: &Address) -> ContractResult<JsValue> {
        let method = self.method(name, args)?;
        let options = js::from_options(caller.as_str()).map_err(rejected)?;
        js::call_async(&method, "call", &[options])
            .await
            .map_err(rejected)
    }

    async fn send(&self, name: &str, args: &[JsValue], sender: &Address) -> ContractResult<TxReceipt> {
        let method = self.method(name, args)?;
        send_from(&method, sender).await
    }
}

async fn send_from(method: &JsValue, sender: &Address) -> ContractResult<TxReceipt> {
    let options = js::from_options(sender.as_str()).map_err(rejected)?;
    let receipt = js::call_async(method, "send", &[options])
        .await
        .map_err(rejected)?;
    let tx_hash = js::get(&receipt, "transactionHash")
        .ok()
        .and_then(|hash| hash.as_string())
        .unwrap_or_default();
    Ok(TxReceipt { tx_hash })
}

fn index_arg(index: u64) -> JsValue {
    JsValue::from_str(&index.to_string())
}

#[async_trait(?Send)]
impl InvoiceContract for Web3InvoiceContract {
    fn address(&self) -> &Address {
        &self.address
    }

    async fn owned_invoice_count(&self, owner: &Address) -> ContractResult<u64> {
        let count = self
            .read("getOwnedInvoiceCount", &[owner.as_str().into()], owner)
            .await?;
        Tuple::new("getOwnedInvoiceCount", count).scalar()
    }

    async fn received_invoice_count(&self, payer: &Address) -> ContractResult<u64> {
        let count = self
            .read("getReceivedInvoiceCount", &[payer.as_str().into()], payer)
            .await?;
        Tuple::new("getReceivedInvoiceCount", count).scalar()
    }

    async fn owned_invoice(
        &self,
        caller: &Address,
        index: u64,
    ) -> ContractResult<OwnedInvoiceRecord> {
        let raw = self
            .read("getOwnedInvoices", &[index_arg(index)], caller)
            .await?;
        let tuple = Tuple::new("getOwnedInvoices", raw);
        Ok(OwnedInvoiceRecord {
            id: tuple.text(0)?,
            number: tuple.text(1)?,
            name: tuple.text(2)?,
            description: tuple.text(3)?,
            total: tuple.amount(4)?,
            items: tuple.items(5)?,
            payer: Address::new(tuple.text(6)?),
            status: tuple.parse(7)?,
            date_due: tuple.parse(8)?,
        })
    }

    async fn received_invoice(
        &self,
        caller: &Address,
        index: u64,
    ) -> ContractResult<ReceivedInvoiceRecord> {
        let raw = self
            .read("getReceivedInvoice", &[index_arg(index)], caller)
            .await?;
        let tuple = Tuple::new("getReceivedInvoice", raw);
        Ok(ReceivedInvoiceRecord {
            id: tuple.text(0)?,
            number: tuple.text(1)?,
            name: tuple.text(2)?,
            description: tuple.text(3)?,
            total: tuple.amount(4)?,
            items: tuple.items(5)?,
            owner: Address::new(tuple.text(6)?),
            payer: Address::new(tuple.text(7)?),
            status: tuple.parse(8)?,
            date_due: tuple.parse(9)?,
        })
    }

    async fn generate_invoice(
        &self,
        sender: &Address,
        invoice: &NewInvoice,
    ) -> ContractResult<TxReceipt> {
        let items = serde_wasm_bindgen::to_value(&invoice.items).map_err(|err| {
            ContractError::Rejected(format!("cannot encode invoice items: {err}"))
        })?;
        let args = [
            JsValue::from_str(&invoice.number),
            JsValue::from_str(&invoice.name),
            JsValue::from_str(&invoice.description),
            items,
            JsValue::from_str(&invoice.total.to_string()),
            JsValue::from_str(invoice.payer.as_str()),
            JsValue::from_str(&invoice.date_due.to_string()),
        ];
        debug!(name = %invoice.name, items = invoice.items.len(), "sending generateInvoice");
        self.send("generateInvoice", &args, sender).await
    }

    async fn make_invoice_payment(&self, sender: &Address, index: u64) -> ContractResult<TxReceipt> {
        debug!(index, "sending makeInvoicePayment");
        self.send("makeInvoicePayment", &[index_arg(index)], sender)
            .await
    }
}

/// A web3 call result: an array-like object addressed by output position.
struct Tuple {
    method: &'static str,
    raw: JsValue,
}

impl Tuple {
    fn new(method: &'static str, raw: JsValue) -> Self {
        Self { method, raw }
    }

    fn decode_error(&self, reason: impl Into<String>) -> ContractError {
        ContractError::Decode {
            method: self.method,
            reason: reason.into(),
        }
    }

    fn field(&self, position: u32) -> ContractResult<JsValue> {
        js::get(&self.raw, &position.to_string())
            .ok()
            .filter(js::is_present)
            .ok_or_else(|| self.decode_error(format!("missing output {position}")))
    }

    fn text(&self, position: u32) -> ContractResult<String> {
        self.field(position)?
            .as_string()
            .ok_or_else(|| self.decode_error(format!("output {position} is not a string")))
    }

    fn parse<T: FromStr>(&self, position: u32) -> ContractResult<T> {
        let text = self.text(position)?;
        text.parse()
            .map_err(|_| self.decode_error(format!("output {position} is not a number: {text}")))
    }

    fn amount(&self, position: u32) -> ContractResult<TokenAmount> {
        let text = self.text(position)?;
        TokenAmount::from_wire(&text).map_err(|err| self.decode_error(err.to_string()))
    }

    /// `Item[]` comes back as a list of `(name, price)` tuples.
    fn items(&self, position: u32) -> ContractResult<Vec<InvoiceItem>> {
        let list = self.field(position)?;
        if !Array::is_array(&list) {
            return Err(self.decode_error(format!("output {position} is not a list")));
        }
        Array::from(&list)
            .iter()
            .map(|entry| {
                let item = Tuple::new(self.method, entry);
                Ok(InvoiceItem {
                    name: item.text(0)?,
                    price: item.amount(1)?,
                })
            })
            .collect()
    }

    /// Single-output methods return the value itself rather than a tuple.
    fn scalar<T: FromStr>(&self) -> ContractResult<T> {
        let text = self
            .raw
            .as_string()
            .ok_or_else(|| self.decode_error("result is not a string"))?;
        text.parse()
            .map_err(|_| self.decode_error(format!("result is not a number: {text}")))
    }
}

/// ContractKit balance lookups plus the ERC-20 contract for approvals.
pub struct KitTokenLedger {
    kit: JsValue,
    erc20: JsValue,
    symbol: String,
}

#[async_trait(?Send)]
impl TokenLedger for KitTokenLedger {
    fn symbol(&self) -> &str {
        &self.symbol
    }

    async fn balance_of(&self, account: &Address) -> ContractResult<TokenAmount> {
        let totals = js::call_async(&self.kit, "getTotalBalance", &[account.as_str().into()])
            .await
            .map_err(rejected)?;
        let balance = js::get(&totals, &self.symbol)
            .ok()
            .filter(js::is_present)
            .ok_or_else(|| ContractError::Decode {
                method: "getTotalBalance",
                reason: format!("no {} balance", self.symbol),
            })?;
        let units = js::call(&balance, "toFixed", &[])
            .ok()
            .and_then(|text| text.as_string())
            .ok_or_else(|| ContractError::Decode {
                method: "getTotalBalance",
                reason: "balance is not a BigNumber".to_owned(),
            })?;
        TokenAmount::from_wire(&units).map_err(|err| ContractError::Decode {
            method: "getTotalBalance",
            reason: err.to_string(),
        })
    }

    async fn approve(
        &self,
        owner: &Address,
        spender: &Address,
        amount: TokenAmount,
    ) -> ContractResult<TxReceipt> {
        let methods = js::get(&self.erc20, "methods").map_err(rejected)?;
        let method = js::call(
            &methods,
            "approve",
            &[
                JsValue::from_str(spender.as_str()),
                JsValue::from_str(&amount.to_string()),
            ],
        )
        .map_err(rejected)?;
        debug!(%spender, %amount, "sending approve");
        send_from(&method, owner).await
    }
}
