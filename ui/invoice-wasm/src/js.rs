//! Small `Reflect` helpers over untyped JS objects.
//!
//! Web3 and ContractKit are page globals without Rust bindings, so every
//! call goes through property lookups and `Function::apply`.

use ci_contract_client::ContractError;
use js_sys::{Array, Function, Object, Promise, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

pub fn get(target: &JsValue, key: &str) -> Result<JsValue, JsValue> {
    Reflect::get(target, &JsValue::from_str(key))
}

/// Follow a dotted property path, e.g. `web3.eth.Contract`.
pub fn get_path(target: &JsValue, path: &str) -> Result<JsValue, JsValue> {
    path.split('.').try_fold(target.clone(), |value, key| get(&value, key))
}

pub fn set(target: &JsValue, key: &str, value: &JsValue) -> Result<(), JsValue> {
    Reflect::set(target, &JsValue::from_str(key), value).map(|_| ())
}

pub fn is_present(value: &JsValue) -> bool {
    !value.is_undefined() && !value.is_null()
}

/// `target[name](...args)`, without awaiting the result.
pub fn call(target: &JsValue, name: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let function: Function = get(target, name)?
        .dyn_into()
        .map_err(|_| JsValue::from_str(&format!("{name} is not a function")))?;
    function.apply(target, &args.iter().collect::<Array>())
}

/// `new ctor(...args)`.
pub fn construct(ctor: &JsValue, args: &[JsValue]) -> Result<JsValue, JsValue> {
    let ctor: &Function = ctor
        .dyn_ref()
        .ok_or_else(|| JsValue::from_str("constructor is not a function"))?;
    Reflect::construct(ctor, &args.iter().collect::<Array>())
}

/// Await a promise, a thenable (web3's PromiEvent) or a plain value.
pub async fn settle(value: JsValue) -> Result<JsValue, JsValue> {
    JsFuture::from(Promise::resolve(&value)).await
}

/// `target[name](...args)`, awaited.
pub async fn call_async(target: &JsValue, name: &str, args: &[JsValue]) -> Result<JsValue, JsValue> {
    settle(call(target, name, args)?).await
}

/// `{ from: account }` transaction options.
pub fn from_options(account: &str) -> Result<JsValue, JsValue> {
    let options: JsValue = Object::new().into();
    set(&options, "from", &JsValue::from_str(account))?;
    Ok(options)
}

/// The text a template literal would produce for a thrown value.
pub fn error_text(value: &JsValue) -> String {
    if let Some(text) = value.as_string() {
        return text;
    }
    if let Some(error) = value.dyn_ref::<js_sys::Error>() {
        return String::from(error.to_string());
    }
    js_sys::JSON::stringify(value)
        .ok()
        .and_then(|text| text.as_string())
        .unwrap_or_else(|| "unknown error".to_owned())
}

pub fn rejected(value: JsValue) -> ContractError {
    ContractError::Rejected(error_text(&value))
}
