use chrono::{DateTime, NaiveDate};
use ci_api_types::{Address, InvoiceItem, NewInvoice, TokenAmount};
use std::collections::HashMap;
use tracing::warn;

use crate::error::InvoiceError;

pub const ITEM_NAMES_FIELD: &str = "itemNames[]";
pub const ITEM_PRICES_FIELD: &str = "itemPrices[]";

/// Raw entries of the create-invoice form, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvoiceForm {
    fields: HashMap<String, String>,
    item_names: Vec<String>,
    item_prices: Vec<String>,
}

impl InvoiceForm {
    /// Split form entries into scalar fields and the repeated item columns.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut form = Self::default();
        for (name, value) in entries {
            let value = value.into();
            match name.as_ref() {
                ITEM_NAMES_FIELD => form.item_names.push(value),
                ITEM_PRICES_FIELD => form.item_prices.push(value),
                other => {
                    form.fields.insert(other.to_owned(), value);
                }
            }
        }
        form
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Invoice name, used in notifications.
    pub fn name(&self) -> &str {
        self.field("name").unwrap_or_default()
    }

    fn required(&self, name: &str) -> Result<&str, InvoiceError> {
        match self.field(name).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value),
            _ => Err(InvoiceError::InvalidForm(format!("{name} is required"))),
        }
    }

    /// Build the `generateInvoice` arguments, scaling every amount by `10^decimals`.
    pub fn to_new_invoice(&self, decimals: u32) -> Result<NewInvoice, InvoiceError> {
        if self.item_names.len() != self.item_prices.len() {
            return Err(InvoiceError::InvalidForm(
                "every item needs a name and a price".to_owned(),
            ));
        }

        let items = self
            .item_names
            .iter()
            .zip(&self.item_prices)
            .map(|(name, price)| {
                Ok(InvoiceItem {
                    name: name.trim().to_owned(),
                    price: TokenAmount::from_human(price, decimals)?,
                })
            })
            .collect::<Result<Vec<_>, InvoiceError>>()?;

        let total = TokenAmount::from_human(self.required("total")?, decimals)?;
        let item_sum = items
            .iter()
            .try_fold(TokenAmount::ZERO, |sum, item| sum.checked_add(item.price));
        if !items.is_empty() && item_sum != Some(total) {
            warn!(%total, ?item_sum, "invoice total differs from the sum of its items");
        }

        Ok(NewInvoice {
            number: self.required("number")?.to_owned(),
            name: self.required("name")?.to_owned(),
            description: self.field("description").unwrap_or_default().trim().to_owned(),
            items,
            total,
            payer: Address::new(self.required("payer")?),
            date_due: parse_due_date(self.required("dueDate")?)?,
        })
    }
}

/// Unix seconds for a `YYYY-MM-DD` date (UTC midnight) or an RFC 3339 timestamp.
pub fn parse_due_date(input: &str) -> Result<i64, InvoiceError> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc().timestamp());
        }
    }
    DateTime::parse_from_rfc3339(input)
        .map(|due| due.timestamp())
        .map_err(|_| InvoiceError::InvalidForm(format!("invalid due date '{input}'")))
}
