use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod amount;

pub use amount::{AmountError, MAX_TOKEN_DECIMALS, TOKEN_DECIMALS, TokenAmount};

/// A Celo account or contract address as handed out by the wallet.
///
/// Wallets and contracts disagree on checksum casing, so equality between
/// addresses goes through [`Address::same_as`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Address(pub String);

impl Address {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn same_as(&self, other: &Address) -> bool {
        self.0.trim().eq_ignore_ascii_case(other.0.trim())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown invoice status code {0}")]
pub struct UnknownStatus(pub u8);

/// Invoice status as stored by the contract (`enum Status { PENDING, PAID, DECLINED }`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    Paid,
    Declined,
}

impl InvoiceStatus {
    pub fn from_code(code: u8) -> Result<Self, UnknownStatus> {
        match code {
            0 => Ok(Self::Pending),
            1 => Ok(Self::Paid),
            2 => Ok(Self::Declined),
            other => Err(UnknownStatus(other)),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Paid => 1,
            Self::Declined => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Declined => "DECLINED",
        }
    }
}

/// Which list of the connected account an invoice was read from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InvoiceRole {
    /// Issued by the account (`getOwnedInvoices`).
    Owned,
    /// Addressed to the account as payer (`getReceivedInvoice`).
    Received,
}

impl InvoiceRole {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owned => "owned",
            Self::Received => "received",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvoiceItem {
    pub name: String,
    pub price: TokenAmount,
}

/// Normalized invoice, independent of which wire shape it was read from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Invoice {
    /// Position within the owner's or payer's list; this is what the
    /// contract's payment method expects, not a global id.
    pub index: u64,
    pub role: InvoiceRole,
    pub number: String,
    pub name: String,
    pub description: String,
    pub total: TokenAmount,
    pub items: Vec<InvoiceItem>,
    pub owner: Address,
    pub payer: Address,
    pub status: InvoiceStatus,
    pub date_due: i64,
}

/// `getOwnedInvoices(i)` return value:
/// `[id, number, name, description, total, items, payer, status, dateDue]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnedInvoiceRecord {
    pub id: String,
    pub number: String,
    pub name: String,
    pub description: String,
    pub total: TokenAmount,
    pub items: Vec<InvoiceItem>,
    pub payer: Address,
    pub status: u8,
    pub date_due: i64,
}

/// `getReceivedInvoice(i)` return value:
/// `[id, number, name, description, total, items, owner, payer, status, dateDue]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReceivedInvoiceRecord {
    pub id: String,
    pub number: String,
    pub name: String,
    pub description: String,
    pub total: TokenAmount,
    pub items: Vec<InvoiceItem>,
    pub owner: Address,
    pub payer: Address,
    pub status: u8,
    pub date_due: i64,
}

impl Invoice {
    /// The owned view omits the owner: it is the account that asked.
    pub fn from_owned(
        index: u64,
        record: OwnedInvoiceRecord,
        owner: &Address,
    ) -> Result<Self, UnknownStatus> {
        Ok(Self {
            index,
            role: InvoiceRole::Owned,
            number: record.number,
            name: record.name,
            description: record.description,
            total: record.total,
            items: record.items,
            owner: owner.clone(),
            payer: record.payer,
            status: InvoiceStatus::from_code(record.status)?,
            date_due: record.date_due,
        })
    }

    pub fn from_received(index: u64, record: ReceivedInvoiceRecord) -> Result<Self, UnknownStatus> {
        Ok(Self {
            index,
            role: InvoiceRole::Received,
            number: record.number,
            name: record.name,
            description: record.description,
            total: record.total,
            items: record.items,
            owner: record.owner,
            payer: record.payer,
            status: InvoiceStatus::from_code(record.status)?,
            date_due: record.date_due,
        })
    }

    pub fn is_paid(&self) -> bool {
        self.status == InvoiceStatus::Paid
    }
}

/// Arguments of `generateInvoice`, already in smallest units.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewInvoice {
    pub number: String,
    pub name: String,
    pub description: String,
    pub items: Vec<InvoiceItem>,
    pub total: TokenAmount,
    pub payer: Address,
    pub date_due: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TxReceipt {
    pub tx_hash: String,
}
