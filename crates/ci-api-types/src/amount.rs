use rust_decimal::Decimal;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Decimals of the stable token (cUSD) the invoice contract settles in.
pub const TOKEN_DECIMALS: u32 = 18;

/// Largest decimals count whose scale factor `10^decimals` fits in `u128`.
pub const MAX_TOKEN_DECIMALS: u32 = 38;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    #[error("invalid amount '{0}'")]
    Invalid(String),
    #[error("amount '{0}' cannot be negative")]
    Negative(String),
    #[error("amount '{input}' has more than {decimals} decimal places")]
    TooPrecise { input: String, decimals: u32 },
    #[error("amount '{0}' is too large")]
    Overflow(String),
}

/// A token amount in the token's smallest unit.
///
/// Amounts cross the contract boundary only in this form; the human decimal
/// form exists at the edges (form input and card display).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(pub u128);

impl TokenAmount {
    pub const ZERO: Self = Self(0);

    /// Scale a human decimal string (e.g. `"1.50"`) by `10^decimals`.
    pub fn from_human(input: &str, decimals: u32) -> Result<Self, AmountError> {
        let trimmed = input.trim();
        if !is_plain_decimal(trimmed) {
            return Err(AmountError::Invalid(trimmed.to_owned()));
        }
        let value =
            Decimal::from_str(trimmed).map_err(|_| AmountError::Invalid(trimmed.to_owned()))?;

        if value.is_zero() {
            return Ok(Self::ZERO);
        }
        if value.is_sign_negative() {
            return Err(AmountError::Negative(trimmed.to_owned()));
        }

        let value = value.normalize();
        let scale = value.scale();
        if scale > decimals {
            return Err(AmountError::TooPrecise {
                input: trimmed.to_owned(),
                decimals,
            });
        }

        let overflow = || AmountError::Overflow(trimmed.to_owned());
        let factor = 10_u128.checked_pow(decimals - scale).ok_or_else(overflow)?;
        value
            .mantissa()
            .unsigned_abs()
            .checked_mul(factor)
            .map(Self)
            .ok_or_else(overflow)
    }

    /// Parse the base-10 integer string returned by contract bindings.
    pub fn from_wire(input: &str) -> Result<Self, AmountError> {
        let trimmed = input.trim();
        trimmed
            .parse::<u128>()
            .map(Self)
            .map_err(|_| AmountError::Invalid(trimmed.to_owned()))
    }

    /// Human form with two decimal places, rounding half up.
    pub fn to_display(self, decimals: u32) -> String {
        let cents = if decimals >= 2 {
            match 10_u128.checked_pow(decimals - 2) {
                Some(unit) => {
                    let whole = self.0 / unit;
                    let rest = self.0 % unit;
                    if rest >= unit - rest {
                        whole.saturating_add(1)
                    } else {
                        whole
                    }
                }
                None => 0,
            }
        } else {
            self.0.saturating_mul(10_u128.pow(2 - decimals))
        };
        format!("{}.{:02}", cents / 100, cents % 100)
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }
}

/// Digits with at most one `.`, optionally behind a `-` (rejected later as
/// negative). No exponents, separators or `+`.
fn is_plain_decimal(input: &str) -> bool {
    let unsigned = input.strip_prefix('-').unwrap_or(input);
    let (whole, frac) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    !(whole.is_empty() && frac.is_empty())
        && whole.bytes().all(|b| b.is_ascii_digit())
        && frac.bytes().all(|b| b.is_ascii_digit())
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct UnitsVisitor;

        impl Visitor<'_> for UnitsVisitor {
            type Value = TokenAmount;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an integer amount in smallest units")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<TokenAmount, E> {
                TokenAmount::from_wire(v).map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<TokenAmount, E> {
                Ok(TokenAmount(u128::from(v)))
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<TokenAmount, E> {
                Ok(TokenAmount(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<TokenAmount, E> {
                u128::try_from(v)
                    .map(TokenAmount)
                    .map_err(|_| E::custom(AmountError::Negative(v.to_string())))
            }
        }

        deserializer.deserialize_any(UnitsVisitor)
    }
}
