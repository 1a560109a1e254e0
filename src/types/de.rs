//! Deserialization helpers for numeric wire fields.
//!
//! The server encodes some numbers as JSON strings (e.g. `"order-price":"100.5"`).
//! These helpers accept either representation so payload structs can stay plain
//! `f64`/`Option<f64>` fields.

use serde::de::{Deserializer, Error};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

impl NumberOrString {
    fn into_f64<E: Error>(self) -> Result<f64, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("invalid numeric string: {:?}", s))),
        }
    }
}

/// Deserialize an `f64` from a JSON number or numeric string.
pub fn f64_flexible<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    NumberOrString::deserialize(deserializer)?.into_f64()
}

/// Deserialize an `Option<f64>` from a JSON number, numeric string, or null.
/// Combine with `#[serde(default)]` so absent fields stay `None`.
pub fn opt_f64_flexible<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<NumberOrString> = Option::deserialize(deserializer)?;
    value.map(NumberOrString::into_f64).transpose()
}
