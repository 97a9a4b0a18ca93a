//! Field parsers tolerating the loosely typed values found in operation
//! logs: integers may arrive as numeric strings, booleans as `"true"`.

use serde::de::Error;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawInt {
    Int(i64),
    Float(f64),
    Text(String),
}

pub fn int<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let value = match RawInt::deserialize(deserializer)? {
        RawInt::Int(value) => value,
        RawInt::Float(value) if value.fract() == 0.0 => value as i64,
        RawInt::Float(value) => return Err(D::Error::custom(format!("expected an integer, got {}", value))),
        RawInt::Text(text) => text
            .trim()
            .parse::<i64>()
            .map_err(|_| D::Error::custom(format!("expected an integer, got {:?}", text)))?,
    };
    T::try_from(value).map_err(|_| D::Error::custom(format!("integer {} is out of range", value)))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawBool {
    Bool(bool),
    Text(String),
}

pub fn boolean<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawBool::deserialize(deserializer)? {
        RawBool::Bool(value) => value,
        RawBool::Text(text) => text == "true",
    })
}
