use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::error::DecodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Buy,
    Sell,
}

impl TryFrom<&str> for Side {
    type Error = DecodeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            _ => Err(DecodeError::UnknownSide(value.to_string())),
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => f.write_str("Buy"),
            Side::Sell => f.write_str("Sell"),
        }
    }
}

/// One executed trade as read from the fill log.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    pub cost: Decimal,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Fill {
    pub fn new(side: Side, quantity: Decimal, price: Decimal, cost: Decimal) -> Self {
        Self {
            side,
            quantity,
            price,
            cost,
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

// Wire shape of a fill line. Numeric fields stay loose because the order
// recorder writes them as strings while hand-written logs use numbers.
#[derive(Debug, Deserialize)]
struct RawFill {
    #[serde(default)]
    side: Option<Value>,
    #[serde(default)]
    qty: Option<Value>,
    #[serde(default)]
    price: Option<Value>,
    #[serde(default)]
    cost: Option<Value>,
    #[serde(default)]
    timestamp: Option<Value>,
}

/// Decodes one line of the fill log. The line must hold a single JSON object.
pub fn decode_line(line: &str) -> Result<Fill, DecodeError> {
    let value: Value = serde_json::from_str(line)?;
    let raw: RawFill = match value {
        object @ Value::Object(_) => serde_json::from_value(object)?,
        other => return Err(DecodeError::NotObject(json_kind(&other))),
    };

    let side_text = match raw.side.as_ref() {
        None | Some(Value::Null) => return Err(DecodeError::MissingField("side")),
        Some(value) => value_to_string(value)
            .ok_or_else(|| DecodeError::UnknownSide(value.to_string()))?,
    };
    let side = Side::try_from(side_text.as_str())?;

    Ok(Fill {
        side,
        quantity: required_decimal(raw.qty.as_ref(), "qty")?,
        price: required_decimal(raw.price.as_ref(), "price")?,
        cost: required_decimal(raw.cost.as_ref(), "cost")?,
        timestamp: raw.timestamp.as_ref().and_then(parse_timestamp_value),
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_decimal_text(text: &str) -> Option<Decimal> {
    let trimmed = text.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .ok()
        .or_else(|| clamp_out_of_range(trimmed))
}

// Finite numbers that `Decimal` cannot hold: magnitudes past its bounds clamp
// to `Decimal::MIN`/`Decimal::MAX`, digits below its smallest scale become zero.
fn clamp_out_of_range(text: &str) -> Option<Decimal> {
    let value: f64 = text.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    if value.abs() < 1.0 {
        return Some(Decimal::ZERO);
    }
    let clamped = if value.is_sign_negative() {
        Decimal::MIN
    } else {
        Decimal::MAX
    };
    tracing::warn!(value = text, clamped = %clamped, "number exceeds decimal range, clamped");
    Some(clamped)
}

fn required_decimal(value: Option<&Value>, field: &'static str) -> Result<Decimal, DecodeError> {
    let value = match value {
        None | Some(Value::Null) => return Err(DecodeError::MissingField(field)),
        Some(value) => value,
    };
    value_to_string(value)
        .as_deref()
        .and_then(parse_decimal_text)
        .ok_or_else(|| DecodeError::InvalidNumber {
            field,
            value: value.to_string(),
        })
}

fn parse_timestamp_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
        Value::String(s) => parse_datetime_text(s),
        _ => None,
    }
}

fn parse_datetime_text(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    // Go's time.Time default rendering: "2024-03-01 10:15:00 +0000 UTC"
    let zoned = trimmed.strip_suffix(" UTC").unwrap_or(trimmed);
    if let Ok(dt) = DateTime::parse_from_str(zoned, "%Y-%m-%d %H:%M:%S%.f %z") {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(dt.and_utc());
    }
    if let Ok(ms) = trimmed.parse::<i64>() {
        return DateTime::from_timestamp_millis(ms);
    }
    None
}
