//! Order-preserving string codec.
//!
//! The store keeps every value as a string and compares strings
//! lexicographically. Numbers are therefore offset to be non-negative and
//! zero-padded to a fixed width, dates use fixed-width ISO-8601 text, and
//! `null` has its own sentinel. Attributes without a schema type use JSON.
//!
//! Number arithmetic is done on exact decimals: the value and the offset are
//! aligned to the larger of their fractional digit counts before adding or
//! subtracting, so encode and decode never see binary floating-point drift.

use crate::schema::{AttrType, Descriptor};
use crate::value::{iso8601, Value};
use chrono::{DateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

/// Wire form of `null` for every type.
pub const NULL_SENTINEL: &str = "null";

/// Integer width used when neither `length` nor a numeric `max` is declared.
pub const DEFAULT_NUMBER_WIDTH: usize = 10;

/// Fractional digits kept when reading a decimal; enough for any f64 that
/// survives validation.
const MAX_SCALE: u32 = 24;

fn iso_date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{4}(-\d{2}){2}T\d{2}(:\d{2}){2}\.\d{3}Z$").expect("valid ISO date pattern")
    })
}

/// Whether `text` is millisecond-precision UTC ISO-8601.
pub fn is_iso_date(text: &str) -> bool {
    iso_date_pattern().is_match(text)
}

/// Encode a value for storage under `descriptor`.
pub fn encode(value: &Value, descriptor: &Descriptor) -> String {
    match (value, descriptor.kind) {
        (Value::Null, _) => NULL_SENTINEL.to_string(),
        (Value::Number(n), Some(AttrType::Number)) => {
            encode_number(*n, descriptor).unwrap_or_else(|| generic_encode(value))
        }
        (Value::Bool(b), Some(AttrType::Boolean)) => b.to_string(),
        (Value::Date(d), Some(AttrType::Date)) => iso8601(d),
        (Value::String(s), Some(AttrType::String)) => s.clone(),
        _ => generic_encode(value),
    }
}

/// Decode a stored string under `descriptor`.
///
/// Never fails: text that does not parse as the declared type comes back as
/// a string.
pub fn decode(raw: &str, descriptor: &Descriptor) -> Value {
    if raw == NULL_SENTINEL {
        return Value::Null;
    }
    match descriptor.kind {
        Some(AttrType::Number) => decode_number(raw, descriptor)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        Some(AttrType::Boolean) => Value::Bool(raw == "true"),
        Some(AttrType::Date) => parse_date(raw)
            .map(Value::Date)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        Some(AttrType::String) => Value::String(raw.to_string()),
        Some(AttrType::Object) | None => generic_decode(raw),
    }
}

fn generic_encode(value: &Value) -> String {
    value.to_json().to_string()
}

fn generic_decode(raw: &str) -> Value {
    // An empty string comes back from the store as an empty value.
    if raw.is_empty() {
        return Value::String(String::new());
    }
    serde_json::from_str::<serde_json::Value>(raw)
        .map(Value::from_json)
        .unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Convert string input to the descriptor's type, as done when a record
/// attribute is set from form or JSON data. Non-string values pass through.
///
/// Strings apply `trim` then `lowercase` or `uppercase`. Numbers parse as
/// floats when a precision is declared and as integers otherwise. Dates parse
/// only from ISO-8601 millisecond UTC text. Booleans are `text == "true"`.
/// Text that does not parse is kept as is.
pub fn coerce(value: Value, descriptor: &Descriptor) -> Value {
    let Value::String(text) = value else {
        return value;
    };
    match descriptor.kind {
        Some(AttrType::String) => {
            let mut text = if descriptor.trim {
                text.trim().to_string()
            } else {
                text
            };
            if descriptor.lowercase {
                text = text.to_lowercase();
            } else if descriptor.uppercase {
                text = text.to_uppercase();
            }
            Value::String(text)
        }
        Some(AttrType::Number) => match text.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => {
                if descriptor.precision.is_some() {
                    Value::Number(n)
                } else {
                    Value::Number(n.trunc())
                }
            }
            _ => Value::String(text),
        },
        Some(AttrType::Date) if is_iso_date(&text) => match parse_date(&text) {
            Some(date) => Value::Date(date),
            None => Value::String(text),
        },
        Some(AttrType::Boolean) => Value::Bool(text == "true"),
        _ => Value::String(text),
    }
}

/// Offset, width and precision of a numeric attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NumberLayout {
    offset: Decimal,
    width: usize,
    precision: u32,
}

impl NumberLayout {
    fn of(descriptor: &Descriptor) -> Option<Self> {
        let precision = descriptor.precision.unwrap_or(0);
        let offset = match descriptor.min_number() {
            Some(min) => {
                let min = Decimal::from_f64(min)?;
                if precision > 0 {
                    min.abs()
                } else {
                    min.floor().abs()
                }
            }
            None => Decimal::ZERO,
        };
        let width = match (descriptor.length, descriptor.max_number()) {
            (Some(length), _) => length as usize,
            (None, Some(max)) => {
                let top = Decimal::from_f64(max)?.checked_add(offset)?.floor();
                top.units.to_string().len()
            }
            (None, None) => DEFAULT_NUMBER_WIDTH,
        };
        Some(Self {
            offset,
            width,
            precision,
        })
    }
}

fn encode_number(n: f64, descriptor: &Descriptor) -> Option<String> {
    let layout = NumberLayout::of(descriptor)?;
    let value = Decimal::from_f64(n)?;
    let scale = value.scale.max(layout.offset.scale);
    let shifted = value
        .rescale(scale)?
        .checked_add(layout.offset.rescale(scale)?)?
        .rescale(layout.precision)?;
    Some(shifted.format_padded(layout.width))
}

fn decode_number(raw: &str, descriptor: &Descriptor) -> Option<f64> {
    let layout = NumberLayout::of(descriptor)?;
    let stored = Decimal::parse(raw.trim())?;
    let scale = stored.scale.max(layout.offset.scale);
    let value = stored
        .rescale(scale)?
        .checked_sub(layout.offset.rescale(scale)?)?;
    value.to_f64()
}

/// Exact decimal: `units * 10^-scale`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Decimal {
    units: i128,
    scale: u32,
}

impl Decimal {
    const ZERO: Decimal = Decimal { units: 0, scale: 0 };

    /// Shortest round-trip representation of `n` as a decimal.
    fn from_f64(n: f64) -> Option<Self> {
        if !n.is_finite() {
            return None;
        }
        Self::parse(&n.to_string())
    }

    /// Parse `[-+]digits[.digits]`. Fractional digits beyond `MAX_SCALE` are
    /// dropped.
    fn parse(text: &str) -> Option<Self> {
        let (negative, body) = match text.as_bytes().first()? {
            b'-' => (true, &text[1..]),
            b'+' => (false, &text[1..]),
            _ => (false, text),
        };
        let (int_part, frac_part) = match body.split_once('.') {
            Some((int_part, frac_part)) => (int_part, frac_part),
            None => (body, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !is_digits(int_part) || !is_digits(frac_part) {
            return None;
        }
        // All ASCII from here, so any byte index is a char boundary.
        let frac_part = &frac_part[..frac_part.len().min(MAX_SCALE as usize)];
        let mut units: i128 = 0;
        for b in int_part.bytes().chain(frac_part.bytes()) {
            let digit = i128::from(b - b'0');
            units = units.checked_mul(10)?.checked_add(digit)?;
        }
        Some(Self {
            units: if negative { -units } else { units },
            scale: frac_part.len() as u32,
        })
    }

    /// Change the scale. Increasing is exact; decreasing rounds toward
    /// negative infinity.
    fn rescale(self, scale: u32) -> Option<Self> {
        let units = if scale >= self.scale {
            self.units.checked_mul(pow10(scale - self.scale)?)?
        } else {
            self.units.div_euclid(pow10(self.scale - scale)?)
        };
        Some(Self { units, scale })
    }

    fn checked_add(self, other: Self) -> Option<Self> {
        let scale = self.scale.max(other.scale);
        let units = self
            .rescale(scale)?
            .units
            .checked_add(other.rescale(scale)?.units)?;
        Some(Self { units, scale })
    }

    fn checked_sub(self, other: Self) -> Option<Self> {
        self.checked_add(Self {
            units: other.units.checked_neg()?,
            scale: other.scale,
        })
    }

    fn floor(self) -> Self {
        // Scale 0 never needs a multiplier, so rescaling cannot overflow.
        self.rescale(0).unwrap_or(self)
    }

    fn abs(self) -> Self {
        Self {
            units: self.units.abs(),
            scale: self.scale,
        }
    }

    /// Integer part zero-padded to `width`, then `.` and exactly `scale`
    /// fractional digits when the scale is non-zero.
    fn format_padded(self, width: usize) -> String {
        let sign = if self.units < 0 { "-" } else { "" };
        let magnitude = self.units.unsigned_abs();
        let divisor = 10u128.pow(self.scale);
        let int_part = magnitude / divisor;
        let mut text = format!("{sign}{int_part:0width$}");
        if self.scale > 0 {
            let frac_part = magnitude % divisor;
            let digits = self.scale as usize;
            text.push_str(&format!(".{frac_part:0digits$}"));
        }
        text
    }

    fn to_f64(self) -> Option<f64> {
        self.format_padded(1).parse().ok()
    }
}

fn pow10(exponent: u32) -> Option<i128> {
    10i128.checked_pow(exponent)
}
