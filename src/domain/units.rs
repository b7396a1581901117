use std::fmt;

/// Money is represented as integer cents to avoid floating-point precision issues.
/// A fuel bill of 4.50 is stored as 450.
pub type Cents = i64;

/// Fuel volume in millilitres. 15 litres = 15000.
pub type Millilitres = i64;

/// Odometer readings and distances, in whole kilometres.
pub type Kilometres = i64;

const CENT_DIGITS: u32 = 2;
const MILLILITRE_DIGITS: u32 = 3;

/// Format cents as a human-readable amount.
/// Example: 450 -> "4.50", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    format_fixed(cents, CENT_DIGITS)
}

/// Parse a decimal string into cents.
/// Example: "4.5" -> 450, "12" -> 1200
pub fn parse_cents(input: &str) -> Result<Cents, ParseUnitError> {
    parse_fixed(input, CENT_DIGITS)
}

/// Format millilitres as litres with three decimals.
/// Example: 15000 -> "15.000"
pub fn format_litres(ml: Millilitres) -> String {
    format_fixed(ml, MILLILITRE_DIGITS)
}

/// Parse a litre amount into millilitres.
/// Example: "15" -> 15000, "12.3456" -> 12345 (truncates)
pub fn parse_litres(input: &str) -> Result<Millilitres, ParseUnitError> {
    parse_fixed(input, MILLILITRE_DIGITS)
}

/// Convert millilitres to litres for ratio math.
pub fn litres_f64(ml: Millilitres) -> f64 {
    ml as f64 / 1000.0
}

fn format_fixed(value: i64, digits: u32) -> String {
    let scale = 10_i64.pow(digits);
    let sign = if value < 0 { "-" } else { "" };
    let abs = value.abs();
    format!(
        "{}{}.{:0width$}",
        sign,
        abs / scale,
        abs % scale,
        width = digits as usize
    )
}

fn parse_fixed(input: &str, digits: u32) -> Result<i64, ParseUnitError> {
    let input = input.trim();
    let negative = input.starts_with('-');
    let input = input.trim_start_matches('-');
    let scale = 10_i64.pow(digits);

    let (whole, fraction) = match input.split_once('.') {
        Some((w, f)) => (w, f),
        None => (input, ""),
    };
    if fraction.contains('.') || (whole.is_empty() && fraction.is_empty()) {
        return Err(ParseUnitError::InvalidFormat);
    }

    let units: i64 = if whole.is_empty() {
        0
    } else {
        whole.parse().map_err(|_| ParseUnitError::InvalidFormat)?
    };

    // Pad short fractions ("5" -> "500"), truncate long ones
    let mut fraction: String = fraction.chars().take(digits as usize).collect();
    if !fraction.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseUnitError::InvalidFormat);
    }
    while fraction.len() < digits as usize {
        fraction.push('0');
    }
    let fractional: i64 = fraction.parse().map_err(|_| ParseUnitError::InvalidFormat)?;

    let value = units
        .checked_mul(scale)
        .and_then(|v| v.checked_add(fractional))
        .ok_or(ParseUnitError::Overflow)?;
    Ok(if negative { -value } else { value })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseUnitError {
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseUnitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseUnitError::InvalidFormat => write!(f, "invalid decimal format"),
            ParseUnitError::Overflow => write!(f, "value too large"),
        }
    }
}

impl std::error::Error for ParseUnitError {}
