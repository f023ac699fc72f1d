//! Money parsing and formatting.
//!
//! All monetary amounts are stored as integer cents. Order exports carry
//! decimal-dollar strings ("575.00", "$1,234.50"); parsing goes through a
//! textual dollars/fraction split so no float ever touches a stored amount.

use crate::{Error, Result};

/// Parse a decimal-dollar string into integer cents.
///
/// Accepts an optional leading `$`, thousands separators, surrounding
/// whitespace, and a leading sign. Fractions beyond two digits are rounded
/// half-up on the third digit (half away from zero for negatives).
///
/// # Examples
///
/// ```
/// use hogline_common::money::dollars_to_cents;
///
/// assert_eq!(dollars_to_cents("575.00").unwrap(), 57500);
/// assert_eq!(dollars_to_cents("$1,234.50").unwrap(), 123450);
/// assert_eq!(dollars_to_cents("-5").unwrap(), -500);
/// ```
pub fn dollars_to_cents(input: &str) -> Result<i64> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned.is_empty() {
        return Err(Error::InvalidInput(format!(
            "empty monetary value: {:?}",
            input
        )));
    }

    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };

    let (dollar_part, fraction_part) = match digits.split_once('.') {
        Some((d, f)) => (d, f),
        None => (digits, ""),
    };

    if dollar_part.is_empty() && fraction_part.is_empty() {
        return Err(Error::InvalidInput(format!(
            "not a monetary value: {:?}",
            input
        )));
    }
    if !dollar_part.chars().all(|c| c.is_ascii_digit())
        || !fraction_part.chars().all(|c| c.is_ascii_digit())
    {
        return Err(Error::InvalidInput(format!(
            "not a monetary value: {:?}",
            input
        )));
    }

    let dollars: i64 = if dollar_part.is_empty() {
        0
    } else {
        dollar_part.parse().map_err(|_| {
            Error::InvalidInput(format!("dollar amount out of range: {:?}", input))
        })?
    };

    let mut fraction = fraction_part.chars();
    let tens = fraction.next().and_then(|c| c.to_digit(10)).unwrap_or(0) as i64;
    let units = fraction.next().and_then(|c| c.to_digit(10)).unwrap_or(0) as i64;
    let mut cents = tens * 10 + units;

    // Round half-up on the third fractional digit
    if let Some(c) = fraction.next() {
        if c.to_digit(10).unwrap_or(0) >= 5 {
            cents += 1;
        }
    }

    let magnitude = dollars
        .checked_mul(100)
        .and_then(|d| d.checked_add(cents))
        .ok_or_else(|| Error::InvalidInput(format!("dollar amount out of range: {:?}", input)))?;

    Ok(if negative { -magnitude } else { magnitude })
}

/// Format integer cents as a dollar string ("$575.00", "-$5.25").
pub fn format_cents(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let magnitude = cents.unsigned_abs();
    format!("{}${}.{:02}", sign, magnitude / 100, magnitude % 100)
}
