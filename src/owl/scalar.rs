use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

// rust_decimal holds at most 28 significant digits and a scale of at most 28.
const MAX_DIGITS: usize = 28;
const MAX_SCALE: usize = 28;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScalarError {
    #[error("unexpected unit in {value:?}, expected {expected:?}")]
    UnexpectedUnit { value: String, expected: String },

    #[error("malformed numeric value {0:?}")]
    Malformed(String),
}

/// Parse a numeric field, optionally carrying a trailing unit such as `%` or `mV`.
///
/// The unit comparison is case sensitive and nothing is trimmed, so `"100 %"`
/// is rejected. The returned value keeps the scale of the input: `"257.00"`
/// formats back as `257.00`.
pub fn parse(text: &str, unit: Option<&str>) -> Result<Decimal, ScalarError> {
    let number = match unit {
        Some(unit) => text
            .strip_suffix(unit)
            .ok_or_else(|| ScalarError::UnexpectedUnit {
                value: text.to_string(),
                expected: unit.to_string(),
            })?,
        None => text,
    };

    let (negative, digits) = match number.as_bytes().first() {
        Some(b'-') => (true, &number[1..]),
        Some(b'+') => (false, &number[1..]),
        _ => (false, number),
    };

    let (integral, fraction) =
        split_fixed_point(digits).ok_or_else(|| ScalarError::Malformed(text.to_string()))?;

    // "1." keeps scale 0, like "1"
    let normalized = if fraction.is_empty() {
        integral.to_string()
    } else {
        format!("{}.{}", integral, fraction)
    };

    let mut value =
        Decimal::from_str(&normalized).map_err(|_| ScalarError::Malformed(text.to_string()))?;
    value.set_sign_negative(negative);

    Ok(value)
}

// Digits with an optional '.', where either side of the point may be empty but
// not both. Returns the integral part without leading zeros ("0" if nothing is
// left) and the fraction as written.
fn split_fixed_point(s: &str) -> Option<(&str, &str)> {
    let (integral, fraction) = s.split_once('.').unwrap_or((s, ""));

    let digits_only = |p: &str| p.bytes().all(|b| b.is_ascii_digit());
    if !digits_only(integral) || !digits_only(fraction) {
        return None;
    }
    if integral.is_empty() && fraction.is_empty() {
        return None;
    }
    if fraction.len() > MAX_SCALE {
        return None;
    }

    let integral = match integral.trim_start_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };

    let significant = if integral == "0" {
        fraction.trim_start_matches('0').len()
    } else {
        integral.len() + fraction.len()
    };
    if significant > MAX_DIGITS {
        return None;
    }

    Some((integral, fraction))
}
