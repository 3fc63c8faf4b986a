use std::fmt;

/// Monetary amounts are integer minor units (cents for USD/EUR) to avoid
/// floating-point drift. 5000 minor units = 50.00.
///
/// Entry amounts are signed: debits are negative, credits are positive.
/// Transfer amounts and prices are always strictly positive.
pub type MinorUnits = i64;

/// Format minor units as a decimal string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_minor_units(amount: MinorUnits) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a decimal string into minor units.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
///
/// At most two decimal digits are kept; anything beyond is truncated.
pub fn parse_minor_units(input: &str) -> Result<MinorUnits, ParseAmountError> {
    let input = input.trim();
    let (negative, input) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let (units_str, decimal_str) = match input.split_once('.') {
        Some((units, decimals)) => (units, decimals),
        None => (input, ""),
    };

    if units_str.is_empty() && decimal_str.is_empty() {
        return Err(ParseAmountError::InvalidFormat);
    }

    // The fractional part must be pure digits; this also rejects a second
    // dot, which split_once would otherwise leave in place.
    if !decimal_str.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseAmountError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str
            .parse()
            .map_err(|_| ParseAmountError::InvalidFormat)?
    };

    let decimals: i64 = match decimal_str.len() {
        0 => 0,
        1 => {
            // A single digit like "5" means 50 minor units
            decimal_str
                .parse::<i64>()
                .map_err(|_| ParseAmountError::InvalidFormat)?
                * 10
        }
        _ => decimal_str[..2]
            .parse()
            .map_err(|_| ParseAmountError::InvalidFormat)?,
    };

    let amount = units
        .checked_mul(100)
        .and_then(|u| u.checked_add(decimals))
        .ok_or(ParseAmountError::Overflow)?;
    Ok(if negative { -amount } else { amount })
}

/// Compute `unit_price * quantity` for an order, refusing to overflow.
pub fn order_total(unit_price: MinorUnits, quantity: i64) -> Option<MinorUnits> {
    unit_price.checked_mul(quantity)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    InvalidFormat,
    Overflow,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::InvalidFormat => write!(f, "invalid money format"),
            ParseAmountError::Overflow => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for ParseAmountError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_minor_units() {
        assert_eq!(format_minor_units(5000), "50.00");
        assert_eq!(format_minor_units(1234), "12.34");
        assert_eq!(format_minor_units(100), "1.00");
        assert_eq!(format_minor_units(1), "0.01");
        assert_eq!(format_minor_units(0), "0.00");
        assert_eq!(format_minor_units(-5000), "-50.00");
        assert_eq!(format_minor_units(-1), "-0.01");
    }

    #[test]
    fn test_parse_minor_units() {
        assert_eq!(parse_minor_units("50.00"), Ok(5000));
        assert_eq!(parse_minor_units("50"), Ok(5000));
        assert_eq!(parse_minor_units("12.34"), Ok(1234));
        assert_eq!(parse_minor_units("12.5"), Ok(1250));
        assert_eq!(parse_minor_units("0.01"), Ok(1));
        assert_eq!(parse_minor_units(".50"), Ok(50));
        assert_eq!(parse_minor_units("-50.00"), Ok(-5000));
        assert_eq!(parse_minor_units("100.999"), Ok(10099)); // Truncates
    }

    #[test]
    fn test_parse_minor_units_invalid() {
        assert!(parse_minor_units("abc").is_err());
        assert!(parse_minor_units("12.34.56").is_err());
        assert!(parse_minor_units("12.3a").is_err());
        assert!(parse_minor_units("12.a4").is_err());
        assert!(parse_minor_units("").is_err());
        assert!(parse_minor_units("-").is_err());
    }

    #[test]
    fn test_order_total() {
        assert_eq!(order_total(300, 2), Some(600));
        assert_eq!(order_total(i64::MAX, 2), None);
    }
}
