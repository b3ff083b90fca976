use std::fmt;

/// Amounts are integer cents to avoid floating-point drift in balance
/// chains. 150.50 on the wire becomes 15050 in the store.
pub type Cents = i64;

/// Format cents as a decimal string: 15050 -> "150.50", -100 -> "-1.00".
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a decimal amount string into cents.
///
/// Payment amounts arrive from the boundary as text ("150.50", "80",
/// ".5"), so this is the single place where text becomes a number.
/// More than two decimal digits are truncated, not rounded.
pub fn parse_cents(input: &str) -> Result<Cents, ParseAmountError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(ParseAmountError::Empty);
    }

    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let (units_str, decimal_str) = match digits.split_once('.') {
        Some((u, d)) => {
            if d.contains('.') {
                return Err(ParseAmountError::Malformed);
            }
            (u, d)
        }
        None => (digits, ""),
    };
    if units_str.is_empty() && decimal_str.is_empty() {
        return Err(ParseAmountError::Malformed);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| ParseAmountError::Malformed)?
    };

    let decimal: i64 = match decimal_str.len() {
        0 => 0,
        1 => {
            decimal_str
                .parse::<i64>()
                .map_err(|_| ParseAmountError::Malformed)?
                * 10
        }
        _ => decimal_str
            .get(..2)
            .ok_or(ParseAmountError::Malformed)?
            .parse()
            .map_err(|_| ParseAmountError::Malformed)?,
    };

    let cents = units * 100 + decimal;
    Ok(if negative { -cents } else { cents })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseAmountError {
    Empty,
    Malformed,
}

impl fmt::Display for ParseAmountError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseAmountError::Empty => write!(f, "empty amount"),
            ParseAmountError::Malformed => write!(f, "invalid amount format"),
        }
    }
}

impl std::error::Error for ParseAmountError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(15050), "150.50");
        assert_eq!(format_cents(8000), "80.00");
        assert_eq!(format_cents(1), "0.01");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-10000), "-100.00");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("150.50"), Ok(15050));
        assert_eq!(parse_cents("80"), Ok(8000));
        assert_eq!(parse_cents("12.5"), Ok(1250));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("0.01"), Ok(1));
        assert_eq!(parse_cents("-100"), Ok(-10000));
        assert_eq!(parse_cents("99.999"), Ok(9999)); // truncates
        assert_eq!(parse_cents("  42.00  "), Ok(4200));
    }

    #[test]
    fn test_parse_cents_invalid() {
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("").is_err());
        assert!(parse_cents("12.34.56").is_err());
        assert!(parse_cents("1,5").is_err());
        assert!(parse_cents("-").is_err());
        assert!(parse_cents(".").is_err());
    }
}
