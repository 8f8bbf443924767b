//! Request parsing and chained division.

use std::fmt::Write as _;

/// Minimum operand count for a computable request.
pub const MIN_OPERANDS: usize = 2;

/// Extract every base-10 integer from `input`, in order.
///
/// Scanning follows `strtol`: skip leading whitespace, accept one optional
/// sign, then consume digits. A position where no number starts is skipped
/// one byte at a time, so stray characters are ignored rather than rejected.
/// Values outside `i64` saturate.
pub fn parse_numbers(input: &[u8]) -> Vec<i64> {
    let mut numbers = Vec::new();
    let mut i = 0;
    while i < input.len() {
        if input[i].is_ascii_whitespace() {
            i += 1;
            continue;
        }
        match scan_integer(&input[i..]) {
            Some((value, consumed)) => {
                numbers.push(value);
                i += consumed;
            }
            None => i += 1,
        }
    }
    numbers
}

/// Parse one optionally signed integer at the start of `bytes`.
///
/// Returns the value and the number of bytes consumed, or `None` when no
/// digits follow the optional sign.
fn scan_integer(bytes: &[u8]) -> Option<(i64, usize)> {
    let (negative, start) = match bytes.first()? {
        b'-' => (true, 1),
        b'+' => (false, 1),
        _ => (false, 0),
    };

    let digits = bytes[start..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    if digits == 0 {
        return None;
    }

    // Accumulate toward the sign so i64::MIN is representable.
    let mut value: i64 = 0;
    for &b in &bytes[start..start + digits] {
        let digit = i64::from(b - b'0');
        value = if negative {
            value.saturating_mul(10).saturating_sub(digit)
        } else {
            value.saturating_mul(10).saturating_add(digit)
        };
    }
    Some((value, start + digits))
}

/// Outcome of folding the operands under division.
#[derive(Debug, Clone, PartialEq)]
pub enum Computation {
    /// Fewer than [`MIN_OPERANDS`] numbers were supplied.
    TooFewOperands,
    /// Every divisor was non-zero.
    Quotient { expression: String, value: f64 },
    /// A divisor was zero; `expression` runs through the offending operand.
    DivisionByZero { expression: String, index: usize },
}

/// Divide left to right: `n0 / n1 / ... / nk`.
///
/// The expression text starts with `"Operation: n0"` and grows by `" / ni"`
/// for every operand consumed, including a zero divisor.
pub fn chained_division(numbers: &[i64]) -> Computation {
    let Some((&first, rest)) = numbers.split_first() else {
        return Computation::TooFewOperands;
    };
    if numbers.len() < MIN_OPERANDS {
        return Computation::TooFewOperands;
    }

    let mut expression = format!("Operation: {}", first);
    let mut value = first as f64;

    for (offset, &divisor) in rest.iter().enumerate() {
        let _ = write!(expression, " / {}", divisor);
        if divisor == 0 {
            return Computation::DivisionByZero {
                expression,
                index: offset + 1,
            };
        }
        value /= divisor as f64;
    }

    Computation::Quotient { expression, value }
}

/// Format a quotient with six fractional digits.
pub fn format_value(value: f64) -> String {
    format!("{:.6}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_numbers() {
        assert_eq!(parse_numbers(b"10 2 5\n"), vec![10, 2, 5]);
    }

    #[test]
    fn test_parse_signs_and_tabs() {
        assert_eq!(parse_numbers(b"-8\t+4  -1\r\n"), vec![-8, 4, -1]);
    }

    #[test]
    fn test_parse_skips_stray_characters() {
        assert_eq!(parse_numbers(b"12abc 3"), vec![12, 3]);
        assert_eq!(parse_numbers(b"x 7 y"), vec![7]);
        assert_eq!(parse_numbers(b"- + 9"), vec![9]);
    }

    #[test]
    fn test_parse_adjacent_signed_numbers_split() {
        // "5-3" is 5 followed by -3, as strtol would read it.
        assert_eq!(parse_numbers(b"5-3"), vec![5, -3]);
        assert_eq!(parse_numbers(b"+-5"), vec![-5]);
    }

    #[test]
    fn test_parse_saturates_out_of_range() {
        assert_eq!(parse_numbers(b"99999999999999999999"), vec![i64::MAX]);
        assert_eq!(parse_numbers(b"-99999999999999999999"), vec![i64::MIN]);
        assert_eq!(parse_numbers(b"-9223372036854775808"), vec![i64::MIN]);
    }

    #[test]
    fn test_parse_empty_and_blank() {
        assert!(parse_numbers(b"").is_empty());
        assert!(parse_numbers(b"   \n").is_empty());
    }

    #[test]
    fn test_division_left_to_right() {
        match chained_division(&[10, 2, 5]) {
            Computation::Quotient { expression, value } => {
                assert_eq!(expression, "Operation: 10 / 2 / 5");
                assert_eq!(format_value(value), "1.000000");
            }
            other => panic!("Expected Quotient, got {:?}", other),
        }
    }

    #[test]
    fn test_division_fractional_and_negative() {
        match chained_division(&[100, -3]) {
            Computation::Quotient { expression, value } => {
                assert_eq!(expression, "Operation: 100 / -3");
                assert_eq!(format_value(value), "-33.333333");
            }
            other => panic!("Expected Quotient, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_dividend_is_allowed() {
        match chained_division(&[0, 5]) {
            Computation::Quotient { value, .. } => assert_eq!(value, 0.0),
            other => panic!("Expected Quotient, got {:?}", other),
        }
    }

    #[test]
    fn test_division_by_zero_stops_at_operand() {
        assert_eq!(
            chained_division(&[8, 0, 4]),
            Computation::DivisionByZero {
                expression: "Operation: 8 / 0".to_string(),
                index: 1,
            }
        );
        assert_eq!(
            chained_division(&[100, 2, 5, 0, 7]),
            Computation::DivisionByZero {
                expression: "Operation: 100 / 2 / 5 / 0".to_string(),
                index: 3,
            }
        );
    }

    #[test]
    fn test_too_few_operands() {
        assert_eq!(chained_division(&[]), Computation::TooFewOperands);
        assert_eq!(chained_division(&[7]), Computation::TooFewOperands);
    }
}
