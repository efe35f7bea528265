use crate::VitalValue;

/// Read one vital as a number, falling back to `default` for anything that
/// does not carry a reading.
///
/// Numbers pass through unchanged (NaN excepted). Strings use integer-prefix
/// parsing: leading whitespace is skipped, an optional sign and a run of
/// decimal digits are read, and whatever follows is ignored, so `"38.7"`
/// reads as 38 and `"120 mmHg"` as 120.
pub fn parse_vital_int(raw: Option<&VitalValue>, default: f64) -> f64 {
    match raw {
        Some(VitalValue::Number(value)) if !value.is_nan() => *value,
        Some(VitalValue::Text(text)) => integer_prefix(text).unwrap_or(default),
        _ => default,
    }
}

fn integer_prefix(text: &str) -> Option<f64> {
    let trimmed = text.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };

    let mut seen_digit = false;
    let mut value = 0.0_f64;
    for byte in digits.bytes().take_while(u8::is_ascii_digit) {
        seen_digit = true;
        value = value * 10.0 + f64::from(byte - b'0');
    }

    if !seen_digit {
        return None;
    }
    Some(if negative { -value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> VitalValue {
        VitalValue::Text(value.to_string())
    }

    #[test]
    fn parses_integer_strings() {
        assert_eq!(parse_vital_int(Some(&text("123")), 0.0), 123.0);
        assert_eq!(parse_vital_int(Some(&text("0")), 0.0), 0.0);
        assert_eq!(parse_vital_int(Some(&text("999")), 0.0), 999.0);
    }

    #[test]
    fn numbers_pass_through() {
        assert_eq!(parse_vital_int(Some(&VitalValue::Number(456.0)), 0.0), 456.0);
        assert_eq!(parse_vital_int(Some(&VitalValue::Number(0.0)), 15.0), 0.0);
        assert_eq!(parse_vital_int(Some(&VitalValue::Number(-4.0)), 0.0), -4.0);
        assert_eq!(parse_vital_int(Some(&VitalValue::Number(39.5)), 0.0), 39.5);
        assert_eq!(
            parse_vital_int(Some(&VitalValue::Number(f64::NAN)), 15.0),
            15.0
        );
    }

    #[test]
    fn invalid_input_yields_default() {
        assert_eq!(parse_vital_int(Some(&text("")), 0.0), 0.0);
        assert_eq!(parse_vital_int(Some(&text("abc")), 0.0), 0.0);
        assert_eq!(parse_vital_int(None, 0.0), 0.0);
        assert_eq!(parse_vital_int(Some(&VitalValue::Unsupported), 0.0), 0.0);
        assert_eq!(parse_vital_int(Some(&text("-")), 0.0), 0.0);
        assert_eq!(parse_vital_int(Some(&text("   ")), 0.0), 0.0);
    }

    #[test]
    fn honours_custom_default() {
        assert_eq!(parse_vital_int(Some(&text("")), 10.0), 10.0);
        assert_eq!(parse_vital_int(Some(&text("invalid")), 15.0), 15.0);
    }

    #[test]
    fn reads_leading_integer_and_ignores_noise() {
        assert_eq!(parse_vital_int(Some(&text("  42")), 0.0), 42.0);
        assert_eq!(parse_vital_int(Some(&text("120 mmHg")), 0.0), 120.0);
        assert_eq!(parse_vital_int(Some(&text("38.7")), 0.0), 38.0);
        assert_eq!(parse_vital_int(Some(&text("-12")), 0.0), -12.0);
        assert_eq!(parse_vital_int(Some(&text("+7")), 0.0), 7.0);
        assert_eq!(parse_vital_int(Some(&text("0x1A")), 5.0), 0.0);
        assert_eq!(parse_vital_int(Some(&text("mmHg 120")), 0.0), 0.0);
    }
}
