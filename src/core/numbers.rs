//! Number <-> text conversion for typed node and attribute values
//!
//! Formatting follows C's `%.*g` so stored text matches what other XML
//! tooling writes; parsing is lenient (leading whitespace, sign, `0x`)
//! and clamps on overflow instead of failing.

/// Default significant digits when writing an `f64`
pub const DOUBLE_PRECISION: usize = 17;
/// Default significant digits when writing an `f32`
pub const FLOAT_PRECISION: usize = 9;

/// Format a double like C's `printf("%.{precision}g", value)`
pub fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return if value.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-inf" } else { "inf" }.to_string();
    }

    let precision = precision.max(1);
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Rounded scientific form decides the notation, as in C
    let sci = format!("{:.*e}", precision - 1, value);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= precision as i32 {
        let mantissa = strip_fraction_zeros(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.unsigned_abs())
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        let fixed = format!("{:.*}", decimals, value);
        strip_fraction_zeros(&fixed).to_string()
    }
}

fn strip_fraction_zeros(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Parse the magnitude and sign of an integer the lenient way
///
/// Returns (negative, magnitude) where magnitude saturates at `u128::MAX`.
fn parse_integer_parts(text: &str) -> (bool, u128) {
    let s = text.trim_start_matches([' ', '\t', '\n', '\r']);
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let (radix, digits) = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => (16, hex),
        None => (10, s),
    };

    let mut value: u128 = 0;
    for c in digits.chars() {
        let Some(d) = c.to_digit(radix) else { break };
        value = value.saturating_mul(radix as u128).saturating_add(d as u128);
    }
    (negative, value)
}

/// Integer types readable from text
pub trait ParseInteger: Sized {
    fn parse_clamped(text: &str) -> Self;
}

macro_rules! impl_parse_integer {
    ($($ty:ty),*) => {
        $(
            impl ParseInteger for $ty {
                fn parse_clamped(text: &str) -> Self {
                    let (negative, magnitude) = parse_integer_parts(text);
                    if negative {
                        let min = <$ty>::MIN as i128;
                        let value = if magnitude > min.unsigned_abs() {
                            min
                        } else {
                            -(magnitude as i128)
                        };
                        value.max(min) as $ty
                    } else {
                        magnitude.min(<$ty>::MAX as u128) as $ty
                    }
                }
            }
        )*
    };
}

impl_parse_integer!(i32, u32, i64, u64);

/// Parse a double, taking the longest valid prefix after whitespace
///
/// Text without a numeric prefix reads as 0.
pub fn parse_double(text: &str) -> f64 {
    let s = text.trim_start_matches([' ', '\t', '\n', '\r']);
    let b = s.as_bytes();
    let mut end = 0;

    if matches!(b.first(), Some(b'+' | b'-')) {
        end += 1;
    }

    let lower = s[end..].to_ascii_lowercase();
    if lower.starts_with("inf") || lower.starts_with("nan") {
        let word = if lower.starts_with("infinity") { 8 } else { 3 };
        return s[..end + word].parse().unwrap_or(0.0);
    }

    let digits_start = end;
    while b.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    if b.get(end) == Some(&b'.') {
        end += 1;
        while b.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
    }
    if end == digits_start || &s[digits_start..end] == "." {
        return 0.0;
    }
    if matches!(b.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(b.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while b.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    s[..end].parse().unwrap_or(0.0)
}

/// Boolean reading: true when the first character is one of `1tTyY`
pub fn parse_bool(text: &str) -> bool {
    matches!(text.as_bytes().first(), Some(b'1' | b't' | b'T' | b'y' | b'Y'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_general_simple() {
        assert_eq!(format_general(0.25, DOUBLE_PRECISION), "0.25");
        assert_eq!(format_general(1.0, DOUBLE_PRECISION), "1");
        assert_eq!(format_general(-3.5, DOUBLE_PRECISION), "-3.5");
        assert_eq!(format_general(0.0, DOUBLE_PRECISION), "0");
        assert_eq!(format_general(0.1, DOUBLE_PRECISION), "0.10000000000000001");
        assert_eq!(format_general(0.1, FLOAT_PRECISION), "0.1");
    }

    #[test]
    fn test_format_general_exponent() {
        assert_eq!(format_general(f64::MAX, DOUBLE_PRECISION), "1.7976931348623157e+308");
        assert_eq!(format_general(1e-5, 6), "1e-05");
        assert_eq!(format_general(123456789.0, 6), "1.23457e+08");
        assert_eq!(format_general(0.0001, 6), "0.0001");
    }

    #[test]
    fn test_double_round_trip() {
        for v in [f64::MAX, f64::MIN_POSITIVE, -f64::MAX, 1.0 / 3.0, 2.5e-300] {
            assert_eq!(parse_double(&format_general(v, DOUBLE_PRECISION)), v);
        }
    }

    #[test]
    fn test_parse_double_prefix() {
        assert_eq!(parse_double("  12.5abc"), 12.5);
        assert_eq!(parse_double("1e3"), 1000.0);
        assert_eq!(parse_double("1e"), 1.0);
        assert_eq!(parse_double("abc"), 0.0);
        assert_eq!(parse_double("."), 0.0);
        assert!(parse_double("-inf").is_infinite());
    }

    #[test]
    fn test_parse_integer_limits() {
        assert_eq!(i32::parse_clamped("-2147483648"), i32::MIN);
        assert_eq!(i32::parse_clamped("2147483647"), i32::MAX);
        assert_eq!(i32::parse_clamped("99999999999"), i32::MAX);
        assert_eq!(i32::parse_clamped("-99999999999"), i32::MIN);
        assert_eq!(u32::parse_clamped("4294967295"), u32::MAX);
        assert_eq!(u32::parse_clamped("-5"), 0);
        assert_eq!(i64::parse_clamped("-9223372036854775808"), i64::MIN);
        assert_eq!(u64::parse_clamped("18446744073709551615"), u64::MAX);
        assert_eq!(u64::parse_clamped("184467440737095516150"), u64::MAX);
    }

    #[test]
    fn test_parse_integer_forms() {
        assert_eq!(i32::parse_clamped("  +42xyz"), 42);
        assert_eq!(i32::parse_clamped("0x1F"), 31);
        assert_eq!(i32::parse_clamped("-0X10"), -16);
        assert_eq!(i32::parse_clamped("junk"), 0);
    }

    #[test]
    fn test_parse_bool() {
        for s in ["1", "true", "True", "yes", "Y"] {
            assert!(parse_bool(s));
        }
        for s in ["0", "false", "", "no", " true"] {
            assert!(!parse_bool(s));
        }
    }
}
