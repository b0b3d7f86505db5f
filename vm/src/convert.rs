//! Number <-> string conversions shared by the interpreter and the builtins.

use memory::Value;

/// Render a float the way C's `%.14g` does.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return if n.is_sign_negative() { "-nan" } else { "nan" }.to_string();
    }
    if n.is_infinite() {
        return if n < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    const PRECISION: i32 = 14;
    // Rounding to the target precision first fixes the exponent.
    let sci = format!("{:.*e}", (PRECISION - 1) as usize, n);
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if exp < -4 || exp >= PRECISION {
        let mantissa = trim_fraction(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exp.abs())
    } else {
        let decimals = (PRECISION - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, n)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// Render any numeric value; `None` for non-numbers.
pub fn number_to_string(v: Value) -> Option<String> {
    match v {
        Value::Int(i) => Some(i.to_string()),
        Value::Number(n) => Some(format_number(n)),
        _ => None,
    }
}

fn is_space(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c)
}

fn trim(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&c| !is_space(c)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|&c| !is_space(c)).map_or(start, |p| p + 1);
    &bytes[start..end]
}

/// Parse a numeric string with the full literal syntax: decimal integers,
/// decimals with fraction and exponent, and `0x` hex. Surrounding
/// whitespace is ignored.
pub fn str_to_number(bytes: &[u8]) -> Option<Value> {
    let s = trim(bytes);
    let (neg, body) = match s.first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    if body.is_empty() {
        return None;
    }

    if body.len() > 2 && body[0] == b'0' && (body[1] == b'x' || body[1] == b'X') {
        let mut acc: u64 = 0;
        for &c in &body[2..] {
            let d = (c as char).to_digit(16)?;
            acc = acc.wrapping_mul(16).wrapping_add(d as u64);
        }
        let v = acc as i64;
        return Some(Value::int(if neg { v.wrapping_neg() } else { v }));
    }

    if !body
        .iter()
        .all(|&c| c.is_ascii_digit() || matches!(c, b'.' | b'e' | b'E' | b'+' | b'-'))
    {
        return None;
    }
    let text = std::str::from_utf8(s).ok()?;
    if !body.iter().any(|&c| matches!(c, b'.' | b'e' | b'E')) {
        if let Ok(i) = text.parse::<i64>() {
            return Some(Value::int(i));
        }
    }
    text.parse::<f64>().ok().map(Value::number)
}

/// Parse an integer in `base` (2..=36) with an optional leading minus.
pub fn str_to_int_radix(bytes: &[u8], base: u32) -> Option<i64> {
    let s = trim(bytes);
    let (neg, digits) = match s.first() {
        Some(b'-') => (true, &s[1..]),
        _ => (false, s),
    };
    if digits.is_empty() {
        return None;
    }
    let mut acc: i64 = 0;
    for &c in digits {
        let d = (c as char).to_digit(base)? as i64;
        acc = acc.checked_mul(base as i64)?.checked_add(d)?;
    }
    Some(if neg { -acc } else { acc })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_g14() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(-0.7), "-0.7");
        assert_eq!(format_number(1.0 / 3.0), "0.33333333333333");
        assert_eq!(format_number(1e14), "1e+14");
        assert_eq!(format_number(123456789012346.0), "1.2345678901235e+14");
        assert_eq!(format_number(0.0001), "0.0001");
        assert_eq!(format_number(0.00001), "1e-05");
        assert_eq!(format_number(f64::MAX), "1.7976931348623e+308");
        assert_eq!(format_number(f64::INFINITY), "inf");
    }

    #[test]
    fn test_str_to_number() {
        assert_eq!(str_to_number(b" 10 "), Some(Value::int(10)));
        assert_eq!(str_to_number(b"0x1F"), Some(Value::int(31)));
        assert_eq!(str_to_number(b"-0x10"), Some(Value::int(-16)));
        assert_eq!(str_to_number(b"1e2"), Some(Value::number(100.0)));
        assert_eq!(str_to_number(b"3.5"), Some(Value::number(3.5)));
        assert_eq!(str_to_number(b"inf"), None);
        assert_eq!(str_to_number(b"nan"), None);
        assert_eq!(str_to_number(b""), None);
        assert_eq!(str_to_number(b"12abc"), None);
    }

    #[test]
    fn test_str_to_int_radix() {
        assert_eq!(str_to_int_radix(b"ff", 16), Some(255));
        assert_eq!(str_to_int_radix(b"-101", 2), Some(-5));
        assert_eq!(str_to_int_radix(b"z", 36), Some(35));
        assert_eq!(str_to_int_radix(b"2", 2), None);
        assert_eq!(str_to_int_radix(b"", 8), None);
    }
}
