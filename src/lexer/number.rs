//! Number literal scanning (spec.md §4.2 "Number literals").

use super::token::IntRadix;

pub enum NumberLiteral {
    Integer { value: u64, radix: IntRadix },
    Float(f64),
}

pub enum NumberError {
    /// The run of characters scanned did not form a valid literal.
    Malformed(String),
    /// The value does not fit in 64 bits.
    Overflow,
}

/// Scans a number literal starting at `chars[start]` (which must be an
/// ASCII digit). Returns the parsed literal and the number of `char`s
/// consumed.
pub fn scan_number(chars: &[char], start: usize) -> Result<(NumberLiteral, usize), NumberError> {
    debug_assert!(chars[start].is_ascii_digit());

    if chars[start] == '0' {
        match chars.get(start + 1) {
            Some('x') | Some('X') => return scan_radix(chars, start + 2, 16, IntRadix::Hex),
            Some('b') | Some('B') => return scan_radix(chars, start + 2, 2, IntRadix::Bin),
            Some('o') | Some('O') => return scan_radix(chars, start + 2, 8, IntRadix::Oct),
            Some('d') | Some('D') => return scan_radix(chars, start + 2, 10, IntRadix::Dec),
            _ => {}
        }
    }

    scan_decimal_or_float(chars, start)
}

fn scan_radix(
    chars: &[char],
    digits_start: usize,
    radix: u32,
    tag: IntRadix,
) -> Result<(NumberLiteral, usize), NumberError> {
    let mut i = digits_start;
    while chars.get(i).is_some_and(|c| c.is_digit(radix)) {
        i += 1;
    }
    if i == digits_start {
        return Err(NumberError::Malformed(format!(
            "expected at least one {}-digit after prefix",
            match tag {
                IntRadix::Hex => "hexadecimal",
                IntRadix::Bin => "binary",
                IntRadix::Oct => "octal",
                IntRadix::Dec => "decimal",
            }
        )));
    }
    let mut value: u64 = 0;
    for &c in &chars[digits_start..i] {
        let digit = c.to_digit(radix).unwrap() as u64;
        value = value.checked_mul(radix as u64).ok_or(NumberError::Overflow)?;
        value = value.checked_add(digit).ok_or(NumberError::Overflow)?;
    }
    Ok((NumberLiteral::Integer { value, radix: tag }, i - digits_start + 2))
}

fn scan_decimal_or_float(chars: &[char], start: usize) -> Result<(NumberLiteral, usize), NumberError> {
    let mut i = start;
    while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
        i += 1;
    }
    let mut is_float = false;

    if chars.get(i) == Some(&'.') && chars.get(i + 1).is_some_and(|c| c.is_ascii_digit()) {
        is_float = true;
        i += 1;
        while chars.get(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
    }

    if matches!(chars.get(i), Some('e') | Some('E')) {
        let mut j = i + 1;
        if matches!(chars.get(j), Some('+') | Some('-')) {
            j += 1;
        }
        if chars.get(j).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            while chars.get(j).is_some_and(|c| c.is_ascii_digit()) {
                j += 1;
            }
            i = j;
        }
    }

    let text: String = chars[start..i].iter().collect();
    if is_float {
        let value: f64 = text.parse().map_err(|_| NumberError::Malformed(text.clone()))?;
        Ok((NumberLiteral::Float(value), i - start))
    } else {
        let value: u64 = text.parse().map_err(|_| NumberError::Overflow)?;
        Ok((NumberLiteral::Integer { value, radix: IntRadix::Dec }, i - start))
    }
}

/// Canonicalizes an integer literal's value to hexadecimal textual form,
/// independent of its original radix (spec.md invariant 2).
pub fn canonical_hex(value: u64) -> String {
    format!("0x{value:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(s: &str) -> (u64, IntRadix, usize) {
        let chars: Vec<char> = s.chars().collect();
        match scan_number(&chars, 0) {
            Ok((NumberLiteral::Integer { value, radix }, consumed)) => (value, radix, consumed),
            _ => panic!("expected integer literal from {s:?}"),
        }
    }

    #[test]
    fn decimal() {
        assert_eq!(ints("42"), (42, IntRadix::Dec, 2));
    }

    #[test]
    fn hex() {
        assert_eq!(ints("0x2A"), (42, IntRadix::Hex, 4));
    }

    #[test]
    fn binary() {
        assert_eq!(ints("0b101010"), (42, IntRadix::Bin, 8));
    }

    #[test]
    fn octal() {
        assert_eq!(ints("0o52"), (42, IntRadix::Oct, 4));
    }

    #[test]
    fn explicit_decimal() {
        assert_eq!(ints("0d42"), (42, IntRadix::Dec, 4));
    }

    #[test]
    fn binary_overflow_errors() {
        let bits = "1".repeat(65);
        let chars: Vec<char> = bits.chars().collect();
        assert!(matches!(scan_number(&chars, 0), Err(NumberError::Overflow)));
    }

    #[test]
    fn float_with_fraction() {
        let chars: Vec<char> = "3.25".chars().collect();
        match scan_number(&chars, 0).ok().unwrap() {
            (NumberLiteral::Float(f), consumed) => {
                assert_eq!(f, 3.25);
                assert_eq!(consumed, 4);
            }
            _ => panic!("expected float"),
        }
    }

    #[test]
    fn float_with_exponent() {
        let chars: Vec<char> = "2e10".chars().collect();
        match scan_number(&chars, 0).ok().unwrap() {
            (NumberLiteral::Float(f), _) => assert_eq!(f, 2e10),
            _ => panic!("expected float"),
        }
    }

    #[test]
    fn integer_round_trip_via_canonical_hex() {
        let original = 0xDEAD_BEEFu64;
        let hex = canonical_hex(original);
        let digits = &hex[2..];
        let chars: Vec<char> = format!("0x{digits}").chars().collect();
        let (value, _, _) = ints(&chars.iter().collect::<String>());
        assert_eq!(value, original);
    }
}
