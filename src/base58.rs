//! Base58 (Bitcoin alphabet) encoding for diagnostic long-hashes.
//!
//! No crate in the workspace already provides base58, and the decoded form
//! is never needed (long-hashes are write-only, quoted verbatim into bug
//! reports), so this is a small hand-rolled encoder rather than a new
//! dependency.

const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// Encode `bytes` as base58. Leading zero bytes become leading '1's, matching
/// the conventional Bitcoin encoding (so the 58^n math stays injective).
pub fn encode(bytes: &[u8]) -> String {
    let zero_count = bytes.iter().take_while(|&&b| b == 0).count();

    // Big-endian base-256 -> base-58 conversion via repeated division.
    let mut digits: Vec<u8> = vec![0];
    for &byte in bytes {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut out = String::with_capacity(zero_count + digits.len());
    out.extend(std::iter::repeat('1').take(zero_count));
    out.extend(digits.iter().rev().map(|&d| ALPHABET[d as usize] as char));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input() {
        assert_eq!(encode(&[]), "");
    }

    #[test]
    fn leading_zero_bytes_become_leading_ones() {
        assert_eq!(encode(&[0, 0, 1]), "112");
    }

    #[test]
    fn known_vector() {
        // "Hello World" -> well-known base58 vector.
        assert_eq!(encode(b"Hello World"), "JxF12TrwUP45BMd");
    }

    #[test]
    fn alphabet_excludes_confusable_chars() {
        for excluded in ['0', 'O', 'I', 'l'] {
            assert!(!ALPHABET.contains(&(excluded as u8)));
        }
    }
}
