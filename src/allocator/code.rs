use rand::{CryptoRng, Rng};

/// The symbols short codes are made of: ASCII digits and letters,
/// case-sensitive.
pub const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Draws a code of `len` symbols, each independently and uniformly
/// from [`ALPHABET`].
///
/// Only cryptographically secure generators are accepted: a
/// predictable sequence would let anyone register the codes that are
/// about to be handed out.
pub(crate) fn random_code<R: Rng + CryptoRng>(rng: &mut R, len: usize) -> String {
    (0..len)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

/// Returns `true` if every character of `code` is in [`ALPHABET`].
pub fn is_code(code: &str) -> bool {
    code.bytes().all(|b| b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::OsRng;
    use std::collections::HashSet;

    #[test]
    fn alphabet_is_letters_and_digits() {
        let symbols: HashSet<u8> = ALPHABET.iter().copied().collect();
        assert_eq!(62, symbols.len());
        assert!(symbols.iter().all(|b| b.is_ascii_alphanumeric()));
    }

    #[test]
    fn codes_have_the_requested_length() {
        for len in 1..=12 {
            let code = random_code(&mut OsRng, len);
            assert_eq!(len, code.len());
            assert!(is_code(&code), "{}", code);
        }
    }

    #[test]
    fn every_symbol_shows_up() {
        let mut seen = HashSet::new();
        for _ in 0..500 {
            seen.extend(random_code(&mut OsRng, 8).bytes());
        }
        assert_eq!(62, seen.len());
    }
}
