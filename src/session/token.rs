//! Session token generation.

use rand::rngs::OsRng;
use rand::RngCore;

/// Random bytes per token (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Generates an opaque token from the operating system's CSPRNG.
pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Cheap shape check so malformed cookies never reach the store.
pub fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_BYTES * 2
        && token
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_tokens_are_well_formed() {
        let token = generate();
        assert_eq!(token.len(), 64);
        assert!(is_well_formed(&token));
    }

    #[test]
    fn test_generated_tokens_are_unique() {
        let tokens: HashSet<String> = (0..256).map(|_| generate()).collect();
        assert_eq!(tokens.len(), 256);
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("abc"));
        assert!(!is_well_formed(&"G".repeat(64)));
        assert!(!is_well_formed(&"A".repeat(64)));
        assert!(!is_well_formed(&"a".repeat(65)));
    }
}
