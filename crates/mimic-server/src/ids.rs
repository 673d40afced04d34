//! Identifier generation for completion envelopes.

use rand::Rng;

/// Generate an id like `chatcmpl-1f2e3d4c5b6a7988` (prefix plus 16 hex chars)
pub fn generate_id(prefix: &str) -> String {
    let bytes: [u8; 8] = rand::thread_rng().gen();
    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!("{prefix}-{hex}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_shape() {
        let id = generate_id("chatcmpl");
        let (prefix, hex) = id.split_once('-').unwrap();
        assert_eq!(prefix, "chatcmpl");
        assert_eq!(hex.len(), 16);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(generate_id("cmpl"), generate_id("cmpl"));
    }
}
