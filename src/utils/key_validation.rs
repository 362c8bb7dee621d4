// Stream key and app name validation

/// Default length limit for stream keys and app names
pub const DEFAULT_MAX_KEY_LENGTH: usize = 128;

/// Validates a stream key or app name
///
/// # Arguments
///
/// * `key` - The key to validate
/// * `max_len` - Max allowed length
///
/// # Return value
///
/// Returns true if the key is valid, false otherwise
pub fn validate_key_string(key: &str, max_len: usize) -> bool {
    if key.is_empty() || key.len() > max_len {
        return false;
    }

    key.chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key_string() {
        let max_len = 32;

        assert!(!validate_key_string("", max_len));
        assert!(!validate_key_string(
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa",
            max_len
        ));
        assert!(!validate_key_string("has space", max_len));
        assert!(!validate_key_string("slash/key", max_len));
        assert!(validate_key_string("a", max_len));
        assert!(validate_key_string("abc-DEF-1234567890_", max_len));
    }
}
