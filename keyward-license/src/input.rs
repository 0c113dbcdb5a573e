//! Normalisation of caller-supplied plaintext.
//!
//! Keys are trimmed before hashing so that the same key always maps to the
//! same digest regardless of stray whitespace from forms or URLs.

use crate::error::{LicenseError, LicenseResult};

/// Longest accepted key or instance identifier, in bytes.
pub const MAX_KEY_LEN: usize = 512;

/// Trims `value` and rejects empty, oversized or control-character input.
pub(crate) fn plaintext<'a>(field: &'static str, value: &'a str) -> LicenseResult<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(LicenseError::Validation(format!("{field} is required")));
    }
    if value.len() > MAX_KEY_LEN {
        return Err(LicenseError::Validation(format!(
            "{field} exceeds {MAX_KEY_LEN} bytes"
        )));
    }
    if value.chars().any(char::is_control) {
        return Err(LicenseError::Validation(format!(
            "{field} contains control characters"
        )));
    }
    Ok(value)
}

/// First characters of a digest, safe to log.
pub(crate) fn fingerprint(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_surrounding_whitespace() {
        assert_eq!(plaintext("license_key", "  ABC-123\n").unwrap(), "ABC-123");
    }

    #[test]
    fn rejects_blank() {
        let err = plaintext("license_key", "   ").unwrap_err();
        assert!(err.to_string().contains("license_key is required"));
    }

    #[test]
    fn rejects_oversized() {
        let long = "x".repeat(MAX_KEY_LEN + 1);
        assert!(plaintext("instance_key", &long).is_err());
        assert!(plaintext("instance_key", &long[..MAX_KEY_LEN]).is_ok());
    }

    #[test]
    fn rejects_embedded_control_characters() {
        assert!(plaintext("instance_key", "abc\u{0}def").is_err());
    }

    #[test]
    fn fingerprint_truncates() {
        assert_eq!(fingerprint("0123456789abcdef"), "0123456789ab");
        assert_eq!(fingerprint("abc"), "abc");
    }
}
