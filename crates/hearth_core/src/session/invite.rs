//! Invite code normalization.

use once_cell::sync::Lazy;
use regex::Regex;

static INVITE_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9]{4,16}$").expect("valid invite code regex"));

/// Trims and uppercases `raw`; returns `None` unless it is 4 to 16 ASCII
/// letters or digits.
pub fn normalize_invite_code(raw: &str) -> Option<String> {
    let normalized = raw.trim().to_ascii_uppercase();
    if INVITE_CODE_RE.is_match(&normalized) {
        Some(normalized)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::normalize_invite_code;

    #[test]
    fn accepts_mixed_case_with_whitespace() {
        assert_eq!(normalize_invite_code(" abc123 ").as_deref(), Some("ABC123"));
    }

    #[test]
    fn rejects_wrong_length_and_symbols() {
        assert!(normalize_invite_code("AB1").is_none());
        assert!(normalize_invite_code("ABCDEFGHIJ1234567").is_none());
        assert!(normalize_invite_code("ABC-12").is_none());
        assert_eq!(normalize_invite_code("badcode").as_deref(), Some("BADCODE"));
        assert!(normalize_invite_code("").is_none());
    }
}
