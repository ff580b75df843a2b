//! Canonicalization of Vietnamese phone numbers.
//!
//! The normalized form is used for blacklist lookups and order-history
//! matching only; the phone string the operator entered is what gets stored.

/// Strip separators and rewrite the international `+84` prefix to a leading
/// zero. Anything that does not look like a `+84` national number is returned
/// with separators stripped and nothing else changed.
pub fn normalize_phone(raw: &str) -> String {
    let stripped: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '.' | '-' | '(' | ')'))
        .collect();

    if let Some(rest) = stripped.strip_prefix("+84") {
        if rest.len() == 9 && rest.bytes().all(|b| b.is_ascii_digit()) {
            return format!("0{rest}");
        }
    }

    stripped
}

/// A phone is valid iff its normalized form is `0` followed by exactly nine
/// digits. Invalid phones are not rejected at intake; they simply fail the
/// format and lookup checks that rely on this.
pub fn is_valid_phone(raw: &str) -> bool {
    let normalized = normalize_phone(raw);
    normalized.len() == 10
        && normalized.starts_with('0')
        && normalized.bytes().all(|b| b.is_ascii_digit())
}
