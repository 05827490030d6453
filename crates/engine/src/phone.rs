//! Phone number normalization.
//!
//! The records store keeps numbers in local format (no country code) while
//! the messaging gateway requires the country code prefix. The two
//! conventions are kept as two named operations over one digit-stripping
//! rule: compare with [`to_query_form`], send with [`to_dispatch_form`].

/// Strip every non-digit character.
pub fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Normalize for equality comparison against the records store, which keeps
/// local-format numbers: digits only, leading country code stripped.
pub fn to_query_form(raw: &str, country_code: &str) -> String {
    let d = digits(raw);
    match d.strip_prefix(country_code) {
        Some(rest) if !rest.is_empty() => rest.to_string(),
        _ => d,
    }
}

/// Normalize for outbound dispatch: digits only, country code guaranteed.
pub fn to_dispatch_form(raw: &str, country_code: &str) -> String {
    let local = to_query_form(raw, country_code);
    format!("{country_code}{local}")
}
