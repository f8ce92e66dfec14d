//! Phone number utilities
//!
//! Verification sessions are keyed by phone number, so every number has to be
//! reduced to one canonical form before it is used as a key. Otherwise
//! `+91 98765 43210` and `+919876543210` would open two independent sessions.

use once_cell::sync::Lazy;
use regex::Regex;

// E.164 with explicit country code: no leading zero after '+'
static INTERNATIONAL_PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+[1-9]\d{5,14}$").expect("valid regex"));

// Bare digits as captured by registration desks that omit the country code
static LOCAL_PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{6,15}$").expect("valid regex"));

/// Normalize a phone number by removing common formatting characters
///
/// Only digits and a single leading `+` survive. An international `00`
/// prefix is rewritten to `+`.
pub fn normalize_phone_number(phone: &str) -> String {
    let trimmed = phone.trim();
    let has_plus = trimmed.starts_with('+');
    let digits: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();

    if has_plus {
        format!("+{}", digits)
    } else if let Some(rest) = digits.strip_prefix("00") {
        format!("+{}", rest)
    } else {
        digits
    }
}

/// Reduce a phone number to the canonical form used as a session key
///
/// Returns `None` when the normalized number is not E.164-like. No country
/// code is ever guessed: `9876543210` and `+919876543210` are distinct keys.
pub fn canonical_phone_number(phone: &str) -> Option<String> {
    let normalized = normalize_phone_number(phone);
    if INTERNATIONAL_PHONE_REGEX.is_match(&normalized) || LOCAL_PHONE_REGEX.is_match(&normalized) {
        Some(normalized)
    } else {
        None
    }
}

/// Check if a phone number can be used for verification
pub fn is_valid_phone(phone: &str) -> bool {
    canonical_phone_number(phone).is_some()
}

/// Mask a phone number for logs (e.g., +91****3210)
pub fn mask_phone_number(phone: &str) -> String {
    let normalized = normalize_phone_number(phone);
    if normalized.len() >= 7 {
        format!(
            "{}****{}",
            &normalized[0..3],
            &normalized[normalized.len() - 4..]
        )
    } else {
        "****".to_string()
    }
}
