//! Input validation for order fields.
//!
//! All predicates are total: they never panic and never allocate errors,
//! they only classify the text.

use std::sync::LazyLock;

use regex::Regex;
use url::{Host, Url};

/// Maximum allowed length for email addresses.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum allowed length for the local part of an email address.
pub const MAX_EMAIL_LOCAL_LENGTH: usize = 64;

/// Maximum allowed length for product links.
pub const MAX_LINK_LENGTH: usize = 2083;

/// Allowed phone number length, including a leading `+` or `-`.
pub const PHONE_LENGTH: std::ops::RangeInclusive<usize> = 9..=15;

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[0-9][0-9-]*$").expect("valid phone pattern"));

/// Characters allowed in the local part besides ASCII alphanumerics.
const EMAIL_LOCAL_SPECIALS: &str = "!#$%&'*+/=?^_`{|}~.-";

/// Check whether text is a product link.
///
/// Accepts `http`/`https` URLs. A bare host such as `shop.example.com/item`
/// is accepted as if it had an `http://` prefix, but then the host must be a
/// domain name with a top-level domain; bare numbers like `12` are not links.
pub fn is_link(text: &str) -> bool {
    let text = text.trim();

    if text.is_empty() || text.len() > MAX_LINK_LENGTH || text.chars().any(char::is_whitespace) {
        return false;
    }

    let has_scheme = text.contains("://");
    let parsed = if has_scheme {
        Url::parse(text)
    } else {
        Url::parse(&format!("http://{}", text))
    };

    let Ok(url) = parsed else {
        return false;
    };

    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }

    match url.host() {
        Some(Host::Domain(domain)) => is_domain(domain),
        Some(Host::Ipv4(_)) | Some(Host::Ipv6(_)) => has_scheme,
        None => false,
    }
}

/// Parse a quantity: a finite, non-negative real number.
pub fn parse_quantity(text: &str) -> Option<f64> {
    let value: f64 = text.trim().parse().ok()?;

    if !value.is_finite() || value < 0.0 {
        return None;
    }

    // "-0" parses as negative zero
    Some(value.abs())
}

/// Check whether text is a quantity.
pub fn is_quantity(text: &str) -> bool {
    parse_quantity(text).is_some()
}

/// Check whether text is an email address (case-insensitive).
///
/// Checks:
/// - Exactly one `@` with a non-empty local part and domain
/// - Local part uses the usual RFC 5322 atom characters, no leading,
///   trailing, or doubled dots
/// - Domain is a dotted host name ending in an alphabetic top-level domain
/// - Not too long
pub fn is_email(text: &str) -> bool {
    let email = text.trim().to_lowercase();

    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if domain.contains('@') {
        return false;
    }

    is_email_local(local) && is_domain(domain)
}

/// Check whether text is a phone number.
///
/// An optional leading `+` or `-`, then digits and hyphens starting with a digit,
/// 9 to 15 characters in total.
pub fn is_phone(text: &str) -> bool {
    let phone = text.trim();
    PHONE_LENGTH.contains(&phone.len()) && PHONE_PATTERN.is_match(phone)
}

fn is_email_local(local: &str) -> bool {
    if local.is_empty() || local.len() > MAX_EMAIL_LOCAL_LENGTH {
        return false;
    }

    if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }

    local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || EMAIL_LOCAL_SPECIALS.contains(c))
}

fn is_domain(domain: &str) -> bool {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    let labels: Vec<&str> = domain.split('.').collect();

    if labels.len() < 2 {
        return false;
    }

    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });

    let tld = labels[labels.len() - 1];
    let tld_ok = tld.starts_with("xn--")
        || (tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));

    labels_ok && tld_ok
}
