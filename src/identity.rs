//! Participant identity from the hosting page URL
//!
//! The widget is mounted at `/@username` (or `/username`). The first path
//! segment is the identity; everything after it is ignored.

use crate::types::Identity;
use percent_encoding::percent_decode_str;

/// Resolve an identity from a URL pathname.
///
/// Returns `None` when there is no first segment, when it is empty after
/// stripping the leading `@`, or when it does not decode to UTF-8.
pub fn resolve(pathname: &str) -> Option<Identity> {
    let segments: Vec<&str> = pathname.split('/').collect();
    if segments.len() < 2 {
        return None;
    }

    let segment = segments[1];
    let segment = segment.strip_prefix('@').unwrap_or(segment);

    let decoded = match percent_decode_str(segment).decode_utf8() {
        Ok(decoded) => decoded,
        Err(e) => {
            tracing::warn!("Identity segment is not valid UTF-8: {}", e);
            return None;
        }
    };

    if decoded.is_empty() {
        return None;
    }

    Some(Identity::new(decoded.into_owned()))
}
