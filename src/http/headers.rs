//! Header bookkeeping shared by the translator and the relay.
//!
//! Headers fall into two tiers: message headers and content headers (those
//! describing the payload). Copies are done tier by tier, message first.

use axum::http::{HeaderMap, HeaderName};

/// Headers that describe the payload rather than the message.
const CONTENT_HEADERS: [&str; 11] = [
    "allow",
    "content-disposition",
    "content-encoding",
    "content-language",
    "content-length",
    "content-location",
    "content-md5",
    "content-range",
    "content-type",
    "expires",
    "last-modified",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderTier {
    Message,
    Content,
}

pub fn tier(name: &HeaderName) -> HeaderTier {
    if CONTENT_HEADERS.contains(&name.as_str()) {
        HeaderTier::Content
    } else {
        HeaderTier::Message
    }
}

/// Copy every header of `tier` from `source` into `target`.
///
/// A key already present in `target` is replaced by all of the source's
/// values for it; values under one key in `source` are all kept.
pub fn copy_tier(source: &HeaderMap, target: &mut HeaderMap, wanted: HeaderTier) {
    for name in source.keys().filter(|name| tier(name) == wanted) {
        target.remove(name);
        for value in source.get_all(name) {
            target.append(name.clone(), value.clone());
        }
    }
}

/// Insert each header of `extra` whose key `target` does not already carry.
pub fn insert_missing(target: &mut HeaderMap, extra: &HeaderMap) {
    for name in extra.keys() {
        if !target.contains_key(name) {
            for value in extra.get_all(name) {
                target.append(name.clone(), value.clone());
            }
        }
    }
}
