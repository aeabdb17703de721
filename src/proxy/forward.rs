//! Inbound → outbound header forwarding.
//!
//! The list is closed: a header reaches a third-party host only if it is
//! named here. Cookies, authorization and any custom headers never leave.

use axum::http::{
    header::{ACCEPT, ACCEPT_LANGUAGE, RANGE, REFERER, USER_AGENT},
    HeaderMap, HeaderName,
};

/// Headers copied from the caller's request to the upstream request.
pub const FORWARDED_HEADERS: [HeaderName; 5] = [ACCEPT, ACCEPT_LANGUAGE, USER_AGENT, RANGE, REFERER];

/// Copy the allow-listed headers present on `inbound`.
///
/// Repeated headers keep their last value; empty values are skipped.
pub fn forwarded_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut outbound = HeaderMap::with_capacity(FORWARDED_HEADERS.len());
    for name in FORWARDED_HEADERS {
        if let Some(value) = inbound.get_all(&name).iter().last() {
            if !value.is_empty() {
                outbound.insert(name, value.clone());
            }
        }
    }
    outbound
}
