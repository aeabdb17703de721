//! Query-string access with first-occurrence semantics.
//!
//! A repeated key never fails the request: the first value is used and the
//! rest are ignored.

use url::form_urlencoded;

/// First decoded value of `key` in a raw query string.
pub fn first_value(query: Option<&str>, key: &str) -> Option<String> {
    let query = query?;
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}
