//! `Content-Disposition` for proxied downloads.

use axum::http::HeaderValue;

/// Render `{title}.{ext}` as the inside of a quoted-string.
///
/// Spaces and unicode pass through untouched. Control characters (CR/LF
/// included) become `_`, and `"` / `\` are backslash-escaped, so the value
/// cannot terminate the quoted string or split the header.
pub fn quoted_filename(title: &str, ext: &str) -> String {
    let mut out = String::with_capacity(title.len() + ext.len() + 1);
    push_escaped(&mut out, title);
    out.push('.');
    push_escaped(&mut out, ext);
    out
}

fn push_escaped(out: &mut String, part: &str) {
    for c in part.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => out.push('_'),
            c => out.push(c),
        }
    }
}

/// `attachment; filename="{title}.{ext}"`
pub fn attachment(title: &str, ext: &str) -> HeaderValue {
    let value = format!("attachment; filename=\"{}\"", quoted_filename(title, ext));
    // Non-ASCII is sent as raw UTF-8 octets, which header values permit.
    HeaderValue::from_bytes(value.as_bytes()).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
