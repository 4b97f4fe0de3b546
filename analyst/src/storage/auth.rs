//! Shared Key request signing.
//!
//! The signature is `base64(HMAC-SHA256(key, string_to_sign))` where the
//! string to sign is the verb, the standard headers, the canonicalized
//! `x-ms-*` headers and the canonicalized resource, joined by newlines.

use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use reqwest::Method;
use reqwest::header::HeaderMap;
use sha2::Sha256;
use url::Url;

use crate::error::{Result, ServiceError};

type HmacSha256 = Hmac<Sha256>;

/// Standard headers in string-to-sign order, `Content-Length` excluded.
const SIGNED_HEADERS: [&str; 10] = [
    "content-encoding",
    "content-language",
    "content-md5",
    "content-type",
    "date",
    "if-modified-since",
    "if-match",
    "if-none-match",
    "if-unmodified-since",
    "range",
];

/// Builds the Shared Key string to sign for a request.
///
/// `content_length` is the body length; zero is signed as an empty string.
pub(crate) fn string_to_sign(
    method: &Method,
    url: &Url,
    headers: &HeaderMap,
    content_length: usize,
    account: &str,
) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned()
    };
    let length = if content_length == 0 {
        String::new()
    } else {
        content_length.to_string()
    };

    let mut parts = Vec::with_capacity(13);
    parts.push(method.as_str().to_owned());
    parts.push(header(SIGNED_HEADERS[0]));
    parts.push(header(SIGNED_HEADERS[1]));
    parts.push(length);
    parts.extend(SIGNED_HEADERS[2..].iter().map(|name| header(name)));

    let mut out = parts.join("\n");
    out.push('\n');
    out.push_str(&canonicalized_headers(headers));
    out.push_str(&canonicalized_resource(url, account));
    out
}

/// `x-ms-*` headers, lowercase, sorted, one `name:value\n` per header.
fn canonicalized_headers(headers: &HeaderMap) -> String {
    let mut ms: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for (name, value) in headers {
        if name.as_str().starts_with("x-ms-") {
            if let Ok(value) = value.to_str() {
                ms.entry(name.as_str()).or_default().push(value.trim());
            }
        }
    }
    ms.into_iter()
        .map(|(name, values)| format!("{name}:{}\n", values.join(",")))
        .collect()
}

/// `/<account><path>` followed by `\n<name>:<values>` per sorted query parameter.
fn canonicalized_resource(url: &Url, account: &str) -> String {
    let mut out = format!("/{account}{}", url.path());

    let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (name, value) in url.query_pairs() {
        params
            .entry(name.to_lowercase())
            .or_default()
            .push(value.into_owned());
    }
    for (name, mut values) in params {
        values.sort();
        out.push('\n');
        out.push_str(&name);
        out.push(':');
        out.push_str(&values.join(","));
    }
    out
}

/// Signs `string_to_sign` with the decoded account key.
pub(crate) fn sign(key: &[u8], string_to_sign: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| ServiceError::internal(format!("invalid account key: {e}")))?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Value of the `Authorization` header for a Shared Key request.
pub(crate) fn authorization_header(account: &str, signature: &str) -> String {
    format!("SharedKey {account}:{signature}")
}
