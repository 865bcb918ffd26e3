//! URL redaction for error and log surfaces

use reqwest::Url;

/// Placeholder written in place of a redacted value
pub const REDACTED: &str = "REDACTED";

const SENSITIVE_PARAM: &str = "password";

/// Render `url` with the value of its `password` query parameter replaced
pub fn redact_url(url: &Url) -> String {
    let has_secret = url
        .query_pairs()
        .any(|(key, value)| key == SENSITIVE_PARAM && !value.is_empty());
    if !has_secret {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == SENSITIVE_PARAM {
                REDACTED.to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();

    let mut redacted = url.clone();
    redacted.query_pairs_mut().clear().extend_pairs(pairs);
    redacted.to_string()
}
