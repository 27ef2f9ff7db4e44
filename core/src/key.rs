//! Webhook key extraction.

use url::Url;

/// Return the `key` query parameter of `webhook_url`.
///
/// The match is case-sensitive (`KEY=` is ignored). An unparseable URL, a
/// missing parameter and an empty value all yield `""`. When `key` repeats,
/// the first occurrence wins.
pub fn extract_key(webhook_url: &str) -> String {
    Url::parse(webhook_url)
        .ok()
        .and_then(|url| {
            url.query_pairs()
                .find(|(name, _)| name == "key")
                .map(|(_, value)| value.into_owned())
        })
        .unwrap_or_default()
}
