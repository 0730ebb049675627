//! Domain normalisation and denylist matching

use std::collections::BTreeSet;
use url::Url;

/// Distraction domains blocked out of the box.
pub const DEFAULT_DENYLIST: &[&str] = &[
    "facebook.com",
    "instagram.com",
    "twitter.com",
    "youtube.com",
    "reddit.com",
    "tiktok.com",
    "snapchat.com",
    "pinterest.com",
    "linkedin.com",
    "twitch.tv",
    "netflix.com",
    "discord.com",
    "whatsapp.com",
    "telegram.org",
    "tumblr.com",
    "9gag.com",
    "buzzfeed.com",
    "imgur.com",
];

/// The default denylist as an owned set.
pub fn default_denylist() -> BTreeSet<String> {
    DEFAULT_DENYLIST.iter().map(|d| d.to_string()).collect()
}

/// Reduce user input (`https://www.YouTube.com/watch?v=1`, `Reddit.com`,
/// `www.twitch.tv:443`) to a bare lower-case domain.
///
/// Returns `None` for input that has no usable host.
pub fn normalize_domain(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = if trimmed.contains("://") {
        Url::parse(trimmed)
    } else {
        Url::parse(&format!("http://{}", trimmed))
    }
    .ok()?;

    let host = parsed.host_str()?.trim_end_matches('.').to_ascii_lowercase();
    let host = strip_www(&host);
    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Normalise every entry of a domain list, dropping unusable ones.
pub fn normalize_domains<I, S>(inputs: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    inputs
        .into_iter()
        .filter_map(|d| normalize_domain(d.as_ref()))
        .collect()
}

/// Lower-case a hostname and drop a leading `www.`.
pub fn normalize_host(host: &str) -> String {
    let lowered = host.trim().trim_end_matches('.').to_ascii_lowercase();
    strip_www(&lowered).to_string()
}

fn strip_www(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Whether `host` (already normalised) matches `domain` by suffix or
/// substring.
pub fn host_matches(host: &str, domain: &str) -> bool {
    !domain.is_empty() && (host.ends_with(domain) || host.contains(domain))
}

/// Find the denylist entry that blocks `host`, honouring the allowlist.
pub fn match_denylist<'a>(
    host: &str,
    denylist: &'a BTreeSet<String>,
    allowlist: &BTreeSet<String>,
) -> Option<&'a str> {
    let host = normalize_host(host);
    if host.is_empty() {
        return None;
    }

    if allowlist.iter().any(|allowed| host_matches(&host, allowed)) {
        return None;
    }

    denylist
        .iter()
        .find(|denied| host_matches(&host, denied))
        .map(String::as_str)
}
