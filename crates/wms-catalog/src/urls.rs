//! URL helpers for WMS requests.

use url::Url;
use wms_protocol::is_reserved_parameter;

const CAPABILITIES_PARAMETERS: [(&str, &str); 3] = [
    ("service", "WMS"),
    ("version", "1.3.0"),
    ("request", "GetCapabilities"),
];

/// The GetCapabilities URL for a service URL. Other query parameters (such
/// as a MapServer `map`) are kept.
pub fn default_get_capabilities_url(base: &str) -> String {
    let kept = |key: &str| {
        !CAPABILITIES_PARAMETERS
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(key))
    };
    let (path, pairs) = split_query(base);
    let mut pairs: Vec<(String, String)> = pairs.into_iter().filter(|(k, _)| kept(k)).collect();
    pairs.extend(
        CAPABILITIES_PARAMETERS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string())),
    );
    append_query(&path, &pairs)
}

/// The service URL with every parameter a GetMap request sets itself
/// removed, in either case.
pub fn imagery_base_url(base: &str) -> String {
    let (path, pairs) = split_query(base);
    let pairs: Vec<(String, String)> = pairs
        .into_iter()
        .filter(|(k, _)| !is_reserved_parameter(k))
        .collect();
    append_query(&path, &pairs)
}

/// Append query pairs to a URL, percent-encoding them.
///
/// Relative URLs (e.g. behind a path-prefix proxy) are handled as plain
/// strings.
pub fn append_query(base: &str, pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return base.to_string();
    }
    if let Ok(mut url) = Url::parse(base) {
        url.query_pairs_mut()
            .extend_pairs(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        return url.to_string();
    }
    let query = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{query}")
}

fn split_query(url: &str) -> (String, Vec<(String, String)>) {
    if let Ok(mut parsed) = Url::parse(url) {
        let pairs = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        parsed.set_query(None);
        return (parsed.to_string(), pairs);
    }
    match url.split_once('?') {
        Some((path, query)) => {
            let pairs = query
                .split('&')
                .filter(|p| !p.is_empty())
                .map(|pair| {
                    let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                    (decode(k), decode(v))
                })
                .collect();
            (path.to_string(), pairs)
        }
        None => (url.to_string(), Vec::new()),
    }
}

fn decode(s: &str) -> String {
    urlencoding::decode(s)
        .map(|d| d.into_owned())
        .unwrap_or_else(|_| s.to_string())
}

/// Percent-decode a URL taken from a capabilities document. Undecodable input
/// is returned unchanged.
pub fn decode_url(url: &str) -> String {
    decode(url.trim())
}
