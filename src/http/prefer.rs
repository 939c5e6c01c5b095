use axum::http::HeaderMap;
use axum::http::header::LINK;

use crate::ldp::vocab::LDP_RESOURCE;

/// The `include` and `omit` IRIs of a `Prefer: return=representation`
/// header.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct Preferences {
    pub(crate) include: Vec<String>,
    pub(crate) omit: Vec<String>,
}

impl Preferences {
    pub(crate) fn from_headers(headers: &HeaderMap) -> Preferences {
        let mut preferences = Preferences::default();
        for value in headers.get_all("prefer") {
            let Ok(value) = value.to_str() else {
                continue;
            };
            for (key, value) in parameters(value) {
                let target = match key.to_ascii_lowercase().as_str() {
                    "include" => &mut preferences.include,
                    "omit" => &mut preferences.omit,
                    _ => continue,
                };
                target.extend(value.split_whitespace().map(str::to_owned));
            }
        }
        preferences
    }

    pub(crate) fn includes(&self, iri: &str) -> bool {
        self.include.iter().any(|i| i == iri)
    }
}

/// Splits `a=b; c="d e", f` into `(key, unquoted value)` pairs.
fn parameters(header: &str) -> Vec<(&str, &str)> {
    let mut pairs = vec![];
    let mut rest = header;
    while !rest.is_empty() {
        let end = rest.find([';', ',', '=']).unwrap_or(rest.len());
        let key = rest[..end].trim();
        rest = &rest[end..];
        if !rest.starts_with('=') {
            if !key.is_empty() {
                pairs.push((key, ""));
            }
            rest = rest.get(1..).unwrap_or("");
            continue;
        }
        rest = rest[1..].trim_start();
        let value = if let Some(quoted) = rest.strip_prefix('"') {
            let close = quoted.find('"').unwrap_or(quoted.len());
            rest = quoted.get(close + 1..).unwrap_or("");
            &quoted[..close]
        } else {
            let close = rest.find([';', ',']).unwrap_or(rest.len());
            let value = &rest[..close];
            rest = &rest[close..];
            value.trim()
        };
        pairs.push((key, value));
        let next = rest.find([';', ',']).map_or(rest.len(), |i| i + 1);
        rest = &rest[next..];
    }
    pairs
}

/// Whether the client asked for plain resource semantics with
/// `Link: <ldp:Resource>; rel="type"`.
pub(crate) fn has_resource_link(headers: &HeaderMap) -> bool {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|link| {
            let mut parts = link.split(';');
            let target = parts.next().map(str::trim).unwrap_or_default();
            target == format!("<{LDP_RESOURCE}>")
                && parts.any(|param| {
                    let Some((key, value)) = param.split_once('=') else {
                        return false;
                    };
                    key.trim().eq_ignore_ascii_case("rel")
                        && value
                            .trim()
                            .trim_matches('"')
                            .split_whitespace()
                            .any(|rel| rel == "type")
                })
        })
}
