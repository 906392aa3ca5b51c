//! Ordered response filters deciding whether a probed path is worth keeping.

use hunter_core::Irrelevant;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::Response;
use tracing::trace;
use url::{Host, Url};

use crate::path::normalize_path;

/// Content types worth recording.
pub const INTERESTING: &[&str] = &[
    "application/gzip",
    "application/javascript",
    "application/json",
    "application/msword",
    "application/octet-stream",
    "application/pdf",
    "application/vnd.ms-excel",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/xhtml+xml",
    "application/xml",
    "application/zip",
    "text/csv",
    "text/html",
    "text/javascript",
    "text/plain",
    "text/xml",
];

/// Content types whose raw response is written to the store.
pub const DOWNLOADABLE: &[&str] = &[
    "application/javascript",
    "application/json",
    "application/xhtml+xml",
    "application/xml",
    "text/csv",
    "text/html",
    "text/javascript",
    "text/plain",
    "text/xml",
];

pub fn is_downloadable(content_type: &str) -> bool {
    DOWNLOADABLE.contains(&content_type)
}

/// Statuses that never produce a result.
pub fn is_irrelevant_status(status: u16) -> bool {
    matches!(status, 300..=399 | 404 | 408 | 410 | 460 | 521..=524 | 598)
}

/// Media type of a `content-type` value: no parameters, lower-cased.
pub fn media_type(value: &str) -> String {
    value.split(';').next().unwrap_or_default().trim().to_ascii_lowercase()
}

/// Host part of a URL in the same form the scope uses (no IPv6 brackets).
pub fn url_host(url: &Url) -> Option<String> {
    match url.host()? {
        Host::Domain(d) => Some(d.to_string()),
        Host::Ipv4(ip) => Some(ip.to_string()),
        Host::Ipv6(ip) => Some(ip.to_string()),
    }
}

/// What the filters look at once redirects are done.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,
    pub final_url: Url,
    /// Sanitized, decoded final path.
    pub path: String,
    pub content_type: String,
    pub headers: HeaderMap,
}

impl FetchedResponse {
    pub fn new(status: u16, final_url: Url, headers: HeaderMap) -> Self {
        let path = normalize_path(final_url.path());
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(media_type)
            .unwrap_or_default();
        FetchedResponse { status, final_url, path, content_type, headers }
    }

    pub fn from_response(resp: &Response) -> Self {
        Self::new(resp.status().as_u16(), resp.url().clone(), resp.headers().clone())
    }
}

/// Paths already recorded for one port.
pub trait PathIndex: Send + Sync {
    /// Claim `path`. Returns `false` if it was claimed before.
    fn claim(&self, path: &str) -> bool;
}

pub struct FilterContext<'a> {
    pub host: &'a str,
    pub index: &'a dyn PathIndex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    RateLimited,
    Irrelevant(Irrelevant),
}

pub type FilterFn = fn(&FetchedResponse, &FilterContext<'_>) -> Verdict;

pub struct NamedFilter {
    pub name: &'static str,
    pub check: FilterFn,
}

/// Header-stage filters, in the order they run.
pub const PIPELINE: &[NamedFilter] = &[
    NamedFilter { name: "rate_limit", check: rate_limit },
    NamedFilter { name: "status", check: status },
    NamedFilter { name: "off_host", check: off_host },
    NamedFilter { name: "duplicate", check: duplicate },
    NamedFilter { name: "content_type", check: content_type },
];

/// Run every filter until one stops the response.
pub fn run(resp: &FetchedResponse, ctx: &FilterContext<'_>) -> Verdict {
    for filter in PIPELINE {
        let verdict = (filter.check)(resp, ctx);
        if verdict != Verdict::Continue {
            trace!(filter = filter.name, url = %resp.final_url, "stopped");
            return verdict;
        }
    }
    Verdict::Continue
}

fn rate_limit(resp: &FetchedResponse, _: &FilterContext<'_>) -> Verdict {
    if resp.status == 429 {
        Verdict::RateLimited
    } else {
        Verdict::Continue
    }
}

fn status(resp: &FetchedResponse, _: &FilterContext<'_>) -> Verdict {
    if is_irrelevant_status(resp.status) {
        Verdict::Irrelevant(Irrelevant::Status(resp.status))
    } else {
        Verdict::Continue
    }
}

fn off_host(resp: &FetchedResponse, ctx: &FilterContext<'_>) -> Verdict {
    match url_host(&resp.final_url) {
        Some(h) if h.eq_ignore_ascii_case(ctx.host) => Verdict::Continue,
        _ => Verdict::Irrelevant(Irrelevant::OffHost(resp.final_url.to_string())),
    }
}

fn duplicate(resp: &FetchedResponse, ctx: &FilterContext<'_>) -> Verdict {
    if ctx.index.claim(&resp.path) {
        Verdict::Continue
    } else {
        Verdict::Irrelevant(Irrelevant::Duplicate(resp.path.clone()))
    }
}

fn content_type(resp: &FetchedResponse, _: &FilterContext<'_>) -> Verdict {
    if resp.content_type.is_empty() || INTERESTING.contains(&resp.content_type.as_str()) {
        Verdict::Continue
    } else {
        Verdict::Irrelevant(Irrelevant::ContentType(resp.content_type.clone()))
    }
}

/// WAF and bot-challenge interstitials, recognised by title.
pub fn is_bot_challenge(title: &str) -> bool {
    let t = title.to_lowercase();
    t.contains("cloudflare") || (t.contains("verify") && t.contains("human"))
}

/// Body-stage filter, run once the title is known.
pub fn body_filter(title: &str) -> Verdict {
    if is_bot_challenge(title) {
        Verdict::Irrelevant(Irrelevant::BotChallenge(title.to_string()))
    } else {
        Verdict::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Seen(Mutex<HashSet<String>>);

    impl PathIndex for Seen {
        fn claim(&self, path: &str) -> bool {
            self.0.lock().unwrap().insert(path.to_string())
        }
    }

    fn resp(status: u16, url: &str, ct: &str) -> FetchedResponse {
        let mut headers = HeaderMap::new();
        if !ct.is_empty() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_str(ct).unwrap());
        }
        FetchedResponse::new(status, Url::parse(url).unwrap(), headers)
    }

    fn verdict(r: &FetchedResponse, seen: &Seen) -> Verdict {
        run(r, &FilterContext { host: "example.com", index: seen })
    }

    #[test]
    fn pipeline_order_is_fixed() {
        let names: Vec<_> = PIPELINE.iter().map(|f| f.name).collect();
        assert_eq!(names, ["rate_limit", "status", "off_host", "duplicate", "content_type"]);
    }

    #[test]
    fn statuses() {
        for s in [300, 301, 399, 404, 408, 410, 460, 521, 522, 523, 524, 598] {
            assert!(is_irrelevant_status(s), "{s}");
        }
        for s in [200, 204, 401, 403, 500, 520, 525] {
            assert!(!is_irrelevant_status(s), "{s}");
        }
    }

    #[test]
    fn rate_limit_wins_over_everything() {
        let seen = Seen::default();
        let r = resp(429, "http://elsewhere.org/x", "image/png");
        assert_eq!(verdict(&r, &seen), Verdict::RateLimited);
        assert!(seen.0.lock().unwrap().is_empty());
    }

    #[test]
    fn off_host_is_irrelevant() {
        let seen = Seen::default();
        let r = resp(200, "http://evil.example.org/", "text/html");
        assert!(matches!(verdict(&r, &seen), Verdict::Irrelevant(Irrelevant::OffHost(_))));
    }

    #[test]
    fn duplicate_claim_is_kept_after_content_type_rejection() {
        let seen = Seen::default();
        let img = resp(200, "http://example.com/logo.png", "image/png; charset=binary");
        assert_eq!(verdict(&img, &seen), Verdict::Irrelevant(Irrelevant::ContentType("image/png".into())));
        let again = resp(200, "http://example.com/logo.png", "text/html");
        assert_eq!(
            verdict(&again, &seen),
            Verdict::Irrelevant(Irrelevant::Duplicate("/logo.png".into()))
        );
    }

    #[test]
    fn empty_content_type_passes() {
        let seen = Seen::default();
        assert_eq!(verdict(&resp(200, "http://example.com/", ""), &seen), Verdict::Continue);
        assert_eq!(
            verdict(&resp(403, "http://EXAMPLE.com/a", "Text/HTML; charset=utf-8"), &seen),
            Verdict::Continue
        );
    }

    #[test]
    fn ipv6_hosts_compare_without_brackets() {
        let seen = Seen::default();
        let r = resp(200, "http://[::1]:8080/", "text/plain");
        assert_eq!(run(&r, &FilterContext { host: "::1", index: &seen }), Verdict::Continue);
    }

    #[test]
    fn challenge_titles() {
        assert!(is_bot_challenge("Attention Required! | Cloudflare"));
        assert!(is_bot_challenge("Please verify you are a Human"));
        assert!(!is_bot_challenge("Verify your email"));
        assert_eq!(body_filter("Example"), Verdict::Continue);
    }
}
