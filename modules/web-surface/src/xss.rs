use anyhow::{Context, Result};
use async_trait::async_trait;
use hunter_results::XssPoc;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::client::random_user_agent;

#[derive(Debug, Clone, Default)]
pub struct ProbeOptions {
    pub user_agent: String,
}

#[derive(Debug, Clone, Default)]
pub struct XssReport {
    pub found: bool,
    pub pocs: Vec<XssPoc>,
}

/// Reflected-XSS check against a single URL.
#[async_trait]
pub trait XssProber: Send + Sync {
    async fn probe(&self, url: &str, opts: &ProbeOptions) -> Result<XssReport>;
}

/// Injects a marker tag into every query parameter (or `q` when the URL has
/// none) and reports parameters whose value comes back unescaped.
pub struct ReflectionProber {
    client: Client,
}

impl ReflectionProber {
    pub fn new(client: Client) -> Self {
        ReflectionProber { client }
    }
}

fn with_param(base: &Url, param: &str, value: &str) -> Url {
    let kept: Vec<(String, String)> = base
        .query_pairs()
        .into_owned()
        .filter(|(k, _)| k != param)
        .collect();
    let mut url = base.clone();
    {
        let mut q = url.query_pairs_mut();
        q.clear();
        for (k, v) in &kept {
            q.append_pair(k, v);
        }
        q.append_pair(param, value);
    }
    url
}

fn evidence_line(body: &str, at: usize) -> String {
    let start = body[..at].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let end = body[at..].find('\n').map(|i| at + i).unwrap_or(body.len());
    body[start..end].trim().chars().take(200).collect()
}

#[async_trait]
impl XssProber for ReflectionProber {
    async fn probe(&self, url: &str, opts: &ProbeOptions) -> Result<XssReport> {
        let base = Url::parse(url).with_context(|| format!("parsing {url}"))?;
        let mut params: Vec<String> = base.query_pairs().map(|(k, _)| k.into_owned()).collect();
        params.dedup();
        if params.is_empty() {
            params.push("q".to_string());
        }
        let payload = format!("\"><hnt{}>", rand::random::<u32>());
        let user_agent = if opts.user_agent.is_empty() { random_user_agent() } else { opts.user_agent.as_str() };

        let mut report = XssReport::default();
        for param in params {
            let target = with_param(&base, &param, &payload);
            let resp = match self.client.get(target.clone()).header(USER_AGENT, user_agent).send().await {
                Ok(r) => r,
                Err(e) => {
                    debug!(url = %target, "xss probe failed: {e}");
                    continue;
                }
            };
            let body = match resp.text().await {
                Ok(b) => b,
                Err(e) => {
                    debug!(url = %target, "xss probe body: {e}");
                    continue;
                }
            };
            if let Some(at) = body.find(&payload) {
                report.pocs.push(XssPoc {
                    data: target.to_string(),
                    param,
                    payload: payload.clone(),
                    evidence: evidence_line(&body, at),
                    cwe: "CWE-79".to_string(),
                    severity: "Medium".to_string(),
                });
            }
        }
        report.found = !report.pocs.is_empty();
        Ok(report)
    }
}
