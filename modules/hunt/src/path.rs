use hunter_results::PathRecord;
use reqwest::header::USER_AGENT;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;
use web_surface::filter::{self, body_filter, is_downloadable};
use web_surface::{
    extract_title, fingerprint, random_user_agent, read_body, FetchedResponse, FilterContext, PathError, ProbeOptions,
    RawResponse, Verdict,
};

use crate::context::Context;
use crate::port::Port;

struct Found {
    url: Url,
    path: String,
    record: PathRecord,
}

/// Probe one wordlist entry and record it on the port if it survives.
pub(crate) async fn hunt_path(ctx: Context, port: Arc<Port>, entry: String) {
    let url = port.url_for(&entry);
    match probe_path(&ctx, &port, &url).await {
        Ok(found) => {
            info!("found {} ({}, {:?})", found.url, found.record.status, found.record.content_type);
            port.record(found.path, found.record);
        }
        Err(PathError::RateLimited { url }) => {
            warn!("too many requests on {}, pausing port for {:?}", url, ctx.config.cooldown);
        }
        Err(PathError::CoolingDown) => debug!("skipping {}: port cooling down", url),
        Err(PathError::Irrelevant(reason)) => debug!("irrelevant {}: {}", url, reason),
        Err(e) => debug!("error on {}: {}", url, e),
    }
}

async fn probe_path(ctx: &Context, port: &Arc<Port>, url: &str) -> Result<Found, PathError> {
    if port.is_cooling_down() {
        return Err(PathError::CoolingDown);
    }

    let resp = ctx.client.get(url).header(USER_AGENT, random_user_agent()).send().await?;
    let fetched = FetchedResponse::from_response(&resp);
    match filter::run(&fetched, &FilterContext { host: port.host(), index: &**port }) {
        Verdict::Continue => {}
        Verdict::RateLimited => {
            port.start_cooldown(ctx.config.cooldown);
            return Err(PathError::RateLimited { url: url.to_string() });
        }
        Verdict::Irrelevant(reason) => return Err(reason.into()),
    }

    let body = match read_body(resp, ctx.config.max_body_bytes).await {
        Ok(body) => body,
        Err(e) => {
            port.release(&fetched.path);
            return Err(e.into());
        }
    };
    let is_html = fetched.content_type == "text/html";
    let mut record = PathRecord {
        status: fetched.status,
        content_type: fetched.content_type.clone(),
        ..PathRecord::default()
    };

    let text = is_html.then(|| String::from_utf8_lossy(&body).into_owned());
    if let Some(text) = &text {
        record.title = extract_title(text);
        if let Verdict::Irrelevant(reason) = body_filter(&record.title) {
            return Err(reason.into());
        }
    }
    for name in ["server", "x-server"] {
        if let Some(value) = fetched.headers.get(name).and_then(|v| v.to_str().ok()) {
            record.add_tech(value);
        }
    }
    if let Some(text) = &text {
        for tech in fingerprint(&fetched.headers, text) {
            record.add_tech(&tech);
        }
    }

    if is_downloadable(&fetched.content_type) {
        let raw = RawResponse::new(fetched.status, &fetched.headers, body);
        if let Err(e) = ctx.store.save(port.host(), port.number(), &fetched.path, &raw).await {
            debug!("error saving response for {}: {}", fetched.final_url, e);
        }
    }

    if ctx.config.scan && is_html && fetched.status <= 299 {
        let opts = ProbeOptions { user_agent: random_user_agent().to_string() };
        match ctx.xss.probe(fetched.final_url.as_str(), &opts).await {
            Ok(report) if report.found => {
                warn!("xss vuln on {}", fetched.final_url);
                record.xss = report.pocs;
            }
            Ok(_) => {}
            Err(e) => debug!("error on xss check for {}: {:#}", fetched.final_url, e),
        }
    }

    Ok(Found { url: fetched.final_url, path: fetched.path, record })
}
