//! Technology labels from response headers and HTML bodies.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::HeaderMap;
use scraper::{Html, Selector};

static GENERATOR_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z .\-]*").unwrap());

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Lower-case technology labels, sorted and deduplicated.
/// `server` / `x-server` are left to the caller.
pub fn fingerprint(headers: &HeaderMap, body: &str) -> Vec<String> {
    let mut tech: Vec<String> = Vec::new();

    if let Some(v) = header(headers, "x-powered-by") {
        let l = v.to_lowercase();
        if l.contains("php") { tech.push("php".into()); }
        if l.contains("express") { tech.push("express".into()); }
        if l.contains("asp.net") { tech.push("asp.net".into()); }
        if l.contains("django") { tech.push("django".into()); }
        if l.contains("next.js") { tech.push("next.js".into()); }
    }
    if header(headers, "x-aspnet-version").is_some() { tech.push("asp.net".into()); }
    if header(headers, "x-jenkins").is_some() { tech.push("jenkins".into()); }
    if header(headers, "x-drupal-cache").is_some() { tech.push("drupal".into()); }
    if header(headers, "cf-ray").is_some() { tech.push("cloudflare".into()); }
    if let Some(cookie) = header(headers, "set-cookie") {
        let l = cookie.to_lowercase();
        if l.contains("phpsessid") { tech.push("php".into()); }
        if l.contains("jsessionid") { tech.push("java".into()); }
        if l.contains("laravel_session") { tech.push("laravel".into()); }
    }

    let document = Html::parse_document(body);
    if let Ok(selector) = Selector::parse(r#"meta[name="generator"]"#) {
        let generator = document.select(&selector).next().and_then(|el| el.value().attr("content"));
        if let Some(m) = generator.and_then(|content| GENERATOR_NAME.find(content)) {
            tech.push(m.as_str().trim().to_lowercase());
        }
    }

    let title = match Selector::parse("title") {
        Ok(sel) => document
            .select(&sel)
            .next()
            .map(|el| el.text().collect::<String>().to_lowercase())
            .unwrap_or_default(),
        Err(_) => String::new(),
    };
    if title.contains("index of /") { tech.push("directory-listing".into()); }
    if title.contains("grafana") { tech.push("grafana".into()); }
    if title.contains("kibana") { tech.push("kibana".into()); }
    if title.contains("jenkins") { tech.push("jenkins".into()); }

    let bl = body.to_lowercase();
    if bl.contains("wp-content/") { tech.push("wordpress".into()); }
    if bl.contains("joomla!") { tech.push("joomla".into()); }
    if bl.contains("/sites/default/files") { tech.push("drupal".into()); }
    if bl.contains("ng-app") || bl.contains("ng-version") { tech.push("angular".into()); }
    if bl.contains("react-dom") || bl.contains("data-reactroot") { tech.push("react".into()); }
    if bl.contains("__next_data__") { tech.push("next.js".into()); }
    if bl.contains("window.__nuxt") { tech.push("nuxt.js".into()); }
    if bl.contains("jquery") { tech.push("jquery".into()); }

    tech.retain(|t| !t.is_empty());
    tech.sort();
    tech.dedup();
    tech
}
