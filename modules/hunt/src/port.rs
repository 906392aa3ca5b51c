use banners::{grab_version, Protocol};
use hunter_results::{PathRecord, PortRecord};
use port_scan::{open_port, service_for, PortSpec, Service};
use std::collections::{BTreeMap, HashSet};
use std::net::Ipv6Addr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use web_surface::PathIndex;

use crate::context::Context;
use crate::lock;
use crate::path::hunt_path;
use crate::target::Target;

#[derive(Default)]
struct PathTable {
    /// Every final path claimed so far, recorded or not.
    seen: HashSet<String>,
    found: BTreeMap<String, PathRecord>,
}

/// One open port of a target.
pub struct Port {
    host: Arc<str>,
    number: u16,
    service: Service,
    name: String,
    version: Mutex<Option<String>>,
    crlf: Mutex<Vec<String>>,
    paths: Mutex<PathTable>,
    cooldown_until: Mutex<Option<Instant>>,
}

impl Port {
    pub fn new(host: Arc<str>, spec: PortSpec) -> Self {
        Port {
            host,
            number: spec.number,
            service: spec.service,
            name: spec.service.name().to_string(),
            version: Mutex::new(None),
            crlf: Mutex::new(Vec::new()),
            paths: Mutex::new(PathTable::default()),
            cooldown_until: Mutex::new(None),
        }
    }

    pub(crate) fn from_record(host: Arc<str>, record: PortRecord) -> Self {
        let mut port = Port::new(host, PortSpec::new(record.number, service_for(record.number)));
        port.name = record.name;
        *lock(&port.version) = record.version;
        *lock(&port.crlf) = record.crlf_vulnerabilities;
        {
            let mut table = lock(&port.paths);
            table.seen = record.paths.keys().cloned().collect();
            table.found = record.paths;
        }
        port
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn number(&self) -> u16 {
        self.number
    }

    pub fn service(&self) -> Service {
        self.service
    }

    /// `scheme://host:port` with IPv6 hosts bracketed.
    pub fn base_url(&self) -> String {
        let scheme = self.service.scheme().unwrap_or("http");
        if self.host.parse::<Ipv6Addr>().is_ok() {
            format!("{}://[{}]:{}", scheme, self.host, self.number)
        } else {
            format!("{}://{}:{}", scheme, self.host, self.number)
        }
    }

    pub fn url_for(&self, entry: &str) -> String {
        format!("{}/{}", self.base_url(), entry.trim_start_matches('/'))
    }

    pub fn set_version(&self, version: String) {
        *lock(&self.version) = Some(version);
    }

    pub fn add_crlf(&self, url: String) {
        let mut crlf = lock(&self.crlf);
        if !crlf.contains(&url) {
            crlf.push(url);
        }
    }

    /// Store a result for a path this port already claimed. First write wins.
    pub fn record(&self, path: String, record: PathRecord) -> bool {
        let mut table = lock(&self.paths);
        if table.found.contains_key(&path) {
            return false;
        }
        table.seen.insert(path.clone());
        table.found.insert(path, record);
        true
    }

    /// Give up a claim that never produced a record, so a later response can take it.
    pub(crate) fn release(&self, path: &str) {
        let mut table = lock(&self.paths);
        if !table.found.contains_key(path) {
            table.seen.remove(path);
        }
    }

    pub fn path(&self, path: &str) -> Option<PathRecord> {
        lock(&self.paths).found.get(path).cloned()
    }

    pub fn is_cooling_down(&self) -> bool {
        lock(&self.cooldown_until).is_some_and(|until| Instant::now() < until)
    }

    pub fn start_cooldown(&self, length: Duration) {
        *lock(&self.cooldown_until) = Some(Instant::now() + length);
    }

    pub fn to_record(&self) -> PortRecord {
        PortRecord {
            number: self.number,
            name: self.name.clone(),
            version: lock(&self.version).clone(),
            crlf_vulnerabilities: lock(&self.crlf).clone(),
            paths: lock(&self.paths).found.clone(),
        }
    }
}

impl PathIndex for Port {
    fn claim(&self, path: &str) -> bool {
        lock(&self.paths).seen.insert(path.to_string())
    }
}

/// Connect, register the port on its target, then dispatch on the service.
pub(crate) async fn hunt_port(ctx: Context, target: Arc<Target>, spec: PortSpec) {
    let host = target.host();
    let mut stream = match open_port(host, spec.number, ctx.config.connect_timeout).await {
        Ok(Some(s)) => s,
        Ok(None) => {
            debug!("{}:{} closed", host, spec.number);
            return;
        }
        Err(e) => {
            debug!("error on {}:{}: {}", host, spec.number, e);
            return;
        }
    };
    info!("found {}:{}", host, spec.number);
    let port = target.add_port(Port::new(target.host_arc(), spec));

    let protocol = match spec.service {
        Service::Http | Service::Https => {
            drop(stream);
            for entry in &ctx.config.wordlist {
                ctx.gate.spawn_gated(hunt_path(ctx.clone(), port.clone(), entry.clone()));
            }
            if ctx.config.scan {
                ctx.gate.spawn_gated(hunt_crlf(ctx.clone(), port));
            }
            return;
        }
        Service::Ftp => Protocol::Ftp,
        Service::Ssh => Protocol::Ssh,
        Service::Mysql => Protocol::Mysql,
        _ => return,
    };
    if let Some(version) = grab_version(&mut stream, protocol, ctx.config.banner_timeout).await {
        debug!("{}:{} runs {}", host, spec.number, version);
        port.set_version(version);
    }
}

async fn hunt_crlf(ctx: Context, port: Arc<Port>) {
    for (url, vulnerable) in ctx.crlf.probe(&[port.base_url()]).await {
        if vulnerable {
            warn!("crlf vuln on {}", url);
            port.add_crlf(url);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn port(host: &str, number: u16) -> Port {
        Port::new(Arc::from(host), PortSpec::new(number, service_for(number)))
    }

    #[test]
    fn urls() {
        assert_eq!(port("example.com", 443).url_for(""), "https://example.com:443/");
        assert_eq!(port("::1", 8080).url_for("/admin"), "http://[::1]:8080/admin");
        assert_eq!(port("10.0.0.1", 80).base_url(), "http://10.0.0.1:80");
    }

    #[test]
    fn claims_are_exclusive() {
        let p = port("example.com", 80);
        assert!(p.claim("/a"));
        assert!(!p.claim("/a"));
        assert!(p.record("/a".into(), PathRecord { status: 200, ..Default::default() }));
        assert!(!p.record("/a".into(), PathRecord { status: 500, ..Default::default() }));
        assert_eq!(p.path("/a").map(|r| r.status), Some(200));
    }

    #[test]
    fn failed_claims_can_be_retaken() {
        let p = port("example.com", 80);
        assert!(p.claim("/a"));
        p.release("/a");
        assert!(p.claim("/a"));

        assert!(p.record("/a".into(), PathRecord { status: 200, ..Default::default() }));
        p.release("/a");
        assert!(!p.claim("/a"));
    }

    #[test]
    fn reloaded_paths_are_already_claimed() {
        let mut rec = PortRecord { number: 80, name: "http".into(), ..Default::default() };
        rec.paths.insert("/".into(), PathRecord { status: 200, ..Default::default() });
        let p = Port::from_record(Arc::from("example.com"), rec.clone());
        assert!(!p.claim("/"));
        assert_eq!(p.to_record(), rec);
    }

    #[tokio::test]
    async fn cooldown_expires() {
        let p = port("example.com", 80);
        assert!(!p.is_cooling_down());
        p.start_cooldown(Duration::from_millis(30));
        assert!(p.is_cooling_down());
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!p.is_cooling_down());
    }
}
