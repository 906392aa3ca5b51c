use host_discovery::{extract_hosts, is_ip, resolve};
use hunter_results::TargetRecord;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::hunt::Hunt;
use crate::lock;
use crate::port::{hunt_port, Port};

/// A host and the ports found open on it.
pub struct Target {
    host: Arc<str>,
    ports: Mutex<BTreeMap<u16, Arc<Port>>>,
}

impl Target {
    pub fn new(host: &str) -> Self {
        Target { host: Arc::from(host), ports: Mutex::new(BTreeMap::new()) }
    }

    pub(crate) fn from_record(host: &str, record: TargetRecord) -> Self {
        let target = Target::new(host);
        {
            let mut ports = lock(&target.ports);
            for (number, port) in record.ports {
                ports.insert(number, Arc::new(Port::from_record(target.host.clone(), port)));
            }
        }
        target
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub(crate) fn host_arc(&self) -> Arc<str> {
        self.host.clone()
    }

    /// Already holds results from an earlier run.
    pub fn is_scanned(&self) -> bool {
        !lock(&self.ports).is_empty()
    }

    /// Register an open port, keeping the existing one if it is known.
    pub fn add_port(&self, port: Port) -> Arc<Port> {
        lock(&self.ports).entry(port.number()).or_insert_with(|| Arc::new(port)).clone()
    }

    pub fn port(&self, number: u16) -> Option<Arc<Port>> {
        lock(&self.ports).get(&number).cloned()
    }

    pub fn to_record(&self) -> TargetRecord {
        let ports = lock(&self.ports).clone();
        TargetRecord { ports: ports.iter().map(|(n, p)| (*n, p.to_record())).collect() }
    }
}

/// Resolve the host and fan out one gated probe per catalogue port.
pub(crate) async fn hunt_target(hunt: Arc<Hunt>, target: Arc<Target>) {
    let ctx = hunt.context();
    if !is_ip(target.host()) {
        if let Err(e) = resolve(target.host()).await {
            debug!("{} cannot be resolved: {}", target.host(), e);
            return;
        }
    }
    for spec in ctx.config.ports.iter().copied() {
        ctx.gate.spawn_gated(hunt_port(ctx.clone(), target.clone(), spec));
    }
}

/// Every host the enumerator reports becomes a target of its own, probed
/// without further enumeration.
pub(crate) async fn hunt_subdomains(hunt: Arc<Hunt>, domain: String) {
    let ctx = hunt.context();
    let lines = match ctx.subdomains.enumerate(&domain).await {
        Ok(lines) => lines,
        Err(e) => {
            warn!("subdomain enumeration for {} failed: {:#}", domain, e);
            return;
        }
    };
    for host in lines.iter().flat_map(|line| extract_hosts(line)) {
        if let Some(target) = hunt.add_target(&host) {
            info!("new target: {}", host);
            ctx.gate.spawn_gated(hunt_target(hunt.clone(), target));
        }
    }
}
