use host_discovery::{extract_hosts, is_ip};
use hunter_core::AdmissionGate;
use hunter_results::HuntRecord;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::info;

use crate::context::Context;
use crate::lock;
use crate::target::{hunt_subdomains, hunt_target, Target};

/// Root of the work tree: the scope and the registry of every known target.
pub struct Hunt {
    scope: Vec<String>,
    targets: Mutex<BTreeMap<String, Arc<Target>>>,
    ctx: Context,
}

impl Hunt {
    /// Take over the results of a previous run.
    pub fn new(record: HuntRecord, ctx: Context) -> Arc<Self> {
        let targets = record
            .targets
            .into_iter()
            .map(|(host, rec)| {
                let target = Arc::new(Target::from_record(&host, rec));
                (host, target)
            })
            .collect();
        Arc::new(Hunt { scope: record.scope, targets: Mutex::new(targets), ctx })
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.ctx.gate
    }

    pub fn scope(&self) -> &[String] {
        &self.scope
    }

    /// Insert-if-absent. `None` when the host is already known.
    pub fn add_target(&self, host: &str) -> Option<Arc<Target>> {
        let mut targets = lock(&self.targets);
        if targets.contains_key(host) {
            return None;
        }
        let target = Arc::new(Target::new(host));
        targets.insert(host.to_string(), target.clone());
        Some(target)
    }

    pub fn target(&self, host: &str) -> Option<Arc<Target>> {
        lock(&self.targets).get(host).cloned()
    }

    /// Spawn a probe for every target without results (reloaded or new from
    /// the scope). Returns how many were seeded.
    pub fn start(self: &Arc<Self>) -> usize {
        let pending: Vec<Arc<Target>> = lock(&self.targets)
            .values()
            .filter(|t| !t.is_scanned())
            .cloned()
            .collect();
        let mut seeded = pending.len();
        for target in pending {
            self.seed(target);
        }

        for host in self.scope.iter().flat_map(|entry| extract_hosts(entry)) {
            if let Some(target) = self.add_target(&host) {
                info!("new target: {}", host);
                self.seed(target);
                seeded += 1;
            }
        }
        seeded
    }

    fn seed(self: &Arc<Self>, target: Arc<Target>) {
        let gate = &self.ctx.gate;
        if self.ctx.config.subdomains && !is_ip(target.host()) {
            gate.spawn(hunt_subdomains(self.clone(), target.host().to_string()));
        }
        gate.spawn_gated(hunt_target(self.clone(), target));
    }

    /// Block until every task of the work tree has finished.
    pub async fn wait(&self) {
        self.ctx.gate.drain().await;
    }

    pub async fn run(self: &Arc<Self>) -> HuntRecord {
        self.start();
        self.wait().await;
        self.snapshot()
    }

    /// Current state of the whole tree, ready to be saved.
    pub fn snapshot(&self) -> HuntRecord {
        let targets = lock(&self.targets).clone();
        HuntRecord {
            scope: self.scope.clone(),
            targets: targets.iter().map(|(host, t)| (host.clone(), t.to_record())).collect(),
        }
    }
}
