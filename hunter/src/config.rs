use anyhow::{Context, Result};
use hunt_engine::{load_wordlist, HuntConfig};
use hunter_core::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG: &str = "hunter.yaml";

#[derive(Debug, Default, Deserialize, Clone)]
pub struct RunConfig {
    pub max_connections: Option<usize>,
    pub subdomains: Option<bool>,
    pub scan: Option<bool>,
    pub ports: Option<String>,
    pub wordlist: Option<PathBuf>,
    pub connect_timeout_ms: Option<u64>,
    pub banner_timeout_ms: Option<u64>,
    pub http_timeout_ms: Option<u64>,
    pub max_redirects: Option<usize>,
    pub cooldown_secs: Option<u64>,
    pub max_body_bytes: Option<usize>,
    pub storage_dir: Option<PathBuf>,
    pub subfinder: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize, Clone)]
pub struct Config {
    pub run: Option<RunConfig>,
}

/// Explicit path must exist. Without one, `./hunter.yaml` is used when present.
pub fn load_config(path: Option<&Path>) -> Result<Option<Config>> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => {
            let p = Path::new(DEFAULT_CONFIG);
            if p.exists() { p.to_path_buf() } else { return Ok(None); }
        }
    };
    let s = fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    let cfg = serde_yaml::from_str(&s).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(cfg))
}

pub fn parse_port_list(spec: &str) -> Result<Vec<port_scan::PortSpec>, ConfigError> {
    port_scan::select_ports(spec).map_err(|e| ConfigError::InvalidPorts { spec: spec.to_string(), reason: e.to_string() })
}

impl RunConfig {
    /// Overwrite the settings this file sets.
    pub fn apply(&self, cfg: &mut HuntConfig) -> Result<()> {
        if let Some(v) = self.max_connections { cfg.max_connections = v; }
        if let Some(v) = self.subdomains { cfg.subdomains = v; }
        if let Some(v) = self.scan { cfg.scan = v; }
        if let Some(spec) = &self.ports { cfg.ports = parse_port_list(spec)?; }
        if let Some(path) = &self.wordlist { cfg.wordlist = load_wordlist(path)?; }
        if let Some(v) = self.connect_timeout_ms { cfg.connect_timeout = Duration::from_millis(v); }
        if let Some(v) = self.banner_timeout_ms { cfg.banner_timeout = Duration::from_millis(v); }
        if let Some(v) = self.http_timeout_ms { cfg.http_timeout = Duration::from_millis(v); }
        if let Some(v) = self.max_redirects { cfg.max_redirects = v; }
        if let Some(v) = self.cooldown_secs { cfg.cooldown = Duration::from_secs(v); }
        if let Some(v) = self.max_body_bytes { cfg.max_body_bytes = v; }
        if let Some(v) = &self.storage_dir { cfg.storage_dir = v.clone(); }
        if let Some(v) = &self.subfinder { cfg.subfinder = v.clone(); }
        Ok(())
    }
}
