use anyhow::Result;
use hunter_core::AdmissionGate;
use reqwest::Client;
use std::sync::Arc;
use web_surface::{
    build_client, ClientOptions, CrlfProber, HeaderInjectionProber, ReflectionProber, ResponseStore, XssProber,
};

use crate::config::HuntConfig;
use crate::subdomains::{SubdomainSource, Subfinder};

/// Shared by every task of one hunt. Cheap to clone.
#[derive(Clone)]
pub struct Context {
    pub config: Arc<HuntConfig>,
    pub gate: AdmissionGate,
    pub client: Client,
    pub store: ResponseStore,
    pub xss: Arc<dyn XssProber>,
    pub crlf: Arc<dyn CrlfProber>,
    pub subdomains: Arc<dyn SubdomainSource>,
}

impl Context {
    pub fn new(config: HuntConfig) -> Result<Self> {
        config.validate()?;
        let gate = AdmissionGate::new(config.max_connections)?;
        let client = build_client(&ClientOptions { timeout: config.http_timeout, redirects: config.max_redirects })?;
        let raw_client = build_client(&ClientOptions { timeout: config.http_timeout, redirects: 0 })?;
        Ok(Context {
            store: ResponseStore::new(config.storage_dir.clone()),
            xss: Arc::new(ReflectionProber::new(client.clone())),
            crlf: Arc::new(HeaderInjectionProber::new(raw_client)),
            subdomains: Arc::new(Subfinder::new(config.subfinder.clone())),
            config: Arc::new(config),
            gate,
            client,
        })
    }

    pub fn with_xss(mut self, prober: Arc<dyn XssProber>) -> Self {
        self.xss = prober;
        self
    }

    pub fn with_crlf(mut self, prober: Arc<dyn CrlfProber>) -> Self {
        self.crlf = prober;
        self
    }

    pub fn with_subdomains(mut self, source: Arc<dyn SubdomainSource>) -> Self {
        self.subdomains = source;
        self
    }
}
