//! Scope expansion (hosts, URLs, CIDRs) and best-effort name resolution.

use anyhow::{bail, Result};
use ipnet::IpNet;
use std::io;
use std::net::IpAddr;
use url::{Host, Url};

/// IPv6 networks wider than this are not expanded.
const MAX_V6_PREFIX_EXPANDED: u8 = 112;
const MAX_LABEL_LEN: usize = 63;

/// Expand a CIDR into host addresses, network and broadcast excluded.
pub fn expand_cidr(cidr: &str) -> Result<Vec<IpAddr>> {
    let net: IpNet = cidr.parse()?;
    expand_net(net)
}

fn expand_net(net: IpNet) -> Result<Vec<IpAddr>> {
    if let IpNet::V6(v6) = net {
        if v6.prefix_len() < MAX_V6_PREFIX_EXPANDED {
            bail!("refusing to expand {} (prefix shorter than /{})", net, MAX_V6_PREFIX_EXPANDED);
        }
    }
    Ok(net.hosts().collect())
}

/// Hosts (domains or IPs) named by a scope entry, which can be a domain, an IP,
/// a URL or a CIDR. Invalid entries yield nothing.
pub fn extract_hosts(entry: &str) -> Vec<String> {
    let entry = entry.trim();

    if let Ok(net) = entry.parse::<IpNet>() {
        return expand_net(net)
            .map(|ips| ips.into_iter().map(|ip| ip.to_string()).collect())
            .unwrap_or_default();
    }

    // url needs a scheme to find the host
    let candidate = if entry.contains("://") {
        entry.to_string()
    } else {
        format!("http://{}", entry)
    };
    let Ok(url) = Url::parse(&candidate) else {
        return Vec::new();
    };

    match url.host() {
        Some(Host::Ipv4(ip)) => vec![ip.to_string()],
        Some(Host::Ipv6(ip)) => vec![ip.to_string()],
        Some(Host::Domain(domain)) if is_valid_domain(domain) => vec![domain.to_string()],
        _ => Vec::new(),
    }
}

fn is_valid_domain(domain: &str) -> bool {
    domain.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= MAX_LABEL_LEN
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

pub fn is_ip(host: &str) -> bool {
    host.parse::<IpAddr>().is_ok()
}

/// Resolve a hostname. Literal IPs resolve to themselves without a lookup.
pub async fn resolve(host: &str) -> io::Result<Vec<IpAddr>> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![ip]);
    }
    let addrs: Vec<IpAddr> = tokio::net::lookup_host((host, 0u16)).await?.map(|sa| sa.ip()).collect();
    if addrs.is_empty() {
        return Err(io::Error::new(io::ErrorKind::NotFound, format!("no address for {}", host)));
    }
    Ok(addrs)
}
