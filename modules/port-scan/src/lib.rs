//! Well-known port catalogue and TCP connect probing with timeouts.

use anyhow::{anyhow, Result};
use std::io;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Http,
    Https,
    Ftp,
    Ssh,
    Telnet,
    Smb,
    Mssql,
    Oracle,
    Docker,
    Mysql,
    Postgresql,
    Elasticsearch,
    Kubernetes,
    Mongodb,
    Unknown,
}

impl Service {
    /// Protocol label recorded as the port name.
    pub fn name(self) -> &'static str {
        match self {
            Service::Http => "http",
            Service::Https => "https",
            Service::Ftp => "ftp",
            Service::Ssh => "ssh",
            Service::Telnet => "telnet",
            Service::Smb => "smb",
            Service::Mssql => "mssql",
            Service::Oracle => "oracle",
            Service::Docker => "docker",
            Service::Mysql => "mysql",
            Service::Postgresql => "postgresql",
            Service::Elasticsearch => "elasticsearch",
            Service::Kubernetes => "kubernetes",
            Service::Mongodb => "mongodb",
            Service::Unknown => "unknown",
        }
    }

    pub fn is_http(self) -> bool {
        matches!(self, Service::Http | Service::Https)
    }

    /// URL scheme for HTTP-family services.
    pub fn scheme(self) -> Option<&'static str> {
        match self {
            Service::Http => Some("http"),
            Service::Https => Some("https"),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortSpec {
    pub number: u16,
    pub service: Service,
}

impl PortSpec {
    pub const fn new(number: u16, service: Service) -> Self {
        PortSpec { number, service }
    }
}

const CATALOGUE: &[PortSpec] = &[
    PortSpec::new(21, Service::Ftp),
    PortSpec::new(22, Service::Ssh),
    PortSpec::new(23, Service::Telnet),
    PortSpec::new(80, Service::Http),
    PortSpec::new(443, Service::Https),
    PortSpec::new(445, Service::Smb),
    PortSpec::new(1433, Service::Mssql),
    PortSpec::new(1521, Service::Oracle),
    PortSpec::new(2375, Service::Docker),
    PortSpec::new(3000, Service::Http),
    PortSpec::new(3306, Service::Mysql),
    PortSpec::new(5000, Service::Http),
    PortSpec::new(5432, Service::Postgresql),
    PortSpec::new(8000, Service::Http),
    PortSpec::new(8008, Service::Http),
    PortSpec::new(8080, Service::Http),
    PortSpec::new(8081, Service::Http),
    PortSpec::new(8443, Service::Https),
    PortSpec::new(8888, Service::Http),
    PortSpec::new(9200, Service::Elasticsearch),
    PortSpec::new(10250, Service::Kubernetes),
    PortSpec::new(27017, Service::Mongodb),
];

/// Every port probed on a target by default.
pub fn well_known_ports() -> Vec<PortSpec> {
    CATALOGUE.to_vec()
}

pub fn service_for(port: u16) -> Service {
    CATALOGUE
        .iter()
        .find(|p| p.number == port)
        .map(|p| p.service)
        .unwrap_or(Service::Unknown)
}

/// Parse a comma-separated list of ports/ranges (e.g., "22,80,443", "1-1024,8080").
pub fn parse_ports(spec: &str) -> Result<Vec<u16>> {
    let mut ports = Vec::new();
    for part in spec.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
        if let Some((start, end)) = part.split_once('-') {
            let s: u16 = start.trim().parse()?;
            let e: u16 = end.trim().parse()?;
            if s == 0 || e == 0 || s > e {
                return Err(anyhow!("invalid port range: {}", part));
            }
            ports.extend(s..=e);
        } else {
            let p: u16 = part.parse()?;
            if p == 0 {
                return Err(anyhow!("invalid port: {}", part));
            }
            ports.push(p);
        }
    }
    ports.sort_unstable();
    ports.dedup();
    Ok(ports)
}

/// Ports from a list spec, each tagged with its catalogue service.
pub fn select_ports(spec: &str) -> Result<Vec<PortSpec>> {
    let ports = parse_ports(spec)?;
    if ports.is_empty() {
        return Err(anyhow!("empty port list"));
    }
    Ok(ports.into_iter().map(|p| PortSpec::new(p, service_for(p))).collect())
}

/// Try a TCP connect within `connect_timeout`.
///
/// A closed, filtered or silent port is `Ok(None)`: it is a normal outcome.
/// `Err` is kept for faults worth logging (unreachable network, bad address...).
pub async fn open_port(host: &str, port: u16, connect_timeout: Duration) -> io::Result<Option<TcpStream>> {
    match timeout(connect_timeout, TcpStream::connect((host, port))).await {
        Err(_) => Ok(None),
        Ok(Ok(stream)) => Ok(Some(stream)),
        Ok(Err(e)) if is_closed(&e) => Ok(None),
        Ok(Err(e)) => Err(e),
    }
}

fn is_closed(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused | io::ErrorKind::ConnectionReset | io::ErrorKind::TimedOut
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[test]
    fn parse_simple_list() {
        let v = parse_ports("22,80,443").unwrap();
        assert_eq!(v, vec![22, 80, 443]);
    }

    #[test]
    fn parse_ranges_and_list() {
        let v = parse_ports("1-3,5,3").unwrap();
        assert_eq!(v, vec![1, 2, 3, 5]);
    }

    #[test]
    fn reject_invalid() {
        assert!(parse_ports("0").is_err());
        assert!(parse_ports("10-5").is_err());
        assert!(select_ports("").is_err());
    }

    #[test]
    fn http_family_and_tls() {
        let http: Vec<u16> = well_known_ports()
            .into_iter()
            .filter(|p| p.service.is_http())
            .map(|p| p.number)
            .collect();
        assert_eq!(http, vec![80, 443, 3000, 5000, 8000, 8008, 8080, 8081, 8443, 8888]);
        assert_eq!(service_for(443).scheme(), Some("https"));
        assert_eq!(service_for(8443).scheme(), Some("https"));
        assert_eq!(service_for(8080).scheme(), Some("http"));
        assert_eq!(service_for(22).scheme(), None);
        assert_eq!(well_known_ports().len(), 22);
    }

    #[test]
    fn selected_ports_keep_catalogue_names() {
        let v = select_ports("21,3306,4444").unwrap();
        assert_eq!(v[0].service, Service::Ftp);
        assert_eq!(v[1].service.name(), "mysql");
        assert_eq!(v[2].service, Service::Unknown);
    }

    #[tokio::test]
    async fn open_and_closed_ports() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let open = open_port("127.0.0.1", port, Duration::from_secs(1)).await.unwrap();
        assert!(open.is_some());

        drop(listener);
        let closed = open_port("127.0.0.1", port, Duration::from_secs(1)).await.unwrap();
        assert!(closed.is_none());
    }
}
