use hunter_core::gate::{DEFAULT_SLOTS, MIN_SLOTS};
use hunter_core::ConfigError;
use port_scan::{well_known_ports, PortSpec};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Paths tried on every HTTP port when no wordlist is configured.
pub const DEFAULT_WORDLIST: &[&str] = &[
    "",
    ".env",
    ".git/config",
    ".well-known/security.txt",
    "admin",
    "api",
    "backup.zip",
    "contact",
    "login",
    "phpinfo.php",
    "robots.txt",
    "server-status",
    "sitemap.xml",
    "swagger.json",
    "wp-login.php",
];

/// Everything a hunt needs to know, passed down to every probe.
#[derive(Debug, Clone)]
pub struct HuntConfig {
    pub max_connections: usize,
    pub subdomains: bool,
    pub scan: bool,
    pub ports: Vec<PortSpec>,
    pub wordlist: Vec<String>,
    pub storage_dir: PathBuf,
    pub connect_timeout: Duration,
    pub banner_timeout: Duration,
    pub http_timeout: Duration,
    pub max_redirects: usize,
    pub cooldown: Duration,
    pub max_body_bytes: usize,
    pub subfinder: Vec<String>,
}

impl Default for HuntConfig {
    fn default() -> Self {
        HuntConfig {
            max_connections: DEFAULT_SLOTS,
            subdomains: false,
            scan: false,
            ports: well_known_ports(),
            wordlist: DEFAULT_WORDLIST.iter().map(|s| s.to_string()).collect(),
            storage_dir: PathBuf::from("."),
            connect_timeout: Duration::from_secs(1),
            banner_timeout: Duration::from_secs(2),
            http_timeout: Duration::from_secs(10),
            max_redirects: 10,
            cooldown: Duration::from_secs(60),
            max_body_bytes: 10 * 1024 * 1024,
            subfinder: vec!["subfinder".into(), "-all".into(), "-silent".into()],
        }
    }
}

impl HuntConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections < MIN_SLOTS {
            return Err(ConfigError::TooFewConnections { min: MIN_SLOTS, got: self.max_connections });
        }
        if self.ports.is_empty() {
            return Err(ConfigError::InvalidPorts { spec: String::new(), reason: "no port to probe".into() });
        }
        Ok(())
    }
}

/// Newline-delimited wordlist. `#` lines and blank lines are skipped, a
/// leading `/` is dropped, and the root path is always probed first.
pub fn load_wordlist(path: &Path) -> Result<Vec<String>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Wordlist {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_wordlist(&text))
}

fn parse_wordlist(text: &str) -> Vec<String> {
    let mut words = vec![String::new()];
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let word = line.trim_start_matches('/').to_string();
        if !words.contains(&word) {
            words.push(word);
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let c = HuntConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.max_connections, 150);
        assert_eq!(c.ports.len(), 22);
        assert_eq!(c.wordlist[0], "");
    }

    #[test]
    fn too_few_connections() {
        let c = HuntConfig { max_connections: 3, ..HuntConfig::default() };
        assert!(matches!(c.validate(), Err(ConfigError::TooFewConnections { min: 5, got: 3 })));
    }

    #[test]
    fn wordlist_parsing() {
        let words = parse_wordlist("# comment\n/admin\n\n.env\nadmin\n/\n");
        assert_eq!(words, vec!["", "admin", ".env"]);
    }

    #[test]
    fn missing_wordlist_is_config_error() {
        let err = load_wordlist(Path::new("/nonexistent/words.txt")).unwrap_err();
        assert!(matches!(err, ConfigError::Wordlist { .. }));
    }
}
