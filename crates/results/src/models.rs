use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root of the result file: the user-edited scope plus everything found so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HuntRecord {
    #[serde(default)]
    pub scope: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<String, TargetRecord>,
}

impl HuntRecord {
    /// Totals of (targets, open ports, recorded paths).
    pub fn counts(&self) -> (usize, usize, usize) {
        let ports = self.targets.values().map(|t| t.ports.len()).sum();
        let paths = self
            .targets
            .values()
            .flat_map(|t| t.ports.values())
            .map(|p| p.paths.len())
            .sum();
        (self.targets.len(), ports, paths)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ports: BTreeMap<u16, PortRecord>,
}

impl TargetRecord {
    /// A target with at least one open port is never probed again.
    pub fn is_scanned(&self) -> bool {
        !self.ports.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortRecord {
    pub number: u16,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub crlf_vulnerabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub paths: BTreeMap<String, PathRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathRecord {
    #[serde(default)]
    pub status: u16,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tech: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub xss: Vec<XssPoc>,
}

impl PathRecord {
    /// Add a technology token, trimmed and lower-cased, unless already known.
    pub fn add_tech(&mut self, token: &str) {
        let token = token.trim().to_lowercase();
        if token.is_empty() || self.tech.contains(&token) {
            return;
        }
        self.tech.push(token);
    }
}

/// One reflected-XSS proof of concept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XssPoc {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub param: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub payload: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub evidence: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cwe: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub severity: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tech_is_normalized_and_deduplicated() {
        let mut p = PathRecord::default();
        p.add_tech(" Nginx/1.18.0 ");
        p.add_tech("nginx/1.18.0");
        p.add_tech("");
        p.add_tech("PHP");
        assert_eq!(p.tech, vec!["nginx/1.18.0", "php"]);
    }

    #[test]
    fn parse_hand_written_document() {
        let doc = r#"
scope:
  - example.com
  - 10.0.0.0/29
targets:
  example.com:
    ports:
      80:
        number: 80
        name: http
        paths:
          /:
            status: 200
            contentType: text/html
            title: Example
            tech: [nginx]
      22:
        number: 22
        name: ssh
        version: SSH-2.0-OpenSSH_9.6
  pending.example.com: {}
"#;
        let hunt: HuntRecord = serde_yaml::from_str(doc).unwrap();
        assert_eq!(hunt.scope.len(), 2);
        let t = &hunt.targets["example.com"];
        assert!(t.is_scanned());
        assert!(!hunt.targets["pending.example.com"].is_scanned());
        let root = &t.ports[&80].paths["/"];
        assert_eq!(root.status, 200);
        assert_eq!(root.content_type, "text/html");
        assert_eq!(root.title, "Example");
        assert_eq!(t.ports[&22].version.as_deref(), Some("SSH-2.0-OpenSSH_9.6"));
        assert_eq!(hunt.counts(), (2, 2, 1));
    }

    #[test]
    fn empty_fields_are_omitted() {
        let mut port = PortRecord { number: 8080, name: "http".into(), ..Default::default() };
        port.paths.insert("/".into(), PathRecord { status: 200, ..Default::default() });
        let yaml = serde_yaml::to_string(&port).unwrap();
        assert!(yaml.contains("number: 8080"));
        assert!(!yaml.contains("version"));
        assert!(!yaml.contains("crlfVulnerabilities"));
        assert!(!yaml.contains("contentType"));
    }
}
