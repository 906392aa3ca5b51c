use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::path::sanitize_segment;

/// A response as written to disk.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn new(status: u16, headers: &HeaderMap, body: Vec<u8>) -> Self {
        let headers = headers
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), String::from_utf8_lossy(v.as_bytes()).into_owned()))
            .collect();
        RawResponse { status, headers, body }
    }

    /// Status line, `name: value` headers, blank line, body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let reason = StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("");
        let mut out = format!("HTTP/1.1 {} {}\r\n", self.status, reason).into_bytes();
        for (name, value) in &self.headers {
            out.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
        }
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body);
        out
    }
}

/// Raw responses under `<root>/http/<host>/<port>/<path>/index.http`.
#[derive(Debug, Clone)]
pub struct ResponseStore {
    root: PathBuf,
}

impl ResponseStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        ResponseStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `path` is expected already normalized; segments are sanitized again
    /// so nothing can escape the root.
    pub fn path_for(&self, host: &str, port: u16, path: &str) -> PathBuf {
        let mut out = self.root.join("http");
        out.push(sanitize_segment(host));
        out.push(port.to_string());
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            out.push(sanitize_segment(segment));
        }
        out.push("index.http");
        out
    }

    pub async fn save(&self, host: &str, port: u16, path: &str, resp: &RawResponse) -> io::Result<PathBuf> {
        let file = self.path_for(host, port, path);
        if let Some(dir) = file.parent() {
            fs::create_dir_all(dir).await?;
        }
        fs::write(&file, resp.to_bytes()).await?;
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn layout() {
        let store = ResponseStore::new("/data");
        assert_eq!(
            store.path_for("example.com", 80, "/"),
            PathBuf::from("/data/http/example.com/80/index.http")
        );
        assert_eq!(
            store.path_for("::1", 8080, "/a/../b/"),
            PathBuf::from("/data/http/__1/8080/a/_/b/index.http")
        );
    }

    #[test]
    fn serialized_form() {
        let mut headers = HeaderMap::new();
        headers.insert("content-type", HeaderValue::from_static("text/plain"));
        let raw = RawResponse::new(200, &headers, b"hello".to_vec());
        assert_eq!(raw.to_bytes(), b"HTTP/1.1 200 OK\r\ncontent-type: text/plain\r\n\r\nhello".to_vec());
    }

    #[tokio::test]
    async fn save_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResponseStore::new(dir.path());
        let raw = RawResponse { status: 404, headers: vec![], body: b"gone".to_vec() };
        let file = store.save("example.com", 443, "/deep/er/file.js", &raw).await.unwrap();
        assert!(file.ends_with("http/example.com/443/deep/er/file.js/index.http"));
        let text = std::fs::read_to_string(file).unwrap();
        assert_eq!(text, "HTTP/1.1 404 Not Found\r\n\r\ngone");
    }
}
