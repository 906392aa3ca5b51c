use anyhow::{bail, Context as _, Result};
use async_trait::async_trait;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Anything that lists subdomains of a domain, one candidate host per item.
#[async_trait]
pub trait SubdomainSource: Send + Sync {
    async fn enumerate(&self, domain: &str) -> Result<Vec<String>>;
}

/// Runs an external enumerator (subfinder by default) with the domain on
/// stdin and reads newline-delimited hosts from stdout.
pub struct Subfinder {
    argv: Vec<String>,
}

impl Subfinder {
    pub fn new(argv: Vec<String>) -> Self {
        Subfinder { argv }
    }
}

#[async_trait]
impl SubdomainSource for Subfinder {
    async fn enumerate(&self, domain: &str) -> Result<Vec<String>> {
        let Some((program, args)) = self.argv.split_first() else {
            bail!("no subdomain enumeration command configured");
        };
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("spawning {program}"))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(format!("{domain}\n").as_bytes()).await?;
        }
        let output = child.wait_with_output().await?;
        if !output.status.success() {
            bail!("{program} exited with {}", output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Subfinder {
        Subfinder::new(vec!["sh".into(), "-c".into(), script.into()])
    }

    #[tokio::test]
    async fn reads_hosts_from_stdout() {
        let hosts = sh("read d; echo www.$d; echo; echo api.$d").enumerate("example.com").await.unwrap();
        assert_eq!(hosts, vec!["www.example.com", "api.example.com"]);
    }

    #[tokio::test]
    async fn failures_surface() {
        assert!(sh("exit 3").enumerate("example.com").await.is_err());
        assert!(Subfinder::new(vec![]).enumerate("example.com").await.is_err());
        assert!(Subfinder::new(vec!["/nonexistent/subfinder".into()]).enumerate("x.org").await.is_err());
    }
}
