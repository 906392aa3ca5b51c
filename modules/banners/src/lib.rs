//! Banner grabbing and version extraction for FTP, SSH and MySQL.

use once_cell::sync::Lazy;
use regex::bytes::Regex;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::{timeout_at, Instant};

const MAX_BANNER: usize = 4096;

static RE_SSH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?im-u)^.*ssh.*$").unwrap());
static RE_MYSQL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m-u)^[0-9A-Za-z_+.\-]{3,}").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Ftp,
    Ssh,
    Mysql,
}

/// Read whatever the server volunteers before `deadline` (capped at 4 KiB).
/// Zero bytes is a valid outcome.
pub async fn read_banner<S>(stream: &mut S, deadline: Duration, stop_at_newline: bool) -> Vec<u8>
where
    S: AsyncRead + Unpin,
{
    let until = Instant::now() + deadline;
    let mut buf = Vec::new();
    let mut chunk = [0u8; 512];
    while buf.len() < MAX_BANNER {
        match timeout_at(until, stream.read(&mut chunk)).await {
            Ok(Ok(0)) | Ok(Err(_)) | Err(_) => break,
            Ok(Ok(n)) => {
                buf.extend_from_slice(&chunk[..n]);
                if stop_at_newline && chunk[..n].contains(&b'\n') {
                    break;
                }
            }
        }
    }
    buf.truncate(MAX_BANNER);
    buf
}

/// Read the banner of an already connected service and extract its version.
pub async fn grab_version<S>(stream: &mut S, protocol: Protocol, deadline: Duration) -> Option<String>
where
    S: AsyncRead + Unpin,
{
    // MySQL greetings carry no newline
    let stop_at_newline = protocol != Protocol::Mysql;
    let banner = read_banner(stream, deadline, stop_at_newline).await;
    match protocol {
        Protocol::Ftp => ftp_version(&banner),
        Protocol::Ssh => ssh_version(&banner),
        Protocol::Mysql => mysql_version(&banner),
    }
}

/// First banner line without its 3-digit status code.
pub fn ftp_version(banner: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(banner);
    let line = text.split('\n').next()?;
    let version = line.get(3..)?.trim_start_matches('-').trim();
    non_empty(version)
}

pub fn ssh_version(banner: &[u8]) -> Option<String> {
    let m = RE_SSH.find(banner)?;
    non_empty(String::from_utf8_lossy(m.as_bytes()).trim())
}

/// The protocol byte (0x0a) precedes the version, so it shows up as a line start.
pub fn mysql_version(banner: &[u8]) -> Option<String> {
    let m = RE_MYSQL.find(banner)?;
    non_empty(String::from_utf8_lossy(m.as_bytes()).trim())
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::{TcpListener, TcpStream};

    #[test]
    fn ftp_banner() {
        assert_eq!(ftp_version(b"220 ProFTPD 1.3.5 Server ready.\r\n").as_deref(), Some("ProFTPD 1.3.5 Server ready."));
        assert_eq!(ftp_version(b"220-vsFTPd 3.0.3\r\n220 ok\r\n").as_deref(), Some("vsFTPd 3.0.3"));
        assert_eq!(ftp_version(b"220"), None);
        assert_eq!(ftp_version(b""), None);
    }

    #[test]
    fn ssh_banner() {
        let banner = b"SSH-2.0-OpenSSH_8.9p1 Ubuntu-3ubuntu0.4\r\n";
        assert_eq!(ssh_version(banner).as_deref(), Some("SSH-2.0-OpenSSH_8.9p1 Ubuntu-3ubuntu0.4"));
        assert_eq!(ssh_version(b"hello\nwelcome to ssh land\n").as_deref(), Some("welcome to ssh land"));
        assert_eq!(ssh_version(b"nothing here"), None);
    }

    #[test]
    fn mysql_greeting() {
        let mut greeting = vec![0x4a, 0x00, 0x00, 0x00, 0x0a];
        greeting.extend_from_slice(b"8.0.33-0ubuntu0.22.04.2");
        greeting.extend_from_slice(&[0x00, 0x08, 0x00, 0x00, 0x00]);
        assert_eq!(mysql_version(&greeting).as_deref(), Some("8.0.33-0ubuntu0.22.04.2"));
        assert_eq!(mysql_version(&[0x01, 0x00]), None);
    }

    #[tokio::test]
    async fn grab_from_live_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            sock.write_all(b"SSH-2.0-dropbear_2022.83\r\n").await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let started = std::time::Instant::now();
        let v = grab_version(&mut stream, Protocol::Ssh, Duration::from_secs(2)).await;
        assert_eq!(v.as_deref(), Some("SSH-2.0-dropbear_2022.83"));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn silent_service_yields_nothing() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (_sock, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
        });
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let banner = read_banner(&mut stream, Duration::from_millis(100), true).await;
        assert!(banner.is_empty());
    }
}
