use anyhow::Result;
use colored::Colorize;
use std::io::Write;

use crate::models::{HuntRecord, PathRecord, PortRecord};

fn visible(path: &PathRecord, show_all: bool) -> bool {
    show_all || path.status < 300
}

/// Human-readable tree of everything found, one line per port and path.
pub fn write_text<W: Write>(w: &mut W, hunt: &HuntRecord, show_all: bool) -> Result<()> {
    for (host, target) in &hunt.targets {
        if target.ports.is_empty() {
            continue;
        }
        writeln!(w, "{}", host.bold())?;
        for (number, port) in &target.ports {
            let mut line = format!("\t{}  {}", format!(":{}", number).bold(), port.name.dimmed());
            if let Some(v) = &port.version {
                line.push_str(&format!("  {}", v.magenta()));
            }
            writeln!(w, "{}", line)?;

            if !port.crlf_vulnerabilities.is_empty() {
                writeln!(w, "\t\t{}", " CRLF vulns ".white().on_red())?;
                for url in &port.crlf_vulnerabilities {
                    writeln!(w, "\t\t\t{}", url.red())?;
                }
            }

            for (path, found) in port.paths.iter().filter(|(_, p)| visible(p, show_all)) {
                writeln!(w, "\t\t{}", path_line(path, found))?;
                if !found.xss.is_empty() {
                    writeln!(w, "\t\t\t{}", " XSS vulns ".white().on_red())?;
                    for poc in &found.xss {
                        writeln!(w, "\t\t\t\t?{}={}", poc.param.red(), poc.payload)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn path_line(path: &str, found: &PathRecord) -> String {
    let status = if found.status <= 299 {
        found.status.to_string().green()
    } else {
        found.status.to_string().red()
    };
    let mut line = format!("{}  {}", path.bold(), status);
    if found.content_type == "text/html" {
        line.push_str(&format!("  {}", found.content_type.yellow()));
    } else if !found.content_type.is_empty() {
        line.push_str(&format!("  {}", found.content_type.bright_yellow()));
    }
    if !found.tech.is_empty() {
        line.push_str(&format!("  {}", found.tech.join(", ").magenta()));
    }
    if !found.title.is_empty() {
        line.push_str(&format!("  {}", found.title.blue()));
    }
    line
}

/// Whole document as pretty JSON.
pub fn write_json<W: Write>(w: &mut W, hunt: &HuntRecord) -> Result<()> {
    serde_json::to_writer_pretty(&mut *w, hunt)?;
    writeln!(w)?;
    Ok(())
}

/// One JSON object per path (or per port when it has no visible path).
pub fn write_jsonl<W: Write>(w: &mut W, hunt: &HuntRecord, show_all: bool) -> Result<()> {
    for row in rows(hunt, show_all) {
        let obj = serde_json::json!({
            "host": row.host,
            "port": row.port.number,
            "name": row.port.name,
            "version": row.port.version,
            "path": row.path,
            "status": row.found.map(|p| p.status),
            "content_type": row.found.map(|p| p.content_type.as_str()),
            "title": row.found.map(|p| p.title.as_str()),
            "tech": row.found.map(|p| p.tech.clone()).unwrap_or_default(),
            "xss": row.found.map(|p| p.xss.len()).unwrap_or(0),
        });
        writeln!(w, "{}", serde_json::to_string(&obj)?)?;
    }
    Ok(())
}

pub fn write_csv<W: Write>(w: W, hunt: &HuntRecord, show_all: bool) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(w);
    wtr.write_record(["host", "port", "name", "version", "path", "status", "content_type", "title", "tech"])?;
    for row in rows(hunt, show_all) {
        wtr.write_record([
            row.host.to_string(),
            row.port.number.to_string(),
            row.port.name.clone(),
            row.port.version.clone().unwrap_or_default(),
            row.path.map(str::to_string).unwrap_or_default(),
            row.found.map(|p| p.status.to_string()).unwrap_or_default(),
            row.found.map(|p| p.content_type.clone()).unwrap_or_default(),
            row.found.map(|p| p.title.clone()).unwrap_or_default(),
            row.found.map(|p| p.tech.join("|")).unwrap_or_default(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

struct Row<'a> {
    host: &'a str,
    port: &'a PortRecord,
    path: Option<&'a str>,
    found: Option<&'a PathRecord>,
}

fn rows(hunt: &HuntRecord, show_all: bool) -> Vec<Row<'_>> {
    let mut out = Vec::new();
    for (host, target) in &hunt.targets {
        for port in target.ports.values() {
            let before = out.len();
            for (path, found) in port.paths.iter().filter(|(_, p)| visible(p, show_all)) {
                out.push(Row { host, port, path: Some(path.as_str()), found: Some(found) });
            }
            if out.len() == before {
                out.push(Row { host, port, path: None, found: None });
            }
        }
    }
    out
}
