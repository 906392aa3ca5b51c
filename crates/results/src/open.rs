use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::models::HuntRecord;

pub const DEFAULT_FILE: &str = "hunt.yml";

/// Read the result file. `Ok(None)` when it does not exist yet.
pub fn load(path: &Path) -> Result<Option<HuntRecord>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    if text.trim().is_empty() {
        return Ok(Some(HuntRecord::default()));
    }
    let record = serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(record))
}

/// Write the whole document to a sibling temp file, then rename it over `path`.
pub fn save(path: &Path, record: &HuntRecord) -> Result<()> {
    let yaml = serde_yaml::to_string(record).context("serializing hunt")?;
    let tmp = temp_sibling(path);
    {
        let mut f = fs::File::create(&tmp).with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(yaml.as_bytes()).with_context(|| format!("writing {}", tmp.display()))?;
        f.sync_all().with_context(|| format!("flushing {}", tmp.display()))?;
    }
    fs::rename(&tmp, path).with_context(|| format!("replacing {}", path.display()))?;
    Ok(())
}

/// Create an empty result file for the user to fill in. Never overwrites.
pub fn write_skeleton(path: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(&HuntRecord::default()).context("serializing hunt")?;
    let mut f = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("creating {}", path.display()))?;
    f.write_all(yaml.as_bytes()).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_FILE.to_string());
    path.with_file_name(format!(".{}.tmp", name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PortRecord, TargetRecord};

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("nope.yml")).unwrap().is_none());
    }

    #[test]
    fn save_then_load_keeps_targets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_FILE);
        let mut hunt = HuntRecord { scope: vec!["example.com".into()], ..Default::default() };
        let mut target = TargetRecord::default();
        target.ports.insert(22, PortRecord { number: 22, name: "ssh".into(), ..Default::default() });
        hunt.targets.insert("example.com".into(), target);

        save(&path, &hunt).unwrap();
        assert_eq!(load(&path).unwrap(), Some(hunt));
        let leftovers: Vec<_> = fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1, "temp file left behind");
    }

    #[test]
    fn skeleton_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_FILE);
        write_skeleton(&path).unwrap();
        assert_eq!(load(&path).unwrap(), Some(HuntRecord::default()));
        assert!(write_skeleton(&path).is_err());
    }

    #[test]
    fn empty_file_is_an_empty_hunt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_FILE);
        fs::write(&path, "\n").unwrap();
        assert_eq!(load(&path).unwrap(), Some(HuntRecord::default()));
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DEFAULT_FILE);
        fs::write(&path, "scope: [unterminated\n").unwrap();
        assert!(load(&path).is_err());
    }
}
