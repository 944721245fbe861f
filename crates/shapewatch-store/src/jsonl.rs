//! JSONL graph files: one triple per line.
//!
//! The portable on-disk form of a named graph. Writes go to a sibling temp
//! file and are renamed into place, so readers never see a half-written
//! graph.

use crate::error::StoreError;
use crate::term::Triple;
use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// Read triples from a JSONL reader. Blank lines and `#` comments are skipped.
pub fn read_triples(reader: impl BufRead) -> Result<BTreeSet<Triple>, StoreError> {
    let mut triples = BTreeSet::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| StoreError::Io(format!("line {}: {e}", line_no + 1)))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let triple: Triple = serde_json::from_str(trimmed).map_err(|e| StoreError::Parse {
            line: line_no + 1,
            message: e.to_string(),
        })?;
        triples.insert(triple);
    }
    Ok(triples)
}

/// Write triples to a JSONL writer, in the set's order.
pub fn write_triples<'a>(
    writer: &mut impl Write,
    triples: impl IntoIterator<Item = &'a Triple>,
) -> Result<(), StoreError> {
    for triple in triples {
        let line =
            serde_json::to_string(triple).map_err(|e| StoreError::Serialize(e.to_string()))?;
        writeln!(writer, "{line}").map_err(|e| StoreError::Io(e.to_string()))?;
    }
    Ok(())
}

/// Read a graph file. A missing file is an empty graph.
pub fn read_triples_from_path(path: impl AsRef<Path>) -> Result<BTreeSet<Triple>, StoreError> {
    let path = path.as_ref();
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(e) => return Err(StoreError::Io(format!("{}: {e}", path.display()))),
    };
    validate_graph_bytes(path, &bytes)?;
    read_triples(BufReader::new(bytes.as_slice()))
}

/// Replace a graph file atomically.
pub fn write_triples_to_path(
    path: impl AsRef<Path>,
    triples: &BTreeSet<Triple>,
) -> Result<(), StoreError> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .map_err(|e| StoreError::Io(format!("{}: {e}", parent.display())))?;
    }

    let tmp_path = tmp_write_path(path);
    let write_result = (|| -> Result<(), StoreError> {
        let file = File::create(&tmp_path)
            .map_err(|e| StoreError::Io(format!("{}: {e}", tmp_path.display())))?;
        let mut writer = BufWriter::new(file);
        write_triples(&mut writer, triples)?;
        let file = writer
            .into_inner()
            .map_err(|e| StoreError::Io(format!("{}: {e}", tmp_path.display())))?;
        file.sync_all()
            .map_err(|e| StoreError::Io(format!("{}: {e}", tmp_path.display())))?;
        Ok(())
    })();

    if let Err(error) = write_result {
        let _ = fs::remove_file(&tmp_path);
        return Err(error);
    }

    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StoreError::Io(format!(
            "{} -> {}: {e}",
            tmp_path.display(),
            path.display()
        ))
    })?;

    // The rename is durable only once the directory entry is.
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        let dir = File::open(parent)
            .map_err(|e| StoreError::Io(format!("{}: {e}", parent.display())))?;
        dir.sync_all()
            .map_err(|e| StoreError::Io(format!("{}: {e}", parent.display())))?;
    }
    Ok(())
}

fn tmp_write_path(path: &Path) -> PathBuf {
    let unique = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let mut tmp: OsString = path.as_os_str().to_os_string();
    tmp.push(format!(".tmp.{}.{}", std::process::id(), unique));
    PathBuf::from(tmp)
}

fn validate_graph_bytes(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if bytes.contains(&0) {
        return Err(StoreError::Corrupt(format!(
            "{}: contains NUL byte(s)",
            path.display()
        )));
    }
    if std::str::from_utf8(bytes).is_err() {
        return Err(StoreError::Corrupt(format!(
            "{}: contains non-UTF-8 byte sequence(s)",
            path.display()
        )));
    }
    Ok(())
}
