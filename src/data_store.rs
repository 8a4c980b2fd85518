use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("required input file is missing: {}", path.display())]
    MissingFile { path: PathBuf },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} is not a JSON array of records: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Records loaded from a collection file, plus how many elements were dropped.
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub records: Vec<T>,
    pub malformed: usize,
}

impl<T> Default for Loaded<T> {
    fn default() -> Self {
        Loaded {
            records: Vec::new(),
            malformed: 0,
        }
    }
}

/// Loads a JSON array of records. Elements that fail to deserialize are
/// logged and skipped; only a missing or unreadable file is an error.
pub fn load_collection<T: DeserializeOwned>(path: &Path) -> Result<Loaded<T>, LoadError> {
    if !path.exists() {
        return Err(LoadError::MissingFile {
            path: path.to_path_buf(),
        });
    }
    let raw = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let elements: Vec<Value> = serde_json::from_str(&raw).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let mut loaded = Loaded {
        records: Vec::with_capacity(elements.len()),
        malformed: 0,
    };
    for (index, element) in elements.into_iter().enumerate() {
        match serde_json::from_value::<T>(element) {
            Ok(record) => loaded.records.push(record),
            Err(e) => {
                warn!("Skipping malformed record #{} in {:?}: {}", index, path, e);
                loaded.malformed += 1;
            }
        }
    }
    info!(
        "Loaded {} records from {:?} ({} malformed skipped).",
        loaded.records.len(),
        path,
        loaded.malformed
    );
    Ok(loaded)
}

/// Like [`load_collection`], but a missing file yields an empty collection.
pub fn load_optional_collection<T: DeserializeOwned>(path: &Path) -> Result<Loaded<T>, LoadError> {
    match load_collection(path) {
        Err(LoadError::MissingFile { path }) => {
            warn!("{:?} not found, continuing with an empty collection.", path);
            Ok(Loaded::default())
        }
        other => other,
    }
}

/// Serialises `value` as pretty JSON and moves it into place with a rename,
/// so readers never observe a partially written file.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir).with_context(|| format!("Failed to create directory {:?}", dir))?;

    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Output path {:?} has no file name", path))?
        .to_string_lossy()
        .into_owned();
    let tmp_path = dir.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4()));
    debug!("Writing {:?} via temporary file {:?}", path, tmp_path);

    let result = write_to_temp(&tmp_path, value)
        .and_then(|_| {
            fs::rename(&tmp_path, path)
                .with_context(|| format!("Failed to move {:?} into place at {:?}", tmp_path, path))
        });
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

fn write_to_temp<T: Serialize + ?Sized>(tmp_path: &Path, value: &T) -> Result<()> {
    let file = File::create(tmp_path)
        .with_context(|| format!("Failed to create temporary file {:?}", tmp_path))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value).context("Failed to serialise JSON output")?;
    writer.write_all(b"\n")?;
    let file = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush {:?}: {}", tmp_path, e.error()))?;
    file.sync_all()
        .with_context(|| format!("Failed to sync {:?}", tmp_path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Review;

    fn tmp_dir(name: &str) -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push(format!("review_sentiment_store_{}_{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&p);
        fs::create_dir_all(&p).unwrap();
        p
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tmp_dir("missing");
        let err = load_collection::<Review>(&dir.join("nope.json")).unwrap_err();
        assert!(matches!(err, LoadError::MissingFile { .. }));

        let empty = load_optional_collection::<Review>(&dir.join("nope.json")).unwrap();
        assert!(empty.records.is_empty());
    }

    #[test]
    fn malformed_records_are_skipped() {
        let dir = tmp_dir("malformed");
        let path = dir.join("reviews.json");
        fs::write(
            &path,
            r#"[{"id": 1, "text": "fine"}, {"id": 2, "text": 42}, "junk", {"id": 3, "text": "ok", "rating": 4}]"#,
        )
        .unwrap();
        let loaded = load_collection::<Review>(&path).unwrap();
        assert_eq!(loaded.records.len(), 2);
        assert_eq!(loaded.malformed, 2);
        assert_eq!(loaded.records[1].id.as_deref(), Some("3"));
    }

    #[test]
    fn non_array_file_is_a_parse_error() {
        let dir = tmp_dir("object");
        let path = dir.join("reviews.json");
        fs::write(&path, r#"{"reviews": []}"#).unwrap();
        assert!(matches!(
            load_collection::<Review>(&path),
            Err(LoadError::Parse { .. })
        ));
    }

    #[test]
    fn atomic_write_leaves_no_temp_files() {
        let dir = tmp_dir("atomic");
        let path = dir.join("out.json");
        write_json_atomic(&path, &vec![1, 2, 3]).unwrap();
        write_json_atomic(&path, &vec![4]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "[\n  4\n]\n");
        let leftovers: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
