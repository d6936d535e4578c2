//! Filesystem snapshot store.
//!
//! Snapshots live at `{root}/{identity}/{region}/{source}/{instant}.json`, one
//! JSON array per file. A partition is the `(identity, region, source)` triple
//! and owns one directory. Files are published by writing a hidden temp file in
//! the same directory and renaming it over the final name, so a reader either
//! sees a complete snapshot or none at all.

use crate::core::error::VolumapperError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};
use ulid::Ulid;

pub const SNAPSHOT_EXT: &str = "json";

/// Data sources the pollers know how to capture.
///
/// The store never matches on this; it only sees [`DataSourceKind::name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSourceKind {
    Instances,
    Volumes,
}

impl DataSourceKind {
    pub const ALL: [DataSourceKind; 2] = [DataSourceKind::Instances, DataSourceKind::Volumes];

    pub fn name(&self) -> &'static str {
        match self {
            DataSourceKind::Instances => "instances",
            DataSourceKind::Volumes => "volumes",
        }
    }
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Partition {
    pub identity: String,
    pub region: String,
    pub source: String,
}

impl Partition {
    pub fn new(identity: &str, region: &str, source: &str) -> Result<Self, VolumapperError> {
        for (label, value) in [("identity", identity), ("region", region), ("source", source)] {
            validate_segment(label, value)?;
        }
        Ok(Self {
            identity: identity.to_string(),
            region: region.to_string(),
            source: source.to_string(),
        })
    }

    pub fn for_kind(
        identity: &str,
        region: &str,
        kind: DataSourceKind,
    ) -> Result<Self, VolumapperError> {
        Self::new(identity, region, kind.name())
    }

    fn relative_dir(&self) -> PathBuf {
        Path::new(&self.identity).join(&self.region).join(&self.source)
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.identity, self.region, self.source)
    }
}

fn validate_segment(label: &str, value: &str) -> Result<(), VolumapperError> {
    if value.is_empty()
        || value == "."
        || value == ".."
        || value.contains('/')
        || value.contains('\\')
    {
        return Err(VolumapperError::ConfigError(format!(
            "{} '{}' is not usable as a storage path segment",
            label, value
        )));
    }
    Ok(())
}

/// One immutable capture of a remote fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot<T> {
    pub instant: i64,
    pub payload: Vec<T>,
}

impl<T> Snapshot<T> {
    pub fn new(instant: i64, payload: Vec<T>) -> Self {
        Self { instant, payload }
    }
}

/// Parse a snapshot file name into its instant.
///
/// Only the canonical `{instant}.json` form qualifies, so every instant maps
/// back to exactly one file. Temp files, stray extensions, padded or signed
/// numbers and anything non-numeric return `None`.
pub fn parse_instant(file_name: &str) -> Option<i64> {
    let (stem, ext) = file_name.split_once('.')?;
    if ext != SNAPSHOT_EXT {
        return None;
    }
    let instant = stem.parse::<i64>().ok()?;
    (instant.to_string() == stem).then_some(instant)
}

pub struct SnapshotStore {
    root: PathBuf,
    locks: Mutex<HashMap<Partition, Arc<Mutex<()>>>>,
}

impl SnapshotStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn partition_dir(&self, partition: &Partition) -> PathBuf {
        self.root.join(partition.relative_dir())
    }

    pub fn snapshot_path(&self, partition: &Partition, instant: i64) -> PathBuf {
        self.partition_dir(partition)
            .join(format!("{}.{}", instant, SNAPSHOT_EXT))
    }

    /// Create the partition directory chain. Safe to call repeatedly.
    pub fn ensure_partition(&self, partition: &Partition) -> Result<PathBuf, VolumapperError> {
        let dir = self.partition_dir(partition);
        fs::create_dir_all(&dir).map_err(VolumapperError::IoError)?;
        Ok(dir)
    }

    /// Every snapshot instant recorded in the partition, ascending.
    pub fn instants(&self, partition: &Partition) -> Result<Vec<i64>, VolumapperError> {
        let dir = self.partition_dir(partition);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut instants = Vec::new();
        for entry in fs::read_dir(&dir).map_err(VolumapperError::IoError)? {
            let entry = entry.map_err(VolumapperError::IoError)?;
            if !entry.file_type().map_err(VolumapperError::IoError)?.is_file() {
                continue;
            }
            if let Some(instant) = entry.file_name().to_str().and_then(parse_instant) {
                instants.push(instant);
            }
        }
        instants.sort_unstable();
        Ok(instants)
    }

    pub fn latest_instant(&self, partition: &Partition) -> Result<Option<i64>, VolumapperError> {
        Ok(self.instants(partition)?.last().copied())
    }

    pub fn read<T: DeserializeOwned>(
        &self,
        partition: &Partition,
        instant: i64,
    ) -> Result<Snapshot<T>, VolumapperError> {
        let path = self.snapshot_path(partition, instant);
        let file = match File::open(&path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VolumapperError::NotFound(format!(
                    "snapshot {} in {}",
                    instant, partition
                )));
            }
            Err(e) => return Err(VolumapperError::IoError(e)),
        };
        let payload: Vec<T> = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            VolumapperError::StoreCorrupted {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;
        debug!(partition = %partition, instant, records = payload.len(), "loaded snapshot");
        Ok(Snapshot { instant, payload })
    }

    /// Durably publish `snapshot`. Overwrites an existing capture at the same
    /// instant, logging a warning.
    pub fn write<T: Serialize>(
        &self,
        partition: &Partition,
        snapshot: &Snapshot<T>,
    ) -> Result<PathBuf, VolumapperError> {
        let lock = self.partition_lock(partition);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let dir = self.partition_dir(partition);
        fs::create_dir_all(&dir).map_err(|source| VolumapperError::SnapshotWriteError {
            path: dir.clone(),
            source,
        })?;

        let final_path = self.snapshot_path(partition, snapshot.instant);
        let tmp_path = dir.join(format!(".{}.{}.tmp", snapshot.instant, Ulid::new()));

        if let Err(e) = write_payload(&tmp_path, &snapshot.payload) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }

        if final_path.exists() {
            warn!(
                path = %final_path.display(),
                "snapshot already exists at this instant, overwriting"
            );
        }

        fs::rename(&tmp_path, &final_path).map_err(|source| {
            let _ = fs::remove_file(&tmp_path);
            VolumapperError::SnapshotWriteError {
                path: final_path.clone(),
                source,
            }
        })?;

        debug!(path = %final_path.display(), "published snapshot");
        Ok(final_path)
    }

    /// Delete every snapshot in the partition except the latest.
    pub fn prune(&self, partition: &Partition) -> Result<Vec<PathBuf>, VolumapperError> {
        let lock = self.partition_lock(partition);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut instants = self.instants(partition)?;
        instants.pop();

        let mut removed = Vec::with_capacity(instants.len());
        for instant in instants {
            let path = self.snapshot_path(partition, instant);
            fs::remove_file(&path).map_err(VolumapperError::IoError)?;
            removed.push(path);
        }
        Ok(removed)
    }

    /// Discover every partition directory under the root, sorted.
    pub fn partitions(&self) -> Result<Vec<Partition>, VolumapperError> {
        let mut out = Vec::new();
        if !self.root.is_dir() {
            return Ok(out);
        }
        for identity in subdirs(&self.root)? {
            let identity_dir = self.root.join(&identity);
            for region in subdirs(&identity_dir)? {
                for source in subdirs(&identity_dir.join(&region))? {
                    if let Ok(p) = Partition::new(&identity, &region, &source) {
                        out.push(p);
                    }
                }
            }
        }
        out.sort();
        Ok(out)
    }

    pub fn prune_all(&self) -> Result<Vec<PathBuf>, VolumapperError> {
        let mut removed = Vec::new();
        for partition in self.partitions()? {
            removed.extend(self.prune(&partition)?);
        }
        Ok(removed)
    }

    fn partition_lock(&self, partition: &Partition) -> Arc<Mutex<()>> {
        let mut locks = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(partition.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

fn write_payload<T: Serialize>(path: &Path, payload: &[T]) -> Result<(), VolumapperError> {
    let to_write_err = |source| VolumapperError::SnapshotWriteError {
        path: path.to_path_buf(),
        source,
    };
    let file = File::create(path).map_err(to_write_err)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, payload).map_err(|e| {
        if e.is_io() {
            to_write_err(e.into())
        } else {
            VolumapperError::SerdeError(e)
        }
    })?;
    writer.flush().map_err(to_write_err)?;
    let file = writer
        .into_inner()
        .map_err(|e| to_write_err(e.into_error()))?;
    file.sync_all().map_err(to_write_err)?;
    Ok(())
}

fn subdirs(dir: &Path) -> Result<Vec<String>, VolumapperError> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(VolumapperError::IoError)? {
        let entry = entry.map_err(VolumapperError::IoError)?;
        if entry.file_type().map_err(VolumapperError::IoError)?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}
