use crate::error::{Error, Result};
use crate::snapshot::Snapshot;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, rename, File};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

/// Bumped whenever the encoded layout of [`Snapshot`] changes.
pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub fields: Vec<String>,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    pub fn snapshot(&self) -> PathBuf { self.root.join("snapshot.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn snapshot_tmp(&self) -> PathBuf { self.root.join("snapshot.bin.tmp") }
}

impl Snapshot {
    /// Encode as an opaque blob: a format version followed by the bincode body.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut bytes = bincode::serialize(&FORMAT_VERSION)?;
        bincode::serialize_into(&mut bytes, self)?;
        Ok(bytes)
    }

    /// Decode a blob produced by [`Snapshot::to_bytes`] and re-validate it.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(bytes);
        let found: u32 = bincode::deserialize_from(&mut cursor)?;
        if found != FORMAT_VERSION {
            return Err(Error::UnsupportedVersion { found, expected: FORMAT_VERSION });
        }
        let snapshot: Snapshot = bincode::deserialize_from(&mut cursor)?;
        snapshot.validate()?;
        Ok(snapshot)
    }
}

/// Write the snapshot blob. The file is replaced by rename so readers never see a partial blob.
pub fn save_snapshot(paths: &IndexPaths, snapshot: &Snapshot) -> Result<()> {
    create_dir_all(&paths.root)?;
    let bytes = snapshot.to_bytes()?;
    let mut f = File::create(paths.snapshot_tmp())?;
    f.write_all(&bytes)?;
    f.sync_all()?;
    rename(paths.snapshot_tmp(), paths.snapshot())?;
    Ok(())
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<Snapshot> {
    let mut f = File::open(paths.snapshot())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    Snapshot::from_bytes(&buf)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}
