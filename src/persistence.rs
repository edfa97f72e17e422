//! Snapshot files for the local and brute-force tiers.
//!
//! The local tier writes two files: the vector index (bincode, followed by
//! a CRC32 footer) and the item table (JSON array in position order). The
//! brute-force tier writes a single JSON array of items in insertion order.
//! Every write goes to a temporary file which is synced and then renamed
//! over the target, so a crash leaves either the old or the new snapshot.
//!
//! A missing file means "start empty" and is reported as `Ok(None)`.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::PersistenceError;
use crate::index::FlatL2Index;
use crate::types::Item;

/// File holding the local vector index.
pub const INDEX_FILE: &str = "vector_index.bin";
/// File holding the local item table.
pub const LOCAL_ITEMS_FILE: &str = "vector_items.json";
/// File holding the brute-force item table.
pub const KEYWORD_ITEMS_FILE: &str = "keyword_items.json";

/// Magic bytes preceding the CRC32 footer of the index file.
const SNAPSHOT_CRC_MAGIC: &[u8; 4] = b"TSX1";

/// Contents of the local tier's two snapshot files.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSnapshot {
  pub index: FlatL2Index,
  /// Items in index position order.
  pub items: Vec<Item>,
}

/// Reads and writes snapshot files under one data directory.
///
/// The directory is created on the first write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotDir {
  root: PathBuf,
}

impl SnapshotDir {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// Writes the index file, then the item table.
  ///
  /// Both files are complete on disk when this returns `Ok`.
  pub fn save_local(&self, index: &FlatL2Index, items: &[Item]) -> Result<(), PersistenceError> {
    if index.len() != items.len() {
      return Err(PersistenceError::InconsistentPayload {
        vectors: index.len(),
        items: items.len(),
      });
    }
    let payload = bincode::serialize(index)?;
    let crc = crc32fast::hash(&payload);
    let mut bytes = Vec::with_capacity(payload.len() + 8);
    bytes.extend_from_slice(&payload);
    bytes.extend_from_slice(SNAPSHOT_CRC_MAGIC);
    bytes.extend_from_slice(&crc.to_be_bytes());

    self.write_atomic(INDEX_FILE, &bytes)?;
    self.write_atomic(LOCAL_ITEMS_FILE, &serde_json::to_vec(items)?)?;
    debug!(items = items.len(), crc = %format!("{crc:#010x}"), "saved local snapshot");
    Ok(())
  }

  /// Loads the local snapshot, or `None` when neither file exists.
  pub fn load_local(&self) -> Result<Option<LocalSnapshot>, PersistenceError> {
    let index_bytes = read_optional(&self.root.join(INDEX_FILE))?;
    let item_bytes = read_optional(&self.root.join(LOCAL_ITEMS_FILE))?;
    let (index_bytes, item_bytes) = match (index_bytes, item_bytes) {
      (None, None) => return Ok(None),
      (Some(_), None) => return Err(PersistenceError::IncompleteSnapshot(LOCAL_ITEMS_FILE)),
      (None, Some(_)) => return Err(PersistenceError::IncompleteSnapshot(INDEX_FILE)),
      (Some(index), Some(items)) => (index, items),
    };

    let index: FlatL2Index = bincode::deserialize(verify_checksum(&index_bytes)?)?;
    let items: Vec<Item> = serde_json::from_slice(&item_bytes)?;
    if index.len() != items.len() {
      return Err(PersistenceError::InconsistentPayload {
        vectors: index.len(),
        items: items.len(),
      });
    }
    debug!(items = items.len(), "loaded local snapshot");
    Ok(Some(LocalSnapshot { index, items }))
  }

  /// Writes the brute-force item table.
  pub fn save_keyword(&self, items: &[Item]) -> Result<(), PersistenceError> {
    self.write_atomic(KEYWORD_ITEMS_FILE, &serde_json::to_vec(items)?)?;
    debug!(items = items.len(), "saved keyword snapshot");
    Ok(())
  }

  /// Loads the brute-force item table, or `None` when the file does not exist.
  pub fn load_keyword(&self) -> Result<Option<Vec<Item>>, PersistenceError> {
    match read_optional(&self.root.join(KEYWORD_ITEMS_FILE))? {
      Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
      None => Ok(None),
    }
  }

  fn write_atomic(&self, name: &str, bytes: &[u8]) -> Result<(), PersistenceError> {
    fs::create_dir_all(&self.root)?;
    let path = self.root.join(name);
    let tmp_path = self.root.join(format!("{name}.tmp"));
    {
      let mut file = File::create(&tmp_path)?;
      file.write_all(bytes)?;
      file.sync_all()?;
    }
    fs::rename(&tmp_path, &path)?;
    Ok(())
  }
}

fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, PersistenceError> {
  match fs::read(path) {
    Ok(bytes) => Ok(Some(bytes)),
    Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
    Err(err) => Err(err.into()),
  }
}

/// Splits off and checks the `[magic][crc32 BE]` footer, returning the payload.
fn verify_checksum(raw: &[u8]) -> Result<&[u8], PersistenceError> {
  if raw.len() < 8 || &raw[raw.len() - 8..raw.len() - 4] != SNAPSHOT_CRC_MAGIC {
    return Err(PersistenceError::MissingChecksum);
  }
  let (payload, footer) = raw.split_at(raw.len() - 8);
  let stored = u32::from_be_bytes([footer[4], footer[5], footer[6], footer[7]]);
  let computed = crc32fast::hash(payload);
  if stored != computed {
    return Err(PersistenceError::ChecksumMismatch { stored, computed });
  }
  Ok(payload)
}
