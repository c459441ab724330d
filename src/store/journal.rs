//! Append-only journal for store durability
//!
//! Every accepted write is appended before the in-memory state changes.
//! On open, the journal is replayed to rebuild the collections.
//!
//! Format per entry:
//! - length: u32 (4 bytes)
//! - data: [u8; length] (bincode `JournalEntry`)
//! - crc: u32 (4 bytes, CRC32 of length + data)

use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use super::error::{StoreError, StoreResult};
use super::types::{DocumentPath, Fields};

/// Largest entry accepted on replay
const MAX_ENTRY_LEN: usize = 1_000_000;

/// Sync strategy for journal writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalSyncMode {
    /// Fsync after every write
    EveryWrite,
    /// Fsync once enough bytes accumulate
    #[default]
    Batched,
    /// Flush to the OS only
    None,
}

/// One recorded write, with server timestamps already resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JournalEntry {
    Created { path: DocumentPath, fields: Fields },
    Updated { path: DocumentPath, fields: Fields },
}

impl JournalEntry {
    pub fn path(&self) -> &DocumentPath {
        match self {
            JournalEntry::Created { path, .. } | JournalEntry::Updated { path, .. } => path,
        }
    }
}

/// Journal file writer
pub struct Journal {
    writer: BufWriter<File>,
    path: PathBuf,
    entry_count: u64,
    bytes_since_sync: usize,
    sync_mode: JournalSyncMode,
    sync_threshold: usize,
}

impl Journal {
    /// Open or create a journal file
    pub fn open(path: impl AsRef<Path>, sync_mode: JournalSyncMode) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let (entries, intact_len) = Self::recover_from(&path)?;
        let file_len = file.metadata()?.len();
        if file_len > intact_len {
            tracing::warn!(
                path = %path.display(),
                dropped_bytes = file_len - intact_len,
                "Truncating damaged journal tail"
            );
            file.set_len(intact_len)?;
            file.sync_all()?;
        }
        let entry_count = entries.len() as u64;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            entry_count,
            bytes_since_sync: 0,
            sync_mode,
            sync_threshold: 64 * 1024,
        })
    }

    /// Append one entry
    pub fn append(&mut self, entry: &JournalEntry) -> StoreResult<()> {
        let data = bincode::serialize(entry)?;
        let len = (data.len() as u32).to_le_bytes();

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&len);
        hasher.update(&data);
        let crc = hasher.finalize();

        self.writer.write_all(&len)?;
        self.writer.write_all(&data)?;
        self.writer.write_all(&crc.to_le_bytes())?;

        self.entry_count += 1;
        self.bytes_since_sync += 8 + data.len();

        self.maybe_sync()
    }

    fn maybe_sync(&mut self) -> StoreResult<()> {
        match self.sync_mode {
            JournalSyncMode::EveryWrite => self.sync()?,
            JournalSyncMode::Batched => {
                self.writer.flush()?;
                if self.bytes_since_sync >= self.sync_threshold {
                    self.sync()?;
                }
            }
            JournalSyncMode::None => self.writer.flush()?,
        }
        Ok(())
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> StoreResult<()> {
        self.writer.flush()?;
        self.writer.get_ref().sync_all()?;
        self.bytes_since_sync = 0;
        Ok(())
    }

    /// Read every intact entry, in write order
    pub fn recover(&self) -> StoreResult<Vec<JournalEntry>> {
        Ok(Self::recover_from(&self.path)?.0)
    }

    /// Intact entries plus the byte length they occupy
    fn recover_from(path: &Path) -> StoreResult<(Vec<JournalEntry>, u64)> {
        if !path.exists() {
            return Ok((Vec::new(), 0));
        }

        let mut reader = BufReader::new(File::open(path)?);
        let mut entries = Vec::new();
        let mut intact_len = 0u64;

        loop {
            match Self::read_entry_from(&mut reader) {
                Ok(Some((entry, size))) => {
                    entries.push(entry);
                    intact_len += size;
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        entry = entries.len(),
                        error = %e,
                        "Journal replay stopped at damaged entry"
                    );
                    break;
                }
            }
        }

        Ok((entries, intact_len))
    }

    /// Read one entry and its encoded size; `None` at a clean or torn end
    fn read_entry_from<R: Read>(reader: &mut R) -> StoreResult<Option<(JournalEntry, u64)>> {
        let mut len_buf = [0u8; 4];
        match reader.read_exact(&mut len_buf) {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }
        let len = u32::from_le_bytes(len_buf) as usize;

        if len > MAX_ENTRY_LEN {
            return Err(StoreError::Journal(format!("Entry length too large: {}", len)));
        }

        let mut data = vec![0u8; len];
        reader.read_exact(&mut data)?;

        let mut crc_buf = [0u8; 4];
        reader.read_exact(&mut crc_buf)?;
        let stored_crc = u32::from_le_bytes(crc_buf);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&len_buf);
        hasher.update(&data);
        let computed_crc = hasher.finalize();

        if stored_crc != computed_crc {
            return Err(StoreError::Corruption(format!(
                "CRC mismatch: stored={}, computed={}",
                stored_crc, computed_crc
            )));
        }

        Ok(Some((bincode::deserialize(&data)?, 8 + len as u64)))
    }

    pub fn entry_count(&self) -> u64 {
        self.entry_count
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::types::{DocumentId, FieldValue, Timestamp};
    use std::io::{Seek, SeekFrom};
    use tempfile::tempdir;

    fn created(id: &str, comment: &str, ts: i64) -> JournalEntry {
        let mut fields = Fields::new();
        fields.insert("comment".to_string(), FieldValue::from(comment));
        fields.insert("timestamp".to_string(), Timestamp::from_micros(ts).into());
        JournalEntry::Created {
            path: DocumentPath::new("chats", DocumentId::parse(id).unwrap()).unwrap(),
            fields,
        }
    }

    #[test]
    fn test_append_and_recover() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chats.journal");

        {
            let mut journal = Journal::open(&path, JournalSyncMode::EveryWrite).unwrap();
            journal.append(&created("a", "hello", 1)).unwrap();
            journal.append(&created("b", "world", 2)).unwrap();
            assert_eq!(journal.entry_count(), 2);
        }

        let journal = Journal::open(&path, JournalSyncMode::EveryWrite).unwrap();
        let entries = journal.recover().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], created("a", "hello", 1));
        assert_eq!(entries[1].path().id.as_str(), "b");
    }

    #[test]
    fn test_entry_count_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chats.journal");

        for round in 0..3 {
            let mut journal = Journal::open(&path, JournalSyncMode::Batched).unwrap();
            assert_eq!(journal.entry_count(), round * 2);
            journal.append(&created("a", "x", 1)).unwrap();
            journal.append(&created("b", "y", 2)).unwrap();
        }

        let journal = Journal::open(&path, JournalSyncMode::Batched).unwrap();
        assert_eq!(journal.entry_count(), 6);
    }

    #[test]
    fn test_replay_stops_at_corruption() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chats.journal");

        {
            let mut journal = Journal::open(&path, JournalSyncMode::EveryWrite).unwrap();
            journal.append(&created("a", "hello", 1)).unwrap();
        }

        {
            let mut file = OpenOptions::new().write(true).open(&path).unwrap();
            file.seek(SeekFrom::Start(10)).unwrap();
            file.write_all(&[0xFF, 0xFF]).unwrap();
        }

        let journal = Journal::open(&path, JournalSyncMode::EveryWrite).unwrap();
        assert!(journal.recover().unwrap().is_empty());
    }

    #[test]
    fn test_damaged_tail_truncated_on_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("chats.journal");

        {
            let mut journal = Journal::open(&path, JournalSyncMode::EveryWrite).unwrap();
            journal.append(&created("a", "hello", 1)).unwrap();
        }
        let intact_len = std::fs::metadata(&path).unwrap().len();

        {
            let mut file = OpenOptions::new().append(true).open(&path).unwrap();
            file.write_all(&[0xAB, 0xCD]).unwrap();
        }

        {
            let mut journal = Journal::open(&path, JournalSyncMode::EveryWrite).unwrap();
            assert_eq!(std::fs::metadata(&path).unwrap().len(), intact_len);
            assert_eq!(journal.entry_count(), 1);
            journal.append(&created("b", "after restart", 2)).unwrap();
        }

        let journal = Journal::open(&path, JournalSyncMode::EveryWrite).unwrap();
        let entries = journal.recover().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1], created("b", "after restart", 2));
    }
}
