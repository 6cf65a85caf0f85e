//! Opens one sorted recovery log file and exposes a lazy, range-seekable
//! sequence of `(LogFileKey, LogFileValue)` entries.
//!
//! The entire index (key bytes → data offset) is loaded into memory on
//! [`open`](SortedLogReader::open), the same tradeoff the teacher's SSTable
//! reader makes: a recovery log's index is small relative to its data
//! section, and keeping it resident avoids a seek per key during merge.

use byteorder::{BigEndian, ReadBytesExt};
use crc32fast::Hasher as Crc32;
use logfile::{decode_key, decode_value, encode_key, KeyRange, LogFileKey, LogFileValue};
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capabilities::{Capabilities, Crypto};
use crate::errors::RecoveryLogError;
use crate::format::read_footer;

/// Maximum key/value size we'll allocate while reading (16 MiB). Guards
/// against OOM on a corrupt length field.
const MAX_ENTRY_BYTES: usize = 16 * 1024 * 1024;

/// Lazy reader over one sorted recovery log file.
pub struct SortedLogReader {
    path: PathBuf,
    /// Encoded key bytes, ascending — lexicographic order on these bytes is
    /// equivalent to `LogFileKey`'s total order (see `logfile` crate docs).
    keys: Vec<Vec<u8>>,
    offsets: Vec<u64>,
    file: Option<BufReader<File>>,
    pos: usize,
    range_end: Option<Vec<u8>>,
    crypto: Arc<dyn Crypto>,
}

impl SortedLogReader {
    /// Opens `path` and loads its index into memory.
    ///
    /// `caps` supplies the crypto/cache collaborators (§6); any of them may
    /// be absent. Failure to open raises [`RecoveryLogError::Io`].
    pub fn open<P: AsRef<Path>>(path: P, caps: &Capabilities) -> Result<Self, RecoveryLogError> {
        let path_buf = path.as_ref().to_path_buf();
        let mut f = File::open(&path_buf)?;
        let footer = read_footer(&mut f)?;

        f.seek(SeekFrom::Start(footer.index_offset))?;
        let mut keys = Vec::with_capacity(footer.entry_count as usize);
        let mut offsets = Vec::with_capacity(footer.entry_count as usize);
        for _ in 0..footer.entry_count {
            let key_len = f.read_u32::<BigEndian>()? as usize;
            if key_len > MAX_ENTRY_BYTES {
                return Err(RecoveryLogError::Corrupt(logfile::LogFileError::CorruptLogEntry(
                    format!("index key_len {key_len} exceeds maximum"),
                )));
            }
            let mut key = vec![0u8; key_len];
            f.read_exact(&mut key)?;
            let offset = f.read_u64::<BigEndian>()?;
            keys.push(key);
            offsets.push(offset);
        }

        f.seek(SeekFrom::Start(0))?;

        Ok(Self {
            path: path_buf,
            keys,
            offsets,
            file: Some(BufReader::new(f)),
            pos: 0,
            range_end: None,
            crypto: caps.crypto.clone(),
        })
    }

    /// Positions the reader so that the next [`next`](Self::next) call
    /// returns the first entry whose key is `>= range.start`. A no-op if
    /// `range` is `None`. Remembers `range.end` so subsequent `next` calls
    /// stop yielding once the bound is exceeded.
    pub fn seek(&mut self, range: Option<&KeyRange>) -> Result<(), RecoveryLogError> {
        match range {
            None => {
                self.pos = 0;
                self.range_end = None;
            }
            Some(r) => {
                self.pos = match &r.start {
                    Some(start) => {
                        let start_bytes = encode_key(start)?;
                        self.keys.partition_point(|k| *k < start_bytes)
                    }
                    None => 0,
                };
                self.range_end = match &r.end {
                    Some(end) => Some(encode_key(end)?),
                    None => None,
                };
            }
        }
        Ok(())
    }

    /// Advances and returns the next entry, or `None` at end of stream or
    /// once the seeked range's end bound is exceeded.
    pub fn next(&mut self) -> Result<Option<(LogFileKey, LogFileValue)>, RecoveryLogError> {
        if self.pos >= self.keys.len() {
            return Ok(None);
        }
        let key_bytes = &self.keys[self.pos];
        if let Some(end) = &self.range_end {
            if key_bytes > end {
                return Ok(None);
            }
        }

        let Some(file) = self.file.as_mut() else {
            return Ok(None);
        };
        let offset = self.offsets[self.pos];
        file.seek(SeekFrom::Start(offset))?;

        let crc = file.read_u32::<BigEndian>()?;
        let key_len = file.read_u32::<BigEndian>()? as usize;
        if key_len > MAX_ENTRY_BYTES {
            return Err(RecoveryLogError::Corrupt(logfile::LogFileError::CorruptLogEntry(
                format!("data key_len {key_len} exceeds maximum"),
            )));
        }
        let mut key_buf = vec![0u8; key_len];
        file.read_exact(&mut key_buf)?;
        let val_len = file.read_u32::<BigEndian>()? as usize;
        if val_len > MAX_ENTRY_BYTES {
            return Err(RecoveryLogError::Corrupt(logfile::LogFileError::CorruptLogEntry(
                format!("data val_len {val_len} exceeds maximum"),
            )));
        }
        let mut val_buf = vec![0u8; val_len];
        file.read_exact(&mut val_buf)?;

        self.crypto.decrypt(&mut key_buf);
        self.crypto.decrypt(&mut val_buf);

        let mut hasher = Crc32::new();
        hasher.update(&key_buf);
        hasher.update(&val_buf);
        if hasher.finalize() != crc {
            return Err(RecoveryLogError::Corrupt(logfile::LogFileError::CorruptLogEntry(
                format!("crc mismatch at offset {offset} in {}", self.path.display()),
            )));
        }

        let key = decode_key(&key_buf)?;
        let value = decode_value(&val_buf)?;

        self.pos += 1;
        Ok(Some((key, value)))
    }

    /// Releases the underlying file handle. Idempotent.
    pub fn close(&mut self) {
        self.file = None;
    }

    /// Path this reader was opened from, for diagnostics.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for SortedLogReader {
    fn drop(&mut self) {
        self.close();
    }
}
