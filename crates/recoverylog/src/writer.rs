//! Writer for recovery log sorted files.
//!
//! The real sorter that produces these files is out of scope for this core
//! (§1 Non-goals); this writer exists so the rest of the workspace — tests,
//! fixtures, the `cli` demo — can produce well-formed sorted files without
//! depending on an external sort step. Entries must already be handed to it
//! in ascending [`LogFileKey`] order; the writer does not sort.

use byteorder::{BigEndian, WriteBytesExt};
use crc32fast::Hasher as Crc32;
use logfile::{encode_key, encode_value, LogFileError, LogFileKey, LogFileValue};
use std::fs::{rename, OpenOptions};
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use thiserror::Error;

use crate::format::write_footer;

/// Errors raised while writing a recovery log sorted file.
#[derive(Debug, Error)]
pub enum RecoveryLogWriteError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] LogFileError),

    #[error("refusing to write an empty recovery log file")]
    Empty,
}

/// Writes a sequence of `(LogFileKey, LogFileValue)` pairs, already in
/// ascending order, to a single sorted file at `path`.
///
/// Crash-safe: writes to `path` with a `.tmp` suffix, fsyncs, then renames
/// into place.
pub fn write_sorted_file<P: AsRef<Path>>(
    path: P,
    entries: &[(LogFileKey, LogFileValue)],
) -> Result<(), RecoveryLogWriteError> {
    if entries.is_empty() {
        return Err(RecoveryLogWriteError::Empty);
    }

    let path = path.as_ref();
    let tmp_path = path.with_extension("rlog.tmp");
    let raw = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&tmp_path)?;
    let mut file = BufWriter::new(raw);

    let mut index: Vec<(Vec<u8>, u64)> = Vec::with_capacity(entries.len());

    for (key, value) in entries {
        let key_bytes = encode_key(key)?;
        let val_bytes = encode_value(value)?;

        let mut hasher = Crc32::new();
        hasher.update(&key_bytes);
        hasher.update(&val_bytes);
        let crc = hasher.finalize();

        let offset = file.stream_position()?;
        file.write_u32::<BigEndian>(crc)?;
        file.write_u32::<BigEndian>(key_bytes.len() as u32)?;
        file.write_all(&key_bytes)?;
        file.write_u32::<BigEndian>(val_bytes.len() as u32)?;
        file.write_all(&val_bytes)?;

        index.push((key_bytes, offset));
    }

    let index_offset = file.stream_position()?;
    for (key_bytes, offset) in &index {
        file.write_u32::<BigEndian>(key_bytes.len() as u32)?;
        file.write_all(key_bytes)?;
        file.write_u64::<BigEndian>(*offset)?;
    }

    write_footer(&mut file, index_offset, index.len() as u64)?;

    file.flush()?;
    file.into_inner()?.sync_all()?;
    rename(&tmp_path, path)?;

    Ok(())
}
