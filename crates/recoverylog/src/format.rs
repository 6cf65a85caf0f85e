//! On-disk sorted-file format used by [`crate::reader::SortedLogReader`].
//!
//! ```text
//! [DATA]   repeated: crc32(u32 BE) | key_len(u32 BE) | key | val_len(u32 BE) | val
//! [INDEX]  repeated: key_len(u32 BE) | key | data_offset(u64 BE)
//! [FOOTER] index_offset(u64 BE) | entry_count(u64 BE) | magic(u32 BE = "RLG1")
//! ```
//!
//! Keys are encoded [`logfile::LogFileKey`] bytes, already byte-sortable;
//! entries in the DATA and INDEX sections appear in ascending key order
//! because the external sorter (out of scope for this crate) guarantees it.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io;
use std::io::{Read, Result as IoResult, Seek, SeekFrom, Write};

/// Magic number identifying a recovery log sorted file (ASCII "RLG1").
pub const RECOVERY_LOG_MAGIC: u32 = 0x524c_4731;

/// Footer size in bytes: `index_offset(8) + entry_count(8) + magic(4)`.
pub const FOOTER_BYTES: u64 = 8 + 8 + 4;

/// Parsed footer of a recovery log sorted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Footer {
    pub index_offset: u64,
    pub entry_count: u64,
}

/// Writes the footer to `w`.
pub fn write_footer<W: Write>(w: &mut W, index_offset: u64, entry_count: u64) -> IoResult<()> {
    w.write_u64::<BigEndian>(index_offset)?;
    w.write_u64::<BigEndian>(entry_count)?;
    w.write_u32::<BigEndian>(RECOVERY_LOG_MAGIC)?;
    Ok(())
}

/// Reads and validates the footer from `r`, leaving the cursor at EOF.
pub fn read_footer<R: Read + Seek>(r: &mut R) -> IoResult<Footer> {
    let filesize = r.seek(SeekFrom::End(0))?;
    if filesize < FOOTER_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "file too small for recovery log footer",
        ));
    }
    r.seek(SeekFrom::End(-(FOOTER_BYTES as i64)))?;
    let index_offset = r.read_u64::<BigEndian>()?;
    let entry_count = r.read_u64::<BigEndian>()?;
    let magic = r.read_u32::<BigEndian>()?;
    if magic != RECOVERY_LOG_MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("bad recovery log magic: {magic:#x}"),
        ));
    }
    if index_offset >= filesize {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "index_offset out of bounds",
        ));
    }
    Ok(Footer {
        index_offset,
        entry_count,
    })
}
