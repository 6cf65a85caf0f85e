//! # logfile — WAL event codec
//!
//! Binary key/value format for a tablet server's write-ahead log, as replayed
//! by the tablet recovery core. A recovery log is a sequence of
//! `(LogFileKey, LogFileValue)` pairs; an external sorter (out of scope here)
//! produces sorted-file directories whose entries are already ordered
//! according to [`LogFileKey`]'s total order. This crate only encodes and
//! decodes the event shapes — it never opens a file.
//!
//! ## Key encoding
//!
//! `[event: u8][tablet_id: u64 sign-flipped BE][seq: u64 BE][payload...]`
//!
//! The fixed 17-byte prefix is byte-lexicographically equivalent to the
//! `(event, tablet_id, seq)` total order required by the recovery protocol,
//! so a plain sorted index over encoded keys reproduces that order without a
//! custom comparator. `payload` carries the `filename` (COMPACTION_START) or
//! `tablet` extent (DEFINE_TABLET) and never participates in ordering.

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::cmp::Ordering;
use std::io::{self, Cursor, Read, Write};
use thiserror::Error;

/// Tablet id reserved as an invalid sentinel. Must never appear in persisted
/// data; used in memory to mean "no such tablet found".
pub const INVALID_TABLET_ID: i64 = -1;

/// Well-known table id of the root table.
pub const ROOT_TABLE_ID: u64 = 0;

/// Well-known table id of the legacy "old root table" (pre-metadata-table
/// root tablet), used only by [`KeyExtent::old_root_extent`].
pub const OLD_ROOT_TABLE_ID: u64 = 1;

/// Errors raised while encoding or decoding the WAL binary format.
#[derive(Debug, Error)]
pub enum LogFileError {
    /// An underlying I/O failure (writing/reading the in-memory buffer).
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// The raw key or value bytes don't conform to the expected shape for
    /// the decoded event kind.
    #[error("corrupt log entry: {0}")]
    CorruptLogEntry(String),
}

/// The kind of event recorded by a [`LogFileKey`].
///
/// Ordinal order is the primary sort component of the total order over
/// `LogFileKey` (see module docs) and MUST NOT be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Event {
    Open = 0,
    DefineTablet = 1,
    CompactionStart = 2,
    CompactionFinish = 3,
    Mutation = 4,
    ManyMutations = 5,
}

impl Event {
    fn from_u8(v: u8) -> Result<Self, LogFileError> {
        Ok(match v {
            0 => Event::Open,
            1 => Event::DefineTablet,
            2 => Event::CompactionStart,
            3 => Event::CompactionFinish,
            4 => Event::Mutation,
            5 => Event::ManyMutations,
            other => {
                return Err(LogFileError::CorruptLogEntry(format!(
                    "unknown event ordinal {other}"
                )))
            }
        })
    }
}

/// A tablet's row-range identifier: `(table_id, end_row, prev_end_row)`.
///
/// `end_row == None` means the range extends to +∞; `prev_end_row == None`
/// means the range starts at −∞.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyExtent {
    pub table_id: u64,
    pub end_row: Option<Vec<u8>>,
    pub prev_end_row: Option<Vec<u8>>,
}

impl KeyExtent {
    pub fn new(table_id: u64, end_row: Option<Vec<u8>>, prev_end_row: Option<Vec<u8>>) -> Self {
        Self {
            table_id,
            end_row,
            prev_end_row,
        }
    }

    /// True if this extent belongs to the well-known root table.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.table_id == ROOT_TABLE_ID
    }

    /// The legacy "old root extent" constant: a tablet whose `DEFINE_TABLET`
    /// events must also be considered a match for the current root extent
    /// during [Phase A](../recovery/fn.find_max_tablet_id.html), for
    /// compatibility with logs written before the root table existed.
    #[must_use]
    pub fn old_root_extent() -> Self {
        Self {
            table_id: OLD_ROOT_TABLE_ID,
            end_row: None,
            prev_end_row: None,
        }
    }

    fn encode<W: Write>(&self, w: &mut W) -> Result<(), LogFileError> {
        w.write_u64::<BigEndian>(self.table_id)?;
        encode_opt_bytes(w, self.end_row.as_deref())?;
        encode_opt_bytes(w, self.prev_end_row.as_deref())?;
        Ok(())
    }

    fn decode<R: Read>(r: &mut R) -> Result<Self, LogFileError> {
        let table_id = r.read_u64::<BigEndian>()?;
        let end_row = decode_opt_bytes(r)?;
        let prev_end_row = decode_opt_bytes(r)?;
        Ok(Self {
            table_id,
            end_row,
            prev_end_row,
        })
    }
}

fn encode_opt_bytes<W: Write>(w: &mut W, v: Option<&[u8]>) -> Result<(), LogFileError> {
    match v {
        None => w.write_u8(0)?,
        Some(b) => {
            w.write_u8(1)?;
            w.write_u32::<BigEndian>(b.len() as u32)?;
            w.write_all(b)?;
        }
    }
    Ok(())
}

fn decode_opt_bytes<R: Read>(r: &mut R) -> Result<Option<Vec<u8>>, LogFileError> {
    let tag = r.read_u8()?;
    match tag {
        0 => Ok(None),
        1 => {
            let len = r.read_u32::<BigEndian>()? as usize;
            let mut buf = vec![0u8; len];
            r.read_exact(&mut buf)?;
            Ok(Some(buf))
        }
        other => Err(LogFileError::CorruptLogEntry(format!(
            "bad option tag {other}"
        ))),
    }
}

/// The sort key of every WAL entry.
///
/// Total order: `event` (ordinal), then `tablet_id`, then `seq`. `filename`
/// and `tablet` never participate in comparison — they're payload carried
/// alongside the key for the event kinds that need them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFileKey {
    pub event: Event,
    pub tablet_id: i64,
    pub seq: u64,
    /// Populated only for `COMPACTION_START`.
    pub filename: Option<String>,
    /// Populated only for `DEFINE_TABLET`.
    pub tablet: Option<KeyExtent>,
}

impl LogFileKey {
    pub fn new(event: Event, tablet_id: i64, seq: u64) -> Self {
        Self {
            event,
            tablet_id,
            seq,
            filename: None,
            tablet: None,
        }
    }

    pub fn compaction_start(tablet_id: i64, seq: u64, filename: impl Into<String>) -> Self {
        Self {
            event: Event::CompactionStart,
            tablet_id,
            seq,
            filename: Some(filename.into()),
            tablet: None,
        }
    }

    pub fn define_tablet(tablet_id: i64, seq: u64, tablet: KeyExtent) -> Self {
        Self {
            event: Event::DefineTablet,
            tablet_id,
            seq,
            filename: None,
            tablet: Some(tablet),
        }
    }

    /// Order-only projection used for range bounds and comparisons: other
    /// call sites should prefer comparing `LogFileKey` directly.
    fn order_tuple(&self) -> (u8, i64, u64) {
        (self.event as u8, self.tablet_id, self.seq)
    }
}

impl PartialOrd for LogFileKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LogFileKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.order_tuple().cmp(&other.order_tuple())
    }
}

/// An inclusive `[start, end]` bound over `LogFileKey`'s total order. Either
/// end may be absent, meaning unbounded in that direction.
#[derive(Debug, Clone)]
pub struct KeyRange {
    pub start: Option<LogFileKey>,
    pub end: Option<LogFileKey>,
}

impl KeyRange {
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            start: None,
            end: None,
        }
    }

    #[must_use]
    pub fn new(start: LogFileKey, end: LogFileKey) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// True if `key` compares within `[start, end]`.
    #[must_use]
    pub fn contains(&self, key: &LogFileKey) -> bool {
        if let Some(ref s) = self.start {
            if key < s {
                return false;
            }
        }
        if let Some(ref e) = self.end {
            if key > e {
                return false;
            }
        }
        true
    }
}

/// Builds the `[start, end]` range for `toRange` per §4.1: any stored entry
/// whose key compares within `[start, end]` is returned by a scan seeked to
/// it.
#[must_use]
pub fn to_range(start: Option<LogFileKey>, end: Option<LogFileKey>) -> KeyRange {
    KeyRange { start, end }
}

/// A single mutation carried by a `MUTATION` or `MANY_MUTATIONS` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub row: Vec<u8>,
    pub column: Vec<u8>,
    pub kind: MutationKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    Put(Vec<u8>),
    Delete,
}

/// The value half of a WAL entry: zero or more mutations. Empty for every
/// event kind except `MUTATION` (exactly one) and `MANY_MUTATIONS` (one or
/// more).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFileValue {
    pub mutations: Vec<Mutation>,
}

/// Encodes `key` to its on-disk byte representation.
pub fn encode_key(key: &LogFileKey) -> Result<Vec<u8>, LogFileError> {
    let mut buf = Vec::with_capacity(32);
    buf.write_u8(key.event as u8)?;
    buf.write_u64::<BigEndian>(encode_tablet_id(key.tablet_id))?;
    buf.write_u64::<BigEndian>(key.seq)?;

    match key.event {
        Event::CompactionStart => {
            let name = key.filename.as_deref().ok_or_else(|| {
                LogFileError::CorruptLogEntry("COMPACTION_START missing filename".into())
            })?;
            let bytes = name.as_bytes();
            buf.write_u32::<BigEndian>(bytes.len() as u32)?;
            buf.write_all(bytes)?;
        }
        Event::DefineTablet => {
            let extent = key.tablet.as_ref().ok_or_else(|| {
                LogFileError::CorruptLogEntry("DEFINE_TABLET missing tablet extent".into())
            })?;
            extent.encode(&mut buf)?;
        }
        _ => {}
    }

    Ok(buf)
}

/// Decodes `bytes` back into a [`LogFileKey`]; the total inverse of
/// [`encode_key`].
pub fn decode_key(bytes: &[u8]) -> Result<LogFileKey, LogFileError> {
    if bytes.len() < 17 {
        return Err(LogFileError::CorruptLogEntry(
            "key shorter than fixed prefix".into(),
        ));
    }
    let mut cur = Cursor::new(bytes);
    let event = Event::from_u8(cur.read_u8()?)?;
    let tablet_id = decode_tablet_id(cur.read_u64::<BigEndian>()?);
    let seq = cur.read_u64::<BigEndian>()?;

    let (filename, tablet) = match event {
        Event::CompactionStart => {
            let len = cur.read_u32::<BigEndian>()? as usize;
            let mut s = vec![0u8; len];
            cur.read_exact(&mut s)?;
            let name = String::from_utf8(s)
                .map_err(|e| LogFileError::CorruptLogEntry(format!("bad filename utf8: {e}")))?;
            (Some(name), None)
        }
        Event::DefineTablet => (None, Some(KeyExtent::decode(&mut cur)?)),
        _ => (None, None),
    };

    Ok(LogFileKey {
        event,
        tablet_id,
        seq,
        filename,
        tablet,
    })
}

/// Encodes `value` to its on-disk byte representation.
pub fn encode_value(value: &LogFileValue) -> Result<Vec<u8>, LogFileError> {
    let mut buf = Vec::with_capacity(16 * value.mutations.len() + 4);
    buf.write_u32::<BigEndian>(value.mutations.len() as u32)?;
    for m in &value.mutations {
        match &m.kind {
            MutationKind::Put(v) => {
                buf.write_u8(0)?;
                buf.write_u32::<BigEndian>(m.row.len() as u32)?;
                buf.write_all(&m.row)?;
                buf.write_u32::<BigEndian>(m.column.len() as u32)?;
                buf.write_all(&m.column)?;
                buf.write_u32::<BigEndian>(v.len() as u32)?;
                buf.write_all(v)?;
            }
            MutationKind::Delete => {
                buf.write_u8(1)?;
                buf.write_u32::<BigEndian>(m.row.len() as u32)?;
                buf.write_all(&m.row)?;
                buf.write_u32::<BigEndian>(m.column.len() as u32)?;
                buf.write_all(&m.column)?;
            }
        }
    }
    Ok(buf)
}

/// Decodes `bytes` back into a [`LogFileValue`]; the total inverse of
/// [`encode_value`].
pub fn decode_value(bytes: &[u8]) -> Result<LogFileValue, LogFileError> {
    let mut cur = Cursor::new(bytes);
    let count = cur.read_u32::<BigEndian>()? as usize;
    let mut mutations = Vec::with_capacity(count);
    for _ in 0..count {
        let tag = cur.read_u8()?;
        let row_len = cur.read_u32::<BigEndian>()? as usize;
        let mut row = vec![0u8; row_len];
        cur.read_exact(&mut row)?;
        let col_len = cur.read_u32::<BigEndian>()? as usize;
        let mut column = vec![0u8; col_len];
        cur.read_exact(&mut column)?;
        let kind = match tag {
            0 => {
                let val_len = cur.read_u32::<BigEndian>()? as usize;
                let mut v = vec![0u8; val_len];
                cur.read_exact(&mut v)?;
                MutationKind::Put(v)
            }
            1 => MutationKind::Delete,
            other => {
                return Err(LogFileError::CorruptLogEntry(format!(
                    "unknown mutation tag {other}"
                )))
            }
        };
        mutations.push(Mutation { row, column, kind });
    }
    Ok(LogFileValue { mutations })
}

/// Maps `i64` ordering onto `u64` ordering via a sign-bit flip, so that
/// big-endian byte comparison of the encoded `u64` matches numeric `i64`
/// comparison.
const SIGN_BIT: u64 = 0x8000_0000_0000_0000;

fn encode_tablet_id(v: i64) -> u64 {
    (v as u64) ^ SIGN_BIT
}

fn decode_tablet_id(v: u64) -> i64 {
    (v ^ SIGN_BIT) as i64
}
