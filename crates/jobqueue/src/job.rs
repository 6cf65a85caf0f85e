use logfile::KeyExtent;

/// A named pool of worker servers a compaction job is routed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceGroupId(pub String);

impl ResourceGroupId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

/// The tier of the metadata hierarchy a tablet belongs to. `beginFullScan` /
/// `endFullScan` generations are tracked independently per level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum DataLevel {
    Root = 0,
    Metadata = 1,
    User = 2,
}

pub const DATA_LEVEL_COUNT: usize = 3;

/// Table id boundary below which a tablet belongs to the metadata level
/// (root table excepted). Implementation-chosen, matching
/// [`logfile::ROOT_TABLE_ID`]'s numbering.
const FIRST_USER_TABLE_ID: u64 = 2;

/// Maps a table id to the data level it belongs to.
#[must_use]
pub fn level_of(table_id: u64) -> DataLevel {
    if table_id == logfile::ROOT_TABLE_ID {
        DataLevel::Root
    } else if table_id < FIRST_USER_TABLE_ID {
        DataLevel::Metadata
    } else {
        DataLevel::User
    }
}

/// The variety of compaction a job performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionKind {
    /// Background compaction chosen by the system's compaction policy.
    System,
    /// Explicitly requested by a user/administrator action.
    User,
}

/// An immutable description of one compaction unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionJob {
    pub extent: KeyExtent,
    pub resource_group: ResourceGroupId,
    /// Higher values are more urgent.
    pub priority: i64,
    pub files: Vec<String>,
    pub kind: CompactionKind,
}

impl CompactionJob {
    pub fn new(
        extent: KeyExtent,
        resource_group: ResourceGroupId,
        priority: i64,
        files: Vec<String>,
        kind: CompactionKind,
    ) -> Self {
        Self {
            extent,
            resource_group,
            priority,
            files,
            kind,
        }
    }
}

/// Assigns a non-negative cost to a queued job, used to bound a group
/// queue's total weight rather than its entry count.
pub trait Weigher: Send + Sync {
    fn weigh(&self, job: &CompactionJob) -> u64;
}

/// Weighs a job by its file count, floored at 1 so an empty file list still
/// occupies queue capacity.
#[derive(Debug, Default)]
pub struct FileCountWeigher;

impl Weigher for FileCountWeigher {
    fn weigh(&self, job: &CompactionJob) -> u64 {
        job.files.len().max(1) as u64
    }
}
