use logfile::{Event, LogFileKey, LogFileValue, Mutation, MutationKind};

/// Builds a single-mutation `MUTATION` entry for tablet `tablet_id` at `seq`.
pub fn mutation_entry(tablet_id: i64, seq: u64, row: &str) -> (LogFileKey, LogFileValue) {
    let key = LogFileKey::new(Event::Mutation, tablet_id, seq);
    let value = LogFileValue {
        mutations: vec![Mutation {
            row: row.as_bytes().to_vec(),
            column: b"cf:cq".to_vec(),
            kind: MutationKind::Put(b"v".to_vec()),
        }],
    };
    (key, value)
}

/// Builds an `OPEN` entry, always `seq == 0`.
pub fn open_entry(tablet_id: i64) -> (LogFileKey, LogFileValue) {
    (LogFileKey::new(Event::Open, tablet_id, 0), LogFileValue::default())
}
