// 📝 Entry Log - One record per admitted member
//
// Append-only: entries are never edited or removed. No dedup and no rate
// limiting, so two admissions in the same second give two records.

use crate::db::{EntryRecord, KeyValueStore, MemberId, RecordStore};
use crate::temporal::iso_timestamp;
use anyhow::Result;
use chrono::{DateTime, Utc};

impl EntryRecord {
    pub fn new(id: i64, usuario_id: MemberId, at: DateTime<Utc>) -> Self {
        EntryRecord {
            id,
            usuario_id,
            fecha: iso_timestamp(at),
        }
    }
}

/// Allocate an id, append an entry for `member_id` stamped `at`, persist the log
pub fn record_entry<S: KeyValueStore>(
    store: &mut RecordStore<S>,
    member_id: &MemberId,
    at: DateTime<Utc>,
) -> Result<EntryRecord> {
    let mut entries = store.load_entries()?;

    let entry = EntryRecord::new(store.next_id()?, member_id.clone(), at);
    entries.push(entry.clone());
    store.save_entries(&entries)?;

    tracing::info!(entry_id = entry.id, member_id = %member_id, "entry recorded");
    Ok(entry)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use chrono::TimeZone;

    fn instant() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 10, 18, 45, 0).unwrap()
    }

    #[test]
    fn test_record_entry_appends() {
        let mut store = RecordStore::new(MemoryStore::new());
        let member = MemberId::from(3);

        let entry = record_entry(&mut store, &member, instant()).unwrap();

        assert_eq!(entry.id, 1);
        assert_eq!(entry.usuario_id, member);
        assert_eq!(entry.fecha, "2025-06-10T18:45:00.000Z");
        assert_eq!(store.load_entries().unwrap(), vec![entry]);
    }

    #[test]
    fn test_same_member_twice_gives_two_records() {
        let mut store = RecordStore::new(MemoryStore::new());
        let member = MemberId::from(3);

        let first = record_entry(&mut store, &member, instant()).unwrap();
        let second = record_entry(&mut store, &member, instant()).unwrap();

        assert!(second.id > first.id);
        assert_eq!(store.entries_for_member(&member).unwrap().len(), 2);
    }

    #[test]
    fn test_ids_shared_with_existing_counter() {
        let mut store = RecordStore::new(MemoryStore::new());
        store.next_id().unwrap();
        store.next_id().unwrap();

        let entry = record_entry(&mut store, &MemberId::from(1), instant()).unwrap();
        assert_eq!(entry.id, 3);
    }
}
