mod common;

use common::{config, day, status, statuses, temp_root};
use ra_database::lock::StoreLock;
use ra_database::paths::{lock_path, partition_file};
use ra_database::{ArchiveError, ArchiveReader, ArchiveWriter, WriterState};
use ra_types::{ArchiveRecord, FieldDef, FieldType, RecordSchema, Row, RowError, StatusRecord, Value};
use std::time::Duration;

type StatusWriter = ArchiveWriter<StatusRecord>;

fn read_all(cfg: &ra_database::ArchiveConfig) -> Vec<StatusRecord> {
    let reader = ArchiveReader::open(&cfg.base_dir, &cfg.store_name, None).expect("reader");
    let mut recs: Vec<StatusRecord> = reader.records().expect("records");
    recs.sort_by_key(|r| r.id);
    recs
}

#[test]
fn test_overlapping_batches_are_stored_once() {
    let tmp = temp_root();
    let cfg = config(tmp.path());
    let mut w = StatusWriter::open_for_date(cfg.clone(), day(2024, 3, 1)).expect("open");

    assert_eq!(w.insert(&statuses(1..=5)).expect("b1"), 5);
    // 4 and 5 were already accepted
    assert_eq!(w.insert(&statuses(4..=8)).expect("b2"), 3);
    assert_eq!(w.pending_rows().unwrap(), 8);

    let stats = w.close().expect("close");
    assert_eq!(stats.accepted, 8);
    assert_eq!(stats.rejected, 2);
    assert_eq!(stats.total_rows, 8);
    assert_eq!(stats.distinct_rows, 8);

    let ids: Vec<i64> = read_all(&cfg).iter().map(|r| r.id).collect();
    assert_eq!(ids, (1..=8).collect::<Vec<_>>());
}

#[test]
fn test_duplicates_inside_one_batch_keep_first() {
    let tmp = temp_root();
    let cfg = config(tmp.path());
    let mut w = StatusWriter::open_for_date(cfg.clone(), day(2024, 3, 1)).expect("open");

    let mut second = status(2);
    second.content = Some("edited".into());
    let batch = vec![status(1), status(2), second, status(1)];
    assert_eq!(w.insert(&batch).unwrap(), 2);
    w.close().expect("close");

    let stored = read_all(&cfg);
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1], status(2));
}

#[test]
fn test_round_trip_preserves_values_and_nulls() {
    let tmp = temp_root();
    let cfg = config(tmp.path());
    let input = statuses(100..150);

    let mut w = StatusWriter::open_for_date(cfg.clone(), day(2024, 3, 2)).expect("open");
    assert_eq!(w.insert(&input).unwrap(), 50);
    let stats = w.close().expect("close");
    assert_eq!(stats.total_rows, 50);
    assert!(stats.partition_file.ends_with("date=20240302/file-0.parquet"));

    assert_eq!(read_all(&cfg), input);
}

#[test]
fn test_reopen_seeds_from_store_and_rejects_replay() {
    let tmp = temp_root();
    let cfg = config(tmp.path());
    let batch = statuses(1..=20);

    let mut w = StatusWriter::open_for_date(cfg.clone(), day(2024, 3, 3)).expect("open");
    w.insert(&batch).unwrap();
    w.close().expect("close");

    let mut again = StatusWriter::open_for_date(cfg.clone(), day(2024, 3, 3)).expect("reopen");
    assert_eq!(again.recent_ids().len(), 20);
    assert_eq!(again.insert(&batch).unwrap(), 0);
    assert_eq!(again.insert(&statuses(20..=22)).unwrap(), 2);
    let stats = again.close().expect("close");
    assert_eq!(stats.total_rows, 22);
    assert_eq!(read_all(&cfg).len(), 22);
}

#[test]
fn test_seed_spans_yesterdays_partition() {
    let tmp = temp_root();
    let cfg = config(tmp.path());

    let mut yesterday = StatusWriter::open_for_date(cfg.clone(), day(2024, 3, 9)).expect("open");
    yesterday.insert(&statuses(1..=10)).unwrap();
    yesterday.close().expect("close");

    // Today's file does not exist yet; yesterday's ids must still be known.
    let mut today = StatusWriter::open_for_date(cfg.clone(), day(2024, 3, 10)).expect("open");
    assert!(!today.partition_file().exists());
    assert_eq!(today.insert(&statuses(8..=12)).unwrap(), 2);
    let stats = today.close().expect("close");
    assert_eq!(stats.total_rows, 12);
    assert_eq!(stats.distinct_rows, 12);
}

#[test]
fn test_seed_window_bounds_what_is_remembered() {
    let tmp = temp_root();
    let cfg = config(tmp.path()).with_id_window(3);

    let mut w = StatusWriter::open_for_date(cfg.clone(), day(2024, 3, 4)).expect("open");
    w.insert(&statuses(1..=10)).unwrap();
    w.close().expect("close");

    let mut w = StatusWriter::open_for_date(cfg.clone(), day(2024, 3, 4)).expect("open");
    let mut seeded: Vec<i64> = vec![w.recent_ids().oldest().unwrap(), w.recent_ids().newest().unwrap()];
    seeded.sort();
    assert_eq!(seeded, vec![8, 10]);
    assert_eq!(w.insert(&[status(10)]).unwrap(), 0);
    // Older than the window: not caught.
    assert_eq!(w.insert(&[status(1)]).unwrap(), 1);
    drop(w);
}

#[test]
fn test_closed_writer_refuses_work() {
    let tmp = temp_root();
    let cfg = config(tmp.path());
    let mut w = StatusWriter::open_for_date(cfg, day(2024, 3, 5)).expect("open");
    w.insert(&statuses(1..=2)).unwrap();
    w.close().expect("close");

    assert_eq!(w.state(), WriterState::Closed);
    assert!(matches!(w.insert(&statuses(3..=4)), Err(ArchiveError::WriterClosed)));
    assert!(matches!(w.close(), Err(ArchiveError::WriterClosed)));
    assert!(matches!(w.pending_rows(), Err(ArchiveError::WriterClosed)));
}

#[test]
fn test_empty_close_writes_nothing() {
    let tmp = temp_root();
    let cfg = config(tmp.path());
    let mut w = StatusWriter::open_for_date(cfg.clone(), day(2024, 3, 6)).expect("open");
    let file = w.partition_file().to_path_buf();
    let stats = w.close().expect("close");
    assert_eq!(stats.accepted, 0);
    assert_eq!(stats.total_rows, 0);
    assert!(!file.exists());
    assert!(!cfg.store_dir().exists());
}

#[test]
fn test_dropped_writer_discards_staged_rows() {
    let tmp = temp_root();
    let cfg = config(tmp.path());
    {
        let mut w = StatusWriter::open_for_date(cfg.clone(), day(2024, 3, 7)).expect("open");
        w.insert(&statuses(1..=3)).unwrap();
    }
    assert!(read_all(&cfg).is_empty());
}

#[test]
fn test_locked_store_fails_close_without_touching_disk() {
    let tmp = temp_root();
    let cfg = config(tmp.path()).with_lock_wait(Duration::from_millis(100));
    let date = day(2024, 3, 8);

    let mut first = StatusWriter::open_for_date(cfg.clone(), date).expect("open");
    first.insert(&statuses(1..=3)).unwrap();
    first.close().expect("close");
    let target = partition_file(&cfg.store_dir(), date);
    let before = std::fs::read(&target).unwrap();

    let held = StoreLock::try_acquire(&lock_path(&cfg.store_dir())).expect("lock");
    let mut second = StatusWriter::open_for_date(cfg.clone(), date).expect("open");
    second.insert(&statuses(4..=6)).unwrap();
    assert!(matches!(second.close(), Err(ArchiveError::StoreLocked { .. })));
    drop(held);

    assert_eq!(std::fs::read(&target).unwrap(), before);
    assert_eq!(read_all(&cfg).len(), 3);
}

#[test]
fn test_leftover_lock_file_does_not_block_close() {
    let tmp = temp_root();
    let cfg = config(tmp.path()).with_lock_wait(Duration::from_millis(100));
    let date = day(2024, 3, 9);
    let lock = lock_path(&cfg.store_dir());
    std::fs::create_dir_all(&cfg.store_dir()).unwrap();
    // Left behind by a writer that died mid-close.
    std::fs::write(&lock, "999999\n").unwrap();

    for ids in [1..=3, 4..=6, 7..=9] {
        let mut w = StatusWriter::open_for_date(cfg.clone(), date).expect("open");
        w.insert(&statuses(ids)).unwrap();
        w.close().expect("close");
    }
    assert_eq!(read_all(&cfg).len(), 9);
}

#[test]
fn test_capped_index_forgets_smallest_ids() {
    let tmp = temp_root();
    let cfg = config(tmp.path())
        .with_id_window(2)
        .with_max_tracked_ids(Some(3));
    let mut w = StatusWriter::open_for_date(cfg.clone(), day(2024, 3, 10)).expect("open");

    assert_eq!(w.insert(&statuses(1..=5)).unwrap(), 5);
    assert_eq!(w.recent_ids().len(), 3);
    assert!(!w.recent_ids().contains(1));
    // still tracked
    assert_eq!(w.insert(&statuses(3..=5)).unwrap(), 0);
    // evicted, so accepted a second time
    assert_eq!(w.insert(&[status(1)]).unwrap(), 1);

    let stats = w.close().expect("close");
    assert_eq!(stats.accepted, 6);
    assert_eq!(stats.rejected, 3);
    assert_eq!(stats.total_rows, 6);
    assert_eq!(stats.distinct_rows, 5);
}

// A second record shape sharing the store, to provoke a schema clash.
#[derive(Debug, Clone, PartialEq)]
struct Ping {
    id: i64,
}

const PING_FIELDS: &[FieldDef] = &[FieldDef::new("id", FieldType::Int64)];

impl ArchiveRecord for Ping {
    const SCHEMA: RecordSchema = RecordSchema::new(PING_FIELDS, "id");

    fn id(&self) -> i64 {
        self.id
    }

    fn to_row(&self) -> Row {
        vec![Value::Int64(self.id)]
    }

    fn from_row(row: &[Value]) -> Result<Self, RowError> {
        ra_types::value::check_row(&Self::SCHEMA, row)?;
        Ok(Ping {
            id: row[0].as_i64().unwrap_or_default(),
        })
    }
}

#[test]
fn test_schema_clash_fails_close_and_keeps_old_file() {
    let tmp = temp_root();
    let cfg = config(tmp.path());
    let date = day(2024, 3, 11);

    let mut pings = ArchiveWriter::<Ping>::open_for_date(cfg.clone(), date).expect("open");
    pings.insert(&[Ping { id: 1 }, Ping { id: 2 }]).unwrap();
    pings.close().expect("close");
    let target = partition_file(&cfg.store_dir(), date);
    let before = std::fs::read(&target).unwrap();

    let mut w = StatusWriter::open_for_date(cfg.clone(), date).expect("open");
    w.insert(&statuses(3..=4)).unwrap();
    let err = w.close().unwrap_err();
    assert!(matches!(err, ArchiveError::SchemaMismatch { .. }), "{err}");

    assert_eq!(std::fs::read(&target).unwrap(), before);
    let leftovers: Vec<_> = std::fs::read_dir(target.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_name().to_string_lossy().starts_with('.'))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    StoreLock::try_acquire(&lock_path(&cfg.store_dir())).expect("lock released");
}
