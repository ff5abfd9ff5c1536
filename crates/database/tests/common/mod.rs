#![allow(dead_code)]
use chrono::NaiveDate;
use ra_database::ArchiveConfig;
use ra_types::StatusRecord;
use std::path::Path;

pub fn temp_root() -> tempfile::TempDir {
    tempfile::tempdir().expect("tempdir")
}

pub fn config(root: &Path) -> ArchiveConfig {
    ArchiveConfig::new(root, "mastodon-social/timelines-public")
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

pub fn status(id: i64) -> StatusRecord {
    StatusRecord {
        id,
        created_at: format!("2024-01-01T12:{:02}:00Z", id % 60),
        account: format!("user{}@example.social", id % 7),
        url: (id % 2 == 0).then(|| format!("https://example.social/@u/{id}")),
        content: Some(format!("<p>status {id}</p>")),
        replies_count: (id % 3 == 0).then_some(id / 3),
        reblogs_count: None,
    }
}

pub fn statuses(ids: impl IntoIterator<Item = i64>) -> Vec<StatusRecord> {
    ids.into_iter().map(status).collect()
}
