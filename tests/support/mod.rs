#![allow(dead_code)]

use std::path::Path;

use chrono::{DateTime, Local, TimeZone, Utc};
use tempfile::TempDir;

use questlog::journal::{ApplicationKind, ApplicationRecord, ManualEntry};
use questlog::storage::Store;

/// A store in a tempdir that is cleaned up on drop.
pub struct TestStore {
    dir: TempDir,
    pub store: Store,
}

impl TestStore {
    pub fn init() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        let store = Store::init(dir.path()).expect("failed to init store");
        Self { dir, store }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn log_app(&self, record: &ApplicationRecord) {
        self.store
            .append_application(record)
            .expect("failed to append application");
    }

    pub fn log_manual(&self, stream: &str, at: DateTime<Utc>) {
        self.store
            .append_manual(stream, ManualEntry::at(at))
            .expect("failed to append manual entry");
    }
}

/// A local-calendar timestamp, so day and week keys are predictable in any
/// test timezone.
pub fn local(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Local
        .with_ymd_and_hms(y, m, d, h, 0, 0)
        .single()
        .expect("valid local time")
        .with_timezone(&Utc)
}

pub fn app_at(at: DateTime<Utc>, kind: ApplicationKind, platform: &str) -> ApplicationRecord {
    ApplicationRecord::new(kind, platform, at)
}
