use std::collections::HashMap;

use models::{BalanceSnapshot, SettlementRecord};

use crate::{ReconciliationBackend, SnapshotKey, StoreError};

/// In-memory backend. Useful for batch runs that only need the dedup logic
/// and as the reference implementation of the backend contract.
#[derive(Default)]
pub struct MemoryStore {
    snapshots: Vec<BalanceSnapshot>,
    return_files: HashMap<String, Vec<SettlementRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn return_file_records(&self, fingerprint: &str) -> Option<&[SettlementRecord]> {
        self.return_files.get(fingerprint).map(|v| v.as_slice())
    }
}

impl ReconciliationBackend for MemoryStore {
    fn find_snapshot(&self, key: &SnapshotKey) -> Result<BalanceSnapshot, StoreError> {
        self.snapshots
            .iter()
            .find(|s| key.matches(s))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn insert_snapshot(&mut self, snapshot: BalanceSnapshot) -> Result<(), StoreError> {
        let key = SnapshotKey::of(&snapshot);
        if self.snapshots.iter().any(|s| key.matches(s)) {
            return Err(StoreError::UniqueViolation);
        }
        self.snapshots.push(snapshot);
        Ok(())
    }

    fn delete_snapshot(&mut self, key: &SnapshotKey) -> Result<(), StoreError> {
        let before = self.snapshots.len();
        self.snapshots.retain(|s| !key.matches(s));
        if self.snapshots.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn snapshots(&self) -> Result<Vec<BalanceSnapshot>, StoreError> {
        Ok(self.snapshots.clone())
    }

    fn has_return_file(&self, fingerprint: &str) -> Result<bool, StoreError> {
        Ok(self.return_files.contains_key(fingerprint))
    }

    fn insert_return_file(
        &mut self,
        fingerprint: &str,
        records: &[SettlementRecord],
    ) -> Result<(), StoreError> {
        if self.return_files.contains_key(fingerprint) {
            return Err(StoreError::UniqueViolation);
        }
        self.return_files
            .insert(fingerprint.to_string(), records.to_vec());
        Ok(())
    }
}
