use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use models::{BalanceSnapshot, SettlementRecord};
use serde_json::{json, Value};

use crate::{ReconciliationBackend, SnapshotKey, StoreError};

/// File-backed backend: a single pretty-printed JSON document with
/// `balance_snapshots` and `return_files` arrays. Initialized with empty
/// arrays when missing or unreadable.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let store = Self { path };
        store.ensure_exists()?;
        Ok(store)
    }

    fn ensure_exists(&self) -> Result<(), StoreError> {
        let valid = match File::open(&self.path) {
            Ok(mut file) => {
                let mut contents = String::new();
                file.read_to_string(&mut contents)
                    .map_err(|e| StoreError::Io(e.to_string()))?;
                serde_json::from_str::<Value>(&contents).is_ok()
            }
            Err(_) => false,
        };

        if !valid {
            self.write(&json!({
                "balance_snapshots": [],
                "return_files": []
            }))?;
        }
        Ok(())
    }

    fn read(&self) -> Result<Value, StoreError> {
        let mut file = File::open(&self.path).map_err(|e| StoreError::Io(e.to_string()))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| StoreError::Io(e.to_string()))?;
        serde_json::from_str(&contents).map_err(|e| StoreError::Io(e.to_string()))
    }

    fn write(&self, value: &Value) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Io(e.to_string()))?;
        }
        let mut file = File::create(&self.path).map_err(|e| StoreError::Io(e.to_string()))?;
        let formatted =
            serde_json::to_string_pretty(value).map_err(|e| StoreError::Io(e.to_string()))?;
        file.write_all(formatted.as_bytes())
            .map_err(|e| StoreError::Io(e.to_string()))
    }

    fn read_snapshots(&self) -> Result<Vec<BalanceSnapshot>, StoreError> {
        let doc = self.read()?;
        let arr = doc
            .get("balance_snapshots")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default();
        arr.into_iter()
            .map(|v| serde_json::from_value(v).map_err(|e| StoreError::Io(e.to_string())))
            .collect()
    }
}

impl ReconciliationBackend for JsonFileStore {
    fn find_snapshot(&self, key: &SnapshotKey) -> Result<BalanceSnapshot, StoreError> {
        self.read_snapshots()?
            .into_iter()
            .find(|s| key.matches(s))
            .ok_or(StoreError::NotFound)
    }

    fn insert_snapshot(&mut self, snapshot: BalanceSnapshot) -> Result<(), StoreError> {
        let key = SnapshotKey::of(&snapshot);
        if self.read_snapshots()?.iter().any(|s| key.matches(s)) {
            return Err(StoreError::UniqueViolation);
        }

        let mut doc = self.read()?;
        let arr = doc
            .get_mut("balance_snapshots")
            .and_then(|v| v.as_array_mut())
            .ok_or_else(|| StoreError::Io("documento sem 'balance_snapshots'".to_string()))?;
        arr.push(serde_json::to_value(&snapshot).map_err(|e| StoreError::Io(e.to_string()))?);
        self.write(&doc)
    }

    fn delete_snapshot(&mut self, key: &SnapshotKey) -> Result<(), StoreError> {
        let snapshots = self.read_snapshots()?;
        let kept: Vec<&BalanceSnapshot> = snapshots.iter().filter(|s| !key.matches(s)).collect();
        if kept.len() == snapshots.len() {
            return Err(StoreError::NotFound);
        }

        let mut doc = self.read()?;
        doc["balance_snapshots"] =
            serde_json::to_value(&kept).map_err(|e| StoreError::Io(e.to_string()))?;
        self.write(&doc)
    }

    fn snapshots(&self) -> Result<Vec<BalanceSnapshot>, StoreError> {
        self.read_snapshots()
    }

    fn has_return_file(&self, fingerprint: &str) -> Result<bool, StoreError> {
        let doc = self.read()?;
        Ok(doc
            .get("return_files")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter().any(|f| {
                    f.get("fingerprint").and_then(|v| v.as_str()) == Some(fingerprint)
                })
            })
            .unwrap_or(false))
    }

    fn insert_return_file(
        &mut self,
        fingerprint: &str,
        records: &[SettlementRecord],
    ) -> Result<(), StoreError> {
        if self.has_return_file(fingerprint)? {
            return Err(StoreError::UniqueViolation);
        }

        let mut doc = self.read()?;
        let arr = doc
            .get_mut("return_files")
            .and_then(|v| v.as_array_mut())
            .ok_or_else(|| StoreError::Io("documento sem 'return_files'".to_string()))?;
        arr.push(json!({
            "fingerprint": fingerprint,
            "registros": serde_json::to_value(records)
                .map_err(|e| StoreError::Io(e.to_string()))?,
        }));
        self.write(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InsertOutcome, ReconciliationStore};
    use chrono::NaiveDate;

    fn temp_store(tag: &str) -> JsonFileStore {
        let path = std::env::temp_dir().join(format!(
            "reconciliacao-{}-{}.json",
            tag,
            std::process::id()
        ));
        let _ = std::fs::remove_file(&path);
        JsonFileStore::open(path).unwrap()
    }

    fn snapshot() -> BalanceSnapshot {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 9)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        BalanceSnapshot {
            nome_arquivo: "ret.xlsx".to_string(),
            dt_upload: dt,
            valor: 1500.0,
            banco_nome: "Sicredi".to_string(),
            banco_codigo: "748".to_string(),
            layout: "extrato".to_string(),
            agencia: "0101".to_string(),
            conta: "12345-6".to_string(),
            valor_formatado: "R$ 1500.00".to_string(),
            dt_geracao: dt,
            dt_processamento: dt,
            dt_criacao: dt,
            lancamento_manual: None,
            limite_cheque_especial: None,
        }
    }

    #[test]
    fn test_snapshot_roundtrip_and_unique_violation() {
        let mut store = ReconciliationStore::new(temp_store("roundtrip"));
        let snap = snapshot();
        let key = SnapshotKey::of(&snap);

        assert!(!store.exists(&key).unwrap());
        assert_eq!(store.insert_snapshot(snap.clone()), InsertOutcome::Inserted);
        assert!(store.exists(&key).unwrap());
        assert_eq!(store.insert_snapshot(snap), InsertOutcome::Duplicate);

        let all = store.snapshots().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].valor, 1500.0);
    }

    #[test]
    fn test_return_file_fingerprints_persist() {
        let mut store = ReconciliationStore::new(temp_store("files"));
        let bytes = b"qualquer conteudo";
        assert_eq!(store.ingest_return_file(bytes, &[]), InsertOutcome::Inserted);
        assert_eq!(
            store.ingest_return_file(bytes, &[]),
            InsertOutcome::Duplicate
        );
    }
}
