//! Persistence boundary for settlement records and balance snapshots.
//!
//! The storage layer speaks in structured error codes, not message text;
//! the wrapper here turns those codes into the ingestion policy: a missing
//! row and a permission-denied response both read as "not a duplicate", and
//! a uniqueness violation at insert time is an authoritative duplicate
//! signal (the existence check and the insert are not atomic).

pub mod json_store;
pub mod memory;

use chrono::NaiveDateTime;
use models::{BalanceSnapshot, SettlementRecord};
use sha2::{Digest, Sha256};
use thiserror::Error;

pub use json_store::JsonFileStore;
pub use memory::MemoryStore;

/// Structured error codes of the underlying persistence service.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("registro não encontrado")]
    NotFound,
    #[error("permissão negada pelo serviço de persistência")]
    PermissionDenied,
    #[error("violação de unicidade")]
    UniqueViolation,
    #[error("falha de armazenamento: {0}")]
    Io(String),
}

/// Outcome of an insert. `Duplicate` is expected, not exceptional: callers
/// must be prepared to receive it even after `exists` returned false.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    Duplicate,
    Failed(String),
}

/// The uniqueness key of a balance snapshot: resubmitting the same file
/// with the same declared balance and generation timestamp is a duplicate.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotKey {
    pub nome_arquivo: String,
    pub valor: f64,
    pub banco_nome: String,
    pub banco_codigo: String,
    pub dt_geracao: NaiveDateTime,
}

impl SnapshotKey {
    pub fn of(snapshot: &BalanceSnapshot) -> Self {
        Self {
            nome_arquivo: snapshot.nome_arquivo.clone(),
            valor: snapshot.valor,
            banco_nome: snapshot.banco_nome.clone(),
            banco_codigo: snapshot.banco_codigo.clone(),
            dt_geracao: snapshot.dt_geracao,
        }
    }

    pub fn matches(&self, snapshot: &BalanceSnapshot) -> bool {
        snapshot.nome_arquivo == self.nome_arquivo
            && snapshot.valor == self.valor
            && snapshot.banco_nome == self.banco_nome
            && snapshot.banco_codigo == self.banco_codigo
            && snapshot.dt_geracao == self.dt_geracao
    }
}

/// What a persistence backend must provide. Backends report conditions by
/// error code; all policy lives in [`ReconciliationStore`].
pub trait ReconciliationBackend {
    fn find_snapshot(&self, key: &SnapshotKey) -> Result<BalanceSnapshot, StoreError>;
    fn insert_snapshot(&mut self, snapshot: BalanceSnapshot) -> Result<(), StoreError>;
    fn delete_snapshot(&mut self, key: &SnapshotKey) -> Result<(), StoreError>;
    fn snapshots(&self) -> Result<Vec<BalanceSnapshot>, StoreError>;

    fn has_return_file(&self, fingerprint: &str) -> Result<bool, StoreError>;
    fn insert_return_file(
        &mut self,
        fingerprint: &str,
        records: &[SettlementRecord],
    ) -> Result<(), StoreError>;
}

/// sha256 fingerprint of one uploaded file's exact bytes.
pub fn file_fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub struct ReconciliationStore<B: ReconciliationBackend> {
    backend: B,
}

impl<B: ReconciliationBackend> ReconciliationStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Does a snapshot with this exact key already exist?
    ///
    /// A permission-denied response reads as "does not exist": a possibly
    /// duplicate insert is preferred over blocking ingestion on an
    /// authorization misconfiguration; the unique constraint at insert time
    /// remains the source of truth.
    pub fn exists(&self, key: &SnapshotKey) -> Result<bool, StoreError> {
        match self.backend.find_snapshot(key) {
            Ok(_) => Ok(true),
            Err(StoreError::NotFound) => Ok(false),
            Err(StoreError::PermissionDenied) => {
                tracing::warn!(
                    arquivo = %key.nome_arquivo,
                    banco = %key.banco_codigo,
                    "permissão negada na checagem de duplicidade; seguindo como inexistente"
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    pub fn insert_snapshot(&mut self, snapshot: BalanceSnapshot) -> InsertOutcome {
        match self.backend.insert_snapshot(snapshot) {
            Ok(()) => InsertOutcome::Inserted,
            Err(StoreError::UniqueViolation) => InsertOutcome::Duplicate,
            Err(e) => InsertOutcome::Failed(e.to_string()),
        }
    }

    /// Deletes a snapshot. Only manual entries may be deleted; snapshots
    /// extracted from files are system of record and immutable.
    pub fn delete_snapshot(&mut self, key: &SnapshotKey) -> Result<(), StoreError> {
        let snapshot = self.backend.find_snapshot(key)?;
        if !snapshot.is_manual() {
            return Err(StoreError::PermissionDenied);
        }
        self.backend.delete_snapshot(key)
    }

    pub fn snapshots(&self) -> Result<Vec<BalanceSnapshot>, StoreError> {
        self.backend.snapshots()
    }

    /// Persists the records of one parsed return file, rejecting files whose
    /// exact bytes were already ingested.
    pub fn ingest_return_file(
        &mut self,
        bytes: &[u8],
        records: &[SettlementRecord],
    ) -> InsertOutcome {
        let fingerprint = file_fingerprint(bytes);

        match self.backend.has_return_file(&fingerprint) {
            Ok(true) => return InsertOutcome::Duplicate,
            Ok(false) => {}
            Err(StoreError::PermissionDenied) => {
                tracing::warn!(
                    "permissão negada na checagem de arquivo duplicado; seguindo como inexistente"
                );
            }
            Err(e) => return InsertOutcome::Failed(e.to_string()),
        }

        match self.backend.insert_return_file(&fingerprint, records) {
            Ok(()) => InsertOutcome::Inserted,
            Err(StoreError::UniqueViolation) => InsertOutcome::Duplicate,
            Err(e) => InsertOutcome::Failed(e.to_string()),
        }
    }
}
