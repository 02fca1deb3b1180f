use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Reserved file-name tag for balance entries typed in by an operator
/// instead of extracted from a bank file.
pub const MANUAL_ENTRY_FILE: &str = "LANCAMENTO MANUAL";

/// Synthetic institution code used by manual balance entries.
pub const MANUAL_ENTRY_BANK_CODE: &str = "999";

/// Settlement status of a single invoice line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Situacao {
    #[serde(rename = "EM ABERTO")]
    EmAberto,
    #[serde(rename = "LIQUIDADO")]
    Liquidado,
}

impl Situacao {
    pub fn as_str(&self) -> &'static str {
        match self {
            Situacao::EmAberto => "EM ABERTO",
            Situacao::Liquidado => "LIQUIDADO",
        }
    }
}

impl std::fmt::Display for Situacao {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Overall label of one return file, derived from its record statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileClassification {
    #[serde(rename = "ABERTO")]
    Aberto,
    #[serde(rename = "LIQUIDADO")]
    Liquidado,
    #[serde(rename = "MISTO")]
    Misto,
}

impl FileClassification {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileClassification::Aberto => "ABERTO",
            FileClassification::Liquidado => "LIQUIDADO",
            FileClassification::Misto => "MISTO",
        }
    }
}

impl std::fmt::Display for FileClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One payer/invoice line extracted from a bank return file.
///
/// Created once per successfully parsed row and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRecord {
    /// External document reference as printed by the bank ("seu número").
    pub seu_numero: String,
    /// Invoice number, `seu_numero` up to the first `/`, leading zeros stripped.
    pub nr_titulo: String,
    /// Installment number, `seu_numero` after the first `/`, `"001"` when absent.
    pub nr_parcela: String,
    /// Internal bank reference ("nosso número").
    pub nosso_numero: String,
    /// Portfolio code, present only on spreadsheet-shaped reports.
    pub carteira: Option<String>,
    /// Original invoice amount.
    pub vl_titulo: f64,
    /// Paid amount. Non-zero only when `situacao` is `Liquidado`.
    pub vl_pago: f64,
    pub dt_vencimento: Option<NaiveDate>,
    pub dt_pagamento: Option<NaiveDate>,
    pub dt_baixa: Option<NaiveDate>,
    pub nm_pagador: String,
    /// Payer CPF/CNPJ, digits only, possibly empty.
    pub nr_cpfcnpj: String,
    pub situacao: Situacao,
    /// Raw status text/code as found in the file, before classification.
    pub situacao_original: String,
    pub banco: String,
}

/// Why a data row was dropped instead of producing a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    BlankLine,
    NoiseRow,
    ShortRow,
    EmptyDocument,
    TotalRow,
}

/// Diagnostic for one dropped row. Collected for audit only; skipped rows
/// never affect the success or failure of the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedRow {
    /// Zero-based row index within the file/sheet.
    pub row: usize,
    pub reason: SkipReason,
}

/// Aggregate statistics over one parsed file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnSummary {
    pub total_registros: usize,
    pub em_aberto: usize,
    pub liquidados: usize,
    pub vl_titulo_total: f64,
    pub vl_pago_total: f64,
}

impl ReturnSummary {
    pub fn from_records(records: &[SettlementRecord]) -> Self {
        let liquidados = records
            .iter()
            .filter(|r| r.situacao == Situacao::Liquidado)
            .count();
        Self {
            total_registros: records.len(),
            em_aberto: records.len() - liquidados,
            liquidados,
            vl_titulo_total: records.iter().map(|r| r.vl_titulo).sum(),
            vl_pago_total: records.iter().map(|r| r.vl_pago).sum(),
        }
    }
}

/// Successful outcome of parsing one return file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedReturn {
    pub banco: String,
    pub classificacao: FileClassification,
    pub registros: Vec<SettlementRecord>,
    pub resumo: ReturnSummary,
    pub linhas_ignoradas: Vec<SkippedRow>,
}

/// One "as of" observation of an account balance, from a file or typed in
/// manually. Never updated in place; the current balance per account is
/// derived, not stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    pub nome_arquivo: String,
    pub dt_upload: NaiveDateTime,
    pub valor: f64,
    pub banco_nome: String,
    pub banco_codigo: String,
    pub layout: String,
    pub agencia: String,
    pub conta: String,
    pub valor_formatado: String,
    /// Timestamp the issuing institution declares as when the data was
    /// produced. This is the authoritative "as of" time.
    pub dt_geracao: NaiveDateTime,
    pub dt_processamento: NaiveDateTime,
    pub dt_criacao: NaiveDateTime,
    #[serde(default)]
    pub lancamento_manual: Option<ManualEntry>,
    #[serde(default)]
    pub limite_cheque_especial: Option<f64>,
}

impl BalanceSnapshot {
    pub fn is_manual(&self) -> bool {
        self.lancamento_manual.is_some()
    }
}

/// Attribution and sign for a manually entered balance snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualEntry {
    /// "+" or "-", the operator-declared direction of the adjustment.
    pub operacao: String,
    pub descricao: String,
    pub usuario: String,
}
