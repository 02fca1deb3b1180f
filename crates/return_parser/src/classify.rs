use models::{FileClassification, SettlementRecord, Situacao};

/// Labels a whole file from its record statuses. A mix of open and settled
/// records is always `MISTO`; `LIQUIDADO` therefore only applies when no
/// open records remain.
pub fn classify_file(records: &[SettlementRecord]) -> FileClassification {
    let liquidados = records
        .iter()
        .filter(|r| r.situacao == Situacao::Liquidado)
        .count();
    let em_aberto = records.len() - liquidados;

    if liquidados > 0 && em_aberto > 0 {
        FileClassification::Misto
    } else if liquidados > em_aberto {
        FileClassification::Liquidado
    } else {
        FileClassification::Aberto
    }
}
