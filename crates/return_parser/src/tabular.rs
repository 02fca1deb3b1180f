use anyhow::{anyhow, Result};
use calamine::Data;
use models::{
    ParsedReturn, ReturnSummary, SettlementRecord, SkipReason, SkippedRow, Situacao,
};
use normalize::{
    excel_serial_to_date, normalize_currency, normalize_date, split_titulo, PayerExtractor,
};

use crate::classify::classify_file;
use crate::schema::{resolve_columns, Campo, ColumnMap, ReturnSchema};

/// Engine for spreadsheet-shaped return reports. Works on a decoded 2-D
/// grid of cells; the workbook plumbing lives in the crate root.
pub struct TabularReturnParser {
    schema: ReturnSchema,
    banco: String,
    payer: PayerExtractor,
}

impl TabularReturnParser {
    pub fn new(banco: impl Into<String>) -> Self {
        let banco = banco.into();
        Self {
            schema: ReturnSchema::tabular_for(&banco),
            banco,
            payer: PayerExtractor::new(),
        }
    }

    pub fn parse_rows(&self, rows: &[&[Data]]) -> Result<ParsedReturn> {
        if rows.len() < self.schema.min_rows {
            return Err(anyhow!(
                "Planilha vazia ou incompleta: {} linhas",
                rows.len()
            ));
        }

        let (header_idx, headers) = self
            .find_header_row(rows)
            .ok_or_else(|| anyhow!("Linha de cabeçalho não encontrada"))?;

        let cols = resolve_columns(&self.schema, &headers);
        if !cols.contains_key(&Campo::Valor) {
            return Err(anyhow!("Coluna obrigatória \"Valor\" não encontrada"));
        }

        let mut registros = Vec::new();
        let mut ignoradas = Vec::new();

        for (idx, row) in rows.iter().enumerate().skip(header_idx + 1) {
            if row.len() < 4 {
                ignoradas.push(SkippedRow {
                    row: idx,
                    reason: SkipReason::ShortRow,
                });
                continue;
            }

            let seu_numero = cell_text(row, &cols, Campo::SeuNumero);
            if seu_numero.is_empty() {
                ignoradas.push(SkippedRow {
                    row: idx,
                    reason: SkipReason::EmptyDocument,
                });
                continue;
            }
            if seu_numero.to_lowercase().contains("total") {
                ignoradas.push(SkippedRow {
                    row: idx,
                    reason: SkipReason::TotalRow,
                });
                continue;
            }

            let identidade = self.payer.extract(&cell_text(row, &cols, Campo::Pagador));
            let (nr_titulo, nr_parcela) = split_titulo(&seu_numero);

            let vl_titulo = cell_currency(row, &cols, Campo::Valor);
            let vl_liquidacao = cell_currency(row, &cols, Campo::ValorLiquidacao);

            let situacao_original = cell_text(row, &cols, Campo::Situacao);
            let liquidado = self.schema.is_texto_liquidacao(&situacao_original);
            let situacao = if liquidado {
                Situacao::Liquidado
            } else {
                Situacao::EmAberto
            };

            // Some reports leave the settlement amount blank even when the
            // invoice is settled; the original amount is the payment then.
            let vl_pago = if liquidado {
                if vl_liquidacao != 0.0 {
                    vl_liquidacao
                } else {
                    vl_titulo
                }
            } else {
                0.0
            };

            let carteira = {
                let c = cell_text(row, &cols, Campo::Carteira);
                if c.is_empty() {
                    None
                } else {
                    Some(c)
                }
            };

            registros.push(SettlementRecord {
                seu_numero,
                nr_titulo,
                nr_parcela,
                nosso_numero: cell_text(row, &cols, Campo::NossoNumero),
                carteira,
                vl_titulo,
                vl_pago,
                dt_vencimento: cell_date(row, &cols, Campo::Vencimento),
                dt_pagamento: cell_date(row, &cols, Campo::DataLiquidacao),
                dt_baixa: cell_date(row, &cols, Campo::Baixa),
                nm_pagador: identidade.nome,
                nr_cpfcnpj: identidade.cpfcnpj,
                situacao,
                situacao_original,
                banco: self.banco.clone(),
            });
        }

        Ok(ParsedReturn {
            banco: self.banco.clone(),
            classificacao: classify_file(&registros),
            resumo: ReturnSummary::from_records(&registros),
            registros,
            linhas_ignoradas: ignoradas,
        })
    }

    /// The header is the first row whose concatenated lowercase text carries
    /// both the document-number marker and the word "pagador".
    fn find_header_row(&self, rows: &[&[Data]]) -> Option<(usize, Vec<String>)> {
        for (idx, row) in rows.iter().enumerate().take(self.schema.header_scan_rows) {
            let joined: String = row
                .iter()
                .map(|c| cell_str(c).unwrap_or_default().to_lowercase())
                .collect::<Vec<_>>()
                .join(" ");

            if joined.contains("documento") && joined.contains("pagador") {
                let headers = row
                    .iter()
                    .map(|c| cell_str(c).unwrap_or_default())
                    .collect();
                return Some((idx, headers));
            }
        }
        None
    }
}

fn cell_str(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => Some(s.clone()),
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        Data::Empty => None,
        _ => Some(cell.to_string()),
    }
}

fn cell_text(row: &[Data], cols: &ColumnMap, campo: Campo) -> String {
    cols.get(&campo)
        .and_then(|&idx| row.get(idx))
        .and_then(cell_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn cell_currency(row: &[Data], cols: &ColumnMap, campo: Campo) -> f64 {
    match cols.get(&campo).and_then(|&idx| row.get(idx)) {
        Some(Data::Float(f)) => *f,
        Some(Data::Int(i)) => *i as f64,
        Some(other) => cell_str(other)
            .map(|s| normalize_currency(&s))
            .unwrap_or(0.0),
        None => 0.0,
    }
}

fn cell_date(row: &[Data], cols: &ColumnMap, campo: Campo) -> Option<chrono::NaiveDate> {
    match cols.get(&campo).and_then(|&idx| row.get(idx))? {
        Data::DateTime(dt) => excel_serial_to_date(dt.as_f64()),
        Data::Float(f) => excel_serial_to_date(*f),
        Data::Int(i) => excel_serial_to_date(*i as f64),
        Data::String(s) => normalize_date(s),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::FileClassification;

    fn s(v: &str) -> Data {
        Data::String(v.to_string())
    }

    fn grid_with_rows(data_rows: Vec<Vec<Data>>) -> Vec<Vec<Data>> {
        let mut rows: Vec<Vec<Data>> = Vec::new();
        // Report banner rows before the header, as the banks print them.
        rows.push(vec![s("RELATORIO DE COBRANCA")]);
        rows.push(vec![s("")]);
        rows.push(vec![
            s("Documento"),
            s("Pagador"),
            s("Carteira"),
            s("Valor"),
            s("Vencimento"),
            s("Data Liquidação"),
            s("Liquidação"),
            s("Situação"),
        ]);
        rows.extend(data_rows);
        // Pad so the 20-row minimum is met.
        while rows.len() < 22 {
            rows.push(vec![Data::Empty]);
        }
        rows
    }

    fn parse(rows: &[Vec<Data>]) -> ParsedReturn {
        let borrowed: Vec<&[Data]> = rows.iter().map(|r| r.as_slice()).collect();
        TabularReturnParser::new("sicoob")
            .parse_rows(&borrowed)
            .unwrap()
    }

    #[test]
    fn test_settled_row_uses_settlement_amount() {
        let rows = grid_with_rows(vec![vec![
            s("123456/002"),
            s("43.199.386 KATIA GEANNE DE LIMA"),
            s("1"),
            Data::Float(150.0),
            Data::Float(45285.0),
            Data::Float(45280.0),
            Data::Float(149.5),
            s("BAIXADO"),
        ]]);
        let out = parse(&rows);
        assert_eq!(out.registros.len(), 1);
        let r = &out.registros[0];
        assert_eq!(r.situacao, Situacao::Liquidado);
        assert_eq!(r.vl_pago, 149.5);
        assert_eq!(r.nr_titulo, "123456");
        assert_eq!(r.nr_parcela, "002");
        assert_eq!(r.nr_cpfcnpj, "43199386");
        assert_eq!(r.nm_pagador, "KATIA GEANNE DE LIMA");
        assert_eq!(r.carteira.as_deref(), Some("1"));
        assert_eq!(
            r.dt_vencimento,
            chrono::NaiveDate::from_ymd_opt(2023, 12, 25)
        );
    }

    #[test]
    fn test_settled_row_falls_back_to_original_amount() {
        let rows = grid_with_rows(vec![vec![
            s("777"),
            s("PAGADOR SEM CPF"),
            s(""),
            Data::Float(80.0),
            Data::Empty,
            Data::Empty,
            Data::Empty,
            s("LIQUIDADO"),
        ]]);
        let out = parse(&rows);
        assert_eq!(out.registros[0].vl_pago, 80.0);
    }

    #[test]
    fn test_open_row_has_zero_paid() {
        let rows = grid_with_rows(vec![vec![
            s("888/001"),
            s("OUTRO PAGADOR"),
            s(""),
            Data::Float(60.0),
            Data::Empty,
            Data::Empty,
            Data::Empty,
            s("EM ABERTO"),
        ]]);
        let out = parse(&rows);
        assert_eq!(out.registros[0].situacao, Situacao::EmAberto);
        assert_eq!(out.registros[0].vl_pago, 0.0);
        assert_eq!(out.classificacao, FileClassification::Aberto);
    }

    #[test]
    fn test_total_and_short_rows_are_skipped() {
        let rows = grid_with_rows(vec![
            vec![s("TOTAL GERAL"), s(""), s(""), Data::Float(500.0)],
            vec![s("so-duas"), s("celulas")],
            vec![
                s("999"),
                s("PAGADOR"),
                s(""),
                Data::Float(10.0),
                Data::Empty,
                Data::Empty,
                Data::Empty,
                s("EM ABERTO"),
            ],
        ]);
        let out = parse(&rows);
        assert_eq!(out.registros.len(), 1);
        let reasons: Vec<_> = out.linhas_ignoradas.iter().map(|i| i.reason).collect();
        assert!(reasons.contains(&SkipReason::TotalRow));
        assert!(reasons.contains(&SkipReason::ShortRow));
    }

    #[test]
    fn test_too_few_rows_is_fatal() {
        let rows: Vec<Vec<Data>> = vec![vec![s("Documento"), s("Pagador")]; 5];
        let borrowed: Vec<&[Data]> = rows.iter().map(|r| r.as_slice()).collect();
        let err = TabularReturnParser::new("sicoob")
            .parse_rows(&borrowed)
            .unwrap_err();
        assert!(err.to_string().contains("vazia"));
    }

    #[test]
    fn test_missing_header_is_fatal() {
        let rows: Vec<Vec<Data>> = vec![vec![s("qualquer"), s("coisa")]; 30];
        let borrowed: Vec<&[Data]> = rows.iter().map(|r| r.as_slice()).collect();
        let err = TabularReturnParser::new("sicoob")
            .parse_rows(&borrowed)
            .unwrap_err();
        assert!(err.to_string().contains("cabeçalho"));
    }

    #[test]
    fn test_header_beyond_scan_window_is_not_found() {
        let mut rows: Vec<Vec<Data>> = vec![vec![s("banner")]; 26];
        rows.push(vec![s("Documento"), s("Pagador"), s("Valor")]);
        while rows.len() < 30 {
            rows.push(vec![Data::Empty]);
        }
        let borrowed: Vec<&[Data]> = rows.iter().map(|r| r.as_slice()).collect();
        assert!(TabularReturnParser::new("sicoob")
            .parse_rows(&borrowed)
            .is_err());
    }
}
