use anyhow::{anyhow, Result};
use models::{
    ParsedReturn, ReturnSummary, SettlementRecord, SkipReason, SkippedRow, Situacao,
};
use normalize::{normalize_currency, normalize_date, only_digits, split_titulo};

use crate::classify::classify_file;
use crate::schema::{resolve_columns, Campo, ColumnMap, ReturnSchema};

/// Engine for `;`-separated return files. The first line is the header;
/// columns are resolved through the institution schema.
pub struct DelimitedReturnParser {
    schema: ReturnSchema,
    banco: String,
}

impl DelimitedReturnParser {
    pub fn new(banco: impl Into<String>) -> Self {
        let banco = banco.into();
        Self {
            schema: ReturnSchema::delimited_for(&banco),
            banco,
        }
    }

    pub fn parse_text(&self, text: &str) -> Result<ParsedReturn> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(text.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| anyhow!("Cabeçalho ilegível: {e}"))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let cols = resolve_columns(&self.schema, &headers);
        if !cols.contains_key(&Campo::Valor) {
            return Err(anyhow!("Coluna obrigatória \"Valor\" não encontrada"));
        }

        let mut registros = Vec::new();
        let mut ignoradas = Vec::new();

        for (idx, row) in reader.records().enumerate() {
            // Header is line 0; data starts at line 1.
            let linha = idx + 1;
            let row = match row {
                Ok(r) => r,
                Err(_) => {
                    ignoradas.push(SkippedRow {
                        row: linha,
                        reason: SkipReason::BlankLine,
                    });
                    continue;
                }
            };

            if row.iter().all(|c| c.trim().is_empty()) {
                ignoradas.push(SkippedRow {
                    row: linha,
                    reason: SkipReason::BlankLine,
                });
                continue;
            }

            let get = |campo: Campo| -> String { cell(&row, &cols, campo) };

            let seu_numero = get(Campo::SeuNumero);
            let vl_titulo = normalize_currency(&get(Campo::Valor));

            // Rows with no amount and no reference carry nothing usable.
            if vl_titulo == 0.0 && seu_numero.is_empty() {
                ignoradas.push(SkippedRow {
                    row: linha,
                    reason: SkipReason::NoiseRow,
                });
                continue;
            }

            let vl_liquidacao = normalize_currency(&get(Campo::ValorLiquidacao));
            let dt_pagamento = normalize_date(&get(Campo::Pagamento));
            let situacao_original = get(Campo::Situacao);

            let liquidado = self.schema.is_codigo_liquidacao(&situacao_original)
                || dt_pagamento.is_some()
                || vl_liquidacao != 0.0;
            let situacao = if liquidado {
                Situacao::Liquidado
            } else {
                Situacao::EmAberto
            };

            let cpfcnpj = {
                let preferido = only_digits(&get(Campo::CpfCnpjPagador));
                if preferido.is_empty() {
                    only_digits(&get(Campo::Identificacao))
                } else {
                    preferido
                }
            };

            let (nr_titulo, nr_parcela) = split_titulo(&seu_numero);

            registros.push(SettlementRecord {
                seu_numero,
                nr_titulo,
                nr_parcela,
                nosso_numero: get(Campo::NossoNumero),
                carteira: None,
                vl_titulo,
                vl_pago: if liquidado { vl_liquidacao } else { 0.0 },
                dt_vencimento: normalize_date(&get(Campo::Vencimento)),
                dt_pagamento,
                dt_baixa: normalize_date(&get(Campo::Baixa)),
                nm_pagador: get(Campo::Pagador),
                nr_cpfcnpj: cpfcnpj,
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
}

fn cell(row: &csv::StringRecord, cols: &ColumnMap, campo: Campo) -> String {
    cols.get(&campo)
        .and_then(|&idx| row.get(idx))
        .unwrap_or("")
        .trim()
        .to_string()
}
