use std::collections::HashMap;

/// Logical fields a return layout can carry. Institutions vary the header
/// labels, not the meaning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Campo {
    SeuNumero,
    NossoNumero,
    Carteira,
    Valor,
    ValorLiquidacao,
    DataLiquidacao,
    Vencimento,
    Pagamento,
    Baixa,
    Pagador,
    CpfCnpjPagador,
    Identificacao,
    Situacao,
}

/// Declarative layout description for one institution: each logical field
/// maps to a priority-ordered list of acceptable header-label fragments.
/// Adding an institution means adding data here, not code.
pub struct ReturnSchema {
    /// How many leading rows to scan for the header (tabular reports).
    pub header_scan_rows: usize,
    /// Minimum total rows before a tabular file counts as non-empty.
    pub min_rows: usize,
    pub campos: &'static [(Campo, &'static [&'static str])],
    /// Raw status codes meaning "settled" on delimited layouts.
    pub codigos_liquidacao: &'static [&'static str],
    /// Status-text fragments meaning "settled" on tabular layouts.
    pub sinonimos_liquidacao: &'static [&'static str],
}

impl ReturnSchema {
    /// Picks the delimited schema for an institution tag. Unknown tags get
    /// the generic cooperative-bank layout.
    pub fn delimited_for(banco: &str) -> Self {
        match banco {
            "sicredi" => Self::delimited_sicredi(),
            _ => Self::delimited_sicredi(),
        }
    }

    /// Picks the tabular schema for an institution tag.
    pub fn tabular_for(banco: &str) -> Self {
        match banco {
            "sicoob" => Self::tabular_sicoob(),
            _ => Self::tabular_sicoob(),
        }
    }

    /// Delimited layout used by cooperative banks (Sicredi-style CSV export).
    /// Doubles as the generic delimited layout.
    pub fn delimited_sicredi() -> Self {
        Self {
            header_scan_rows: 1,
            min_rows: 2,
            campos: &[
                (Campo::SeuNumero, &["seu numero", "seu número"]),
                (Campo::NossoNumero, &["nosso numero", "nosso número"]),
                (Campo::Valor, &["valor"]),
                (
                    Campo::ValorLiquidacao,
                    &["valor liquidacao", "valor liquidação", "valor pago"],
                ),
                (
                    Campo::Pagamento,
                    &["data pagamento", "pagamento", "data liquidacao", "data liquidação"],
                ),
                (Campo::Vencimento, &["vencimento"]),
                (Campo::Baixa, &["baixa"]),
                (Campo::Pagador, &["nome pagador"]),
                (
                    Campo::CpfCnpjPagador,
                    &["cpf/cnpj pagador", "cpf/cnpj do pagador"],
                ),
                (Campo::Identificacao, &["identificacao", "identificação"]),
                (
                    Campo::Situacao,
                    &["ocorrencia", "ocorrência", "situacao", "situação"],
                ),
            ],
            // CNAB occurrence codes: 06 = liquidação, 17 = liquidação após baixa.
            codigos_liquidacao: &["06", "17"],
            sinonimos_liquidacao: &["liquidado", "baixado", "pago"],
        }
    }

    /// Tabular report layout (Sicoob-style spreadsheet export). The bank
    /// labels the settlement amount column just "Liquidação", which is why
    /// the label list here collides with the settlement date on purpose;
    /// `resolve_columns` sorts that out.
    pub fn tabular_sicoob() -> Self {
        Self {
            header_scan_rows: 25,
            min_rows: 20,
            campos: &[
                (
                    Campo::SeuNumero,
                    &["documento", "seu numero", "seu número"],
                ),
                (Campo::NossoNumero, &["nosso numero", "nosso número"]),
                (Campo::Carteira, &["carteira"]),
                (Campo::Valor, &["valor"]),
                (Campo::ValorLiquidacao, &["liquidacao", "liquidação"]),
                (
                    Campo::DataLiquidacao,
                    &["data liquidacao", "data liquidação", "liquidacao", "liquidação"],
                ),
                (Campo::Vencimento, &["vencimento"]),
                (Campo::Baixa, &["baixa"]),
                (Campo::Pagador, &["pagador"]),
                (Campo::Situacao, &["situacao", "situação"]),
            ],
            codigos_liquidacao: &[],
            sinonimos_liquidacao: &["liquidado", "baixado", "pago"],
        }
    }

    pub fn is_codigo_liquidacao(&self, codigo: &str) -> bool {
        let codigo = codigo.trim();
        self.codigos_liquidacao.iter().any(|c| *c == codigo)
    }

    pub fn is_texto_liquidacao(&self, texto: &str) -> bool {
        let texto = texto.to_lowercase();
        self.sinonimos_liquidacao.iter().any(|s| texto.contains(s))
    }
}

/// Resolved header positions for one file.
pub type ColumnMap = HashMap<Campo, usize>;

/// Resolves column indices by case-insensitive substring match against the
/// schema's label fragments, first fragment wins.
pub fn resolve_columns(schema: &ReturnSchema, headers: &[String]) -> ColumnMap {
    let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();

    let mut map = ColumnMap::new();
    for (campo, labels) in schema.campos {
        'labels: for label in *labels {
            for (idx, header) in lowered.iter().enumerate() {
                if header.contains(label) {
                    map.insert(*campo, idx);
                    break 'labels;
                }
            }
        }
    }

    disambiguate_liquidacao(&lowered, &mut map);
    map
}

/// Report layouts that label both the settlement date and the settlement
/// amount with "liquidação" make substring matching land both fields on the
/// same column. When that happens, re-scan the columns after the base
/// amount column for the second settlement-labelled header and move the
/// settlement amount there.
fn disambiguate_liquidacao(headers: &[String], map: &mut ColumnMap) {
    let (Some(&vl_liq), Some(&dt_liq)) = (
        map.get(&Campo::ValorLiquidacao),
        map.get(&Campo::DataLiquidacao),
    ) else {
        return;
    };
    if vl_liq != dt_liq {
        return;
    }

    let start = map.get(&Campo::Valor).map(|&v| v + 1).unwrap_or(0);
    for (idx, header) in headers.iter().enumerate().skip(start) {
        if idx != dt_liq && header.contains("liquida") {
            map.insert(Campo::ValorLiquidacao, idx);
            return;
        }
    }
}
