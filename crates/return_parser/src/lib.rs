//! Turns raw bank return files into canonical settlement records.
//!
//! The entry point is [`parse_return`]: sniff the physical format, pick the
//! matching engine, and hand back a [`models::ParsedReturn`]. Institutions
//! are described declaratively in [`schema`]; the engines in [`delimited`]
//! and [`tabular`] are generic over those schemas.

pub mod classify;
pub mod delimited;
pub mod detect;
pub mod schema;
pub mod tabular;

use std::io::Cursor;

use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto_from_rs, Data, Reader, Xls, Xlsx};
use models::ParsedReturn;

pub use classify::classify_file;
pub use delimited::DelimitedReturnParser;
pub use detect::{decode_text, detect_format, DetectedFormat};
pub use tabular::TabularReturnParser;

/// Parses one uploaded return file. `banco` is the institution tag supplied
/// by the upload flow; format detection selects the engine, not the bank.
pub fn parse_return(bytes: &[u8], banco: &str) -> Result<ParsedReturn> {
    match detect_format(bytes)? {
        DetectedFormat::DelimitedText => {
            DelimitedReturnParser::new(banco).parse_text(&decode_text(bytes))
        }
        DetectedFormat::LegacySpreadsheet => {
            let workbook: Xls<_> = Xls::new(Cursor::new(bytes.to_vec()))
                .context("Falha ao abrir planilha binária (.xls)")?;
            parse_grid(workbook, banco)
        }
        DetectedFormat::ArchiveSpreadsheet => {
            // Either a real .xlsx or the text fallback for files without the
            // delimiter; the auto reader re-sniffs before giving up.
            match Xlsx::new(Cursor::new(bytes.to_vec())) {
                Ok(workbook) => parse_grid(workbook, banco),
                Err(_) => {
                    let workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
                        .context("Formato de arquivo não reconhecido")?;
                    parse_grid(workbook, banco)
                }
            }
        }
    }
}

fn parse_grid<RS, R>(mut workbook: R, banco: &str) -> Result<ParsedReturn>
where
    RS: std::io::Read + std::io::Seek,
    R: Reader<RS>,
    R::Error: std::error::Error + Send + Sync + 'static,
{
    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("Planilha sem abas"))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .with_context(|| format!("Falha ao ler a aba '{}'", sheet_name))?;

    let rows: Vec<&[Data]> = range.rows().collect();
    TabularReturnParser::new(banco).parse_rows(&rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::{FileClassification, Situacao};

    #[test]
    fn test_delimited_end_to_end() {
        let text = "Seu Numero;Nome Pagador;Valor;Vencimento;Ocorrencia\n\
                    123456/002;MARIA;1.234,56;10/01/2024;06\n";
        let out = parse_return(text.as_bytes(), "sicredi").unwrap();
        assert_eq!(out.banco, "sicredi");
        assert_eq!(out.registros.len(), 1);
        assert_eq!(out.registros[0].situacao, Situacao::Liquidado);
        assert_eq!(out.classificacao, FileClassification::Liquidado);
    }

    #[test]
    fn test_latin1_delimited_bytes() {
        let bytes = b"Seu Numero;Nome Pagador;Valor;Situa\xe7\xe3o\n111;JO\xc3O;50,00;02\n";
        let out = parse_return(bytes, "sicredi").unwrap();
        assert_eq!(out.registros[0].nm_pagador, "JOÃO");
        assert_eq!(out.registros[0].situacao, Situacao::EmAberto);
    }

    #[test]
    fn test_unrecognized_bytes_fail_without_records() {
        // No magic, no delimiter, not a workbook.
        let err = parse_return(b"conteudo sem estrutura alguma", "sicoob").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_empty_file_is_a_format_error() {
        assert!(parse_return(&[], "sicredi").is_err());
    }
}
