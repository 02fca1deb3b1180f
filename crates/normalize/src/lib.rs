//! Pure value normalization for bank return files.
//!
//! Everything here is side-effect free and never fails: unparseable currency
//! degrades to `0.0`, unparseable dates to `None`, identifiers to an empty
//! string. Structural errors are the parser's job, not this crate's.

pub mod payer;

use chrono::{Duration, NaiveDate};

pub use payer::PayerExtractor;

/// Parses a Brazilian-formatted monetary string ("1.234,56", "R$ 1.234,56")
/// into a float. Plain "1234.56" also parses. Anything else is 0.0.
pub fn normalize_currency(raw: &str) -> f64 {
    let mut cleaned = raw.trim().to_string();
    cleaned = cleaned
        .replace("R$", "")
        .replace(' ', "")
        .replace('\u{A0}', "");

    if cleaned.is_empty() {
        return 0.0;
    }

    // Comma means pt-BR convention: dots are thousands separators.
    if cleaned.contains(',') {
        cleaned = cleaned.replace('.', "").replace(',', ".");
    }

    cleaned.parse::<f64>().unwrap_or(0.0)
}

/// Parses a `DD/MM/YYYY` date string. Requires exactly three non-empty
/// segments; anything else yields `None`, never a partial date.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parts: Vec<&str> = raw.split('/').collect();
    if parts.len() != 3 || parts.iter().any(|p| p.trim().is_empty()) {
        return None;
    }

    let day: u32 = parts[0].trim().parse().ok()?;
    let month: u32 = parts[1].trim().parse().ok()?;
    let year: i32 = parts[2].trim().parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Converts an Excel serial day number into a calendar date using the
/// 1899-12-30 base (common convention, accounts for the 1900 leap bug).
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial >= 100_000.0 {
        return None;
    }
    let days = serial.floor() as i64;
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(days))
}

/// Accepts either a `DD/MM/YYYY` string or an Excel serial rendered as text.
pub fn normalize_date_or_serial(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(serial) = raw.parse::<f64>() {
        return excel_serial_to_date(serial);
    }
    normalize_date(raw)
}

/// Strips every non-digit character. Empty input yields an empty string.
pub fn only_digits(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Splits an external document reference on `/` into invoice and installment.
///
/// Leading zeros are stripped from the invoice; a missing installment
/// defaults to `"001"`. Deterministic and idempotent on the same input.
pub fn split_titulo(seu_numero: &str) -> (String, String) {
    let seu_numero = seu_numero.trim();
    let (titulo, parcela) = match seu_numero.split_once('/') {
        Some((t, p)) if !p.trim().is_empty() => (t.trim(), p.trim().to_string()),
        Some((t, _)) => (t.trim(), "001".to_string()),
        None => (seu_numero, "001".to_string()),
    };

    let titulo = titulo.trim_start_matches('0');
    let titulo = if titulo.is_empty() { "0" } else { titulo };
    (titulo.to_string(), parcela)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_pt_br_format() {
        assert_eq!(normalize_currency("1.234,56"), 1234.56);
        assert_eq!(normalize_currency("R$ 1.234,56"), 1234.56);
        assert_eq!(normalize_currency("-1.234,56"), -1234.56);
        assert_eq!(normalize_currency("0,01"), 0.01);
    }

    #[test]
    fn test_currency_plain_and_garbage() {
        assert_eq!(normalize_currency("1234.56"), 1234.56);
        assert_eq!(normalize_currency("150"), 150.0);
        assert_eq!(normalize_currency(""), 0.0);
        assert_eq!(normalize_currency("abc"), 0.0);
        assert_eq!(normalize_currency("--"), 0.0);
    }

    #[test]
    fn test_currency_idempotent_on_normalized_numbers() {
        let v = normalize_currency("1.234,56");
        assert_eq!(normalize_currency(&format!("{}", v)), v);
    }

    #[test]
    fn test_date_dd_mm_yyyy() {
        assert_eq!(
            normalize_date("25/12/2023"),
            NaiveDate::from_ymd_opt(2023, 12, 25)
        );
        assert_eq!(
            normalize_date(" 01/02/2024 "),
            NaiveDate::from_ymd_opt(2024, 2, 1)
        );
    }

    #[test]
    fn test_date_wrong_segment_count_is_none() {
        assert_eq!(normalize_date("25/12"), None);
        assert_eq!(normalize_date("25/12/2023/1"), None);
        assert_eq!(normalize_date("25//2023"), None);
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("31/02/2023"), None);
    }

    #[test]
    fn test_excel_serial_conversion() {
        // 2023-12-25 is serial 45285
        assert_eq!(
            excel_serial_to_date(45285.0),
            NaiveDate::from_ymd_opt(2023, 12, 25)
        );
        assert_eq!(
            normalize_date_or_serial("45285"),
            NaiveDate::from_ymd_opt(2023, 12, 25)
        );
        assert_eq!(excel_serial_to_date(-1.0), None);
        assert_eq!(excel_serial_to_date(f64::NAN), None);
    }

    #[test]
    fn test_only_digits() {
        assert_eq!(only_digits("43.199.386/0001-01"), "431993860000101");
        assert_eq!(only_digits(""), "");
        assert_eq!(only_digits("abc"), "");
    }

    #[test]
    fn test_split_titulo() {
        assert_eq!(
            split_titulo("123456/002"),
            ("123456".to_string(), "002".to_string())
        );
        assert_eq!(
            split_titulo("123456"),
            ("123456".to_string(), "001".to_string())
        );
        assert_eq!(
            split_titulo("000123/010"),
            ("123".to_string(), "010".to_string())
        );
        assert_eq!(split_titulo("0000"), ("0".to_string(), "001".to_string()));
    }

    #[test]
    fn test_split_titulo_idempotent() {
        let (t, p) = split_titulo("123456/002");
        assert_eq!(split_titulo(&format!("{}/{}", t, p)), (t, p));
    }
}
