use anyhow::{anyhow, Result};

/// Physical shape of an uploaded return file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedFormat {
    /// `;`-separated text, header on the first line.
    DelimitedText,
    /// OLE2 binary spreadsheet (.xls).
    LegacySpreadsheet,
    /// Zip-based spreadsheet archive (.xlsx).
    ArchiveSpreadsheet,
}

const OLE2_MAGIC: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Classifies raw bytes by magic signature, falling back to text-content
/// heuristics. Files without the `;` separator are handed to the spreadsheet
/// readers anyway: some institutions mislabel HTML/CSV exports with a
/// spreadsheet extension, and calamine has the final word.
pub fn detect_format(bytes: &[u8]) -> Result<DetectedFormat> {
    if bytes.is_empty() {
        return Err(anyhow!("Arquivo vazio"));
    }

    if bytes.len() >= 4 {
        if bytes[..4] == OLE2_MAGIC {
            return Ok(DetectedFormat::LegacySpreadsheet);
        }
        if bytes[..4] == ZIP_MAGIC {
            return Ok(DetectedFormat::ArchiveSpreadsheet);
        }
    }

    let text = decode_text(bytes);
    if text.contains(';') {
        return Ok(DetectedFormat::DelimitedText);
    }

    Ok(DetectedFormat::ArchiveSpreadsheet)
}

/// Decodes file bytes as UTF-8 when valid, otherwise as WINDOWS_1252
/// (the usual encoding of Brazilian bank text exports).
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}
