use crate::error::{ProcessorError, Result};
use crate::table::{RawColumn, RawTable};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Candidate text encodings, tried in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Utf8Sig,
    Latin1,
    Cp1252,
    Iso8859_1,
}

pub const ENCODINGS: [Encoding; 5] = [
    Encoding::Utf8,
    Encoding::Utf8Sig,
    Encoding::Latin1,
    Encoding::Cp1252,
    Encoding::Iso8859_1,
];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

impl Encoding {
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Utf8 => "utf-8",
            Encoding::Utf8Sig => "utf-8-sig",
            Encoding::Latin1 => "latin-1",
            Encoding::Cp1252 => "cp1252",
            Encoding::Iso8859_1 => "iso-8859-1",
        }
    }

    /// Decode strictly; `None` when the bytes are not valid in this encoding.
    pub fn decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Encoding::Utf8 => encoding_rs::UTF_8
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned()),
            Encoding::Utf8Sig => {
                let body = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
                encoding_rs::UTF_8
                    .decode_without_bom_handling_and_without_replacement(body)
                    .map(|text| text.into_owned())
            }
            // ISO-8859-1 maps every byte to the code point of the same value.
            Encoding::Latin1 | Encoding::Iso8859_1 => {
                Some(bytes.iter().map(|b| char::from(*b)).collect())
            }
            Encoding::Cp1252 => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|text| text.into_owned()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoadReport {
    pub total_rows: usize,
    pub loaded_rows: usize,
    pub parse_errors: usize,
    pub encoding: Encoding,
    pub bytes: usize,
}

/// Reject files above the configured upload ceiling before reading them.
pub fn check_file_size(path: &Path, max_size: u64) -> Result<()> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ProcessorError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            ProcessorError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    if metadata.len() > max_size {
        return Err(ProcessorError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size,
        });
    }
    Ok(())
}

pub fn load_csv(path: &Path, max_size: u64) -> Result<(RawTable, LoadReport)> {
    check_file_size(path, max_size)?;
    let bytes = std::fs::read(path).map_err(|e| ProcessorError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    info!(path = %path.display(), bytes = bytes.len(), "read upload");
    load_csv_bytes(&bytes)
}

/// Decode and parse a delimited payload, trying each candidate encoding in
/// turn until one both decodes and parses.
pub fn load_csv_bytes(bytes: &[u8]) -> Result<(RawTable, LoadReport)> {
    let mut attempts = Vec::new();
    for encoding in ENCODINGS {
        let Some(text) = encoding.decode(bytes) else {
            debug!(encoding = encoding.name(), "payload does not decode");
            attempts.push(encoding.name().to_string());
            continue;
        };
        match parse_csv(&text) {
            Ok((table, total_rows, parse_errors)) => {
                if table.width() == 0 {
                    return Err(ProcessorError::NoColumns);
                }
                if table.rows() == 0 {
                    return Err(ProcessorError::EmptyDataset);
                }
                if parse_errors > 0 {
                    warn!(parse_errors, "rows skipped due to malformed fields");
                }
                info!(
                    encoding = encoding.name(),
                    rows = table.rows(),
                    columns = table.width(),
                    "parsed upload"
                );
                let report = LoadReport {
                    total_rows,
                    loaded_rows: table.rows(),
                    parse_errors,
                    encoding,
                    bytes: bytes.len(),
                };
                return Ok((table, report));
            }
            Err(e) => {
                debug!(encoding = encoding.name(), error = %e, "payload does not parse");
                attempts.push(encoding.name().to_string());
            }
        }
    }
    Err(ProcessorError::NoEncodingMatched { attempts })
}

fn parse_csv(text: &str) -> std::result::Result<(RawTable, usize, usize), csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers = header_names(rdr.headers()?);
    let mut columns: Vec<RawColumn> = headers
        .into_iter()
        .map(|name| RawColumn {
            name,
            values: Vec::new(),
        })
        .collect();

    let mut total_rows = 0usize;
    let mut parse_errors = 0usize;
    for result in rdr.records() {
        total_rows += 1;
        let record = match result {
            Ok(r) => r,
            Err(_) => {
                parse_errors += 1;
                continue;
            }
        };
        // Short rows are padded with missing cells; long rows are malformed.
        if record.len() > columns.len() {
            parse_errors += 1;
            continue;
        }
        for (i, column) in columns.iter_mut().enumerate() {
            column.values.push(record.get(i).map(str::to_string));
        }
    }
    Ok((RawTable { columns }, total_rows, parse_errors))
}

/// Clean header names: strip a leading BOM and surrounding whitespace, and
/// suffix repeated names with `.1`, `.2`, ...
fn header_names(record: &csv::StringRecord) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    record
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let raw = if i == 0 {
                raw.trim_start_matches('\u{feff}')
            } else {
                raw
            };
            let base = raw.trim().to_string();
            let count = seen.entry(base.clone()).or_insert(0);
            let name = if *count == 0 {
                base
            } else {
                format!("{base}.{count}")
            };
            *count += 1;
            name
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_utf8_payload() {
        let (table, report) = load_csv_bytes(b"sector,viv_positiva\nSAN JUAN,1\nLA UNION,0\n").unwrap();
        assert_eq!(report.encoding, Encoding::Utf8);
        assert_eq!(table.rows(), 2);
        assert_eq!(table.columns[0].name, "sector");
        assert_eq!(table.columns[1].values[0].as_deref(), Some("1"));
    }

    #[test]
    fn falls_back_to_latin1() {
        // "Sansón" encoded as ISO-8859-1 is not valid UTF-8.
        let bytes = b"recipiente\nSans\xf3n\n";
        let (table, report) = load_csv_bytes(bytes).unwrap();
        assert_eq!(report.encoding, Encoding::Latin1);
        assert_eq!(table.columns[0].values[0].as_deref(), Some("Sansón"));
    }

    #[test]
    fn strips_bom_from_first_header() {
        let (table, _) = load_csv_bytes(b"\xef\xbb\xbfsector\nA\n").unwrap();
        assert_eq!(table.columns[0].name, "sector");
    }

    #[test]
    fn counts_overlong_rows_as_errors() {
        let (table, report) = load_csv_bytes(b"a,b\n1,2\n1,2,3\n4\n").unwrap();
        assert_eq!(report.total_rows, 3);
        assert_eq!(report.parse_errors, 1);
        assert_eq!(table.rows(), 2);
        assert_eq!(table.columns[1].values[1], None);
    }

    #[test]
    fn header_only_is_empty_dataset() {
        let err = load_csv_bytes(b"a,b\n").unwrap_err();
        assert!(matches!(err, ProcessorError::EmptyDataset));
    }

    #[test]
    fn duplicate_headers_are_suffixed() {
        let (table, _) = load_csv_bytes(b"sector,sector\nA,B\n").unwrap();
        assert_eq!(table.columns[1].name, "sector.1");
    }
}
