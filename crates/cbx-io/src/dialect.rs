//! Raw-file dialect detection.
//!
//! Raw exports arrive either comma- or semicolon-separated, in UTF-8 or
//! Latin-1. Detection decodes the leading bytes under each candidate and
//! keeps the one whose header and first rows parse with a consistent,
//! multi-column width.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use cbx_core::{CbxError, CbxResult};

/// Rows checked for a consistent width during sniffing.
pub const SNIFF_ROWS: usize = 32;
/// Bytes read for sniffing.
const SNIFF_BYTES: usize = 64 * 1024;

/// Supported field separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Separator {
    Comma,
    Semicolon,
}

impl Separator {
    pub const ALL: &'static [Separator] = &[Separator::Comma, Separator::Semicolon];

    pub fn byte(&self) -> u8 {
        match self {
            Separator::Comma => b',',
            Separator::Semicolon => b';',
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Separator::Comma => "comma",
            Separator::Semicolon => "semicolon",
        }
    }
}

/// Supported text encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
}

impl Encoding {
    pub const ALL: &'static [Encoding] = &[Encoding::Utf8, Encoding::Latin1];

    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Latin1 => "Latin-1",
        }
    }

    /// Decode a complete buffer. Latin-1 is a direct byte→char widening and
    /// cannot fail.
    pub fn decode(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_owned),
            Encoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }

    /// Decode a prefix that may end mid multi-byte sequence.
    fn decode_prefix(&self, bytes: &[u8]) -> Option<String> {
        match self {
            Encoding::Utf8 => match std::str::from_utf8(bytes) {
                Ok(text) => Some(text.to_owned()),
                // error_len() == None means the buffer merely ends inside a
                // sequence; the prefix up to there is still valid UTF-8.
                Err(err) if err.error_len().is_none() => Some(
                    std::str::from_utf8(&bytes[..err.valid_up_to()])
                        .ok()?
                        .to_owned(),
                ),
                Err(_) => None,
            },
            Encoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
        }
    }
}

/// Confidence in a detected dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Confidence {
    /// Parsed, but too few rows (or an unverifiable encoding) to be sure
    Low,
    /// Consistent over the sniffed rows, encoding not self-describing
    Medium,
    /// Valid UTF-8 with a consistent width over the sniffed rows
    High,
}

/// A concrete separator/encoding pair for one raw file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub separator: Separator,
    pub encoding: Encoding,
}

impl Dialect {
    /// Detect the dialect of the file at `path`.
    ///
    /// Every candidate pair is scored on the leading [`SNIFF_ROWS`] rows;
    /// a candidate survives when all rows share one width of at least two
    /// columns. No surviving candidate → [`CbxError::Format`] with a sample
    /// of the offending content.
    pub fn detect(path: &Path) -> CbxResult<(Dialect, Confidence)> {
        let file = File::open(path)?;
        let mut head = Vec::with_capacity(SNIFF_BYTES);
        file.take(SNIFF_BYTES as u64).read_to_end(&mut head)?;
        let truncated = head.len() == SNIFF_BYTES;

        let mut best: Option<(Dialect, Confidence, usize)> = None;
        for &encoding in Encoding::ALL {
            let Some(text) = encoding.decode_prefix(&head) else {
                continue;
            };
            for &separator in Separator::ALL {
                let Some((width, rows)) = sniff(&text, separator, truncated) else {
                    continue;
                };
                let confidence = match encoding {
                    Encoding::Utf8 if rows >= 8 => Confidence::High,
                    _ if rows >= 8 => Confidence::Medium,
                    _ => Confidence::Low,
                };
                let candidate = (
                    Dialect {
                        separator,
                        encoding,
                    },
                    confidence,
                    width,
                );
                // Strictly-better keeps the earlier candidate on ties, so
                // UTF-8 and comma win when both readings fit.
                if best
                    .map(|(_, conf, w)| (confidence, width) > (conf, w))
                    .unwrap_or(true)
                {
                    best = Some(candidate);
                }
            }
        }

        match best {
            Some((dialect, confidence, _)) => Ok((dialect, confidence)),
            None => {
                let sample = Encoding::Latin1.decode(&head).unwrap_or_default();
                Err(CbxError::format(
                    path.display().to_string(),
                    "no separator/encoding candidate yields a consistent table",
                    sample.lines().next().unwrap_or(""),
                ))
            }
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.separator.name(), self.encoding.name())
    }
}

/// Parse up to [`SNIFF_ROWS`] rows and return `(width, rows_checked)` when
/// every row shares one width of at least two columns.
fn sniff(text: &str, separator: Separator, truncated: bool) -> Option<(usize, usize)> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator.byte())
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut widths = Vec::new();
    for record in reader.records().take(SNIFF_ROWS) {
        widths.push(record.ok()?.len());
    }
    // The last sniffed row of a truncated read may be cut mid-line.
    if truncated && widths.len() > 1 {
        widths.pop();
    }
    let &first = widths.first()?;
    (first >= 2 && widths.iter().all(|&w| w == first)).then_some((first, widths.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn detects_semicolon_utf8() {
        let file = write_file(b"Date;Heure;FR vers GB (MWh)\n2024-01-01;1;100\n2024-01-01;2;90\n");
        let (dialect, _) = Dialect::detect(file.path()).unwrap();
        assert_eq!(dialect.separator, Separator::Semicolon);
        assert_eq!(dialect.encoding, Encoding::Utf8);
    }

    #[test]
    fn detects_comma_utf8() {
        let file = write_file(b"timestamp,partner,net_mw\n2024-01-01 00:00:00,GBR,80.0\n");
        let (dialect, _) = Dialect::detect(file.path()).unwrap();
        assert_eq!(dialect.separator, Separator::Comma);
        assert_eq!(dialect.encoding, Encoding::Utf8);
    }

    #[test]
    fn detects_latin1_when_bytes_are_not_utf8() {
        // 0xE9 is 'é' in Latin-1 and invalid as a standalone UTF-8 byte.
        let file = write_file(b"Date;Tranche horaire du programme d'\xE9change;X\n2024-01-01;1;5\n");
        let (dialect, confidence) = Dialect::detect(file.path()).unwrap();
        assert_eq!(dialect.encoding, Encoding::Latin1);
        assert_eq!(dialect.separator, Separator::Semicolon);
        assert!(confidence <= Confidence::Medium);
    }

    #[test]
    fn confidence_rises_with_row_count() {
        let mut content = String::from("a;b;c\n");
        for i in 0..20 {
            content.push_str(&format!("{i};{i};{i}\n"));
        }
        let file = write_file(content.as_bytes());
        let (_, confidence) = Dialect::detect(file.path()).unwrap();
        assert_eq!(confidence, Confidence::High);
    }

    #[test]
    fn single_column_file_is_rejected() {
        let file = write_file(b"just one header\nrow one\nrow two\n");
        let err = Dialect::detect(file.path()).unwrap_err();
        assert!(matches!(err, CbxError::Format { .. }));
        assert!(err.to_string().contains("just one header"));
    }

    #[test]
    fn empty_file_is_rejected() {
        let file = write_file(b"");
        assert!(matches!(
            Dialect::detect(file.path()),
            Err(CbxError::Format { .. })
        ));
    }

    #[test]
    fn ragged_widths_are_rejected_for_that_candidate() {
        // Comma-reading of a semicolon file with decimal commas is ragged
        // because the header holds no comma at all.
        let file =
            write_file(b"Date;Heure;Valeur\n2024-01-01;1;123,5\n2024-01-01;2;99,0\n");
        let (dialect, _) = Dialect::detect(file.path()).unwrap();
        assert_eq!(dialect.separator, Separator::Semicolon);
    }
}
