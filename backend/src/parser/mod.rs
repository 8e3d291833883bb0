//! CSV framing for quote exports.
//!
//! Turns a byte stream into [`RawRow`]s keyed by the header line. Framing
//! rules:
//!
//! - a leading UTF-8 byte-order mark is dropped
//! - lines whose first non-blank character is `#` are comments
//! - blank lines are skipped
//! - the first remaining line is the header
//! - quoting is lenient: a quote never spans lines, and an unclosed quote is
//!   kept as literal text
//! - every field is trimmed
//!
//! Only I/O failures end the sequence early; they are delivered as the last
//! item.

use std::fs::File;
use std::io::{BufRead, BufReader, Chain, Cursor, Read};
use std::path::Path;
use std::sync::Arc;

use crate::error::{CsvError, CsvResult};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

// =============================================================================
// Raw Row
// =============================================================================

/// One data line as an ordered header -> text mapping.
#[derive(Debug, Clone)]
pub struct RawRow {
    line: u64,
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl RawRow {
    /// Build a row by hand. Values beyond the header count are dropped.
    pub fn new(line: u64, headers: Arc<[String]>, mut values: Vec<String>) -> Self {
        values.truncate(headers.len());
        Self { line, headers, values }
    }

    /// Source line number (1-based) of this row.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Cell for `column`, `None` if the header is absent or the line was short.
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = self.headers.iter().position(|h| h == column)?;
        self.values.get(idx).map(String::as_str)
    }

    /// Header/value pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .zip(self.values.iter())
            .map(|(h, v)| (h.as_str(), v.as_str()))
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }
}

// =============================================================================
// Record Reader
// =============================================================================

type BomStripped<R> = Chain<Cursor<Vec<u8>>, R>;

/// Forward-only reader yielding [`RawRow`]s.
///
/// Framing is per physical line: comments and blanks are recognised on the
/// raw line, and a quote never spans a line break. A line with an unclosed
/// quote is split on commas with its quotes kept as literal text.
///
/// Not restartable: a second pass requires reopening the source.
pub struct RecordReader<R: Read> {
    lines: BufReader<BomStripped<R>>,
    framing: csv::ReaderBuilder,
    buf: Vec<u8>,
    record: csv::ByteRecord,
    line_no: u64,
    headers: Option<Arc<[String]>>,
    finished: bool,
}

impl RecordReader<File> {
    /// Open a CSV file on disk.
    pub fn from_path<P: AsRef<Path>>(path: P) -> CsvResult<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(file)
    }
}

impl<R: Read> RecordReader<R> {
    /// Wrap a byte stream. Reads at most three bytes up front to detect a BOM.
    pub fn new(reader: R) -> CsvResult<Self> {
        let stream = strip_bom(reader)?;
        let mut framing = csv::ReaderBuilder::new();
        framing.has_headers(false).flexible(true).trim(csv::Trim::All);

        Ok(Self {
            lines: BufReader::new(stream),
            framing,
            buf: Vec::new(),
            record: csv::ByteRecord::new(),
            line_no: 0,
            headers: None,
            finished: false,
        })
    }

    /// Header columns, reading ahead to the header line if needed.
    ///
    /// `Ok(None)` means the stream holds nothing but comments and blanks.
    pub fn read_headers(&mut self) -> CsvResult<Option<Arc<[String]>>> {
        if self.headers.is_none() {
            if let Some((_, names)) = self.next_content_line()? {
                self.headers = Some(names.into());
            }
        }
        Ok(self.headers.clone())
    }

    /// Next non-comment, non-blank line as decoded fields.
    fn next_content_line(&mut self) -> CsvResult<Option<(u64, Vec<String>)>> {
        loop {
            self.buf.clear();
            if self.lines.read_until(b'\n', &mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let line = strip_line_end(&self.buf);
            if is_skippable(line) {
                continue;
            }
            let fields = split_fields(&self.framing, &mut self.record, line)?;
            return Ok(Some((self.line_no, fields)));
        }
    }

    fn next_row(&mut self) -> CsvResult<Option<RawRow>> {
        let headers = match self.read_headers()? {
            Some(h) => h,
            None => return Ok(None),
        };
        Ok(self
            .next_content_line()?
            .map(|(line, values)| RawRow::new(line, headers, values)))
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = CsvResult<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Parse an in-memory CSV string into rows.
pub fn parse_str(content: &str) -> CsvResult<Vec<RawRow>> {
    RecordReader::new(content.as_bytes())?.collect()
}

/// Consume the leading bytes and drop them if they are a UTF-8 BOM.
fn strip_bom<R: Read>(mut reader: R) -> Result<BomStripped<R>, CsvError> {
    let mut prefix = Vec::with_capacity(UTF8_BOM.len());
    let mut buf = [0u8; 3];
    while prefix.len() < UTF8_BOM.len() {
        let n = reader.read(&mut buf[..UTF8_BOM.len() - prefix.len()])?;
        if n == 0 {
            break;
        }
        prefix.extend_from_slice(&buf[..n]);
    }
    if prefix == UTF8_BOM {
        prefix.clear();
    }
    Ok(Cursor::new(prefix).chain(reader))
}

fn strip_line_end(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Blank, or first non-blank byte is `#`.
fn is_skippable(line: &[u8]) -> bool {
    match line.iter().find(|b| !b.is_ascii_whitespace()) {
        None => true,
        Some(b) => *b == b'#',
    }
}

/// Split one physical line into trimmed fields.
///
/// An odd number of quotes means one of them never closes on this line; the
/// line is then split on every comma and quotes stay in the cell text.
fn split_fields(
    framing: &csv::ReaderBuilder,
    record: &mut csv::ByteRecord,
    line: &[u8],
) -> CsvResult<Vec<String>> {
    let quotes = line.iter().filter(|b| **b == b'"').count();
    if quotes % 2 == 1 {
        return Ok(line.split(|b| *b == b',').map(decode_field).collect());
    }

    let mut reader = framing.from_reader(line);
    if !reader.read_byte_record(record)? {
        return Ok(Vec::new());
    }
    Ok(record.iter().map(decode_field).collect())
}

/// UTF-8 when valid, Windows-1252 otherwise. Always trimmed.
fn decode_field(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.trim().to_string(),
        Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Date ,series ,OPEN ,HIGH ,LOW ,PREV. CLOSE ,ltp ,close ,vwap ,52W H ,52W L ,VOLUME ,VALUE ,No of trades";

    #[test]
    fn test_simple_rows() {
        let rows = parse_str("a,b\n1,2\n3,4").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("a"), Some("1"));
        assert_eq!(rows[1].get("b"), Some("4"));
    }

    #[test]
    fn test_header_names_are_trimmed() {
        let csv = format!("{}\n01-Jan-2024,EQ,1,2,3,4,5,6,7,8,9,10,11,12", HEADER);
        let rows = parse_str(&csv).unwrap();

        assert_eq!(rows[0].headers()[5], "PREV. CLOSE");
        assert_eq!(rows[0].get("52W H"), Some("8"));
        assert_eq!(rows[0].get("No of trades"), Some("12"));
    }

    #[test]
    fn test_quoted_values_keep_commas() {
        let csv = "series,VOLUME\n\"EQ\",\"1,23,456\"";
        let rows = parse_str(csv).unwrap();

        assert_eq!(rows[0].get("series"), Some("EQ"));
        assert_eq!(rows[0].get("VOLUME"), Some("1,23,456"));
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let plain = parse_str("a,b\n1,2\n3,4").unwrap();
        let noisy = parse_str("# exported\na,b\n\n1,2\n   # mid-file note\n   \n3,4\n\n").unwrap();

        assert_eq!(plain.len(), noisy.len());
        for (p, n) in plain.iter().zip(noisy.iter()) {
            assert_eq!(p.iter().collect::<Vec<_>>(), n.iter().collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_bom_is_dropped() {
        let with_bom = parse_str("\u{FEFF}Date,OPEN\n01-Jan-2024,10").unwrap();

        assert_eq!(with_bom[0].headers()[0], "Date");
        assert_eq!(with_bom[0].get("Date"), Some("01-Jan-2024"));
    }

    #[test]
    fn test_short_stream_without_bom() {
        let rows = parse_str("a\n1").unwrap();
        assert_eq!(rows[0].get("a"), Some("1"));
        assert!(parse_str("ab").unwrap().is_empty());
    }

    #[test]
    fn test_missing_values_and_extra_columns() {
        let rows = parse_str("a,b,c\n1\n1,2,3,4").unwrap();

        assert_eq!(rows[0].get("a"), Some("1"));
        assert_eq!(rows[0].get("b"), None);
        assert_eq!(rows[1].iter().count(), 3);
    }

    #[test]
    fn test_unbalanced_quote_does_not_abort() {
        let rows = parse_str("a,b\n1,2\n3\"x,4\n5,6").unwrap();

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].get("a"), Some("3\"x"));
        assert_eq!(rows[2].get("b"), Some("6"));
    }

    #[test]
    fn test_indented_comment_with_quote_is_skipped() {
        let plain = parse_str("a,b\n1,2\n3,4\n5,6").unwrap();
        let noisy = parse_str("a,b\n1,2\n  # note,\"see below\n3,4\n5,6").unwrap();

        assert_eq!(noisy.len(), 3);
        for (p, n) in plain.iter().zip(noisy.iter()) {
            assert_eq!(p.iter().collect::<Vec<_>>(), n.iter().collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_open_quote_at_field_start_stays_on_its_line() {
        let rows = parse_str("a,b\n1,2\n\"3,4\n5,6\n7,8").unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[1].get("a"), Some("\"3"));
        assert_eq!(rows[1].get("b"), Some("4"));
        assert_eq!(rows[2].get("a"), Some("5"));
        assert_eq!(rows[3].get("b"), Some("8"));
    }

    #[test]
    fn test_crlf_line_endings() {
        let rows = parse_str("a,b\r\n1,\"2,5\"\r\n\r\n3,4\r\n").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("b"), Some("2,5"));
        assert_eq!(rows[1].get("b"), Some("4"));
    }

    #[test]
    fn test_only_comments_yields_nothing() {
        let mut reader = RecordReader::new("# nothing\n\n".as_bytes()).unwrap();
        assert!(reader.read_headers().unwrap().is_none());
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_latin1_cell_is_decoded() {
        let bytes: &[u8] = b"name\nSoci\xE9t\xE9\n";
        let rows: Vec<RawRow> = RecordReader::new(bytes).unwrap().collect::<CsvResult<_>>().unwrap();
        assert_eq!(rows[0].get("name"), Some("Soci\u{e9}t\u{e9}"));
    }

    #[test]
    fn test_line_numbers_follow_source() {
        let rows = parse_str("# c\na\n\n1\n2").unwrap();
        assert_eq!(rows[0].line(), 4);
        assert_eq!(rows[1].line(), 5);
    }

    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.served {
                return Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "source vanished"));
            }
            self.served = true;
            let data = b"a,b\n1,2\n";
            let n = data.len().min(buf.len());
            buf[..n].copy_from_slice(&data[..n]);
            Ok(n)
        }
    }

    #[test]
    fn test_io_failure_ends_sequence_with_error() {
        let reader = RecordReader::new(FailingReader { served: false }).unwrap();
        let items: Vec<CsvResult<RawRow>> = reader.collect();

        let last = items.last().unwrap();
        assert!(matches!(last, Err(CsvError::Io(_))));
    }
}
