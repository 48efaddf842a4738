//! Chunked, schema-aware CSV reading.

use csv_types::{csv_string_to_cell_value, csv_string_to_cell_value_inferred};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use sync_core::{CellValue, ColumnConfig, FieldKind, InputRow, Result, SyncError};
use tracing::{debug, warn};

/// Parse a CSV cell according to the configured field kind.
///
/// Cells that do not parse as their kind fall back to inference, so a bad
/// value still reaches the service, which reports it for the batch.
fn parse_value_with_kind(value: &str, kind: Option<FieldKind>) -> CellValue {
    match kind {
        Some(kind) => match csv_string_to_cell_value(value, kind) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("{e}");
                csv_string_to_cell_value_inferred(value)
            }
        },
        // Unconfigured columns are never written; keep them as text
        None if value.is_empty() => CellValue::Null,
        None => CellValue::String(value.to_string()),
    }
}

/// Reads a CSV input in chunks of typed rows.
pub struct CsvChunkReader<R: Read> {
    reader: csv::Reader<R>,
    headers: Vec<String>,
    kinds: Vec<Option<FieldKind>>,
    chunk_size: usize,
    rows_read: u64,
    source_name: String,
}

impl CsvChunkReader<File> {
    /// Open a CSV file with a header row.
    pub fn open(
        path: &Path,
        columns: &[ColumnConfig],
        delimiter: u8,
        chunk_size: usize,
    ) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            SyncError::Input(format!("Failed to open input table {}: {e}", path.display()))
        })?;
        Self::from_reader(file, &path.display().to_string(), columns, delimiter, chunk_size)
    }
}

impl<R: Read> CsvChunkReader<R> {
    pub fn from_reader(
        reader: R,
        source_name: &str,
        columns: &[ColumnConfig],
        delimiter: u8,
        chunk_size: usize,
    ) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| SyncError::Input(format!("Failed to read CSV headers of {source_name}: {e}")))?
            .iter()
            .map(|h| h.to_string())
            .collect();

        let configured: HashMap<&str, FieldKind> = columns
            .iter()
            .map(|c| (c.source_name.as_str(), c.dtype))
            .collect();
        let kinds = headers
            .iter()
            .map(|h| configured.get(h.as_str()).copied())
            .collect();

        debug!("CSV headers of {source_name}: {headers:?}");

        Ok(Self {
            reader,
            headers,
            kinds,
            chunk_size: chunk_size.max(1),
            rows_read: 0,
            source_name: source_name.to_string(),
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }

    /// Read up to `chunk_size` rows. Returns `None` once the input is exhausted.
    pub fn next_chunk(&mut self) -> Result<Option<Vec<InputRow>>> {
        let mut chunk = Vec::with_capacity(self.chunk_size);
        let mut record = csv::StringRecord::new();

        while chunk.len() < self.chunk_size {
            let more = self.reader.read_record(&mut record).map_err(|e| {
                SyncError::Input(format!("Failed to read CSV record of {}: {e}", self.source_name))
            })?;
            if !more {
                break;
            }

            if record.len() != self.headers.len() {
                return Err(SyncError::Input(format!(
                    "Column count mismatch in CSV row {}: expected {} columns ({}), but found {} columns",
                    self.rows_read + 1,
                    self.headers.len(),
                    self.headers.join(", "),
                    record.len()
                )));
            }

            let mut row = InputRow::new(self.rows_read);
            for ((header, kind), value) in self.headers.iter().zip(&self.kinds).zip(record.iter()) {
                row.insert(header.clone(), parse_value_with_kind(value, *kind));
            }
            chunk.push(row);
            self.rows_read += 1;
        }

        if chunk.is_empty() {
            Ok(None)
        } else {
            Ok(Some(chunk))
        }
    }
}

/// First `*.csv` file (by name) in `dir`.
pub fn find_input_csv(dir: &Path) -> Result<PathBuf> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        SyncError::Input(format!("Failed to list input tables in {}: {e}", dir.display()))
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
        })
        .collect();
    candidates.sort();

    candidates.into_iter().next().ok_or_else(|| {
        SyncError::Input(format!(
            "No input table found in {}. Exactly one CSV input table is expected.",
            dir.display()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &str = "id,name,amount,active\n1,Alice,10.5,true\n2,Bob,,no\n3,Carol,abc,yes\n";

    fn columns() -> Vec<ColumnConfig> {
        vec![
            ColumnConfig::same_name("id", FieldKind::Number).key(),
            ColumnConfig::same_name("name", FieldKind::SingleLineText),
            ColumnConfig::same_name("amount", FieldKind::Currency),
            ColumnConfig::same_name("active", FieldKind::Checkbox),
        ]
    }

    #[test]
    fn test_reads_in_chunks() {
        let mut reader =
            CsvChunkReader::from_reader(DATA.as_bytes(), "test", &columns(), b',', 2).unwrap();
        assert_eq!(reader.headers(), &["id", "name", "amount", "active"]);

        let first = reader.next_chunk().unwrap().unwrap();
        assert_eq!(first.len(), 2);
        let second = reader.next_chunk().unwrap().unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].row_number, 2);
        assert!(reader.next_chunk().unwrap().is_none());
        assert_eq!(reader.rows_read(), 3);
    }

    #[test]
    fn test_cells_parsed_by_kind() {
        let mut reader =
            CsvChunkReader::from_reader(DATA.as_bytes(), "test", &columns(), b',', 10).unwrap();
        let rows = reader.next_chunk().unwrap().unwrap();

        assert_eq!(rows[0].get("id"), Some(&CellValue::Int(1)));
        assert_eq!(rows[0].get("amount"), Some(&CellValue::Float(10.5)));
        assert_eq!(rows[0].get("active"), Some(&CellValue::Bool(true)));
        assert_eq!(rows[1].get("amount"), Some(&CellValue::Null));
        assert_eq!(rows[1].get("active"), Some(&CellValue::Bool(false)));
        // Unparseable numbers fall back to inference
        assert_eq!(rows[2].get("amount"), Some(&CellValue::text("abc")));
    }

    #[test]
    fn test_unconfigured_columns_stay_text() {
        let data = "code,extra\n007,42\n";
        let columns = vec![ColumnConfig::same_name("code", FieldKind::SingleLineText)];
        let mut reader =
            CsvChunkReader::from_reader(data.as_bytes(), "test", &columns, b',', 10).unwrap();
        let rows = reader.next_chunk().unwrap().unwrap();
        assert_eq!(rows[0].get("code"), Some(&CellValue::text("007")));
        assert_eq!(rows[0].get("extra"), Some(&CellValue::text("42")));
    }

    #[test]
    fn test_column_count_mismatch_is_input_error() {
        let data = "a,b\n1,2,3\n";
        let mut reader = CsvChunkReader::from_reader(data.as_bytes(), "test", &[], b',', 10).unwrap();
        let err = reader.next_chunk().unwrap_err();
        assert!(matches!(err, SyncError::Input(_)));
    }

    #[test]
    fn test_semicolon_delimiter() {
        let data = "a;b\nx;y\n";
        let mut reader = CsvChunkReader::from_reader(data.as_bytes(), "test", &[], b';', 10).unwrap();
        let rows = reader.next_chunk().unwrap().unwrap();
        assert_eq!(rows[0].get("b"), Some(&CellValue::text("y")));
    }

    #[test]
    fn test_find_input_csv() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.csv"), "x\n").unwrap();
        std::fs::write(dir.path().join("a.csv"), "x\n").unwrap();
        std::fs::write(dir.path().join("a.csv.manifest"), "{}").unwrap();

        assert_eq!(find_input_csv(dir.path()).unwrap(), dir.path().join("a.csv"));

        let empty = tempfile::tempdir().unwrap();
        assert!(matches!(find_input_csv(empty.path()), Err(SyncError::Input(_))));
    }
}
