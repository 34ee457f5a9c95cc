//! Row source abstraction for tabular ingestion.
//!
//! A [`RowSource`] hides where rows come from: a delimited file on disk, an
//! in-memory fixture, or any upstream parser honouring the contract. Sources
//! are re-readable: the orchestrator re-opens them between the type-detection
//! prefix pass and the main pass via [`RowSource::reset`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::types::{Cell, ParsedRow};

/// Rows pulled in one await; the batch boundary is the only suspension
/// point, and the cancellation check site, in the main loop.
#[derive(Debug)]
pub struct RowBatch {
    pub rows: Vec<ParsedRow>,
    /// True when the source is exhausted; `rows` may still be non-empty.
    pub eof: bool,
}

/// Where parsed rows come from.
///
/// Implementations handle format parsing internally and deliver trimmed,
/// positional cells. Header rows are delivered like any other row; the
/// orchestrator decides whether to skip the first one.
#[async_trait]
pub trait RowSource: Send + 'static {
    /// Pull up to `max_rows` rows.
    async fn next_batch(&mut self, max_rows: usize) -> Result<RowBatch>;

    /// Whether the first delivered row is a header.
    fn has_header(&self) -> bool;

    /// Re-open the source from the top (the upstream contract is
    /// re-readable files, not arbitrary streams).
    async fn reset(&mut self) -> Result<()>;

    /// Human-readable name for logging (e.g. "csv", "memory").
    fn source_name(&self) -> &str;

    /// Total input size in bytes, when knowable. Drives auto-sampling.
    fn size_hint_bytes(&self) -> Option<u64> {
        None
    }
}

// ============================================================================
// CSV file source
// ============================================================================

/// Delimited UTF-8 text file reader with quoted-field support.
pub struct CsvFileSource {
    path: std::path::PathBuf,
    delimiter: char,
    has_header: bool,
    reader: Option<BufReader<tokio::fs::File>>,
    next_index: u64,
    line_buffer: String,
}

impl CsvFileSource {
    pub async fn open(
        path: impl Into<std::path::PathBuf>,
        delimiter: char,
        has_header: bool,
    ) -> Result<Self> {
        let path = path.into();
        let file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("failed to open {}", path.display()))?;
        Ok(Self {
            path,
            delimiter,
            has_header,
            reader: Some(BufReader::new(file)),
            next_index: 0,
            line_buffer: String::with_capacity(2048),
        })
    }
}

#[async_trait]
impl RowSource for CsvFileSource {
    async fn next_batch(&mut self, max_rows: usize) -> Result<RowBatch> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(RowBatch {
                rows: Vec::new(),
                eof: true,
            });
        };

        let mut rows = Vec::with_capacity(max_rows.min(4096));
        let mut eof = false;
        while rows.len() < max_rows {
            self.line_buffer.clear();
            let bytes = reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                eof = true;
                break;
            }
            let line = self.line_buffer.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                continue;
            }
            let data = split_delimited(line, self.delimiter);
            rows.push(ParsedRow {
                index: self.next_index,
                data,
                raw: None,
            });
            self.next_index += 1;
        }
        Ok(RowBatch { rows, eof })
    }

    fn has_header(&self) -> bool {
        self.has_header
    }

    async fn reset(&mut self) -> Result<()> {
        let file = tokio::fs::File::open(&self.path)
            .await
            .with_context(|| format!("failed to re-open {}", self.path.display()))?;
        self.reader = Some(BufReader::new(file));
        self.next_index = 0;
        Ok(())
    }

    fn source_name(&self) -> &str {
        "csv"
    }

    fn size_hint_bytes(&self) -> Option<u64> {
        std::fs::metadata(&self.path).ok().map(|m| m.len())
    }
}

/// Split one line into trimmed cells, honouring double-quoted fields with
/// doubled-quote escapes. Missing and empty fields become null.
fn split_delimited(line: &str, delimiter: char) -> Vec<Cell> {
    let mut cells = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            } else {
                field.push(c);
            }
        } else if c == '"' && field.trim().is_empty() {
            in_quotes = true;
            field.clear();
        } else if c == delimiter {
            cells.push(Cell::from_raw(&field));
            field.clear();
        } else {
            field.push(c);
        }
    }
    cells.push(Cell::from_raw(&field));
    cells
}

// ============================================================================
// In-memory source (tests, embedding)
// ============================================================================

/// Replays pre-built rows; reset rewinds to the start.
pub struct MemorySource {
    rows: Vec<ParsedRow>,
    cursor: usize,
    has_header: bool,
}

impl MemorySource {
    pub fn new(rows: Vec<ParsedRow>, has_header: bool) -> Self {
        Self {
            rows,
            cursor: 0,
            has_header,
        }
    }

    /// Build from raw delimited text, one row per non-empty line.
    pub fn from_text(text: &str, delimiter: char, has_header: bool) -> Self {
        let rows = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .enumerate()
            .map(|(i, line)| ParsedRow {
                index: i as u64,
                data: split_delimited(line, delimiter),
                raw: Some(line.to_string()),
            })
            .collect();
        Self::new(rows, has_header)
    }
}

#[async_trait]
impl RowSource for MemorySource {
    async fn next_batch(&mut self, max_rows: usize) -> Result<RowBatch> {
        let end = (self.cursor + max_rows).min(self.rows.len());
        let rows = self.rows[self.cursor..end].to_vec();
        self.cursor = end;
        Ok(RowBatch {
            rows,
            eof: self.cursor >= self.rows.len(),
        })
    }

    fn has_header(&self) -> bool {
        self.has_header
    }

    async fn reset(&mut self) -> Result<()> {
        self.cursor = 0;
        Ok(())
    }

    fn source_name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_handles_quotes_and_empties() {
        let cells = split_delimited(r#"a,"b,c",,"say ""hi""",  d  "#, ',');
        assert_eq!(cells[0], Cell::Text("a".to_string()));
        assert_eq!(cells[1], Cell::Text("b,c".to_string()));
        assert_eq!(cells[2], Cell::Null);
        assert_eq!(cells[3], Cell::Text(r#"say "hi""#.to_string()));
        assert_eq!(cells[4], Cell::Text("d".to_string()));
    }

    #[test]
    fn split_respects_alternate_delimiters() {
        let cells = split_delimited("1;2;3", ';');
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[2], Cell::Text("3".to_string()));
    }

    #[tokio::test]
    async fn memory_source_batches_and_resets() {
        let mut source = MemorySource::from_text("a,b\n1,2\n3,4\n", ',', true);
        let batch = source.next_batch(2).await.unwrap();
        assert_eq!(batch.rows.len(), 2);
        assert!(!batch.eof);
        let batch = source.next_batch(10).await.unwrap();
        assert_eq!(batch.rows.len(), 1);
        assert!(batch.eof);

        source.reset().await.unwrap();
        let batch = source.next_batch(10).await.unwrap();
        assert_eq!(batch.rows.len(), 3);
        assert_eq!(batch.rows[0].data[0], Cell::Text("a".to_string()));
    }

    #[tokio::test]
    async fn csv_file_source_roundtrip() {
        use std::io::Write;
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "x,y").unwrap();
        writeln!(tmp, "1,2").unwrap();
        writeln!(tmp, "3,").unwrap();
        tmp.flush().unwrap();

        let mut source = CsvFileSource::open(tmp.path(), ',', true).await.unwrap();
        assert!(source.size_hint_bytes().unwrap() > 0);
        let batch = source.next_batch(100).await.unwrap();
        assert_eq!(batch.rows.len(), 3);
        assert_eq!(batch.rows[2].data[1], Cell::Null);

        source.reset().await.unwrap();
        let batch = source.next_batch(1).await.unwrap();
        assert_eq!(batch.rows[0].data[0], Cell::Text("x".to_string()));
    }
}
