//! Artifact writers for catalogx.
//!
//! Every artifact is written atomically: the content goes to a temp file next
//! to the destination, which is then renamed into place. A destination held
//! open by another program surfaces as [`CatalogError::Locked`] and leaves the
//! previous file untouched.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use catalogx_shared::{CatalogError, OutputTable, Result};

/// Metadata for a single artifact file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMeta {
    pub filename: String,
    pub sha256: String,
    pub size_bytes: usize,
}

/// Summary written next to the ingest documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSummary {
    pub document_count: usize,
    pub column_count: usize,
    pub source: String,
    pub artifacts: Vec<ArtifactMeta>,
    pub completed_at: DateTime<Utc>,
}

impl IngestSummary {
    /// A summary stamped with the current UTC time.
    pub fn new(
        document_count: usize,
        column_count: usize,
        source: impl Into<String>,
        artifacts: Vec<ArtifactMeta>,
    ) -> Self {
        Self {
            document_count,
            column_count,
            source: source.into(),
            artifacts,
            completed_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Atomic writes
// ---------------------------------------------------------------------------

/// Hex-encoded SHA-256 of `content`.
pub fn sha256_hex(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

impl ArtifactMeta {
    /// Metadata `content` will have once written to `path`.
    pub fn for_content(path: &Path, content: &[u8]) -> Result<Self> {
        let filename = path.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
            CatalogError::validation(format!("not a file path: {}", path.display()))
        })?;
        Ok(Self {
            filename: filename.to_string(),
            sha256: sha256_hex(content),
            size_bytes: content.len(),
        })
    }
}

/// Write `content` to `path` via a temp file and rename.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<ArtifactMeta> {
    let meta = ArtifactMeta::for_content(path, content)?;

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    if let Some(dir) = dir {
        std::fs::create_dir_all(dir).map_err(|e| CatalogError::write_io(dir, e))?;
    }

    let temp = path.with_file_name(format!(".{}.tmp", meta.filename));
    std::fs::write(&temp, content).map_err(|e| CatalogError::write_io(path, e))?;

    if let Err(e) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(CatalogError::write_io(path, e));
    }

    debug!(file = %meta.filename, size = content.len(), "wrote artifact");
    Ok(meta)
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Encode a table as CSV with a header row. Null cells become empty fields.
pub fn encode_catalog_csv(table: &OutputTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&table.columns)
        .map_err(|e| CatalogError::Csv(e.to_string()))?;
    for row in &table.rows {
        writer
            .write_record(row.iter().map(|cell| cell.as_deref().unwrap_or_default()))
            .map_err(|e| CatalogError::Csv(e.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| CatalogError::Csv(e.to_string()))
}

/// Write the catalog table as CSV.
#[instrument(skip_all, fields(path = %path.display(), rows = table.len()))]
pub fn write_catalog_csv(path: &Path, table: &OutputTable) -> Result<ArtifactMeta> {
    let content = encode_catalog_csv(table)?;
    write_atomic(path, &content)
}

/// Read a catalog table back from CSV. Empty fields read as null.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn read_catalog_csv(path: &Path) -> Result<OutputTable> {
    let file = std::fs::File::open(path).map_err(|e| CatalogError::io(path, e))?;
    let mut reader = csv::Reader::from_reader(file);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| CatalogError::Csv(format!("{}: {e}", path.display())))?
        .iter()
        .map(String::from)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| CatalogError::Csv(format!("{}: {e}", path.display())))?;
        rows.push(
            record
                .iter()
                .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
                .collect(),
        );
    }

    debug!(columns = columns.len(), rows = rows.len(), "read catalog table");
    Ok(OutputTable { columns, rows })
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

fn json_error(e: serde_json::Error) -> CatalogError {
    CatalogError::validation(format!("JSON serialization failed: {e}"))
}

/// Encode one compact JSON object per line.
pub fn encode_jsonl<T: Serialize>(items: &[T]) -> Result<Vec<u8>> {
    let mut content = Vec::new();
    for item in items {
        serde_json::to_writer(&mut content, item).map_err(json_error)?;
        content.push(b'\n');
    }
    Ok(content)
}

/// Encode pretty-printed JSON.
pub fn encode_json<T: Serialize>(data: &T) -> Result<Vec<u8>> {
    serde_json::to_vec_pretty(data).map_err(json_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "catalogx-artifacts-test-{}",
            uuid::Uuid::now_v7()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn sample_table() -> OutputTable {
        OutputTable {
            columns: vec![
                "page".into(),
                "Portata".into(),
                "Portata unit".into(),
                "Note".into(),
            ],
            rows: vec![
                vec![Some("1".into()), Some("120".into()), Some("m3/h".into()), None],
                vec![Some("2".into()), None, None, Some("a, \"b\"".into())],
            ],
        }
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let tmp = temp_dir();
        let path = tmp.join("out.txt");

        let meta = write_atomic(&path, b"hello").expect("write");
        assert_eq!(meta.filename, "out.txt");
        assert_eq!(meta.size_bytes, 5);
        assert_eq!(meta.sha256.len(), 64);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
        assert!(!tmp.join(".out.txt.tmp").exists());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn atomic_write_replaces_existing_file() {
        let tmp = temp_dir();
        let path = tmp.join("nested").join("out.txt");

        write_atomic(&path, b"first").expect("first write");
        let meta = write_atomic(&path, b"second").expect("second write");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert_eq!(meta.sha256, sha256_hex(b"second"));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn csv_writes_header_and_empty_nulls() {
        let content = encode_catalog_csv(&sample_table()).expect("encode");
        let text = String::from_utf8(content).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("page,Portata,Portata unit,Note"));
        assert_eq!(lines.next(), Some("1,120,m3/h,"));
        assert_eq!(lines.next(), Some("2,,,\"a, \"\"b\"\"\""));
    }

    #[test]
    fn csv_reads_back_written_table() {
        let tmp = temp_dir();
        let path = tmp.join("catalog.csv");
        let table = sample_table();

        write_catalog_csv(&path, &table).expect("write");
        let read = read_catalog_csv(&path).expect("read");
        assert_eq!(read, table);

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ragged_csv_is_rejected() {
        let tmp = temp_dir();
        let path = tmp.join("bad.csv");
        std::fs::write(&path, "a,b\n1,2,3\n").unwrap();

        let err = read_catalog_csv(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Csv(_)));

        let err = read_catalog_csv(&tmp.join("missing.csv")).unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn jsonl_writes_one_object_per_line() {
        let tmp = temp_dir();
        let path = tmp.join("docs.jsonl");
        let items = vec![serde_json::json!({"a": 1}), serde_json::json!({"b": "x"})];

        write_atomic(&path, &encode_jsonl(&items).expect("encode")).expect("write");
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"a\":1}\n{\"b\":\"x\"}\n");

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn meta_for_content_matches_written_file() {
        let tmp = temp_dir();
        let path = tmp.join("docs.jsonl");
        let content = encode_jsonl(&[serde_json::json!({"a": 1})]).expect("encode");

        let planned = ArtifactMeta::for_content(&path, &content).expect("meta");
        let written = write_atomic(&path, &content).expect("write");
        assert_eq!(planned, written);
        assert_eq!(std::fs::read(&path).unwrap(), content);

        assert!(ArtifactMeta::for_content(Path::new("/"), b"x").is_err());

        let _ = std::fs::remove_dir_all(&tmp);
    }

    #[test]
    fn summary_serializes_with_timestamp() {
        let tmp = temp_dir();
        let path = tmp.join("ingest_metadata.json");
        let summary = IngestSummary::new(2, 4, "catalog.csv", vec![]);

        write_atomic(&path, &encode_json(&summary).expect("encode")).expect("write");
        let parsed: IngestSummary =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.document_count, 2);
        assert_eq!(parsed.column_count, 4);

        let _ = std::fs::remove_dir_all(&tmp);
    }
}
