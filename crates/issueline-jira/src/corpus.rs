//! JSONL corpus writer with atomic tmp→rename

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

/// One record per line. Nothing appears at the final path until
/// [`CorpusWriter::finalize`]; dropping the writer leaves only a `.tmp` file
/// that the next run replaces.
pub struct CorpusWriter {
    writer: BufWriter<File>,
    tmp_path: PathBuf,
    final_path: PathBuf,
    record_count: usize,
}

impl std::fmt::Debug for CorpusWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorpusWriter")
            .field("final_path", &self.final_path)
            .field("record_count", &self.record_count)
            .finish_non_exhaustive()
    }
}

impl CorpusWriter {
    pub fn create(final_path: &Path) -> io::Result<Self> {
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut tmp_name = final_path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        // File::create truncates a stale tmp from an interrupted run
        let file = File::create(&tmp_path)?;
        Ok(Self {
            writer: BufWriter::new(file),
            tmp_path,
            final_path: final_path.to_path_buf(),
            record_count: 0,
        })
    }

    pub fn write<T: Serialize>(&mut self, record: &T) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
        self.writer.write_all(b"\n")?;
        self.record_count += 1;
        Ok(())
    }

    /// Flush, fsync and rename into place. Returns the record count.
    pub fn finalize(self) -> io::Result<usize> {
        let record_count = self.record_count;
        let file = self.writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        fs::rename(&self.tmp_path, &self.final_path)?;
        Ok(record_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    #[test]
    fn writes_one_line_per_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jsonl").join("P.jsonl");
        let mut writer = CorpusWriter::create(&path).unwrap();
        writer.write(&json!({"id": "P-1", "text": "a\nb"})).unwrap();
        writer.write(&json!({"id": "P-2"})).unwrap();
        assert!(!path.exists());
        assert_eq!(writer.finalize().unwrap(), 2);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["text"], "a\nb");
        assert!(!dir.path().join("jsonl").join("P.jsonl.tmp").exists());
    }

    #[test]
    fn unfinished_writer_keeps_previous_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("P.jsonl");
        fs::write(&path, "{\"id\":\"old\"}\n").unwrap();
        {
            let mut writer = CorpusWriter::create(&path).unwrap();
            writer.write(&json!({"id": "new"})).unwrap();
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"id\":\"old\"}\n");
    }

    #[test]
    fn non_ascii_kept_verbatim() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("P.jsonl");
        let mut writer = CorpusWriter::create(&path).unwrap();
        writer.write(&json!({"title": "Überprüfung 検証"})).unwrap();
        writer.finalize().unwrap();
        assert!(fs::read_to_string(&path).unwrap().contains("Überprüfung 検証"));
    }
}
