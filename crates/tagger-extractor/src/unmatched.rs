//! Sinks for unmatched entity candidates
//!
//! Capitalized runs the vocabularies did not know are worth reviewing as
//! vocabulary additions. [`TracingUnmatchedSink`] logs them,
//! [`FileUnmatchedSink`] appends them to a review file.

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tagger_core::{Result, TaggerError, UnmatchedSink};

/// Logs each candidate under the `tagger::unmatched` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingUnmatchedSink;

impl UnmatchedSink for TracingUnmatchedSink {
    fn record(&self, unmatched: &BTreeSet<String>) -> Result<()> {
        for candidate in unmatched {
            tracing::info!(target: "tagger::unmatched", candidate = %candidate, "Unmatched candidate");
        }
        Ok(())
    }
}

/// Appends candidates to a file, one per line
#[derive(Debug)]
pub struct FileUnmatchedSink {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileUnmatchedSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl UnmatchedSink for FileUnmatchedSink {
    fn record(&self, unmatched: &BTreeSet<String>) -> Result<()> {
        let failed = |e: std::io::Error| {
            TaggerError::UnmatchedLog(format!("{}: {}", self.path.display(), e))
        };

        let _guard = self
            .lock
            .lock()
            .map_err(|_| TaggerError::UnmatchedLog("sink lock poisoned".to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(failed)?;

        let mut lines = String::new();
        for candidate in unmatched {
            lines.push_str(candidate);
            lines.push('\n');
        }
        file.write_all(lines.as_bytes()).map_err(failed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_tracing_sink_accepts_everything() {
        assert!(TracingUnmatchedSink
            .record(&candidates(&["ole hansen"]))
            .is_ok());
    }

    #[test]
    fn test_file_sink_appends() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileUnmatchedSink::new(dir.path().join("unmatched.txt"));

        sink.record(&candidates(&["ole hansen", "ludwig van beethoven"]))
            .unwrap();
        sink.record(&candidates(&["mette frederiksen"])).unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(
            content,
            "ludwig van beethoven\nole hansen\nmette frederiksen\n"
        );
    }

    #[test]
    fn test_file_sink_reports_io_errors() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileUnmatchedSink::new(dir.path().join("missing").join("unmatched.txt"));
        assert!(matches!(
            sink.record(&candidates(&["ole hansen"])),
            Err(TaggerError::UnmatchedLog(_))
        ));
    }
}
