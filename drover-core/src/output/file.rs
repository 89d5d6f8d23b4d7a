//! Append-only file sink.

// Layer 1: Standard library
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

// Layer 2: Third-party
use async_trait::async_trait;

// Layer 3: Internal
use super::{format_block, Accumulator};
use crate::error::EngineError;

/// Appends prefixed output to a text file, flushing per delivery.
#[derive(Debug)]
pub struct FileAccumulator {
    path: PathBuf,
    file: Option<File>,
    count: u64,
}

impl FileAccumulator {
    /// Open (appending) the output file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|error| EngineError::io(path.display().to_string(), error.to_string()))?;
        Ok(Self {
            path,
            file: Some(file),
            count: 0,
        })
    }

    /// Path of the output file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Accumulator for FileAccumulator {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn add(
        &mut self,
        source: &str,
        _output_type: &str,
        data: &str,
    ) -> Result<(), EngineError> {
        let Some(file) = self.file.as_mut() else {
            return Err(EngineError::io(
                self.path.display().to_string(),
                "file log already closed",
            ));
        };
        self.count += 1;

        let block = format_block(source, data);
        file.write_all(block.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|error| EngineError::io(self.path.display().to_string(), error.to_string()))
    }

    fn count(&self) -> u64 {
        self.count
    }

    fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_appends_prefixed_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.log");
        let mut sink = FileAccumulator::open(&path).unwrap();

        sink.add("node-x", "stdout", "a\nb").await.unwrap();
        sink.add("cli", "stdout", "done").await.unwrap();
        sink.close();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "[node-x] a\n[node-x] b\n[cli] done\n");
    }

    #[tokio::test]
    async fn test_close_twice_is_harmless() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.log");
        let mut sink = FileAccumulator::open(&path).unwrap();
        sink.add("cli", "stdout", "once").await.unwrap();

        sink.close();
        sink.close();

        // Output is intact, and late adds fail instead of corrupting it.
        assert!(sink.add("cli", "stdout", "late").await.is_err());
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "[cli] once\n");
    }
}
