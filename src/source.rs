use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Raw-bytes accessor for one underlying artifact.
pub trait ByteSource: fmt::Debug {
    /// Name used to label what is read, typically the file name.
    fn label(&self) -> &str;

    /// Reads the whole artifact. An empty result is a valid, empty artifact.
    fn read(&self) -> io::Result<Vec<u8>>;
}

#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    label: String,
}

impl FileSource {
    /// Binds to an existing regular file.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let metadata = std::fs::metadata(&path)?;
        if !metadata.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("not a regular file: {}", path.display()),
            ));
        }

        let label = path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());
        Ok(Self { path, label })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ByteSource for FileSource {
    fn label(&self) -> &str {
        &self.label
    }

    fn read(&self) -> io::Result<Vec<u8>> {
        std::fs::read(&self.path)
    }
}

/// Bytes already held in memory, e.g. a stream drained by the caller.
#[derive(Clone)]
pub struct MemorySource {
    label: String,
    bytes: Vec<u8>,
}

impl MemorySource {
    pub fn new(label: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            label: label.into(),
            bytes: bytes.into(),
        }
    }
}

impl fmt::Debug for MemorySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySource")
            .field("label", &self.label)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ByteSource for MemorySource {
    fn label(&self) -> &str {
        &self.label
    }

    fn read(&self) -> io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!(
            "class_workspace_source_{}_{}_{}",
            std::process::id(),
            nanos,
            name
        ))
    }

    #[test]
    fn open_missing_file_fails() {
        let err = FileSource::open(temp_path("missing.class")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn open_directory_fails() {
        let dir = temp_path("dir");
        std::fs::create_dir_all(&dir).unwrap();
        assert!(FileSource::open(&dir).is_err());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn empty_file_reads_as_empty() -> anyhow::Result<()> {
        let path = temp_path("Empty.class");
        std::fs::write(&path, b"")?;
        let source = FileSource::open(&path)?;
        assert!(source.label().ends_with("Empty.class"));
        assert!(source.read()?.is_empty());
        std::fs::remove_file(path)?;
        Ok(())
    }

    #[test]
    fn read_after_removal_fails() -> anyhow::Result<()> {
        let path = temp_path("Gone.class");
        std::fs::write(&path, b"\xCA\xFE\xBA\xBE")?;
        let source = FileSource::open(&path)?;
        std::fs::remove_file(&path)?;
        assert!(source.read().is_err());
        Ok(())
    }
}
