//! Archive (de)serialization and I/O errors
//!
//! One archive file holds one serialized node tree. Files are written by
//! producers (analysis jobs, test fixtures) and read back whole by the
//! extractor.

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::node::ArchiveNode;

/// Errors that can occur while opening or walking archives
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read archive {}: {message}", .path.display())]
    Unreadable { path: PathBuf, message: String },

    #[error("Object {path} not found in {}", .file.display())]
    ObjectNotFound { file: PathBuf, path: String },

    #[error("Cannot descend into non-container node along {path}")]
    NotAContainer { path: String },

    #[error("Object at {path} is not a plottable record")]
    NotARecord { path: String },

    #[error("Cannot handle record {name} with {dimensions} spatial dimensions")]
    Unsupported { name: String, dimensions: u32 },

    #[error("Malformed record {name}: {message}")]
    MalformedRecord { name: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for archive operations
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Read a whole archive tree from a file
pub fn read_archive(path: &Path) -> ArchiveResult<ArchiveNode> {
    if !path.is_file() {
        return Err(ArchiveError::FileNotFound(path.to_path_buf()));
    }
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    bincode::deserialize_from(reader).map_err(|err| ArchiveError::Unreadable {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

/// Write an archive tree to a file, replacing any previous content
pub fn write_archive(path: &Path, root: &ArchiveNode) -> ArchiveResult<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    bincode::serialize_into(writer, root).map_err(|err| ArchiveError::Unreadable {
        path: path.to_path_buf(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Hist1d;

    fn sample_tree() -> ArchiveNode {
        ArchiveNode::directory(
            "run",
            vec![ArchiveNode::Hist1d(
                Hist1d::new("pt", vec![0.0, 1.0, 2.0], vec![5.0, 7.0], vec![1.0, 1.0]).unwrap(),
            )],
        )
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.hpa");

        write_archive(&path, &sample_tree()).unwrap();
        let read_back = read_archive(&path).unwrap();
        assert_eq!(read_back.name(), "run");
        match read_back {
            ArchiveNode::Directory { children, .. } => {
                assert_eq!(children.len(), 1);
                assert_eq!(children[0].name(), "pt");
            }
            _ => panic!("expected directory root"),
        }
    }

    #[test]
    fn test_missing_file() {
        let err = read_archive(Path::new("/nonexistent/run.hpa")).unwrap_err();
        assert!(matches!(err, ArchiveError::FileNotFound(_)));
    }

    #[test]
    fn test_garbage_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_an_archive");
        std::fs::write(&path, b"plain text, no tree").unwrap();

        let err = read_archive(&path).unwrap_err();
        assert!(matches!(err, ArchiveError::Unreadable { .. }));
    }
}
