//! Source descriptors
//!
//! A source descriptor names where one record comes from: the source kind,
//! the archive file, the path of the object inside it, and the identifier
//! the record will be registered under. Descriptors are produced by
//! enumeration and persisted in the plot configuration, so unknown keys
//! written by other tools survive a read/write round trip.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The one source kind this crate reads
pub const SOURCE_KIND_ARCHIVE: &str = "archive";

/// Configuration entry naming where one record comes from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Source kind tag (see [`SOURCE_KIND_ARCHIVE`])
    pub source_name: String,

    /// Registry identifier, derived from the object path
    pub identifier: String,

    /// Archive file holding the record
    pub filepath: PathBuf,

    /// `/`-separated path of the record inside the archive
    pub object_path: String,

    /// Display label attached to the extracted record
    #[serde(default)]
    pub label: String,

    /// Keys written by other tools, preserved verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SourceDescriptor {
    /// Descriptor for a record inside an archive file
    pub fn archive(filepath: impl Into<PathBuf>, object_path: impl Into<String>) -> Self {
        let object_path = object_path.into();
        Self {
            source_name: SOURCE_KIND_ARCHIVE.to_string(),
            identifier: identifier_for(&object_path),
            filepath: filepath.into(),
            object_path,
            label: String::new(),
            extra: serde_json::Map::new(),
        }
    }

    /// Set the display label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// Derive the registry identifier from an object path
pub fn identifier_for(object_path: &str) -> String {
    object_path.replace('/', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_from_path() {
        assert_eq!(identifier_for("dir/sub/pt"), "dir_sub_pt");
        assert_eq!(identifier_for("pt"), "pt");
    }

    #[test]
    fn test_extra_keys_survive_round_trip() {
        let json = r##"{
            "source_name": "archive",
            "identifier": "dir_pt",
            "filepath": "run.hpa",
            "object_path": "dir/pt",
            "label": "data",
            "color": "#aa0000"
        }"##;
        let descriptor: SourceDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.extra["color"], "#aa0000");

        let back = serde_json::to_value(&descriptor).unwrap();
        assert_eq!(back["color"], "#aa0000");
        assert_eq!(back["identifier"], "dir_pt");
    }
}
