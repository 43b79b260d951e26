//! Error types for histoplot-core
//!
//! Every fatal condition is a typed error returned to the caller; only the
//! top-level entry point decides whether to abort. Soft conditions (missing
//! optional sources, empty enable lists, records without binning) are logged
//! and degrade to partial results instead.

use std::path::PathBuf;

use thiserror::Error;

use histoplot_io::ArchiveError;

/// Main error type for histoplot operations
#[derive(Debug, Error)]
pub enum Error {
    /// Record construction or shape errors
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    /// Registry errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Figure rendering errors
    #[error("Plot error: {0}")]
    Plot(#[from] PlotError),

    /// Archive reading errors
    #[error("Archive error: {0}")]
    Archive(#[from] ArchiveError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while constructing a normalized record
#[derive(Debug, Error)]
pub enum DataError {
    /// Data is neither a flat table nor a two-axis grid
    #[error("Cannot handle data of shape {shape:?}")]
    InvalidShape { shape: Vec<usize> },

    /// More trailing value columns than any record kind carries
    #[error("Cannot handle data with {got} value columns")]
    TooManyColumns { got: usize },

    /// Uncertainty array does not match the data shape plus a low/high pair
    #[error("Incompatible shapes of data and uncertainties: {expected:?} (expected) vs. {got:?} (given)")]
    UncertaintyShape { expected: Vec<usize>, got: Vec<usize> },

    /// Wrong number of bin-edge sequences for the data dimensionality
    #[error("Bin edges for exactly {expected} axes are required but got {got}")]
    BinEdgeCount { expected: usize, got: usize },

    /// Per-axis edge sequence lengths do not fit the grid shape
    #[error("Data of shape ({nx},{ny}) is incompatible with bin edges of lengths ({got_x},{got_y})")]
    BinEdgeLength {
        nx: usize,
        ny: usize,
        got_x: usize,
        got_y: usize,
    },

    /// Total bin count implied by the edges does not match the row count
    #[error("Given bin edges imply a data length of {expected} but got {got}")]
    BinCount { expected: usize, got: usize },

    /// Internal reshape failure
    #[error("Reshape failed: {0}")]
    Reshape(String),
}

/// Errors raised by the record registry
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Identifier already present and overwriting was not requested
    #[error("Record {0} is already registered, not adding it")]
    Duplicate(String),

    /// Identifier not present
    #[error("Record {0} is not registered")]
    NotFound(String),

    /// Source kind tag the registry cannot dispatch on
    #[error("Cannot digest from source kind {0}")]
    UnknownSourceKind(String),
}

/// Errors raised by configuration handling
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required top-level section missing after a read
    #[error("Cannot find \"{0}\" section in configuration")]
    MissingSection(&'static str),

    /// Configuration document does not parse
    #[error("Invalid configuration: {0}")]
    Parse(String),

    /// Caller passed mismatched source and label lists
    #[error("Need the same number of sources and labels, {sources} vs. {labels}")]
    LabelCount { sources: usize, labels: usize },

    /// Caller passed no source files at all
    #[error("No source files given")]
    NoSources,

    /// I/O errors while reading or writing the document
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while rendering figures
#[derive(Debug, Error)]
pub enum PlotError {
    /// Backend failed to draw or write the figure
    #[error("Failed to draw figure: {0}")]
    Backend(String),

    /// A file sits where the output directory should be created
    #[error("A file is in the way of output directory {}", .0.display())]
    OutputDirObstructed(PathBuf),
}

/// Result type alias for histoplot operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::Duplicate("tracks_pt".to_string());
        assert!(err.to_string().contains("tracks_pt"));

        let err = DataError::UncertaintyShape {
            expected: vec![4, 2, 2],
            got: vec![4, 2],
        };
        assert!(err.to_string().contains("[4, 2, 2]"));
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = RegistryError::NotFound("x".to_string()).into();
        assert!(matches!(err, Error::Registry(_)));
    }
}
