//! histoplot-io - Archive I/O for analysis records
//!
//! This crate reads and writes histoplot archives, the binary container
//! format holding the histogram records that histoplot extracts and plots:
//!
//! - **ArchiveNode**: the closed node variant making up an archive tree
//!   (directories, named lists, 1-D and 2-D records)
//! - **read_archive / write_archive**: whole-tree (de)serialization
//! - **SourceExtractor**: enumeration of every addressable record in an
//!   archive and extraction of single records into a normalized numeric form
//!
//! # Design
//!
//! An archive is one serialized node tree per file. Trees are small and
//! read-only, so the extractor keeps every opened tree in memory for the
//! lifetime of the process; repeated fetches never reopen a file.

pub mod archive;
pub mod extract;
pub mod node;
pub mod source;

pub use archive::*;
pub use extract::*;
pub use node::*;
pub use source::*;
