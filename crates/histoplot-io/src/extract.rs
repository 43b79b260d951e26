//! Record enumeration and extraction
//!
//! The extractor walks archive trees two ways:
//!
//! - `enumerate` visits every node reachable from the root and lists each
//!   1-D or 2-D record as a source descriptor with a path-derived identifier
//! - `fetch` resolves one `/`-separated path to its leaf record and converts
//!   it to the normalized numeric form (flat data rows, uncertainty pairs,
//!   per-axis bin edges, axis labels)
//!
//! Opened trees are cached per file path for the lifetime of the extractor;
//! fetches are idempotent regardless of cache state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ndarray::{Array2, Array3, Array4, ArrayD};
use tracing::{debug, warn};

use crate::archive::{read_archive, ArchiveError, ArchiveResult};
use crate::node::{bin_centers, ArchiveNode, Hist1d, Hist2d};
use crate::source::SourceDescriptor;

/// One record in normalized numeric form
///
/// `data` has shape (N, 2) for 1-D records and (Nx, Ny, 3) for 2-D records;
/// `uncertainties` carries a low/high pair per data entry, so its shape is
/// always `data.shape() + (2,)`.
#[derive(Debug, Clone)]
pub struct ExtractedRecord {
    pub data: ArrayD<f64>,
    pub uncertainties: ArrayD<f64>,
    pub bin_edges: Option<Vec<Vec<f64>>>,
    pub axis_labels: Vec<String>,
}

/// Walks archives, caching each opened tree for the process lifetime
#[derive(Default)]
pub struct SourceExtractor {
    archives: HashMap<PathBuf, Arc<ArchiveNode>>,
}

impl SourceExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of archives currently held open
    pub fn open_archives(&self) -> usize {
        self.archives.len()
    }

    fn open(&mut self, filepath: &Path) -> ArchiveResult<Arc<ArchiveNode>> {
        if let Some(root) = self.archives.get(filepath) {
            return Ok(Arc::clone(root));
        }
        let root = Arc::new(read_archive(filepath)?);
        self.archives.insert(filepath.to_path_buf(), Arc::clone(&root));
        Ok(root)
    }

    /// List every 1-D or 2-D record reachable from the archive root
    ///
    /// Returns `None` when the file cannot be opened as an archive; the
    /// caller treats that as "no sources here". The root's own name is not
    /// part of the generated paths.
    pub fn enumerate(&mut self, filepath: &Path) -> Option<Vec<SourceDescriptor>> {
        let root = match self.open(filepath) {
            Ok(root) => root,
            Err(err) => {
                debug!("cannot open {} as an archive: {err}", filepath.display());
                return None;
            }
        };

        let mut paths = Vec::new();
        collect_record_paths(&root, "", true, &mut paths);

        Some(
            paths
                .into_iter()
                .map(|path| SourceDescriptor::archive(filepath, path))
                .collect(),
        )
    }

    /// Resolve one object path and convert the leaf record
    ///
    /// With `wait_for_source` set, a missing file or missing object yields
    /// `Ok(None)` so the caller can retry later; otherwise both are errors.
    pub fn fetch(
        &mut self,
        filepath: &Path,
        object_path: &str,
        wait_for_source: bool,
    ) -> ArchiveResult<Option<ExtractedRecord>> {
        let root = match self.open(filepath) {
            Ok(root) => root,
            Err(err) if wait_for_source => {
                warn!("archive not readable yet, will retry: {err}");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let node = match resolve(&root, filepath, object_path) {
            Ok(node) => node,
            Err(err @ ArchiveError::ObjectNotFound { .. }) if wait_for_source => {
                warn!("object not available yet, will retry: {err}");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        match node {
            ArchiveNode::Hist1d(h) => Ok(Some(convert_1d(h))),
            ArchiveNode::Hist2d(h) => Ok(Some(convert_2d(h))),
            ArchiveNode::Unsupported { name, dimensions } => Err(ArchiveError::Unsupported {
                name: name.clone(),
                dimensions: *dimensions,
            }),
            ArchiveNode::Directory { .. } | ArchiveNode::List { .. } => {
                Err(ArchiveError::NotARecord {
                    path: object_path.to_string(),
                })
            }
        }
    }

    /// Drop every cached tree, forcing the next access to reopen its file
    ///
    /// Used by the monitor loop so that archives rewritten on disk are
    /// picked up on the next cycle.
    pub fn invalidate(&mut self) {
        self.archives.clear();
    }
}

fn resolve<'a>(
    root: &'a ArchiveNode,
    file: &Path,
    object_path: &str,
) -> ArchiveResult<&'a ArchiveNode> {
    let mut node = root;
    for segment in object_path.split('/') {
        let children = match node {
            ArchiveNode::Directory { children, .. } => children.as_slice(),
            ArchiveNode::List { items, .. } => items.as_slice(),
            _ => {
                return Err(ArchiveError::NotAContainer {
                    path: object_path.to_string(),
                })
            }
        };
        node = children
            .iter()
            .find(|child| child.name() == segment)
            .ok_or_else(|| ArchiveError::ObjectNotFound {
                file: file.to_path_buf(),
                path: object_path.to_string(),
            })?;
    }
    Ok(node)
}

fn collect_record_paths(node: &ArchiveNode, parent: &str, is_root: bool, out: &mut Vec<String>) {
    let path = if is_root {
        String::new()
    } else if parent.is_empty() {
        node.name().to_string()
    } else {
        format!("{parent}/{}", node.name())
    };

    match node {
        ArchiveNode::Directory { children, .. } => {
            for child in children {
                collect_record_paths(child, &path, false, out);
            }
        }
        ArchiveNode::List { items, .. } => {
            for item in items {
                collect_record_paths(item, &path, false, out);
            }
        }
        ArchiveNode::Hist1d(_) | ArchiveNode::Hist2d(_) => out.push(path),
        // not something we can plot, skip silently
        ArchiveNode::Unsupported { .. } => {}
    }
}

/// Convert a 1-D record: N rows of (bin center, content), symmetric error
/// pairs on the value column, N+1 edges
fn convert_1d(hist: &Hist1d) -> ExtractedRecord {
    let n_bins = hist.n_bins();
    let centers = bin_centers(&hist.bin_edges);

    let mut data = Array2::<f64>::zeros((n_bins, 2));
    let mut uncertainties = Array3::<f64>::zeros((n_bins, 2, 2));
    for i in 0..n_bins {
        data[[i, 0]] = centers[i];
        data[[i, 1]] = hist.contents[i];
        uncertainties[[i, 1, 0]] = hist.errors[i];
        uncertainties[[i, 1, 1]] = hist.errors[i];
    }

    ExtractedRecord {
        data: data.into_dyn(),
        uncertainties: uncertainties.into_dyn(),
        bin_edges: Some(vec![hist.bin_edges.clone()]),
        axis_labels: vec![hist.x_title.clone(), hist.y_title.clone()],
    }
}

/// Convert a 2-D record: Nx x Ny rows of (center-x, center-y, content),
/// symmetric error pairs on the value column, one edge sequence per axis
fn convert_2d(hist: &Hist2d) -> ExtractedRecord {
    let (n_x, n_y) = hist.shape();
    let centers_x = bin_centers(&hist.x_edges);
    let centers_y = bin_centers(&hist.y_edges);

    let mut data = Array3::<f64>::zeros((n_x, n_y, 3));
    let mut uncertainties = Array4::<f64>::zeros((n_x, n_y, 3, 2));
    for i in 0..n_x {
        for j in 0..n_y {
            let content = hist.contents[i * n_y + j];
            let error = hist.errors[i * n_y + j];
            data[[i, j, 0]] = centers_x[i];
            data[[i, j, 1]] = centers_y[j];
            data[[i, j, 2]] = content;
            uncertainties[[i, j, 2, 0]] = error;
            uncertainties[[i, j, 2, 1]] = error;
        }
    }

    ExtractedRecord {
        data: data.into_dyn(),
        uncertainties: uncertainties.into_dyn(),
        bin_edges: Some(vec![hist.x_edges.clone(), hist.y_edges.clone()]),
        axis_labels: vec![hist.x_title.clone(), hist.y_title.clone()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::write_archive;

    fn hist(name: &str) -> ArchiveNode {
        ArchiveNode::Hist1d(
            Hist1d::new(
                name,
                vec![0.0, 1.0, 2.0, 3.0],
                vec![4.0, 5.0, 6.0],
                vec![2.0, 2.2, 2.4],
            )
            .unwrap()
            .with_axis_titles("p_T", "counts"),
        )
    }

    fn sample_tree() -> ArchiveNode {
        ArchiveNode::directory(
            "results",
            vec![
                ArchiveNode::directory("tracks", vec![hist("pt"), hist("eta")]),
                ArchiveNode::list("qa", vec![hist("chi2")]),
                ArchiveNode::Unsupported {
                    name: "corr3d".to_string(),
                    dimensions: 3,
                },
            ],
        )
    }

    fn write_sample(dir: &tempfile::TempDir) -> PathBuf {
        let path = dir.path().join("results.hpa");
        write_archive(&path, &sample_tree()).unwrap();
        path
    }

    #[test]
    fn test_enumerate_paths_skip_root_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir);

        let mut extractor = SourceExtractor::new();
        let sources = extractor.enumerate(&path).unwrap();

        let identifiers: Vec<&str> = sources.iter().map(|s| s.identifier.as_str()).collect();
        assert_eq!(identifiers, vec!["tracks_pt", "tracks_eta", "qa_chi2"]);
        assert!(sources.iter().all(|s| s.source_name == "archive"));
        assert_eq!(sources[0].object_path, "tracks/pt");
    }

    #[test]
    fn test_enumerate_unreadable_is_none() {
        let mut extractor = SourceExtractor::new();
        assert!(extractor.enumerate(Path::new("/no/such/file.hpa")).is_none());
    }

    #[test]
    fn test_fetch_1d_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir);

        let mut extractor = SourceExtractor::new();
        let record = extractor.fetch(&path, "tracks/pt", false).unwrap().unwrap();

        assert_eq!(record.data.shape(), &[3, 2]);
        assert_eq!(record.uncertainties.shape(), &[3, 2, 2]);
        assert_eq!(record.data[[0, 0]], 0.5);
        assert_eq!(record.data[[2, 0]], 2.5);
        assert_eq!(record.data[[1, 1]], 5.0);
        // symmetric errors attach to the value column only
        assert_eq!(record.uncertainties[[1, 1, 0]], 2.2);
        assert_eq!(record.uncertainties[[1, 1, 1]], 2.2);
        assert_eq!(record.uncertainties[[1, 0, 0]], 0.0);

        let edges = record.bin_edges.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].len(), 4);
        assert_eq!(record.axis_labels, vec!["p_T", "counts"]);
    }

    #[test]
    fn test_fetch_2d_conversion() {
        let dir = tempfile::tempdir().unwrap();
        let tree = ArchiveNode::directory(
            "results",
            vec![ArchiveNode::Hist2d(
                Hist2d::new(
                    "map",
                    vec![0.0, 1.0, 2.0],
                    vec![0.0, 10.0, 20.0, 30.0],
                    (0..6).map(f64::from).collect(),
                    vec![0.5; 6],
                )
                .unwrap(),
            )],
        );
        let path = dir.path().join("map.hpa");
        write_archive(&path, &tree).unwrap();

        let mut extractor = SourceExtractor::new();
        let record = extractor.fetch(&path, "map", false).unwrap().unwrap();

        assert_eq!(record.data.shape(), &[2, 3, 3]);
        assert_eq!(record.uncertainties.shape(), &[2, 3, 3, 2]);
        // row-major contents: bin (1, 2) holds 1 * 3 + 2 = 5
        assert_eq!(record.data[[1, 2, 2]], 5.0);
        assert_eq!(record.data[[1, 2, 0]], 1.5);
        assert_eq!(record.data[[1, 2, 1]], 25.0);
        assert_eq!(record.uncertainties[[0, 0, 2, 1]], 0.5);

        let edges = record.bin_edges.unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!((edges[0].len(), edges[1].len()), (3, 4));
    }

    #[test]
    fn test_fetch_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir);

        let mut extractor = SourceExtractor::new();
        let err = extractor.fetch(&path, "tracks/phi", false).unwrap_err();
        assert!(matches!(err, ArchiveError::ObjectNotFound { .. }));

        // soft null when the caller is prepared to wait
        assert!(extractor.fetch(&path, "tracks/phi", true).unwrap().is_none());
    }

    #[test]
    fn test_fetch_missing_file_waits() {
        let mut extractor = SourceExtractor::new();
        let missing = Path::new("/no/such/file.hpa");

        assert!(extractor.fetch(missing, "tracks/pt", false).is_err());
        assert!(extractor.fetch(missing, "tracks/pt", true).unwrap().is_none());
    }

    #[test]
    fn test_fetch_unsupported_record_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir);

        let mut extractor = SourceExtractor::new();
        let err = extractor.fetch(&path, "corr3d", true).unwrap_err();
        assert!(matches!(err, ArchiveError::Unsupported { dimensions: 3, .. }));
    }

    #[test]
    fn test_fetch_through_list_node() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir);

        let mut extractor = SourceExtractor::new();
        let record = extractor.fetch(&path, "qa/chi2", false).unwrap().unwrap();
        assert_eq!(record.data.shape(), &[3, 2]);
    }

    #[test]
    fn test_repeated_fetches_hit_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_sample(&dir);

        let mut extractor = SourceExtractor::new();
        let first = extractor.fetch(&path, "tracks/pt", false).unwrap().unwrap();
        let second = extractor.fetch(&path, "tracks/pt", false).unwrap().unwrap();
        assert_eq!(extractor.open_archives(), 1);
        assert_eq!(first.data, second.data);
    }
}
