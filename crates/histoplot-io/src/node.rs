//! Archive node tree
//!
//! An archive is a tree of named nodes. Inner nodes are either directories
//! or named lists; leaves are binned numeric records. Higher-dimensional
//! records survive in the tree as `Unsupported` so that traversal stays
//! total, but they are never enumerated and cannot be extracted.

use serde::{Deserialize, Serialize};

use crate::archive::{ArchiveError, ArchiveResult};

/// One node of an archive tree
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ArchiveNode {
    /// Directory-like node, visited by iterating its named children
    Directory {
        name: String,
        children: Vec<ArchiveNode>,
    },

    /// List-like node, visited by iterating its elements by their own names
    List { name: String, items: Vec<ArchiveNode> },

    /// 1-D binned record
    Hist1d(Hist1d),

    /// 2-D binned record
    Hist2d(Hist2d),

    /// Record with more spatial dimensions than histoplot handles
    Unsupported { name: String, dimensions: u32 },
}

impl ArchiveNode {
    /// The node's own name
    pub fn name(&self) -> &str {
        match self {
            ArchiveNode::Directory { name, .. } => name,
            ArchiveNode::List { name, .. } => name,
            ArchiveNode::Hist1d(h) => &h.name,
            ArchiveNode::Hist2d(h) => &h.name,
            ArchiveNode::Unsupported { name, .. } => name,
        }
    }

    /// Shorthand for a directory node
    pub fn directory(name: impl Into<String>, children: Vec<ArchiveNode>) -> Self {
        ArchiveNode::Directory {
            name: name.into(),
            children,
        }
    }

    /// Shorthand for a named-list node
    pub fn list(name: impl Into<String>, items: Vec<ArchiveNode>) -> Self {
        ArchiveNode::List {
            name: name.into(),
            items,
        }
    }
}

/// A 1-D binned record: N bins with N+1 edges, one content and one
/// symmetric error per bin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hist1d {
    pub name: String,
    pub bin_edges: Vec<f64>,
    pub contents: Vec<f64>,
    pub errors: Vec<f64>,
    pub x_title: String,
    pub y_title: String,
}

impl Hist1d {
    pub fn new(
        name: impl Into<String>,
        bin_edges: Vec<f64>,
        contents: Vec<f64>,
        errors: Vec<f64>,
    ) -> ArchiveResult<Self> {
        let name = name.into();
        if bin_edges.len() != contents.len() + 1 {
            return Err(ArchiveError::MalformedRecord {
                name,
                message: format!(
                    "{} bins need {} edges, got {}",
                    contents.len(),
                    contents.len() + 1,
                    bin_edges.len()
                ),
            });
        }
        if errors.len() != contents.len() {
            return Err(ArchiveError::MalformedRecord {
                name,
                message: format!(
                    "{} bins but {} errors",
                    contents.len(),
                    errors.len()
                ),
            });
        }
        Ok(Self {
            name,
            bin_edges,
            contents,
            errors,
            x_title: String::new(),
            y_title: String::new(),
        })
    }

    /// Set the axis titles
    pub fn with_axis_titles(mut self, x_title: impl Into<String>, y_title: impl Into<String>) -> Self {
        self.x_title = x_title.into();
        self.y_title = y_title.into();
        self
    }

    /// Number of bins
    pub fn n_bins(&self) -> usize {
        self.contents.len()
    }
}

/// A 2-D binned record: Nx*Ny bins stored row-major (x-major), with per-axis
/// edge sequences and one content and symmetric error per bin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hist2d {
    pub name: String,
    pub x_edges: Vec<f64>,
    pub y_edges: Vec<f64>,
    pub contents: Vec<f64>,
    pub errors: Vec<f64>,
    pub x_title: String,
    pub y_title: String,
}

impl Hist2d {
    pub fn new(
        name: impl Into<String>,
        x_edges: Vec<f64>,
        y_edges: Vec<f64>,
        contents: Vec<f64>,
        errors: Vec<f64>,
    ) -> ArchiveResult<Self> {
        let name = name.into();
        if x_edges.len() < 2 || y_edges.len() < 2 {
            return Err(ArchiveError::MalformedRecord {
                name,
                message: "need at least one bin per axis".to_string(),
            });
        }
        let n_bins = (x_edges.len() - 1) * (y_edges.len() - 1);
        if contents.len() != n_bins {
            return Err(ArchiveError::MalformedRecord {
                name,
                message: format!(
                    "({},{}) bins need {} contents, got {}",
                    x_edges.len() - 1,
                    y_edges.len() - 1,
                    n_bins,
                    contents.len()
                ),
            });
        }
        if errors.len() != n_bins {
            return Err(ArchiveError::MalformedRecord {
                name,
                message: format!("{} bins but {} errors", n_bins, errors.len()),
            });
        }
        Ok(Self {
            name,
            x_edges,
            y_edges,
            contents,
            errors,
            x_title: String::new(),
            y_title: String::new(),
        })
    }

    /// Set the axis titles
    pub fn with_axis_titles(mut self, x_title: impl Into<String>, y_title: impl Into<String>) -> Self {
        self.x_title = x_title.into();
        self.y_title = y_title.into();
        self
    }

    /// Bin counts per axis
    pub fn shape(&self) -> (usize, usize) {
        (self.x_edges.len() - 1, self.y_edges.len() - 1)
    }
}

/// Midpoints of adjacent edges
pub fn bin_centers(edges: &[f64]) -> Vec<f64> {
    edges
        .windows(2)
        .map(|pair| 0.5 * (pair[0] + pair[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hist1d_validation() {
        assert!(Hist1d::new("h", vec![0.0, 1.0, 2.0], vec![3.0, 4.0], vec![0.1, 0.2]).is_ok());
        assert!(Hist1d::new("h", vec![0.0, 1.0], vec![3.0, 4.0], vec![0.1, 0.2]).is_err());
        assert!(Hist1d::new("h", vec![0.0, 1.0, 2.0], vec![3.0, 4.0], vec![0.1]).is_err());
    }

    #[test]
    fn test_hist2d_validation() {
        let h = Hist2d::new(
            "h2",
            vec![0.0, 1.0, 2.0],
            vec![0.0, 2.0, 4.0, 6.0],
            vec![1.0; 6],
            vec![0.0; 6],
        )
        .unwrap();
        assert_eq!(h.shape(), (2, 3));

        assert!(Hist2d::new("h2", vec![0.0, 1.0], vec![0.0, 1.0], vec![1.0; 2], vec![0.0; 2]).is_err());
    }

    #[test]
    fn test_bin_centers() {
        let centers = bin_centers(&[0.0, 1.0, 3.0]);
        assert_eq!(centers, vec![0.5, 2.0]);
    }

    #[test]
    fn test_node_names() {
        let node = ArchiveNode::directory("top", vec![ArchiveNode::Unsupported {
            name: "th3".to_string(),
            dimensions: 3,
        }]);
        assert_eq!(node.name(), "top");
    }
}
