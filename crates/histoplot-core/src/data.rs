//! Normalized record type and derived views
//!
//! A [`DataRecord`] holds one extracted record in a uniform shape: a flat
//! (rows, columns) table with 2 columns for 1-D records (coordinate, value)
//! and 3 columns for 2-D records (coordinate-x, coordinate-y, value), plus
//! an uncertainty pair per table entry and optional per-axis bin edges.
//! Two-axis input grids are flattened on construction; every shape invariant
//! is checked up front so the views never have to.

use ndarray::{Array1, Array2, Array3, ArrayD, IxDyn};
use tracing::warn;

use crate::error::DataError;

/// Data dimensionality derived from the column count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataDimension {
    /// One value depending on one coordinate
    OneDim,
    /// One value depending on two coordinates
    TwoDim,
    /// Anything else; such records cannot be plotted
    Unknown,
}

/// How a record prefers to be drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Histogram,
    Scatter,
}

/// Axis labels and display strings attached to one record
#[derive(Debug, Clone, Default)]
pub struct DataAnnotations {
    pub axis_labels: Vec<String>,
    pub label: String,
    pub title: String,
}

impl DataAnnotations {
    pub fn new(axis_labels: Vec<String>) -> Self {
        Self {
            axis_labels,
            label: String::new(),
            title: String::new(),
        }
    }

    /// Label of one axis, empty when none was recorded
    pub fn axis_label(&self, axis: usize) -> &str {
        self.axis_labels.get(axis).map(String::as_str).unwrap_or("")
    }
}

/// Scatter view: one weight per point, all ones for 1-D records
#[derive(Debug, Clone)]
pub struct ScatterData {
    pub x: Array1<f64>,
    pub y: Array1<f64>,
    pub weight: Array1<f64>,
}

/// Histogram view: bin values in grid shape plus the defining edges
#[derive(Debug, Clone)]
pub struct HistogramData {
    pub values: ArrayD<f64>,
    pub bin_edges: Vec<Vec<f64>>,
}

/// Tabular view suitable for concatenation across records
#[derive(Debug, Clone, Default)]
pub struct TableData {
    pub tag: Vec<String>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
}

impl TableData {
    /// Append another table's rows
    pub fn append(&mut self, other: TableData) {
        self.tag.extend(other.tag);
        self.x.extend(other.x);
        self.y.extend(other.y);
        self.z.extend(other.z);
    }

    pub fn len(&self) -> usize {
        self.tag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tag.is_empty()
    }
}

/// The normalized record, identified by a unique name
#[derive(Debug, Clone)]
pub struct DataRecord {
    name: String,
    data: Array2<f64>,
    bin_edges: Option<Vec<Vec<f64>>>,
    uncertainties: Array3<f64>,
    pub annotations: DataAnnotations,
}

impl DataRecord {
    /// Build a record from raw extracted arrays
    ///
    /// `data` must have shape (N, D) or (Nx, Ny, D); grid-shaped input is
    /// flattened to (Nx*Ny, D). Omitted uncertainties default to an all-zero
    /// array of shape `data.shape() + (2,)`.
    pub fn new(
        name: impl Into<String>,
        data: ArrayD<f64>,
        uncertainties: Option<ArrayD<f64>>,
        bin_edges: Option<Vec<Vec<f64>>>,
        annotations: Option<DataAnnotations>,
    ) -> Result<Self, DataError> {
        let name = name.into();
        let shape = data.shape().to_vec();

        if shape.len() != 2 && shape.len() != 3 {
            return Err(DataError::InvalidShape { shape });
        }
        let columns = shape[shape.len() - 1];
        if columns > 3 {
            return Err(DataError::TooManyColumns { got: columns });
        }

        // uncertainties carry a low/high pair per data entry
        let mut expected = shape.clone();
        expected.push(2);
        let uncertainties = match uncertainties {
            Some(given) => {
                if given.shape() != expected.as_slice() {
                    return Err(DataError::UncertaintyShape {
                        expected,
                        got: given.shape().to_vec(),
                    });
                }
                given
            }
            None => ArrayD::zeros(IxDyn(&expected)),
        };

        let rows = if shape.len() == 3 {
            if let Some(edges) = &bin_edges {
                if edges.len() != 2 {
                    return Err(DataError::BinEdgeCount {
                        expected: 2,
                        got: edges.len(),
                    });
                }
                if edges[0].len() != shape[0] + 1 || edges[1].len() != shape[1] + 1 {
                    return Err(DataError::BinEdgeLength {
                        nx: shape[0],
                        ny: shape[1],
                        got_x: edges[0].len(),
                        got_y: edges[1].len(),
                    });
                }
            } else {
                warn!(
                    "record {name} has two-axis data without binning, \
                     a heatmap cannot be made from it"
                );
            }
            shape[0] * shape[1]
        } else {
            shape[0]
        };

        let data = data
            .into_shape_with_order((rows, columns))
            .map_err(|err| DataError::Reshape(err.to_string()))?;
        let uncertainties = uncertainties
            .into_shape_with_order((rows, columns, 2))
            .map_err(|err| DataError::Reshape(err.to_string()))?;

        // the bin edges must account for every row
        if let Some(edges) = &bin_edges {
            let expected_rows: usize = edges.iter().map(|edge| edge.len() - 1).product();
            if expected_rows != rows {
                return Err(DataError::BinCount {
                    expected: expected_rows,
                    got: rows,
                });
            }
        }

        Ok(Self {
            name,
            data,
            bin_edges,
            uncertainties,
            annotations: annotations.unwrap_or_default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Flat (rows, columns) data table
    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// (rows, columns, 2) low/high uncertainty array
    pub fn uncertainties(&self) -> &Array3<f64> {
        &self.uncertainties
    }

    pub fn bin_edges(&self) -> Option<&[Vec<f64>]> {
        self.bin_edges.as_deref()
    }

    /// Dimensionality derived from the column count
    pub fn dimension(&self) -> DataDimension {
        match self.data.shape()[1] {
            2 => DataDimension::OneDim,
            3 => DataDimension::TwoDim,
            _ => DataDimension::Unknown,
        }
    }

    /// Preferred representation together with the dimensionality
    pub fn preferred_representation(&self) -> (Representation, DataDimension) {
        let representation = if self.bin_edges.is_some() {
            Representation::Histogram
        } else {
            Representation::Scatter
        };
        (representation, self.dimension())
    }

    /// Coordinates and weights ready for a scatter plot
    ///
    /// 1-D records get a unity weight per point so the caller can treat
    /// both dimensionalities alike.
    pub fn as_scatter(&self) -> Option<ScatterData> {
        match self.dimension() {
            DataDimension::OneDim => Some(ScatterData {
                x: self.data.column(0).to_owned(),
                y: self.data.column(1).to_owned(),
                weight: Array1::ones(self.data.nrows()),
            }),
            DataDimension::TwoDim => Some(ScatterData {
                x: self.data.column(0).to_owned(),
                y: self.data.column(1).to_owned(),
                weight: self.data.column(2).to_owned(),
            }),
            DataDimension::Unknown => None,
        }
    }

    /// Bin values in grid shape, `None` for unbinned or unknown records
    pub fn as_histogram(&self) -> Option<HistogramData> {
        let edges = self.bin_edges.as_ref()?;
        match self.dimension() {
            DataDimension::OneDim => Some(HistogramData {
                values: self.data.column(1).to_owned().into_dyn(),
                bin_edges: edges.clone(),
            }),
            DataDimension::TwoDim => {
                let n_x = edges[0].len() - 1;
                let n_y = edges[1].len() - 1;
                let values = self
                    .data
                    .column(2)
                    .to_owned()
                    .into_shape_with_order((n_x, n_y))
                    .ok()?;
                Some(HistogramData {
                    values: values.into_dyn(),
                    bin_edges: edges.clone(),
                })
            }
            DataDimension::Unknown => None,
        }
    }

    /// Flat table tagged with the record name
    pub fn as_table(&self) -> Option<TableData> {
        let scatter = self.as_scatter()?;
        Some(TableData {
            tag: vec![self.name.clone(); scatter.x.len()],
            x: scatter.x.to_vec(),
            y: scatter.y.to_vec(),
            z: scatter.weight.to_vec(),
        })
    }
}

/// Concatenate the tabular views of several records
pub fn combine_tables(records: &[&DataRecord]) -> Option<TableData> {
    let mut combined: Option<TableData> = None;
    for record in records {
        let Some(table) = record.as_table() else {
            warn!("record {} has no tabular view, skipping", record.name());
            continue;
        };
        match &mut combined {
            Some(all) => all.append(table),
            None => combined = Some(table),
        }
    }
    combined
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3, Array4};

    fn data_1d(n: usize) -> ArrayD<f64> {
        let mut data = Array2::<f64>::zeros((n, 2));
        for i in 0..n {
            data[[i, 0]] = i as f64 + 0.5;
            data[[i, 1]] = (i * i) as f64;
        }
        data.into_dyn()
    }

    fn data_2d(n_x: usize, n_y: usize) -> ArrayD<f64> {
        let mut data = Array3::<f64>::zeros((n_x, n_y, 3));
        for i in 0..n_x {
            for j in 0..n_y {
                data[[i, j, 0]] = i as f64;
                data[[i, j, 1]] = j as f64;
                data[[i, j, 2]] = (i * n_y + j) as f64;
            }
        }
        data.into_dyn()
    }

    fn edges(n: usize) -> Vec<f64> {
        (0..=n).map(|i| i as f64).collect()
    }

    #[test]
    fn test_default_uncertainties_are_zero() {
        let record = DataRecord::new("r", data_1d(4), None, None, None).unwrap();
        assert_eq!(record.uncertainties().shape(), &[4, 2, 2]);
        assert!(record.uncertainties().iter().all(|&u| u == 0.0));
    }

    #[test]
    fn test_uncertainty_shape_mismatch_is_rejected() {
        let wrong = Array3::<f64>::zeros((4, 2, 3)).into_dyn();
        let err = DataRecord::new("r", data_1d(4), Some(wrong), None, None).unwrap_err();
        assert!(matches!(err, DataError::UncertaintyShape { .. }));
    }

    #[test]
    fn test_uncertainty_shape_follows_data_after_flatten() {
        let unc = Array4::<f64>::zeros((2, 3, 3, 2)).into_dyn();
        let record = DataRecord::new(
            "r",
            data_2d(2, 3),
            Some(unc),
            Some(vec![edges(2), edges(3)]),
            None,
        )
        .unwrap();
        assert_eq!(record.data().shape(), &[6, 3]);
        assert_eq!(record.uncertainties().shape(), &[6, 3, 2]);
    }

    #[test]
    fn test_too_many_columns_rejected() {
        let data = Array2::<f64>::zeros((4, 5)).into_dyn();
        let err = DataRecord::new("r", data, None, None, None).unwrap_err();
        assert!(matches!(err, DataError::TooManyColumns { got: 5 }));
    }

    #[test]
    fn test_wrong_edge_count_rejected() {
        let err = DataRecord::new("r", data_2d(2, 3), None, Some(vec![edges(2)]), None).unwrap_err();
        assert!(matches!(err, DataError::BinEdgeCount { expected: 2, got: 1 }));
    }

    #[test]
    fn test_edge_length_mismatch_rejected() {
        let err = DataRecord::new(
            "r",
            data_2d(2, 3),
            None,
            Some(vec![edges(2), edges(4)]),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, DataError::BinEdgeLength { .. }));
    }

    #[test]
    fn test_bin_count_mismatch_rejected() {
        let err = DataRecord::new("r", data_1d(4), None, Some(vec![edges(3)]), None).unwrap_err();
        assert!(matches!(err, DataError::BinCount { expected: 3, got: 4 }));
    }

    #[test]
    fn test_unbinned_2d_is_allowed_without_heatmap() {
        let record = DataRecord::new("r", data_2d(2, 3), None, None, None).unwrap();
        assert_eq!(record.dimension(), DataDimension::TwoDim);
        assert!(record.as_histogram().is_none());
        assert_eq!(
            record.preferred_representation(),
            (Representation::Scatter, DataDimension::TwoDim)
        );
    }

    #[test]
    fn test_histogram_view_reshapes_2d() {
        let record = DataRecord::new(
            "r",
            data_2d(2, 3),
            None,
            Some(vec![edges(2), edges(3)]),
            None,
        )
        .unwrap();
        let histogram = record.as_histogram().unwrap();
        assert_eq!(histogram.values.shape(), &[2, 3]);
        assert_eq!(histogram.values[[1, 2]], 5.0);
    }

    #[test]
    fn test_histogram_view_1d_unreshaped() {
        let record = DataRecord::new("r", data_1d(4), None, Some(vec![edges(4)]), None).unwrap();
        let histogram = record.as_histogram().unwrap();
        assert_eq!(histogram.values.shape(), &[4]);
        assert_eq!(
            record.preferred_representation(),
            (Representation::Histogram, DataDimension::OneDim)
        );
    }

    #[test]
    fn test_scatter_weight_defaults_to_one() {
        let record = DataRecord::new("r", data_1d(3), None, None, None).unwrap();
        let scatter = record.as_scatter().unwrap();
        assert!(scatter.weight.iter().all(|&w| w == 1.0));
        assert_eq!(scatter.x[0], 0.5);
    }

    #[test]
    fn test_combine_tables() {
        let a = DataRecord::new("a", data_1d(3), None, None, None).unwrap();
        let b = DataRecord::new("b", data_1d(2), None, None, None).unwrap();
        let table = combine_tables(&[&a, &b]).unwrap();
        assert_eq!(table.len(), 5);
        assert_eq!(table.tag[0], "a");
        assert_eq!(table.tag[4], "b");

        assert!(combine_tables(&[]).is_none());
    }
}
