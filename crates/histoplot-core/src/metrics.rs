//! Numeric metrics over the histogram view
//!
//! A thin add-on over [`DataRecord::as_histogram`]: per-record integrals
//! and a pairwise shape comparison between integral-normalized records.
//! Records without a histogram view yield `None` rather than an error.

use serde::Serialize;
use tracing::warn;

use crate::data::{DataDimension, DataRecord, Representation};
use crate::error::Result;
use crate::registry::DataRegistry;

/// Name of the per-record integral metric
pub const METRIC_INTEGRAL: &str = "integral";

/// Name of the pairwise shape-distance metric
pub const METRIC_SHAPE: &str = "shape";

/// Integral of a binned record: bin values weighted by bin sizes
///
/// `None` for unbinned records and records of unknown dimensionality.
pub fn integral(record: &DataRecord) -> Option<f64> {
    let (representation, dimension) = record.preferred_representation();
    if representation != Representation::Histogram {
        return None;
    }
    let histogram = record.as_histogram()?;

    match dimension {
        DataDimension::OneDim => {
            let widths = histogram.bin_edges[0].windows(2).map(|pair| pair[1] - pair[0]);
            Some(
                histogram
                    .values
                    .iter()
                    .zip(widths)
                    .map(|(value, width)| value * width)
                    .sum(),
            )
        }
        DataDimension::TwoDim => {
            let widths_x: Vec<f64> = histogram.bin_edges[0]
                .windows(2)
                .map(|pair| pair[1] - pair[0])
                .collect();
            let widths_y: Vec<f64> = histogram.bin_edges[1]
                .windows(2)
                .map(|pair| pair[1] - pair[0])
                .collect();
            let mut total = 0.0;
            for (i, width_x) in widths_x.iter().enumerate() {
                for (j, width_y) in widths_y.iter().enumerate() {
                    total += histogram.values[[i, j]] * width_x * width_y;
                }
            }
            Some(total)
        }
        DataDimension::Unknown => None,
    }
}

/// Half the summed symmetric chi-square between two integral-normalized
/// records of equal binning
///
/// `None` when either record has no histogram view, the shapes differ, or
/// one of the integrals vanishes. Bins where both normalized values are
/// zero contribute nothing.
pub fn shape_distance(first: &DataRecord, second: &DataRecord) -> Option<f64> {
    let histogram_first = first.as_histogram()?;
    let histogram_second = second.as_histogram()?;
    if histogram_first.values.shape() != histogram_second.values.shape() {
        warn!(
            "records {} and {} have different shapes",
            first.name(),
            second.name()
        );
        return None;
    }

    let integral_first = integral(first)?;
    let integral_second = integral(second)?;
    if integral_first == 0.0 || integral_second == 0.0 {
        warn!("empty record, cannot normalize for shape comparison");
        return None;
    }

    let mut sum = 0.0;
    for (value_first, value_second) in histogram_first
        .values
        .iter()
        .zip(histogram_second.values.iter())
    {
        let normalized_first = value_first / integral_first;
        let normalized_second = value_second / integral_second;
        let denominator = normalized_first + normalized_second;
        if denominator != 0.0 {
            sum += (normalized_first - normalized_second).powi(2) / denominator;
        }
    }
    Some(sum / 2.0)
}

/// One computed per-record metric
#[derive(Debug, Clone, Serialize)]
pub struct MetricValue {
    pub identifier: String,
    pub metric: String,
    pub value: Option<f64>,
}

/// One computed pairwise comparison
#[derive(Debug, Clone, Serialize)]
pub struct MetricComparison {
    pub first: String,
    pub second: String,
    pub metric: String,
    pub value: Option<f64>,
}

/// All metrics computed in one call
#[derive(Debug, Clone, Default, Serialize)]
pub struct MetricsReport {
    pub values: Vec<MetricValue>,
    pub comparisons: Vec<MetricComparison>,
}

/// Compute the named metrics over registered records
///
/// Per-record metrics are evaluated for every identifier; pairwise metrics
/// over every identifier pair when `compare` is set. Unknown metric names
/// are logged and skipped.
pub fn compute_metrics(
    registry: &DataRegistry,
    identifiers: &[String],
    metric_names: &[String],
    compare: bool,
) -> Result<MetricsReport> {
    let mut report = MetricsReport::default();

    for metric in metric_names {
        match metric.as_str() {
            METRIC_INTEGRAL => {
                for identifier in identifiers {
                    let record = registry.get(identifier)?;
                    let value = integral(&record.read().expect("record lock poisoned"));
                    report.values.push(MetricValue {
                        identifier: identifier.clone(),
                        metric: metric.clone(),
                        value,
                    });
                }
            }
            METRIC_SHAPE => {
                if !compare {
                    warn!("metric {metric} compares records, enable comparison to use it");
                    continue;
                }
                for (position, first) in identifiers.iter().enumerate() {
                    for second in &identifiers[position + 1..] {
                        let record_first = registry.get(first)?;
                        let record_second = registry.get(second)?;
                        let value = shape_distance(
                            &record_first.read().expect("record lock poisoned"),
                            &record_second.read().expect("record lock poisoned"),
                        );
                        report.comparisons.push(MetricComparison {
                            first: first.clone(),
                            second: second.clone(),
                            metric: metric.clone(),
                            value,
                        });
                    }
                }
            }
            unknown => warn!("unknown metric {unknown}, skipping"),
        }
    }

    Ok(report)
}
