//! Figure rendering backend
//!
//! Draws composed figures to bitmap files with the [`plotters`] crate. One
//! figure is a square grid of cells; each cell draws the records of one plot
//! group on shared axes. 1-D records are drawn per their configured style,
//! 2-D records as a value-colored scatter.

use std::path::Path;

use plotters::chart::ChartContext;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::warn;

use crate::config::PlotType;
use crate::data::{DataDimension, DataRecord};
use crate::error::PlotError;
use crate::registry::SharedRecord;

/// Fixed edge length of the quadratic output bitmap
const FIGURE_SIZE: u32 = 1600;

/// Everything needed to draw one grid cell
pub(crate) struct CellSpec {
    pub entries: Vec<(SharedRecord, PlotType)>,
    pub title: String,
    pub x_label: String,
    pub y_label: String,
}

type Chart2d<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

fn backend_error(err: impl std::fmt::Display) -> PlotError {
    PlotError::Backend(err.to_string())
}

/// Render the cells onto a grid x grid figure and write it out
pub(crate) fn render_figure(
    path: &Path,
    grid: usize,
    cells: &[CellSpec],
) -> Result<(), PlotError> {
    let root = BitMapBackend::new(path, (FIGURE_SIZE, FIGURE_SIZE)).into_drawing_area();
    root.fill(&WHITE).map_err(backend_error)?;

    let panels = root.split_evenly((grid, grid));
    for (cell, panel) in cells.iter().zip(panels.iter()) {
        draw_cell(cell, panel)?;
    }
    // leftover panels stay blank

    root.present().map_err(backend_error)?;
    Ok(())
}

fn draw_cell(
    cell: &CellSpec,
    panel: &DrawingArea<BitMapBackend, Shift>,
) -> Result<(), PlotError> {
    let records: Vec<(DataRecord, PlotType)> = cell
        .entries
        .iter()
        .map(|(record, style)| (record.read().expect("record lock poisoned").clone(), *style))
        .collect();

    let Some((x_range, y_range)) = axis_ranges(&records) else {
        // nothing drawable in this cell
        return Ok(());
    };

    let mut chart = ChartBuilder::on(panel)
        .caption(&cell.title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)
        .map_err(backend_error)?;

    chart
        .configure_mesh()
        .x_desc(&cell.x_label)
        .y_desc(&cell.y_label)
        .draw()
        .map_err(backend_error)?;

    for (series_index, (record, style)) in records.iter().enumerate() {
        match record.dimension() {
            DataDimension::OneDim => draw_1d(&mut chart, record, *style, series_index)?,
            DataDimension::TwoDim => draw_2d(&mut chart, record)?,
            DataDimension::Unknown => {
                warn!("record {} has unknown dimension, skipping", record.name());
            }
        }
    }

    chart
        .configure_series_labels()
        .border_style(&BLACK)
        .background_style(&WHITE.mix(0.8))
        .draw()
        .map_err(backend_error)?;
    Ok(())
}

/// Common axis ranges over every record in a cell, `None` when nothing is
/// drawable
fn axis_ranges(
    records: &[(DataRecord, PlotType)],
) -> Option<(std::ops::Range<f64>, std::ops::Range<f64>)> {
    let mut x_min = f64::INFINITY;
    let mut x_max = f64::NEG_INFINITY;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for (record, style) in records {
        let Some(scatter) = record.as_scatter() else {
            continue;
        };
        for &x in scatter.x.iter() {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
        }
        for &y in scatter.y.iter() {
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
        // binned records span the full edge range
        if let Some(edges) = record.bin_edges() {
            for &edge in &edges[0] {
                x_min = x_min.min(edge);
                x_max = x_max.max(edge);
            }
            if record.dimension() == DataDimension::TwoDim && edges.len() > 1 {
                for &edge in &edges[1] {
                    y_min = y_min.min(edge);
                    y_max = y_max.max(edge);
                }
            }
        }
        // bars grow from the zero line
        if record.dimension() == DataDimension::OneDim && *style == PlotType::Bar {
            y_min = y_min.min(0.0);
            y_max = y_max.max(0.0);
        }
    }

    if !x_min.is_finite() || !y_min.is_finite() {
        return None;
    }

    let x_pad = pad(x_min, x_max);
    let y_pad = pad(y_min, y_max);
    Some((
        (x_min - x_pad)..(x_max + x_pad),
        (y_min - y_pad)..(y_max + y_pad),
    ))
}

fn pad(min: f64, max: f64) -> f64 {
    let span = max - min;
    if span > 0.0 {
        span * 0.05
    } else {
        0.5
    }
}

fn draw_1d(
    chart: &mut Chart2d,
    record: &DataRecord,
    style: PlotType,
    series_index: usize,
) -> Result<(), PlotError> {
    let Some(scatter) = record.as_scatter() else {
        return Ok(());
    };
    let points: Vec<(f64, f64)> = scatter
        .x
        .iter()
        .copied()
        .zip(scatter.y.iter().copied())
        .collect();
    if points.is_empty() {
        return Ok(());
    }

    let color = Palette99::pick(series_index);
    let series = match style {
        PlotType::Step => {
            let vertices = step_vertices(record, &points);
            chart
                .draw_series(LineSeries::new(vertices, color.stroke_width(2)))
                .map_err(backend_error)?
        }
        PlotType::Line => chart
            .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))
            .map_err(backend_error)?,
        PlotType::Bar => {
            let half_width = bar_half_width(&points);
            chart
                .draw_series(points.iter().map(|&(x, y)| {
                    Rectangle::new([(x - half_width, 0.0), (x + half_width, y)], color.mix(0.4).filled())
                }))
                .map_err(backend_error)?
        }
        PlotType::Scatter => {
            draw_error_bars(chart, record, &points, Palette99::pick(series_index))?;
            chart
                .draw_series(
                    points
                        .iter()
                        .map(|&(x, y)| Circle::new((x, y), 4, color.filled())),
                )
                .map_err(backend_error)?
        }
    };

    let label = record.annotations.label.clone();
    if !label.is_empty() {
        series
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 16, y)], Palette99::pick(series_index)));
    }
    Ok(())
}

/// Staircase vertices for a step rendering, one horizontal segment per bin
fn step_vertices(record: &DataRecord, points: &[(f64, f64)]) -> Vec<(f64, f64)> {
    match record.bin_edges() {
        Some(edges) if edges.len() == 1 && edges[0].len() == points.len() + 1 => {
            let edge = &edges[0];
            let mut vertices = Vec::with_capacity(points.len() * 2);
            for (bin, &(_, y)) in points.iter().enumerate() {
                vertices.push((edge[bin], y));
                vertices.push((edge[bin + 1], y));
            }
            vertices
        }
        _ => points.to_vec(),
    }
}

fn bar_half_width(points: &[(f64, f64)]) -> f64 {
    let x_min = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let x_max = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let span = x_max - x_min;
    if span > 0.0 {
        0.4 * span / points.len() as f64
    } else {
        0.4
    }
}

/// Vertical error bars from the value column's low/high pairs
fn draw_error_bars(
    chart: &mut Chart2d,
    record: &DataRecord,
    points: &[(f64, f64)],
    color: PaletteColor<Palette99>,
) -> Result<(), PlotError> {
    let uncertainties = record.uncertainties();
    let bars: Vec<(f64, f64, f64)> = points
        .iter()
        .enumerate()
        .filter(|&(row, _)| {
            uncertainties[[row, 1, 0]] != 0.0 || uncertainties[[row, 1, 1]] != 0.0
        })
        .map(|(row, &(x, y))| {
            (
                x,
                y - uncertainties[[row, 1, 0]],
                y + uncertainties[[row, 1, 1]],
            )
        })
        .collect();
    if bars.is_empty() {
        return Ok(());
    }
    chart
        .draw_series(bars.into_iter().map(|(x, low, high)| {
            PathElement::new(vec![(x, low), (x, high)], color.stroke_width(1))
        }))
        .map_err(backend_error)?;
    Ok(())
}

fn draw_2d(chart: &mut Chart2d, record: &DataRecord) -> Result<(), PlotError> {
    let Some(scatter) = record.as_scatter() else {
        return Ok(());
    };
    let z_min = scatter.weight.iter().copied().fold(f64::INFINITY, f64::min);
    let z_max = scatter
        .weight
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let span = z_max - z_min;

    let points: Vec<(f64, f64, f64)> = scatter
        .x
        .iter()
        .copied()
        .zip(scatter.y.iter().copied())
        .zip(scatter.weight.iter().copied())
        .map(|((x, y), z)| (x, y, z))
        .collect();

    let series = chart
        .draw_series(points.into_iter().map(|(x, y, z)| {
            let t = if span > 0.0 { (z - z_min) / span } else { 0.5 };
            Circle::new((x, y), 5, value_color(t).filled())
        }))
        .map_err(backend_error)?;

    let label = record.annotations.label.clone();
    if !label.is_empty() {
        let legend_color = value_color(1.0);
        series
            .label(label)
            .legend(move |(x, y)| Circle::new((x + 8, y), 4, legend_color.filled()));
    }
    Ok(())
}

/// Light-to-dark green ramp over the normalized bin value
fn value_color(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    let lerp = |from: f64, to: f64| (from + (to - from) * t) as u8;
    RGBColor(lerp(229.0, 0.0), lerp(245.0, 97.0), lerp(224.0, 0.0))
}
