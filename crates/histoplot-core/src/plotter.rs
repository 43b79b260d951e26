//! Plot and figure indexing
//!
//! The [`Plotter`] groups registered records into named plots and plots into
//! named figures, then drives the rendering backend. It is rebuilt for every
//! rendering run and never persisted.
//!
//! Overlaying several 1-D records on one set of axes is always fine. Two
//! 2-D records under the same plot name are not, unless explicitly allowed:
//! the second one is split into an auto-named group
//! `"{plot_name}_{unix_timestamp}"` that stays associated with the original
//! name, so a figure naming only the original pulls in every split group.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::config::{PlotConfig, PlotDescriptor, PlotObject, PlotType};
use crate::data::DataDimension;
use crate::error::{PlotError, Result};
use crate::registry::{DataRegistry, SharedRecord};
use crate::render::{self, CellSpec};

/// Display properties attached to one plot name
#[derive(Debug, Clone, Default)]
pub struct PlotProperties {
    pub title: Option<String>,
    pub x_label: Option<String>,
    pub y_label: Option<String>,
}

struct PlotEntry {
    record: SharedRecord,
    style: PlotType,
}

/// Groups records into plots and plots into figures
#[derive(Default)]
pub struct Plotter {
    /// Record groups; each group is drawn on one set of axes
    groups: Vec<Vec<PlotEntry>>,
    plot_names: HashMap<String, usize>,
    /// Ordered group indices per figure
    figures: Vec<Vec<usize>>,
    figure_names: HashMap<String, usize>,
    /// Auto-split suffixes collected per original plot name
    split_suffixes: HashMap<String, Vec<i64>>,
    properties: HashMap<String, PlotProperties>,
    allow_2d_overlay: bool,
    accept_missing: bool,
}

impl Plotter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow overlaying 2-D records on one set of axes
    pub fn with_allow_2d_overlay(mut self, allow: bool) -> Self {
        self.allow_2d_overlay = allow;
        self
    }

    /// Tolerate identifiers missing from the registry (warn and skip)
    pub fn with_accept_missing(mut self, accept: bool) -> Self {
        self.accept_missing = accept;
        self
    }

    /// Register display properties for a plot name; first definition wins
    pub fn define_plot(&mut self, plot_name: &str, properties: PlotProperties) {
        if self.properties.contains_key(plot_name) {
            warn!("not overwriting plot properties for plot {plot_name}");
            return;
        }
        self.properties.insert(plot_name.to_string(), properties);
    }

    /// Add one registered record to a plot
    ///
    /// `allow_2d_overlay` overrides the plotter-wide setting for this call
    /// when given.
    pub fn add_to_plot(
        &mut self,
        registry: &DataRegistry,
        plot_name: &str,
        identifier: &str,
        style: PlotType,
        allow_2d_overlay: Option<bool>,
    ) -> Result<()> {
        let allow_2d_overlay = allow_2d_overlay.unwrap_or(self.allow_2d_overlay);

        let record = if self.accept_missing {
            match registry.try_get(identifier) {
                Some(record) => record,
                None => {
                    warn!("cannot obtain record {identifier}, skipping");
                    return Ok(());
                }
            }
        } else {
            registry.get(identifier)?
        };

        let dimension = record.read().expect("record lock poisoned").dimension();
        let entry = PlotEntry { record, style };

        match self.plot_names.get(plot_name).copied() {
            None => {
                self.plot_names
                    .insert(plot_name.to_string(), self.groups.len());
                self.groups.push(vec![entry]);
            }
            Some(index) if dimension != DataDimension::TwoDim || allow_2d_overlay => {
                self.groups[index].push(entry);
            }
            Some(_) => {
                // a plot with this name exists and overlaying 2-D records is
                // not allowed, so the record gets its own auto-named group
                let mut suffix = chrono::Utc::now().timestamp();
                while self
                    .plot_names
                    .contains_key(&format!("{plot_name}_{suffix}"))
                {
                    suffix += 1;
                }
                let split_name = format!("{plot_name}_{suffix}");
                self.plot_names.insert(split_name.clone(), self.groups.len());
                self.groups.push(vec![entry]);
                self.split_suffixes
                    .entry(plot_name.to_string())
                    .or_default()
                    .push(suffix);
                if let Some(properties) = self.properties.get(plot_name).cloned() {
                    self.properties.insert(split_name, properties);
                }
            }
        }
        Ok(())
    }

    /// Declare a figure over the given plot names
    ///
    /// Plot names with recorded auto-split groups contribute those groups
    /// as well, in splitting order.
    pub fn define_figure(&mut self, figure_name: &str, plot_names: &[&str]) {
        if plot_names.is_empty() {
            warn!("no plot names given for figure {figure_name}");
            return;
        }
        if self.figure_names.contains_key(figure_name) {
            warn!("figure {figure_name} was already defined, not overwriting");
            return;
        }

        let mut group_indices = Vec::new();
        for plot_name in plot_names {
            let Some(&index) = self.plot_names.get(*plot_name) else {
                warn!("plot name {plot_name} not found, skipping");
                continue;
            };
            group_indices.push(index);
            if let Some(suffixes) = self.split_suffixes.get(*plot_name) {
                for suffix in suffixes {
                    if let Some(&split_index) =
                        self.plot_names.get(&format!("{plot_name}_{suffix}"))
                    {
                        group_indices.push(split_index);
                    }
                }
            }
        }

        self.figure_names
            .insert(figure_name.to_string(), self.figures.len());
        self.figures.push(group_indices);
    }

    /// Render one declared figure to an image file
    ///
    /// The figure's groups are laid out on a square-ish grid, one group per
    /// cell, leftover cells staying blank. Display properties fall back to
    /// the last-drawn record's own axis labels.
    pub fn plot(&self, figure_name: &str, output_path: &Path) -> Result<()> {
        let Some(&figure_index) = self.figure_names.get(figure_name) else {
            warn!("figure with name {figure_name} unknown, not plotting");
            return Ok(());
        };
        let group_indices = &self.figures[figure_index];
        if group_indices.is_empty() {
            warn!("nothing to plot for figure {figure_name}");
            return Ok(());
        }

        let mut index_to_name = vec![""; self.groups.len()];
        for (name, &index) in &self.plot_names {
            index_to_name[index] = name.as_str();
        }

        let mut cells = Vec::new();
        for &index in group_indices {
            let entries = &self.groups[index];
            let properties = self.properties.get(index_to_name[index]);
            let last_annotations = entries
                .last()
                .map(|entry| entry.record.read().expect("record lock poisoned").annotations.clone());

            let title = properties
                .and_then(|p| p.title.clone())
                .unwrap_or_default();
            let x_label = properties
                .and_then(|p| p.x_label.clone())
                .or_else(|| last_annotations.as_ref().map(|a| a.axis_label(0).to_string()))
                .unwrap_or_default();
            let y_label = properties
                .and_then(|p| p.y_label.clone())
                .or_else(|| last_annotations.as_ref().map(|a| a.axis_label(1).to_string()))
                .unwrap_or_default();

            cells.push(CellSpec {
                entries: entries
                    .iter()
                    .map(|entry| (Arc::clone(&entry.record), entry.style))
                    .collect(),
                title,
                x_label,
                y_label,
            });
        }

        let grid = (cells.len() as f64).sqrt().ceil() as usize;
        render::render_figure(output_path, grid, &cells)?;
        debug!("plotted figure {figure_name} at {}", output_path.display());
        Ok(())
    }

    /// Number of record groups declared so far
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Group indices a figure resolves to
    pub fn figure_groups(&self, figure_name: &str) -> Option<&[usize]> {
        self.figure_names
            .get(figure_name)
            .map(|&index| self.figures[index].as_slice())
    }
}

/// Declare one disabled single-record plot per source
pub fn plot_for_each_source(config: &mut PlotConfig) {
    config.reset_plots();
    let plots: Vec<PlotDescriptor> = config
        .sources()
        .iter()
        .map(|source| {
            PlotDescriptor::new(&source.identifier, format!("{}.png", source.identifier))
                .with_objects(vec![
                    PlotObject::new(&source.identifier).with_label(&source.label)
                ])
                .with_title(&source.identifier)
        })
        .collect();
    for plot in plots {
        config.add_plot(plot);
    }
}

/// Declare one disabled overlay plot per group of sources whose identifiers
/// differ only in a trailing `_<suffix>`
pub fn overlay_plots_for_sources(config: &mut PlotConfig) {
    config.reset_plots();

    let mut order: Vec<String> = Vec::new();
    let mut grouped: HashMap<String, Vec<PlotObject>> = HashMap::new();
    for source in config.sources() {
        let key = match source.identifier.rfind('_') {
            Some(position) => source.identifier[..position].to_string(),
            None => source.identifier.clone(),
        };
        if !grouped.contains_key(&key) {
            order.push(key.clone());
        }
        grouped
            .entry(key)
            .or_default()
            .push(PlotObject::new(&source.identifier).with_label(&source.label));
    }

    for key in order {
        let objects = grouped.remove(&key).unwrap_or_default();
        let plot = PlotDescriptor::new(&key, format!("{key}.png"))
            .with_objects(objects)
            .with_title(&key);
        config.add_plot(plot);
    }
}

/// Render every enabled plot declaration
///
/// One figure per plot, or a single `summary.png` grid when `all_in_one`
/// is set. A failure on one plot is logged and the others still render.
pub fn render_enabled_plots(
    registry: &DataRegistry,
    config: &PlotConfig,
    output_dir: &Path,
    all_in_one: bool,
    accept_missing: bool,
) -> Result<()> {
    let enabled: Vec<&PlotDescriptor> = config.plots().iter().filter(|plot| plot.enable).collect();
    if enabled.is_empty() {
        warn!("nothing enabled, nothing to plot");
        return Ok(());
    }

    ensure_output_dir(output_dir)?;

    let mut plotter = Plotter::new().with_accept_missing(accept_missing);
    let mut summary: Vec<String> = Vec::new();

    for descriptor in enabled {
        plotter.define_plot(
            &descriptor.identifier,
            PlotProperties {
                title: Some(
                    descriptor
                        .title
                        .clone()
                        .unwrap_or_else(|| descriptor.identifier.clone()),
                ),
                x_label: descriptor.x_label.clone(),
                y_label: descriptor.y_label.clone(),
            },
        );

        let mut complete = true;
        for object in &descriptor.objects {
            if let Err(err) = plotter.add_to_plot(
                registry,
                &descriptor.identifier,
                &object.identifier,
                object.plot_type,
                None,
            ) {
                error!(
                    "cannot add {} to plot {}: {err}",
                    object.identifier, descriptor.identifier
                );
                complete = false;
            }
        }
        if !complete {
            continue;
        }

        if all_in_one {
            summary.push(descriptor.identifier.clone());
        } else {
            plotter.define_figure(&descriptor.identifier, &[descriptor.identifier.as_str()]);
            if let Err(err) =
                plotter.plot(&descriptor.identifier, &output_dir.join(&descriptor.output))
            {
                error!("failed to render {}: {err}", descriptor.identifier);
            }
        }
    }

    if !summary.is_empty() {
        let names: Vec<&str> = summary.iter().map(String::as_str).collect();
        plotter.define_figure("summary", &names);
        plotter.plot("summary", &output_dir.join("summary.png"))?;
    }
    Ok(())
}

fn ensure_output_dir(output_dir: &Path) -> Result<()> {
    if output_dir.exists() {
        if !output_dir.is_dir() {
            return Err(PlotError::OutputDirObstructed(output_dir.to_path_buf()).into());
        }
        return Ok(());
    }
    std::fs::create_dir_all(output_dir)?;
    Ok(())
}
