//! histoplot-core - Record registry and figure engine
//!
//! This crate provides the core functionality of histoplot: extracting
//! named histogram records out of analysis archives, keeping them in an
//! in-memory registry, and rendering them as figures according to a
//! declarative plot configuration.
//!
//! # Key Components
//!
//! - **DataRecord**: normalized record with scatter, histogram, and tabular
//!   views
//! - **DataRegistry**: identifier-keyed record storage with in-place
//!   overwrite and deferred loading for monitor mode
//! - **PlotConfig**: the persisted JSON document declaring sources and plots
//! - **Plotter**: groups records into plots and plots into figures, then
//!   drives the rendering backend
//! - **Metrics**: integrals and shape comparisons over the histogram view
//! - **Monitor**: polling loop re-extracting and re-rendering as source
//!   files appear
//!
//! The registry and the extractor are plain owned objects passed into
//! whatever needs them; there is no ambient global state.

pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod monitor;
pub mod plotter;
mod render;
pub mod registry;

pub use config::*;
pub use data::*;
pub use error::*;
pub use metrics::{compute_metrics, integral, shape_distance, MetricsReport};
pub use monitor::{run_monitor, MonitorOptions};
pub use plotter::*;
pub use registry::*;
