//! Monitor mode
//!
//! A polling loop that re-extracts and re-renders on a fixed interval while
//! source files appear or get rewritten on disk. Sources that are not there
//! yet are tolerated on every cycle; the registry accumulates records as
//! they become available.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tracing::info;

use histoplot_io::SourceExtractor;

use crate::config::PlotConfig;
use crate::error::Result;
use crate::plotter::render_enabled_plots;
use crate::registry::{DataRegistry, LoadOptions};

/// Settings for one monitor run
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    /// Sleep between cycles
    pub interval: Duration,
    /// Stop after this many cycles; `None` runs until interrupted
    pub cycles: Option<u64>,
    /// Directory receiving the rendered figures
    pub output_dir: PathBuf,
    /// Render everything into one summary figure per cycle
    pub all_in_one: bool,
    /// Load every declared source, not only the referenced ones
    pub load_all: bool,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            cycles: None,
            output_dir: PathBuf::from("."),
            all_in_one: false,
            load_all: false,
        }
    }
}

/// Drive load-then-render cycles until interrupted or the cycle bound hits
///
/// Each cycle overwrites registered records in place, waits politely for
/// sources that have not appeared yet, and tolerates records still missing
/// from the registry at render time.
pub fn run_monitor(
    extractor: &mut SourceExtractor,
    registry: &mut DataRegistry,
    config: &PlotConfig,
    options: &MonitorOptions,
) -> Result<()> {
    let mut completed: u64 = 0;
    loop {
        // picks up archives rewritten since the last cycle
        extractor.invalidate();

        registry.load_from_config(
            extractor,
            config,
            LoadOptions {
                overwrite: true,
                wait_for_source: true,
                load_all: options.load_all,
            },
        )?;
        render_enabled_plots(registry, config, &options.output_dir, options.all_in_one, true)?;

        completed += 1;
        info!("monitor cycle {completed} done, {} records registered", registry.len());
        if let Some(limit) = options.cycles {
            if completed >= limit {
                break;
            }
        }
        thread::sleep(options.interval);
    }
    Ok(())
}
