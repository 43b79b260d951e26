//! Plot configuration
//!
//! The persistent JSON document declaring sources and plots. The document
//! has exactly two required top-level sections, `sources` and `plots`;
//! unknown keys anywhere in the document are preserved across a read/write
//! round trip so other tools can annotate it freely.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use histoplot_io::{SourceDescriptor, SourceExtractor};

use crate::error::ConfigError;

/// How a 1-D record is drawn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlotType {
    #[default]
    Step,
    Bar,
    Line,
    Scatter,
}

/// One record reference inside a plot declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotObject {
    pub identifier: String,

    #[serde(rename = "type", default)]
    pub plot_type: PlotType,

    #[serde(default)]
    pub label: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PlotObject {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            plot_type: PlotType::default(),
            label: String::new(),
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// One named plot declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlotDescriptor {
    pub identifier: String,

    #[serde(default)]
    pub objects: Vec<PlotObject>,

    #[serde(default)]
    pub enable: bool,

    /// Output file name, relative to the render output directory
    pub output: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_label: Option<String>,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl PlotDescriptor {
    pub fn new(identifier: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            objects: Vec::new(),
            enable: false,
            output: output.into(),
            title: None,
            x_label: None,
            y_label: None,
            extra: serde_json::Map::new(),
        }
    }

    pub fn with_objects(mut self, objects: Vec<PlotObject>) -> Self {
        self.objects = objects;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// The whole configuration document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlotConfig {
    sources: Vec<SourceDescriptor>,
    plots: Vec<PlotDescriptor>,

    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

impl PlotConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a configuration document, checking the required sections
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let value: serde_json::Value =
            serde_json::from_str(&text).map_err(|err| ConfigError::Parse(err.to_string()))?;
        for section in ["sources", "plots"] {
            if value.get(section).is_none() {
                return Err(ConfigError::MissingSection(section));
            }
        }
        serde_json::from_value(value).map_err(|err| ConfigError::Parse(err.to_string()))
    }

    /// Write the configuration document
    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|err| ConfigError::Parse(err.to_string()))?;
        std::fs::write(path, text)?;
        info!("written configuration to {}", path.display());
        Ok(())
    }

    pub fn add_source(&mut self, source: SourceDescriptor) {
        self.sources.push(source);
    }

    pub fn add_plot(&mut self, plot: PlotDescriptor) {
        self.plots.push(plot);
    }

    /// Drop every declared plot, keeping the sources
    pub fn reset_plots(&mut self) {
        self.plots.clear();
    }

    pub fn sources(&self) -> &[SourceDescriptor] {
        &self.sources
    }

    pub fn plots(&self) -> &[PlotDescriptor] {
        &self.plots
    }

    /// Declared source for one identifier, `None` if absent
    pub fn get_source(&self, identifier: &str) -> Option<&SourceDescriptor> {
        self.sources.iter().find(|s| s.identifier == identifier)
    }

    /// Identifiers referenced by enabled plots
    pub fn referenced_identifiers(&self) -> HashSet<String> {
        self.plots
            .iter()
            .filter(|plot| plot.enable)
            .flat_map(|plot| plot.objects.iter().map(|o| o.identifier.clone()))
            .collect()
    }

    /// Recompute every plot's enable flag from a selector list
    ///
    /// `"all"` enables everything. Any other selector is first tried as a
    /// path to a JSON side file `{"enable": [...]}` and otherwise taken as a
    /// literal plot identifier. The recomputation is total: plots matching
    /// no selector end up disabled, no matter what they were before.
    pub fn enable_plots(&mut self, selectors: &[String]) {
        let enable_all = selectors.iter().any(|s| s == "all");
        let mut wanted: HashSet<String> = HashSet::new();
        if !enable_all {
            for selector in selectors {
                match identifiers_from_file(Path::new(selector)) {
                    Some(identifiers) => wanted.extend(identifiers),
                    None => {
                        wanted.insert(selector.clone());
                    }
                }
            }
        }

        for plot in &mut self.plots {
            plot.enable = enable_all || wanted.contains(&plot.identifier);
        }
        if !self.plots.iter().any(|plot| plot.enable) {
            warn!("no plot ends up enabled");
        }
    }
}

/// Read an enable list `{"enable": [...]}` from a JSON side file
fn identifiers_from_file(path: &Path) -> Option<Vec<String>> {
    if !path.is_file() {
        return None;
    }
    let text = std::fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&text).ok()?;
    Some(
        value
            .get("enable")?
            .as_array()?
            .iter()
            .filter_map(|entry| entry.as_str().map(String::from))
            .collect(),
    )
}

/// Build a configuration by enumerating every record in the given files
///
/// Files that cannot be read as archives are logged and skipped; the
/// partial result is still returned. Labels default to the file's
/// positional index. With `existing_config` given, the new sources are
/// appended to the pre-loaded document.
pub fn configure_from_sources(
    extractor: &mut SourceExtractor,
    filepaths: &[std::path::PathBuf],
    labels: Option<&[String]>,
    existing_config: Option<&Path>,
) -> Result<PlotConfig, ConfigError> {
    if filepaths.is_empty() {
        return Err(ConfigError::NoSources);
    }
    if let Some(labels) = labels {
        if labels.len() != filepaths.len() {
            return Err(ConfigError::LabelCount {
                sources: filepaths.len(),
                labels: labels.len(),
            });
        }
    }

    let mut config = match existing_config {
        Some(path) => PlotConfig::read(path)?,
        None => PlotConfig::new(),
    };

    for (index, filepath) in filepaths.iter().enumerate() {
        let sources = extractor.enumerate(filepath);
        let Some(sources) = sources.filter(|s| !s.is_empty()) else {
            error!("cannot extract anything from {}", filepath.display());
            continue;
        };

        let label = labels
            .map(|l| l[index].clone())
            .unwrap_or_else(|| index.to_string());
        for source in sources {
            config.add_source(source.with_label(label.clone()));
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_plots(identifiers: &[&str]) -> PlotConfig {
        let mut config = PlotConfig::new();
        for identifier in identifiers {
            config.add_plot(
                PlotDescriptor::new(*identifier, format!("{identifier}.png"))
                    .with_objects(vec![PlotObject::new(*identifier)]),
            );
        }
        config
    }

    #[test]
    fn test_enable_all_round_trip() {
        let mut config = config_with_plots(&["a", "b", "c"]);
        config.enable_plots(&["all".to_string()]);
        assert!(config.plots().iter().all(|plot| plot.enable));
    }

    #[test]
    fn test_enable_subset_recomputes_from_scratch() {
        let mut config = config_with_plots(&["a", "b", "c"]);
        config.enable_plots(&["all".to_string()]);

        config.enable_plots(&["b".to_string()]);
        let enabled: Vec<&str> = config
            .plots()
            .iter()
            .filter(|plot| plot.enable)
            .map(|plot| plot.identifier.as_str())
            .collect();
        assert_eq!(enabled, vec!["b"]);
    }

    #[test]
    fn test_enable_from_side_file() {
        let dir = tempfile::tempdir().unwrap();
        let side = dir.path().join("enable.json");
        std::fs::write(&side, r#"{"enable": ["a", "c"]}"#).unwrap();

        let mut config = config_with_plots(&["a", "b", "c"]);
        config.enable_plots(&[side.to_string_lossy().into_owned()]);

        let enabled: Vec<&str> = config
            .plots()
            .iter()
            .filter(|plot| plot.enable)
            .map(|plot| plot.identifier.as_str())
            .collect();
        assert_eq!(enabled, vec!["a", "c"]);
    }

    #[test]
    fn test_read_requires_both_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        std::fs::write(&path, r#"{"sources": []}"#).unwrap();
        assert!(matches!(
            PlotConfig::read(&path).unwrap_err(),
            ConfigError::MissingSection("plots")
        ));
    }

    #[test]
    fn test_round_trip_preserves_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "sources": [],
                "plots": [{"identifier": "a", "output": "a.png", "style": "fancy"}],
                "comment": "written by hand"
            }"#,
        )
        .unwrap();

        let config = PlotConfig::read(&path).unwrap();
        let back = dir.path().join("back.json");
        config.write(&back).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&back).unwrap()).unwrap();
        assert_eq!(value["comment"], "written by hand");
        assert_eq!(value["plots"][0]["style"], "fancy");
    }

    #[test]
    fn test_label_count_mismatch_is_error() {
        let mut extractor = SourceExtractor::new();
        let err = configure_from_sources(
            &mut extractor,
            &[std::path::PathBuf::from("a.hpa"), "b.hpa".into()],
            Some(&["one".to_string()]),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::LabelCount { sources: 2, labels: 1 }));
    }

    #[test]
    fn test_empty_source_list_is_error() {
        let mut extractor = SourceExtractor::new();
        let err = configure_from_sources(&mut extractor, &[], None, None).unwrap_err();
        assert!(matches!(err, ConfigError::NoSources));
    }

    #[test]
    fn test_unreadable_file_is_skipped() {
        let mut extractor = SourceExtractor::new();
        let config = configure_from_sources(
            &mut extractor,
            &[std::path::PathBuf::from("/no/such/file.hpa")],
            None,
            None,
        )
        .unwrap();
        assert!(config.sources().is_empty());
    }
}
