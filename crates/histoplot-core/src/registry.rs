//! Record registry
//!
//! Maps identifiers to shared record handles. The registry is an explicit
//! owned object handed into everything that needs it; records are stored
//! behind `Arc<RwLock>` so an in-place overwrite is observed by every
//! holder of a handle.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{error, warn};

use histoplot_io::{SourceDescriptor, SourceExtractor, SOURCE_KIND_ARCHIVE};

use crate::config::PlotConfig;
use crate::data::{DataAnnotations, DataRecord};
use crate::error::{Error, RegistryError, Result};

/// Shared handle to one registered record
pub type SharedRecord = Arc<RwLock<DataRecord>>;

/// Flags steering [`DataRegistry::load_from_config`]
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Update records already registered instead of failing on duplicates
    pub overwrite: bool,
    /// Treat missing files/objects as "not there yet" and skip them
    pub wait_for_source: bool,
    /// Load every declared source, not only those referenced by enabled plots
    pub load_all: bool,
}

/// In-memory mapping from identifier to record
#[derive(Default)]
pub struct DataRegistry {
    records: HashMap<String, SharedRecord>,
}

impl DataRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a record under its identifier
    ///
    /// With `overwrite` set and the identifier present, the stored record is
    /// updated in place behind its lock; handles held elsewhere observe the
    /// new content. Overwriting something that is not there yet only warns
    /// and registers fresh.
    pub fn add(
        &mut self,
        identifier: &str,
        record: DataRecord,
        overwrite: bool,
    ) -> std::result::Result<(), RegistryError> {
        match self.records.get(identifier) {
            Some(existing) => {
                if !overwrite {
                    return Err(RegistryError::Duplicate(identifier.to_string()));
                }
                *existing.write().expect("record lock poisoned") = record;
            }
            None => {
                if overwrite {
                    warn!("update requested for {identifier} but nothing to update, registering fresh");
                }
                self.records
                    .insert(identifier.to_string(), Arc::new(RwLock::new(record)));
            }
        }
        Ok(())
    }

    /// Handle to a registered record
    pub fn get(&self, identifier: &str) -> std::result::Result<SharedRecord, RegistryError> {
        self.records
            .get(identifier)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(identifier.to_string()))
    }

    /// Like [`get`](Self::get) but silent about missing records
    pub fn try_get(&self, identifier: &str) -> Option<SharedRecord> {
        self.records.get(identifier).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Registered identifiers, sorted
    pub fn identifiers(&self) -> Vec<String> {
        let mut identifiers: Vec<String> = self.records.keys().cloned().collect();
        identifiers.sort();
        identifiers
    }

    /// Extract one source and register the resulting record
    ///
    /// Dispatches on the descriptor's source kind; only archives are
    /// recognized. When `wait_for_source` is set and the source is not there
    /// yet, the registry is left untouched and a retry is expected later.
    pub fn extract_and_register(
        &mut self,
        extractor: &mut SourceExtractor,
        source: &SourceDescriptor,
        overwrite: bool,
        wait_for_source: bool,
    ) -> Result<()> {
        if !source.source_name.eq_ignore_ascii_case(SOURCE_KIND_ARCHIVE) {
            return Err(RegistryError::UnknownSourceKind(source.source_name.clone()).into());
        }

        let Some(extracted) =
            extractor.fetch(&source.filepath, &source.object_path, wait_for_source)?
        else {
            warn!("source {} not available yet, skipping", source.identifier);
            return Ok(());
        };

        let mut annotations = DataAnnotations::new(extracted.axis_labels);
        annotations.label = source.label.clone();

        let record = DataRecord::new(
            &source.identifier,
            extracted.data,
            Some(extracted.uncertainties),
            extracted.bin_edges,
            Some(annotations),
        )?;
        self.add(&source.identifier, record, overwrite)?;
        Ok(())
    }

    /// Load a single identifier declared in the configuration
    ///
    /// An identifier without a declared source is logged and skipped.
    pub fn load_one(
        &mut self,
        extractor: &mut SourceExtractor,
        config: &PlotConfig,
        identifier: &str,
        overwrite: bool,
    ) -> Result<Option<SharedRecord>> {
        let Some(source) = config.get_source(identifier) else {
            error!("no source with identifier {identifier} declared in configuration");
            return Ok(None);
        };
        self.extract_and_register(extractor, source, overwrite, false)?;
        Ok(self.try_get(identifier))
    }

    /// Load the sources a configuration declares
    ///
    /// Only sources referenced by enabled plots are extracted unless
    /// `load_all` is set; unused records are never paid for. A failure on
    /// one source degrades to a logged skip so the others still load, with
    /// one exception: a duplicate identifier without `overwrite` would
    /// silently leave stale data behind and stays a hard error.
    pub fn load_from_config(
        &mut self,
        extractor: &mut SourceExtractor,
        config: &PlotConfig,
        options: LoadOptions,
    ) -> Result<()> {
        let wanted = config.referenced_identifiers();
        for source in config.sources() {
            if !options.load_all && !wanted.contains(&source.identifier) {
                continue;
            }
            match self.extract_and_register(
                extractor,
                source,
                options.overwrite,
                options.wait_for_source,
            ) {
                Ok(()) => {}
                Err(Error::Registry(err @ RegistryError::Duplicate(_))) => return Err(err.into()),
                Err(err) => error!("failed to load {}: {err}", source.identifier),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn record(name: &str, value: f64) -> DataRecord {
        let mut data = Array2::<f64>::zeros((2, 2));
        data[[0, 1]] = value;
        data[[1, 1]] = value;
        DataRecord::new(name, data.into_dyn(), None, None, None).unwrap()
    }

    #[test]
    fn test_add_and_get() {
        let mut registry = DataRegistry::new();
        registry.add("a", record("a", 1.0), false).unwrap();

        assert!(registry.get("a").is_ok());
        assert!(registry.try_get("b").is_none());
        assert!(matches!(
            registry.get("b").unwrap_err(),
            RegistryError::NotFound(_)
        ));
    }

    #[test]
    fn test_duplicate_without_overwrite_is_error() {
        let mut registry = DataRegistry::new();
        registry.add("a", record("a", 1.0), false).unwrap();

        let err = registry.add("a", record("a", 2.0), false).unwrap_err();
        assert!(matches!(err, RegistryError::Duplicate(_)));
    }

    #[test]
    fn test_overwrite_updates_in_place() {
        let mut registry = DataRegistry::new();
        registry.add("a", record("a", 1.0), false).unwrap();

        // hold a handle before overwriting
        let held = registry.get("a").unwrap();
        assert_eq!(held.read().expect("record lock poisoned").data()[[0, 1]], 1.0);

        registry.add("a", record("a", 7.0), true).unwrap();
        assert_eq!(held.read().expect("record lock poisoned").data()[[0, 1]], 7.0);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_overwrite_missing_warns_and_inserts() {
        let mut registry = DataRegistry::new();
        registry.add("a", record("a", 1.0), true).unwrap();
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_source_kind_is_error() {
        let mut registry = DataRegistry::new();
        let mut extractor = SourceExtractor::new();
        let mut source = SourceDescriptor::archive("file.hpa", "dir/h");
        source.source_name = "ntuple".to_string();

        let err = registry
            .extract_and_register(&mut extractor, &source, false, false)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Registry(RegistryError::UnknownSourceKind(_))
        ));
    }
}
