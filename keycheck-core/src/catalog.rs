//! Catalog of candidate `pkeyconfig` files.
//!
//! The catalog is an XML document of `configType` elements, each carrying a
//! `configPath` attribute relative to the configuration directory. Order in
//! the document is the order candidates are tried in.

use crate::config::CheckerConfig;
use crate::error::{KeyCheckError, KeyCheckResult};
use crate::xml::{XmlReader, decode_document};
use quick_xml::events::Event;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

const ENTRY_TAG: &[u8] = b"configType";
const PATH_ATTR: &str = "configPath";

static GLOBAL: OnceLock<Arc<ConfigCatalog>> = OnceLock::new();

/// Ordered, immutable list of configuration file paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigCatalog {
    paths: Vec<PathBuf>,
}

impl ConfigCatalog {
    /// Builds a catalog from already-resolved paths.
    #[must_use]
    pub fn from_paths(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// Loads a catalog, degrading to an empty one on any failure.
    ///
    /// The failure is logged; callers see "no configurations available".
    #[must_use]
    pub fn load(catalog_path: &Path, config_dir: &Path) -> Self {
        match Self::try_load(catalog_path, config_dir) {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!("Error loading pkeyconfig catalog: {e}");
                Self::default()
            }
        }
    }

    /// Loads a catalog, reporting why it could not be read.
    pub fn try_load(catalog_path: &Path, config_dir: &Path) -> KeyCheckResult<Self> {
        let bytes = std::fs::read(catalog_path).map_err(|e| {
            KeyCheckError::ConfigLoad(format!("failed to read {}: {e}", catalog_path.display()))
        })?;
        let document = decode_document(&bytes).map_err(KeyCheckError::ConfigLoad)?;
        let catalog = Self::parse(&document, config_dir)?;
        debug!(
            "Loaded {} pkeyconfig candidates from {}",
            catalog.len(),
            catalog_path.display()
        );
        Ok(catalog)
    }

    /// Parses catalog XML, joining each entry onto `config_dir`.
    pub fn parse(document: &str, config_dir: &Path) -> KeyCheckResult<Self> {
        let mut reader = XmlReader::from_str(document);
        let mut paths = Vec::new();

        loop {
            let event = reader
                .read_event()
                .map_err(|e| KeyCheckError::ConfigLoad(format!("malformed catalog: {e}")))?;
            match event {
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == ENTRY_TAG => {
                    let attr = e.try_get_attribute(PATH_ATTR).map_err(|err| {
                        KeyCheckError::ConfigLoad(format!("malformed catalog attribute: {err}"))
                    })?;
                    match attr {
                        Some(attr) => {
                            let value = attr.unescape_value().map_err(|err| {
                                KeyCheckError::ConfigLoad(format!("malformed catalog attribute: {err}"))
                            })?;
                            paths.push(config_dir.join(value.as_ref()));
                        }
                        None => warn!("Catalog entry without {PATH_ATTR} skipped"),
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        Ok(Self { paths })
    }

    /// Process-wide catalog, loaded from `config` on first use.
    ///
    /// Later calls return the same catalog regardless of the config passed.
    pub fn global(config: &CheckerConfig) -> Arc<Self> {
        GLOBAL
            .get_or_init(|| Arc::new(Self::load(&config.catalog_path, &config.config_dir)))
            .clone()
    }

    /// Candidate paths in trial order.
    #[must_use]
    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
