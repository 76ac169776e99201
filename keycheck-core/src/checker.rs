//! The `check_key` pipeline.

use crate::catalog::ConfigCatalog;
use crate::decoder::BlobDecoder;
use crate::detail::KeyDetail;
use crate::engine::ValidationEngine;
use crate::error::{KeyCheckError, KeyCheckResult};
use crate::resolver::ProductResolver;
use std::sync::Arc;
use tracing::debug;

const DEFAULT_MARKETPLACE_ID: &str = "00000";

/// Validates keys against a catalog and assembles their details.
pub struct KeyChecker {
    catalog: Arc<ConfigCatalog>,
    engine: Arc<dyn ValidationEngine>,
    resolver: ProductResolver,
    marketplace_id: String,
}

impl KeyChecker {
    pub fn new(catalog: Arc<ConfigCatalog>, engine: Arc<dyn ValidationEngine>) -> Self {
        Self {
            catalog,
            engine,
            resolver: ProductResolver::new(),
            marketplace_id: DEFAULT_MARKETPLACE_ID.to_string(),
        }
    }

    /// Overrides the marketplace id passed to the engine.
    #[must_use]
    pub fn with_marketplace_id(mut self, marketplace_id: impl Into<String>) -> Self {
        self.marketplace_id = marketplace_id.into();
        self
    }

    #[must_use]
    pub fn catalog(&self) -> &ConfigCatalog {
        &self.catalog
    }

    /// Checks a product key.
    ///
    /// # Errors
    ///
    /// [`KeyCheckError::Input`] for a blank key and [`KeyCheckError::NotFound`]
    /// when no configuration accepts it.
    pub fn check_key(&self, product_key: &str) -> KeyCheckResult<KeyDetail> {
        if product_key.trim().is_empty() {
            return Err(KeyCheckError::Input(
                "product key must be provided and not empty".to_string(),
            ));
        }
        if self.catalog.is_empty() {
            debug!("No pkeyconfig candidates available");
        }

        let decoder = BlobDecoder::new(self.engine.as_ref(), &self.marketplace_id);
        let (config_path, fields) = decoder.decode(product_key, &self.catalog)?;

        let prd = self
            .resolver
            .resolve(&config_path, &format!("{{{}}}", fields.aid), &fields.edi);

        let mut detail = KeyDetail::new(product_key);
        detail.apply_fields(fields);
        detail.set_description(prd);
        Ok(detail)
    }
}
