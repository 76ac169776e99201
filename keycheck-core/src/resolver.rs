//! Product description lookup inside a `pkeyconfig` file.
//!
//! A `pkeyconfig` license document carries its payload base64-encoded in a
//! `tm:infoBin` element. The decoded payload is a second XML document listing
//! the key configurations of the product family:
//!
//! ```xml
//! <ProductKeyConfiguration xmlns="http://schemas.microsoft.com/DRM/PKEY/Configuration/2.0">
//!   <Configurations>
//!     <Configuration>
//!       <ActConfigId>{...}</ActConfigId>
//!       <EditionId>ProPlus</EditionId>
//!       <ProductDescription>RTM_ProPlus</ProductDescription>
//!     </Configuration>
//!   </Configurations>
//! </ProductKeyConfiguration>
//! ```

use crate::detail::NOT_FOUND;
use crate::error::{KeyCheckError, KeyCheckResult};
use crate::xml::{XmlReader, decode_document, next_element_text, read_text};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use std::path::Path;
use tracing::{debug, warn};

/// Namespace of the inner configuration document.
pub const PKEY_CONFIG_NS: &str = "http://schemas.microsoft.com/DRM/PKEY/Configuration/2.0";

const INFO_BIN: &str = "infoBin";
const RTM_PREFIX: &str = "RTM_";
const RTM_REPLACEMENT: &str = "Office14";

/// Rewrites a leading `RTM_` to `Office14`; anything else is returned as is.
#[must_use]
pub fn normalize_description(description: &str) -> String {
    match description.strip_prefix(RTM_PREFIX) {
        Some(rest) => format!("{RTM_REPLACEMENT}{rest}"),
        None => description.to_string(),
    }
}

/// One `Configuration` node of the inner document.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct ConfigurationEntry {
    act_config_id: Option<String>,
    edition_id: Option<String>,
    product_description: Option<String>,
}

impl ConfigurationEntry {
    fn field_mut(&mut self, local: &[u8]) -> Option<&mut Option<String>> {
        match local {
            b"ActConfigId" => Some(&mut self.act_config_id),
            b"EditionId" => Some(&mut self.edition_id),
            b"ProductDescription" => Some(&mut self.product_description),
            _ => None,
        }
    }
}

/// Stateless resolver; every call reads the configuration file afresh.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProductResolver;

impl ProductResolver {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Resolves the description for `act_config_id` (braced) and
    /// `edition_id`, falling back to [`NOT_FOUND`] on any failure.
    #[must_use]
    pub fn resolve(&self, config_path: &Path, act_config_id: &str, edition_id: &str) -> String {
        match self.try_resolve(config_path, act_config_id, edition_id) {
            Ok(description) => normalize_description(&description),
            Err(KeyCheckError::NotFound) => {
                debug!(
                    "No configuration for {act_config_id} / {edition_id} in {}",
                    config_path.display()
                );
                NOT_FOUND.to_string()
            }
            Err(e) => {
                warn!("Error getting product description: {e}");
                NOT_FOUND.to_string()
            }
        }
    }

    /// Like [`resolve`](Self::resolve) but returns the raw description and
    /// a typed error instead of the fallback.
    pub fn try_resolve(
        &self,
        config_path: &Path,
        act_config_id: &str,
        edition_id: &str,
    ) -> KeyCheckResult<String> {
        let bytes = std::fs::read(config_path).map_err(|e| {
            KeyCheckError::ConfigLoad(format!("failed to read {}: {e}", config_path.display()))
        })?;
        let outer = decode_document(&bytes).map_err(KeyCheckError::ConfigLoad)?;
        let inner = extract_info_bin(&outer)?;
        let entries = parse_configurations(&inner)?;
        select_description(&entries, act_config_id, edition_id)
    }
}

/// Base64-decodes the first `infoBin` element into the inner document.
fn extract_info_bin(outer: &str) -> KeyCheckResult<String> {
    let mut reader = XmlReader::from_str(outer);
    let encoded = next_element_text(&mut reader, INFO_BIN)
        .map_err(|e| KeyCheckError::ConfigLoad(format!("malformed license document: {e}")))?
        .ok_or_else(|| KeyCheckError::ConfigLoad("no infoBin element".to_string()))?;

    let compact: String = encoded.split_whitespace().collect();
    let decoded = BASE64
        .decode(compact)
        .map_err(|e| KeyCheckError::ConfigLoad(format!("invalid infoBin base64: {e}")))?;
    decode_document(&decoded).map_err(KeyCheckError::ConfigLoad)
}

fn in_pkey_ns(ns: &ResolveResult<'_>) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == PKEY_CONFIG_NS.as_bytes())
}

/// Collects the `ProductKeyConfiguration/Configurations/Configuration` nodes.
fn parse_configurations(inner: &str) -> KeyCheckResult<Vec<ConfigurationEntry>> {
    let malformed =
        |e: String| KeyCheckError::ConfigLoad(format!("malformed configuration document: {e}"));

    let mut reader = XmlReader::from_str(inner);
    // Local names of the open elements, or `None` for elements outside the namespace.
    let mut open: Vec<Option<Vec<u8>>> = Vec::new();
    let mut entries = Vec::new();

    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| malformed(e.to_string()))?;
        let ours = in_pkey_ns(&ns);
        match event {
            Event::Start(e) => {
                let local = e.local_name().as_ref().to_vec();
                let at_configurations = matches!(
                    open.as_slice(),
                    [Some(root), Some(list)]
                        if root.as_slice() == b"ProductKeyConfiguration"
                            && list.as_slice() == b"Configurations"
                );
                if ours && at_configurations && local == b"Configuration" {
                    entries.push(read_configuration(&mut reader).map_err(malformed)?);
                } else {
                    open.push(ours.then_some(local));
                }
            }
            Event::End(_) => {
                open.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(entries)
}

/// Reads the children of a `Configuration` whose start tag was just consumed.
fn read_configuration(reader: &mut XmlReader<'_>) -> Result<ConfigurationEntry, String> {
    let mut entry = ConfigurationEntry::default();
    loop {
        let (ns, event) = reader.read_resolved_event().map_err(|e| e.to_string())?;
        let ours = in_pkey_ns(&ns);
        match event {
            Event::Start(e) => {
                let text = read_text(reader)?;
                if ours {
                    if let Some(slot) = entry.field_mut(e.local_name().as_ref()) {
                        slot.get_or_insert(text);
                    }
                }
            }
            Event::Empty(e) => {
                if ours {
                    if let Some(slot) = entry.field_mut(e.local_name().as_ref()) {
                        slot.get_or_insert_with(String::new);
                    }
                }
            }
            Event::End(_) => return Ok(entry),
            Event::Eof => return Err("unexpected end of document".to_string()),
            _ => {}
        }
    }
}

/// Picks the exact id match, else the upper-cased id match, then checks the edition.
fn select_description(
    entries: &[ConfigurationEntry],
    act_config_id: &str,
    edition_id: &str,
) -> KeyCheckResult<String> {
    let find = |id: &str| {
        entries
            .iter()
            .find(|entry| entry.act_config_id.as_deref() == Some(id))
    };
    let entry = find(act_config_id)
        .or_else(|| find(&act_config_id.to_uppercase()))
        .ok_or(KeyCheckError::NotFound)?;

    let edition = entry
        .edition_id
        .as_deref()
        .ok_or_else(|| KeyCheckError::ConfigLoad("configuration without EditionId".to_string()))?;
    if !edition.contains(edition_id) {
        return Err(KeyCheckError::NotFound);
    }

    entry.product_description.clone().ok_or_else(|| {
        KeyCheckError::ConfigLoad("configuration without ProductDescription".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, edition: &str, description: &str) -> ConfigurationEntry {
        ConfigurationEntry {
            act_config_id: Some(id.to_string()),
            edition_id: Some(edition.to_string()),
            product_description: Some(description.to_string()),
        }
    }

    #[test]
    fn normalizes_rtm_prefix() {
        assert_eq!(normalize_description("RTM_PRO"), "Office14PRO");
        assert_eq!(normalize_description("VOL_STD"), "VOL_STD");
        assert_eq!(normalize_description("XRTM_PRO"), "XRTM_PRO");
        assert_eq!(normalize_description(NOT_FOUND), NOT_FOUND);
    }

    #[test]
    fn exact_match_preferred_over_upper_case() {
        let entries = [
            entry("{ABC}", "Pro", "upper"),
            entry("{abc}", "Pro", "exact"),
        ];
        assert_eq!(select_description(&entries, "{abc}", "Pro").unwrap(), "exact");
    }

    #[test]
    fn falls_back_to_upper_case_id() {
        let entries = [entry("{ABC-DEF}", "ProPlus", "RTM_ProPlus")];
        assert_eq!(
            select_description(&entries, "{abc-def}", "Pro").unwrap(),
            "RTM_ProPlus"
        );
    }

    #[test]
    fn edition_must_contain_requested_edition() {
        let entries = [entry("{ABC}", "Standard", "x")];
        assert!(matches!(
            select_description(&entries, "{ABC}", "Pro"),
            Err(KeyCheckError::NotFound)
        ));
    }

    #[test]
    fn parses_only_namespaced_configurations() {
        let inner = format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<ProductKeyConfiguration xmlns="{PKEY_CONFIG_NS}">
  <Configurations>
    <Configuration>
      <ActConfigId>{{A}}</ActConfigId>
      <RefGroupId>1</RefGroupId>
      <EditionId>ProPlus</EditionId>
      <ProductDescription>RTM_ProPlus</ProductDescription>
      <IsRandomized/>
    </Configuration>
    <Configuration xmlns="urn:other">
      <ActConfigId>{{B}}</ActConfigId>
    </Configuration>
  </Configurations>
  <KeyRanges><Configuration><ActConfigId>{{C}}</ActConfigId></Configuration></KeyRanges>
</ProductKeyConfiguration>"#
        );
        let entries = parse_configurations(&inner).unwrap();
        assert_eq!(entries, vec![entry("{A}", "ProPlus", "RTM_ProPlus")]);
    }
}
