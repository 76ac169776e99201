//! Batch activation response parsing.
//!
//! The SOAP response carries the interesting document as the text of a
//! `ResponseXml` element. That text is itself XML, escaped a second time and
//! declared as `utf-16` even though it arrives inside a UTF-8 body.

use crate::error::{KeyCheckError, KeyCheckResult};
use crate::xml::{XmlReader, next_element_text};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error code reported for a blocked key.
pub const BLOCKED_ERROR_CODE: &str = "0x67";

/// Remaining activation count as reported by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemainingActivations {
    /// The count exactly as the service reported it.
    Count(String),
    /// The key has been blocked.
    Blocked,
}

impl fmt::Display for RemainingActivations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Count(count) => f.write_str(count),
            Self::Blocked => f.write_str("0 (Blocked)"),
        }
    }
}

/// Parses a `BatchActivate` SOAP response body.
pub fn parse_response(body: &str) -> KeyCheckResult<RemainingActivations> {
    let mut reader = XmlReader::from_str(body);
    let response_xml = next_element_text(&mut reader, "ResponseXml")
        .map_err(|e| KeyCheckError::Protocol(format!("malformed SOAP response: {e}")))?
        .ok_or_else(|| KeyCheckError::Protocol("no ResponseXml in response".to_string()))?;

    parse_response_xml(&unwrap_response_xml(&response_xml))
}

/// Undoes the second round of escaping and the `utf-16` declaration.
fn unwrap_response_xml(raw: &str) -> String {
    let unescaped = raw.replace("&gt;", ">").replace("&lt;", "<");
    rewrite_declared_encoding(&unescaped)
}

fn rewrite_declared_encoding(document: &str) -> String {
    let trimmed = document.trim_start();
    if !trimmed.starts_with("<?xml") {
        return trimmed.to_string();
    }
    match trimmed.find("?>") {
        Some(end) => {
            let declaration = trimmed[..end]
                .replace("utf-16", "utf-8")
                .replace("UTF-16", "utf-8");
            format!("{declaration}{}", &trimmed[end..])
        }
        None => trimmed.to_string(),
    }
}

/// Reads `ActivationRemaining` and, for negative counts, the following `ErrorCode`.
fn parse_response_xml(document: &str) -> KeyCheckResult<RemainingActivations> {
    let malformed = |e: String| KeyCheckError::Protocol(format!("malformed ResponseXml: {e}"));

    let mut reader = XmlReader::from_str(document);
    let count = next_element_text(&mut reader, "ActivationRemaining")
        .map_err(malformed)?
        .ok_or_else(|| KeyCheckError::Protocol("no ActivationRemaining in ResponseXml".to_string()))?;

    let negative = count.trim().parse::<i64>().is_ok_and(|n| n < 0);
    if negative {
        let error_code = next_element_text(&mut reader, "ErrorCode").map_err(malformed)?;
        if error_code.as_deref().map(str::trim) == Some(BLOCKED_ERROR_CODE) {
            return Ok(RemainingActivations::Blocked);
        }
    }

    Ok(RemainingActivations::Count(count))
}
