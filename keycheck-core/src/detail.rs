//! The key check result record.

use crate::decoder::DecodedFields;
use serde::{Deserialize, Serialize};

/// Product description used when no configuration matches.
pub const NOT_FOUND: &str = "Not Found";

/// Everything known about a product key after checking it.
///
/// The decoded fields (`key_pid` through `lic`) are either all present or all
/// absent; they are only ever set together through [`KeyDetail::apply_fields`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyDetail {
    /// The key as submitted.
    pub product_key: String,
    key_pid: Option<String>,
    eid: Option<String>,
    aid: Option<String>,
    edi: Option<String>,
    sub: Option<String>,
    lit: Option<String>,
    lic: Option<String>,
    cid: Option<String>,
    prd: String,
    /// Filled in by the activation lookup, if it runs.
    pub remaining_activations: Option<String>,
}

impl KeyDetail {
    /// Creates an empty detail record for a key.
    #[must_use]
    pub fn new(product_key: impl Into<String>) -> Self {
        Self {
            product_key: product_key.into(),
            key_pid: None,
            eid: None,
            aid: None,
            edi: None,
            sub: None,
            lit: None,
            lic: None,
            cid: None,
            prd: NOT_FOUND.to_string(),
            remaining_activations: None,
        }
    }

    /// Sets all decoded fields at once.
    pub fn apply_fields(&mut self, fields: DecodedFields) {
        self.key_pid = Some(fields.key_pid);
        self.eid = Some(fields.eid);
        self.aid = Some(fields.aid);
        self.edi = Some(fields.edi);
        self.sub = Some(fields.sub);
        self.lit = Some(fields.lit);
        self.lic = Some(fields.lic);
        self.cid = Some(fields.cid);
    }

    /// Sets the product description.
    pub fn set_description(&mut self, prd: impl Into<String>) {
        self.prd = prd.into();
    }

    /// Returns true once the decoded fields have been applied.
    #[must_use]
    pub fn is_decoded(&self) -> bool {
        self.key_pid.is_some()
    }

    #[must_use]
    pub fn key_pid(&self) -> Option<&str> {
        self.key_pid.as_deref()
    }

    /// Extended PID.
    #[must_use]
    pub fn eid(&self) -> Option<&str> {
        self.eid.as_deref()
    }

    /// Activation config id, without braces.
    #[must_use]
    pub fn aid(&self) -> Option<&str> {
        self.aid.as_deref()
    }

    /// Edition id.
    #[must_use]
    pub fn edi(&self) -> Option<&str> {
        self.edi.as_deref()
    }

    #[must_use]
    pub fn sub(&self) -> Option<&str> {
        self.sub.as_deref()
    }

    /// License type.
    #[must_use]
    pub fn lit(&self) -> Option<&str> {
        self.lit.as_deref()
    }

    /// License channel.
    #[must_use]
    pub fn lic(&self) -> Option<&str> {
        self.lic.as_deref()
    }

    /// Canonical configuration id lifted out of the extended PID.
    #[must_use]
    pub fn cid(&self) -> Option<&str> {
        self.cid.as_deref()
    }

    /// Product description, or [`NOT_FOUND`].
    #[must_use]
    pub fn prd(&self) -> &str {
        &self.prd
    }
}
