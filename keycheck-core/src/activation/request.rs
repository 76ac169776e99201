//! Batch activation request construction and signing.

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use quick_xml::escape::partial_escape;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Pre-shared HMAC-SHA256 key of the batch activation service.
const BATCH_ACTIVATION_KEY: [u8; 32] = [
    0xfe, 0x31, 0x98, 0x75, 0xfb, 0x48, 0x84, 0x86, 0x9c, 0xf3, 0xf1, 0xce, 0x99, 0xa8, 0x90,
    0x64, 0xab, 0x57, 0x1f, 0xca, 0x47, 0x04, 0x50, 0x58, 0x30, 0x24, 0xe2, 0x14, 0x62, 0x87,
    0x79, 0xa0,
];

/// Namespace of the inner `ActivationRequest` document.
pub const REQUEST_NS: &str = "http://www.microsoft.com/DRM/SL/BatchActivationRequest/1.0";
/// Namespace of the `BatchActivate` SOAP operation.
pub const SERVICE_NS: &str = "http://www.microsoft.com/BatchActivationService";

const VERSION_NUMBER: &str = "2.0";
const REQUEST_TYPE: &str = "2";
const PID_PLACEHOLDER: &str = "XXXXX";
const PID_PLACEHOLDER_VALUE: &str = "55041";

const ENVELOPE_OPEN: &str = concat!(
    r#"<?xml version="1.0" encoding="utf-8"?>"#,
    r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" "#,
    r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" "#,
    r#"xmlns:xsd="http://www.w3.org/2001/XMLSchema">"#,
    r#"<soap:Body>"#,
);
const ENVELOPE_CLOSE: &str = "</soap:Body></soap:Envelope>";

/// Which `BatchActivate` request body to send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestShape {
    /// HMAC-signed `Digest` + base64 `RequestXml`.
    #[default]
    Signed,
    /// Unsigned `Request` with `PID`, `Type` and `IsConfirmation` inline.
    Inline,
}

/// A remaining-activations request for one installation id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationRequest {
    pid: String,
}

impl ActivationRequest {
    /// Creates a request, substituting the `XXXXX` placeholder in `pid`.
    #[must_use]
    pub fn new(pid: &str) -> Self {
        Self {
            pid: pid.replace(PID_PLACEHOLDER, PID_PLACEHOLDER_VALUE),
        }
    }

    /// The installation id after placeholder substitution.
    #[must_use]
    pub fn pid(&self) -> &str {
        &self.pid
    }

    /// The inner request document in its canonical (signed) form.
    #[must_use]
    pub fn to_xml(&self) -> String {
        format!(
            "<ActivationRequest xmlns=\"{REQUEST_NS}\">\
             <VersionNumber>{VERSION_NUMBER}</VersionNumber>\
             <RequestType>{REQUEST_TYPE}</RequestType>\
             <Requests><Request><PID>{}</PID></Request></Requests>\
             </ActivationRequest>",
            partial_escape(&self.pid)
        )
    }

    /// UTF-16LE bytes of [`to_xml`](Self::to_xml), without a byte order mark.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_xml()
            .encode_utf16()
            .flat_map(u16::to_le_bytes)
            .collect()
    }

    /// Base64 HMAC-SHA256 of the request bytes under the service key.
    #[must_use]
    pub fn digest(&self) -> String {
        sign(&self.to_bytes())
    }

    /// The complete SOAP envelope for `shape`.
    #[must_use]
    pub fn envelope(&self, shape: RequestShape) -> String {
        let body = match shape {
            RequestShape::Signed => {
                let bytes = self.to_bytes();
                format!(
                    "<request><Digest>{}</Digest><RequestXml>{}</RequestXml></request>",
                    sign(&bytes),
                    BASE64.encode(&bytes)
                )
            }
            RequestShape::Inline => format!(
                "<request><Requests><Request><PID>{}</PID>\
                 <Type>{REQUEST_TYPE}</Type>\
                 <IsConfirmation>false</IsConfirmation>\
                 </Request></Requests></request>",
                partial_escape(&self.pid)
            ),
        };
        format!("{ENVELOPE_OPEN}<BatchActivate xmlns=\"{SERVICE_NS}\">{body}</BatchActivate>{ENVELOPE_CLOSE}")
    }
}

fn sign(bytes: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(&BATCH_ACTIVATION_KEY)
        .expect("HMAC-SHA256 accepts keys of any length");
    mac.update(bytes);
    BASE64.encode(mac.finalize().into_bytes())
}
