//! Candidate iteration and Digital Product ID decoding.
//!
//! Candidates are tried in catalog order; the first configuration the engine
//! accepts wins and no later candidate is consulted. The fields are then read
//! out of the returned buffers at fixed offsets:
//!
//! | Field     | Buffer  | Offset |
//! |-----------|---------|--------|
//! | `key_pid` | `pid`   | 0      |
//! | `eid`     | `dpid4` | 8      |
//! | `aid`     | `dpid4` | 136    |
//! | `edi`     | `dpid4` | 280    |
//! | `sub`     | `dpid4` | 888    |
//! | `lit`     | `dpid4` | 1016   |
//! | `lic`     | `dpid4` | 1144   |
//!
//! Strings in the buffers are UTF-16LE, so a field ends at the first pair of
//! zero bytes and the zero high bytes are dropped.

use crate::catalog::ConfigCatalog;
use crate::engine::{PidBuffers, PidGenRequest, ValidationEngine, with_engine_lock};
use crate::error::{KeyCheckError, KeyCheckResult};
use std::path::PathBuf;
use tracing::{debug, info, warn};

const EID_OFFSET: usize = 8;
const AID_OFFSET: usize = 136;
const EDI_OFFSET: usize = 280;
const SUB_OFFSET: usize = 888;
const LIT_OFFSET: usize = 1016;
const LIC_OFFSET: usize = 1144;

/// Position and length of the configuration id within the extended PID.
const CID_START: usize = 6;
const CID_LEN: usize = 5;

/// Fields lifted out of a successful engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFields {
    pub key_pid: String,
    pub eid: String,
    pub aid: String,
    pub edi: String,
    pub sub: String,
    pub lit: String,
    pub lic: String,
    pub cid: String,
}

impl DecodedFields {
    /// Decodes all fields from the engine's output buffers.
    pub fn from_buffers(buffers: &PidBuffers) -> KeyCheckResult<Self> {
        let eid = read_wide_field(&buffers.dpid4, EID_OFFSET)?;
        let cid = derive_cid(&eid)?;
        Ok(Self {
            key_pid: read_wide_field(&buffers.pid, 0)?,
            aid: read_wide_field(&buffers.dpid4, AID_OFFSET)?,
            edi: read_wide_field(&buffers.dpid4, EDI_OFFSET)?,
            sub: read_wide_field(&buffers.dpid4, SUB_OFFSET)?,
            lit: read_wide_field(&buffers.dpid4, LIT_OFFSET)?,
            lic: read_wide_field(&buffers.dpid4, LIC_OFFSET)?,
            eid,
            cid,
        })
    }
}

/// Reads the string starting at `offset`, terminated by two zero bytes.
///
/// Zero bytes inside the string are removed and bytes outside ASCII become
/// `?`. A missing terminator is a decode error.
pub fn read_wide_field(buffer: &[u8], offset: usize) -> KeyCheckResult<String> {
    let tail = buffer.get(offset..).ok_or_else(|| {
        KeyCheckError::Decode(format!("offset {offset} beyond buffer of {} bytes", buffer.len()))
    })?;
    let end = tail
        .windows(2)
        .position(|pair| pair == [0, 0])
        .ok_or_else(|| {
            KeyCheckError::Decode(format!("no terminator after offset {offset}"))
        })?;

    Ok(tail[..end]
        .iter()
        .filter(|&&b| b != 0)
        .map(|&b| if b.is_ascii() { b as char } else { '?' })
        .collect())
}

/// Derives the canonical configuration id from characters 6..11 of `eid`.
pub fn derive_cid(eid: &str) -> KeyCheckResult<String> {
    let digits = eid
        .get(CID_START..CID_START + CID_LEN)
        .ok_or_else(|| {
            KeyCheckError::Decode(format!("extended PID too short for cid: {eid:?}"))
        })?;
    let value: i32 = digits
        .trim()
        .parse()
        .map_err(|e| KeyCheckError::Decode(format!("cid {digits:?} is not numeric: {e}")))?;
    Ok(value.to_string())
}

/// Where candidate iteration ended.
#[derive(Debug)]
enum Outcome {
    Succeeded { config_path: PathBuf, buffers: Box<PidBuffers> },
    Exhausted,
}

/// Runs a key against catalog candidates and decodes the winner.
pub struct BlobDecoder<'a> {
    engine: &'a dyn ValidationEngine,
    marketplace_id: &'a str,
}

impl<'a> BlobDecoder<'a> {
    pub fn new(engine: &'a dyn ValidationEngine, marketplace_id: &'a str) -> Self {
        Self {
            engine,
            marketplace_id,
        }
    }

    /// Returns the accepting configuration and its decoded fields.
    ///
    /// Exhausting the catalog, or failing to decode the winner, is
    /// [`KeyCheckError::NotFound`].
    pub fn decode(
        &self,
        product_key: &str,
        catalog: &ConfigCatalog,
    ) -> KeyCheckResult<(PathBuf, DecodedFields)> {
        match self.try_candidates(product_key, catalog) {
            Outcome::Succeeded {
                config_path,
                buffers,
            } => match DecodedFields::from_buffers(&buffers) {
                Ok(fields) => Ok((config_path, fields)),
                Err(e) => {
                    warn!(
                        "Discarding match from {}: {e}",
                        config_path.display()
                    );
                    Err(KeyCheckError::NotFound)
                }
            },
            Outcome::Exhausted => Err(KeyCheckError::NotFound),
        }
    }

    fn try_candidates(&self, product_key: &str, catalog: &ConfigCatalog) -> Outcome {
        for (index, config_path) in catalog.paths().iter().enumerate() {
            let request = PidGenRequest {
                product_key,
                config_path,
                marketplace_id: self.marketplace_id,
                usage: 0,
            };

            let (status, buffers) = with_engine_lock(|| {
                let mut buffers = Box::new(PidBuffers::seeded());
                let status = self.engine.pid_gen(&request, &mut buffers);
                (status, buffers)
            });

            if status == 0 {
                info!(
                    "Key accepted by candidate {index} ({})",
                    config_path.display()
                );
                return Outcome::Succeeded {
                    config_path: config_path.clone(),
                    buffers,
                };
            }
            debug!(
                "Candidate {index} ({}) rejected key with status {status:#x}",
                config_path.display()
            );
        }
        Outcome::Exhausted
    }
}
