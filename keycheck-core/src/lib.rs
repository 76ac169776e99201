//! Product key checking for volume-licensed products.
//!
//! This crate handles:
//! - Loading the catalog of candidate `pkeyconfig` files
//! - Validating a key against each candidate through the PidGenX engine
//! - Decoding the Digital Product ID buffers the engine fills in
//! - Resolving a product description from the winning configuration
//! - Querying the batch activation service for remaining activations
//!
//! # Pipeline
//!
//! ```text
//! key -> ConfigCatalog -> BlobDecoder (ValidationEngine) -> ProductResolver -> KeyDetail
//!                                                                   |
//!                                          ActivationClient (optional, async)
//! ```
//!
//! The validation engine is opaque and not thread-safe; every call into it
//! goes through a single process-wide lock (see [`engine`]).

pub mod activation;
mod catalog;
mod checker;
mod config;
mod decoder;
mod detail;
pub mod engine;
mod error;
mod resolver;
mod xml;

pub use activation::{ActivationClient, RemainingActivations, RequestShape};
pub use catalog::ConfigCatalog;
pub use checker::KeyChecker;
pub use config::{ActivationConfig, CheckerConfig};
pub use decoder::{BlobDecoder, DecodedFields, derive_cid};
pub use detail::{KeyDetail, NOT_FOUND};
pub use engine::{PidBuffers, PidGenRequest, ValidationEngine};
pub use error::{KeyCheckError, KeyCheckResult};
pub use resolver::{ProductResolver, normalize_description};
