//! Licensing diagnostic aggregation engine.
//!
//! `licprobe-core` orchestrates a fixed sequence of per-source probes
//! (firmware activation table, registry, instrumentation, service state,
//! the native licensing library, and an optional external-interpreter
//! fallback), normalizes raw status and reason codes into canonical
//! license states, decodes the registry's encoded product key, and gates
//! every secret-shaped field behind an explicit sensitivity policy.
//!
//! Probes fail independently: a missing source adds a provenance entry
//! and a note, never aborts the run. The single entry point is
//! [`DiagnosticEngine::aggregate`], which returns a serializable
//! [`DiagnosticReport`].
//!
//! Concrete OS transports live behind the [`providers`] traits; hosts
//! without a licensing stack can run against
//! [`providers::UnsupportedProviders`] and get an honest, mostly-empty
//! report.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cancel;
pub mod config;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod fallback;
pub mod probe;
pub mod providers;
pub mod report;
pub mod sensitivity;
pub mod status;

pub use cancel::CancellationToken;
pub use config::EngineConfig;
pub use decoder::decode_product_key;
pub use engine::{DiagnosticEngine, ProviderSet};
pub use error::{AggregateError, ProbeError};
pub use probe::{ProbeOutcome, ProbePayload, ScalarValue};
pub use report::{DiagnosticReport, LicenseEntry};
pub use sensitivity::{mask_key, SensitivityPolicy, HIDDEN_MARKER};
pub use status::LicenseState;
