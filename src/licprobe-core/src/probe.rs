//! Probe result types.
//!
//! A [`ProbeOutcome`] is the immutable record of one capability
//! invocation. Probes never mutate the report themselves; the
//! orchestrator folds each outcome into the report exactly once, so no
//! two steps ever share mutable state.

use serde::{Deserialize, Serialize};

use crate::error::ProbeError;

/// Typed value returned by registry, instrumentation, and native-library
/// value getters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScalarValue {
    /// UTF-8 text (registry SZ / native SL_DATA_SZ shaped values).
    Text(String),
    /// Raw bytes, already copied into owned memory by the provider.
    Bytes(Vec<u8>),
    /// 32-bit unsigned integer.
    Dword(u32),
    /// 64-bit unsigned integer (file times, counters).
    Qword(u64),
}

impl ScalarValue {
    /// Borrow the text payload, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Borrow the byte payload, if this is a binary value.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b.as_slice()),
            _ => None,
        }
    }

    /// Extract a 32-bit integer, if this is a dword value.
    #[must_use]
    pub fn as_dword(&self) -> Option<u32> {
        match self {
            Self::Dword(v) => Some(*v),
            _ => None,
        }
    }

    /// Extract a 64-bit integer, widening a dword if needed.
    #[must_use]
    pub fn as_qword(&self) -> Option<u64> {
        match self {
            Self::Qword(v) => Some(*v),
            Self::Dword(v) => Some(u64::from(*v)),
            _ => None,
        }
    }

    /// Check whether the value carries any information at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::Bytes(b) => b.is_empty(),
            Self::Dword(_) | Self::Qword(_) => false,
        }
    }
}

/// Payload carried by a successful probe.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProbePayload {
    /// The probe succeeded but its data was folded through a typed path
    /// (status rows, identifier lists) rather than a scalar.
    #[default]
    None,
    /// A single text value.
    Text(String),
    /// A raw byte blob.
    Bytes(Vec<u8>),
    /// A 32-bit integer.
    Dword(u32),
}

/// Immutable result of one capability invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOutcome {
    /// Stable source tag, e.g. `"ACPI:MSDM"` or `"Registry:CurrentVersion"`.
    pub source_id: String,
    /// Whether the invocation succeeded.
    pub succeeded: bool,
    /// Payload of a successful invocation.
    pub payload: ProbePayload,
    /// Structured error of a failed invocation.
    pub error: Option<ProbeError>,
}

impl ProbeOutcome {
    /// Record a successful probe.
    pub fn success(source_id: impl Into<String>, payload: ProbePayload) -> Self {
        Self {
            source_id: source_id.into(),
            succeeded: true,
            payload,
            error: None,
        }
    }

    /// Record a failed probe.
    pub fn failure(source_id: impl Into<String>, error: ProbeError) -> Self {
        Self {
            source_id: source_id.into(),
            succeeded: false,
            payload: ProbePayload::None,
            error: Some(error),
        }
    }

}
