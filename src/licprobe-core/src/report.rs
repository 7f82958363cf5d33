//! Diagnostic report artifact.
//!
//! The report is built by exactly one aggregation run and returned by
//! value; nothing in here is shared across runs. Serialization omits
//! absent fields so a degraded run produces a small, honest document
//! rather than a wall of nulls.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sensitivity::is_disclosed_secret;
use crate::status::{self, LicenseState};

/// One licensed SKU within an application family.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LicenseEntry {
    /// Activation identifier of the SKU.
    pub activation_id: Uuid,
    /// Product name, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Product description, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Licensing channel (Retail, OEM, Volume...). Gated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_key_channel: Option<String>,
    /// Last five characters of the installed key. Gated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_product_key: Option<String>,
    /// Extended product identifier. Gated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_product_id: Option<String>,
    /// Product identifier. Gated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// Offline installation identifier. Gated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offline_installation_id: Option<String>,
    /// Raw status code as the native library reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_status_code: Option<i32>,
    /// Reason code accompanying the raw status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason_code: Option<i32>,
    /// Canonical status code after normalization.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalized_status_code: Option<i32>,
    /// Label of the normalized status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Grace/expiration message for this entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
    /// Grace time remaining, in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_minutes: Option<u32>,
    /// Grace time remaining, in whole days.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_days: Option<u32>,
    /// Moment the grace window closes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_expiry: Option<DateTime<Utc>>,
    /// Validity expiration reported by the native library.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evaluation_expiry: Option<DateTime<FixedOffset>>,
    /// Whether this SKU is an add-on rather than a base license.
    #[serde(default)]
    pub is_addon: bool,
    /// Whether phone activation is offered for this SKU.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_activation_available: Option<bool>,
    /// Free-form notes attached to this entry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl LicenseEntry {
    /// Create an entry for an activation id with everything else unset.
    #[must_use]
    pub fn new(activation_id: Uuid) -> Self {
        Self {
            activation_id,
            ..Self::default()
        }
    }

    /// Apply a raw `(status, reason)` pair.
    ///
    /// The only path that writes the normalized status fields, so they
    /// can never disagree with the raw pair they were derived from.
    /// Returns the normalized state for follow-up decisions.
    pub fn apply_status(&mut self, raw_status: i32, reason: i32) -> LicenseState {
        let state = status::normalize(raw_status, reason);
        self.raw_status_code = Some(raw_status);
        self.reason_code = Some(reason);
        self.normalized_status_code = Some(state.code());
        self.status = Some(state.label());
        self.notes.extend(status::reason_notes(state, reason));
        state
    }

    /// Apply a remaining-grace value, deriving days, expiry, and the
    /// status message.
    pub fn apply_grace(&mut self, minutes: u32, state: LicenseState) {
        if let Some(fields) = status::grace_fields(minutes, state) {
            self.grace_minutes = Some(minutes);
            self.grace_days = Some(fields.days);
            self.grace_expiry = Some(fields.expiry);
            self.status_message = Some(fields.message);
        }
    }

    /// Append a note.
    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    fn secret_fields(&self) -> [&Option<String>; 5] {
        [
            &self.product_key_channel,
            &self.partial_product_key,
            &self.extended_product_id,
            &self.product_id,
            &self.offline_installation_id,
        ]
    }
}

/// Aggregated licensing diagnostic report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    /// Installed product name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    /// Product edition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
    /// OS build string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<String>,
    /// Installation type (Client, Server Core...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_type: Option<String>,
    /// Product identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// Firmware-embedded product key. Gated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_key: Option<String>,
    /// Masked form of the firmware key. Always safe to display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_key_masked: Option<String>,
    /// Raw firmware table dump, base64. Only present when sensitive
    /// disclosure was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub firmware_raw_base64: Option<String>,
    /// OEM original product key from the registry. Gated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_product_key: Option<String>,
    /// Key decoded from the registry product-identifier blob. Gated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decoded_product_key: Option<String>,
    /// Partial product key. Gated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partial_product_key: Option<String>,
    /// Numeric product-type code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type_code: Option<u32>,
    /// Description for the product-type code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    /// Top-level license status code (simple linear map).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_status_code: Option<i32>,
    /// Top-level license status label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_status: Option<String>,
    /// Genuine-state verdict from the native library.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genuine_state: Option<crate::providers::GenuineState>,
    /// License entries grouped by application family.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub licenses: BTreeMap<String, Vec<LicenseEntry>>,
    /// Ordered provenance of every probe that ran.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    /// Run-level notes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl DiagnosticReport {
    /// Record a provenance source.
    ///
    /// Order of first appearance is preserved; repeats are dropped
    /// case-insensitively.
    pub fn add_source(&mut self, source: impl Into<String>) {
        let source = source.into();
        let lowered = source.to_ascii_lowercase();
        if !self
            .sources
            .iter()
            .any(|s| s.to_ascii_lowercase() == lowered)
        {
            self.sources.push(source);
        }
    }

    /// Append a run-level note.
    pub fn push_note(&mut self, note: impl Into<String>) {
        self.notes.push(note.into());
    }

    /// Set a top-level text field only if it is still empty.
    ///
    /// First-non-empty-wins merging for scalar fields probed by more
    /// than one source.
    pub fn fill_if_empty(field: &mut Option<String>, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            return;
        }
        let empty = field.as_deref().is_none_or(|v| v.trim().is_empty());
        if empty {
            *field = Some(value);
        }
    }

    /// Set the top-level status pair from a simple status code, only if
    /// still unset.
    pub fn default_status(&mut self, code: i32) {
        if self.license_status_code.is_none() {
            self.license_status_code = Some(code);
            self.license_status = Some(status::simple_status_label(code));
        }
    }

    /// Whether any sensitive field was actually disclosed.
    ///
    /// Computed, never stored: the hidden marker and masked variants do
    /// not count, so a redacted report answers false.
    #[must_use]
    pub fn contains_sensitive_data(&self) -> bool {
        let top_level = [
            &self.firmware_key,
            &self.firmware_raw_base64,
            &self.original_product_key,
            &self.decoded_product_key,
            &self.partial_product_key,
        ];
        if top_level
            .iter()
            .any(|f| f.as_deref().is_some_and(is_disclosed_secret))
        {
            return true;
        }
        self.licenses.values().flatten().any(|entry| {
            entry
                .secret_fields()
                .iter()
                .any(|f| f.as_deref().is_some_and(is_disclosed_secret))
        })
    }
}
