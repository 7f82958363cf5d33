//! Capability provider traits.
//!
//! Concrete OS transports (firmware table reads, registry access,
//! instrumentation queries, the native licensing library, service state,
//! the external interpreter) sit behind these traits. The engine only
//! ever sees `Result<T, ProbeError>` and owned buffers; no borrowed
//! native memory and no panics cross this boundary.
//!
//! The crate ships [`UnsupportedProviders`] for hosts without a licensing
//! stack and [`ProcessInterpreter`] for the fallback step; embedders
//! supply OS-backed implementations of the rest.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cancel::CancellationToken;
use crate::error::ProbeError;
use crate::probe::ScalarValue;

mod process;
mod ranked;
mod stub;

pub use process::ProcessInterpreter;
pub use ranked::RankedLicensingApi;
pub use stub::UnsupportedProviders;

/// One row of a host-level or per-SKU licensing status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LicensingStatusRow {
    /// SKU the row describes.
    pub sku_id: Uuid,
    /// Raw status code.
    pub status: u32,
    /// Grace minutes remaining.
    pub grace_minutes: u32,
    /// Total grace period, in days.
    pub total_grace_days: u32,
    /// Reason code accompanying the status.
    pub reason: i32,
    /// Validity expiration as a raw 64-bit file time.
    pub validity_expiration: u64,
}

/// Genuine-state verdict from the native library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenuineState {
    /// The installation checks out.
    Genuine,
    /// The license is invalid.
    InvalidLicense,
    /// The installation has been tampered with.
    Tampered,
    /// The check could not be performed online.
    Offline,
}

impl GenuineState {
    /// Map the native numeric verdict.
    #[must_use]
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::Genuine),
            1 => Some(Self::InvalidLicense),
            2 => Some(Self::Tampered),
            3 => Some(Self::Offline),
            _ => None,
        }
    }
}

/// Identifier namespace for a licensing-identifier list query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlidType {
    /// Application family identifiers.
    Application,
    /// Product SKU identifiers.
    ProductSku,
    /// Installed license identifiers.
    License,
    /// Installed product-key identifiers.
    ProductKey,
}

/// Read-only access to firmware tables.
pub trait FirmwareTableReader: Send + Sync {
    /// Read a firmware table as an owned byte copy.
    ///
    /// `NotFound` when the table is absent on this host.
    fn read_table(&self, provider: u32, table: u32) -> Result<Vec<u8>, ProbeError>;
}

/// An opened registry key.
pub trait RegistryKey: Send + Sync {
    /// Fetch a value by name; `None` when the value is absent.
    fn get(&self, name: &str) -> Option<ScalarValue>;
}

/// Read-only access to the registry.
pub trait RegistryReader: Send + Sync {
    /// Open a key by path. `NotFound` when the key is absent.
    fn open(&self, path: &str) -> Result<Box<dyn RegistryKey>, ProbeError>;
}

/// A single instrumentation result row: property name to value.
pub type InstrumentationRow = BTreeMap<String, ScalarValue>;

/// Query interface over the host instrumentation layer.
pub trait InstrumentationQuery: Send + Sync {
    /// Run a query and return its rows.
    fn query(&self, selector: &str) -> Result<Vec<InstrumentationRow>, ProbeError>;
}

/// Read access to service-process state.
pub trait ServiceStateReader: Send + Sync {
    /// Current state of a named service ("Running", "Stopped", ...).
    fn state(&self, service_name: &str) -> Result<String, ProbeError>;
}

/// Surface of the native licensing library.
///
/// Mirrors the value-getter shape of the underlying API: string values,
/// dword values, per-SKU and per-key lookups, status rows, identifier
/// lists, and the genuine check.
pub trait LicensingApi: Send + Sync {
    /// String-shaped service-level value.
    fn service_value(&self, name: &str) -> Result<String, ProbeError>;

    /// String-shaped host-level value.
    fn host_value(&self, name: &str) -> Result<String, ProbeError>;

    /// Dword-shaped host-level value.
    fn host_dword(&self, name: &str) -> Result<u32, ProbeError>;

    /// String-shaped value attached to a SKU.
    fn sku_value(&self, sku: Uuid, name: &str) -> Result<String, ProbeError>;

    /// String-shaped value attached to an installed product key.
    fn product_key_value(&self, pkey: Uuid, name: &str) -> Result<String, ProbeError>;

    /// Status rows, optionally filtered by application family or SKU.
    fn licensing_status(
        &self,
        app: Option<Uuid>,
        sku: Option<Uuid>,
    ) -> Result<Vec<LicensingStatusRow>, ProbeError>;

    /// Identifiers of `result_type` related to `query_id` of `query_type`.
    fn slid_list(
        &self,
        query_type: SlidType,
        query_id: Uuid,
        result_type: SlidType,
    ) -> Result<Vec<Uuid>, ProbeError>;

    /// Offline installation id for a SKU.
    fn offline_installation_id(&self, sku: Uuid) -> Result<String, ProbeError>;

    /// Genuine verdict for an application family (or one SKU of it).
    fn genuine_state(&self, app: Uuid, sku: Option<Uuid>) -> Result<GenuineState, ProbeError>;
}

/// External interpreter used as a last-resort data source.
#[async_trait]
pub trait FallbackInterpreter: Send + Sync {
    /// Run the interpreter and return its stdout.
    ///
    /// Must terminate promptly (killing any child process) when `cancel`
    /// fires.
    async fn collect(&self, cancel: &CancellationToken) -> Result<String, ProbeError>;
}
