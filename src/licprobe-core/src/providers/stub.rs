//! Portable provider set for hosts without a licensing stack.
//!
//! Every probe reports [`ProbeError::Unavailable`], which the engine
//! folds into provenance and notes. Running the engine against this set
//! is legitimate — it produces an honest "nothing to see here" report
//! rather than failing — and it is what the CLI uses on non-Windows
//! hosts.

use async_trait::async_trait;
use uuid::Uuid;

use crate::cancel::CancellationToken;
use crate::error::ProbeError;

use super::{
    FallbackInterpreter, FirmwareTableReader, GenuineState, InstrumentationQuery,
    InstrumentationRow, LicensingApi, LicensingStatusRow, RegistryKey, RegistryReader,
    ServiceStateReader, SlidType,
};

/// Provider set that reports every capability as unavailable.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedProviders;

impl UnsupportedProviders {
    fn unavailable<T>(what: &str) -> Result<T, ProbeError> {
        Err(ProbeError::unavailable(format!(
            "{what} is not supported on this host"
        )))
    }
}

impl FirmwareTableReader for UnsupportedProviders {
    fn read_table(&self, _provider: u32, _table: u32) -> Result<Vec<u8>, ProbeError> {
        Self::unavailable("firmware table access")
    }
}

impl RegistryReader for UnsupportedProviders {
    fn open(&self, _path: &str) -> Result<Box<dyn RegistryKey>, ProbeError> {
        Self::unavailable("registry access")
    }
}

impl InstrumentationQuery for UnsupportedProviders {
    fn query(&self, _selector: &str) -> Result<Vec<InstrumentationRow>, ProbeError> {
        Self::unavailable("instrumentation queries")
    }
}

impl ServiceStateReader for UnsupportedProviders {
    fn state(&self, _service_name: &str) -> Result<String, ProbeError> {
        Self::unavailable("service state access")
    }
}

impl LicensingApi for UnsupportedProviders {
    fn service_value(&self, _name: &str) -> Result<String, ProbeError> {
        Self::unavailable("the licensing library")
    }

    fn host_value(&self, _name: &str) -> Result<String, ProbeError> {
        Self::unavailable("the licensing library")
    }

    fn host_dword(&self, _name: &str) -> Result<u32, ProbeError> {
        Self::unavailable("the licensing library")
    }

    fn sku_value(&self, _sku: Uuid, _name: &str) -> Result<String, ProbeError> {
        Self::unavailable("the licensing library")
    }

    fn product_key_value(&self, _pkey: Uuid, _name: &str) -> Result<String, ProbeError> {
        Self::unavailable("the licensing library")
    }

    fn licensing_status(
        &self,
        _app: Option<Uuid>,
        _sku: Option<Uuid>,
    ) -> Result<Vec<LicensingStatusRow>, ProbeError> {
        Self::unavailable("the licensing library")
    }

    fn slid_list(
        &self,
        _query_type: SlidType,
        _query_id: Uuid,
        _result_type: SlidType,
    ) -> Result<Vec<Uuid>, ProbeError> {
        Self::unavailable("the licensing library")
    }

    fn offline_installation_id(&self, _sku: Uuid) -> Result<String, ProbeError> {
        Self::unavailable("the licensing library")
    }

    fn genuine_state(&self, _app: Uuid, _sku: Option<Uuid>) -> Result<GenuineState, ProbeError> {
        Self::unavailable("the licensing library")
    }
}

#[async_trait]
impl FallbackInterpreter for UnsupportedProviders {
    async fn collect(&self, _cancel: &CancellationToken) -> Result<String, ProbeError> {
        Self::unavailable("the fallback interpreter")
    }
}
