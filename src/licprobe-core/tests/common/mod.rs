//! Configurable fixture providers for integration tests.

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use licprobe_core::cancel::CancellationToken;
use licprobe_core::engine::ProviderSet;
use licprobe_core::probe::ScalarValue;
use licprobe_core::providers::{
    FallbackInterpreter, FirmwareTableReader, GenuineState, InstrumentationQuery,
    InstrumentationRow, LicensingApi, LicensingStatusRow, RegistryKey, RegistryReader,
    ServiceStateReader, SlidType, UnsupportedProviders,
};
use licprobe_core::ProbeError;

/// Firmware reader returning one canned table (or error).
pub struct FixtureFirmware {
    pub table: Result<Vec<u8>, ProbeError>,
}

impl FixtureFirmware {
    pub fn with_key(key: &str) -> Self {
        let mut table = vec![0u8; 36];
        table.extend_from_slice(b"MSDM");
        table.extend_from_slice(key.as_bytes());
        table.extend_from_slice(&[0x00, 0xFF]);
        Self { table: Ok(table) }
    }
}

impl FirmwareTableReader for FixtureFirmware {
    fn read_table(&self, _provider: u32, _table: u32) -> Result<Vec<u8>, ProbeError> {
        self.table.clone()
    }
}

/// Registry backed by nested maps; unknown paths report errors.
#[derive(Default)]
pub struct FixtureRegistry {
    pub keys: HashMap<String, HashMap<String, ScalarValue>>,
    pub errors: HashMap<String, ProbeError>,
}

impl FixtureRegistry {
    pub fn with_key(mut self, path: &str, values: &[(&str, ScalarValue)]) -> Self {
        self.keys.insert(
            path.to_string(),
            values
                .iter()
                .map(|(n, v)| ((*n).to_string(), v.clone()))
                .collect(),
        );
        self
    }

    pub fn with_error(mut self, path: &str, error: ProbeError) -> Self {
        self.errors.insert(path.to_string(), error);
        self
    }
}

struct FixtureKey {
    values: HashMap<String, ScalarValue>,
}

impl RegistryKey for FixtureKey {
    fn get(&self, name: &str) -> Option<ScalarValue> {
        self.values.get(name).cloned()
    }
}

impl RegistryReader for FixtureRegistry {
    fn open(&self, path: &str) -> Result<Box<dyn RegistryKey>, ProbeError> {
        if let Some(err) = self.errors.get(path) {
            return Err(err.clone());
        }
        match self.keys.get(path) {
            Some(values) => Ok(Box::new(FixtureKey {
                values: values.clone(),
            })),
            None => Err(ProbeError::not_found(format!("registry key {path}"))),
        }
    }
}

/// Instrumentation layer returning canned rows per selector.
#[derive(Default)]
pub struct FixtureInstrumentation {
    pub rows: HashMap<String, Vec<InstrumentationRow>>,
}

impl FixtureInstrumentation {
    pub fn with_rows(mut self, selector: &str, rows: Vec<InstrumentationRow>) -> Self {
        self.rows.insert(selector.to_string(), rows);
        self
    }
}

impl InstrumentationQuery for FixtureInstrumentation {
    fn query(&self, selector: &str) -> Result<Vec<InstrumentationRow>, ProbeError> {
        self.rows
            .get(selector)
            .cloned()
            .ok_or_else(|| ProbeError::unavailable(format!("no fixture for {selector}")))
    }
}

/// Service-state reader backed by a map.
#[derive(Default)]
pub struct FixtureServices {
    pub states: HashMap<String, String>,
}

impl FixtureServices {
    pub fn with_state(mut self, name: &str, state: &str) -> Self {
        self.states.insert(name.to_string(), state.to_string());
        self
    }
}

impl ServiceStateReader for FixtureServices {
    fn state(&self, service_name: &str) -> Result<String, ProbeError> {
        self.states
            .get(service_name)
            .cloned()
            .ok_or_else(|| ProbeError::not_found(format!("service {service_name}")))
    }
}

/// Licensing library with canned SKU lists, status rows, and values.
#[derive(Default)]
pub struct FixtureLicensing {
    pub skus_by_app: HashMap<Uuid, Vec<Uuid>>,
    pub status_by_app: HashMap<Uuid, Vec<LicensingStatusRow>>,
    pub host_status: Vec<LicensingStatusRow>,
    pub sku_values: HashMap<(Uuid, String), String>,
    pub pkey_values: HashMap<(Uuid, String), String>,
    pub host_values: HashMap<String, String>,
    pub host_dwords: HashMap<String, u32>,
    pub service_values: HashMap<String, String>,
    pub offline_ids: HashMap<Uuid, String>,
    pub genuine: Option<GenuineState>,
}

impl FixtureLicensing {
    pub fn with_sku(mut self, app: Uuid, sku: Uuid) -> Self {
        self.skus_by_app.entry(app).or_default().push(sku);
        self
    }

    pub fn with_status_row(mut self, app: Uuid, row: LicensingStatusRow) -> Self {
        self.status_by_app.entry(app).or_default().push(row);
        self
    }

    pub fn with_sku_value(mut self, sku: Uuid, name: &str, value: &str) -> Self {
        self.sku_values
            .insert((sku, name.to_string()), value.to_string());
        self
    }

    pub fn with_pkey_value(mut self, pkey: Uuid, name: &str, value: &str) -> Self {
        self.pkey_values
            .insert((pkey, name.to_string()), value.to_string());
        self
    }
}

impl LicensingApi for FixtureLicensing {
    fn service_value(&self, name: &str) -> Result<String, ProbeError> {
        self.service_values
            .get(name)
            .cloned()
            .ok_or_else(|| ProbeError::unavailable("no licensing library fixture"))
    }

    fn host_value(&self, name: &str) -> Result<String, ProbeError> {
        self.host_values
            .get(name)
            .cloned()
            .ok_or_else(|| ProbeError::not_found(format!("host value {name}")))
    }

    fn host_dword(&self, name: &str) -> Result<u32, ProbeError> {
        self.host_dwords
            .get(name)
            .copied()
            .ok_or_else(|| ProbeError::not_found(format!("host dword {name}")))
    }

    fn sku_value(&self, sku: Uuid, name: &str) -> Result<String, ProbeError> {
        self.sku_values
            .get(&(sku, name.to_string()))
            .cloned()
            .ok_or_else(|| ProbeError::not_found(format!("sku value {name}")))
    }

    fn product_key_value(&self, pkey: Uuid, name: &str) -> Result<String, ProbeError> {
        self.pkey_values
            .get(&(pkey, name.to_string()))
            .cloned()
            .ok_or_else(|| ProbeError::not_found(format!("pkey value {name}")))
    }

    fn licensing_status(
        &self,
        app: Option<Uuid>,
        _sku: Option<Uuid>,
    ) -> Result<Vec<LicensingStatusRow>, ProbeError> {
        match app {
            Some(app) => Ok(self.status_by_app.get(&app).cloned().unwrap_or_default()),
            None => Ok(self.host_status.clone()),
        }
    }

    fn slid_list(
        &self,
        _query_type: SlidType,
        query_id: Uuid,
        _result_type: SlidType,
    ) -> Result<Vec<Uuid>, ProbeError> {
        Ok(self.skus_by_app.get(&query_id).cloned().unwrap_or_default())
    }

    fn offline_installation_id(&self, sku: Uuid) -> Result<String, ProbeError> {
        self.offline_ids
            .get(&sku)
            .cloned()
            .ok_or_else(|| ProbeError::not_found("offline installation id"))
    }

    fn genuine_state(&self, _app: Uuid, _sku: Option<Uuid>) -> Result<GenuineState, ProbeError> {
        self.genuine
            .ok_or_else(|| ProbeError::unavailable("genuine check fixture unset"))
    }
}

/// Fallback returning canned stdout.
pub struct FixtureFallback {
    pub stdout: Result<String, ProbeError>,
}

#[async_trait]
impl FallbackInterpreter for FixtureFallback {
    async fn collect(&self, _cancel: &CancellationToken) -> Result<String, ProbeError> {
        self.stdout.clone()
    }
}

/// Fallback that only returns once the run is cancelled, like a child
/// process that never exits on its own.
pub struct BlockingFallback;

#[async_trait]
impl FallbackInterpreter for BlockingFallback {
    async fn collect(&self, cancel: &CancellationToken) -> Result<String, ProbeError> {
        cancel.cancelled().await;
        Err(ProbeError::unavailable("interpreter run cancelled"))
    }
}

/// Provider set where everything is unavailable.
pub fn unsupported_set() -> ProviderSet {
    ProviderSet::unsupported()
}

/// Provider set with the given licensing fixture and everything else
/// unavailable.
pub fn licensing_only(licensing: FixtureLicensing) -> ProviderSet {
    ProviderSet {
        firmware: Box::new(UnsupportedProviders),
        registry: Box::new(UnsupportedProviders),
        instrumentation: Box::new(UnsupportedProviders),
        services: Box::new(UnsupportedProviders),
        licensing: Box::new(licensing),
        fallback: Box::new(UnsupportedProviders),
    }
}
