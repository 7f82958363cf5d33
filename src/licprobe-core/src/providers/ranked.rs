//! Fixed-priority fallback across interchangeable licensing libraries.
//!
//! Two native libraries expose the same surface; the newer one is absent
//! on older hosts and vice versa. Per operation the ranked wrapper walks
//! its providers in order and moves on only when a provider's backing
//! library is missing entirely. A provider that exists but fails a call
//! answers authoritatively, so real errors are never papered over by a
//! lower-ranked library.

use uuid::Uuid;

use crate::error::ProbeError;

use super::{GenuineState, LicensingApi, LicensingStatusRow, SlidType};

/// Ordered list of `(label, provider)` pairs behind one [`LicensingApi`].
pub struct RankedLicensingApi {
    providers: Vec<(String, Box<dyn LicensingApi>)>,
}

impl RankedLicensingApi {
    /// Build a ranked wrapper. Providers are tried in the given order.
    #[must_use]
    pub fn new(providers: Vec<(String, Box<dyn LicensingApi>)>) -> Self {
        Self { providers }
    }

    fn walk<T>(
        &self,
        mut call: impl FnMut(&dyn LicensingApi) -> Result<T, ProbeError>,
    ) -> Result<T, ProbeError> {
        let mut missing: Vec<String> = Vec::new();
        for (label, provider) in &self.providers {
            match call(provider.as_ref()) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_dependency_missing() => {
                    missing.push(format!("{label}: {err}"));
                }
                Err(err) => return Err(err),
            }
        }
        if missing.is_empty() {
            Err(ProbeError::unavailable("no licensing provider configured"))
        } else {
            Err(ProbeError::unavailable(missing.join("; ")))
        }
    }
}

impl LicensingApi for RankedLicensingApi {
    fn service_value(&self, name: &str) -> Result<String, ProbeError> {
        self.walk(|p| p.service_value(name))
    }

    fn host_value(&self, name: &str) -> Result<String, ProbeError> {
        self.walk(|p| p.host_value(name))
    }

    fn host_dword(&self, name: &str) -> Result<u32, ProbeError> {
        self.walk(|p| p.host_dword(name))
    }

    fn sku_value(&self, sku: Uuid, name: &str) -> Result<String, ProbeError> {
        self.walk(|p| p.sku_value(sku, name))
    }

    fn product_key_value(&self, pkey: Uuid, name: &str) -> Result<String, ProbeError> {
        self.walk(|p| p.product_key_value(pkey, name))
    }

    fn licensing_status(
        &self,
        app: Option<Uuid>,
        sku: Option<Uuid>,
    ) -> Result<Vec<LicensingStatusRow>, ProbeError> {
        self.walk(|p| p.licensing_status(app, sku))
    }

    fn slid_list(
        &self,
        query_type: SlidType,
        query_id: Uuid,
        result_type: SlidType,
    ) -> Result<Vec<Uuid>, ProbeError> {
        self.walk(|p| p.slid_list(query_type, query_id, result_type))
    }

    fn offline_installation_id(&self, sku: Uuid) -> Result<String, ProbeError> {
        self.walk(|p| p.offline_installation_id(sku))
    }

    fn genuine_state(&self, app: Uuid, sku: Option<Uuid>) -> Result<GenuineState, ProbeError> {
        self.walk(|p| p.genuine_state(app, sku))
    }
}
