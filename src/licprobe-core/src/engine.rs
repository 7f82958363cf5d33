//! Probe orchestration.
//!
//! [`DiagnosticEngine::aggregate`] runs every probe in a fixed order and
//! folds each outcome into the report exactly once. No step aborts the
//! run: a failing probe contributes a provenance entry and a note, and
//! the run continues. Later steps never overwrite top-level scalar
//! fields an earlier step populated (first non-empty wins), which is
//! what makes the fixed order meaningful.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use regex::Regex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::cancel::CancellationToken;
use crate::config::EngineConfig;
use crate::decoder::decode_product_key;
use crate::error::{AggregateError, ProbeError};
use crate::fallback;
use crate::probe::{ProbeOutcome, ProbePayload, ScalarValue};
use crate::providers::{
    FallbackInterpreter, FirmwareTableReader, InstrumentationQuery, LicensingApi,
    LicensingStatusRow, RegistryReader, ServiceStateReader, SlidType, UnsupportedProviders,
};
use crate::report::{DiagnosticReport, LicenseEntry};
use crate::sensitivity::{mask_key, SensitivityPolicy};
use crate::status::{filetime_to_utc, product_type_description};

/// Dashed five-group product key shape, matched without regard to case.
static KEY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:[A-Z0-9]{5}-){4}[A-Z0-9]{5}").expect("key pattern is valid")
});

/// The capability providers one engine instance probes.
pub struct ProviderSet {
    /// Firmware table access.
    pub firmware: Box<dyn FirmwareTableReader>,
    /// Registry access.
    pub registry: Box<dyn RegistryReader>,
    /// Instrumentation query layer.
    pub instrumentation: Box<dyn InstrumentationQuery>,
    /// Service-process state access.
    pub services: Box<dyn ServiceStateReader>,
    /// Native licensing library (usually behind a ranked wrapper).
    pub licensing: Box<dyn LicensingApi>,
    /// External interpreter for the fallback step.
    pub fallback: Box<dyn FallbackInterpreter>,
}

impl ProviderSet {
    /// Provider set for hosts without a licensing stack: every probe
    /// reports unavailable.
    #[must_use]
    pub fn unsupported() -> Self {
        Self {
            firmware: Box::new(UnsupportedProviders),
            registry: Box::new(UnsupportedProviders),
            instrumentation: Box::new(UnsupportedProviders),
            services: Box::new(UnsupportedProviders),
            licensing: Box::new(UnsupportedProviders),
            fallback: Box::new(UnsupportedProviders),
        }
    }
}

/// Licensing diagnostic aggregation engine.
///
/// Stateless per call: every [`Self::aggregate`] run builds a fresh
/// report, and callers own run-replacement semantics.
pub struct DiagnosticEngine {
    providers: ProviderSet,
    config: EngineConfig,
}

impl DiagnosticEngine {
    /// Create an engine over a provider set with the default
    /// configuration.
    #[must_use]
    pub fn new(providers: ProviderSet) -> Self {
        Self::with_config(providers, EngineConfig::default())
    }

    /// Create an engine with an explicit configuration.
    #[must_use]
    pub fn with_config(providers: ProviderSet, config: EngineConfig) -> Self {
        Self { providers, config }
    }

    /// Run every probe and return the aggregated report.
    ///
    /// Individual probe failures degrade to provenance entries and
    /// notes; the only terminal failure is cancellation, which never
    /// yields a partial report.
    #[instrument(skip(self, cancel))]
    pub async fn aggregate(
        &self,
        allow_sensitive: bool,
        allow_fallback: bool,
        cancel: &CancellationToken,
    ) -> Result<DiagnosticReport, AggregateError> {
        let policy = SensitivityPolicy::new(allow_sensitive);
        let mut report = DiagnosticReport::default();

        let steps: [fn(&Self, &mut DiagnosticReport, &SensitivityPolicy); 9] = [
            Self::collect_firmware,
            Self::collect_version_registry,
            Self::collect_protection_registry,
            Self::collect_instrumentation_product,
            Self::collect_instrumentation_service,
            Self::collect_service_states,
            Self::collect_native_host,
            Self::collect_product_type,
            Self::collect_license_entries,
        ];
        for step in steps {
            if cancel.is_cancelled() {
                return Err(AggregateError::Cancelled);
            }
            step(self, &mut report, &policy);
        }

        if cancel.is_cancelled() {
            return Err(AggregateError::Cancelled);
        }
        if allow_fallback {
            self.collect_fallback(&mut report, cancel).await;
        } else {
            report.push_note("Interpreter fallback disabled by caller.".to_string());
        }
        if cancel.is_cancelled() {
            return Err(AggregateError::Cancelled);
        }

        debug!(
            sources = report.sources.len(),
            notes = report.notes.len(),
            "aggregation complete"
        );
        Ok(report)
    }

    /// Step 1: firmware activation table.
    fn collect_firmware(&self, report: &mut DiagnosticReport, policy: &SensitivityPolicy) {
        let source = "ACPI:MSDM";
        match self
            .providers
            .firmware
            .read_table(self.config.firmware_provider, self.config.firmware_table)
        {
            Ok(table) => {
                fold_success(report, source);
                if let Some(key) = extract_firmware_key(&table) {
                    report.firmware_key_masked = Some(mask_key(&key));
                    report.firmware_key = Some(policy.disclose(key));
                } else {
                    report.push_note(format!("{source}: table present but no key found."));
                }
                if policy.allows_sensitive() {
                    report.firmware_raw_base64 = Some(BASE64.encode(&table));
                }
            }
            Err(err) => fold_failure(report, source, &err),
        }
    }

    /// Step 2: base version registry key.
    fn collect_version_registry(&self, report: &mut DiagnosticReport, _policy: &SensitivityPolicy) {
        let source = "Registry:CurrentVersion";
        match self.providers.registry.open(&self.config.version_key_path) {
            Ok(key) => {
                fold_success(report, source);
                if let Some(v) = text_value(key.as_ref(), "ProductName") {
                    DiagnosticReport::fill_if_empty(&mut report.product_name, v);
                }
                if let Some(v) = text_value(key.as_ref(), "EditionID") {
                    DiagnosticReport::fill_if_empty(&mut report.edition, v);
                }
                if let Some(v) = text_value(key.as_ref(), "ProductId") {
                    DiagnosticReport::fill_if_empty(&mut report.product_id, v);
                }
                let build = text_value(key.as_ref(), "BuildLabEx")
                    .or_else(|| text_value(key.as_ref(), "CurrentBuild"));
                if let Some(v) = build {
                    DiagnosticReport::fill_if_empty(&mut report.build, v);
                }
                if let Some(v) = text_value(key.as_ref(), "InstallationType") {
                    DiagnosticReport::fill_if_empty(&mut report.installation_type, v);
                }
            }
            Err(err) => fold_failure(report, source, &err),
        }
    }

    /// Step 3: protection-platform registry branch.
    fn collect_protection_registry(
        &self,
        report: &mut DiagnosticReport,
        policy: &SensitivityPolicy,
    ) {
        let source = "Registry:SoftwareProtectionPlatform";
        match self
            .providers
            .registry
            .open(&self.config.protection_key_path)
        {
            Ok(key) => {
                fold_success(report, source);
                if let Some(v) = text_value(key.as_ref(), "BackupProductKeyDefault") {
                    report.original_product_key = Some(policy.disclose(v));
                }
                if let Some(blob) = key.get("DigitalProductId").and_then(|v| match v {
                    ScalarValue::Bytes(b) => Some(b),
                    _ => None,
                }) {
                    match decode_product_key(&blob) {
                        Some(decoded) => {
                            if let Some(last) = decoded.rsplit('-').next() {
                                DiagnosticReport::fill_if_empty(
                                    &mut report.partial_product_key,
                                    policy.disclose(last),
                                );
                            }
                            report.decoded_product_key = Some(policy.disclose(decoded));
                        }
                        None => {
                            report.push_note(format!(
                                "{source}: product-identifier blob too short to decode."
                            ));
                        }
                    }
                }
            }
            Err(err) => fold_failure(report, source, &err),
        }
        // Withheld is distinguishable from absent: when the gate is
        // closed these fields carry the marker even if the probe failed.
        if !policy.allows_sensitive() {
            report.original_product_key.get_or_insert_with(|| policy.hidden());
            report.decoded_product_key.get_or_insert_with(|| policy.hidden());
        }
    }

    /// Step 4: instrumentation product rows.
    fn collect_instrumentation_product(
        &self,
        report: &mut DiagnosticReport,
        policy: &SensitivityPolicy,
    ) {
        let source = "WMI:SoftwareLicensingProduct";
        match self.providers.instrumentation.query("SoftwareLicensingProduct") {
            Ok(rows) => {
                fold_success(report, source);
                let keyed = rows.iter().find(|row| {
                    row.get("PartialProductKey")
                        .and_then(ScalarValue::as_text)
                        .is_some_and(|v| !v.trim().is_empty())
                });
                if let Some(row) = keyed {
                    if let Some(partial) =
                        row.get("PartialProductKey").and_then(ScalarValue::as_text)
                    {
                        DiagnosticReport::fill_if_empty(
                            &mut report.partial_product_key,
                            policy.disclose(partial),
                        );
                    }
                    if let Some(code) = row.get("LicenseStatus").and_then(ScalarValue::as_dword) {
                        report.default_status(code as i32);
                    }
                }
            }
            Err(err) => fold_failure(report, source, &err),
        }
    }

    /// Step 5: instrumentation service row, reported as notes.
    fn collect_instrumentation_service(
        &self,
        report: &mut DiagnosticReport,
        policy: &SensitivityPolicy,
    ) {
        let source = "WMI:SoftwareLicensingService";
        match self.providers.instrumentation.query("SoftwareLicensingService") {
            Ok(rows) => {
                fold_success(report, source);
                let Some(row) = rows.first() else { return };
                for name in ["TrustedTime", "EvaluationEndDate", "UXDifferentiator"] {
                    if let Some(v) = row.get(name).and_then(ScalarValue::as_text) {
                        if !v.trim().is_empty() {
                            report.push_note(format!("{name}: {v}"));
                        }
                    }
                }
                for name in ["RemainingWindowsReArmCount", "RemainingSkuReArmCount"] {
                    if let Some(v) = row.get(name).and_then(ScalarValue::as_dword) {
                        report.push_note(format!("{name}: {v}"));
                    }
                }
                if let Some(v) = row.get("OfflineInstallationId").and_then(ScalarValue::as_text) {
                    if !v.trim().is_empty() {
                        report.push_note(format!("OfflineInstallationId: {}", policy.disclose(v)));
                    }
                }
            }
            Err(err) => fold_failure(report, source, &err),
        }
    }

    /// Step 6: licensing service process states.
    fn collect_service_states(&self, report: &mut DiagnosticReport, _policy: &SensitivityPolicy) {
        for name in &self.config.service_names {
            let source = format!("Service:{name}");
            match self.providers.services.state(name) {
                Ok(state) => {
                    fold_success(report, &source);
                    report.push_note(format!("Service {name}: {state}"));
                }
                Err(err) => fold_failure(report, &source, &err),
            }
        }
    }

    /// Step 7: native-library host queries.
    fn collect_native_host(&self, report: &mut DiagnosticReport, policy: &SensitivityPolicy) {
        let api = self.providers.licensing.as_ref();

        match api.service_value("Version") {
            Ok(version) => {
                fold_success(report, "SL:Service");
                report.push_note(format!("Licensing service version: {version}"));
            }
            Err(err) => fold_failure(report, "SL:Service", &err),
        }

        let mut host_hits = 0usize;
        let mut host_err: Option<ProbeError> = None;
        for field in &self.config.host_info_fields {
            match api.host_value(&field.name) {
                Ok(value) if !value.trim().is_empty() => {
                    host_hits += 1;
                    let shown = if field.sensitive {
                        policy.disclose(value)
                    } else {
                        value
                    };
                    report.push_note(format!("{}: {shown}", field.name));
                }
                Ok(_) => host_hits += 1,
                Err(err) => {
                    if host_err.is_none() {
                        host_err = Some(err);
                    }
                }
            }
        }
        if host_hits > 0 {
            fold_success(report, "SL:HostInfo");
        } else if let Some(err) = host_err {
            fold_failure(report, "SL:HostInfo", &err);
        }

        match api.host_dword(&self.config.rearm_value) {
            Ok(count) => {
                fold_success(report, "SL:Rearm");
                report.push_note(format!("{}: {count}", self.config.rearm_value));
            }
            Err(err) => fold_failure(report, "SL:Rearm", &err),
        }

        match api.licensing_status(None, None) {
            Ok(rows) => {
                fold_success(report, "SL:Status");
                if let Some(row) = rows.first() {
                    report.default_status(row.status as i32);
                }
            }
            Err(err) => fold_failure(report, "SL:Status", &err),
        }

        if let Some(family) = self.config.app_families.first() {
            match api.genuine_state(family.app_id, None) {
                Ok(state) => {
                    fold_success(report, "SL:Genuine");
                    report.genuine_state = Some(state);
                }
                Err(err) => fold_failure(report, "SL:Genuine", &err),
            }
        }
    }

    /// Step 8: product-type code and description.
    fn collect_product_type(&self, report: &mut DiagnosticReport, _policy: &SensitivityPolicy) {
        let source = "SL:ProductInfo";
        match self.providers.licensing.host_dword("Kernel-ProductInfo") {
            Ok(code) => {
                fold_success(report, source);
                report.product_type_code = Some(code);
                report.product_type = Some(product_type_description(code).to_string());
            }
            Err(err) => fold_failure(report, source, &err),
        }
    }

    /// Step 9: per-family license-entry enumeration.
    ///
    /// Families sharing one report group (the Office pair) are judged
    /// empty only after every pass has run, so a later family can still
    /// fill the group.
    fn collect_license_entries(&self, report: &mut DiagnosticReport, policy: &SensitivityPolicy) {
        let mut probed_groups: Vec<&str> = Vec::new();
        for family in &self.config.app_families {
            let source = format!("SL:Licenses:{}", family.group);
            let skus = match self.providers.licensing.slid_list(
                SlidType::Application,
                family.app_id,
                SlidType::ProductSku,
            ) {
                Ok(skus) => skus,
                Err(err) => {
                    fold_failure(report, &source, &err);
                    continue;
                }
            };
            fold_success(report, &source);
            if !probed_groups.contains(&family.group.as_str()) {
                probed_groups.push(&family.group);
            }

            let status_rows: BTreeMap<Uuid, LicensingStatusRow> = self
                .providers
                .licensing
                .licensing_status(Some(family.app_id), None)
                .map(|rows| rows.into_iter().map(|r| (r.sku_id, r)).collect())
                .unwrap_or_default();

            for sku in skus {
                let entry = self.build_entry(family, sku, &status_rows, policy);
                report
                    .licenses
                    .entry(family.group.clone())
                    .or_default()
                    .push(entry);
            }
        }
        for group in probed_groups {
            if !report.licenses.contains_key(group) {
                report.push_note(format!("No license entries found for the {group} family."));
            }
        }
    }

    fn build_entry(
        &self,
        family: &crate::config::AppFamily,
        sku: Uuid,
        status_rows: &BTreeMap<Uuid, LicensingStatusRow>,
        policy: &SensitivityPolicy,
    ) -> LicenseEntry {
        let api = self.providers.licensing.as_ref();
        let mut entry = LicenseEntry::new(sku);

        entry.name = api.sku_value(sku, "Name").ok().filter(|v| !v.is_empty());
        entry.description = api
            .sku_value(sku, "Description")
            .ok()
            .filter(|v| !v.is_empty());
        entry.is_addon = api
            .sku_value(sku, "Dependency")
            .is_ok_and(|v| !v.trim().is_empty());
        // Any non-empty value means phone activation is offered.
        entry.phone_activation_available = api
            .sku_value(sku, "msft:sl/EUL/PHONE/PUBLIC")
            .ok()
            .map(|v| !v.trim().is_empty());

        let pkey = api
            .sku_value(sku, "pkeyId")
            .ok()
            .and_then(|v| Uuid::parse_str(v.trim()).ok());
        if let Some(pkey) = pkey {
            if let Ok(partial) = api.product_key_value(pkey, "PartialProductKey") {
                entry.partial_product_key = Some(policy.disclose(partial));
            }
            if let Ok(channel) = api.product_key_value(pkey, "Channel") {
                entry.product_key_channel = Some(policy.disclose(channel));
            }
            if policy.allows_sensitive() {
                entry.extended_product_id = api.product_key_value(pkey, "DigitalPID").ok();
                entry.product_id = api.product_key_value(pkey, "DigitalPID2").ok();
            } else {
                entry.extended_product_id = Some(policy.hidden());
                entry.product_id = Some(policy.hidden());
            }
        }

        if policy.allows_sensitive() {
            entry.offline_installation_id = api.offline_installation_id(sku).ok();
        } else {
            entry.offline_installation_id = Some(policy.hidden());
        }

        match status_rows.get(&sku) {
            Some(row) => {
                let state = entry.apply_status(row.status as i32, row.reason);
                entry.apply_grace(row.grace_minutes, state);
                if row.validity_expiration != 0 {
                    match filetime_to_utc(row.validity_expiration) {
                        Some(expiry) => entry.evaluation_expiry = Some(expiry.fixed_offset()),
                        None => entry.push_note(
                            "Validity expiration was out of the representable range.".to_string(),
                        ),
                    }
                }
            }
            None if !status_rows.is_empty() => {
                entry.status = Some("Unknown".to_string());
                entry.push_note(
                    "SKU was absent from the licensing status results.".to_string(),
                );
            }
            None => {}
        }

        if entry.name.is_none() && entry.description.is_none() {
            entry.name = Some(format!("{} product {}", family.group, sku));
        }
        entry
    }

    /// Step 10: external-interpreter fallback, filling only still-empty
    /// fields.
    async fn collect_fallback(&self, report: &mut DiagnosticReport, cancel: &CancellationToken) {
        let source = "Fallback:Interpreter";
        match self.providers.fallback.collect(cancel).await {
            Ok(stdout) => match fallback::parse_output(&stdout) {
                Ok(payload) => {
                    fold_success(report, source);
                    fallback::apply(report, &payload);
                }
                Err(err) => fold_failure(report, source, &err),
            },
            Err(err) => {
                if !cancel.is_cancelled() {
                    fold_failure(report, source, &err);
                }
            }
        }
    }
}

fn text_value(key: &dyn crate::providers::RegistryKey, name: &str) -> Option<String> {
    key.get(name)
        .and_then(|v| v.as_text().map(str::to_string))
        .filter(|v| !v.trim().is_empty())
}

/// Fold one probe outcome into the report.
///
/// Success contributes its source id; failure contributes a suffixed
/// source id plus a note. This is the only place outcomes touch the
/// report, so no two probe steps ever share mutable state.
fn fold_outcome(report: &mut DiagnosticReport, outcome: ProbeOutcome) {
    match outcome.error {
        None => report.add_source(outcome.source_id),
        Some(err) => {
            let suffix = if matches!(err, ProbeError::NotFound { .. }) {
                "NotFound"
            } else {
                "Error"
            };
            warn!(source = %outcome.source_id, error = %err, "probe failed");
            report.add_source(format!("{}:{suffix}", outcome.source_id));
            report.push_note(format!("{}: {err}", outcome.source_id));
        }
    }
}

fn fold_success(report: &mut DiagnosticReport, source: &str) {
    fold_outcome(report, ProbeOutcome::success(source, ProbePayload::None));
}

fn fold_failure(report: &mut DiagnosticReport, source: &str, err: &ProbeError) {
    fold_outcome(report, ProbeOutcome::failure(source, err.clone()));
}

/// Scan a firmware table for an embedded product key.
///
/// Works on the printable-ASCII projection of the raw bytes so the
/// surrounding binary header never confuses the pattern.
fn extract_firmware_key(table: &[u8]) -> Option<String> {
    let projected: String = table
        .iter()
        .map(|&b| {
            if (0x20..0x7F).contains(&b) {
                char::from(b)
            } else {
                '.'
            }
        })
        .collect();
    KEY_PATTERN
        .find(&projected)
        .map(|m| m.as_str().to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn firmware_key_is_found_inside_binary_noise() {
        let mut table = vec![0u8; 36];
        table.extend_from_slice(b"MSDM....");
        table.extend_from_slice(b"ABCDE-FGHJK-MPQRT-VWXY2-34678");
        table.extend_from_slice(&[0xFF, 0x00, 0x07]);
        assert_eq!(
            extract_firmware_key(&table).as_deref(),
            Some("ABCDE-FGHJK-MPQRT-VWXY2-34678")
        );
    }

    #[test]
    fn tables_without_a_key_yield_none() {
        assert_eq!(extract_firmware_key(&[0u8; 128]), None);
        assert_eq!(extract_firmware_key(b"ABCDE-FGHJK-MPQRT"), None);
    }

    #[test]
    fn lower_case_table_text_still_matches() {
        assert_eq!(
            extract_firmware_key(b"abcde-fghjk-mpqrt-vwxy2-34678").as_deref(),
            Some("ABCDE-FGHJK-MPQRT-VWXY2-34678")
        );
    }

    #[test]
    fn failure_suffix_distinguishes_absence() {
        let mut report = DiagnosticReport::default();
        fold_failure(&mut report, "ACPI:MSDM", &ProbeError::not_found("table"));
        fold_failure(&mut report, "SL:Status", &ProbeError::unavailable("lib"));
        assert_eq!(report.sources, vec!["ACPI:MSDM:NotFound", "SL:Status:Error"]);
        assert_eq!(report.notes.len(), 2);
    }
}
