//! Engine configuration.
//!
//! Everything here is data, not behavior: registry paths, application
//! family identifiers, the host-information value names the native
//! library is asked for, and the interpreter candidates for the fallback
//! step. Defaults mirror the conventional licensing stack layout;
//! embedders with unusual hosts can override any of it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Application family to enumerate license entries for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppFamily {
    /// Application identifier passed to the native library.
    pub app_id: Uuid,
    /// Report group this family's entries are filed under.
    pub group: String,
}

/// A host-information value name and whether its value is sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostInfoField {
    /// Value name passed to the native library.
    pub name: String,
    /// Whether the value goes through the sensitivity gate.
    pub sensitive: bool,
}

/// Static configuration for one [`crate::engine::DiagnosticEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Firmware table provider signature (four ASCII bytes).
    pub firmware_provider: u32,
    /// Firmware table id (four ASCII bytes).
    pub firmware_table: u32,
    /// Base version registry path.
    pub version_key_path: String,
    /// Protection-platform registry path.
    pub protection_key_path: String,
    /// Application families enumerated in order.
    pub app_families: Vec<AppFamily>,
    /// Host-information value names queried from the native library.
    pub host_info_fields: Vec<HostInfoField>,
    /// Value name for the remaining rearm counter.
    pub rearm_value: String,
    /// Licensing service process names checked in order.
    pub service_names: Vec<String>,
    /// Interpreter executables tried in order for the fallback step.
    pub interpreter_candidates: Vec<String>,
}

// 'ACPI' and 'MSDM' as little-endian u32 signatures.
const PROVIDER_ACPI: u32 = u32::from_le_bytes(*b"ACPI");
const TABLE_MSDM: u32 = u32::from_le_bytes(*b"MSDM");

/// Windows application family identifier.
const APP_WINDOWS: Uuid = Uuid::from_u128(0x55C9_2734_D682_4D71_983E_D6EC_3F16_059F);
/// Office 2013+ application family identifier.
const APP_OFFICE15: Uuid = Uuid::from_u128(0x0FF1_CE15_A989_479D_AF46_F275_C637_0663);
/// Office 2010 application family identifier.
const APP_OFFICE14: Uuid = Uuid::from_u128(0x59A5_2881_A989_479D_AF46_F275_C637_0663);

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            firmware_provider: PROVIDER_ACPI,
            firmware_table: TABLE_MSDM,
            version_key_path: r"SOFTWARE\Microsoft\Windows NT\CurrentVersion".to_string(),
            protection_key_path: r"SOFTWARE\Microsoft\Windows NT\CurrentVersion\SoftwareProtectionPlatform".to_string(),
            app_families: vec![
                AppFamily {
                    app_id: APP_WINDOWS,
                    group: "Windows".to_string(),
                },
                AppFamily {
                    app_id: APP_OFFICE15,
                    group: "Office".to_string(),
                },
                AppFamily {
                    app_id: APP_OFFICE14,
                    group: "Office".to_string(),
                },
            ],
            host_info_fields: vec![
                HostInfoField {
                    name: "OfflineInstallationId".to_string(),
                    sensitive: true,
                },
                HostInfoField {
                    name: "TrustedTime".to_string(),
                    sensitive: false,
                },
                HostInfoField {
                    name: "EvaluationEndDate".to_string(),
                    sensitive: false,
                },
                HostInfoField {
                    name: "UXDifferentiator".to_string(),
                    sensitive: false,
                },
            ],
            rearm_value: "RemainingRearmCount".to_string(),
            service_names: vec!["sppsvc".to_string(), "osppsvc".to_string()],
            interpreter_candidates: vec!["pwsh".to_string(), "powershell".to_string()],
        }
    }
}
