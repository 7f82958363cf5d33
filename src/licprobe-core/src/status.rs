//! License status normalization.
//!
//! The native licensing library reports a coarse raw status (0..=3) plus
//! a signed HRESULT-shaped reason code. The reason code reclassifies raw
//! status 2 into three richer grace states; raw status 3 always means
//! notification. The normalizer also owns the reason-note rules, the
//! grace-time arithmetic, the file-time conversion, and the immutable
//! product-type and status-label lookup tables.

use chrono::{DateTime, Duration, TimeZone, Utc};

/// Reason: additional (out-of-tolerance) grace period.
const REASON_ADDITIONAL_GRACE: i32 = 0x4004_F00D;
/// Reason: non-genuine grace period.
const REASON_NON_GENUINE_GRACE: i32 = 0x4004_F065;
/// Reason: extended grace period.
const REASON_EXTENDED_GRACE: i32 = 0x4004_FC06;

/// Notification reason: KMS license expired or hardware out of tolerance.
const REASON_LICENSE_EXPIRED: i32 = 0xC004_F00Fu32 as i32;
/// Notification reason: reported non-genuine.
const REASON_REPORTED_NON_GENUINE: i32 = 0xC004_F200u32 as i32;
/// Notification reasons: grace time exhausted.
const REASON_GRACE_EXPIRED: i32 = 0xC004_F009u32 as i32;
const REASON_GRACE_EXPIRED_ALT: i32 = 0xC004_F064u32 as i32;

/// Seconds between the Windows file-time epoch (1601) and Unix epoch.
const FILETIME_UNIX_OFFSET_SECS: i64 = 11_644_473_600;

/// Canonical license states.
///
/// The seven named states carry the stable codes 0..=6; anything outside
/// that range is preserved numerically as [`LicenseState::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LicenseState {
    /// No license applies.
    Unlicensed,
    /// Fully licensed/activated.
    Licensed,
    /// Initial (out-of-box) grace period.
    InitialGrace,
    /// Additional (out-of-tolerance) grace period.
    AdditionalGrace,
    /// Non-genuine grace period.
    NonGenuineGrace,
    /// Notification mode.
    Notification,
    /// Extended grace period.
    ExtendedGrace,
    /// Out-of-range raw code, preserved as-is.
    Unknown(i32),
}

impl LicenseState {
    /// Map a numeric status code onto a state.
    #[must_use]
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Unlicensed,
            1 => Self::Licensed,
            2 => Self::InitialGrace,
            3 => Self::AdditionalGrace,
            4 => Self::NonGenuineGrace,
            5 => Self::Notification,
            6 => Self::ExtendedGrace,
            other => Self::Unknown(other),
        }
    }

    /// Numeric code of this state.
    #[must_use]
    pub fn code(&self) -> i32 {
        match self {
            Self::Unlicensed => 0,
            Self::Licensed => 1,
            Self::InitialGrace => 2,
            Self::AdditionalGrace => 3,
            Self::NonGenuineGrace => 4,
            Self::Notification => 5,
            Self::ExtendedGrace => 6,
            Self::Unknown(code) => *code,
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Unlicensed => "Unlicensed".to_string(),
            Self::Licensed => "Licensed".to_string(),
            Self::InitialGrace => "Initial grace period".to_string(),
            Self::AdditionalGrace => "Additional grace period".to_string(),
            Self::NonGenuineGrace => "Non-genuine grace period".to_string(),
            Self::Notification => "Notification".to_string(),
            Self::ExtendedGrace => "Extended grace period".to_string(),
            Self::Unknown(code) => format!("Unknown ({code})"),
        }
    }
}

/// Normalize a raw `(status, reason)` pair into a canonical state.
///
/// First match wins; reasons only matter for raw status 2, and raw
/// status 3 maps to notification regardless of reason. Total function:
/// no input fails.
#[must_use]
pub fn normalize(raw_status: i32, reason: i32) -> LicenseState {
    match (raw_status, reason) {
        (2, REASON_ADDITIONAL_GRACE) => LicenseState::AdditionalGrace,
        (2, REASON_NON_GENUINE_GRACE) => LicenseState::NonGenuineGrace,
        (2, REASON_EXTENDED_GRACE) => LicenseState::ExtendedGrace,
        (3, _) => LicenseState::Notification,
        _ => LicenseState::from_code(raw_status),
    }
}

/// Simple linear status label, not reason-aware.
///
/// Used for the report's top-level status field only; per-entry statuses
/// go through [`normalize`]. The two maps intentionally disagree for raw
/// status 2 and 3.
#[must_use]
pub fn simple_status_label(code: i32) -> String {
    match code {
        0 => "Unlicensed".to_string(),
        1 => "Licensed".to_string(),
        2 => "OOBGrace".to_string(),
        3 => "OOTGrace".to_string(),
        4 => "NonGenuineGrace".to_string(),
        5 => "Notification".to_string(),
        6 => "ExtendedGrace".to_string(),
        other => format!("Unknown ({other})"),
    }
}

/// Format a signed result code the way the native library displays it.
#[must_use]
pub fn format_hresult(code: i32) -> String {
    format!("0x{code:08X}")
}

/// Notes explaining a normalized state's reason code.
///
/// Evaluated after normalization; empty for reason 0 and for states that
/// carry no reason semantics.
#[must_use]
pub fn reason_notes(state: LicenseState, reason: i32) -> Vec<String> {
    let mut notes = Vec::new();
    if reason == 0 {
        return notes;
    }

    match state {
        LicenseState::Notification => {
            notes.push(format!("Notification reason: {}.", format_hresult(reason)));
            match reason {
                REASON_LICENSE_EXPIRED => {
                    notes.push("KMS license expired or hardware out of tolerance.".to_string());
                }
                REASON_REPORTED_NON_GENUINE => {
                    notes.push("License reported as non-genuine.".to_string());
                }
                REASON_GRACE_EXPIRED | REASON_GRACE_EXPIRED_ALT => {
                    notes.push("Grace time expired.".to_string());
                }
                _ => {}
            }
        }
        LicenseState::NonGenuineGrace => {
            notes.push(format!("Non-genuine reason: {}.", format_hresult(reason)));
        }
        _ => {}
    }
    notes
}

/// Derived grace-period fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraceFields {
    /// Whole days remaining, rounded half away from zero.
    pub days: u32,
    /// Wall-clock moment the grace window closes.
    pub expiry: DateTime<Utc>,
    /// Status message for the owning entry.
    pub message: String,
}

/// Compute grace-derived fields for a positive remaining-minutes value.
///
/// Returns `None` when no grace time remains. The message reads as an
/// activation expiration for licensed entries and as time remaining for
/// everything else.
#[must_use]
pub fn grace_fields(minutes: u32, state: LicenseState) -> Option<GraceFields> {
    if minutes == 0 {
        return None;
    }

    let days = ((f64::from(minutes) / 1440.0) + 0.5).floor() as u32;
    let grace_text = format!("{minutes} minute(s) ({days} day(s))");
    let message = if state == LicenseState::Licensed {
        format!("Activation expiration: {grace_text}")
    } else {
        format!("Time remaining: {grace_text}")
    };

    Some(GraceFields {
        days,
        expiry: Utc::now() + Duration::minutes(i64::from(minutes)),
        message,
    })
}

/// Convert a raw 64-bit file-time value into a UTC timestamp.
///
/// Zero and all-ones sentinels, and values outside chrono's representable
/// range, yield `None`; the caller degrades to a note instead of failing
/// the entry.
#[must_use]
pub fn filetime_to_utc(filetime: u64) -> Option<DateTime<Utc>> {
    if filetime == 0 || filetime == u64::MAX {
        return None;
    }
    let secs = i64::try_from(filetime / 10_000_000).ok()? - FILETIME_UNIX_OFFSET_SECS;
    let nanos = (filetime % 10_000_000) * 100;
    Utc.timestamp_opt(secs, nanos as u32).single()
}

/// Description for a product-type code, `"Unknown"` when unmapped.
#[must_use]
pub fn product_type_description(code: u32) -> &'static str {
    PRODUCT_TYPES
        .iter()
        .find(|(c, _)| *c == code)
        .map_or("Unknown", |(_, name)| name)
}

/// Product-type code table. Immutable configuration data, not process
/// state.
const PRODUCT_TYPES: &[(u32, &str)] = &[
    (0x0000_0006, "Business"),
    (0x0000_0010, "Home"),
    (0x0000_0012, "Professional"),
    (0x0000_0027, "Enterprise"),
    (0x0000_002A, "Enterprise N"),
    (0x0000_0030, "Education"),
    (0x0000_003C, "Enterprise S"),
    (0x0000_003F, "Professional Education"),
    (0x0000_0040, "Professional Education N"),
    (0x0000_0043, "Professional Workstation"),
    (0x0000_0044, "Professional Workstation N"),
    (0x0000_004B, "IoT Enterprise"),
    (0x0000_0065, "Professional N"),
    (0x0000_0067, "Enterprise G"),
    (0x0000_0068, "Enterprise G N"),
    (0x0000_0079, "Server Standard"),
    (0x0000_007D, "Server Datacenter"),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_reclassifies_raw_status_two() {
        assert_eq!(normalize(2, 0x4004_F00D), LicenseState::AdditionalGrace);
        assert_eq!(normalize(2, 0x4004_F065), LicenseState::NonGenuineGrace);
        assert_eq!(normalize(2, 0x4004_FC06), LicenseState::ExtendedGrace);
        // Unmapped reason leaves raw status 2 alone.
        assert_eq!(normalize(2, 0), LicenseState::InitialGrace);
        assert_eq!(normalize(2, 0x1234), LicenseState::InitialGrace);
    }

    #[test]
    fn raw_three_is_always_notification() {
        assert_eq!(normalize(3, 0), LicenseState::Notification);
        assert_eq!(normalize(3, 0x4004_F00D), LicenseState::Notification);
        assert_eq!(normalize(3, -1), LicenseState::Notification);
    }

    #[test]
    fn passthrough_and_unknown_preserve_codes() {
        assert_eq!(normalize(0, 77), LicenseState::Unlicensed);
        assert_eq!(normalize(1, 0x4004_F065), LicenseState::Licensed);
        assert_eq!(normalize(9, 0), LicenseState::Unknown(9));
        assert_eq!(normalize(9, 0).code(), 9);
        assert_eq!(normalize(-2, 0).label(), "Unknown (-2)");
    }

    #[test]
    fn notification_reasons_classify() {
        let notes = reason_notes(LicenseState::Notification, REASON_LICENSE_EXPIRED);
        assert_eq!(notes.len(), 2);
        assert!(notes[0].contains("0xC004F00F"));
        assert!(notes[1].contains("out of tolerance"));

        let notes = reason_notes(LicenseState::Notification, REASON_GRACE_EXPIRED_ALT);
        assert_eq!(notes[1], "Grace time expired.");

        // Unmatched reason keeps the generic note only.
        let notes = reason_notes(LicenseState::Notification, 0x0BAD_0001);
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn non_genuine_reason_is_generic() {
        let notes = reason_notes(LicenseState::NonGenuineGrace, 0x4004_F065);
        assert_eq!(notes, vec!["Non-genuine reason: 0x4004F065.".to_string()]);
    }

    #[test]
    fn zero_reason_never_generates_notes() {
        assert!(reason_notes(LicenseState::Notification, 0).is_empty());
        assert!(reason_notes(LicenseState::NonGenuineGrace, 0).is_empty());
        assert!(reason_notes(LicenseState::Licensed, 5).is_empty());
    }

    #[test]
    fn grace_days_round_half_away_from_zero() {
        assert_eq!(
            grace_fields(1440, LicenseState::InitialGrace).unwrap().days,
            1
        );
        // 720 minutes = 0.5 days, rounds up.
        assert_eq!(
            grace_fields(720, LicenseState::InitialGrace).unwrap().days,
            1
        );
        assert_eq!(
            grace_fields(719, LicenseState::InitialGrace).unwrap().days,
            0
        );
        assert!(grace_fields(0, LicenseState::Licensed).is_none());
    }

    #[test]
    fn grace_message_depends_on_state() {
        let licensed = grace_fields(1440, LicenseState::Licensed).unwrap();
        assert_eq!(
            licensed.message,
            "Activation expiration: 1440 minute(s) (1 day(s))"
        );
        let grace = grace_fields(1440, LicenseState::NonGenuineGrace).unwrap();
        assert_eq!(grace.message, "Time remaining: 1440 minute(s) (1 day(s))");
    }

    #[test]
    fn filetime_sentinels_and_range() {
        assert!(filetime_to_utc(0).is_none());
        assert!(filetime_to_utc(u64::MAX).is_none());

        // 2020-01-01T00:00:00Z in file time.
        let ft = (1_577_836_800i64 + FILETIME_UNIX_OFFSET_SECS) as u64 * 10_000_000;
        let dt = filetime_to_utc(ft).expect("in range");
        assert_eq!(dt.timestamp(), 1_577_836_800);
    }

    #[test]
    fn product_type_table_lookup() {
        assert_eq!(product_type_description(0x12), "Professional");
        assert_eq!(product_type_description(0x7D), "Server Datacenter");
        assert_eq!(product_type_description(0xDEAD), "Unknown");
    }

    #[test]
    fn simple_map_is_not_reason_aware() {
        assert_eq!(simple_status_label(2), "OOBGrace");
        assert_eq!(simple_status_label(3), "OOTGrace");
        assert_eq!(simple_status_label(42), "Unknown (42)");
    }
}
