//! Sensitivity gating for secret-shaped fields.
//!
//! Product keys, extended product ids, and offline installation ids are
//! only disclosed when the caller explicitly opted in; otherwise the
//! report carries a fixed hidden marker so downstream consumers can tell
//! "withheld" apart from "absent". The marker is a real string value and
//! serializes like any other.

/// Marker substituted for withheld sensitive values.
pub const HIDDEN_MARKER: &str = "Hidden (confirmation required)";

/// Per-run disclosure policy.
///
/// Constructed fresh for each aggregation call and never persisted.
#[derive(Debug, Clone, Copy)]
pub struct SensitivityPolicy {
    allow_sensitive: bool,
}

impl SensitivityPolicy {
    /// Create a policy from the caller's opt-in flag.
    #[must_use]
    pub fn new(allow_sensitive: bool) -> Self {
        Self { allow_sensitive }
    }

    /// Whether sensitive values are disclosed verbatim.
    #[must_use]
    pub fn allows_sensitive(&self) -> bool {
        self.allow_sensitive
    }

    /// Gate a sensitive value: verbatim when allowed, the hidden marker
    /// otherwise.
    #[must_use]
    pub fn disclose(&self, value: impl Into<String>) -> String {
        if self.allow_sensitive {
            value.into()
        } else {
            HIDDEN_MARKER.to_string()
        }
    }

    /// The marker for a sensitive value the gate withholds even before
    /// the probe runs.
    #[must_use]
    pub fn hidden(&self) -> String {
        HIDDEN_MARKER.to_string()
    }
}

/// Mask a dashed product key, keeping only the first and last groups.
///
/// Applies only to the canonical five-group shape; anything else is
/// returned unmodified rather than guessed at.
#[must_use]
pub fn mask_key(key: &str) -> String {
    let groups: Vec<&str> = key.split('-').collect();
    if groups.len() != 5 {
        return key.to_string();
    }
    format!("{}-*****-*****-*****-{}", groups[0], groups[4])
}

/// Check whether a field value counts as disclosed sensitive data.
///
/// Empty values and the hidden marker (any "Hidden"-prefixed text,
/// case-insensitively) do not count.
#[must_use]
pub fn is_disclosed_secret(value: &str) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return false;
    }
    !trimmed.to_ascii_lowercase().starts_with("hidden")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disclose_honours_the_flag() {
        let open = SensitivityPolicy::new(true);
        let closed = SensitivityPolicy::new(false);
        assert_eq!(open.disclose("ABCDE-12345"), "ABCDE-12345");
        assert_eq!(closed.disclose("ABCDE-12345"), HIDDEN_MARKER);
        assert_eq!(closed.hidden(), HIDDEN_MARKER);
    }

    #[test]
    fn mask_keeps_first_and_last_groups() {
        assert_eq!(
            mask_key("ABCDE-FGHJK-MNPQR-STUVW-XYZ23"),
            "ABCDE-*****-*****-*****-XYZ23"
        );
    }

    #[test]
    fn mask_passes_malformed_keys_through() {
        assert_eq!(mask_key("ABCDE-FGHJK"), "ABCDE-FGHJK");
        assert_eq!(mask_key(""), "");
        assert_eq!(mask_key("no dashes here"), "no dashes here");
        assert_eq!(
            mask_key("A-B-C-D-E-F"),
            "A-B-C-D-E-F"
        );
    }

    #[test]
    fn hidden_marker_is_not_a_disclosed_secret() {
        assert!(!is_disclosed_secret(HIDDEN_MARKER));
        assert!(!is_disclosed_secret("hidden by policy"));
        assert!(!is_disclosed_secret(""));
        assert!(!is_disclosed_secret("   "));
        assert!(is_disclosed_secret("ABCDE-FGHJK-MNPQR-STUVW-XYZ23"));
    }
}
