//! Interpreter fallback output parsing and merge.
//!
//! The fallback step is last in the run, so by the time its JSON arrives
//! the report already holds everything the direct probes found. The merge
//! therefore only fills still-empty top-level fields; it can never
//! overwrite a value a more authoritative source produced.

use serde::Deserialize;

use crate::error::ProbeError;
use crate::report::DiagnosticReport;

/// Fields the external interpreter may report.
///
/// Aliases accept the PascalCase names older script revisions emit.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InterpreterPayload {
    /// Product name.
    #[serde(default, alias = "ProductName")]
    pub product_name: Option<String>,
    /// Product edition.
    #[serde(default, alias = "Edition")]
    pub edition: Option<String>,
    /// OS build string.
    #[serde(default, alias = "Build", alias = "BuildNumber")]
    pub build: Option<String>,
    /// Product identifier.
    #[serde(default, alias = "ProductId", alias = "SerialNumber")]
    pub product_id: Option<String>,
    /// Partial product key.
    #[serde(default, alias = "PartialProductKey")]
    pub partial_product_key: Option<String>,
    /// Simple license status code.
    #[serde(default, alias = "LicenseStatus", alias = "LicenseStatusCode")]
    pub license_status_code: Option<i32>,
}

/// Parse the interpreter's stdout into a payload.
///
/// Interpreters prepend banners and trailing newlines; only the region
/// from the first `{` to the last `}` is treated as JSON.
pub fn parse_output(stdout: &str) -> Result<InterpreterPayload, ProbeError> {
    let start = stdout
        .find('{')
        .ok_or_else(|| ProbeError::parse("interpreter output contained no JSON object"))?;
    let end = stdout
        .rfind('}')
        .ok_or_else(|| ProbeError::parse("interpreter output contained no JSON object"))?;
    if end < start {
        return Err(ProbeError::parse("interpreter output contained no JSON object"));
    }
    serde_json::from_str(&stdout[start..=end])
        .map_err(|e| ProbeError::parse(format!("interpreter JSON was malformed: {e}")))
}

/// Merge a payload into the report, filling only still-empty fields.
pub fn apply(report: &mut DiagnosticReport, payload: &InterpreterPayload) {
    if let Some(v) = &payload.product_name {
        DiagnosticReport::fill_if_empty(&mut report.product_name, v.clone());
    }
    if let Some(v) = &payload.edition {
        DiagnosticReport::fill_if_empty(&mut report.edition, v.clone());
    }
    if let Some(v) = &payload.build {
        DiagnosticReport::fill_if_empty(&mut report.build, v.clone());
    }
    if let Some(v) = &payload.product_id {
        DiagnosticReport::fill_if_empty(&mut report.product_id, v.clone());
    }
    if let Some(v) = &payload.partial_product_key {
        DiagnosticReport::fill_if_empty(&mut report.partial_product_key, v.clone());
    }
    if let Some(code) = payload.license_status_code {
        report.default_status(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status;

    #[test]
    fn parses_plain_and_bannered_output() {
        let payload = parse_output(r#"{"product_name":"Example OS","license_status_code":1}"#)
            .expect("plain JSON");
        assert_eq!(payload.product_name.as_deref(), Some("Example OS"));
        assert_eq!(payload.license_status_code, Some(1));

        let payload = parse_output("Loading profile...\n{\"build\":\"26100\"}\n\n")
            .expect("bannered JSON");
        assert_eq!(payload.build.as_deref(), Some("26100"));
    }

    #[test]
    fn pascal_case_aliases_are_accepted() {
        let payload =
            parse_output(r#"{"ProductName":"Example OS","PartialProductKey":"XYZ23","LicenseStatus":1}"#)
                .expect("aliased JSON");
        assert_eq!(payload.product_name.as_deref(), Some("Example OS"));
        assert_eq!(payload.partial_product_key.as_deref(), Some("XYZ23"));
        assert_eq!(payload.license_status_code, Some(1));
    }

    #[test]
    fn non_json_output_is_a_parse_error() {
        assert!(matches!(
            parse_output("no json here"),
            Err(ProbeError::Parse { .. })
        ));
        assert!(matches!(
            parse_output("} backwards {"),
            Err(ProbeError::Parse { .. })
        ));
        assert!(matches!(
            parse_output("{not valid json}"),
            Err(ProbeError::Parse { .. })
        ));
    }

    #[test]
    fn merge_fills_only_empty_fields() {
        let mut report = DiagnosticReport {
            product_name: Some("Probed OS".to_string()),
            ..DiagnosticReport::default()
        };
        report.default_status(1);

        let payload = InterpreterPayload {
            product_name: Some("Fallback OS".to_string()),
            build: Some("26100".to_string()),
            license_status_code: Some(5),
            ..InterpreterPayload::default()
        };
        apply(&mut report, &payload);

        assert_eq!(report.product_name.as_deref(), Some("Probed OS"));
        assert_eq!(report.build.as_deref(), Some("26100"));
        assert_eq!(report.license_status_code, Some(1));
    }

    #[test]
    fn status_label_comes_from_the_simple_map() {
        let mut report = DiagnosticReport::default();
        let payload = InterpreterPayload {
            license_status_code: Some(2),
            ..InterpreterPayload::default()
        };
        apply(&mut report, &payload);
        assert_eq!(
            report.license_status.as_deref(),
            Some(status::simple_status_label(2).as_str())
        );
    }
}
