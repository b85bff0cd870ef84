use crate::report::report_model::RunReport;

/// Machine-readable report: the whole run as pretty-printed JSON.
pub fn generate_json_report(report: &RunReport) -> Result<String, serde_json::Error> {
    let mut json = serde_json::to_string_pretty(report)?;
    json.push('\n');
    Ok(json)
}
