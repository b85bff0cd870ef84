use crate::report::report_model::RunReport;

// ============================================================================
// JUnit XML reporter: CI integration format
// ============================================================================

/// Generate a JUnit XML report, one testcase per visited page.
///
/// A page with faults becomes a failing testcase listing each fault. A run
/// cut short by a fatal driver error gets an extra `run` testcase carrying
/// an `<error>` element.
///
/// ```xml
/// <?xml version="1.0" encoding="UTF-8"?>
/// <testsuite name="spa-prober probe http://localhost:5173" tests="2" failures="1" errors="0" time="4.200">
///   <testcase name="http://localhost:5173/" classname="spa-prober" />
///   <testcase name="http://localhost:5173/settings" classname="spa-prober">
///     <failure message="1 fault(s) detected" type="Fault">click button on tag=button: Une erreur est survenue</failure>
///   </testcase>
/// </testsuite>
/// ```
pub fn generate_junit_xml(report: &RunReport) -> String {
    let time_attr = report
        .duration_ms
        .map(|ms| format!(" time=\"{:.3}\"", ms as f64 / 1000.0))
        .unwrap_or_default();

    let mut cases = String::new();
    let mut failures = 0;

    for page in &report.pages {
        let lines: Vec<String> = report
            .faults_for(page)
            .map(|f| {
                format!(
                    "{} on {}: {} [{}]",
                    f.action,
                    f.element_label(),
                    f.message,
                    f.artifact
                )
            })
            .collect();

        if lines.is_empty() {
            cases.push_str(&format!(
                "  <testcase name=\"{}\" classname=\"spa-prober\" />\n",
                escape_xml(page.as_str())
            ));
            continue;
        }

        failures += 1;
        cases.push_str(&format!(
            "  <testcase name=\"{name}\" classname=\"spa-prober\">\n    <failure message=\"{message}\" type=\"Fault\">{body}</failure>\n  </testcase>\n",
            name = escape_xml(page.as_str()),
            message = escape_xml(&format!("{} fault(s) detected", lines.len())),
            body = escape_xml(&lines.join("\n")),
        ));
    }

    let mut tests = report.pages.len();
    let mut errors = 0;
    if let Some(reason) = &report.aborted {
        tests += 1;
        errors = 1;
        cases.push_str(&format!(
            "  <testcase name=\"run\" classname=\"spa-prober\">\n    <error message=\"run aborted\" type=\"DriverError\">{}</error>\n  </testcase>\n",
            escape_xml(reason)
        ));
    }

    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<testsuite name=\"{name}\" tests=\"{tests}\" failures=\"{failures}\" errors=\"{errors}\"{time}>\n{cases}</testsuite>\n",
        name = escape_xml(&format!("spa-prober {} {}", report.mode, report.base_url)),
        tests = tests,
        failures = failures,
        errors = errors,
        time = time_attr,
        cases = cases,
    )
}

/// Escape XML special characters.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
