use crate::report::report_model::{Outcome, RunReport};

// ============================================================================
// Console reporter: formatted terminal output
// ============================================================================

/// Format a run report for terminal output.
///
/// Produces output like:
/// ```text
/// === Probe Run: http://localhost:5173 (probe) ===
///
/// Pages visited: 2
/// Elements cataloged: 14
/// Interactions: 9 (6 no-observable-change, 2 in-page-update, 1 full-navigation, 0 action-error)
///
/// --- Fault Summary (1) ---
/// ✗ Page: http://localhost:5173/settings
///     Action: click button
///     Element: tag=button, text='Save'
///     Error: Une erreur est survenue
///     Screenshot: error_screenshots/error_settings_20240101_120000_0.png
///
/// === Result: FAIL (1 fault) in 12.3s ===
/// ```
pub fn format_console_report(report: &RunReport) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== Probe Run: {} ({}) ===\n\n",
        report.base_url, report.mode
    ));

    out.push_str(&format!("Pages visited: {}\n", report.pages.len()));
    if report.mode != "smoke" {
        out.push_str(&format!("Elements cataloged: {}\n", report.elements_cataloged));
    }
    if !report.interactions.is_empty() {
        let counts: Vec<String> = [
            Outcome::NoObservableChange,
            Outcome::InPageUpdate,
            Outcome::FullNavigation,
            Outcome::ActionError,
        ]
        .iter()
        .map(|o| format!("{} {}", report.outcome_count(*o), o))
        .collect();
        out.push_str(&format!(
            "Interactions: {} ({})\n",
            report.interactions.len(),
            counts.join(", ")
        ));
    }

    if !report.discovered.is_empty() {
        out.push_str(&format!(
            "\n--- Discovered Elements ({}) ---\n",
            report.discovered.len()
        ));
        for element in &report.discovered {
            out.push_str(&format!("  {}\n", element));
        }
    }

    if report.faults.is_empty() {
        out.push_str("\nNo faults detected.\n");
    } else {
        out.push_str(&format!("\n--- Fault Summary ({}) ---\n", report.faults.len()));
        for fault in &report.faults {
            out.push_str(&format!("\u{2717} Page: {}\n", fault.page));
            out.push_str(&format!("    Action: {}\n", fault.action));
            out.push_str(&format!("    Element: {}\n", fault.element_label()));
            out.push_str(&format!("    Error: {}\n", fault.message));
            match fault.artifact.path() {
                Some(path) => out.push_str(&format!("    Screenshot: {}\n", path.display())),
                None => out.push_str(&format!("    Screenshot: {}\n", fault.artifact)),
            }
        }
    }

    if let Some(reason) = &report.aborted {
        out.push_str(&format!("\n[ABORTED] {}\n", reason));
    }

    let verdict = if report.is_clean() { "PASS" } else { "FAIL" };
    let noun = if report.faults.len() == 1 { "fault" } else { "faults" };
    out.push_str(&format!(
        "\n=== Result: {} ({} {})",
        verdict,
        report.faults.len(),
        noun
    ));

    if let Some(ms) = report.duration_ms {
        let secs = ms as f64 / 1000.0;
        out.push_str(&format!(" in {:.1}s", secs));
    }

    out.push_str(" ===\n");

    out
}
