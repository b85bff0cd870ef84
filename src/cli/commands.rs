use tracing::{info, warn};

use crate::browser::session::BrowserSession;
use crate::cli::config::{AppConfig, ReportConfig};
use crate::crawl::scheduler::CrawlMode;
use crate::report::console::format_console_report;
use crate::report::json::generate_json_report;
use crate::report::junit::generate_junit_xml;
use crate::report::report_model::RunReport;
use crate::trace::logger::TraceLogger;
use crate::{run_crawl, run_smoke};

// ============================================================================
// probe / catalog subcommands
// ============================================================================

/// Crawl the app in the given mode and return whether the run was clean.
pub fn cmd_crawl(config: &AppConfig, mode: CrawlMode) -> Result<bool, Box<dyn std::error::Error>> {
    let tracer = TraceLogger::new(&config.probe.run_log);
    if mode == CrawlMode::Probe {
        std::fs::create_dir_all(&config.probe.screenshot_dir)?;
    }

    info!(
        "Starting {} run at {} (log: {})",
        mode.name(),
        config.probe.start_url(),
        config.probe.run_log
    );

    let mut session = BrowserSession::launch(&config.driver)?;
    let report = run_crawl(&mut session, &config.probe, mode, &tracer)?;
    close_session(session);

    emit_report(&report, &config.report)?;
    Ok(report.is_clean())
}

// ============================================================================
// smoke subcommand
// ============================================================================

/// Load each path once; empty `paths` falls back to the configured list.
pub fn cmd_smoke(config: &AppConfig, paths: &[String]) -> Result<bool, Box<dyn std::error::Error>> {
    let paths = if paths.is_empty() {
        config.probe.smoke_paths.as_slice()
    } else {
        paths
    };

    let tracer = TraceLogger::new(&config.probe.run_log);
    std::fs::create_dir_all(&config.probe.screenshot_dir)?;

    info!("Smoke checking {} path(s) on {}", paths.len(), config.probe.base_url);

    let mut session = BrowserSession::launch(&config.driver)?;
    let report = run_smoke(&mut session, &config.probe, paths, &tracer)?;
    close_session(session);

    emit_report(&report, &config.report)?;
    Ok(report.is_clean())
}

// ============================================================================
// Helpers
// ============================================================================

/// Render the report in the requested format. Unknown formats fall back to console.
pub fn render_report(report: &RunReport, format: &str) -> Result<String, Box<dyn std::error::Error>> {
    let content = match format {
        "junit" => generate_junit_xml(report),
        "json" => generate_json_report(report)?,
        _ => format_console_report(report),
    };
    Ok(content)
}

fn emit_report(report: &RunReport, config: &ReportConfig) -> Result<(), Box<dyn std::error::Error>> {
    let content = render_report(report, &config.format)?;
    match &config.output {
        Some(path) => {
            std::fs::write(path, &content)?;
            info!("Report written to {}", path);
        }
        None => print!("{}", content),
    }
    Ok(())
}

/// Shut the browser down; a session that already died only warrants a warning.
fn close_session(mut session: BrowserSession) {
    if let Err(e) = session.quit() {
        warn!("Browser did not shut down cleanly: {}", e);
    }
}
