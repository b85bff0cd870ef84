use tracing::error;

use crate::{
    browser::driver::Driver,
    cli::config::ProbeConfig,
    crawl::{
        scheduler::{CrawlMode, Crawler},
        smoke::SmokeCheck,
    },
    detect::rules::RuleError,
    report::report_model::RunReport,
    trace::{logger::TraceLogger, trace::TraceEvent},
};

pub mod browser;
pub mod catalog;
pub mod cli;
pub mod crawl;
pub mod detect;
pub mod interact;
pub mod report;
pub mod trace;

/// Crawl the app from the start URL and build the run report.
///
/// A fatal driver error ends the crawl but still yields a report: whatever
/// was collected up to that point, with `aborted` set. Only an invalid
/// fault rule fails the call.
pub fn run_crawl(
    driver: &mut dyn Driver,
    config: &ProbeConfig,
    mode: CrawlMode,
    tracer: &TraceLogger,
) -> Result<RunReport, RuleError> {
    let start = std::time::Instant::now();
    let mut crawler = Crawler::new(driver, config, mode, tracer)?;

    let aborted = match crawler.run() {
        Ok(()) => None,
        Err(e) => {
            error!("Run aborted: {}", e);
            tracer.log(TraceEvent::now("aborted").with_detail(&e));
            Some(e.to_string())
        }
    };

    let report = crawler
        .into_report(aborted)
        .with_duration(start.elapsed().as_millis());
    log_summary(tracer, &report);
    Ok(report)
}

/// Load each smoke path once and report what showed up on load.
pub fn run_smoke(
    driver: &mut dyn Driver,
    config: &ProbeConfig,
    paths: &[String],
    tracer: &TraceLogger,
) -> Result<RunReport, RuleError> {
    let start = std::time::Instant::now();
    let mut check = SmokeCheck::new(driver, config, tracer)?;

    let aborted = match check.run(paths) {
        Ok(()) => None,
        Err(e) => {
            error!("Smoke check aborted: {}", e);
            tracer.log(TraceEvent::now("aborted").with_detail(&e));
            Some(e.to_string())
        }
    };

    let report = check
        .into_report(aborted)
        .with_duration(start.elapsed().as_millis());
    log_summary(tracer, &report);
    Ok(report)
}

fn log_summary(tracer: &TraceLogger, report: &RunReport) {
    tracer.log(TraceEvent::now("summary").with_detail(format!(
        "{} pages, {} interactions, {} faults",
        report.pages.len(),
        report.interactions.len(),
        report.faults.len()
    )));
}
