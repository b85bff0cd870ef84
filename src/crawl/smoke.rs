use tracing::{info, warn};

use crate::browser::driver::{Driver, dismiss_all};
use crate::browser::error::DriverError;
use crate::cli::config::ProbeConfig;
use crate::detect::detector::FaultDetector;
use crate::detect::rules::RuleError;
use crate::report::report_model::RunReport;
use crate::trace::{logger::TraceLogger, trace::TraceEvent};

use super::identity::{PageIdentity, VisitedSet};

/// Load a fixed list of paths and record any fault signal seen on load.
///
/// No crawling and no interaction: a quick check that the pages come up
/// without dialogs, console errors or error banners.
pub struct SmokeCheck<'a> {
    driver: &'a mut dyn Driver,
    config: &'a ProbeConfig,
    tracer: &'a TraceLogger,
    detector: FaultDetector,
    visited: VisitedSet,
}

impl<'a> SmokeCheck<'a> {
    pub fn new(
        driver: &'a mut dyn Driver,
        config: &'a ProbeConfig,
        tracer: &'a TraceLogger,
    ) -> Result<Self, RuleError> {
        driver.on_dialog(dismiss_all());
        Ok(Self {
            driver,
            config,
            tracer,
            detector: FaultDetector::from_config(config)?,
            visited: VisitedSet::new(),
        })
    }

    pub fn run(&mut self, paths: &[String]) -> Result<(), DriverError> {
        for path in paths {
            let url = self.config.url_for(path);
            let identity = PageIdentity::new(&url, self.config.strip_query);
            if !self.visited.mark(&identity) {
                continue;
            }

            info!("Smoke check: {}", url);
            self.tracer.log(TraceEvent::now("navigate").with_url(&url));

            match self.driver.navigate(&url, self.config.navigation_timeout_ms) {
                Ok(()) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    self.detector
                        .record_navigation_error(&identity, &url, &e, self.tracer);
                    continue;
                }
            }

            if let Err(e) = self.driver.wait(self.config.settle_delay_ms) {
                if e.is_fatal() {
                    return Err(e);
                }
                warn!("Settle wait failed on {}: {}", url, e);
            }

            let found = self
                .detector
                .detect(&mut *self.driver, &identity, "page load", None, self.tracer)?;
            if !found {
                info!("  OK: no dialogs or console errors");
            }
        }
        Ok(())
    }

    pub fn into_report(self, aborted: Option<String>) -> RunReport {
        RunReport {
            mode: "smoke".to_string(),
            base_url: self.config.base_url.clone(),
            pages: self.visited.in_order().to_vec(),
            elements_cataloged: 0,
            interactions: Vec::new(),
            faults: self.detector.faults().summary(),
            discovered: Vec::new(),
            aborted,
            duration_ms: None,
        }
    }
}
