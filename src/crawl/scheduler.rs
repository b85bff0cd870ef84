use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::browser::driver::{Driver, dismiss_all};
use crate::browser::error::DriverError;
use crate::catalog::catalog::{CatalogEntry, DiscoveredElements, catalog_page};
use crate::cli::config::ProbeConfig;
use crate::detect::detector::FaultDetector;
use crate::detect::rules::RuleError;
use crate::interact::dispatcher::{Dispatcher, Interaction};
use crate::report::report_model::{InteractionRecord, Outcome, RunReport};
use crate::trace::{logger::TraceLogger, trace::TraceEvent};

use super::identity::{PageIdentity, VisitedSet, is_same_origin};
use super::links::extract_links;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    /// Catalog, interact with every element, detect faults
    Probe,
    /// Catalog only, collecting every distinct element
    Catalog,
}

impl CrawlMode {
    pub fn name(&self) -> &'static str {
        match self {
            CrawlMode::Probe => "probe",
            CrawlMode::Catalog => "catalog",
        }
    }
}

/// Depth-first crawl over an explicit work-list.
///
/// Owns all run state: the visited set, the discovered elements, the
/// interaction records and (through the detector) the fault log.
pub struct Crawler<'a> {
    driver: &'a mut dyn Driver,
    config: &'a ProbeConfig,
    tracer: &'a TraceLogger,
    mode: CrawlMode,
    visited: VisitedSet,
    discovered: DiscoveredElements,
    detector: FaultDetector,
    dispatcher: Dispatcher,
    interactions: Vec<InteractionRecord>,
    elements_cataloged: usize,
}

impl<'a> Crawler<'a> {
    pub fn new(
        driver: &'a mut dyn Driver,
        config: &'a ProbeConfig,
        mode: CrawlMode,
        tracer: &'a TraceLogger,
    ) -> Result<Self, RuleError> {
        driver.on_dialog(dismiss_all());
        Ok(Self {
            driver,
            config,
            tracer,
            mode,
            visited: VisitedSet::new(),
            discovered: DiscoveredElements::new(),
            detector: FaultDetector::from_config(config)?,
            dispatcher: Dispatcher::from_config(config),
            interactions: Vec::new(),
            elements_cataloged: 0,
        })
    }

    pub fn visited(&self) -> &VisitedSet {
        &self.visited
    }

    pub fn interactions(&self) -> &[InteractionRecord] {
        &self.interactions
    }

    pub fn discovered(&self) -> &DiscoveredElements {
        &self.discovered
    }

    /// Crawl from the configured start URL until no unvisited in-scope URL remains.
    ///
    /// Links of a page are pushed in reverse so the first one is explored
    /// first, which reproduces recursive depth-first order.
    pub fn run(&mut self) -> Result<(), DriverError> {
        let mut work: Vec<String> = vec![self.config.start_url()];

        while let Some(url) = work.pop() {
            let mut next = self.visit(&url)?;
            next.reverse();
            work.extend(next);
        }

        info!("Crawl finished: {} pages visited", self.visited.len());
        Ok(())
    }

    /// Process one URL and return the in-scope, unvisited URLs it leads to.
    ///
    /// No-op for out-of-scope URLs and for identities already visited. The
    /// identity is marked before navigating, so a page linking back to
    /// itself can never be entered twice.
    pub fn visit(&mut self, url: &str) -> Result<Vec<String>, DriverError> {
        if !is_same_origin(&self.config.base_url, url) {
            info!("Skipping out-of-scope URL: {}", url);
            return Ok(Vec::new());
        }

        let identity = PageIdentity::new(url, self.config.strip_query);
        if self.visited.contains(&identity) {
            debug!("Skipping already visited URL: {}", url);
            return Ok(Vec::new());
        }

        if self.config.max_pages > 0 && self.visited.len() >= self.config.max_pages {
            debug!("Page limit reached, not visiting {}", url);
            return Ok(Vec::new());
        }

        self.visited.mark(&identity);
        self.visit_page(url, &identity)
    }

    fn visit_page(&mut self, url: &str, identity: &PageIdentity) -> Result<Vec<String>, DriverError> {
        info!("Navigating to: {}", url);
        self.tracer.log(TraceEvent::now("navigate").with_url(url));

        match self.driver.navigate(url, self.config.navigation_timeout_ms) {
            Ok(()) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.tracer
                    .log(TraceEvent::now("navigation_error").with_url(url).with_detail(&e));
                self.detector
                    .record_navigation_error(identity, url, &e, self.tracer);
                return Ok(Vec::new());
            }
        }

        if let Err(e) = self.driver.wait(self.config.settle_delay_ms) {
            if e.is_fatal() {
                return Err(e);
            }
            warn!("Settle wait failed on {}: {}", url, e);
        }

        let discovered = match self.mode {
            CrawlMode::Catalog => Some(&mut self.discovered),
            CrawlMode::Probe => None,
        };
        let entries = catalog_page(&mut *self.driver, discovered)?;
        self.elements_cataloged += entries.len();
        info!("Cataloged {} elements on {}", entries.len(), url);

        // Read before any interaction can take the browser elsewhere
        let mut candidates = self.links_from_current_page()?;

        if self.mode == CrawlMode::Probe {
            match self.dispatch(url, identity, entries)? {
                Some(landed) => {
                    if is_same_origin(&self.config.base_url, &landed) {
                        candidates.push(landed);
                    }
                }
                None => candidates.extend(self.links_from_current_page()?),
            }
        }

        Ok(self.unvisited(candidates))
    }

    /// Interact with every entry in catalog order.
    ///
    /// Returns the URL the browser landed on when an interaction left the
    /// page. A reload that keeps the page identity invalidates every handle,
    /// so the page is cataloged again and the remaining elements are taken
    /// from the fresh catalog; the processed set keeps finished ones out.
    fn dispatch(
        &mut self,
        url: &str,
        identity: &PageIdentity,
        mut entries: Vec<CatalogEntry>,
    ) -> Result<Option<String>, DriverError> {
        self.detector
            .detect(&mut *self.driver, identity, "page load", None, self.tracer)?;
        self.dispatcher.begin_page(identity.clone());

        let mut next = 0;
        while next < entries.len() {
            let interaction = self.dispatcher.interact(
                &mut *self.driver,
                &entries[next],
                &mut self.detector,
                self.tracer,
            )?;
            next += 1;

            let Interaction::Done {
                record,
                left_page,
                landed_url,
            } = interaction
            else {
                continue;
            };

            let reloaded = record.outcome == Outcome::FullNavigation;
            self.interactions.push(record);

            if left_page {
                warn!(
                    "URL changed from {} to {}; stopping interactions on this page",
                    url, landed_url
                );
                return Ok(Some(landed_url));
            }

            if reloaded {
                info!("{} reloaded; cataloging it again", url);
                entries = catalog_page(&mut *self.driver, None)?;
                next = 0;
            }
        }

        Ok(None)
    }

    /// Links of whatever page the browser is on now, if it is in scope.
    fn links_from_current_page(&mut self) -> Result<Vec<String>, DriverError> {
        let current = match self.driver.current_url() {
            Ok(current) => current,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Cannot read current URL, skipping link extraction: {}", e);
                return Ok(Vec::new());
            }
        };

        if !is_same_origin(&self.config.base_url, &current) {
            info!("Left the application ({}); no links followed", current);
            return Ok(Vec::new());
        }

        match extract_links(&mut *self.driver, &self.config.base_url) {
            Ok(links) => Ok(links),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!("Link extraction failed on {}: {}", current, e);
                Ok(Vec::new())
            }
        }
    }

    /// First URL per identity, dropping identities already visited.
    fn unvisited(&self, candidates: Vec<String>) -> Vec<String> {
        let mut seen: HashSet<PageIdentity> = HashSet::new();
        candidates
            .into_iter()
            .filter(|url| {
                let identity = PageIdentity::new(url, self.config.strip_query);
                !self.visited.contains(&identity) && seen.insert(identity)
            })
            .collect()
    }

    /// Final report; `aborted` carries the fatal error that ended the run early.
    pub fn into_report(self, aborted: Option<String>) -> RunReport {
        let faults = self.detector.faults().summary();
        RunReport {
            mode: self.mode.name().to_string(),
            base_url: self.config.base_url.clone(),
            pages: self.visited.in_order().to_vec(),
            elements_cataloged: self.elements_cataloged,
            interactions: self.interactions,
            faults,
            discovered: self.discovered.iter().cloned().collect(),
            aborted,
            duration_ms: None,
        }
    }
}
