use std::collections::HashSet;

use tracing::{debug, info, warn};

use crate::browser::driver::{Driver, ElementRef, SelectChoice};
use crate::browser::error::DriverError;
use crate::catalog::catalog::CatalogEntry;
use crate::catalog::descriptor::{ElementDescriptor, text_fingerprint};
use crate::cli::config::ProbeConfig;
use crate::crawl::identity::{PageIdentity, leaves_scope};
use crate::detect::detector::{FaultDetector, current_url_or};
use crate::report::report_model::{InteractionRecord, Outcome};
use crate::trace::{logger::TraceLogger, trace::TraceEvent};

use super::strategy::{ActionPlan, describe_action, plan_action};

/// Why an element was passed over without acting on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    AlreadyProcessed,
    NotVisible,
    Disabled,
    /// No action defined for this kind of element
    Inert,
    /// A link whose target is on another origin
    OutOfScope,
}

/// Result of handing one catalog entry to the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    Skipped(SkipReason),
    Done {
        record: InteractionRecord,
        /// Page identity changed; the rest of the catalog is no longer trustworthy
        left_page: bool,
        /// URL the browser ended up on
        landed_url: String,
    },
}

/// Bounds and delays used while acting on elements.
#[derive(Debug, Clone, Copy)]
pub struct ActionTimings {
    pub click_timeout_ms: u64,
    pub input_timeout_ms: u64,
    pub navigation_wait_ms: u64,
    pub post_input_delay_ms: u64,
}

/// Acts on cataloged elements one at a time, at most once per descriptor
/// per page visit.
pub struct Dispatcher {
    timings: ActionTimings,
    base_url: String,
    strip_query: bool,
    page: Option<PageIdentity>,
    processed: HashSet<ElementDescriptor>,
}

impl Dispatcher {
    pub fn from_config(config: &ProbeConfig) -> Self {
        Self {
            timings: ActionTimings {
                click_timeout_ms: config.action_timeout_ms,
                input_timeout_ms: config.input_timeout_ms,
                navigation_wait_ms: config.navigation_wait_ms,
                post_input_delay_ms: config.post_input_delay_ms,
            },
            base_url: config.base_url.clone(),
            strip_query: config.strip_query,
            page: None,
            processed: HashSet::new(),
        }
    }

    /// Start a fresh page visit: forget what was processed on the last one.
    pub fn begin_page(&mut self, page: PageIdentity) {
        self.processed.clear();
        self.page = Some(page);
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    /// Act on one catalog entry and run fault detection after it.
    ///
    /// Action failures become fault records and an `ActionError` outcome;
    /// only a fatal driver error is returned.
    pub fn interact(
        &mut self,
        driver: &mut dyn Driver,
        entry: &CatalogEntry,
        detector: &mut FaultDetector,
        tracer: &TraceLogger,
    ) -> Result<Interaction, DriverError> {
        let element = &entry.descriptor;
        let page = match &self.page {
            Some(page) => page.clone(),
            None => PageIdentity::new(&driver.current_url()?, self.strip_query),
        };

        if !self.processed.insert(element.clone()) {
            debug!("Skipping already processed element: {}", element);
            return Ok(Interaction::Skipped(SkipReason::AlreadyProcessed));
        }

        let plan = plan_action(element);
        let description = describe_action(&plan, element);

        if plan == ActionPlan::Click && element.tag == "a" {
            if let Some(href) = element.attribute("href") {
                let here = current_url_or(driver, &page)?;
                if leaves_scope(&self.base_url, &here, href) {
                    return Ok(skip(&page, element, SkipReason::OutOfScope, tracer));
                }
            }
        }

        match self.preconditions(driver, entry.handle) {
            Ok(None) => {}
            Ok(Some(reason)) => return Ok(skip(&page, element, reason, tracer)),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                detector.record_action_error(driver, &page, &description, element, &e, tracer)?;
                return self.finish(driver, &page, element, &plan, description, Outcome::ActionError, tracer);
            }
        }

        if plan == ActionPlan::Inert {
            info!("No specific interaction defined for: {}", element);
            return Ok(Interaction::Skipped(SkipReason::Inert));
        }

        info!("Attempting to interact with: {} on {}", element, page);
        let url_before = current_url_or(driver, &page)?;
        let content_before = body_fingerprint(driver)?;

        let navigated = match self.perform(driver, entry.handle, &plan) {
            Ok(Some(navigated)) => navigated,
            Ok(None) => {
                info!("No selectable options found for: {}", element);
                return Ok(Interaction::Skipped(SkipReason::Inert));
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                detector.record_action_error(driver, &page, &description, element, &e, tracer)?;
                return self.finish(driver, &page, element, &plan, description, Outcome::ActionError, tracer);
            }
        };

        detector.detect(driver, &page, &description, Some(element), tracer)?;

        let url_after = current_url_or(driver, &page)?;
        let outcome = if navigated {
            Outcome::FullNavigation
        } else if url_after != url_before || body_fingerprint(driver)? != content_before {
            Outcome::InPageUpdate
        } else {
            Outcome::NoObservableChange
        };

        self.finish(driver, &page, element, &plan, description, outcome, tracer)
    }

    /// `Some(reason)` when the element must be skipped.
    fn preconditions(
        &self,
        driver: &mut dyn Driver,
        handle: ElementRef,
    ) -> Result<Option<SkipReason>, DriverError> {
        if !driver.is_visible(handle)? {
            return Ok(Some(SkipReason::NotVisible));
        }
        if !driver.is_enabled(handle)? {
            return Ok(Some(SkipReason::Disabled));
        }
        Ok(None)
    }

    /// Run the action. `Ok(Some(navigated))` when it was performed,
    /// `Ok(None)` when there turned out to be nothing to do.
    fn perform(
        &self,
        driver: &mut dyn Driver,
        handle: ElementRef,
        plan: &ActionPlan,
    ) -> Result<Option<bool>, DriverError> {
        let t = self.timings;
        match plan {
            ActionPlan::Click => {
                driver.click(handle, t.click_timeout_ms)?;
                match driver.wait_for_navigation(t.navigation_wait_ms) {
                    Ok(true) => Ok(Some(true)),
                    Ok(false) => {
                        debug!("No navigation after click; treating as same-page update");
                        Ok(Some(false))
                    }
                    Err(e) if e.is_fatal() => Err(e),
                    Err(e) => {
                        warn!("Waiting for navigation failed, continuing on same page: {}", e);
                        Ok(Some(false))
                    }
                }
            }
            ActionPlan::Fill(value) => {
                driver.fill(handle, value, t.input_timeout_ms)?;
                driver.wait(t.post_input_delay_ms)?;
                Ok(Some(false))
            }
            ActionPlan::Check => {
                driver.check(handle, t.input_timeout_ms)?;
                driver.wait(t.post_input_delay_ms)?;
                Ok(Some(false))
            }
            ActionPlan::SelectFirst => {
                let Some(choice) = first_choice(driver, handle)? else {
                    return Ok(None);
                };
                driver.select(handle, &choice, t.input_timeout_ms)?;
                driver.wait(t.post_input_delay_ms)?;
                Ok(Some(false))
            }
            ActionPlan::Inert => Ok(None),
        }
    }

    fn finish(
        &self,
        driver: &mut dyn Driver,
        page: &PageIdentity,
        element: &ElementDescriptor,
        plan: &ActionPlan,
        description: String,
        outcome: Outcome,
        tracer: &TraceLogger,
    ) -> Result<Interaction, DriverError> {
        let landed_url = current_url_or(driver, page)?;
        let left_page = PageIdentity::new(&landed_url, self.strip_query) != *page;
        if left_page {
            info!("Navigation occurred: {} -> {}", page, landed_url);
        }

        tracer.log(
            TraceEvent::now("interact")
                .with_url(page)
                .with_element(element)
                .with_action(&description)
                .with_outcome(outcome)
                .with_detail(format!("landed on {}", landed_url)),
        );

        Ok(Interaction::Done {
            record: InteractionRecord {
                page: page.clone(),
                element: element.clone(),
                action: plan.kind(),
                description,
                outcome,
            },
            left_page,
            landed_url,
        })
    }
}

fn skip(
    page: &PageIdentity,
    element: &ElementDescriptor,
    reason: SkipReason,
    tracer: &TraceLogger,
) -> Interaction {
    info!("Skipping {:?} element: {}", reason, element);
    tracer.log(
        TraceEvent::now("skip")
            .with_url(page)
            .with_element(element)
            .with_detail(format!("{:?}", reason)),
    );
    Interaction::Skipped(reason)
}

/// First enabled option: by value when it has one, else by its label.
fn first_choice(driver: &mut dyn Driver, handle: ElementRef) -> Result<Option<SelectChoice>, DriverError> {
    let options = driver.select_options(handle)?;
    let Some(option) = options.into_iter().find(|o| !o.disabled) else {
        return Ok(None);
    };
    match option.value.filter(|v| !v.is_empty()) {
        Some(value) => Ok(Some(SelectChoice::Value(value))),
        None if !option.label.trim().is_empty() => {
            Ok(Some(SelectChoice::Label(option.label.trim().to_string())))
        }
        None => Ok(None),
    }
}

/// SHA-1 of the body text, used to notice in-page updates.
///
/// Probe failures yield `None` rather than an error.
fn body_fingerprint(driver: &mut dyn Driver) -> Result<Option<String>, DriverError> {
    match read_body_text(driver) {
        Ok(text) => Ok(text.map(|t| text_fingerprint(&t))),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            debug!("Body fingerprint unavailable: {}", e);
            Ok(None)
        }
    }
}

fn read_body_text(driver: &mut dyn Driver) -> Result<Option<String>, DriverError> {
    let Some(body) = driver.query("body")?.into_iter().next() else {
        return Ok(None);
    };
    driver.text_content(body)
}
