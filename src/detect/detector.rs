use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, error, warn};

use crate::browser::driver::{ConsoleLevel, Driver, ElementRef, PageEvent};
use crate::browser::error::DriverError;
use crate::catalog::descriptor::ElementDescriptor;
use crate::cli::config::ProbeConfig;
use crate::crawl::identity::PageIdentity;
use crate::report::report_model::{Artifact, FaultLog, FaultRecord, FaultSource};
use crate::trace::{logger::TraceLogger, trace::TraceEvent};

use super::artifacts::capture_screenshot;
use super::rules::{ConsoleFilter, FaultRule, Locator, RuleError, compile_rules};

/// A signal that survived filtering and becomes one fault record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub source: FaultSource,
    pub rule: String,
    pub text: String,
}

/// Looks for error signals after each action and owns the fault log.
pub struct FaultDetector {
    rules: Vec<FaultRule>,
    console_filter: ConsoleFilter,
    screenshot_dir: PathBuf,
    feedback_delay_ms: u64,
    report_dialogs: bool,
    report_console_errors: bool,
    next_index: u64,
    faults: FaultLog,
}

impl FaultDetector {
    pub fn from_config(config: &ProbeConfig) -> Result<Self, RuleError> {
        Ok(Self {
            rules: compile_rules(&config.fault_rules)?,
            console_filter: ConsoleFilter::new(&config.console_ignore)?,
            screenshot_dir: PathBuf::from(&config.screenshot_dir),
            feedback_delay_ms: config.feedback_delay_ms,
            report_dialogs: config.report_dialogs,
            report_console_errors: config.report_console_errors,
            next_index: 0,
            faults: FaultLog::new(),
        })
    }

    pub fn faults(&self) -> &FaultLog {
        &self.faults
    }

    /// Wait for feedback to render, probe every signal source and record
    /// one fault per distinct signal. Returns whether anything was recorded.
    ///
    /// Probe failures are logged and skipped; only a fatal driver error
    /// escapes.
    pub fn detect(
        &mut self,
        driver: &mut dyn Driver,
        page: &PageIdentity,
        action: &str,
        element: Option<&ElementDescriptor>,
        tracer: &TraceLogger,
    ) -> Result<bool, DriverError> {
        if let Err(e) = driver.wait(self.feedback_delay_ms) {
            if e.is_fatal() {
                return Err(e);
            }
            warn!("Feedback wait failed: {}", e);
        }

        let mut signals = self.probe_rules(driver)?;
        signals.extend(self.event_signals(driver.drain_events()));

        if signals.is_empty() {
            return Ok(false);
        }

        let url = current_url_or(driver, page)?;
        for signal in signals {
            error!(
                "ERROR DETECTED after '{}' on element '{}' at {}",
                action,
                element.map(|e| e.to_string()).unwrap_or_else(|| "N/A".into()),
                url
            );
            error!("  {} ({}): {}", signal_name(signal.source), signal.rule, signal.text);

            let artifact = self.capture(driver, page);
            self.record(
                FaultRecord {
                    page: page.clone(),
                    url: url.clone(),
                    action: action.to_string(),
                    element: element.cloned(),
                    message: signal.text,
                    source: signal.source,
                    artifact,
                },
                tracer,
            );
        }

        Ok(true)
    }

    /// Query every rule in order, keeping visible matches with distinct text.
    pub fn probe_rules(&self, driver: &mut dyn Driver) -> Result<Vec<Signal>, DriverError> {
        let mut signals = Vec::new();
        let mut seen_text: HashSet<String> = HashSet::new();

        for rule in &self.rules {
            let (source, found) = match &rule.locator {
                Locator::Css(selector) => (FaultSource::Notification, driver.query(selector)),
                Locator::Text(pattern) => (FaultSource::PageText, driver.query_text(pattern)),
            };

            let handles = match found {
                Ok(handles) => handles,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!("Exception while checking {}: {}", rule.label, e);
                    continue;
                }
            };

            for handle in handles {
                let text = match visible_text(driver, handle) {
                    Ok(Some(text)) => text,
                    Ok(None) => continue,
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        debug!("Match for {} could not be read: {}", rule.label, e);
                        continue;
                    }
                };

                if seen_text.insert(text.to_lowercase()) {
                    signals.push(Signal {
                        source,
                        rule: rule.label.clone(),
                        text,
                    });
                }
            }
        }

        Ok(signals)
    }

    /// Turn drained dialog and console events into signals.
    pub fn event_signals(&self, events: Vec<PageEvent>) -> Vec<Signal> {
        let mut signals = Vec::new();
        for event in events {
            match event {
                PageEvent::Dialog(dialog) if self.report_dialogs => signals.push(Signal {
                    source: FaultSource::Dialog,
                    rule: "dialog".into(),
                    text: format!("unexpected {} dialog: {}", dialog.kind, dialog.message),
                }),
                PageEvent::Console {
                    level: ConsoleLevel::Error,
                    text,
                } if self.report_console_errors => {
                    if self.console_filter.is_benign(&text) {
                        debug!("Ignoring benign console error: {}", text);
                        continue;
                    }
                    signals.push(Signal {
                        source: FaultSource::Console,
                        rule: "console".into(),
                        text: format!("console error: {}", text),
                    });
                }
                other => debug!("Page event not reported: {:?}", other),
            }
        }
        signals
    }

    /// Record a failed element action as a fault, keeping its category.
    pub fn record_action_error(
        &mut self,
        driver: &mut dyn Driver,
        page: &PageIdentity,
        action: &str,
        element: &ElementDescriptor,
        failure: &DriverError,
        tracer: &TraceLogger,
    ) -> Result<(), DriverError> {
        error!("Error interacting with {} on {}: {}", element, page, failure);
        let url = current_url_or(driver, page)?;
        let artifact = self.capture(driver, page);
        self.record(
            FaultRecord {
                page: page.clone(),
                url,
                action: action.to_string(),
                element: Some(element.clone()),
                message: failure.to_string(),
                source: FaultSource::Action,
                artifact,
            },
            tracer,
        );
        Ok(())
    }

    /// Record a page that could not be loaded.
    pub fn record_navigation_error(
        &mut self,
        page: &PageIdentity,
        url: &str,
        failure: &DriverError,
        tracer: &TraceLogger,
    ) {
        error!("Error navigating to {}: {}", url, failure);
        self.record(
            FaultRecord {
                page: page.clone(),
                url: url.to_string(),
                action: "page_navigation".into(),
                element: None,
                message: failure.to_string(),
                source: FaultSource::Navigation,
                artifact: Artifact::Unavailable("page did not load".into()),
            },
            tracer,
        );
    }

    fn capture(&mut self, driver: &mut dyn Driver, page: &PageIdentity) -> Artifact {
        let index = self.next_index;
        self.next_index += 1;
        capture_screenshot(driver, &self.screenshot_dir, page, index)
    }

    fn record(&mut self, record: FaultRecord, tracer: &TraceLogger) {
        let mut event = TraceEvent::now("fault")
            .with_url(&record.url)
            .with_action(&record.action)
            .with_detail(format!("{} [{}]", record.message, record.artifact));
        if let Some(element) = &record.element {
            event = event.with_element(element);
        }
        tracer.log(event);
        self.faults.push(record);
    }
}

fn signal_name(source: FaultSource) -> &'static str {
    match source {
        FaultSource::Notification => "Toast",
        FaultSource::PageText => "Error text",
        FaultSource::Dialog => "Dialog",
        FaultSource::Console => "Console",
        FaultSource::Action => "Action",
        FaultSource::Navigation => "Navigation",
    }
}

/// Visible element text, whitespace-collapsed; `None` when hidden.
fn visible_text(driver: &mut dyn Driver, handle: ElementRef) -> Result<Option<String>, DriverError> {
    if !driver.is_visible(handle)? {
        return Ok(None);
    }
    let text = driver.text_content(handle)?.unwrap_or_default();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    Ok(Some(if text.is_empty() {
        "No text content".to_string()
    } else {
        text
    }))
}

/// Current URL, or the page being processed when the driver cannot say.
pub(crate) fn current_url_or(driver: &mut dyn Driver, page: &PageIdentity) -> Result<String, DriverError> {
    match driver.current_url() {
        Ok(url) => Ok(url),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            debug!("Current URL unavailable: {}", e);
            Ok(page.to_string())
        }
    }
}
