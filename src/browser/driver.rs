use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::browser::error::DriverError;

// ============================================================================
// Driver port
// ============================================================================

/// Opaque handle to a DOM node, valid for one page load only.
///
/// Handles are never kept across navigations; a handle used after the page
/// changed yields a `Stale` action error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementRef(pub u64);

/// One `<option>` of a `<select>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub disabled: bool,
}

/// How an option is picked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectChoice {
    Value(String),
    Label(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    /// alert, confirm, prompt or beforeunload
    pub kind: String,
    pub message: String,
}

/// Reply given to an open dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogReply {
    Accept,
    Dismiss,
}

/// Callback run synchronously when a dialog opens.
///
/// The driver sends the reply before it reports the triggering command as
/// complete, so the next action never races a pending dialog.
pub type DialogHandler = Box<dyn FnMut(&Dialog) -> DialogReply>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Error,
    Warning,
    Info,
    Debug,
}

impl ConsoleLevel {
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "error" => ConsoleLevel::Error,
            "warning" | "warn" => ConsoleLevel::Warning,
            "debug" | "trace" => ConsoleLevel::Debug,
            _ => ConsoleLevel::Info,
        }
    }
}

/// Something the page emitted outside of any command response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    /// A dialog opened and was answered by the registered handler
    Dialog(Dialog),
    Console { level: ConsoleLevel, text: String },
}

/// Capability surface the prober needs from a browser.
///
/// One page is driven at a time; every call blocks until the browser answers.
pub trait Driver {
    /// Load `url` and wait until the network settles or `timeout_ms` expires.
    fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<(), DriverError>;

    fn current_url(&mut self) -> Result<String, DriverError>;

    /// Pause without doing anything, letting asynchronous rendering finish.
    fn wait(&mut self, ms: u64) -> Result<(), DriverError>;

    /// Whether a navigation started since the last action and settled in time.
    ///
    /// Expiry is not an error: it means no navigation happened.
    fn wait_for_navigation(&mut self, timeout_ms: u64) -> Result<bool, DriverError>;

    fn query(&mut self, selector: &str) -> Result<Vec<ElementRef>, DriverError>;

    /// Smallest elements whose text matches `pattern`, in document order.
    fn query_text(&mut self, pattern: &Regex) -> Result<Vec<ElementRef>, DriverError>;

    fn is_visible(&mut self, element: ElementRef) -> Result<bool, DriverError>;

    fn is_enabled(&mut self, element: ElementRef) -> Result<bool, DriverError>;

    /// Lower-case tag name.
    fn tag_name(&mut self, element: ElementRef) -> Result<String, DriverError>;

    fn attribute(&mut self, element: ElementRef, name: &str) -> Result<Option<String>, DriverError>;

    fn text_content(&mut self, element: ElementRef) -> Result<Option<String>, DriverError>;

    fn select_options(&mut self, element: ElementRef) -> Result<Vec<SelectOption>, DriverError>;

    fn click(&mut self, element: ElementRef, timeout_ms: u64) -> Result<(), DriverError>;

    fn fill(&mut self, element: ElementRef, value: &str, timeout_ms: u64) -> Result<(), DriverError>;

    fn select(
        &mut self,
        element: ElementRef,
        choice: &SelectChoice,
        timeout_ms: u64,
    ) -> Result<(), DriverError>;

    fn check(&mut self, element: ElementRef, timeout_ms: u64) -> Result<(), DriverError>;

    fn screenshot(&mut self, path: &Path, full_page: bool) -> Result<(), DriverError>;

    /// Register the dialog callback, replacing any previous one.
    fn on_dialog(&mut self, handler: DialogHandler);

    /// Dialogs and console messages observed since the last drain.
    fn drain_events(&mut self) -> Vec<PageEvent>;
}

/// Dialog handler used by the prober: log and dismiss.
pub fn dismiss_all() -> DialogHandler {
    Box::new(|dialog: &Dialog| {
        tracing::info!(
            "Dialog opened: type={}, message='{}'. Dismissing.",
            dialog.kind,
            dialog.message
        );
        DialogReply::Dismiss
    })
}
