use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::catalog::descriptor::ElementDescriptor;
use crate::crawl::identity::PageIdentity;

// ============================================================================
// Interaction records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Click,
    Fill,
    Select,
    Check,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    NoObservableChange,
    InPageUpdate,
    FullNavigation,
    ActionError,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Outcome::NoObservableChange => "no-observable-change",
            Outcome::InPageUpdate => "in-page-update",
            Outcome::FullNavigation => "full-navigation",
            Outcome::ActionError => "action-error",
        };
        f.write_str(name)
    }
}

/// What was done to one element and what came of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InteractionRecord {
    pub page: PageIdentity,
    pub element: ElementDescriptor,
    pub action: ActionKind,
    /// Human-readable form of the action, e.g. `fill input type='email'`
    pub description: String,
    pub outcome: Outcome,
}

// ============================================================================
// Fault records
// ============================================================================

/// Where a fault came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultSource {
    Notification,
    PageText,
    Dialog,
    Console,
    Action,
    Navigation,
}

/// Diagnostic attached to a fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Artifact {
    Screenshot(PathBuf),
    /// Capture was not attempted or failed; the reason is kept
    Unavailable(String),
}

impl Artifact {
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Artifact::Screenshot(path) => Some(path),
            Artifact::Unavailable(_) => None,
        }
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Artifact::Screenshot(path) => write!(f, "{}", path.display()),
            Artifact::Unavailable(reason) => write!(f, "unavailable ({})", reason),
        }
    }
}

/// Evidence that an action surfaced an application-level error.
///
/// Built only by the fault detector and never changed once logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaultRecord {
    pub page: PageIdentity,
    /// Full URL the browser was on when the fault was seen
    pub url: String,
    pub action: String,
    pub element: Option<ElementDescriptor>,
    pub message: String,
    pub source: FaultSource,
    pub artifact: Artifact,
}

impl FaultRecord {
    pub fn element_label(&self) -> String {
        self.element
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "N/A".to_string())
    }

    fn sort_key(&self) -> (&PageIdentity, &str, String, &str) {
        (&self.page, &self.action, self.element_label(), &self.message)
    }
}

/// Append-only list of faults in detection order.
#[derive(Debug, Clone, Default)]
pub struct FaultLog {
    records: Vec<FaultRecord>,
}

impl FaultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: FaultRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[FaultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sorted copy with repeats of the same page/action/element/message collapsed.
    pub fn summary(&self) -> Vec<FaultRecord> {
        let mut sorted = self.records.clone();
        sorted.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        sorted.dedup_by(|a, b| a.sort_key() == b.sort_key());
        sorted
    }
}

// ============================================================================
// Run report
// ============================================================================

/// Final result of one run, consumed by the console, JUnit and JSON reporters.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// probe, catalog or smoke
    pub mode: String,

    pub base_url: String,

    /// Pages in the order they were claimed
    pub pages: Vec<PageIdentity>,

    pub elements_cataloged: usize,

    pub interactions: Vec<InteractionRecord>,

    /// Sorted, de-duplicated faults
    pub faults: Vec<FaultRecord>,

    /// Sorted unique descriptors (catalog mode)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub discovered: Vec<ElementDescriptor>,

    /// Set when a fatal driver error cut the run short
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
}

impl RunReport {
    pub fn with_duration(mut self, duration_ms: u128) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn outcome_count(&self, outcome: Outcome) -> usize {
        self.interactions
            .iter()
            .filter(|i| i.outcome == outcome)
            .count()
    }

    /// Faults recorded against one page.
    pub fn faults_for<'a>(&'a self, page: &'a PageIdentity) -> impl Iterator<Item = &'a FaultRecord> {
        self.faults.iter().filter(move |f| &f.page == page)
    }

    /// No faults and the run finished.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty() && self.aborted.is_none()
    }
}
