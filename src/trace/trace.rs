use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::catalog::descriptor::ElementDescriptor;
use crate::report::report_model::Outcome;

/// One line of the run log.
#[derive(Debug, Serialize)]
pub struct TraceEvent {
    pub timestamp_ms: u128,
    pub step: u64,

    /// navigate, navigation_error, interact, skip, fault, summary, ...
    pub kind: String,

    pub url: Option<String>,
    pub element: Option<String>,
    pub action: Option<String>,
    pub outcome: Option<String>,
    pub detail: Option<String>,
}

impl TraceEvent {
    pub fn now(kind: &str) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            step: 0,
            kind: kind.to_string(),
            url: None,
            element: None,
            action: None,
            outcome: None,
            detail: None,
        }
    }

    pub fn with_url(mut self, url: impl ToString) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn with_element(mut self, element: &ElementDescriptor) -> Self {
        self.element = Some(element.to_string());
        self
    }

    pub fn with_action(mut self, action: impl ToString) -> Self {
        self.action = Some(action.to_string());
        self
    }

    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome.to_string());
        self
    }

    pub fn with_detail(mut self, detail: impl ToString) -> Self {
        self.detail = Some(detail.to_string());
        self
    }
}
