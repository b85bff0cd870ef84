use std::fmt;

/// Why an element action failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionErrorKind {
    /// The action did not complete within its bound
    Timeout,
    /// The element was detached from the DOM (handle from an older page state)
    Stale,
    /// Any other driver-reported failure
    Failed,
}

impl ActionErrorKind {
    /// Label kept in fault messages so the category survives into the report.
    pub fn label(&self) -> &'static str {
        match self {
            ActionErrorKind::Timeout => "TimeoutError",
            ActionErrorKind::Stale => "StaleElementError",
            ActionErrorKind::Failed => "ActionError",
        }
    }
}

#[derive(Debug)]
pub enum DriverError {
    /// Page failed to load (timeout, network failure)
    Navigation { url: String, message: String },

    /// Element interaction failed
    Action { kind: ActionErrorKind, message: String },

    /// A selector or text query could not be evaluated on the page
    Probe { source: String, message: String },

    /// Browser, context or page is gone; nothing more can be driven
    Fatal(String),

    /// The driver process answered with something we did not expect
    Protocol { command: String, error: String },

    /// Reading from or writing to the driver process failed
    Io(String),

    /// Driver process failed to spawn
    Spawn { program: String, source: std::io::Error },

    /// JSON (de)serialization of a driver message failed
    Json { context: String, source: serde_json::Error },
}

impl DriverError {
    pub fn action(kind: ActionErrorKind, message: impl Into<String>) -> Self {
        DriverError::Action {
            kind,
            message: message.into(),
        }
    }

    /// Re-label a failed query on `source` as a probe failure.
    ///
    /// Everything but a plain command failure passes through unchanged.
    pub fn into_probe(self, source: &str) -> Self {
        match self {
            DriverError::Protocol { error, .. } => DriverError::Probe {
                source: source.to_string(),
                message: error,
            },
            other => other,
        }
    }

    /// Whether the run must stop: the session itself is unusable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DriverError::Fatal(_) | DriverError::Io(_) | DriverError::Spawn { .. }
        )
    }
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Navigation { url, message } => {
                write!(f, "Navigation to {} failed: {}", url, message)
            }
            DriverError::Action { kind, message } => {
                write!(f, "{}: {}", kind.label(), message)
            }
            DriverError::Probe { source, message } => {
                write!(f, "Probe '{}' failed: {}", source, message)
            }
            DriverError::Fatal(msg) => {
                write!(f, "Browser session unusable: {}", msg)
            }
            DriverError::Protocol { command, error } => {
                write!(f, "Driver command '{}' failed: {}", command, error)
            }
            DriverError::Io(msg) => {
                write!(f, "Driver I/O error: {}", msg)
            }
            DriverError::Spawn { program, source } => {
                write!(f, "Failed to spawn {} (is it installed?): {}", program, source)
            }
            DriverError::Json { context, source } => {
                write!(f, "JSON error ({}): {}", context, source)
            }
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriverError::Spawn { source, .. } => Some(source),
            DriverError::Json { source, .. } => Some(source),
            _ => None,
        }
    }
}
