use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::browser::driver::{
    ConsoleLevel, Dialog, DialogHandler, DialogReply, Driver, ElementRef, PageEvent,
    SelectChoice, SelectOption,
};
use crate::browser::error::{ActionErrorKind, DriverError};
use crate::cli::config::DriverConfig;

// ============================================================================
// Wire protocol
// ============================================================================
//
// The driver script reads one JSON request per line on stdin. For every
// request it writes zero or more event lines followed by exactly one
// response line on stdout. A `dialog` event blocks the script until a
// `dialog_reply` request with the same id arrives.

/// Request sent to the driver script over stdin (one JSON line).
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum BrowserRequest {
    Navigate {
        cmd: &'static str,
        url: String,
        timeout_ms: u64,
    },
    Wait {
        cmd: &'static str,
        duration_ms: u64,
    },
    Query {
        cmd: &'static str,
        selector: String,
    },
    QueryText {
        cmd: &'static str,
        pattern: String,
        flags: &'static str,
    },
    Inspect {
        cmd: &'static str,
        handle: u64,
        property: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Action {
        cmd: &'static str,
        action: &'static str,
        handle: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        choice: Option<SelectChoice>,
        timeout_ms: u64,
    },
    Screenshot {
        cmd: &'static str,
        path: String,
        full_page: bool,
    },
    DialogReply {
        cmd: &'static str,
        id: u64,
        accept: bool,
    },
    Bare {
        cmd: &'static str,
    },
}

impl BrowserRequest {
    pub fn navigate(url: &str, timeout_ms: u64) -> Self {
        BrowserRequest::Navigate {
            cmd: "navigate",
            url: url.to_string(),
            timeout_ms,
        }
    }

    pub fn wait(duration_ms: u64) -> Self {
        BrowserRequest::Wait {
            cmd: "wait",
            duration_ms,
        }
    }

    pub fn wait_for_navigation(timeout_ms: u64) -> Self {
        BrowserRequest::Wait {
            cmd: "wait_for_navigation",
            duration_ms: timeout_ms,
        }
    }

    pub fn query(selector: &str) -> Self {
        BrowserRequest::Query {
            cmd: "query",
            selector: selector.to_string(),
        }
    }

    /// Text patterns are always matched case-insensitively.
    pub fn query_text(pattern: &Regex) -> Self {
        BrowserRequest::QueryText {
            cmd: "query_text",
            pattern: pattern.as_str().to_string(),
            flags: "i",
        }
    }

    pub fn inspect(element: ElementRef, property: &'static str, name: Option<&str>) -> Self {
        BrowserRequest::Inspect {
            cmd: "inspect",
            handle: element.0,
            property,
            name: name.map(str::to_string),
        }
    }

    pub fn action(
        action: &'static str,
        element: ElementRef,
        value: Option<&str>,
        choice: Option<&SelectChoice>,
        timeout_ms: u64,
    ) -> Self {
        BrowserRequest::Action {
            cmd: "action",
            action,
            handle: element.0,
            value: value.map(str::to_string),
            choice: choice.cloned(),
            timeout_ms,
        }
    }

    pub fn screenshot(path: &Path, full_page: bool) -> Self {
        BrowserRequest::Screenshot {
            cmd: "screenshot",
            path: path.display().to_string(),
            full_page,
        }
    }

    pub fn dialog_reply(id: u64, reply: DialogReply) -> Self {
        BrowserRequest::DialogReply {
            cmd: "dialog_reply",
            id,
            accept: reply == DialogReply::Accept,
        }
    }

    pub fn current_url() -> Self {
        BrowserRequest::Bare { cmd: "current_url" }
    }

    pub fn quit() -> Self {
        BrowserRequest::Bare { cmd: "quit" }
    }
}

/// One line read from the driver script: either an event or a response.
#[derive(Debug, Deserialize)]
pub struct BrowserResponse {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// timeout, stale, navigation, fatal, or anything else
    #[serde(default)]
    pub error_kind: Option<String>,
    #[serde(default)]
    pub ready: Option<bool>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub handles: Option<Vec<u64>>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub navigated: Option<bool>,

    /// Set on event lines: "dialog" or "console"
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl BrowserResponse {
    fn is_event(&self) -> bool {
        self.event.is_some()
    }

    /// Map a failed response onto the error taxonomy.
    ///
    /// `action` marks commands whose failures are element-action errors.
    pub fn into_error(self, command: &str, action: bool) -> DriverError {
        let message = self.error.unwrap_or_else(|| "Unknown error".into());
        match self.error_kind.as_deref() {
            Some("fatal") => DriverError::Fatal(message),
            Some("navigation") => DriverError::Navigation {
                url: self.url.unwrap_or_default(),
                message,
            },
            Some("stale") if action => DriverError::action(ActionErrorKind::Stale, message),
            Some("timeout") if action => DriverError::action(ActionErrorKind::Timeout, message),
            _ if action => DriverError::action(ActionErrorKind::Failed, message),
            _ => DriverError::Protocol {
                command: command.into(),
                error: message,
            },
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// A persistent browser session backed by a driver script.
///
/// Launches a long-lived process that keeps one browser page open.
/// Commands are sent as NDJSON over stdin, responses read from stdout.
pub struct BrowserSession {
    child: Child,
    stdin: ChildStdin,
    reader: BufReader<ChildStdout>,
    dialog_handler: Option<DialogHandler>,
    events: Vec<PageEvent>,
    closed: bool,
}

impl BrowserSession {
    /// Spawn the driver script and wait for its ready signal.
    pub fn launch(config: &DriverConfig) -> Result<Self, DriverError> {
        let mut command = Command::new(&config.program);
        command.arg(&config.script);
        if config.headless {
            command.arg("--headless");
        }
        if let Some(agent) = &config.user_agent {
            command.arg("--user-agent").arg(agent);
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| DriverError::Spawn {
                program: format!("{} {}", config.program, config.script),
                source: e,
            })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| DriverError::Io("Failed to capture stdin of driver script".into()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| DriverError::Io("Failed to capture stdout of driver script".into()))?;

        let mut session = BrowserSession {
            child,
            stdin,
            reader: BufReader::new(stdout),
            dialog_handler: None,
            events: Vec::new(),
            closed: false,
        };

        let response = session.read_message("ready signal")?;
        if !response.ok || response.ready != Some(true) {
            return Err(DriverError::Protocol {
                command: "launch".into(),
                error: "Did not receive ready signal from driver script".into(),
            });
        }

        Ok(session)
    }

    fn write_request(&mut self, request: &BrowserRequest) -> Result<(), DriverError> {
        let json = serde_json::to_string(request).map_err(|e| DriverError::Json {
            context: "BrowserRequest".into(),
            source: e,
        })?;

        writeln!(self.stdin, "{}", json)
            .map_err(|e| DriverError::Io(format!("Failed to write to driver stdin: {}", e)))?;

        self.stdin
            .flush()
            .map_err(|e| DriverError::Io(format!("Failed to flush driver stdin: {}", e)))
    }

    fn read_message(&mut self, context: &str) -> Result<BrowserResponse, DriverError> {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .map_err(|e| DriverError::Io(format!("Failed to read from driver stdout: {}", e)))?;

        if line.trim().is_empty() {
            return Err(DriverError::Io(
                "Empty response from driver script (process may have died)".into(),
            ));
        }

        serde_json::from_str(line.trim()).map_err(|e| DriverError::Json {
            context: context.into(),
            source: e,
        })
    }

    /// Send a request and read lines until its response arrives.
    ///
    /// Dialog events are answered inline before the response is read.
    fn send(&mut self, request: &BrowserRequest) -> Result<BrowserResponse, DriverError> {
        self.write_request(request)?;

        loop {
            let message = self.read_message("driver response")?;
            if !message.is_event() {
                return Ok(message);
            }
            self.handle_event(message)?;
        }
    }

    fn handle_event(&mut self, message: BrowserResponse) -> Result<(), DriverError> {
        match message.event.as_deref() {
            Some("dialog") => {
                let dialog = Dialog {
                    kind: message.kind.unwrap_or_else(|| "alert".into()),
                    message: message.message.unwrap_or_default(),
                };
                let reply = match self.dialog_handler.as_mut() {
                    Some(handler) => handler(&dialog),
                    None => DialogReply::Dismiss,
                };
                self.events.push(PageEvent::Dialog(dialog));
                if let Some(id) = message.id {
                    self.write_request(&BrowserRequest::dialog_reply(id, reply))?;
                }
            }
            Some("console") => {
                self.events.push(PageEvent::Console {
                    level: ConsoleLevel::from_name(message.level.as_deref().unwrap_or("info")),
                    text: message.text.unwrap_or_default(),
                });
            }
            other => {
                tracing::debug!("Ignoring unknown driver event {:?}", other);
            }
        }
        Ok(())
    }

    /// Send a request and verify it succeeded.
    fn send_ok(
        &mut self,
        request: &BrowserRequest,
        command_name: &str,
        action: bool,
    ) -> Result<BrowserResponse, DriverError> {
        let response = self.send(request)?;
        if !response.ok {
            return Err(response.into_error(command_name, action));
        }
        Ok(response)
    }

    fn inspect(
        &mut self,
        element: ElementRef,
        property: &'static str,
        name: Option<&str>,
    ) -> Result<Value, DriverError> {
        let request = BrowserRequest::inspect(element, property, name);
        let response = self.send_ok(&request, property, true)?;
        Ok(response.value.unwrap_or(Value::Null))
    }

    fn inspect_bool(&mut self, element: ElementRef, property: &'static str) -> Result<bool, DriverError> {
        Ok(self.inspect(element, property, None)?.as_bool().unwrap_or(false))
    }

    fn inspect_string(
        &mut self,
        element: ElementRef,
        property: &'static str,
        name: Option<&str>,
    ) -> Result<Option<String>, DriverError> {
        Ok(self
            .inspect(element, property, name)?
            .as_str()
            .map(str::to_string))
    }

    fn handles(response: BrowserResponse) -> Vec<ElementRef> {
        response
            .handles
            .unwrap_or_default()
            .into_iter()
            .map(ElementRef)
            .collect()
    }

    /// Quit the browser session.
    pub fn quit(&mut self) -> Result<(), DriverError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        // Best-effort quit: the process may already be gone
        let _ = self.write_request(&BrowserRequest::quit());
        let _ = self.child.wait();
        Ok(())
    }
}

impl Driver for BrowserSession {
    fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<(), DriverError> {
        let request = BrowserRequest::navigate(url, timeout_ms);
        let response = self.send(&request)?;
        if response.ok {
            return Ok(());
        }
        match response.into_error("navigate", false) {
            DriverError::Fatal(msg) => Err(DriverError::Fatal(msg)),
            DriverError::Navigation { message, .. } | DriverError::Protocol { error: message, .. } => {
                Err(DriverError::Navigation {
                    url: url.to_string(),
                    message,
                })
            }
            other => Err(other),
        }
    }

    fn current_url(&mut self) -> Result<String, DriverError> {
        let response = self.send_ok(&BrowserRequest::current_url(), "current_url", false)?;
        response.url.ok_or_else(|| DriverError::Protocol {
            command: "current_url".into(),
            error: "No URL in current_url response".into(),
        })
    }

    fn wait(&mut self, ms: u64) -> Result<(), DriverError> {
        self.send_ok(&BrowserRequest::wait(ms), "wait", false)?;
        Ok(())
    }

    fn wait_for_navigation(&mut self, timeout_ms: u64) -> Result<bool, DriverError> {
        let request = BrowserRequest::wait_for_navigation(timeout_ms);
        let response = self.send_ok(&request, "wait_for_navigation", false)?;
        Ok(response.navigated.unwrap_or(false))
    }

    fn query(&mut self, selector: &str) -> Result<Vec<ElementRef>, DriverError> {
        let response = self
            .send_ok(&BrowserRequest::query(selector), "query", false)
            .map_err(|e| e.into_probe(selector))?;
        Ok(Self::handles(response))
    }

    fn query_text(&mut self, pattern: &Regex) -> Result<Vec<ElementRef>, DriverError> {
        let response = self
            .send_ok(&BrowserRequest::query_text(pattern), "query_text", false)
            .map_err(|e| e.into_probe(pattern.as_str()))?;
        Ok(Self::handles(response))
    }

    fn is_visible(&mut self, element: ElementRef) -> Result<bool, DriverError> {
        self.inspect_bool(element, "visible")
    }

    fn is_enabled(&mut self, element: ElementRef) -> Result<bool, DriverError> {
        self.inspect_bool(element, "enabled")
    }

    fn tag_name(&mut self, element: ElementRef) -> Result<String, DriverError> {
        Ok(self
            .inspect_string(element, "tag", None)?
            .unwrap_or_default()
            .to_lowercase())
    }

    fn attribute(&mut self, element: ElementRef, name: &str) -> Result<Option<String>, DriverError> {
        self.inspect_string(element, "attribute", Some(name))
    }

    fn text_content(&mut self, element: ElementRef) -> Result<Option<String>, DriverError> {
        self.inspect_string(element, "text", None)
    }

    fn select_options(&mut self, element: ElementRef) -> Result<Vec<SelectOption>, DriverError> {
        let value = self.inspect(element, "options", None)?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        serde_json::from_value(value).map_err(|e| DriverError::Json {
            context: "select options".into(),
            source: e,
        })
    }

    fn click(&mut self, element: ElementRef, timeout_ms: u64) -> Result<(), DriverError> {
        let request = BrowserRequest::action("click", element, None, None, timeout_ms);
        self.send_ok(&request, "click", true)?;
        Ok(())
    }

    fn fill(&mut self, element: ElementRef, value: &str, timeout_ms: u64) -> Result<(), DriverError> {
        let request = BrowserRequest::action("fill", element, Some(value), None, timeout_ms);
        self.send_ok(&request, "fill", true)?;
        Ok(())
    }

    fn select(
        &mut self,
        element: ElementRef,
        choice: &SelectChoice,
        timeout_ms: u64,
    ) -> Result<(), DriverError> {
        let request = BrowserRequest::action("select", element, None, Some(choice), timeout_ms);
        self.send_ok(&request, "select", true)?;
        Ok(())
    }

    fn check(&mut self, element: ElementRef, timeout_ms: u64) -> Result<(), DriverError> {
        let request = BrowserRequest::action("check", element, None, None, timeout_ms);
        self.send_ok(&request, "check", true)?;
        Ok(())
    }

    fn screenshot(&mut self, path: &Path, full_page: bool) -> Result<(), DriverError> {
        self.send_ok(&BrowserRequest::screenshot(path, full_page), "screenshot", false)?;
        Ok(())
    }

    fn on_dialog(&mut self, handler: DialogHandler) {
        self.dialog_handler = Some(handler);
    }

    fn drain_events(&mut self) -> Vec<PageEvent> {
        std::mem::take(&mut self.events)
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        // Best-effort cleanup
        let _ = self.quit();
    }
}
