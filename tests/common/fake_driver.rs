#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use regex::Regex;
use spa_prober::browser::driver::{
    ConsoleLevel, Dialog, DialogHandler, DialogReply, Driver, ElementRef, PageEvent,
    SelectChoice, SelectOption,
};
use spa_prober::browser::error::{ActionErrorKind, DriverError};
use spa_prober::crawl::identity::PageIdentity;

// ============================================================================
// Fake DOM
// ============================================================================

/// What happens when an element is acted on.
#[derive(Debug, Clone)]
pub enum Effect {
    /// Full page load of another URL
    Navigate(String),
    /// History push: URL changes, document stays
    SetUrl(String),
    /// Append an element to the live page (e.g. an error toast)
    Reveal(FakeElement),
    Dialog { kind: String, message: String },
    ConsoleError(String),
    /// The action itself fails with this category
    Fail(ActionErrorKind),
    /// The browser dies
    Crash,
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub text: String,
    pub visible: bool,
    pub enabled: bool,
    pub options: Vec<SelectOption>,
    pub effects: Vec<Effect>,
}

impl FakeElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            text: String::new(),
            visible: true,
            enabled: true,
            options: Vec::new(),
            effects: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.push((name.to_string(), value.to_string()));
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn option(mut self, value: &str, label: &str) -> Self {
        self.options.push(SelectOption {
            value: Some(value.to_string()),
            label: label.to_string(),
            disabled: false,
        });
        self
    }

    pub fn on_action(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    fn get(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

pub fn button(text: &str) -> FakeElement {
    FakeElement::new("button").text(text)
}

pub fn link(href: &str, text: &str) -> FakeElement {
    FakeElement::new("a").attr("href", href).text(text)
}

pub fn input(input_type: &str, id: &str) -> FakeElement {
    FakeElement::new("input").attr("type", input_type).attr("id", id)
}

pub fn error_toast(message: &str) -> FakeElement {
    FakeElement::new("div").attr("class", "toast-error").text(message)
}

// ============================================================================
// Minimal selector matching
// ============================================================================
//
// Supports `tag`, `.class`, `[attr]`, `[attr='v']`, `[attr*='v']` and
// `:not([...])`, compounded without whitespace.

fn matches_selector(el: &FakeElement, selector: &str) -> bool {
    let selector = selector.trim();
    let tag_end = selector
        .find(|c| c == '[' || c == ':' || c == '.')
        .unwrap_or(selector.len());
    let tag = &selector[..tag_end];
    if !tag.is_empty() && tag != el.tag {
        return false;
    }

    let mut rest = &selector[tag_end..];
    while !rest.is_empty() {
        if let Some(inner) = rest.strip_prefix(":not(") {
            let close = inner.find(')').unwrap();
            if attr_matches(el, &inner[..close]) {
                return false;
            }
            rest = &inner[close + 1..];
        } else if rest.starts_with('[') {
            let close = rest.find(']').unwrap();
            if !attr_matches(el, &rest[..=close]) {
                return false;
            }
            rest = &rest[close + 1..];
        } else if let Some(inner) = rest.strip_prefix('.') {
            let end = inner
                .find(|c| c == '[' || c == ':' || c == '.')
                .unwrap_or(inner.len());
            let class = &inner[..end];
            let has_class = el
                .get("class")
                .is_some_and(|c| c.split_whitespace().any(|x| x == class));
            if !has_class {
                return false;
            }
            rest = &inner[end..];
        } else {
            panic!("unsupported selector: {}", selector);
        }
    }
    true
}

fn attr_matches(el: &FakeElement, condition: &str) -> bool {
    let inner = condition.trim_start_matches('[').trim_end_matches(']');
    if let Some((name, value)) = inner.split_once("*=") {
        return el.get(name).is_some_and(|v| v.contains(unquote(value)));
    }
    if let Some((name, value)) = inner.split_once('=') {
        return el.get(name) == Some(unquote(value));
    }
    el.get(inner).is_some()
}

fn unquote(value: &str) -> &str {
    value.trim_matches(|c| c == '\'' || c == '"')
}

// ============================================================================
// Fake driver
// ============================================================================

/// Handle index reserved for `<body>`.
const BODY: u64 = 0;

/// In-memory browser over a fixed set of pages.
///
/// Handles carry the page generation in their upper bits; any full
/// navigation bumps the generation so older handles go stale.
pub struct FakeDriver {
    pages: HashMap<String, Vec<FakeElement>>,
    failing_urls: HashSet<String>,
    crash_on: HashSet<String>,
    broken_selectors: HashSet<String>,
    current_url: String,
    dom: Vec<FakeElement>,
    generation: u64,
    pending_navigation: bool,
    dialog_handler: Option<DialogHandler>,
    events: Vec<PageEvent>,
    dead: bool,
    /// URLs passed to `navigate`, in call order; click-triggered loads are not counted
    pub navigations: Vec<String>,
    /// `(action, element text or id)` in execution order
    pub actions: Vec<(String, String)>,
    pub dialog_replies: Vec<DialogReply>,
    pub screenshots: Vec<PathBuf>,
    pub waited_ms: u64,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            failing_urls: HashSet::new(),
            crash_on: HashSet::new(),
            broken_selectors: HashSet::new(),
            current_url: "about:blank".to_string(),
            dom: Vec::new(),
            generation: 1,
            pending_navigation: false,
            dialog_handler: None,
            events: Vec::new(),
            dead: false,
            navigations: Vec::new(),
            actions: Vec::new(),
            dialog_replies: Vec::new(),
            screenshots: Vec::new(),
            waited_ms: 0,
        }
    }

    pub fn page(mut self, url: &str, elements: Vec<FakeElement>) -> Self {
        self.pages.insert(key(url), elements);
        self
    }

    /// Navigating to `url` fails with a (non-fatal) navigation error.
    pub fn failing(mut self, url: &str) -> Self {
        self.failing_urls.insert(key(url));
        self
    }

    /// Navigating to `url` kills the browser.
    pub fn crashing_on(mut self, url: &str) -> Self {
        self.crash_on.insert(key(url));
        self
    }

    /// Querying `selector` fails with a probe error.
    pub fn broken_selector(mut self, selector: &str) -> Self {
        self.broken_selectors.insert(selector.to_string());
        self
    }

    pub fn navigation_count(&self, url: &str) -> usize {
        let wanted = key(url);
        self.navigations.iter().filter(|u| key(u) == wanted).count()
    }

    pub fn action_count(&self, target: &str) -> usize {
        self.actions.iter().filter(|(_, t)| t == target).count()
    }

    fn load(&mut self, url: &str) {
        let exact = key(url);
        let loose = PageIdentity::new(url, true).as_str().to_string();
        self.dom = self
            .pages
            .get(&exact)
            .or_else(|| self.pages.get(&loose))
            .cloned()
            .unwrap_or_default();
        self.current_url = url.to_string();
        self.generation += 1;
    }

    fn alive(&self) -> Result<(), DriverError> {
        if self.dead {
            return Err(DriverError::Fatal("Target page, context or browser has been closed".into()));
        }
        Ok(())
    }

    fn handle(&self, index: usize) -> ElementRef {
        ElementRef((self.generation << 32) | (index as u64 + 1))
    }

    /// `None` for the body handle, `Some(index)` for an element.
    fn resolve(&self, element: ElementRef) -> Result<Option<usize>, DriverError> {
        self.alive()?;
        let generation = element.0 >> 32;
        let slot = element.0 & 0xffff_ffff;
        if generation != self.generation {
            return Err(DriverError::action(
                ActionErrorKind::Stale,
                "Element is not attached to the DOM",
            ));
        }
        if slot == BODY {
            return Ok(None);
        }
        let index = (slot - 1) as usize;
        if index >= self.dom.len() {
            return Err(DriverError::action(ActionErrorKind::Stale, "Element is gone"));
        }
        Ok(Some(index))
    }

    fn element(&self, element: ElementRef) -> Result<Option<&FakeElement>, DriverError> {
        Ok(self.resolve(element)?.map(|i| &self.dom[i]))
    }

    fn body_text(&self) -> String {
        self.dom
            .iter()
            .filter(|e| e.visible)
            .map(|e| e.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn act(&mut self, element: ElementRef, action: &str) -> Result<(), DriverError> {
        let Some(index) = self.resolve(element)? else {
            return Ok(());
        };
        let target = self.dom[index].clone();
        if !target.visible {
            return Err(DriverError::action(
                ActionErrorKind::Timeout,
                format!("Timeout exceeded waiting for element to be visible ({})", action),
            ));
        }

        let name = if target.text.is_empty() {
            target.get("id").unwrap_or(&target.tag).to_string()
        } else {
            target.text.clone()
        };
        self.actions.push((action.to_string(), name));

        for effect in target.effects {
            match effect {
                Effect::Fail(kind) => {
                    return Err(DriverError::action(kind, format!("{} failed", action)));
                }
                Effect::Crash => {
                    self.dead = true;
                    return Err(DriverError::Fatal("Browser has been closed".into()));
                }
                Effect::Navigate(url) => {
                    self.load(&url);
                    self.pending_navigation = true;
                }
                Effect::SetUrl(url) => self.current_url = url,
                Effect::Reveal(el) => self.dom.push(el),
                Effect::Dialog { kind, message } => {
                    let dialog = Dialog { kind, message };
                    if let Some(handler) = self.dialog_handler.as_mut() {
                        let reply = handler(&dialog);
                        self.dialog_replies.push(reply);
                    }
                    self.events.push(PageEvent::Dialog(dialog));
                }
                Effect::ConsoleError(text) => self.events.push(PageEvent::Console {
                    level: ConsoleLevel::Error,
                    text,
                }),
            }
        }
        Ok(())
    }
}

fn key(url: &str) -> String {
    PageIdentity::new(url, false).as_str().to_string()
}

impl Driver for FakeDriver {
    fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<(), DriverError> {
        self.alive()?;
        let wanted = key(url);
        if self.crash_on.contains(&wanted) {
            self.dead = true;
            return Err(DriverError::Fatal("Browser has been closed".into()));
        }
        if self.failing_urls.contains(&wanted) {
            self.navigations.push(url.to_string());
            return Err(DriverError::Navigation {
                url: url.to_string(),
                message: "net::ERR_CONNECTION_REFUSED".into(),
            });
        }
        self.load(url);
        self.navigations.push(url.to_string());
        self.pending_navigation = false;
        Ok(())
    }

    fn current_url(&mut self) -> Result<String, DriverError> {
        self.alive()?;
        Ok(self.current_url.clone())
    }

    fn wait(&mut self, ms: u64) -> Result<(), DriverError> {
        self.alive()?;
        self.waited_ms += ms;
        Ok(())
    }

    fn wait_for_navigation(&mut self, timeout_ms: u64) -> Result<bool, DriverError> {
        self.alive()?;
        let navigated = std::mem::take(&mut self.pending_navigation);
        if !navigated {
            self.waited_ms += timeout_ms;
        }
        Ok(navigated)
    }

    fn query(&mut self, selector: &str) -> Result<Vec<ElementRef>, DriverError> {
        self.alive()?;
        if self.broken_selectors.contains(selector) {
            return Err(DriverError::Probe {
                source: selector.to_string(),
                message: "invalid selector".into(),
            });
        }
        if selector == "body" {
            return Ok(vec![ElementRef((self.generation << 32) | BODY)]);
        }
        Ok(self
            .dom
            .iter()
            .enumerate()
            .filter(|(_, e)| matches_selector(e, selector))
            .map(|(i, _)| self.handle(i))
            .collect())
    }

    fn query_text(&mut self, pattern: &Regex) -> Result<Vec<ElementRef>, DriverError> {
        self.alive()?;
        Ok(self
            .dom
            .iter()
            .enumerate()
            .filter(|(_, e)| pattern.is_match(&e.text))
            .map(|(i, _)| self.handle(i))
            .collect())
    }

    fn is_visible(&mut self, element: ElementRef) -> Result<bool, DriverError> {
        Ok(self.element(element)?.is_none_or(|e| e.visible))
    }

    fn is_enabled(&mut self, element: ElementRef) -> Result<bool, DriverError> {
        Ok(self.element(element)?.is_none_or(|e| e.enabled))
    }

    fn tag_name(&mut self, element: ElementRef) -> Result<String, DriverError> {
        Ok(self
            .element(element)?
            .map(|e| e.tag.clone())
            .unwrap_or_else(|| "body".into()))
    }

    fn attribute(&mut self, element: ElementRef, name: &str) -> Result<Option<String>, DriverError> {
        Ok(self
            .element(element)?
            .and_then(|e| e.get(name))
            .map(str::to_string))
    }

    fn text_content(&mut self, element: ElementRef) -> Result<Option<String>, DriverError> {
        let text = match self.element(element)? {
            Some(e) => e.text.clone(),
            None => self.body_text(),
        };
        Ok(Some(text).filter(|t| !t.is_empty()))
    }

    fn select_options(&mut self, element: ElementRef) -> Result<Vec<SelectOption>, DriverError> {
        Ok(self
            .element(element)?
            .map(|e| e.options.clone())
            .unwrap_or_default())
    }

    fn click(&mut self, element: ElementRef, _timeout_ms: u64) -> Result<(), DriverError> {
        self.act(element, "click")
    }

    fn fill(&mut self, element: ElementRef, value: &str, _timeout_ms: u64) -> Result<(), DriverError> {
        self.act(element, &format!("fill:{}", value))
    }

    fn select(
        &mut self,
        element: ElementRef,
        choice: &SelectChoice,
        _timeout_ms: u64,
    ) -> Result<(), DriverError> {
        let picked = match choice {
            SelectChoice::Value(v) | SelectChoice::Label(v) => v.clone(),
        };
        self.act(element, &format!("select:{}", picked))
    }

    fn check(&mut self, element: ElementRef, _timeout_ms: u64) -> Result<(), DriverError> {
        self.act(element, "check")
    }

    fn screenshot(&mut self, path: &Path, _full_page: bool) -> Result<(), DriverError> {
        self.alive()?;
        std::fs::write(path, b"\x89PNG fake").map_err(|e| DriverError::Io(e.to_string()))?;
        self.screenshots.push(path.to_path_buf());
        Ok(())
    }

    fn on_dialog(&mut self, handler: DialogHandler) {
        self.dialog_handler = Some(handler);
    }

    fn drain_events(&mut self) -> Vec<PageEvent> {
        std::mem::take(&mut self.events)
    }
}
