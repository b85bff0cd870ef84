use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::detect::rules::{FaultRuleSpec, RuleKind};

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "spa-prober",
    version,
    about = "Explores a running web app, exercises every control and reports faults"
)]
pub struct Cli {
    /// What to run (default: probe)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to config file (default: spa-prober.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Application base URL (overrides config)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Directory for fault screenshots (overrides config)
    #[arg(long, global = true)]
    pub screenshot_dir: Option<String>,

    /// JSONL run log path (overrides config)
    #[arg(long, global = true)]
    pub run_log: Option<String>,

    /// Treat URLs that differ only in their query string as distinct pages
    #[arg(long, global = true)]
    pub keep_query: bool,

    /// Report format: console, junit, json
    #[arg(long, global = true)]
    pub format: Option<String>,

    /// Report output file (default: stdout)
    #[arg(short, long, global = true)]
    pub output: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Crawl the app, interact with every element and detect faults
    Probe,

    /// Crawl the app and list every interactive element found
    Catalog,

    /// Load a fixed set of paths and fail on dialogs or console errors
    Smoke {
        /// Path to check, relative to the base URL (repeatable)
        #[arg(long = "path")]
        paths: Vec<String>,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `spa-prober.yaml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub driver: DriverConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Everything the crawl, catalog, dispatcher and detector read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Application origin; only same-origin URLs are visited
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_start_path")]
    pub start_path: String,

    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_ms: u64,

    /// Wait after each page load for asynchronous rendering
    #[serde(default = "default_settle_delay")]
    pub settle_delay_ms: u64,

    /// Bound on a single click
    #[serde(default = "default_action_timeout")]
    pub action_timeout_ms: u64,

    /// Bound on fill / check / select
    #[serde(default = "default_input_timeout")]
    pub input_timeout_ms: u64,

    /// How long a click may take to turn into a full navigation
    #[serde(default = "default_navigation_wait")]
    pub navigation_wait_ms: u64,

    /// Wait before probing for fault signals
    #[serde(default = "default_feedback_delay")]
    pub feedback_delay_ms: u64,

    #[serde(default = "default_post_input_delay")]
    pub post_input_delay_ms: u64,

    /// Ignore the query string when deciding whether a page was visited
    #[serde(default = "default_true")]
    pub strip_query: bool,

    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: String,

    #[serde(default = "default_run_log")]
    pub run_log: String,

    /// Ordered detection rules
    #[serde(default = "default_fault_rules")]
    pub fault_rules: Vec<FaultRuleSpec>,

    /// Console errors matching any of these patterns are benign noise
    #[serde(default)]
    pub console_ignore: Vec<String>,

    #[serde(default = "default_true")]
    pub report_dialogs: bool,

    #[serde(default = "default_true")]
    pub report_console_errors: bool,

    #[serde(default = "default_smoke_paths")]
    pub smoke_paths: Vec<String>,

    /// Stop after this many pages (0 = no limit)
    #[serde(default)]
    pub max_pages: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            start_path: default_start_path(),
            navigation_timeout_ms: default_navigation_timeout(),
            settle_delay_ms: default_settle_delay(),
            action_timeout_ms: default_action_timeout(),
            input_timeout_ms: default_input_timeout(),
            navigation_wait_ms: default_navigation_wait(),
            feedback_delay_ms: default_feedback_delay(),
            post_input_delay_ms: default_post_input_delay(),
            strip_query: true,
            screenshot_dir: default_screenshot_dir(),
            run_log: default_run_log(),
            fault_rules: default_fault_rules(),
            console_ignore: Vec::new(),
            report_dialogs: true,
            report_console_errors: true,
            smoke_paths: default_smoke_paths(),
            max_pages: 0,
        }
    }
}

impl ProbeConfig {
    /// Base URL joined with `start_path`.
    pub fn start_url(&self) -> String {
        join_path(&self.base_url, &self.start_path)
    }

    /// Base URL joined with an app-relative path.
    pub fn url_for(&self, path: &str) -> String {
        join_path(&self.base_url, path)
    }
}

fn join_path(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default = "default_program")]
    pub program: String,

    #[serde(default = "default_script")]
    pub script: String,

    #[serde(default = "default_true")]
    pub headless: bool,

    pub user_agent: Option<String>,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            script: default_script(),
            headless: true,
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default = "default_console")]
    pub format: String,

    pub output: Option<String>,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: default_console(),
            output: None,
        }
    }
}

// Serde default helpers
fn default_base_url() -> String { "http://localhost:5173".to_string() }
fn default_start_path() -> String { "/".to_string() }
fn default_navigation_timeout() -> u64 { 10_000 }
fn default_settle_delay() -> u64 { 1_000 }
fn default_action_timeout() -> u64 { 2_000 }
fn default_input_timeout() -> u64 { 1_000 }
fn default_navigation_wait() -> u64 { 5_000 }
fn default_feedback_delay() -> u64 { 500 }
fn default_post_input_delay() -> u64 { 200 }
fn default_true() -> bool { true }
fn default_screenshot_dir() -> String { "error_screenshots".to_string() }
fn default_run_log() -> String { "interaction_run.jsonl".to_string() }
fn default_smoke_paths() -> Vec<String> { vec!["/".to_string()] }
fn default_program() -> String { "node".to_string() }
fn default_script() -> String { "node/browser_server.js".to_string() }
fn default_console() -> String { "console".to_string() }

fn default_fault_rules() -> Vec<FaultRuleSpec> {
    vec![
        FaultRuleSpec::new(RuleKind::Selector, ".toast-error"),
        FaultRuleSpec::new(RuleKind::Selector, "[data-sonner-toast][data-type='error']"),
        FaultRuleSpec::new(RuleKind::Text, "Le fichier n’a pas pu être téléchargé"),
        FaultRuleSpec::new(RuleKind::Text, "Une erreur est survenue"),
        FaultRuleSpec::new(RuleKind::Text, "échec"),
        FaultRuleSpec::new(RuleKind::Text, "erreur"),
    ]
}

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if the file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("spa-prober.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => parse_config(&content).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed config {}: {}", config_path, e);
            AppConfig::default()
        }),
        Err(_) => AppConfig::default(),
    }
}

pub fn parse_config(content: &str) -> Result<AppConfig, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

/// Default log filter: WARN, INFO at -v, DEBUG at -vv, ERROR with --quiet.
pub fn log_level(cli: &Cli) -> &'static str {
    if cli.quiet {
        return "error";
    }
    match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Apply command-line overrides on top of the loaded file.
pub fn apply_overrides(config: &mut AppConfig, cli: &Cli) {
    if let Some(url) = &cli.base_url {
        config.probe.base_url = url.clone();
    }
    if let Some(dir) = &cli.screenshot_dir {
        config.probe.screenshot_dir = dir.clone();
    }
    if let Some(log) = &cli.run_log {
        config.probe.run_log = log.clone();
    }
    if cli.keep_query {
        config.probe.strip_query = false;
    }
    if let Some(format) = &cli.format {
        config.report.format = format.clone();
    }
    if cli.output.is_some() {
        config.report.output = cli.output.clone();
    }
}
