#![allow(dead_code)]

pub mod fake_driver;

use std::path::Path;

use spa_prober::cli::config::ProbeConfig;

pub const BASE: &str = "http://app.test";

pub fn url(path: &str) -> String {
    format!("{}{}", BASE, path)
}

/// Defaults pointed at the fake site, writing screenshots into `dir`.
pub fn test_config(dir: &Path) -> ProbeConfig {
    ProbeConfig {
        base_url: BASE.to_string(),
        screenshot_dir: dir.join("shots").to_string_lossy().into_owned(),
        run_log: dir.join("run.jsonl").to_string_lossy().into_owned(),
        ..ProbeConfig::default()
    }
}
