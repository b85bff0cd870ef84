use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{error, info};

use crate::browser::driver::Driver;
use crate::crawl::identity::PageIdentity;
use crate::report::report_model::Artifact;

/// `error_<page>_<YYYYmmdd_HHMMSS>_<index>.png` inside `dir`.
pub fn screenshot_path(dir: &Path, page: &PageIdentity, index: u64) -> PathBuf {
    let filename = format!(
        "error_{}_{}_{}.png",
        page.file_stem(),
        Local::now().format("%Y%m%d_%H%M%S"),
        index
    );
    dir.join(filename)
}

/// Take a full-page screenshot for a fault.
///
/// Never fails: a capture problem turns into an `Unavailable` artifact.
/// A file is only referenced once it exists and is non-empty.
pub fn capture_screenshot(
    driver: &mut dyn Driver,
    dir: &Path,
    page: &PageIdentity,
    index: u64,
) -> Artifact {
    if let Err(e) = std::fs::create_dir_all(dir) {
        error!("Cannot create screenshot directory {}: {}", dir.display(), e);
        return Artifact::Unavailable(format!("screenshot directory: {}", e));
    }

    let path = screenshot_path(dir, page, index);
    if let Err(e) = driver.screenshot(&path, true) {
        error!("Failed to take screenshot: {}", e);
        return Artifact::Unavailable(format!("screenshot failed: {}", e));
    }

    match std::fs::metadata(&path) {
        Ok(meta) if meta.len() > 0 => {
            info!("  Screenshot saved to: {}", path.display());
            Artifact::Screenshot(path)
        }
        Ok(_) => Artifact::Unavailable("screenshot file is empty".into()),
        Err(e) => Artifact::Unavailable(format!("screenshot missing: {}", e)),
    }
}
