use tracing::debug;

use crate::browser::driver::Driver;
use crate::browser::error::DriverError;

use super::identity::{is_same_origin, resolve_url};

/// Visible anchors with an href, resolved and filtered to `base_origin`.
///
/// Document order is kept and duplicates are left in; the visited set is
/// where duplicates die.
pub fn extract_links(driver: &mut dyn Driver, base_origin: &str) -> Result<Vec<String>, DriverError> {
    let page_url = driver.current_url()?;
    let mut links = Vec::new();

    for anchor in driver.query("a[href]")? {
        let href = match visible_href(driver, anchor) {
            Ok(Some(href)) => href,
            Ok(None) => continue,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                debug!("Skipping anchor that went away: {}", e);
                continue;
            }
        };

        let Some(absolute) = resolve_url(&page_url, &href) else {
            continue;
        };

        if is_same_origin(base_origin, &absolute) {
            links.push(absolute);
        } else {
            debug!("Out of scope: {}", absolute);
        }
    }

    Ok(links)
}

fn visible_href(
    driver: &mut dyn Driver,
    anchor: crate::browser::driver::ElementRef,
) -> Result<Option<String>, DriverError> {
    if !driver.is_visible(anchor)? {
        return Ok(None);
    }
    Ok(driver
        .attribute(anchor, "href")?
        .filter(|href| !href.trim().is_empty()))
}
