use std::collections::{BTreeSet, HashSet};

use tracing::{debug, warn};

use crate::browser::driver::{Driver, ElementRef};
use crate::browser::error::DriverError;

use super::descriptor::{ElementCategory, ElementDescriptor, IDENTITY_ATTRIBUTES};

// ============================================================================
// Selector passes
// ============================================================================

/// Explicit interactive tags, scanned first.
pub const SPECIFIC_SELECTORS: [&str; 5] = [
    "button",
    "a[href]",
    "input:not([type='hidden'])",
    "select",
    "textarea",
];

/// Catch-all for custom controls: interactive roles, click handlers and
/// test ids following common action naming.
pub const GENERIC_SELECTORS: [&str; 12] = [
    "[role='button']",
    "[role='link']",
    "[role='menuitem']",
    "[role='tab']",
    "[role='checkbox']",
    "[role='radio']",
    "[onclick]",
    "[data-testid*='button']",
    "[data-testid*='link']",
    "[data-testid*='submit']",
    "[data-testid*='action']",
    "[data-testid*='menu-item']",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorPass {
    Specific,
    Generic,
}

/// One cataloged element: its identity plus the handle to act on it.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub descriptor: ElementDescriptor,
    pub handle: ElementRef,
    pub pass: SelectorPass,
}

// ============================================================================
// Process-wide discovered set
// ============================================================================

/// Every distinct descriptor seen during a discovery crawl, kept sorted.
#[derive(Debug, Clone, Default)]
pub struct DiscoveredElements {
    elements: BTreeSet<ElementDescriptor>,
}

impl DiscoveredElements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge<'a>(&mut self, descriptors: impl IntoIterator<Item = &'a ElementDescriptor>) {
        self.elements.extend(descriptors.into_iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, descriptor: &ElementDescriptor) -> bool {
        self.elements.contains(descriptor)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ElementDescriptor> {
        self.elements.iter()
    }
}

// ============================================================================
// Cataloging
// ============================================================================

/// Enumerate the visible interactive elements of the loaded page.
///
/// Specific passes run before generic ones. A descriptor already cataloged
/// is never added twice, and a generic hit on a standard tag is dropped once
/// any specific pass produced an element of that category. When `discovered`
/// is given, every produced descriptor is merged into it.
pub fn catalog_page(
    driver: &mut dyn Driver,
    discovered: Option<&mut DiscoveredElements>,
) -> Result<Vec<CatalogEntry>, DriverError> {
    let mut entries: Vec<CatalogEntry> = Vec::new();
    let mut seen: HashSet<ElementDescriptor> = HashSet::new();
    let mut specific_categories: HashSet<ElementCategory> = HashSet::new();

    let passes = SPECIFIC_SELECTORS
        .iter()
        .map(|s| (*s, SelectorPass::Specific))
        .chain(GENERIC_SELECTORS.iter().map(|s| (*s, SelectorPass::Generic)));

    for (selector, pass) in passes {
        let handles = match driver.query(selector) {
            Ok(handles) => handles,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!("Selector {} failed: {}", selector, e);
                continue;
            }
        };

        for handle in handles {
            let descriptor = match describe_visible(driver, handle) {
                Ok(Some(descriptor)) => descriptor,
                Ok(None) => continue,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    debug!("Element from {} vanished while cataloging: {}", selector, e);
                    continue;
                }
            };

            let category = descriptor.category();
            if pass == SelectorPass::Generic
                && category.is_standard()
                && specific_categories.contains(&category)
            {
                continue;
            }

            if !seen.insert(descriptor.clone()) {
                continue;
            }

            if pass == SelectorPass::Specific {
                specific_categories.insert(category);
            }

            entries.push(CatalogEntry {
                descriptor,
                handle,
                pass,
            });
        }
    }

    if let Some(discovered) = discovered {
        discovered.merge(entries.iter().map(|e| &e.descriptor));
    }

    Ok(entries)
}

/// Build a descriptor for `handle`, or `None` when it is not visible.
pub fn describe_visible(
    driver: &mut dyn Driver,
    handle: ElementRef,
) -> Result<Option<ElementDescriptor>, DriverError> {
    if !driver.is_visible(handle)? {
        return Ok(None);
    }
    describe_element(driver, handle).map(Some)
}

/// Gather tag, text, identity attributes and the associated label.
pub fn describe_element(
    driver: &mut dyn Driver,
    handle: ElementRef,
) -> Result<ElementDescriptor, DriverError> {
    let tag = driver.tag_name(handle)?;
    let mut descriptor = ElementDescriptor::new(&tag);

    if let Some(text) = driver.text_content(handle)? {
        descriptor = descriptor.with_text(&text);
    }

    for name in IDENTITY_ATTRIBUTES {
        if let Some(value) = driver.attribute(handle, name)? {
            descriptor = descriptor.with_attribute(name, value.trim());
        }
    }

    if matches!(descriptor.tag.as_str(), "input" | "select" | "textarea") {
        if let Some(id) = descriptor.attribute("id").map(str::to_string) {
            if let Some(label) = resolve_label(driver, &id)? {
                descriptor = descriptor.with_label(&label);
            }
        }
    }

    Ok(descriptor)
}

/// Text of the first visible `<label for=id>`.
fn resolve_label(driver: &mut dyn Driver, id: &str) -> Result<Option<String>, DriverError> {
    let selector = format!("label[for='{}']", id.replace('\'', "\\'"));
    for label in driver.query(&selector)? {
        if driver.is_visible(label)? {
            return Ok(driver.text_content(label)?);
        }
    }
    Ok(None)
}
