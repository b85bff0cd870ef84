mod common;

use common::fake_driver::{FakeDriver, FakeElement, button, input, link};
use common::url;
use spa_prober::browser::driver::Driver;
use spa_prober::catalog::catalog::{DiscoveredElements, SelectorPass, catalog_page};
use spa_prober::catalog::descriptor::{ElementCategory, ElementDescriptor, normalize_text};

fn loaded(driver: FakeDriver) -> FakeDriver {
    let mut driver = driver;
    driver.navigate(&url("/"), 1000).unwrap();
    driver
}

// =========================================================================
// Descriptors
// =========================================================================

#[test]
fn descriptor_display_lists_text_attributes_and_label() {
    let d = ElementDescriptor::new("INPUT")
        .with_attribute("id", "email")
        .with_attribute("type", "email")
        .with_attribute("placeholder", "")
        .with_label("  Your   email ");

    assert_eq!(d.tag, "input");
    assert_eq!(d.attribute("placeholder"), None);
    assert_eq!(
        d.to_string(),
        "tag=input, id='email', type='email', label='Your email'"
    );
    assert_eq!(d.input_type(), "email");
    assert_eq!(d.category(), ElementCategory::Input);
}

#[test]
fn text_is_collapsed_and_cut_to_fifty_chars() {
    let long = "word ".repeat(30);
    let text = normalize_text(&long).unwrap();
    assert_eq!(text.chars().count(), 50);
    assert!(!text.contains("  "));
    assert_eq!(normalize_text("   \n\t "), None);
}

#[test]
fn input_type_defaults_to_text() {
    assert_eq!(ElementDescriptor::new("input").input_type(), "text");
}

#[test]
fn fingerprint_is_stable_and_short() {
    let a = ElementDescriptor::new("button").with_text("Save");
    let b = ElementDescriptor::new("button").with_text("Save");
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.fingerprint().len(), 12);
    assert_ne!(a.fingerprint(), ElementDescriptor::new("button").with_text("Cancel").fingerprint());
}

// =========================================================================
// Cataloging a page
// =========================================================================

#[test]
fn visible_button_is_cataloged_and_hidden_one_is_not() {
    let mut driver = loaded(FakeDriver::new().page(
        &url("/"),
        vec![
            button("Submit").attr("id", "go"),
            button("Secret").hidden(),
        ],
    ));

    let entries = catalog_page(&mut driver, None).unwrap();

    assert_eq!(entries.len(), 1);
    let d = &entries[0].descriptor;
    assert_eq!(d.tag, "button");
    assert_eq!(d.text.as_deref(), Some("Submit"));
    assert_eq!(d.attribute("id"), Some("go"));
    assert_eq!(entries[0].pass, SelectorPass::Specific);
}

#[test]
fn specific_passes_come_before_generic_ones() {
    let mut driver = loaded(FakeDriver::new().page(
        &url("/"),
        vec![
            FakeElement::new("div").attr("role", "tab").text("Overview"),
            link("/about", "About"),
            button("Save"),
        ],
    ));

    let entries = catalog_page(&mut driver, None).unwrap();
    let tags: Vec<&str> = entries.iter().map(|e| e.descriptor.tag.as_str()).collect();

    assert_eq!(tags, vec!["button", "a", "div"]);
    assert_eq!(entries[2].pass, SelectorPass::Generic);
}

#[test]
fn element_matching_several_selectors_is_cataloged_once() {
    let mut driver = loaded(FakeDriver::new().page(
        &url("/"),
        vec![
            button("Delete")
                .attr("data-testid", "delete-button")
                .attr("onclick", "remove()"),
            FakeElement::new("span")
                .attr("role", "button")
                .attr("data-testid", "menu-item-action")
                .text("More"),
        ],
    ));

    let entries = catalog_page(&mut driver, None).unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].descriptor.tag, "button");
    assert_eq!(entries[1].descriptor.tag, "span");
}

#[test]
fn generic_hit_on_standard_tag_is_dropped_when_category_already_seen() {
    let mut driver = loaded(FakeDriver::new().page(
        &url("/"),
        vec![
            link("/about", "About"),
            FakeElement::new("a").attr("role", "button").text("Pseudo button"),
        ],
    ));

    let entries = catalog_page(&mut driver, None).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].descriptor.text.as_deref(), Some("About"));
}

#[test]
fn generic_hit_on_standard_tag_is_kept_when_category_is_new() {
    let mut driver = loaded(FakeDriver::new().page(
        &url("/"),
        vec![
            button("Save"),
            FakeElement::new("a").attr("role", "button").text("Pseudo button"),
        ],
    ));

    let entries = catalog_page(&mut driver, None).unwrap();
    let texts: Vec<_> = entries
        .iter()
        .map(|e| e.descriptor.text.clone().unwrap_or_default())
        .collect();

    assert_eq!(texts, vec!["Save", "Pseudo button"]);
    assert_eq!(entries[1].pass, SelectorPass::Generic);
}

#[test]
fn hidden_inputs_are_not_cataloged() {
    let mut driver = loaded(FakeDriver::new().page(
        &url("/"),
        vec![
            input("hidden", "csrf"),
            input("text", "name"),
        ],
    ));

    let entries = catalog_page(&mut driver, None).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].descriptor.attribute("id"), Some("name"));
}

#[test]
fn form_controls_pick_up_their_label() {
    let mut driver = loaded(FakeDriver::new().page(
        &url("/"),
        vec![
            FakeElement::new("label").attr("for", "email").text("E-mail address"),
            input("email", "email"),
            FakeElement::new("textarea").attr("id", "notes"),
        ],
    ));

    let entries = catalog_page(&mut driver, None).unwrap();

    let email = entries
        .iter()
        .find(|e| e.descriptor.attribute("id") == Some("email"))
        .unwrap();
    assert_eq!(email.descriptor.label.as_deref(), Some("E-mail address"));

    let notes = entries
        .iter()
        .find(|e| e.descriptor.tag == "textarea")
        .unwrap();
    assert_eq!(notes.descriptor.label, None);
}

#[test]
fn failing_selector_is_skipped_and_others_still_run() {
    let mut driver = loaded(
        FakeDriver::new()
            .page(&url("/"), vec![button("Save"), link("/x", "X")])
            .broken_selector("button"),
    );

    let entries = catalog_page(&mut driver, None).unwrap();

    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].descriptor.tag, "a");
}

#[test]
fn discovered_set_accumulates_unique_sorted_descriptors() {
    let mut driver = loaded(
        FakeDriver::new()
            .page(&url("/"), vec![button("Zeta"), button("Alpha")])
            .page(&url("/b"), vec![button("Alpha"), link("/", "Home")]),
    );
    let mut discovered = DiscoveredElements::new();

    catalog_page(&mut driver, Some(&mut discovered)).unwrap();
    driver.navigate(&url("/b"), 1000).unwrap();
    catalog_page(&mut driver, Some(&mut discovered)).unwrap();

    assert_eq!(discovered.len(), 3);
    let listed: Vec<&ElementDescriptor> = discovered.iter().collect();
    assert!(listed.windows(2).all(|w| w[0] < w[1]));
    assert!(discovered.contains(&ElementDescriptor::new("button").with_text("Alpha")));
}

#[test]
fn empty_page_yields_empty_catalog() {
    let mut driver = loaded(FakeDriver::new().page(&url("/"), vec![]));
    assert!(catalog_page(&mut driver, None).unwrap().is_empty());
}
