use std::fmt;

use serde::Serialize;

/// Attributes that identify an element, in the order they are reported.
pub const IDENTITY_ATTRIBUTES: [&str; 8] = [
    "id",
    "name",
    "type",
    "placeholder",
    "href",
    "data-testid",
    "aria-label",
    "role",
];

/// Visible text longer than this is cut.
pub const MAX_TEXT_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementCategory {
    Button,
    Link,
    Input,
    Select,
    Textarea,
    Other,
}

impl ElementCategory {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "button" => ElementCategory::Button,
            "a" => ElementCategory::Link,
            "input" => ElementCategory::Input,
            "select" => ElementCategory::Select,
            "textarea" => ElementCategory::Textarea,
            _ => ElementCategory::Other,
        }
    }

    pub fn is_standard(&self) -> bool {
        !matches!(self, ElementCategory::Other)
    }
}

/// Structural identity of one DOM node at one observation.
///
/// Two descriptors with equal fields denote the same element. There is no
/// live handle inside; descriptors are rebuilt on every page visit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementDescriptor {
    pub tag: String,
    pub text: Option<String>,
    /// Ordered subset of `IDENTITY_ATTRIBUTES` that were present and non-empty
    pub attributes: Vec<(String, String)>,
    /// Text of the `<label for=...>` pointing at this control
    pub label: Option<String>,
}

impl ElementDescriptor {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            text: None,
            attributes: Vec::new(),
            label: None,
        }
    }

    pub fn with_text(mut self, raw: &str) -> Self {
        self.text = normalize_text(raw);
        self
    }

    /// Append an attribute; empty values are dropped.
    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        if !value.is_empty() {
            self.attributes.push((name.to_string(), value.to_string()));
        }
        self
    }

    pub fn with_label(mut self, raw: &str) -> Self {
        self.label = normalize_text(raw);
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn role(&self) -> Option<&str> {
        self.attribute("role")
    }

    /// Declared input type, lower-cased; `text` when absent.
    pub fn input_type(&self) -> String {
        self.attribute("type")
            .map(str::to_lowercase)
            .unwrap_or_else(|| "text".to_string())
    }

    pub fn category(&self) -> ElementCategory {
        ElementCategory::from_tag(&self.tag)
    }

    /// Short stable key for logs.
    pub fn fingerprint(&self) -> String {
        let digest = text_fingerprint(&self.to_string());
        digest[..12].to_string()
    }
}

impl fmt::Display for ElementDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tag={}", self.tag)?;
        if let Some(text) = &self.text {
            write!(f, ", text='{}'", text)?;
        }
        for (name, value) in &self.attributes {
            write!(f, ", {}='{}'", name, value)?;
        }
        if let Some(label) = &self.label {
            write!(f, ", label='{}'", label)?;
        }
        Ok(())
    }
}

/// Trim, collapse whitespace and cut to `MAX_TEXT_CHARS`.
pub fn normalize_text(raw: &str) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }
    Some(collapsed.chars().take(MAX_TEXT_CHARS).collect())
}

pub fn text_fingerprint(text: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
