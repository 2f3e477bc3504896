//! Element lookup strategies.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How to find an element on the page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "lowercase")]
pub enum Locator {
    XPath(String),
    Css(String),
    /// Matches the element's `id` attribute.
    Id(String),
}

impl Locator {
    pub fn xpath(expr: impl Into<String>) -> Self {
        Self::XPath(expr.into())
    }

    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// The `(using, value)` pair sent to the WebDriver find-element endpoints.
    pub fn to_wire(&self) -> (&'static str, String) {
        match self {
            Self::XPath(expr) => ("xpath", expr.clone()),
            Self::Css(selector) => ("css selector", selector.clone()),
            Self::Id(id) => ("css selector", format!("[id=\"{}\"]", id.replace('"', "\\\""))),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::XPath(expr) => write!(f, "xpath:{expr}"),
            Self::Css(selector) => write!(f, "css:{selector}"),
            Self::Id(id) => write!(f, "id:{id}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_becomes_attribute_selector() {
        let (using, value) = Locator::id("create-icon").to_wire();
        assert_eq!(using, "css selector");
        assert_eq!(value, "[id=\"create-icon\"]");
    }

    #[test]
    fn xpath_passes_through() {
        let (using, value) = Locator::xpath("//input[@type=\"file\"]").to_wire();
        assert_eq!(using, "xpath");
        assert_eq!(value, "//input[@type=\"file\"]");
    }

    #[test]
    fn deserializes_from_config_shape() {
        let loc: Locator = serde_json::from_str(r#"{"by":"css","value":"input[type=file]"}"#).unwrap();
        assert_eq!(loc, Locator::css("input[type=file]"));
        assert_eq!(loc.to_string(), "css:input[type=file]");
    }
}
