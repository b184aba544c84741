//! Element locators rendered to Playwright locator expressions

use serde::{Deserialize, Serialize};
use std::fmt;

/// One link of a locator chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocatorPart {
    /// Descendants matching a CSS selector
    Css(String),
    /// Keep elements whose text contains the value
    HasText(String),
    /// Deepest element inside containing the text (first match)
    Contains(String),
    /// The n-th match, zero based
    Nth(usize),
    /// Parent element
    Parent,
}

/// A chain of element queries starting at the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    parts: Vec<LocatorPart>,
}

impl Locator {
    /// Elements matching a CSS selector
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            parts: vec![LocatorPart::Css(selector.into())],
        }
    }

    /// `<tag>` elements whose text contains `text`
    pub fn with_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Self::css(selector).has_text(text)
    }

    /// Elements carrying `data-testid`
    pub fn test_id(id: &str) -> Self {
        Self::css(format!("[data-testid={}]", quote_attr(id)))
    }

    /// Inputs found by placeholder text
    pub fn placeholder(text: &str) -> Self {
        Self::css(format!("[placeholder={}]", quote_attr(text)))
    }

    pub fn has_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(LocatorPart::HasText(text.into()));
        self
    }

    pub fn contains(mut self, text: impl Into<String>) -> Self {
        self.parts.push(LocatorPart::Contains(text.into()));
        self
    }

    pub fn nth(mut self, index: usize) -> Self {
        self.parts.push(LocatorPart::Nth(index));
        self
    }

    pub fn parent(mut self) -> Self {
        self.parts.push(LocatorPart::Parent);
        self
    }

    pub fn find(mut self, selector: impl Into<String>) -> Self {
        self.parts.push(LocatorPart::Css(selector.into()));
        self
    }

    pub fn parts(&self) -> &[LocatorPart] {
        &self.parts
    }

    /// Render as a JavaScript expression rooted at `page`
    pub fn to_js(&self) -> String {
        let mut js = String::from("page");
        for part in &self.parts {
            match part {
                LocatorPart::Css(selector) => {
                    js.push_str(&format!(".locator({})", js_string(selector)));
                }
                LocatorPart::HasText(text) => {
                    js.push_str(&format!(".filter({{ hasText: {} }})", js_string(text)));
                }
                LocatorPart::Contains(text) => {
                    js.push_str(&format!(".getByText({}).first()", js_string(text)));
                }
                LocatorPart::Nth(index) => {
                    js.push_str(&format!(".nth({})", index));
                }
                LocatorPart::Parent => js.push_str(".locator('xpath=..')"),
            }
        }
        js
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for part in &self.parts {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            match part {
                LocatorPart::Css(selector) => write!(f, "{}", selector)?,
                LocatorPart::HasText(text) => write!(f, ":has-text({:?})", text)?,
                LocatorPart::Contains(text) => write!(f, "contains({:?})", text)?,
                LocatorPart::Nth(index) => write!(f, "[{}]", index)?,
                LocatorPart::Parent => f.write_str("..")?,
            }
        }
        Ok(())
    }
}

/// Encode a string as a JavaScript string literal
pub fn js_string(value: &str) -> String {
    serde_json::Value::String(value.to_string()).to_string()
}

/// Quote a CSS attribute value
fn quote_attr(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
