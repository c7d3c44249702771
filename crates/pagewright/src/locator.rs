//! Locator abstraction for element selection.
//!
//! A [`Locator`] is an ordered chain of [`Selector`]s. Each step narrows the
//! search to the descendants of the first element matched by the previous
//! step, mirroring `element(by.id(..)).element(by.className(..))` chains.
//! Locators are plain data: nothing is resolved until an element handle asks
//! a session for it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Selector {
    /// Element id attribute
    Id(String),
    /// Single class name
    ClassName(String),
    /// CSS selector (e.g., ".modal-footer button")
    Css(String),
    /// Angular repeater expression (e.g., "product in products track by $index")
    Repeater(String),
}

impl Selector {
    /// Create an id selector
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    /// Create a class name selector
    #[must_use]
    pub fn class_name(name: impl Into<String>) -> Self {
        Self::ClassName(name.into())
    }

    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a repeater selector
    #[must_use]
    pub fn repeater(expression: impl Into<String>) -> Self {
        Self::Repeater(expression.into())
    }

    /// Equivalent CSS selector, used by script-evaluating backends
    #[must_use]
    pub fn to_css(&self) -> String {
        match self {
            Self::Id(id) => format!("[id={id:?}]"),
            Self::ClassName(name) => format!(".{name}"),
            Self::Css(css) => css.clone(),
            Self::Repeater(expr) => format!("[ng-repeat={expr:?}], [data-ng-repeat={expr:?}]"),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "by.id({id:?})"),
            Self::ClassName(name) => write!(f, "by.className({name:?})"),
            Self::Css(css) => write!(f, "by.css({css:?})"),
            Self::Repeater(expr) => write!(f, "by.repeater({expr:?})"),
        }
    }
}

/// A chain of selectors identifying an element or a collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Locator {
    steps: Vec<Selector>,
}

impl Locator {
    /// Create a locator from a single selector
    #[must_use]
    pub fn from_selector(selector: Selector) -> Self {
        Self {
            steps: vec![selector],
        }
    }

    /// Locate by id
    #[must_use]
    pub fn by_id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::id(id))
    }

    /// Locate by class name
    #[must_use]
    pub fn by_class_name(name: impl Into<String>) -> Self {
        Self::from_selector(Selector::class_name(name))
    }

    /// Locate by CSS selector
    #[must_use]
    pub fn by_css(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::css(selector))
    }

    /// Locate the rows rendered by a repeater expression
    #[must_use]
    pub fn by_repeater(expression: impl Into<String>) -> Self {
        Self::from_selector(Selector::repeater(expression))
    }

    /// Narrow to descendants of this locator's first match
    #[must_use]
    pub fn child(mut self, selector: Selector) -> Self {
        self.steps.push(selector);
        self
    }

    /// Narrow to descendants matched by another locator's chain
    #[must_use]
    pub fn within(mut self, inner: &Self) -> Self {
        self.steps.extend(inner.steps.iter().cloned());
        self
    }

    /// The selector chain, outermost first
    #[must_use]
    pub fn steps(&self) -> &[Selector] {
        &self.steps
    }

    /// Script expression evaluating to the array of matched elements
    #[must_use]
    pub fn to_query(&self) -> String {
        let css: Vec<String> = self.steps.iter().map(Selector::to_css).collect();
        let steps = serde_json::to_string(&css).unwrap_or_else(|_| "[]".to_string());
        format!(
            "(() => {{ const steps = {steps}; let scope = document; \
             for (let i = 0; i < steps.length - 1; i++) {{ \
             scope = scope.querySelector(steps[i]); if (!scope) {{ return []; }} }} \
             return Array.from(scope.querySelectorAll(steps[steps.length - 1])); }})()"
        )
    }

    /// Script expression evaluating to the number of matches
    #[must_use]
    pub fn to_count_query(&self) -> String {
        format!("{}.length", self.to_query())
    }

    /// Script expression evaluating to the visible text of every match
    #[must_use]
    pub fn to_texts_query(&self) -> String {
        format!(
            "{}.map(el => (el.innerText || el.textContent || '').trim())",
            self.to_query()
        )
    }

    /// Script expression clicking the first match; evaluates to whether one existed
    #[must_use]
    pub fn to_click_query(&self) -> String {
        format!(
            "(() => {{ const el = {}[0]; if (!el) {{ return false; }} el.click(); return true; }})()",
            self.to_query()
        )
    }
}

impl From<Selector> for Locator {
    fn from(selector: Selector) -> Self {
        Self::from_selector(selector)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                write!(f, " > ")?;
            }
            write!(f, "{step}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod selector_tests {
        use super::*;

        #[test]
        fn test_id_to_css_is_quoted() {
            assert_eq!(Selector::id("prod-1").to_css(), "[id=\"prod-1\"]");
        }

        #[test]
        fn test_class_name_to_css() {
            assert_eq!(Selector::class_name("preview").to_css(), ".preview");
        }

        #[test]
        fn test_repeater_matches_both_attribute_spellings() {
            let css = Selector::repeater("product in products").to_css();
            assert!(css.contains("[ng-repeat=\"product in products\"]"));
            assert!(css.contains("[data-ng-repeat=\"product in products\"]"));
        }

        #[test]
        fn test_display() {
            assert_eq!(Selector::css(".modal-title").to_string(), "by.css(\".modal-title\")");
        }
    }

    mod locator_tests {
        use super::*;

        #[test]
        fn test_child_extends_chain() {
            let locator = Locator::by_id("prod-1").child(Selector::class_name("preview"));
            assert_eq!(locator.steps().len(), 2);
            assert_eq!(
                locator.to_string(),
                "by.id(\"prod-1\") > by.className(\"preview\")"
            );
        }

        #[test]
        fn test_within_appends_all_steps() {
            let inner = Locator::by_css(".modal-footer").child(Selector::css("button"));
            let locator = Locator::by_css(".modal").within(&inner);
            assert_eq!(locator.steps().len(), 3);
        }

        #[test]
        fn test_queries_embed_steps_as_json() {
            let locator = Locator::by_id("prod-1").child(Selector::class_name("preview"));
            let query = locator.to_query();
            assert!(query.contains(r#"["[id=\"prod-1\"]",".preview"]"#));
            assert!(locator.to_count_query().ends_with(".length"));
            assert!(locator.to_click_query().contains("el.click()"));
            assert!(locator.to_texts_query().contains("innerText"));
        }

        #[test]
        fn test_from_selector() {
            let locator: Locator = Selector::repeater("p in ps").into();
            assert_eq!(locator.steps(), &[Selector::Repeater("p in ps".to_string())]);
        }
    }
}
