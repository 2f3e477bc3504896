//! The [`Browser`] trait: the primitives the publish workflow needs.

use async_trait::async_trait;
use autoreel_common::Result;

use crate::locator::Locator;

/// Opaque handle to an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef(pub String);

impl ElementRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A remote-controlled browser.
///
/// Lookups that find nothing return `Ok(None)` / an empty vec; `Err` is kept
/// for transport or protocol failures and stale elements.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Load `url` in the current tab.
    async fn navigate(&self, url: &str) -> Result<()>;

    /// URL of the current tab.
    async fn current_url(&self) -> Result<String>;

    /// First element matching `locator`, if any.
    async fn find(&self, locator: &Locator) -> Result<Option<ElementRef>>;

    /// All elements matching `locator`, in document order.
    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementRef>>;

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool>;

    async fn is_enabled(&self, element: &ElementRef) -> Result<bool>;

    /// Native click.
    async fn click(&self, element: &ElementRef) -> Result<()>;

    /// Scroll the element into view and click it from script, which works on
    /// custom elements that swallow native clicks.
    async fn script_click(&self, element: &ElementRef) -> Result<()>;

    async fn scroll_into_view(&self, element: &ElementRef) -> Result<()>;

    /// Type `text` into the element (also used to hand a path to a file input).
    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()>;

    /// Rendered text of the element.
    async fn text(&self, element: &ElementRef) -> Result<String>;

    /// End the remote session.
    async fn quit(&self) -> Result<()>;

    /// Liveness probe: the session still answers a trivial query.
    async fn is_alive(&self) -> bool {
        self.current_url().await.is_ok()
    }

    /// Displayed and enabled.
    async fn is_clickable(&self, element: &ElementRef) -> Result<bool> {
        Ok(self.is_displayed(element).await? && self.is_enabled(element).await?)
    }
}
