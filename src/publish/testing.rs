//! In-memory [`Browser`] and [`SessionFactory`] for exercising the workflow.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use autoreel_common::{Error, Result};
use autoreel_webdriver::{keys, Browser, ElementRef, Locator};
use parking_lot::Mutex;
use tokio::time::Instant;

use super::session::{PublishSession, SessionFactory};

#[derive(Default)]
struct Page {
    elements: Vec<(Locator, ElementRef, Instant)>,
    hidden: HashSet<String>,
    native_click_fails: HashSet<String>,
    drop_next_entry: HashSet<String>,
    texts: HashMap<String, String>,
    clicks: Vec<String>,
    navigations: Vec<String>,
    sent: Vec<(String, String)>,
    navigation_fails: bool,
    dead: bool,
}

#[derive(Clone, Default)]
pub struct FakeBrowser {
    page: Arc<Mutex<Page>>,
}

impl FakeBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an element found by an XPath expression.
    pub fn add(&self, xpath: &str, id: &str) {
        self.add_locator(Locator::xpath(xpath), id);
    }

    pub fn add_locator(&self, locator: Locator, id: &str) {
        self.page
            .lock()
            .elements
            .push((locator, ElementRef::new(id), Instant::now()));
    }

    /// Register an element that only appears after `delay`.
    pub fn add_after(&self, xpath: &str, id: &str, delay: Duration) {
        self.page
            .lock()
            .elements
            .push((Locator::xpath(xpath), ElementRef::new(id), Instant::now() + delay));
    }

    pub fn set_displayed(&self, id: &str, displayed: bool) {
        let mut page = self.page.lock();
        if displayed {
            page.hidden.remove(id);
        } else {
            page.hidden.insert(id.to_string());
        }
    }

    pub fn fail_native_click(&self, id: &str) {
        self.page.lock().native_click_fails.insert(id.to_string());
    }

    /// The next text typed into `id` is lost.
    pub fn drop_next_entry(&self, id: &str) {
        self.page.lock().drop_next_entry.insert(id.to_string());
    }

    pub fn fail_navigation(&self) {
        self.page.lock().navigation_fails = true;
    }

    pub fn kill(&self) {
        self.page.lock().dead = true;
    }

    pub fn clicks(&self) -> Vec<String> {
        self.page.lock().clicks.clone()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.page.lock().navigations.clone()
    }

    pub fn sent_to(&self, id: &str) -> Vec<String> {
        self.page
            .lock()
            .sent
            .iter()
            .filter(|(target, _)| target == id)
            .map(|(_, text)| text.clone())
            .collect()
    }

    pub fn text_of(&self, id: &str) -> String {
        self.page.lock().texts.get(id).cloned().unwrap_or_default()
    }

    fn alive(&self) -> Result<()> {
        if self.page.lock().dead {
            return Err(Error::session("invalid session id"));
        }
        Ok(())
    }

    fn matching(&self, locator: &Locator) -> Vec<ElementRef> {
        let now = Instant::now();
        self.page
            .lock()
            .elements
            .iter()
            .filter(|(l, _, appears)| l == locator && *appears <= now)
            .map(|(_, e, _)| e.clone())
            .collect()
    }
}

#[async_trait]
impl Browser for FakeBrowser {
    async fn navigate(&self, url: &str) -> Result<()> {
        self.alive()?;
        let mut page = self.page.lock();
        if page.navigation_fails {
            return Err(Error::session("net::ERR_NAME_NOT_RESOLVED"));
        }
        page.navigations.push(url.to_string());
        Ok(())
    }

    async fn current_url(&self) -> Result<String> {
        self.alive()?;
        Ok(self.page.lock().navigations.last().cloned().unwrap_or_default())
    }

    async fn find(&self, locator: &Locator) -> Result<Option<ElementRef>> {
        self.alive()?;
        Ok(self.matching(locator).into_iter().next())
    }

    async fn find_all(&self, locator: &Locator) -> Result<Vec<ElementRef>> {
        self.alive()?;
        Ok(self.matching(locator))
    }

    async fn is_displayed(&self, element: &ElementRef) -> Result<bool> {
        self.alive()?;
        Ok(!self.page.lock().hidden.contains(element.as_str()))
    }

    async fn is_enabled(&self, _element: &ElementRef) -> Result<bool> {
        self.alive()?;
        Ok(true)
    }

    async fn click(&self, element: &ElementRef) -> Result<()> {
        self.alive()?;
        let mut page = self.page.lock();
        if page.native_click_fails.contains(element.as_str()) {
            return Err(Error::automation("click", "element click intercepted"));
        }
        page.clicks.push(element.as_str().to_string());
        Ok(())
    }

    async fn script_click(&self, element: &ElementRef) -> Result<()> {
        self.alive()?;
        self.page.lock().clicks.push(element.as_str().to_string());
        Ok(())
    }

    async fn scroll_into_view(&self, _element: &ElementRef) -> Result<()> {
        self.alive()
    }

    async fn send_keys(&self, element: &ElementRef, text: &str) -> Result<()> {
        self.alive()?;
        let id = element.as_str().to_string();
        let mut page = self.page.lock();
        page.sent.push((id.clone(), text.to_string()));
        if text == keys::select_all_and_delete() {
            page.texts.remove(&id);
        } else if !page.drop_next_entry.remove(&id) {
            page.texts.entry(id).or_default().push_str(text);
        }
        Ok(())
    }

    async fn text(&self, element: &ElementRef) -> Result<String> {
        self.alive()?;
        Ok(self.text_of(element.as_str()))
    }

    async fn quit(&self) -> Result<()> {
        self.page.lock().dead = true;
        Ok(())
    }
}

/// Hands out sessions on prepared browsers, in order.
#[derive(Clone, Default)]
pub struct FakeSessions {
    browsers: Arc<Mutex<Vec<FakeBrowser>>>,
    pub created: Arc<AtomicUsize>,
    pub cleared: Arc<AtomicUsize>,
}

impl FakeSessions {
    pub fn new(browsers: Vec<FakeBrowser>) -> Self {
        Self {
            browsers: Arc::new(Mutex::new(browsers)),
            ..Default::default()
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn cleared(&self) -> usize {
        self.cleared.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionFactory for FakeSessions {
    async fn clear_conflicts(&self) -> Result<()> {
        self.cleared.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create(&self) -> Result<PublishSession> {
        let mut browsers = self.browsers.lock();
        if browsers.is_empty() {
            return Err(Error::session("chromedriver not found"));
        }
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(PublishSession::new(Box::new(browsers.remove(0))))
    }
}
