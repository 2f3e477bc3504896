//! Ordered fallback lookup of page controls.
//!
//! A control is described by a list of [`Strategy`] values. Each one is polled
//! until its element satisfies the wanted [`Condition`] or its timeout runs
//! out, then the next one is tried. The first strategy to succeed wins.

use std::time::Duration;

use autoreel_common::Error;
use autoreel_webdriver::{Browser, ElementRef, Locator};
use tokio::time::{sleep, Instant};

use super::workflow::Step;

/// What the element has to be before it counts as found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    /// Attached to the page (file inputs are usually hidden).
    Present,
    /// Displayed and enabled.
    Clickable,
}

/// One way of finding a control, with how long to keep trying it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Strategy {
    pub locator: Locator,
    pub timeout: Duration,
}

impl Strategy {
    pub fn new(locator: Locator, timeout: Duration) -> Self {
        Self { locator, timeout }
    }

    /// Checked once, without waiting.
    pub fn immediate(locator: Locator) -> Self {
        Self::new(locator, Duration::ZERO)
    }
}

/// The element a resolution settled on and the strategy that found it.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub element: ElementRef,
    pub strategy: usize,
}

/// A workflow step could not find or operate its control.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("step {step} failed: {reason}")]
pub struct StepFailure {
    pub step: Step,
    pub reason: String,
}

impl StepFailure {
    pub fn new(step: Step, reason: impl Into<String>) -> Self {
        Self {
            step,
            reason: reason.into(),
        }
    }
}

impl From<StepFailure> for Error {
    fn from(failure: StepFailure) -> Self {
        Error::automation(failure.step, failure.reason)
    }
}

#[derive(Debug, Clone)]
pub struct StrategyResolver {
    poll: Duration,
}

impl Default for StrategyResolver {
    fn default() -> Self {
        Self::new(Duration::from_millis(500))
    }
}

impl StrategyResolver {
    pub fn new(poll: Duration) -> Self {
        Self {
            poll: poll.max(Duration::from_millis(1)),
        }
    }

    pub async fn resolve(
        &self,
        browser: &dyn Browser,
        step: Step,
        strategies: &[Strategy],
        condition: Condition,
    ) -> Result<Resolved, StepFailure> {
        self.resolve_within(browser, step, strategies, condition, None)
            .await
    }

    /// Like [`resolve`](Self::resolve), but no strategy waits past `ceiling`
    /// measured from the start of the call.
    pub async fn resolve_within(
        &self,
        browser: &dyn Browser,
        step: Step,
        strategies: &[Strategy],
        condition: Condition,
        ceiling: Option<Duration>,
    ) -> Result<Resolved, StepFailure> {
        if strategies.is_empty() {
            return Err(StepFailure::new(step, "no lookup strategies configured"));
        }
        let started = Instant::now();
        let hard_deadline = ceiling.map(|c| started + c);

        for (index, strategy) in strategies.iter().enumerate() {
            let mut deadline = Instant::now() + strategy.timeout;
            if let Some(hard) = hard_deadline {
                if Instant::now() >= hard && index > 0 {
                    break;
                }
                deadline = deadline.min(hard);
            }

            if let Some(element) = self.poll_one(browser, &strategy.locator, condition, deadline).await {
                tracing::debug!(%step, locator = %strategy.locator, strategy = index, "Control found");
                return Ok(Resolved {
                    element,
                    strategy: index,
                });
            }
            tracing::debug!(%step, locator = %strategy.locator, "Strategy exhausted");
        }

        Err(StepFailure::new(
            step,
            format!("no control matched after {} strategies", strategies.len()),
        ))
    }

    /// Poll `locator` until it satisfies `condition`. Always checks at least once.
    async fn poll_one(
        &self,
        browser: &dyn Browser,
        locator: &Locator,
        condition: Condition,
        deadline: Instant,
    ) -> Option<ElementRef> {
        loop {
            match check(browser, locator, condition).await {
                Ok(Some(element)) => return Some(element),
                Ok(None) => {}
                Err(e) => tracing::trace!(%locator, "Lookup error: {e}"),
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            sleep(self.poll.min(deadline - now)).await;
        }
    }

    /// Wait until at least `min_count` elements match `locator`, returning them
    /// all in document order.
    pub async fn wait_for_all(
        &self,
        browser: &dyn Browser,
        step: Step,
        locator: &Locator,
        min_count: usize,
        timeout: Duration,
    ) -> Result<Vec<ElementRef>, StepFailure> {
        let deadline = Instant::now() + timeout;
        let mut last = 0;
        loop {
            match browser.find_all(locator).await {
                Ok(elements) if elements.len() >= min_count => return Ok(elements),
                Ok(elements) => last = elements.len(),
                Err(e) => tracing::trace!(%locator, "Lookup error: {e}"),
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(StepFailure::new(
                    step,
                    format!("expected {min_count} matches for {locator}, found {last}"),
                ));
            }
            sleep(self.poll.min(deadline - now)).await;
        }
    }
}

async fn check(
    browser: &dyn Browser,
    locator: &Locator,
    condition: Condition,
) -> autoreel_common::Result<Option<ElementRef>> {
    let Some(element) = browser.find(locator).await? else {
        return Ok(None);
    };
    match condition {
        Condition::Present => Ok(Some(element)),
        Condition::Clickable => Ok(browser.is_clickable(&element).await?.then_some(element)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::testing::FakeBrowser;

    fn xp(expr: &str) -> Locator {
        Locator::xpath(expr)
    }

    #[tokio::test(start_paused = true)]
    async fn first_matching_strategy_wins() {
        let browser = FakeBrowser::new();
        browser.add("//b", "el-b");
        browser.add("//c", "el-c");
        let resolver = StrategyResolver::default();
        let strategies = [
            Strategy::new(xp("//a"), Duration::from_secs(2)),
            Strategy::new(xp("//b"), Duration::from_secs(2)),
            Strategy::new(xp("//c"), Duration::from_secs(2)),
        ];

        let started = Instant::now();
        let found = resolver
            .resolve(&browser, Step::OpenCreateMenu, &strategies, Condition::Present)
            .await
            .unwrap();
        assert_eq!(found.strategy, 1);
        assert_eq!(found.element.as_str(), "el-b");
        // Only the first strategy's timeout was spent.
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_late_element() {
        let browser = FakeBrowser::new();
        browser.add_after("//late", "el", Duration::from_secs(3));
        let resolver = StrategyResolver::new(Duration::from_millis(500));
        let found = resolver
            .resolve(
                &browser,
                Step::SelectFile,
                &[Strategy::new(xp("//late"), Duration::from_secs(10))],
                Condition::Present,
            )
            .await
            .unwrap();
        assert_eq!(found.element.as_str(), "el");
    }

    #[tokio::test(start_paused = true)]
    async fn clickable_requires_display() {
        let browser = FakeBrowser::new();
        browser.add("//hidden", "h");
        browser.set_displayed("h", false);
        let resolver = StrategyResolver::default();
        let strategies = [Strategy::new(xp("//hidden"), Duration::from_secs(1))];

        let err = resolver
            .resolve(&browser, Step::Confirm, &strategies, Condition::Clickable)
            .await
            .unwrap_err();
        assert_eq!(err.step, Step::Confirm);

        let present = resolver
            .resolve(&browser, Step::Confirm, &strategies, Condition::Present)
            .await;
        assert!(present.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn ceiling_caps_total_wait() {
        let browser = FakeBrowser::new();
        let resolver = StrategyResolver::default();
        let strategies = [
            Strategy::new(xp("//a"), Duration::from_secs(10)),
            Strategy::new(xp("//b"), Duration::from_secs(10)),
        ];
        let started = Instant::now();
        let err = resolver
            .resolve_within(
                &browser,
                Step::SetAudience,
                &strategies,
                Condition::Present,
                Some(Duration::from_secs(4)),
            )
            .await
            .unwrap_err();
        assert!(started.elapsed() <= Duration::from_secs(4));
        assert!(err.reason.contains("2 strategies"));
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_strategy_checks_once() {
        let browser = FakeBrowser::new();
        browser.add_after("//x", "x", Duration::from_secs(1));
        let resolver = StrategyResolver::default();
        let started = Instant::now();
        let result = resolver
            .resolve(&browser, Step::Confirm, &[Strategy::immediate(xp("//x"))], Condition::Present)
            .await;
        assert!(result.is_err());
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_all_needs_enough_matches() {
        let browser = FakeBrowser::new();
        browser.add("//box", "title");
        let resolver = StrategyResolver::default();
        let err = resolver
            .wait_for_all(&browser, Step::EnterDescription, &xp("//box"), 2, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(err.reason.contains("found 1"));

        browser.add("//box", "description");
        let boxes = resolver
            .wait_for_all(&browser, Step::EnterDescription, &xp("//box"), 2, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(boxes.len(), 2);
    }

    #[test]
    fn failure_converts_to_automation_error() {
        let err: Error = StepFailure::new(Step::SelectFile, "gone").into();
        assert_eq!(err.to_string(), "Publish step [select-file] failed: gone");
    }
}
