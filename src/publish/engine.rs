//! Drives the studio console through one upload.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use autoreel_common::{Error, Result};
use autoreel_webdriver::{keys, Browser, ElementRef};
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};

use super::resolver::{Condition, Resolved, Strategy, StepFailure, StrategyResolver};
use super::sanitize::sanitize_for_entry;
use super::session::{PublishSession, SessionFactory};
use super::workflow::{policy_for, FailurePolicy, Locators, Step, CHECKS_AFTER_PAGE, WIZARD_PAGES};
use super::{PublishReport, PublishState};
use crate::collaborators::Publisher;
use crate::config::{PublishConfig, Visibility};
use crate::versions::{UploadMetadata, DEFAULT_DESCRIPTION, DEFAULT_TITLE};

/// Timing and choices for the upload workflow.
#[derive(Debug, Clone)]
pub struct PublishOptions {
    pub studio_url: String,
    /// Wait after loading the console before looking for controls.
    pub settle: Duration,
    /// Pause between UI actions so the console can react.
    pub action_pause: Duration,
    pub processing_poll: Duration,
    pub processing_max_wait: Duration,
    pub strategy_poll: Duration,
    pub made_for_kids: bool,
    pub visibility: Visibility,
}

impl PublishOptions {
    pub fn from_config(config: &PublishConfig) -> Self {
        Self {
            studio_url: config.studio_url.clone(),
            settle: Duration::from_secs(config.settle_secs),
            action_pause: Duration::from_millis(config.action_pause_millis),
            processing_poll: Duration::from_secs(config.processing_poll_secs),
            processing_max_wait: Duration::from_secs(config.processing_max_wait_secs),
            strategy_poll: Duration::from_millis(config.strategy_poll_millis),
            made_for_kids: config.made_for_kids,
            visibility: config.visibility,
        }
    }
}

impl Default for PublishOptions {
    fn default() -> Self {
        Self::from_config(&PublishConfig::default())
    }
}

impl PublishReport {
    fn enter(&mut self, state: PublishState) {
        tracing::debug!(%state, "Publish state");
        self.transitions.push(state);
    }

    /// Apply the step's failure policy. `Ok(None)` means the failure was
    /// absorbed and the workflow carries on.
    fn settle<T>(
        &mut self,
        outcome: std::result::Result<T, StepFailure>,
    ) -> std::result::Result<Option<T>, StepFailure> {
        match outcome {
            Ok(value) => Ok(Some(value)),
            Err(failure) => match policy_for(failure.step) {
                FailurePolicy::Escalate => {
                    tracing::error!(step = %failure.step, "{}", failure.reason);
                    Err(failure)
                }
                FailurePolicy::Continue => {
                    tracing::warn!(step = %failure.step, "{}, continuing", failure.reason);
                    self.warnings.push(failure.to_string());
                    Ok(None)
                }
            },
        }
    }
}

/// Publishes media through the studio console over a long-lived browser
/// session.
///
/// Uploads are serialized: the session is held for the whole workflow.
pub struct PublishEngine {
    factory: Box<dyn SessionFactory>,
    session: Mutex<Option<PublishSession>>,
    options: PublishOptions,
    resolver: StrategyResolver,
    locators: Locators,
}

impl PublishEngine {
    pub fn new(factory: Box<dyn SessionFactory>, options: PublishOptions) -> Self {
        Self {
            factory,
            session: Mutex::new(None),
            resolver: StrategyResolver::new(options.strategy_poll),
            locators: Locators::studio(options.made_for_kids, options.visibility),
            options,
        }
    }

    pub fn with_locators(mut self, locators: Locators) -> Self {
        self.locators = locators;
        self
    }

    pub async fn has_session(&self) -> bool {
        self.session.lock().await.is_some()
    }

    /// Close the browser session, if any.
    pub async fn shutdown(&self) {
        if let Some(session) = self.session.lock().await.take() {
            tracing::info!("Closing browser session");
            session.close().await;
        }
    }

    /// Upload `media` with `metadata` and publish it.
    ///
    /// # Errors
    ///
    /// - [`Error::Session`] when no browser session can be established.
    /// - [`Error::Automation`] when a step that cannot be skipped fails, or
    ///   the media file does not exist.
    pub async fn upload(&self, media: &Path, metadata: &UploadMetadata) -> Result<PublishReport> {
        let mut report = PublishReport::default();
        self.upload_into(media, metadata, &mut report).await?;
        Ok(report)
    }

    /// Like [`upload`](Self::upload), recording into `report` so the trail
    /// and warnings survive a failed attempt.
    pub async fn upload_into(
        &self,
        media: &Path,
        metadata: &UploadMetadata,
        report: &mut PublishReport,
    ) -> Result<()> {
        let outcome = self.attempt(media, metadata, report).await;
        match &outcome {
            Ok(()) => tracing::info!(warnings = report.warnings.len(), "Publish confirmed"),
            Err(e) => {
                report.enter(PublishState::Failed);
                tracing::warn!(trail = %report.trail(), "Publish failed: {e}");
            }
        }
        outcome
    }

    async fn attempt(
        &self,
        media: &Path,
        metadata: &UploadMetadata,
        report: &mut PublishReport,
    ) -> Result<()> {
        if !media.is_file() {
            return Err(Error::automation(
                Step::SelectFile,
                format!("media file {} not found", media.display()),
            ));
        }
        let media = std::fs::canonicalize(media)?;

        let mut slot = self.session.lock().await;
        report.reused_session = self.ensure_session(&mut slot).await?;
        let Some(session) = slot.as_ref() else {
            return Err(Error::session("no browser session"));
        };
        report.enter(PublishState::SessionReady);

        tracing::info!(media = %media.display(), title = %metadata.title, "Publishing");
        let Err(failure) = self.run_workflow(session.browser(), &media, metadata, report).await else {
            return Ok(());
        };
        if !session.is_alive().await {
            tracing::warn!("Browser session lost during publish, discarding it");
            if let Some(dead) = slot.take() {
                dead.close().await;
            }
        }
        Err(failure.into())
    }

    /// Make sure `slot` holds a live session. Returns whether an existing
    /// one was reused.
    async fn ensure_session(&self, slot: &mut Option<PublishSession>) -> Result<bool> {
        if let Some(session) = slot.as_ref() {
            if session.is_alive().await {
                tracing::debug!("Reusing browser session");
                return Ok(true);
            }
            tracing::warn!("Browser session is dead, starting a new one");
        }
        if let Some(stale) = slot.take() {
            stale.close().await;
        }

        if let Err(e) = self.factory.clear_conflicts().await {
            tracing::warn!("Could not clear conflicting browser: {e}");
        }
        *slot = Some(self.factory.create().await?);
        Ok(false)
    }

    async fn run_workflow(
        &self,
        browser: &dyn Browser,
        media: &Path,
        metadata: &UploadMetadata,
        report: &mut PublishReport,
    ) -> std::result::Result<(), StepFailure> {
        let pause = self.options.action_pause;

        report.settle(self.navigate(browser).await)?;
        report.enter(PublishState::Navigated);

        report.settle(self.open_menu_item(browser, Step::OpenCreateMenu, &self.locators.create).await)?;
        sleep(pause * 2).await;
        report.settle(self.open_menu_item(browser, Step::ChooseUpload, &self.locators.upload_menu).await)?;
        report.enter(PublishState::EntrySurfaceLocated);
        sleep(pause * 3).await;

        report.settle(self.submit_file(browser, media).await)?;
        report.enter(PublishState::FileSubmitted);

        report.enter(PublishState::ProcessingWait);
        report.settle(self.await_processing(browser).await)?;
        sleep(pause * 5).await;

        report.enter(PublishState::MetadataEntry);
        let title = entry_text(&metadata.title, DEFAULT_TITLE);
        report.settle(self.enter_field(browser, Step::EnterTitle, 0, &title).await)?;
        let description = entry_text(&metadata.description, DEFAULT_DESCRIPTION);
        report.settle(self.enter_field(browser, Step::EnterDescription, 1, &description).await)?;
        sleep(pause * 2).await;

        report.settle(self.select(browser, Step::SetAudience, &self.locators.audience).await)?;
        sleep(pause * 2).await;

        for page in 1..=WIZARD_PAGES {
            if report.settle(self.select(browser, Step::WizardNext, &self.locators.next).await)?.is_some() {
                report.enter(PublishState::WizardStep(page));
            }
            sleep(pause * 3).await;
            if page == CHECKS_AFTER_PAGE {
                let checks = self
                    .find(browser, Step::AwaitChecks, &self.locators.checks, Condition::Present)
                    .await
                    .map(|_| ());
                report.settle(checks)?;
                sleep(pause * 2).await;
            }
        }

        if report.settle(self.select(browser, Step::SetVisibility, &self.locators.visibility).await)?.is_some() {
            report.enter(PublishState::VisibilitySet);
        }
        sleep(pause * 2).await;

        report.settle(self.confirm(browser).await)?;
        report.enter(PublishState::Confirmed);
        sleep(pause * 5).await;
        Ok(())
    }

    async fn navigate(&self, browser: &dyn Browser) -> std::result::Result<(), StepFailure> {
        browser
            .navigate(&self.options.studio_url)
            .await
            .map_err(|e| StepFailure::new(Step::Navigate, e.to_string()))?;
        sleep(self.options.settle).await;
        Ok(())
    }

    /// Menu entries swallow native clicks, so these are clicked from script.
    async fn open_menu_item(
        &self,
        browser: &dyn Browser,
        step: Step,
        strategies: &[Strategy],
    ) -> std::result::Result<(), StepFailure> {
        let found = self.find(browser, step, strategies, Condition::Clickable).await?;
        let fail = |e: Error| StepFailure::new(step, e.to_string());
        browser.scroll_into_view(&found.element).await.map_err(fail)?;
        sleep(self.options.action_pause).await;
        browser.script_click(&found.element).await.map_err(fail)
    }

    async fn submit_file(&self, browser: &dyn Browser, media: &Path) -> std::result::Result<(), StepFailure> {
        let input = self
            .find(browser, Step::SelectFile, &self.locators.file_input, Condition::Present)
            .await?;
        browser
            .send_keys(&input.element, &media.to_string_lossy())
            .await
            .map_err(|e| StepFailure::new(Step::SelectFile, e.to_string()))
    }

    /// The details form becomes usable once the upload has been accepted;
    /// poll until its first textbox takes a click.
    async fn await_processing(&self, browser: &dyn Browser) -> std::result::Result<(), StepFailure> {
        let started = Instant::now();
        let mut next_report = Duration::from_secs(20);
        loop {
            if let Ok(boxes) = browser.find_all(&self.locators.textbox).await {
                if let Some(first) = boxes.first() {
                    if browser.click(first).await.is_ok() {
                        tracing::info!(elapsed = ?started.elapsed(), "Upload accepted, details form ready");
                        return Ok(());
                    }
                }
            }

            let elapsed = started.elapsed();
            if elapsed >= self.options.processing_max_wait {
                return Err(StepFailure::new(
                    Step::AwaitProcessing,
                    format!("details form not ready after {elapsed:?}"),
                ));
            }
            if elapsed >= next_report {
                tracing::info!(elapsed = ?elapsed, "Still uploading");
                next_report += Duration::from_secs(20);
            }
            sleep(self.options.processing_poll.min(self.options.processing_max_wait - elapsed)).await;
        }
    }

    /// Type `text` into the `position`-th textbox, replacing its content,
    /// then read it back. An empty field gets one more attempt.
    async fn enter_field(
        &self,
        browser: &dyn Browser,
        step: Step,
        position: usize,
        text: &str,
    ) -> std::result::Result<(), StepFailure> {
        let boxes = self
            .resolver
            .wait_for_all(
                browser,
                step,
                &self.locators.textbox,
                position + 1,
                self.locators.textbox_timeout,
            )
            .await?;
        let field = &boxes[position];
        let fail = |e: Error| StepFailure::new(step, e.to_string());

        browser.scroll_into_view(field).await.map_err(fail)?;
        sleep(self.options.action_pause).await;
        self.click(browser, step, field).await?;
        sleep(self.options.action_pause).await;

        for attempt in 1..=2 {
            browser
                .send_keys(field, &keys::select_all_and_delete())
                .await
                .map_err(fail)?;
            sleep(self.options.action_pause / 2).await;
            browser.send_keys(field, text).await.map_err(fail)?;
            sleep(self.options.action_pause).await;

            let entered = browser.text(field).await.map_err(fail)?;
            if !entered.trim().is_empty() {
                tracing::info!(%step, "Field filled");
                return Ok(());
            }
            tracing::debug!(%step, attempt, "Field empty after entry");
        }
        Err(StepFailure::new(step, "field still empty after retry"))
    }

    /// Resolve `strategies` within the step's ceiling.
    async fn find(
        &self,
        browser: &dyn Browser,
        step: Step,
        strategies: &[Strategy],
        condition: Condition,
    ) -> std::result::Result<Resolved, StepFailure> {
        self.resolver
            .resolve_within(browser, step, strategies, condition, self.locators.ceiling(step))
            .await
    }

    /// Find a clickable control and click it.
    async fn select(
        &self,
        browser: &dyn Browser,
        step: Step,
        strategies: &[Strategy],
    ) -> std::result::Result<(), StepFailure> {
        let found = self.find(browser, step, strategies, Condition::Clickable).await?;
        self.click(browser, step, &found.element).await
    }

    /// Native click, falling back to a script click.
    async fn click(
        &self,
        browser: &dyn Browser,
        step: Step,
        element: &ElementRef,
    ) -> std::result::Result<(), StepFailure> {
        if let Err(e) = browser.click(element).await {
            tracing::debug!(%step, "Native click failed, clicking from script: {e}");
            browser
                .script_click(element)
                .await
                .map_err(|e| StepFailure::new(step, e.to_string()))?;
        }
        Ok(())
    }

    /// The primary done button, then the alternate one, found without waiting.
    async fn confirm(&self, browser: &dyn Browser) -> std::result::Result<(), StepFailure> {
        let primary = self
            .select(browser, Step::Confirm, std::slice::from_ref(&self.locators.done_primary))
            .await;
        let Err(primary_failure) = primary else {
            return Ok(());
        };
        tracing::warn!("Primary confirm control failed ({}), trying alternate", primary_failure.reason);

        let alternate = [Strategy::immediate(self.locators.done_alternate.clone())];
        let found = self
            .resolver
            .resolve(browser, Step::Confirm, &alternate, Condition::Present)
            .await
            .map_err(|_| StepFailure::new(Step::Confirm, "neither confirm control could be clicked"))?;
        self.click(browser, Step::Confirm, &found.element).await
    }
}

fn entry_text(text: &str, fallback: &str) -> String {
    let cleaned = sanitize_for_entry(text);
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned
    }
}

#[async_trait]
impl Publisher for PublishEngine {
    async fn publish(
        &self,
        media: &Path,
        metadata: &UploadMetadata,
        report: &mut PublishReport,
    ) -> Result<()> {
        self.upload_into(media, metadata, report).await
    }
}
