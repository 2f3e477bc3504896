//! The upload workflow: its steps, how each failure is treated, and the
//! locators tried for each control of the studio console.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use autoreel_webdriver::Locator;

use super::resolver::Strategy;
use crate::config::Visibility;

/// Number of "Next" pages between the details form and the visibility page.
pub const WIZARD_PAGES: u8 = 3;

/// After this wizard page the console runs its checks.
pub const CHECKS_AFTER_PAGE: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    Navigate,
    OpenCreateMenu,
    ChooseUpload,
    SelectFile,
    AwaitProcessing,
    EnterTitle,
    EnterDescription,
    SetAudience,
    WizardNext,
    AwaitChecks,
    SetVisibility,
    Confirm,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Navigate => "navigate",
            Self::OpenCreateMenu => "open-create-menu",
            Self::ChooseUpload => "choose-upload",
            Self::SelectFile => "select-file",
            Self::AwaitProcessing => "await-processing",
            Self::EnterTitle => "enter-title",
            Self::EnterDescription => "enter-description",
            Self::SetAudience => "set-audience",
            Self::WizardNext => "wizard-next",
            Self::AwaitChecks => "await-checks",
            Self::SetVisibility => "set-visibility",
            Self::Confirm => "confirm",
        };
        f.write_str(name)
    }
}

/// What a failed step does to the publish attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// The attempt fails.
    Escalate,
    /// Log a warning and carry on with the next step.
    Continue,
}

#[derive(Debug, Clone, Copy)]
pub struct StepRule {
    pub step: Step,
    pub policy: FailurePolicy,
}

const fn rule(step: Step, policy: FailurePolicy) -> StepRule {
    StepRule { step, policy }
}

/// Workflow steps in execution order with their failure policy.
///
/// Without the create menu or the file input nothing has been uploaded, so
/// nothing later can succeed; those escalate together with the final
/// confirmation. Everything else may already hold an acceptable default.
pub const STEPS: &[StepRule] = &[
    rule(Step::Navigate, FailurePolicy::Escalate),
    rule(Step::OpenCreateMenu, FailurePolicy::Escalate),
    rule(Step::ChooseUpload, FailurePolicy::Continue),
    rule(Step::SelectFile, FailurePolicy::Escalate),
    rule(Step::AwaitProcessing, FailurePolicy::Continue),
    rule(Step::EnterTitle, FailurePolicy::Continue),
    rule(Step::EnterDescription, FailurePolicy::Continue),
    rule(Step::SetAudience, FailurePolicy::Continue),
    rule(Step::WizardNext, FailurePolicy::Continue),
    rule(Step::AwaitChecks, FailurePolicy::Continue),
    rule(Step::SetVisibility, FailurePolicy::Continue),
    rule(Step::Confirm, FailurePolicy::Escalate),
];

pub fn policy_for(step: Step) -> FailurePolicy {
    STEPS
        .iter()
        .find(|s| s.step == step)
        .map(|s| s.policy)
        .unwrap_or(FailurePolicy::Continue)
}

/// Locators for every control the workflow touches.
#[derive(Debug, Clone)]
pub struct Locators {
    pub create: Vec<Strategy>,
    pub upload_menu: Vec<Strategy>,
    pub file_input: Vec<Strategy>,
    /// Title is the first match, description the second.
    pub textbox: Locator,
    pub textbox_timeout: Duration,
    pub audience: Vec<Strategy>,
    pub next: Vec<Strategy>,
    pub checks: Vec<Strategy>,
    pub visibility: Vec<Strategy>,
    pub done_primary: Strategy,
    /// Looked up once, without waiting, after the primary gives up.
    pub done_alternate: Locator,
    /// Total time a step may spend across all of its strategies.
    pub ceilings: HashMap<Step, Duration>,
}

fn xpaths(paths: &[&str], timeout: Duration) -> Vec<Strategy> {
    paths
        .iter()
        .map(|p| Strategy::new(Locator::xpath(*p), timeout))
        .collect()
}

impl Locators {
    /// Locators for YouTube Studio.
    pub fn studio(made_for_kids: bool, visibility: Visibility) -> Self {
        let ten = Duration::from_secs(10);
        let fifteen = Duration::from_secs(15);

        let create = vec![
            Strategy::new(Locator::xpath(r#"//button[@aria-label="Create"]"#), ten),
            Strategy::new(Locator::xpath(r#"//ytcp-button[@id="create-icon"]"#), ten),
            Strategy::new(Locator::id("create-icon"), ten),
            Strategy::new(Locator::xpath(r#"//*[@id="create-icon"]"#), ten),
        ];

        let upload_menu = xpaths(
            &[
                r#"//tp-yt-paper-item[@test-id="upload-beta"]"#,
                r#"//tp-yt-paper-item[contains(text(), "Upload videos")]"#,
                r#"//*[@id="text-item-0"]"#,
                r#"//ytcp-ve[contains(text(), "Upload videos")]"#,
                r#"//tp-yt-paper-item[@class="style-scope ytcp-text-menu"]"#,
            ],
            ten,
        );

        let file_input = vec![
            Strategy::new(Locator::xpath(r#"//input[@type="file"]"#), fifteen),
            Strategy::new(Locator::css(r#"input[type="file"]"#), fifteen),
            Strategy::new(Locator::xpath(r#"//input[@name="Filedata"]"#), fifteen),
            Strategy::new(Locator::xpath(r#"//*[@id="content"]/input"#), fifteen),
        ];

        let (kids_name, kids_label) = if made_for_kids {
            ("VIDEO_MADE_FOR_KIDS_MFK", "Yes, it's made for kids")
        } else {
            ("VIDEO_MADE_FOR_KIDS_NOT_MFK", "No, it's not made for kids")
        };
        let audience = radio_strategies(kids_name, kids_label, ten);
        let visibility = radio_strategies(visibility.radio_name(), visibility.label(), ten);

        Self {
            create,
            upload_menu,
            file_input,
            textbox: Locator::xpath(r#"//div[@id="textbox"]"#),
            textbox_timeout: Duration::from_secs(20),
            audience,
            next: xpaths(&[r#"//*[@id="next-button"]"#], fifteen),
            checks: xpaths(
                &[r#"//*[contains(text(), "No issues found") or contains(text(), "Copyright")]"#],
                Duration::from_secs(30),
            ),
            visibility,
            done_primary: Strategy::new(Locator::xpath(r#"//*[@id="done-button"]"#), fifteen),
            done_alternate: Locator::xpath(r#"//ytcp-button[@id="done-button"]"#),
            ceilings: HashMap::from([
                (Step::OpenCreateMenu, Duration::from_secs(30)),
                (Step::ChooseUpload, Duration::from_secs(30)),
                (Step::SelectFile, Duration::from_secs(30)),
                (Step::SetAudience, Duration::from_secs(20)),
                (Step::WizardNext, fifteen),
                (Step::AwaitChecks, Duration::from_secs(30)),
                (Step::SetVisibility, Duration::from_secs(20)),
                (Step::Confirm, fifteen),
            ]),
        }
    }

    /// The overall wait allowed for `step`; `None` leaves only the
    /// per-strategy timeouts.
    pub fn ceiling(&self, step: Step) -> Option<Duration> {
        self.ceilings.get(&step).copied()
    }
}

fn radio_strategies(name: &str, label: &str, timeout: Duration) -> Vec<Strategy> {
    vec![
        Strategy::new(
            Locator::xpath(format!(r#"//tp-yt-paper-radio-button[@name="{name}"]"#)),
            timeout,
        ),
        Strategy::new(
            Locator::xpath(format!(r#"//paper-radio-button[@name="{name}"]"#)),
            timeout,
        ),
        Strategy::new(
            Locator::xpath(format!(
                r#"//*[contains(text(), "{label}")]/ancestor::tp-yt-paper-radio-button"#
            )),
            timeout,
        ),
    ]
}
