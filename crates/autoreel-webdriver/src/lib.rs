//! # autoreel-webdriver
//!
//! Just enough of the W3C WebDriver protocol to drive a browser console that
//! offers no API of its own.
//!
//! - **[`Browser`]** -- the async trait the publish engine programs against.
//! - **[`WebDriverClient`]** -- a [`Browser`] backed by a WebDriver HTTP
//!   endpoint (chromedriver, selenium, ...).
//! - **[`Locator`]** -- XPath / CSS / id element lookups.
//! - **[`ChromeLauncher`]** -- starts chromedriver against a dedicated
//!   profile and releases a profile still held by a stale browser.

pub mod browser;
pub mod client;
pub mod keys;
pub mod launcher;
pub mod locator;

pub use browser::{Browser, ElementRef};
pub use client::WebDriverClient;
pub use launcher::{ChromeLauncher, ChromeOptions, DriverProcess};
pub use locator::Locator;
