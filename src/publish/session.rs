//! The browser session the publish engine drives, and how one is made.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use autoreel_common::{Error, Result};
use autoreel_webdriver::launcher::release_profile;
use autoreel_webdriver::{Browser, ChromeLauncher, ChromeOptions, DriverProcess};

use crate::config::PublishConfig;
use crate::tools::{ToolRegistry, CHROMEDRIVER};

/// One live browser session, optionally owning the driver process behind it.
pub struct PublishSession {
    browser: Box<dyn Browser>,
    driver: Option<DriverProcess>,
}

impl PublishSession {
    pub fn new(browser: Box<dyn Browser>) -> Self {
        Self {
            browser,
            driver: None,
        }
    }

    pub fn with_driver(mut self, driver: DriverProcess) -> Self {
        self.driver = Some(driver);
        self
    }

    pub fn browser(&self) -> &dyn Browser {
        self.browser.as_ref()
    }

    pub async fn is_alive(&self) -> bool {
        self.browser.is_alive().await
    }

    /// End the remote session and stop the driver. Failures are logged only;
    /// a session being closed is usually already broken.
    pub async fn close(self) {
        if let Err(e) = self.browser.quit().await {
            tracing::debug!("Browser quit failed: {e}");
        }
        if let Some(driver) = self.driver {
            driver.stop().await;
        }
    }
}

impl std::fmt::Debug for PublishSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PublishSession")
            .field("driver", &self.driver)
            .finish_non_exhaustive()
    }
}

/// Creates browser sessions for the publish engine.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Remove whatever would stop a new session from starting, such as a
    /// stale browser still holding the automation profile.
    async fn clear_conflicts(&self) -> Result<()>;

    /// Start a fresh session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Session`] when the driver cannot be started or the
    /// browser cannot be reached.
    async fn create(&self) -> Result<PublishSession>;
}

/// Sessions on a local Chrome via chromedriver, using a dedicated profile
/// that is already signed in to the target console.
#[derive(Debug, Clone)]
pub struct ChromeSessionFactory {
    driver_path: Option<PathBuf>,
    port: u16,
    options: ChromeOptions,
}

impl ChromeSessionFactory {
    pub fn new(config: &PublishConfig, tools: &ToolRegistry) -> Self {
        let mut options = ChromeOptions::new(&config.profile_dir);
        options.headless = config.headless;
        Self {
            driver_path: tools.require(CHROMEDRIVER).ok().map(PathBuf::from),
            port: config.driver_port,
            options,
        }
    }
}

#[async_trait]
impl SessionFactory for ChromeSessionFactory {
    async fn clear_conflicts(&self) -> Result<()> {
        let profile = self.options.profile_dir.clone();
        let released = tokio::task::spawn_blocking(move || release_profile(&profile))
            .await
            .map_err(|e| Error::session(format!("profile release task failed: {e}")))??;
        if released {
            tracing::info!(profile = %self.options.profile_dir.display(), "Released automation profile");
            // Give the killed browser time to let go of its files.
            tokio::time::sleep(Duration::from_secs(3)).await;
        }
        Ok(())
    }

    async fn create(&self) -> Result<PublishSession> {
        let Some(driver_path) = &self.driver_path else {
            return Err(Error::session("chromedriver not found; set tools.chromedriver"));
        };
        let (driver, client) = ChromeLauncher::new(driver_path, self.port)
            .launch(&self.options)
            .await?;
        let session = PublishSession::new(Box::new(client)).with_driver(driver);

        if let Err(e) = session.browser().navigate("about:blank").await {
            session.close().await;
            return Err(Error::session(format!("new browser session is unresponsive: {e}")));
        }
        tracing::info!("Browser session ready");
        Ok(session)
    }
}
