//! Starting chromedriver against a dedicated, already-logged-in profile.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use autoreel_common::{Error, Result};
use serde_json::{json, Value};
use tokio::process::{Child, Command};

use crate::client::WebDriverClient;

/// Lock entries Chrome keeps in a profile directory while it owns it.
const PROFILE_LOCKS: &[&str] = &["SingletonLock", "SingletonSocket", "SingletonCookie"];

/// Browser-level options for the automation profile.
#[derive(Debug, Clone)]
pub struct ChromeOptions {
    /// `--user-data-dir` holding the logged-in profile.
    pub profile_dir: PathBuf,
    pub headless: bool,
    /// Extra command-line switches appended after the defaults.
    pub extra_args: Vec<String>,
}

impl ChromeOptions {
    pub fn new(profile_dir: impl Into<PathBuf>) -> Self {
        Self {
            profile_dir: profile_dir.into(),
            headless: false,
            extra_args: Vec::new(),
        }
    }

    /// The `alwaysMatch` capabilities for a new session.
    pub fn capabilities(&self) -> Value {
        let mut args = vec![
            format!("--user-data-dir={}", self.profile_dir.display()),
            "--start-maximized".to_string(),
            "--disable-blink-features=AutomationControlled".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--log-level=3".to_string(),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }
        args.extend(self.extra_args.iter().cloned());

        json!({
            "browserName": "chrome",
            "goog:chromeOptions": {
                "args": args,
                "excludeSwitches": ["enable-automation", "enable-logging"],
                "useAutomationExtension": false,
            }
        })
    }
}

/// A running chromedriver process. Killed when stopped or dropped.
#[derive(Debug)]
pub struct DriverProcess {
    child: Child,
    port: u16,
}

impl DriverProcess {
    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn endpoint(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub async fn stop(mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::debug!("chromedriver already exited: {e}");
        }
    }
}

/// Launches chromedriver and opens a session on it.
#[derive(Debug, Clone)]
pub struct ChromeLauncher {
    driver_path: PathBuf,
    port: u16,
    startup_timeout: Duration,
}

impl ChromeLauncher {
    pub fn new(driver_path: impl Into<PathBuf>, port: u16) -> Self {
        Self {
            driver_path: driver_path.into(),
            port,
            startup_timeout: Duration::from_secs(20),
        }
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// Spawn chromedriver, wait for it to report ready, then create a session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Session`] when the driver binary is missing, never
    /// becomes ready, or refuses to create a session.
    pub async fn launch(&self, options: &ChromeOptions) -> Result<(DriverProcess, WebDriverClient)> {
        if !self.driver_path.exists() {
            return Err(Error::session(format!(
                "chromedriver not found at {}",
                self.driver_path.display()
            )));
        }

        tracing::info!(driver = %self.driver_path.display(), port = self.port, "Starting chromedriver");
        let child = Command::new(&self.driver_path)
            .arg(format!("--port={}", self.port))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::session(format!("failed to spawn chromedriver: {e}")))?;
        let process = DriverProcess {
            child,
            port: self.port,
        };

        if let Err(e) = wait_until_ready(&process.endpoint(), self.startup_timeout).await {
            process.stop().await;
            return Err(e);
        }

        match WebDriverClient::connect(&process.endpoint(), options.capabilities()).await {
            Ok(client) => Ok((process, client)),
            Err(e) => {
                process.stop().await;
                Err(e)
            }
        }
    }
}

async fn wait_until_ready(endpoint: &str, timeout: Duration) -> Result<()> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(2))
        .build()
        .map_err(|e| Error::session(format!("failed to build HTTP client: {e}")))?;
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if let Ok(response) = client.get(format!("{endpoint}/status")).send().await {
            if let Ok(status) = response.json::<Value>().await {
                if status["value"]["ready"].as_bool().unwrap_or(false) {
                    return Ok(());
                }
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return Err(Error::session(format!(
                "chromedriver at {endpoint} not ready after {timeout:?}"
            )));
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

/// Free a profile directory still claimed by another browser process.
///
/// Chrome records its owner as a `SingletonLock` symlink whose target is
/// `<hostname>-<pid>`. That process is killed (unix only) and the lock
/// entries removed. Returns `true` when a lock was found.
pub fn release_profile(profile_dir: &Path) -> Result<bool> {
    let lock = profile_dir.join("SingletonLock");
    let target = match std::fs::read_link(&lock) {
        Ok(target) => target,
        Err(_) if !lock.exists() => return Ok(false),
        Err(_) => PathBuf::new(),
    };

    if let Some(pid) = lock_owner_pid(&target.to_string_lossy()) {
        tracing::info!(pid, profile = %profile_dir.display(), "Killing browser holding automation profile");
        kill_process(pid);
    }

    for name in PROFILE_LOCKS {
        let entry = profile_dir.join(name);
        if entry.symlink_metadata().is_ok() {
            std::fs::remove_file(&entry)?;
        }
    }
    Ok(true)
}

fn lock_owner_pid(target: &str) -> Option<i32> {
    target.rsplit('-').next()?.parse().ok()
}

#[cfg(unix)]
fn kill_process(pid: i32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Err(e) = kill(Pid::from_raw(pid), Signal::SIGKILL) {
        tracing::debug!(pid, "could not signal lock owner: {e}");
    }
}

#[cfg(not(unix))]
fn kill_process(pid: i32) {
    tracing::warn!(pid, "cannot signal lock owner on this platform; removing lock only");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capabilities_carry_profile_and_switches() {
        let caps = ChromeOptions::new("/tmp/profile").capabilities();
        let args: Vec<&str> = caps["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert_eq!(args[0], "--user-data-dir=/tmp/profile");
        assert!(args.contains(&"--disable-blink-features=AutomationControlled"));
        assert_eq!(
            caps["goog:chromeOptions"]["excludeSwitches"],
            json!(["enable-automation", "enable-logging"])
        );
    }

    #[test]
    fn parses_pid_from_lock_target() {
        assert_eq!(lock_owner_pid("build-host-4242"), Some(4242));
        assert_eq!(lock_owner_pid("garbage"), None);
    }

    #[test]
    fn release_without_lock_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!release_profile(dir.path()).unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn release_removes_stale_lock() {
        let dir = tempfile::tempdir().unwrap();
        // PID far above any real pid_max so nothing gets signalled.
        std::os::unix::fs::symlink("nohost-2147483000", dir.path().join("SingletonLock")).unwrap();
        std::fs::write(dir.path().join("SingletonCookie"), b"").unwrap();

        assert!(release_profile(dir.path()).unwrap());
        assert!(dir.path().join("SingletonLock").symlink_metadata().is_err());
        assert!(!dir.path().join("SingletonCookie").exists());
    }

    #[tokio::test]
    async fn missing_driver_binary_is_session_error() {
        let launcher = ChromeLauncher::new("/nonexistent/chromedriver_xyz", 9515);
        let err = launcher
            .launch(&ChromeOptions::new("/tmp/profile"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::Session(_)));
    }
}
