//! Update and install collaborator boundary. The core never talks to the
//! network itself: it consumes an [`UpdateSource`], gates probes behind a
//! persisted re-check interval, and reports results into the event loop as
//! messages so the display update happens on the same turn-taking schedule
//! as every other state mutation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::thread;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};

/// Minimum spacing between unforced update checks.
const UPDATE_CHECK_HOURS: i64 = 24;
/// Timestamp file recording the most recent check attempt.
const LAST_CHECK_FILE: &str = "lastupdate";

/// A newer release offered by the collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub version: String,
    pub download_url: String,
}

/// Messages delivered into the single-threaded event loop. Background tasks
/// never mutate controller state directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppMessage {
    UpdateAvailable { version: String },
}

/// The update-check collaborator. Implementations own their transport and
/// timeouts; `Ok(None)` means "no newer release".
pub trait UpdateSource: Send + 'static {
    fn check_for_update(&self) -> Result<Option<UpdateInfo>>;
}

/// The install collaborator, invoked by platform bootstrap rather than by
/// the core. Copying binaries and editing PATH happen behind this seam.
pub trait Installer {
    fn is_installed_globally(&self) -> bool;
    fn install_globally(&self) -> Result<()>;
    fn uninstall_globally(&self) -> Result<()>;
}

/// When the last check attempt was recorded, if ever.
pub fn last_update_check(data_dir: &Path) -> Option<DateTime<Utc>> {
    let raw = fs::read_to_string(data_dir.join(LAST_CHECK_FILE)).ok()?;
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

/// Record that a check attempt happened now.
pub fn record_update_check(data_dir: &Path) -> std::io::Result<()> {
    fs::write(data_dir.join(LAST_CHECK_FILE), Utc::now().to_rfc3339())
}

/// A probe is due when forced, never recorded, or the interval has passed.
pub fn check_due(data_dir: &Path, force: bool) -> bool {
    if force {
        return true;
    }
    match last_update_check(data_dir) {
        Some(last) => Utc::now() - last >= Duration::hours(UPDATE_CHECK_HOURS),
        None => true,
    }
}

/// Run one interval-gated check on a detached thread. The result comes back
/// through the channel; failures are logged and swallowed because there is
/// nothing the user can do about them mid-session.
pub fn spawn_update_probe<S: UpdateSource>(
    source: S,
    data_dir: PathBuf,
    force: bool,
    tx: Sender<AppMessage>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        if !check_due(&data_dir, force) {
            return;
        }
        if let Err(err) = record_update_check(&data_dir) {
            log::warn!("could not record update check time: {err}");
        }
        match source.check_for_update() {
            Ok(Some(info)) => {
                let _ = tx.send(AppMessage::UpdateAvailable {
                    version: info.version,
                });
            }
            Ok(None) => {}
            Err(err) => log::warn!("update check failed: {err}"),
        }
    })
}

#[cfg(feature = "self-update")]
mod github {
    use super::{Result, UpdateInfo, UpdateSource};
    use serde::Deserialize;
    use std::time::Duration;

    const RELEASES_URL: &str = "https://api.github.com/repos/s42yt/thighpads/releases/latest";

    #[derive(Debug, Deserialize)]
    struct Release {
        tag_name: String,
        prerelease: bool,
        #[serde(default)]
        assets: Vec<Asset>,
    }

    #[derive(Debug, Deserialize)]
    struct Asset {
        name: String,
        browser_download_url: String,
    }

    /// Latest-release lookup against the GitHub API.
    pub struct GithubReleaseSource {
        releases_url: String,
    }

    impl Default for GithubReleaseSource {
        fn default() -> Self {
            Self {
                releases_url: RELEASES_URL.to_string(),
            }
        }
    }

    impl UpdateSource for GithubReleaseSource {
        fn check_for_update(&self) -> Result<Option<UpdateInfo>> {
            let client = reqwest::blocking::Client::builder()
                .timeout(Duration::from_secs(10))
                .user_agent(concat!("thighpads/", env!("CARGO_PKG_VERSION")))
                .build()?;
            let release: Release = client
                .get(&self.releases_url)
                .send()?
                .error_for_status()?
                .json()?;

            if release.prerelease {
                return Ok(None);
            }

            let version = release.tag_name.trim_start_matches('v').to_string();
            if version == env!("CARGO_PKG_VERSION") {
                return Ok(None);
            }

            let wanted = format!(
                "thighpads_{}{}",
                release.tag_name,
                std::env::consts::EXE_SUFFIX
            );
            let Some(asset) = release.assets.iter().find(|a| a.name == wanted) else {
                return Ok(None);
            };

            Ok(Some(UpdateInfo {
                version,
                download_url: asset.browser_download_url.clone(),
            }))
        }
    }
}

#[cfg(feature = "self-update")]
pub use github::GithubReleaseSource;
