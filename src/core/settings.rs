use crate::core::elapsed::{ElapsedFormatter, DEFAULT_JUST_NOW_LABEL};
use crate::core::query::CheckoutQuery;
use anyhow::{Context, Result};
use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/v1/checkins/checkouts/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub source: SourceSettings,
    pub query: CheckoutQuery,
    pub refresh: RefreshSettings,
    pub board: BoardSettings,
    pub labels: LabelSettings,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source: SourceSettings::default(),
            query: CheckoutQuery::default(),
            refresh: RefreshSettings::default(),
            board: BoardSettings::default(),
            labels: LabelSettings::default(),
            debug: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    pub endpoint_url: String,
    pub timeout_secs: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSettings {
    pub data_interval_ms: u64,
    pub label_interval_ms: u64,
    pub clock_interval_ms: u64,
}

impl Default for RefreshSettings {
    fn default() -> Self {
        Self {
            data_interval_ms: 5_000,
            label_interval_ms: 60_000,
            clock_interval_ms: 1_000,
        }
    }
}

impl RefreshSettings {
    pub fn data_interval(&self) -> Duration {
        Duration::from_millis(self.data_interval_ms)
    }

    pub fn label_interval(&self) -> Duration {
        Duration::from_millis(self.label_interval_ms)
    }

    pub fn clock_interval(&self) -> Duration {
        Duration::from_millis(self.clock_interval_ms)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClockFormat {
    #[default]
    #[serde(rename = "12h")]
    TwelveHour,
    #[serde(rename = "24h")]
    TwentyFourHour,
}

impl ClockFormat {
    pub fn pattern(&self) -> &'static str {
        match self {
            ClockFormat::TwelveHour => "%I:%M %p",
            ClockFormat::TwentyFourHour => "%H:%M",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    pub previous_list_size: usize,
    pub clock_format: ClockFormat,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            previous_list_size: 7,
            clock_format: ClockFormat::default(),
        }
    }
}

/// Text shown on the board. Lobby and room boards differ only here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelSettings {
    pub just_now: String,
    pub missing_time: String,
    pub empty_current: String,
    pub empty_code: String,
    pub empty_list: String,
    pub error_current: String,
    pub error_list: String,
}

impl Default for LabelSettings {
    fn default() -> Self {
        Self {
            just_now: DEFAULT_JUST_NOW_LABEL.to_string(),
            missing_time: DEFAULT_JUST_NOW_LABEL.to_string(),
            empty_current: "No checkouts yet".to_string(),
            empty_code: String::new(),
            empty_list: "No previous calls".to_string(),
            error_current: "Error loading data".to_string(),
            error_list: "Error loading data. Please try again.".to_string(),
        }
    }
}

impl LabelSettings {
    pub fn formatter(&self) -> ElapsedFormatter {
        ElapsedFormatter::new(self.just_now.clone(), self.missing_time.clone())
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("checkout-board").join("config.toml"))
    }

    pub fn resolve_path(explicit: Option<&Path>) -> Result<PathBuf> {
        match explicit {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::config_path().context("Could not determine config directory"),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        settings
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        tracing::info!(?path, "Loaded config");
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        reqwest::Url::parse(&self.source.endpoint_url).with_context(|| {
            format!(
                "source.endpoint_url is not a valid URL: {}",
                self.source.endpoint_url
            )
        })?;

        if self.source.timeout_secs == 0 {
            anyhow::bail!("source.timeout_secs must be greater than 0");
        }

        for (name, value) in [
            ("refresh.data_interval_ms", self.refresh.data_interval_ms),
            ("refresh.label_interval_ms", self.refresh.label_interval_ms),
            ("refresh.clock_interval_ms", self.refresh.clock_interval_ms),
        ] {
            if value == 0 {
                anyhow::bail!("{} must be greater than 0", name);
            }
        }

        if self.board.previous_list_size == 0 {
            anyhow::bail!("board.previous_list_size must be at least 1");
        }

        self.query.validate()
    }
}

/// Reloads settings whenever the config file changes on disk and publishes
/// every valid revision on a watch channel.
pub struct SettingsWatcher {
    path: PathBuf,
    tx: watch::Sender<Settings>,
    _watcher: Option<RecommendedWatcher>,
}

impl SettingsWatcher {
    pub fn new(path: PathBuf, initial: Settings) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self {
            path,
            tx,
            _watcher: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.tx.subscribe()
    }

    pub fn start_watching(&mut self) -> Result<()> {
        let parent = match self.path.parent() {
            Some(dir) if dir.as_os_str().is_empty() => PathBuf::from("."),
            Some(dir) => dir.to_path_buf(),
            None => {
                tracing::warn!(path = ?self.path, "Config path has no parent, not watching");
                return Ok(());
            }
        };

        if !parent.exists() {
            tracing::warn!(?parent, "Config directory does not exist, skipping watch");
            return Ok(());
        }

        let file_name = self.path.file_name().map(|n| n.to_os_string());
        let (notify_tx, mut notify_rx) = mpsc::unbounded_channel::<()>();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<notify::Event>| {
                let Ok(event) = res else {
                    return;
                };
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }
                let touches_config = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if touches_config {
                    let _ = notify_tx.send(());
                }
            },
            Config::default(),
        )?;

        watcher
            .watch(&parent, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch directory: {}", parent.display()))?;
        tracing::info!(?parent, "Watching config directory");

        let path = self.path.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            while notify_rx.recv().await.is_some() {
                // Editors write in bursts; settle before re-reading.
                tokio::time::sleep(Duration::from_millis(200)).await;
                while notify_rx.try_recv().is_ok() {}

                match Settings::load_from(&path) {
                    Ok(settings) => {
                        let changed = tx.send_if_modified(|current| {
                            if *current == settings {
                                return false;
                            }
                            *current = settings;
                            true
                        });
                        if changed {
                            tracing::info!(?path, "Config changed on disk, reloaded");
                        }
                    }
                    Err(e) => {
                        let message = format!("{:#}", e);
                        tracing::warn!(error = %message, "Ignoring invalid config change");
                    }
                }
            }
        });

        self._watcher = Some(watcher);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.source.endpoint_url, DEFAULT_ENDPOINT);
        assert_eq!(settings.query.limit, Some(30));
        assert_eq!(settings.refresh.data_interval(), Duration::from_secs(5));
        assert_eq!(settings.refresh.label_interval(), Duration::from_secs(60));
        assert_eq!(settings.refresh.clock_interval(), Duration::from_secs(1));
        assert_eq!(settings.board.previous_list_size, 7);
        assert_eq!(settings.board.clock_format, ClockFormat::TwelveHour);
        assert_eq!(settings.labels.missing_time, "just now");
        assert!(!settings.debug);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_settings_validation() {
        let mut settings = Settings::default();

        settings.board.previous_list_size = 0;
        assert!(settings.validate().is_err());

        settings = Settings::default();
        settings.refresh.label_interval_ms = 0;
        assert!(settings.validate().is_err());

        settings = Settings::default();
        settings.source.endpoint_url = "not a url".to_string();
        assert!(settings.validate().is_err());

        settings = Settings::default();
        settings.query.checked_out_after = Some("soon".to_string());
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
            debug = true

            [source]
            endpoint_url = "https://checkin.example.org/v1/checkins/checkouts/"

            [query]
            limit = 20
            location_group_id = 4
            checked_out_after = "-31m"

            [refresh]
            data_interval_ms = 3000
            label_interval_ms = 5000

            [board]
            previous_list_size = 5
            clock_format = "24h"

            [labels]
            missing_time = "0 min ago"
            empty_current = "No children called yet"
            empty_code = "----"
        "#;

        let settings: Settings = toml::from_str(toml).unwrap();
        assert!(settings.debug);
        assert_eq!(settings.query.limit, Some(20));
        assert_eq!(settings.query.location_group_id, Some(4));
        assert_eq!(settings.refresh.data_interval_ms, 3000);
        assert_eq!(settings.refresh.clock_interval_ms, 1000);
        assert_eq!(settings.board.previous_list_size, 5);
        assert_eq!(settings.board.clock_format, ClockFormat::TwentyFourHour);
        assert_eq!(settings.labels.empty_code, "----");
        assert_eq!(settings.labels.empty_list, "No previous calls");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join("checkout-board-missing-config.toml");
        let _ = std::fs::remove_file(&path);
        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let path = std::env::temp_dir().join(format!(
            "checkout-board-invalid-{}.toml",
            std::process::id()
        ));
        std::fs::write(&path, "[board]\nprevious_list_size = 0\n").unwrap();
        let result = Settings::load_from(&path);
        let _ = std::fs::remove_file(&path);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_watcher_publishes_valid_edits_and_ignores_invalid_ones() {
        let dir = std::env::temp_dir().join(format!("checkout-board-watch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[board]\nprevious_list_size = 7\n").unwrap();

        let initial = Settings::load_from(&path).unwrap();
        let mut watcher = SettingsWatcher::new(path.clone(), initial);
        let mut rx = watcher.subscribe();
        watcher.start_watching().unwrap();

        std::fs::write(&path, "[board]\nprevious_list_size = 4\n").unwrap();
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("valid edit should be published")
            .unwrap();
        assert_eq!(rx.borrow_and_update().board.previous_list_size, 4);

        std::fs::write(&path, "[board]\nprevious_list_size = 0\n").unwrap();
        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(!rx.has_changed().unwrap());
        assert_eq!(rx.borrow().board.previous_list_size, 4);

        // The watcher keeps running after rejecting an edit.
        std::fs::write(&path, "[board]\nprevious_list_size = 9\n").unwrap();
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .expect("later valid edit should be published")
            .unwrap();
        assert_eq!(rx.borrow_and_update().board.previous_list_size, 9);

        drop(watcher);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_clock_patterns() {
        assert_eq!(ClockFormat::TwelveHour.pattern(), "%I:%M %p");
        assert_eq!(ClockFormat::TwentyFourHour.pattern(), "%H:%M");
    }
}
