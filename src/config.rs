use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api_base_url: String,
    pub request_timeout: Duration,
    pub search_debounce: Duration,
    pub page_size: u32,
    pub notify_dedup_window: Duration,
    pub state_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000".into(),
            request_timeout: Duration::from_secs(15),
            search_debounce: Duration::from_millis(400),
            page_size: 12,
            notify_dedup_window: Duration::from_millis(4000),
            state_dir: PathBuf::from(".bazaar"),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("API_BASE_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.api_base_url);
        reqwest::Url::parse(&api_base_url)
            .with_context(|| format!("API_BASE_URL is not a valid url: {}", api_base_url))?;

        let request_timeout = lookup("REQUEST_TIMEOUT_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|v| *v > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);
        let search_debounce = lookup("SEARCH_DEBOUNCE_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.search_debounce);
        let page_size = lookup("PAGE_SIZE")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|v| *v > 0)
            .unwrap_or(defaults.page_size);
        let notify_dedup_window = lookup("NOTIFY_DEDUP_MS")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.notify_dedup_window);
        let state_dir = lookup("STATE_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.state_dir);

        Ok(Self {
            api_base_url,
            request_timeout,
            search_debounce,
            page_size,
            notify_dedup_window,
            state_dir,
        })
    }

    pub fn settings_path(&self) -> PathBuf {
        self.state_dir.join("settings.json")
    }
}
