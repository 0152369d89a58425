use std::sync::Arc;

use crate::auth::{SessionHandle, SessionStore};
use crate::config::AppConfig;
use crate::http::ApiClient;
use crate::notify::Notifier;
use crate::settings::{FileSettings, Settings};
use crate::uploads::{HttpUploads, UploadClient};

/// Everything a page needs, passed explicitly instead of through globals.
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub settings: Settings,
    pub session: SessionHandle,
    pub api: ApiClient,
    pub uploads: Arc<dyn UploadClient>,
    pub notifier: Notifier,
}

impl AppContext {
    pub fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;
        let settings = Settings::new(Arc::new(FileSettings::open(config.settings_path())?));
        Self::from_parts(config, settings)
    }

    pub fn from_parts(config: AppConfig, settings: Settings) -> anyhow::Result<Self> {
        let session = SessionHandle::new(settings.clone());
        let api = ApiClient::new(&config.api_base_url, config.request_timeout, session.clone())?;
        let uploads = Arc::new(HttpUploads::new(api.clone())) as Arc<dyn UploadClient>;
        let notifier = Notifier::new(config.notify_dedup_window);
        Ok(Self {
            config: Arc::new(config),
            settings,
            session,
            api,
            uploads,
            notifier,
        })
    }

    pub fn session_store(&self) -> SessionStore {
        SessionStore::new(self.session.clone(), self.api.clone())
    }

    /// List options using the configured page size and debounce.
    pub fn list_options(&self) -> crate::controllers::ListOptions {
        crate::controllers::ListOptions {
            page_size: self.config.page_size,
            debounce: self.config.search_debounce,
            ..Default::default()
        }
    }

    /// Like [`list_options`](Self::list_options), remembering page and filters.
    pub fn remembered_list_options(&self) -> crate::controllers::ListOptions {
        crate::controllers::ListOptions {
            remember: Some(self.settings.clone()),
            ..self.list_options()
        }
    }
}
