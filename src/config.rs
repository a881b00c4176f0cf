//! Client configuration

use crate::api::HttpClientConfig;
use crate::core::poller::DEFAULT_POLL_INTERVAL;
use std::path::PathBuf;
use std::time::Duration;

/// Default service address
pub const DEFAULT_SERVER: &str = "http://127.0.0.1:5000";

/// Default location of the metadata cache
pub const DEFAULT_META_PATH: &str = ".vidq/tasks_meta.json";

/// Default directory for saves that bypass the dialog
pub const DEFAULT_OUTPUT_DIR: &str = "downloads";

/// Everything needed to wire the client components together
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the download service
    pub server: String,
    /// HTTP settings
    pub http: HttpClientConfig,
    /// Time between task polls
    pub poll_interval: Duration,
    /// Metadata cache file
    pub meta_path: PathBuf,
    /// Directory used when saving without the dialog
    pub output_dir: PathBuf,
    /// Ask for a destination on every save
    pub save_dialog: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server: DEFAULT_SERVER.to_string(),
            http: HttpClientConfig::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            meta_path: PathBuf::from(DEFAULT_META_PATH),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            save_dialog: false,
        }
    }
}

impl ClientConfig {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            ..Self::default()
        }
    }

    /// Set HTTP timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http.timeout = timeout;
        self
    }

    /// Set User-Agent override
    pub fn with_user_agent(mut self, user_agent: Option<String>) -> Self {
        self.http.user_agent = user_agent;
        self
    }

    /// Set proxy URL
    pub fn with_proxy(mut self, proxy: Option<String>) -> Self {
        self.http.proxy_url = proxy;
        self
    }

    /// Set time between task polls
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set metadata cache file
    pub fn with_meta_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.meta_path = path.into();
        self
    }

    /// Set fallback save directory
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Ask for a destination on every save
    pub fn with_save_dialog(mut self, enabled: bool) -> Self {
        self.save_dialog = enabled;
        self
    }
}
