//! Configuration for the cache worker and the offline queue.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Defaults applied to push notifications whose payload omits them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationDefaults {
    /// Title used when the payload has none.
    pub title: String,
    /// Body used when the payload has none.
    pub body: String,
    /// Icon shown with the notification.
    pub icon: String,
    /// Badge shown in the status bar.
    pub badge: String,
    /// Text direction (`"rtl"` or `"ltr"`).
    pub dir: String,
    /// Language tag.
    pub lang: String,
    /// Route opened when a notification is clicked and no window exists.
    pub click_route: String,
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            title: "Proshield Reports".to_string(),
            body: "יש לך התראה חדשה".to_string(),
            icon: "/static/images/icon-192.png".to_string(),
            badge: "/static/images/icon-192.png".to_string(),
            dir: "rtl".to_string(),
            lang: "he".to_string(),
            click_route: "/dashboard".to_string(),
        }
    }
}

/// Immutable configuration handed to the cache worker at construction.
///
/// The cache version is what ties a deployment to its cache generations:
/// bumping it makes every existing generation stale on the next activation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Origin the app is served from. Requests to other origins are cached
    /// under their full URL.
    pub origin: String,
    /// Cache generation version, e.g. `"v5"`.
    pub cache_version: String,
    /// Cache-busting query value appended to versioned assets.
    pub asset_version: String,
    /// Prefix shared by all generation names.
    pub cache_prefix: String,
    /// Entry pages precached at install.
    pub pages: Vec<String>,
    /// Assets precached both with `?v=<asset_version>` and without.
    pub versioned_assets: Vec<String>,
    /// Assets precached as-is.
    pub static_assets: Vec<String>,
    /// Paths under this prefix are network-first.
    pub api_prefix: String,
    /// Uploaded files under this prefix are network-first.
    pub uploads_prefix: String,
    /// Cached document served when offline and nothing else matches.
    pub offline_fallback: String,
    /// Background sync tag that triggers a report sync broadcast.
    pub sync_tag: String,
    /// Whether a finished install activates without waiting for old tabs.
    pub skip_waiting_on_install: bool,
    /// Push notification defaults.
    pub notification: NotificationDefaults,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            origin: "http://localhost".to_string(),
            cache_version: "v5".to_string(),
            asset_version: "20260203-04".to_string(),
            cache_prefix: "proshield".to_string(),
            pages: ["/", "/login", "/dashboard", "/report/new", "/settings"]
                .map(String::from)
                .to_vec(),
            versioned_assets: ["/static/css/style.css", "/static/js/app.js", "/manifest.json"]
                .map(String::from)
                .to_vec(),
            static_assets: ["/static/images/icon-192.png", "/static/images/icon-512.png"]
                .map(String::from)
                .to_vec(),
            api_prefix: "/api/".to_string(),
            uploads_prefix: "/uploads/".to_string(),
            offline_fallback: "/".to_string(),
            sync_tag: "sync-reports".to_string(),
            skip_waiting_on_install: true,
            notification: NotificationDefaults::default(),
        }
    }
}

impl WorkerConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the origin the app is served from.
    #[must_use]
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Sets the cache generation version.
    #[must_use]
    pub fn with_cache_version(mut self, version: impl Into<String>) -> Self {
        self.cache_version = version.into();
        self
    }

    /// Sets the cache-busting asset version.
    #[must_use]
    pub fn with_asset_version(mut self, version: impl Into<String>) -> Self {
        self.asset_version = version.into();
        self
    }

    /// Replaces the entry pages.
    #[must_use]
    pub fn with_pages<I, S>(mut self, pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pages = pages.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the versioned assets.
    #[must_use]
    pub fn with_versioned_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.versioned_assets = assets.into_iter().map(Into::into).collect();
        self
    }

    /// Replaces the unversioned static assets.
    #[must_use]
    pub fn with_static_assets<I, S>(mut self, assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.static_assets = assets.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether install finishes with an immediate skip-waiting.
    #[must_use]
    pub const fn with_skip_waiting_on_install(mut self, skip: bool) -> Self {
        self.skip_waiting_on_install = skip;
        self
    }

    /// Name of the static generation for this version.
    #[must_use]
    pub fn static_cache_name(&self) -> String {
        format!("{}-static-{}", self.cache_prefix, self.cache_version)
    }

    /// Name of the dynamic generation for this version.
    #[must_use]
    pub fn dynamic_cache_name(&self) -> String {
        format!("{}-dynamic-{}", self.cache_prefix, self.cache_version)
    }

    /// Every URL populated into the static generation at install, in order.
    #[must_use]
    pub fn precache_urls(&self) -> Vec<String> {
        let versioned = self
            .versioned_assets
            .iter()
            .map(|asset| format!("{asset}?v={}", self.asset_version));

        self.pages
            .iter()
            .cloned()
            .chain(versioned)
            .chain(self.versioned_assets.iter().cloned())
            .chain(self.static_assets.iter().cloned())
            .collect()
    }
}

/// Configuration for the page-side offline queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Key under which the queue is stored.
    pub storage_key: String,
    /// Directory backing the file store.
    pub data_dir: PathBuf,
    /// Endpoint queued reports are replayed to.
    pub upload_path: String,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            storage_key: "offlineReports".to_string(),
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("proshield-offline"),
            upload_path: "/api/reports".to_string(),
        }
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Cache worker configuration.
    pub worker: WorkerConfig,
    /// Offline queue configuration.
    pub queue: QueueConfig,
}

impl AppConfig {
    /// Creates a new config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> crate::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(contents) => {
                log::info!("Loaded config from {}", path.display());
                Ok(toml::from_str(&contents)?)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Default location of the configuration file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("proshield-offline")
            .join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_names_carry_version() {
        let config = WorkerConfig::default();
        assert_eq!(config.static_cache_name(), "proshield-static-v5");
        assert_eq!(config.dynamic_cache_name(), "proshield-dynamic-v5");

        let bumped = config.with_cache_version("v6");
        assert_eq!(bumped.static_cache_name(), "proshield-static-v6");
        assert_eq!(bumped.dynamic_cache_name(), "proshield-dynamic-v6");
    }

    #[test]
    fn precache_urls_include_versioned_and_fallback() {
        let config = WorkerConfig::new()
            .with_pages(["/"])
            .with_versioned_assets(["/app.js"])
            .with_static_assets(["/icon.png"])
            .with_asset_version("7");

        assert_eq!(
            config.precache_urls(),
            vec!["/", "/app.js?v=7", "/app.js", "/icon.png"]
        );
    }

    #[test]
    fn default_precache_list_matches_deployment() {
        let urls = WorkerConfig::default().precache_urls();
        assert_eq!(urls.len(), 13);
        assert_eq!(urls[0], "/");
        assert!(urls.contains(&"/static/css/style.css?v=20260203-04".to_string()));
        assert!(urls.contains(&"/static/css/style.css".to_string()));
        assert!(urls.contains(&"/static/images/icon-512.png".to_string()));
    }

    #[test]
    fn builder_pattern() {
        let config = WorkerConfig::new()
            .with_origin("https://reports.example")
            .with_cache_version("v9")
            .with_skip_waiting_on_install(false);
        assert_eq!(config.origin, "https://reports.example");
        assert_eq!(config.cache_version, "v9");
        assert!(!config.skip_waiting_on_install);
    }

    #[test]
    fn default_queue_config() {
        let config = QueueConfig::default();
        assert_eq!(config.storage_key, "offlineReports");
        assert_eq!(config.upload_path, "/api/reports");
        assert!(config.data_dir.to_string_lossy().contains("proshield-offline"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [worker]
            cache_version = "v6"

            [worker.notification]
            lang = "en"
            "#,
        )
        .unwrap();

        assert_eq!(config.worker.cache_version, "v6");
        assert_eq!(config.worker.api_prefix, "/api/");
        assert_eq!(config.worker.notification.lang, "en");
        assert_eq!(config.worker.notification.click_route, "/dashboard");
        assert_eq!(config.queue.storage_key, "offlineReports");
    }

    #[test]
    fn load_missing_file_yields_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn load_rejects_malformed_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "worker = [").unwrap();
        assert!(matches!(
            AppConfig::load(&path),
            Err(crate::Error::Config(_))
        ));
    }
}
