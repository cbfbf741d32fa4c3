use anyhow::{Context, Result, ensure};
use std::{env, path::PathBuf, sync::OnceLock};

/// Application configuration loaded and validated at startup
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// UI server configuration
    pub ui: UiConfig,

    /// SIS backend configuration
    pub backend: BackendConfig,

    /// TLS certificate configuration, only present if both paths are set
    pub certificate: Option<CertificateConfig>,

    /// Path configuration
    pub paths: PathConfig,
}

#[derive(Clone, Debug)]
pub struct UiConfig {
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub api_base: String,
}

#[derive(Clone, Debug)]
pub struct CertificateConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

#[derive(Clone, Debug)]
pub struct PathConfig {
    pub pages_dir: PathBuf,
}

impl AppConfig {
    /// Get or load the application configuration
    ///
    /// On first call all configuration is loaded from environment variables.
    /// Subsequent calls return the cached instance.
    ///
    /// # Panics
    /// Panics if configuration loading fails, the gateway cannot serve
    /// anything without it.
    pub fn get() -> &'static Self {
        static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();
        APP_CONFIG.get_or_init(|| {
            Self::load_internal().expect("failed to load application configuration")
        })
    }

    fn load_internal() -> Result<Self> {
        let ui = UiConfig::load()?;
        let backend = BackendConfig::load()?;
        let certificate = CertificateConfig::load();
        let paths = PathConfig::load();

        Ok(Self {
            ui,
            backend,
            certificate,
            paths,
        })
    }
}

impl UiConfig {
    fn load() -> Result<Self> {
        let port = env::var("UI_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .context("failed to parse UI_PORT: invalid format")?;

        Ok(Self { port })
    }
}

impl BackendConfig {
    fn load() -> Result<Self> {
        let api_base = env::var("API_BASE").unwrap_or_else(|_| "http://127.0.0.1:8000".to_string());

        Self::from_api_base(api_base)
    }

    fn from_api_base(api_base: String) -> Result<Self> {
        ensure!(
            api_base.starts_with("http://") || api_base.starts_with("https://"),
            "failed to parse API_BASE: expected http(s) url, got {api_base:?}"
        );

        Ok(Self { api_base })
    }
}

impl CertificateConfig {
    fn load() -> Option<Self> {
        let cert_path = env::var("CERT_PATH").ok()?;
        let key_path = env::var("KEY_PATH").ok()?;

        Some(Self {
            cert_path: cert_path.into(),
            key_path: key_path.into(),
        })
    }
}

impl PathConfig {
    fn load() -> Self {
        let pages_dir = env::var("PAGES_DIR")
            .unwrap_or_else(|_| "pages".to_string())
            .into();

        Self { pages_dir }
    }
}
