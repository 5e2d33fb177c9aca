use crate::core::loader::{LoaderOptions, DEFAULT_MODEL};
use crate::core::module::substitute_env_vars;
use crate::utils::error::{BootstrapError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, validate_url, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const SETTINGS_FILE: &str = "agentos.toml";
pub const ENV_FILE: &str = ".env";
pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 7777;

const MODEL_ENV: &str = "AGENTOS_MODEL";
const PACKAGES_ENV: &str = "AGENTOS_PACKAGES";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub runtime: RuntimeSettings,
    pub server: ServerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub default_model: String,
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            default_model: DEFAULT_MODEL.to_string(),
            packages: Vec::new(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl Settings {
    /// 載入 .env、工作目錄下的 agentos.toml（若存在），再套用 AGENTOS_* 環境變數
    pub fn load() -> Result<Self> {
        // 只讀取工作目錄下的 .env，不往上層目錄搜尋
        if dotenvy::from_path(ENV_FILE).is_ok() {
            tracing::debug!("Loaded environment from {}", ENV_FILE);
        }

        let mut settings = if Path::new(SETTINGS_FILE).is_file() {
            tracing::debug!("Loading settings from {}", SETTINGS_FILE);
            Self::from_file(SETTINGS_FILE)?
        } else {
            Self::default()
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    /// 從 TOML 檔案載入設定
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析設定
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = substitute_env_vars(content);
        toml::from_str(&processed_content).map_err(|e| BootstrapError::ConfigError {
            message: format!("{}: {}", SETTINGS_FILE, e.message()),
        })
    }

    pub fn apply_env_overrides(&mut self) {
        if let Ok(model) = std::env::var(MODEL_ENV) {
            self.runtime.default_model = model;
        }
        if let Ok(packages) = std::env::var(PACKAGES_ENV) {
            self.runtime.packages = parse_package_list(&packages);
        }
    }

    pub fn loader_options(&self) -> LoaderOptions {
        LoaderOptions {
            packages: self.runtime.packages.clone(),
            default_model: self.runtime.default_model.clone(),
        }
    }
}

fn parse_package_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|pkg| !pkg.is_empty())
        .map(str::to_string)
        .collect()
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("runtime.default_model", &self.runtime.default_model)?;
        for package in &self.runtime.packages {
            validate_non_empty_string("runtime.packages", package)?;
        }
        validate_non_empty_string("server.host", &self.server.host)?;
        validate_range("server.port", self.server.port, 1, u16::MAX)?;
        validate_url(
            "server",
            &format!("http://{}:{}", self.server.host, self.server.port),
        )
    }
}
