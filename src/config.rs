use std::{
    env, fs,
    net::SocketAddr,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context;
use serde::Deserialize;

const DEFAULT_CONFIG_PATH: &str = "config/app_config.toml";
const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_TEXT_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_IMAGE_MODEL: &str = "gemini-2.0-flash-exp";
const DEFAULT_TIMEOUT_SECONDS: u64 = 120;
const MIN_TIMEOUT_SECONDS: u64 = 5;
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:9000";

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const CONFIG_PATH_ENV: &str = "APP_CONFIG_PATH";

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// Empty when unset; the first upstream call then fails with an auth error.
    pub api_key: String,
    pub api_url: String,
    pub classifier_model: String,
    pub solver_model: String,
    pub image_model: String,
    pub timeout: Duration,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let explicit_path = env::var(CONFIG_PATH_ENV).ok();
        let config_path = PathBuf::from(
            explicit_path
                .as_deref()
                .unwrap_or(DEFAULT_CONFIG_PATH),
        );

        let contents = if explicit_path.is_some() || config_path.exists() {
            Some(read_config(&config_path)?)
        } else {
            None
        };

        Self::from_sources(contents.as_deref(), |key| env::var(key).ok())
    }

    /// Builds the configuration from TOML text plus an environment lookup.
    pub fn from_sources(
        contents: Option<&str>,
        env_lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let file_config: FileConfig = match contents {
            Some(contents) => toml::from_str(contents).context("解析配置文件失败")?,
            None => FileConfig::default(),
        };

        let mut gemini = file_config.gemini.unwrap_or_default().into_domain();
        if let Some(api_key) = env_lookup(API_KEY_ENV).filter(|key| !key.trim().is_empty()) {
            gemini.api_key = api_key;
        }

        let server = file_config.server.unwrap_or_default().into_domain()?;

        Ok(Self { gemini, server })
    }
}

fn read_config(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("读取配置文件 {:?} 失败", path))
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    gemini: Option<FileGeminiConfig>,
    #[serde(default)]
    server: Option<FileServerConfig>,
}

#[derive(Debug, Deserialize, Default)]
struct FileGeminiConfig {
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    api_url: Option<String>,
    #[serde(default)]
    classifier_model: Option<String>,
    #[serde(default)]
    solver_model: Option<String>,
    #[serde(default)]
    image_model: Option<String>,
    #[serde(default)]
    timeout_seconds: Option<u64>,
}

impl FileGeminiConfig {
    fn into_domain(self) -> GeminiConfig {
        let timeout = self
            .timeout_seconds
            .unwrap_or(DEFAULT_TIMEOUT_SECONDS)
            .max(MIN_TIMEOUT_SECONDS);

        GeminiConfig {
            api_key: self.api_key.unwrap_or_default(),
            api_url: self
                .api_url
                .unwrap_or_else(|| DEFAULT_GEMINI_API_URL.to_string()),
            classifier_model: self
                .classifier_model
                .unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            solver_model: self
                .solver_model
                .unwrap_or_else(|| DEFAULT_TEXT_MODEL.to_string()),
            image_model: self
                .image_model
                .unwrap_or_else(|| DEFAULT_IMAGE_MODEL.to_string()),
            timeout: Duration::from_secs(timeout),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct FileServerConfig {
    #[serde(default)]
    bind_addr: Option<String>,
}

impl FileServerConfig {
    fn into_domain(self) -> anyhow::Result<ServerConfig> {
        let bind_addr_str = self
            .bind_addr
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .with_context(|| format!("解析 server.bind_addr 失败: {}", bind_addr_str))?;

        Ok(ServerConfig { bind_addr })
    }
}
