//! Application configuration module / 应用配置模块
//!
//! Manages application configuration loaded from config.json
//! Creates default config file on first run / 首次运行时创建默认配置文件

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    pub server: ServerConfig,
    /// Persistent store configuration / 存储配置
    pub storage: StorageConfig,
    /// Incremental search tunables / 搜索配置
    pub search: SearchConfig,
    /// Word resolver configuration / 词典配置
    pub dictionary: DictionaryConfig,
    /// Registry catalog source / 注册表配置
    pub catalog: CatalogConfig,
    /// Content library source / 内容库配置
    pub content: ContentConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port / 服务器端口
    pub port: u16,
}

/// Storage configuration / 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Data directory path / 数据目录路径
    pub data_dir: String,
    /// Key/value database file (relative to data_dir) / 数据库文件
    pub db_file: String,
}

/// Per-category result caps / 分类结果上限
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryLimits {
    pub dictionary: usize,
    pub registry: usize,
    pub books: usize,
    pub chapters: usize,
    pub lessons: usize,
}

/// Search configuration / 搜索配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Keystroke debounce delay (ms) / 防抖延迟
    pub debounce_ms: u64,
    /// Minimum trimmed query length before the content library is walked
    pub min_content_query_len: usize,
    /// Maximum number of remembered queries / 历史记录上限
    pub history_limit: usize,
    /// Rows moved by a page step / 翻页步长
    pub page_step: usize,
    pub limits: CategoryLimits,
    /// Levels whose books are searched / 搜索的等级
    pub levels: Vec<String>,
}

/// Remote endpoint definition / 远程端点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    pub base_url: String,
    /// Per-attempt timeout (ms) / 单次请求超时
    pub timeout_ms: u64,
    /// Lower order is tried first / 越小越先尝试
    #[serde(default)]
    pub order: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl EndpointConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Dictionary configuration / 词典配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DictionaryConfig {
    /// Bundled dataset (JSON array of entries) / 本地词典文件
    pub dataset_path: String,
    /// Language definitions are translated into / 显示语言
    pub display_language: String,
    /// Definitions translated per sense / 每个义项翻译的释义数
    pub max_translated_definitions: usize,
    /// Word lookup endpoints, tried in order / 查词端点
    pub endpoints: Vec<EndpointConfig>,
    /// Translation endpoints, tried in order / 翻译端点
    pub translators: Vec<EndpointConfig>,
}

/// Registry catalog configuration / 注册表配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// JSON catalog file; empty means built-in catalog / 为空则使用内置目录
    pub path: String,
}

/// Content library configuration / 内容库配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentConfig {
    /// JSON content library file; empty means no content / 为空则无内容
    pub path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8190,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            db_file: "kotoba.db".to_string(),
        }
    }
}

impl Default for CategoryLimits {
    fn default() -> Self {
        Self {
            dictionary: 3,
            registry: 8,
            books: 5,
            chapters: 5,
            lessons: 8,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 150,
            min_content_query_len: 2,
            history_limit: 10,
            page_step: 5,
            limits: CategoryLimits::default(),
            levels: ["N5", "N4", "N3", "N2", "N1"].iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SearchConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for DictionaryConfig {
    fn default() -> Self {
        Self {
            dataset_path: "data/dictionary.json".to_string(),
            display_language: "vi".to_string(),
            max_translated_definitions: 3,
            endpoints: vec![
                EndpointConfig {
                    name: "jisho".to_string(),
                    base_url: "https://jisho.org/api/v1/search/words".to_string(),
                    timeout_ms: 10_000,
                    order: 0,
                    enabled: true,
                },
            ],
            translators: vec![
                EndpointConfig {
                    name: "google".to_string(),
                    base_url: "https://translate.googleapis.com/translate_a/single".to_string(),
                    timeout_ms: 4_000,
                    order: 0,
                    enabled: true,
                },
            ],
        }
    }
}

impl AppConfig {
    /// Get the full database URL / 获取完整的数据库URL
    pub fn get_database_url(&self) -> String {
        let db_path = Path::new(&self.storage.data_dir).join(&self.storage.db_file);
        format!("sqlite:{}?mode=rwc", db_path.to_string_lossy())
    }

    /// Get the full data directory path / 获取完整的数据目录路径
    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.storage.data_dir)
    }

    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Get the config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create default if not exists / 加载配置文件，不存在则创建默认配置
pub fn load_config() -> Result<AppConfig, String> {
    load_config_from(&get_config_path())
}

/// Load configuration from an explicit path / 从指定路径加载配置
pub fn load_config_from(config_path: &Path) -> Result<AppConfig, String> {
    if config_path.exists() {
        let content = std::fs::read_to_string(config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        let config = AppConfig::default();
        save_config_to(&config, config_path)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file / 保存配置到文件
pub fn save_config_to(config: &AppConfig, config_path: &Path) -> Result<(), String> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}
