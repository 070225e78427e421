//! Registry module - static catalog of searchable application items / 注册表模块
//!
//! The catalog is built once at startup (bundled JSON or an operator-provided
//! file) and never mutated afterwards. Searching it is synchronous.

pub mod matcher;

pub use matcher::{fuzzy_score, score_item, search_items};

use once_cell::sync::Lazy;
use std::path::Path;
use std::sync::Arc;

use crate::error::{LookupError, LookupResult};
use crate::models::{RankedRegistryItem, RegistryItem};

/// Bundled catalog / 内置目录
const BUILTIN_CATALOG: &str = include_str!("catalog.json");

/// Parsed once, shared by every `Catalog::builtin()` / 只解析一次
static BUILTIN: Lazy<Catalog> = Lazy::new(|| {
    match serde_json::from_str::<Vec<RegistryItem>>(BUILTIN_CATALOG) {
        Ok(items) => Catalog::from_items(items),
        Err(e) => {
            tracing::error!("Built-in registry catalog is malformed: {}", e);
            Catalog::default()
        }
    }
});

/// Immutable registry catalog / 不可变目录
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Arc<Vec<RegistryItem>>,
}

impl Catalog {
    pub fn from_items(items: Vec<RegistryItem>) -> Self {
        Self { items: Arc::new(items) }
    }

    /// Catalog compiled into the binary / 内置目录
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// Load a catalog from a JSON array file / 从文件加载目录
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> LookupResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let items: Vec<RegistryItem> = serde_json::from_str(&content)
            .map_err(|e| LookupError::Dataset(format!("{:?}: {}", path, e)))?;
        tracing::info!("Loaded {} registry items from {:?}", items.len(), path);
        Ok(Self::from_items(items))
    }

    pub fn items(&self) -> &[RegistryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ranked, role-filtered matches for `query` / 搜索
    pub fn search(&self, query: &str, role: Option<&str>) -> Vec<RankedRegistryItem> {
        search_items(&self.items, query, role)
    }
}
