//! 資料表與頁面儲存配置

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::{CellLinkError, Result};

/// 儲存格頁面快取的預設容量
pub const DEFAULT_CELL_CACHE_CAPACITY: usize = 80;

/// 檢查點頁面快取的預設容量（檢查點頁面很大，只保留少數幾頁）
pub const DEFAULT_CHECKPOINT_CACHE_CAPACITY: usize = 5;

/// 資料表配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// 資料表名稱（所有持久化物件的前綴）
    pub name: String,

    /// 檔案儲存的根目錄
    pub root_dir: PathBuf,

    /// 儲存格頁面快取容量（頁數）
    #[serde(default = "default_cell_cache_capacity")]
    pub cell_cache_capacity: usize,

    /// 檢查點頁面快取容量（頁數）
    #[serde(default = "default_checkpoint_cache_capacity")]
    pub checkpoint_cache_capacity: usize,

    /// 唯讀模式
    #[serde(default)]
    pub read_only: bool,

    /// 是否強制檢查可用日
    /// - true: 讀取尚未可用的儲存格時回傳錯誤（防止未來資訊外洩）
    /// - false: 不檢查（預設）
    #[serde(default)]
    pub enforce_availability: bool,
}

fn default_cell_cache_capacity() -> usize {
    DEFAULT_CELL_CACHE_CAPACITY
}

fn default_checkpoint_cache_capacity() -> usize {
    DEFAULT_CHECKPOINT_CACHE_CAPACITY
}

impl TableConfig {
    /// 創建新的資料表配置
    pub fn new(name: impl Into<String>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root_dir: root_dir.into(),
            cell_cache_capacity: DEFAULT_CELL_CACHE_CAPACITY,
            checkpoint_cache_capacity: DEFAULT_CHECKPOINT_CACHE_CAPACITY,
            read_only: false,
            enforce_availability: false,
        }
    }

    /// 建構器模式：設置儲存格快取容量
    pub fn with_cell_cache_capacity(mut self, capacity: usize) -> Self {
        self.cell_cache_capacity = capacity;
        self
    }

    /// 建構器模式：設置檢查點快取容量
    pub fn with_checkpoint_cache_capacity(mut self, capacity: usize) -> Self {
        self.checkpoint_cache_capacity = capacity;
        self
    }

    /// 建構器模式：設置唯讀模式
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// 建構器模式：設置是否強制檢查可用日
    pub fn with_enforce_availability(mut self, enforce: bool) -> Self {
        self.enforce_availability = enforce;
        self
    }

    /// 從 JSON 字串載入配置
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: TableConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 從 JSON 檔案載入配置
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// 驗證配置
    pub fn validate(&self) -> Result<()> {
        validate_table_name(&self.name)?;
        if self.cell_cache_capacity == 0 {
            return Err(CellLinkError::InvalidConfig(
                "儲存格快取容量必須大於 0".to_string(),
            ));
        }
        if self.checkpoint_cache_capacity == 0 {
            return Err(CellLinkError::InvalidConfig(
                "檢查點快取容量必須大於 0".to_string(),
            ));
        }
        Ok(())
    }

    /// 儲存格頁面儲存的配置
    pub fn cell_store_config(&self) -> StoreConfig {
        StoreConfig::new(self.cell_cache_capacity).with_read_only(self.read_only)
    }

    /// 檢查點頁面儲存的配置
    pub fn checkpoint_store_config(&self) -> StoreConfig {
        StoreConfig::new(self.checkpoint_cache_capacity).with_read_only(self.read_only)
    }
}

/// 驗證資料表名稱
///
/// 資料表名稱是所有持久化物件名稱的前綴，只允許 ASCII 英數字與 `-`，
/// 不可含物件名稱中的分隔字元 `_` 與 `.`。
pub fn validate_table_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CellLinkError::InvalidConfig("資料表名稱不可為空".to_string()));
    }
    if let Some(c) = name.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '-')) {
        return Err(CellLinkError::InvalidConfig(format!(
            "資料表名稱 {name:?} 含有不允許的字元 {c:?}"
        )));
    }
    Ok(())
}

/// 驗證欄位名稱
///
/// 欄位名稱會出現在頁面的物件名稱中，不可為空，也不可含路徑分隔字元或控制字元。
pub fn validate_column_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(CellLinkError::InvalidConfig("欄位名稱不可為空".to_string()));
    }
    if let Some(c) = name.chars().find(|c| matches!(*c, '/' | '\\') || c.is_control()) {
        return Err(CellLinkError::InvalidConfig(format!(
            "欄位名稱 {name:?} 含有不允許的字元 {c:?}"
        )));
    }
    Ok(())
}

/// 頁面儲存配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// 快取中最多保留的頁數
    pub cache_capacity: usize,

    /// 唯讀模式
    pub read_only: bool,
}

impl StoreConfig {
    /// 創建新的頁面儲存配置
    pub fn new(cache_capacity: usize) -> Self {
        Self {
            cache_capacity,
            read_only: false,
        }
    }

    /// 驗證配置
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(CellLinkError::InvalidConfig("頁面快取容量必須大於 0".to_string()));
        }
        Ok(())
    }

    /// 建構器模式：設置唯讀模式
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_CACHE_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_create_config() {
        let config = TableConfig::new("prices", "/tmp/celllink");

        assert_eq!(config.name, "prices");
        assert_eq!(config.cell_cache_capacity, 80);
        assert_eq!(config.checkpoint_cache_capacity, 5);
        assert!(!config.read_only);
        assert!(!config.enforce_availability);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = TableConfig::new("prices", "/tmp/celllink")
            .with_cell_cache_capacity(8)
            .with_checkpoint_cache_capacity(2)
            .with_read_only(true)
            .with_enforce_availability(true);

        assert_eq!(config.cell_store_config(), StoreConfig { cache_capacity: 8, read_only: true });
        assert_eq!(config.checkpoint_store_config(), StoreConfig { cache_capacity: 2, read_only: true });
        assert!(config.enforce_availability);
    }

    #[test]
    fn test_invalid_config() {
        let config = TableConfig::new("", "/tmp/celllink");
        assert!(matches!(config.validate(), Err(CellLinkError::InvalidConfig(_))));

        let config = TableConfig::new("prices", "/tmp/celllink").with_cell_cache_capacity(0);
        assert!(matches!(config.validate(), Err(CellLinkError::InvalidConfig(_))));
    }

    #[test]
    fn test_config_from_json_uses_defaults() {
        let config = TableConfig::from_json_str(r#"{"name": "prices", "root_dir": "/data"}"#).unwrap();

        assert_eq!(config.name, "prices");
        assert_eq!(config.root_dir, PathBuf::from("/data"));
        assert_eq!(config.cell_cache_capacity, DEFAULT_CELL_CACHE_CAPACITY);
        assert_eq!(config.checkpoint_cache_capacity, DEFAULT_CHECKPOINT_CACHE_CAPACITY);
        assert!(!config.read_only);
    }

    #[test]
    fn test_store_config_rejects_zero_capacity() {
        assert!(matches!(StoreConfig::new(0).validate(), Err(CellLinkError::InvalidConfig(_))));
        assert_eq!(StoreConfig::new(0).cache_capacity, 0);
        assert!(StoreConfig::new(1).validate().is_ok());
        assert!(StoreConfig::default().validate().is_ok());
    }

    #[rstest]
    #[case("prices", true)]
    #[case("ledger-2011", true)]
    #[case("Points", true)]
    #[case("", false)]
    #[case("a.b", false)]
    #[case("a_b", false)]
    #[case("a/b", false)]
    #[case("價格", false)]
    fn test_table_name_rules(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(validate_table_name(name).is_ok(), valid);
        assert_eq!(TableConfig::new(name, "/tmp/celllink").validate().is_ok(), valid);
    }

    #[rstest]
    #[case("amount", true)]
    #[case("dividend_3y", true)]
    #[case("b.c", true)]
    #[case("移動平均", true)]
    #[case("", false)]
    #[case("  ", false)]
    #[case("a/b", false)]
    #[case("a\\b", false)]
    #[case("a\nb", false)]
    fn test_column_name_rules(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(validate_column_name(name).is_ok(), valid);
    }
}
