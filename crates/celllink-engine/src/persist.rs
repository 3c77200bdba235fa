//! 持久化物件名稱與備份讀寫

use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use celllink_cache::PageStorage;
use celllink_core::{ColumnName, Date, Result};

/// 欄位清單
///
/// 記錄關閉時已註冊的欄位，以及關閉時仍未刷新的髒日期。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub columns: BTreeSet<ColumnName>,
    #[serde(default)]
    pub pending: BTreeMap<ColumnName, BTreeSet<Date>>,
}

impl Manifest {
    /// 欄位在上次關閉時是否已存在
    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// 欄位在上次關閉時尚未刷新的日期
    pub fn pending_dates(&self, column: &str) -> impl Iterator<Item = Date> + '_ {
        self.pending.get(column).into_iter().flatten().copied()
    }
}

/// 儲存格頁面的命名空間
pub fn cells_namespace(table: &str) -> String {
    format!("CELLS-{table}")
}

/// 日期索引的物件名稱
pub fn dates_object(table: &str) -> String {
    format!("DATES-{table}")
}

/// 欄位清單的物件名稱
pub fn manifest_object(table: &str) -> String {
    format!("COLUMNS-{table}")
}

/// 檢查點頁面的命名空間
pub fn snapshot_namespace(table: &str, column: &str) -> String {
    format!("SNAPSHOT-{table}.{column}")
}

/// 檢查點日期索引的物件名稱
pub fn snapshot_index_object(table: &str, column: &str) -> String {
    format!("SNAPSHOT-{table}.{column}_dates")
}

/// 備份物件名稱
pub fn backup_object(name: &str) -> String {
    format!("{name}_backup")
}

/// 以 JSON 寫入物件：先寫備份，再寫主檔
pub fn save_with_backup<T: Serialize>(storage: &dyn PageStorage, name: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec(value)?;
    storage.store(&backup_object(name), &bytes)?;
    storage.store(name, &bytes)?;
    Ok(())
}

/// 讀取 JSON 物件，主檔無法讀取時改讀備份
///
/// 兩者都無法讀取時回傳 `None`；不存在不算失敗，不會記錄警告。
pub fn load_with_backup<T: DeserializeOwned>(storage: &dyn PageStorage, name: &str) -> Option<T> {
    for candidate in [name.to_string(), backup_object(name)] {
        match storage.load(&candidate) {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => return Some(value),
                Err(e) => tracing::warn!(object = %candidate, error = %e, "物件內容損毀"),
            },
            Ok(None) => {}
            Err(e) => tracing::warn!(object = %candidate, error = %e, "物件讀取失敗"),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use celllink_cache::MemoryStorage;

    #[test]
    fn test_object_names() {
        assert_eq!(cells_namespace("prices"), "CELLS-prices");
        assert_eq!(dates_object("prices"), "DATES-prices");
        assert_eq!(manifest_object("prices"), "COLUMNS-prices");
        assert_eq!(snapshot_namespace("prices", "ma"), "SNAPSHOT-prices.ma");
        assert_eq!(snapshot_index_object("prices", "ma"), "SNAPSHOT-prices.ma_dates");
    }

    #[test]
    fn test_manifest_without_pending() {
        let manifest: Manifest = serde_json::from_str(r#"{"columns": ["amount"]}"#).unwrap();

        assert!(manifest.contains("amount"));
        assert!(!manifest.contains("balance"));
        assert_eq!(manifest.pending_dates("amount").count(), 0);
    }

    #[test]
    fn test_backup_written_first() {
        let storage = MemoryStorage::new();
        save_with_backup(&storage, "DATES-t", &vec![1, 2, 3]).unwrap();

        assert_eq!(
            storage.write_log(),
            vec!["DATES-t_backup".to_string(), "DATES-t".to_string()]
        );
    }

    #[test]
    fn test_falls_back_to_backup() {
        let storage = MemoryStorage::new();
        save_with_backup(&storage, "DATES-t", &vec![1, 2, 3]).unwrap();
        storage.insert("DATES-t", b"{broken".to_vec());

        let loaded: Option<Vec<i64>> = load_with_backup(&storage, "DATES-t");
        assert_eq!(loaded, Some(vec![1, 2, 3]));

        storage.insert("DATES-t_backup", b"{broken".to_vec());
        let loaded: Option<Vec<i64>> = load_with_backup(&storage, "DATES-t");
        assert_eq!(loaded, None);
    }
}
