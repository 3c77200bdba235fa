//! 日期索引
//!
//! 排序且不重複的日期清單，以及每個日期下出現過的鍵。資料表用它記錄
//! 所有（日期, 鍵）組合；視窗彙總用它記錄檢查點日期。

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use celllink_cache::PageStorage;
use celllink_core::{CellKey, Date, Result};

use crate::persist;

/// 日期索引
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateIndex {
    dates: Vec<Date>,
    keys: BTreeMap<Date, BTreeSet<CellKey>>,
}

impl DateIndex {
    /// 創建空的索引
    pub fn new() -> Self {
        Self::default()
    }

    /// 加入日期（不帶鍵），回傳是否為新日期
    pub fn insert_date(&mut self, date: Date) -> bool {
        match self.dates.binary_search(&date) {
            Ok(_) => false,
            Err(pos) => {
                self.dates.insert(pos, date);
                self.keys.entry(date).or_default();
                true
            }
        }
    }

    /// 記錄（日期, 鍵），回傳該鍵是否首次出現在此日期
    pub fn push(&mut self, date: Date, key: &str) -> bool {
        self.insert_date(date);
        self.keys.entry(date).or_default().insert(key.to_string())
    }

    /// 檢查日期是否存在
    pub fn contains_date(&self, date: Date) -> bool {
        self.dates.binary_search(&date).is_ok()
    }

    /// 檢查（日期, 鍵）是否存在
    pub fn contains(&self, date: Date, key: &str) -> bool {
        self.keys.get(&date).is_some_and(|keys| keys.contains(key))
    }

    /// 所有日期（遞增）
    pub fn dates(&self) -> &[Date] {
        &self.dates
    }

    /// 日期範圍（兩端皆包含，`None` 表示不限）
    pub fn slice(&self, start: Option<Date>, end: Option<Date>) -> &[Date] {
        let lo = start.map_or(0, |s| self.dates.partition_point(|d| *d < s));
        let hi = end.map_or(self.dates.len(), |e| self.dates.partition_point(|d| *d <= e));
        if lo >= hi {
            return &[];
        }
        &self.dates[lo..hi]
    }

    /// 不晚於指定日期的最後一個日期
    pub fn latest_at_or_before(&self, date: Date) -> Option<Date> {
        let pos = self.dates.partition_point(|d| *d <= date);
        pos.checked_sub(1).map(|i| self.dates[i])
    }

    /// 早於指定日期的最後一個日期
    pub fn latest_before(&self, date: Date) -> Option<Date> {
        let pos = self.dates.partition_point(|d| *d < date);
        pos.checked_sub(1).map(|i| self.dates[i])
    }

    /// 日期下的所有鍵（排序）
    pub fn keys_at(&self, date: Date) -> Vec<CellKey> {
        self.keys
            .get(&date)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 最早日期
    pub fn first(&self) -> Option<Date> {
        self.dates.first().copied()
    }

    /// 最晚日期
    pub fn last(&self) -> Option<Date> {
        self.dates.last().copied()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// （日期, 鍵）組合總數
    pub fn entry_count(&self) -> usize {
        self.keys.values().map(BTreeSet::len).sum()
    }

    /// 寫入儲存（先備份）
    pub fn save(&self, storage: &dyn PageStorage, name: &str) -> Result<()> {
        persist::save_with_backup(storage, name, self)
    }

    /// 從儲存載入；主檔與備份都無法讀取時回傳空索引
    pub fn load(storage: &dyn PageStorage, name: &str) -> Self {
        persist::load_with_backup::<DateIndex>(storage, name)
            .map(DateIndex::normalized)
            .unwrap_or_default()
    }

    /// 外部寫入的索引可能未排序或不一致，載入後重建日期清單
    fn normalized(self) -> Self {
        let mut dates: BTreeSet<Date> = self.dates.into_iter().collect();
        dates.extend(self.keys.keys().copied());
        let mut keys = self.keys;
        for date in &dates {
            keys.entry(*date).or_default();
        }
        Self {
            dates: dates.into_iter().collect(),
            keys,
        }
    }
}
