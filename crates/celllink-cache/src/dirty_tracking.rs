//! 髒標記追蹤

use std::collections::{BTreeMap, BTreeSet};

use celllink_core::{CellAddress, ColumnName};

/// 髒標記追蹤器
///
/// 依欄位記錄需要重新計算的位址。欄位之間互不影響：清除一個欄位的
/// 標記不會動到其他欄位。
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    dirty_cells: BTreeMap<ColumnName, BTreeSet<CellAddress>>,
}

impl DirtyTracker {
    /// 創建新的追蹤器
    pub fn new() -> Self {
        Self::default()
    }

    /// 註冊欄位（建立空的髒集合）
    pub fn register(&mut self, column: impl Into<ColumnName>) {
        self.dirty_cells.entry(column.into()).or_default();
    }

    /// 標記位址為髒，回傳是否為新標記
    pub fn mark_dirty(&mut self, address: CellAddress) -> bool {
        self.dirty_cells
            .entry(address.column.clone())
            .or_default()
            .insert(address)
    }

    /// 檢查位址是否為髒
    pub fn is_dirty(&self, address: &CellAddress) -> bool {
        self.dirty_cells
            .get(&address.column)
            .is_some_and(|set| set.contains(address))
    }

    /// 欄位的髒位址（依日期排序的快照）
    pub fn dirty_addresses(&self, column: &str) -> BTreeSet<CellAddress> {
        self.dirty_cells.get(column).cloned().unwrap_or_default()
    }

    /// 欄位的髒位址數量
    pub fn dirty_count(&self, column: &str) -> usize {
        self.dirty_cells.get(column).map_or(0, BTreeSet::len)
    }

    /// 清除欄位的髒標記
    pub fn clear(&mut self, column: &str) {
        if let Some(set) = self.dirty_cells.get_mut(column) {
            set.clear();
        }
    }

    /// 清除所有髒標記
    pub fn clear_all(&mut self) {
        self.dirty_cells.values_mut().for_each(BTreeSet::clear);
    }

    /// 是否有任何髒標記
    pub fn any_dirty(&self) -> bool {
        self.dirty_cells.values().any(|set| !set.is_empty())
    }

    /// 獲取所有有髒標記的欄位
    pub fn get_dirty_columns(&self) -> Vec<ColumnName> {
        self.dirty_cells
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(column, _)| column.clone())
            .collect()
    }
}
