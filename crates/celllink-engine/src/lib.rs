//! # Cell-Link Engine
//!
//! 依賴排程、欄位與資料表刷新引擎

pub mod column;
pub mod date_index;
pub mod formula;
pub mod materialize;
pub mod persist;
pub mod scheduler;
pub mod table;
pub mod windowed;

// Re-export 主要類型
pub use column::{Column, ColumnEnv, ConstColumn, FlatColumn, ProtectedColumn};
pub use date_index::DateIndex;
pub use formula::{FormulaColumn, RowFn};
pub use materialize::{Frame, Row};
pub use scheduler::{topological_order, DependencyGraph, DependencyMap};
pub use table::Table;
pub use windowed::{AggregationInput, CheckpointCadence, WindowedAggregation};

/// 刷新結果
#[derive(Debug, Clone, Default)]
pub struct RefreshReport {
    /// 依刷新順序列出實際刷新的欄位
    pub refreshed: Vec<ColumnRefresh>,

    /// 刷新耗時（毫秒）
    pub elapsed_ms: Option<u128>,
}

impl RefreshReport {
    /// 創建空的刷新結果
    pub fn empty() -> Self {
        Self::default()
    }

    /// 添加欄位刷新記錄
    pub fn add(&mut self, refresh: ColumnRefresh) {
        self.refreshed.push(refresh);
    }

    /// 是否沒有任何欄位被刷新
    pub fn is_empty(&self) -> bool {
        self.refreshed.is_empty()
    }

    /// 刷新的欄位名稱
    pub fn columns(&self) -> Vec<&str> {
        self.refreshed.iter().map(|r| r.column.as_str()).collect()
    }

    /// 處理的髒位址總數
    pub fn total_dirty(&self) -> usize {
        self.refreshed.iter().map(|r| r.dirty_count).sum()
    }
}

/// 單一欄位的刷新記錄
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRefresh {
    pub column: celllink_core::ColumnName,
    pub dirty_count: usize,
}
