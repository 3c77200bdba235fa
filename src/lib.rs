//! # Cell-Link
//!
//! 以（日期, 欄位, 鍵）定址的增量計算資料表。
//!
//! 欄位可以是其他欄位的函數；上游寫入時只重新計算受影響的儲存格，
//! 並依欄位依賴順序刷新。視窗彙總欄位以檢查點限制重算範圍。
//!
//! ```
//! use std::rc::Rc;
//! use celllink::prelude::*;
//!
//! let mut table = Table::open_with_storage(
//!     TableConfig::new("ledger", "/tmp/unused"),
//!     Rc::new(MemoryStorage::new()),
//! )?;
//! table.add_column(FlatColumn::new("account"))?;
//! table.add_column(FlatColumn::new("amount"))?;
//! table.add_column(
//!     WindowedAggregation::new("balance", "account")
//!         .with_input(AggregationInput::new("account", "amount")),
//! )?;
//!
//! table.set_cell(&CellAddress::new(20110101, "account"), "t1", "Checking")?;
//! table.set_cell(&CellAddress::new(20110101, "amount"), "t1", 100)?;
//! table.set_cell(&CellAddress::new(20110102, "account"), "t2", "Checking")?;
//! table.set_cell(&CellAddress::new(20110102, "amount"), "t2", 25)?;
//! table.refresh()?;
//!
//! let balance = table.get_cell(&CellAddress::new(20110102, "balance"), "t2")?;
//! assert_eq!(balance, CellValue::from(100));
//! # Ok::<(), CellLinkError>(())
//! ```

pub use celllink_cache::{FileStorage, MemoryStorage, PageStorage, PagedStore, StoreStats};
pub use celllink_core::{
    CellAddress, CellKey, CellLinkError, CellValue, ColumnName, Date, Result, Snapshot,
    StoreConfig, TableConfig,
};
pub use celllink_engine::{
    AggregationInput, CheckpointCadence, Column, ColumnEnv, ConstColumn, FlatColumn, FormulaColumn,
    Frame, ProtectedColumn, RefreshReport, Row, Table, WindowedAggregation,
};

/// 常用類型
pub mod prelude {
    pub use celllink_cache::{FileStorage, MemoryStorage, PageStorage};
    pub use celllink_core::{CellAddress, CellLinkError, CellValue, Date, TableConfig};
    pub use celllink_engine::{
        AggregationInput, CheckpointCadence, Column, ConstColumn, FlatColumn, FormulaColumn,
        ProtectedColumn, Table, WindowedAggregation,
    };
}
