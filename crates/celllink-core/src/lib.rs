//! # Cell-Link Core
//!
//! 核心資料模型與類型定義

pub mod address;
pub mod config;
pub mod date;
pub mod value;

// Re-export 主要類型
pub use address::{CellAddress, CellKey, ColumnName};
pub use config::{validate_column_name, validate_table_name, StoreConfig, TableConfig};
pub use date::{Date, MAX_DATE, ONE_YEAR};
pub use value::{CellValue, Snapshot};

/// Cell-Link 錯誤類型
#[derive(Debug, thiserror::Error)]
pub enum CellLinkError {
    #[error("欄位依賴圖存在循環")]
    CycleDetected,

    #[error("儲存格 {address} 於 {requested} 尚不可用（最早可用日: {available}）")]
    NotAvailable {
        address: CellAddress,
        requested: Date,
        available: Date,
    },

    #[error("找不到欄位: {0}")]
    ColumnNotFound(ColumnName),

    #[error("欄位已存在: {0}")]
    DuplicateColumn(ColumnName),

    #[error("唯讀模式下不可修改: {0}")]
    ReadOnly(String),

    #[error("找不到預期存在的檢查點: 欄位 {column}，日期 {date}")]
    MissingCheckpoint { column: ColumnName, date: Date },

    #[error("欄位尚未開啟: {0}")]
    ColumnNotOpen(ColumnName),

    #[error("無效的設定: {0}")]
    InvalidConfig(String),

    #[error("I/O 錯誤: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化錯誤: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CellLinkError>;
