//! 欄位能力介面與簡單欄位
//!
//! 每種欄位都實作 [`Column`]。資料表以 `Rc<dyn Column>` 持有欄位，
//! 刷新時把自己的可變參考交給欄位；需要內部狀態的欄位（例如檢查點）
//! 以 `RefCell` 保存。

use std::collections::BTreeSet;
use std::rc::Rc;

use celllink_cache::PageStorage;
use celllink_core::{CellAddress, CellValue, ColumnName, Date, Result, TableConfig};

use crate::table::Table;

/// 欄位開啟時取得的環境
pub struct ColumnEnv<'a> {
    /// 所屬資料表名稱
    pub table_name: &'a str,

    /// 資料表的底層儲存（欄位自己的輔助狀態也寫在這裡）
    pub storage: Rc<dyn PageStorage>,

    /// 資料表配置
    pub config: &'a TableConfig,
}

/// 欄位
pub trait Column {
    /// 欄位名稱（在資料表內唯一）
    fn name(&self) -> &str;

    /// 計算此欄位需要讀取的欄位
    ///
    /// 加入資料表時會為每個欄位宣告依賴，上游寫入時此欄位被標記為髒。
    fn required_columns(&self) -> &[ColumnName] {
        &[]
    }

    /// 計算某位址時讀取的其他位址
    fn cell_dependencies(&self, address: &CellAddress) -> Vec<CellAddress> {
        self.required_columns()
            .iter()
            .map(|column| address.with_column(column.clone()))
            .collect()
    }

    /// 位址上的值最早可被讀取的日期
    fn available_on_date(&self, address: &CellAddress) -> Date {
        address.date
    }

    /// 鍵首次出現於某位址時的初始值
    fn key_init(&self, _address: &CellAddress, _key: &str) -> CellValue {
        CellValue::Missing
    }

    /// 重新計算髒位址
    fn refresh(&self, _table: &mut Table, _dirty: &BTreeSet<CellAddress>) -> Result<()> {
        Ok(())
    }

    /// 加入資料表時呼叫，載入輔助狀態
    fn open(&self, _env: &ColumnEnv<'_>) -> Result<()> {
        Ok(())
    }

    /// 資料表關閉時呼叫，寫回輔助狀態
    fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// 一般資料欄位（只存放寫入的值）
#[derive(Debug, Clone)]
pub struct FlatColumn {
    name: ColumnName,
}

impl FlatColumn {
    pub fn new(name: impl Into<ColumnName>) -> Self {
        Self { name: name.into() }
    }
}

impl Column for FlatColumn {
    fn name(&self) -> &str {
        &self.name
    }
}

/// 受保護欄位：值在隔天才可被讀取
///
/// 用於預測目標等欄位，避免當天的計算讀到當天才會知道的結果。
#[derive(Debug, Clone)]
pub struct ProtectedColumn {
    name: ColumnName,
}

impl ProtectedColumn {
    pub fn new(name: impl Into<ColumnName>) -> Self {
        Self { name: name.into() }
    }
}

impl Column for ProtectedColumn {
    fn name(&self) -> &str {
        &self.name
    }

    fn available_on_date(&self, address: &CellAddress) -> Date {
        address.date + 1
    }
}

/// 常數欄位：每個鍵初始化為同一個值
#[derive(Debug, Clone)]
pub struct ConstColumn {
    name: ColumnName,
    value: CellValue,
}

impl ConstColumn {
    pub fn new(name: impl Into<ColumnName>, value: impl Into<CellValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    pub fn value(&self) -> &CellValue {
        &self.value
    }
}

impl Column for ConstColumn {
    fn name(&self) -> &str {
        &self.name
    }

    fn key_init(&self, _address: &CellAddress, _key: &str) -> CellValue {
        self.value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(20110101, 20110101, 20110102)]
    #[case(50000, 50000, 50001)]
    fn test_available_on_date(#[case] date: Date, #[case] flat: Date, #[case] protected: Date) {
        let address = CellAddress::new(date, "target");

        assert_eq!(FlatColumn::new("target").available_on_date(&address), flat);
        assert_eq!(ProtectedColumn::new("target").available_on_date(&address), protected);
    }

    #[test]
    fn test_const_key_init() {
        let column = ConstColumn::new("one", 1);
        let address = CellAddress::new(20110101, "one");

        assert_eq!(column.key_init(&address, "A"), CellValue::from(1));
        assert_eq!(FlatColumn::new("flat").key_init(&address, "A"), CellValue::Missing);
    }

    #[test]
    fn test_simple_columns_have_no_inputs() {
        let column = FlatColumn::new("amount");
        let address = CellAddress::new(20110101, "amount");

        assert!(column.required_columns().is_empty());
        assert!(column.cell_dependencies(&address).is_empty());
    }
}
