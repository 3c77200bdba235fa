//! 儲存格位址

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::date::Date;

/// 欄位名稱
pub type ColumnName = String;

/// 同一位址下區分多筆資料的鍵（例如帳戶、股票代號）
pub type CellKey = String;

/// 儲存格位址（日期 × 欄位）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddress {
    /// 日期
    pub date: Date,

    /// 欄位名稱
    pub column: ColumnName,
}

impl CellAddress {
    /// 創建新的位址
    pub fn new(date: Date, column: impl Into<ColumnName>) -> Self {
        Self {
            date,
            column: column.into(),
        }
    }

    /// 同日期、其他欄位的位址
    pub fn with_column(&self, column: impl Into<ColumnName>) -> Self {
        Self::new(self.date, column)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.date, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_address_equality_by_value() {
        let a = CellAddress::new(20110101, "amount");
        let b = CellAddress::new(20110101, "amount".to_string());

        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_with_column() {
        let addr = CellAddress::new(20110101, "amount");
        let other = addr.with_column("balance");

        assert_eq!(other.date, 20110101);
        assert_eq!(other.column, "balance");
        assert_eq!(other.to_string(), "20110101:balance");
    }
}
