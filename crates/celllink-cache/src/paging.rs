//! 位址到頁面名稱的映射策略

use std::fmt::Display;

use celllink_core::date::month_bucket;
use celllink_core::{CellAddress, Date};

/// 分頁策略
pub trait Paging {
    /// 位址類型
    type Address: Display;

    /// 位址所屬的頁面名稱
    fn page_name(&self, address: &Self::Address) -> String;

    /// 頁內的複合鍵
    ///
    /// 多個位址可能共用一頁，因此鍵必須包含完整位址。
    fn entry_key(&self, address: &Self::Address, key: &str) -> String {
        format!("{}: {}", address, key)
    }
}

/// 儲存格分頁：同一欄位、同一月份共用一頁
#[derive(Debug, Clone, Copy, Default)]
pub struct CellPaging;

impl Paging for CellPaging {
    type Address = CellAddress;

    fn page_name(&self, address: &CellAddress) -> String {
        format!("{}-{}", month_bucket(address.date), address.column)
    }
}

/// 檢查點分頁：每個檢查點日期一頁
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotPaging;

impl Paging for SnapshotPaging {
    type Address = Date;

    fn page_name(&self, address: &Date) -> String {
        address.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(20110101, "amount", "201101-amount")]
    #[case(20110131, "amount", "201101-amount")]
    #[case(20110201, "amount", "201102-amount")]
    #[case(20110101, "account", "201101-account")]
    fn test_cell_page_names(#[case] date: Date, #[case] column: &str, #[case] expected: &str) {
        assert_eq!(CellPaging.page_name(&CellAddress::new(date, column)), expected);
    }

    #[test]
    fn test_entry_keys_distinguish_addresses_on_one_page() {
        let a = CellAddress::new(20110101, "amount");
        let b = CellAddress::new(20110102, "amount");

        assert_eq!(CellPaging.page_name(&a), CellPaging.page_name(&b));
        assert_ne!(CellPaging.entry_key(&a, "row_1"), CellPaging.entry_key(&b, "row_1"));
    }

    #[test]
    fn test_snapshot_page_is_date() {
        assert_eq!(SnapshotPaging.page_name(&20110401), "20110401");
        assert_eq!(SnapshotPaging.entry_key(&20110401, "SNAPSHOT"), "20110401: SNAPSHOT");
    }
}
