//! 整數日期（YYYYMMDD）
//!
//! 日期只做整數運算：加一年即 `+10000`，不經過日曆換算，
//! 因此 2 月 29 日加一年可能得到不存在的日期。

use chrono::{Datelike, NaiveDate};

/// YYYYMMDD 格式的整數日期
pub type Date = i64;

/// 最大日期（讀取時不設可用日限制的預設值）
pub const MAX_DATE: Date = 99_999_999;

/// 一年的日期差
pub const ONE_YEAR: Date = 10_000;

/// 年數轉為日期差
pub fn years(count: i64) -> Date {
    count * ONE_YEAR
}

/// 年月分桶（YYYYMM），同月份的儲存格共用一頁
pub fn month_bucket(date: Date) -> i64 {
    date.div_euclid(100)
}

/// 截斷至所屬季度的第一天
///
/// 月份欄位為 0 的合成日期（例如 `50000`）會落到前一季度的起點，
/// 確保回傳值永遠不晚於輸入日期。
pub fn quarter_start(date: Date) -> Date {
    let year_month = month_bucket(date);
    let year = year_month.div_euclid(100);
    let month = year_month.rem_euclid(100);
    let quarter = (month - 1).div_euclid(3);
    year * 10_000 + (quarter * 3 + 1) * 100 + 1
}

/// 轉換為日曆日期（無效日期回傳 None）
pub fn to_naive_date(date: Date) -> Option<NaiveDate> {
    let year = i32::try_from(date / 10_000).ok()?;
    let month = u32::try_from((date / 100) % 100).ok()?;
    let day = u32::try_from(date % 100).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// 從日曆日期轉換
pub fn from_naive_date(date: NaiveDate) -> Date {
    i64::from(date.year()) * 10_000 + i64::from(date.month()) * 100 + i64::from(date.day())
}

/// 檢查是否為有效的日曆日期
pub fn is_calendar_date(date: Date) -> bool {
    to_naive_date(date).is_some()
}
