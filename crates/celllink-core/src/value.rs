//! 儲存格值
//!
//! 缺值以明確的 `CellValue::Missing` 表示。`NaN`、無窮大等無法表示的數值
//! 在轉換時即被正規化為缺值，運算時再以 `number_or` 補上預設值。

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// 檢查點：標籤 → 累計值
pub type Snapshot = BTreeMap<String, Decimal>;

/// 儲存格值
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellValue {
    /// 缺值（未計算、空白或無效數值）
    #[default]
    Missing,
    /// 數值
    Number(Decimal),
    /// 文字
    Text(String),
}

impl CellValue {
    /// 檢查是否為缺值
    pub fn is_missing(&self) -> bool {
        matches!(self, CellValue::Missing)
    }

    /// 取得數值
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// 取得數值，非數值時回傳預設值
    pub fn number_or(&self, default: Decimal) -> Decimal {
        self.as_number().unwrap_or(default)
    }

    /// 取得文字
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 作為分組標籤使用時的字串形式（缺值沒有標籤）
    pub fn label(&self) -> Option<String> {
        match self {
            CellValue::Missing => None,
            CellValue::Number(n) => Some(n.normalize().to_string()),
            CellValue::Text(s) => Some(s.clone()),
        }
    }

    /// 缺值時以預設值取代
    pub fn or_default(self, default: CellValue) -> CellValue {
        if self.is_missing() {
            default
        } else {
            self
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Missing => write!(f, "<missing>"),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<Decimal> for CellValue {
    fn from(value: Decimal) -> Self {
        CellValue::Number(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Number(Decimal::from(value))
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Number(Decimal::from(value))
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Decimal::from_f64(value)
            .map(CellValue::Number)
            .unwrap_or(CellValue::Missing)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Missing)
    }
}
